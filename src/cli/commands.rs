//! Command dispatch
//!
//! Each subcommand opens the document through the service container and
//! drives a [`Session`] the way an interactive front end would.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, instrument};

use crate::application::layout::Size;
use crate::application::Session;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::Viewport;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::{InfraError, RecordingSurface};

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let project_dir = match &cli.project_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().map_err(|e| InfraError::io("current directory", e))?,
    };
    let settings = Settings::load(Some(&project_dir))?;
    let container = ServiceContainer::new(settings);

    match &cli.command {
        Some(Commands::Roundtrip { file }) => cmd_roundtrip(&container, file),
        Some(Commands::Tree { file }) => cmd_tree(&container, file),
        Some(Commands::Layout {
            file,
            width,
            height,
            json,
        }) => cmd_layout(&container, file, Viewport::new(*width, *height), *json),
        Some(Commands::Move {
            file,
            node,
            target,
            in_place,
        }) => cmd_move(&container, file, node, target, *in_place),
        Some(Commands::Config { command }) => cmd_config(&container, &project_dir, command),
        None => Ok(()),
    }
}

#[instrument(level = "debug", skip(container))]
fn cmd_roundtrip(container: &ServiceContainer, file: &Path) -> CliResult<()> {
    let session = container.open_session(file, Viewport::default())?;
    output::info(&session.export());
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_tree(container: &ServiceContainer, file: &Path) -> CliResult<()> {
    let session = container.open_session(file, Viewport::default())?;
    output::info(&output::tree_view(session.tree()));
    Ok(())
}

#[derive(Debug, Serialize)]
struct PositionRow {
    path: String,
    depth: usize,
    x: f64,
    y: f64,
}

#[derive(Debug, Serialize)]
struct LayoutReport {
    size: Size,
    nodes: Vec<PositionRow>,
}

#[instrument(level = "debug", skip(container))]
fn cmd_layout(
    container: &ServiceContainer,
    file: &Path,
    viewport: Viewport,
    json: bool,
) -> CliResult<()> {
    if !(viewport.width > 0.0 && viewport.height > 0.0) {
        return Err(CliError::InvalidArgs(
            "viewport width and height must be positive".to_string(),
        ));
    }
    let session = container.open_session(file, viewport)?;
    let tree = session.tree();
    let layout = session.layout();

    let nodes: Vec<PositionRow> = layout
        .nodes
        .iter()
        .filter_map(|&idx| {
            let position = layout.position(idx)?;
            Some(PositionRow {
                path: tree.path_of(idx),
                depth: layout.depth(idx).unwrap_or_default(),
                x: position.x,
                y: position.y,
            })
        })
        .collect();
    debug!("layout: {} nodes", nodes.len());

    if json {
        let report = LayoutReport {
            size: layout.size,
            nodes,
        };
        let text = serde_json::to_string_pretty(&report).map_err(InfraError::from)?;
        output::info(&text);
    } else {
        output::header(&format!(
            "Layout {}x{} ({} nodes)",
            layout.size.width,
            layout.size.height,
            nodes.len()
        ));
        for row in &nodes {
            output::detail(&format!(
                "{:<40} depth={} x={:.1} y={:.1}",
                row.path, row.depth, row.x, row.y
            ));
        }
    }
    Ok(())
}

fn resolve(session: &Session, path: &str) -> CliResult<generational_arena::Index> {
    session
        .tree()
        .find_path(path)
        .ok_or_else(|| CliError::InvalidArgs(format!("no element at path '{}'", path)))
}

#[instrument(level = "debug", skip(container))]
fn cmd_move(
    container: &ServiceContainer,
    file: &Path,
    node: &str,
    target: &str,
    in_place: bool,
) -> CliResult<()> {
    let mut session = container.open_session(file, Viewport::default())?;
    let dragged = resolve(&session, node)?;
    let parent = resolve(&session, target)?;

    let mut surface = RecordingSurface::new();
    session.render(&mut surface)?;
    session.begin_drag(dragged)?;
    session.hover(parent, &mut surface)?;
    session.end_drag(&mut surface)?;
    let moved_to = session.tree().path_of(dragged);

    let xml = session.export();
    if in_place {
        container
            .fs
            .write(file, &xml)
            .map_err(|e| InfraError::io(format!("write {}", file.display()), e))?;
        output::action("Moved", &format!("{} -> {}", node, moved_to));
    } else {
        output::info(&xml);
    }
    Ok(())
}

fn cmd_config(
    container: &ServiceContainer,
    project_dir: &Path,
    command: &ConfigCommands,
) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::info(&container.settings.to_toml()?);
        }
        ConfigCommands::Path => {
            let describe = |path: Option<PathBuf>| match path {
                Some(p) if container.fs.exists(&p) => format!("{} (exists)", p.display()),
                Some(p) => format!("{} (not found)", p.display()),
                None => "unavailable".to_string(),
            };
            output::header("Config files");
            output::detail(&format!("global: {}", describe(global_config_path())));
            output::detail(&format!(
                "local:  {}",
                describe(Some(local_config_path(project_dir)))
            ));
        }
    }
    Ok(())
}
