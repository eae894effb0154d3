//! Service container for dependency injection
//!
//! Holds the settings and I/O implementations a command needs and opens
//! documents as sessions.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::Session;
use crate::config::Settings;
use crate::domain::Viewport;
use crate::infrastructure::error::{InfraError, InfraResult};
use crate::infrastructure::traits::{FileSystem, RealFileSystem};

pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            settings: Arc::new(settings),
            fs,
        }
    }

    pub fn read_document(&self, path: &Path) -> InfraResult<String> {
        debug!("reading {}", path.display());
        self.fs
            .read_to_string(path)
            .map_err(|e| InfraError::read(path, e))
    }

    /// Read and import a document into a fresh session.
    #[instrument(level = "debug", skip(self))]
    pub fn open_session(&self, path: &Path, viewport: Viewport) -> InfraResult<Session> {
        let xml = self.read_document(path)?;
        Ok(Session::import(&xml, viewport, (*self.settings).clone())?)
    }
}
