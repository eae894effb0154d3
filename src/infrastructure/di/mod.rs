//! Dependency wiring for the CLI

mod service_container;

pub use service_container::ServiceContainer;
