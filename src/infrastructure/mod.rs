// Infrastructure module - External dependencies and adapters
pub mod serial;
pub mod logging;
pub mod config;
pub mod input;
