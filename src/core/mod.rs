// Core module - Device protocol, transport pipelines and operations
pub mod operations;
pub mod protocol;
pub mod stream;
pub mod transport;

pub use operations::Session;
pub use transport::{Pipeline, ExchangeState};
