// Transport module - Serial handle and protocol stream pairing
pub mod exchange;
pub mod pipeline;

pub use exchange::{ExchangeGate, ExchangeState};
pub use pipeline::{Pipeline, PipelineReader, PipelineWriter};
