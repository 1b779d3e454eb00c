//! Scheduling services
//!
//! Pure computations over a snapshot of tasks and a project: critical chain
//! identification, project completion, buffer sizing and buffer consumption.
//! Nothing here performs I/O.

mod buffer;
mod critical_chain;

pub use buffer::{BufferCalculationService, BufferConfigError, DEFAULT_BUFFER_RATIO};
pub use critical_chain::CriticalChainService;
