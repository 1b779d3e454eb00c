//! CCPM - Critical chain project management
//!
//! Finds the critical chain of a project (the longest effort-weighted path
//! through its task dependencies), sizes the project buffer from it, and
//! tracks how fast that buffer is consumed relative to progress.

pub mod domain;
pub mod services;
pub mod storage;
pub mod logging;
pub mod cli;

pub use domain::{BufferStatus, DependencyGraph, Project, ProjectId, Task, TaskId, TaskStatus};
pub use services::{BufferCalculationService, CriticalChainService};
