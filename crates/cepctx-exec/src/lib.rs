#![forbid(unsafe_code)]
//! cepctx-exec: the operator context that gets distributed to parallel
//! workers, the factory that builds one engine manager per worker, and a small
//! worker bootstrap that feeds assembled programs to that engine.

pub mod context;
pub mod engine;
pub mod error;
pub mod worker;

pub use context::OperatorContext;
pub use engine::{EngineFactory, EngineManager, StagingEngineManager};
pub use error::{ExecError, Result};
pub use worker::Worker;
