#![forbid(unsafe_code)]
//! cepctx: per-operator context for embedding a CEP engine in a distributed
//! stream-processing pipeline.
//!
//! Re-exports the workspace crates under one name.

pub use cepctx_core::prelude;
pub use cepctx_exec::{
    EngineFactory, EngineManager, ExecError, OperatorContext, StagingEngineManager, Worker,
};
pub use cepctx_planner::{
    parse_yaml_context, ContextDescriptor, ExecutionPlanner, PlanAssembler, PlanRegistry,
    ReferencedStreamPlanner,
};
