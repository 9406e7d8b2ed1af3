#![forbid(unsafe_code)]
//! cepctx-planner: the plan registry and everything that turns registered
//! schemas and plans into runnable program text.
//!
//! - `plans`: concurrent id → plan body registry (the only structure that
//!   stays writable after a context is distributed)
//! - `planner`: per-plan enrichment seam plus a token-based default
//! - `assemble`: deterministic program assembly and fingerprinting
//! - `dsl`: YAML context descriptors

pub mod assemble;
pub mod dsl;
pub mod planner;
pub mod plans;

pub use assemble::PlanAssembler;
pub use dsl::yaml::{parse_yaml_context, ContextDescriptor};
pub use planner::{ExecutionPlanner, ReferencedStreamPlanner};
pub use plans::PlanRegistry;
