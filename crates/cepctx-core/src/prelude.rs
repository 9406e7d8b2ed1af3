//! Convenient re-exports for downstream crates.

pub use crate::config::{ExecutionConfig, TimeCharacteristic};
pub use crate::error::{Error, Result};
pub use crate::extension::{ExtensionHandle, ExtensionRegistry, ExtensionSnapshot};
pub use crate::hash::Hash256;
pub use crate::id::{ContextId, PlanId};
pub use crate::schema::{DataType, Field, Schema, SchemaRegistry, StreamSchema};
