//! Engine managers and the factory that builds a fresh one per worker.
//!
//! Every call to [`EngineFactory::new_engine_manager`] constructs a new
//! manager; instances are never cached, since each worker needs its own
//! runtime state.

use std::collections::BTreeMap;
use std::fmt;

use uuid::Uuid;

use cepctx_core::extension::{ExtensionHandle, ExtensionSnapshot};

use crate::error::{ExecError, Result};

/// Runtime that compiles and executes programs against registered extensions.
pub trait EngineManager: Send {
    fn register_extension(&mut self, name: &str, handle: ExtensionHandle) -> Result<()>;

    /// Extensions registered on this instance.
    fn extensions(&self) -> BTreeMap<String, ExtensionHandle>;

    /// Accept a runnable program text.
    fn run(&mut self, program: &str) -> Result<()>;
}

/// Engine manager that stages extensions and programs without interpreting
/// them. Used where no query runtime is linked in (CLI dry runs, tests).
#[derive(Debug, Clone)]
pub struct StagingEngineManager {
    instance: Uuid,
    extensions: BTreeMap<String, ExtensionHandle>,
    programs: Vec<String>,
}

impl Default for StagingEngineManager {
    fn default() -> Self {
        Self {
            instance: Uuid::new_v4(),
            extensions: BTreeMap::new(),
            programs: Vec::new(),
        }
    }
}

impl StagingEngineManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Distinguishes instances built by the same factory.
    pub fn instance_id(&self) -> Uuid {
        self.instance
    }

    /// Programs accepted so far, oldest first.
    pub fn programs(&self) -> &[String] {
        &self.programs
    }
}

impl EngineManager for StagingEngineManager {
    fn register_extension(&mut self, name: &str, handle: ExtensionHandle) -> Result<()> {
        if handle.as_str().trim().is_empty() {
            return Err(ExecError::Extension {
                name: name.to_string(),
                reason: "empty implementation handle".into(),
            });
        }
        self.extensions.insert(name.to_string(), handle);
        Ok(())
    }

    fn extensions(&self) -> BTreeMap<String, ExtensionHandle> {
        self.extensions.clone()
    }

    fn run(&mut self, program: &str) -> Result<()> {
        if program.trim().is_empty() {
            return Err(ExecError::Program("program text is empty".into()));
        }
        self.programs.push(program.to_string());
        Ok(())
    }
}

/// Builds engine managers and registers extensions onto them.
pub struct EngineFactory<M> {
    make: Box<dyn Fn() -> M + Send + Sync>,
}

impl<M: EngineManager + Default + 'static> Default for EngineFactory<M> {
    fn default() -> Self {
        Self::with_constructor(M::default)
    }
}

impl<M: EngineManager> EngineFactory<M> {
    pub fn with_constructor(make: impl Fn() -> M + Send + Sync + 'static) -> Self {
        Self {
            make: Box::new(make),
        }
    }

    /// New, independent manager with every extension in `extensions`
    /// registered by name.
    pub fn new_engine_manager(&self, extensions: &ExtensionSnapshot) -> Result<M> {
        let mut manager = (self.make)();
        for (name, handle) in extensions.iter() {
            manager.register_extension(name, handle.clone())?;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(
            extensions = extensions.len(),
            "created engine manager"
        );
        Ok(manager)
    }
}

impl<M> fmt::Debug for EngineFactory<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineFactory")
            .field("manager", &std::any::type_name::<M>())
            .finish()
    }
}
