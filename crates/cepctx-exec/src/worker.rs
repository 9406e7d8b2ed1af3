//! Worker bootstrap: build an engine from a distributed context, feed it the
//! assembled program, and rebuild it when the plan set changes.

use cepctx_core::hash::{hash_str, Hash256};
use cepctx_core::schema::{Schema, StreamSchema};

use crate::context::OperatorContext;
use crate::engine::{EngineFactory, EngineManager};
use crate::error::Result;

pub struct Worker<M, S = Schema> {
    context: OperatorContext<S>,
    engine: M,
    fingerprint: Hash256,
}

impl<M: EngineManager, S: StreamSchema> Worker<M, S> {
    /// Build an engine for `context` and run its full program.
    pub fn start(context: OperatorContext<S>, factory: &EngineFactory<M>) -> Result<Self> {
        let (engine, fingerprint) = Self::launch(&context, factory)?;
        #[cfg(feature = "tracing")]
        tracing::info!(
            operator = %context.display_name(),
            fingerprint = %fingerprint,
            "worker started"
        );
        Ok(Self {
            context,
            engine,
            fingerprint,
        })
    }

    /// Rebuild the engine if the assembled program changed since the last
    /// build. Returns whether a rebuild happened. On error the running engine
    /// is kept.
    pub fn refresh(&mut self, factory: &EngineFactory<M>) -> Result<bool> {
        if self.context.program_fingerprint()? == self.fingerprint {
            return Ok(false);
        }
        let (engine, fingerprint) = Self::launch(&self.context, factory)?;
        #[cfg(feature = "tracing")]
        tracing::info!(
            operator = %self.context.display_name(),
            previous = %self.fingerprint,
            fingerprint = %fingerprint,
            "execution plans changed, engine rebuilt"
        );
        self.engine = engine;
        self.fingerprint = fingerprint;
        Ok(true)
    }

    fn launch(context: &OperatorContext<S>, factory: &EngineFactory<M>) -> Result<(M, Hash256)> {
        let program = context.assemble_all()?;
        let mut engine = context.new_engine_manager(factory)?;
        engine.run(&program)?;
        Ok((engine, hash_str(&program)))
    }

    pub fn context(&self) -> &OperatorContext<S> {
        &self.context
    }

    pub fn engine(&self) -> &M {
        &self.engine
    }

    pub fn fingerprint(&self) -> Hash256 {
        self.fingerprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::StagingEngineManager;
    use crate::error::ExecError;
    use cepctx_core::error::Error;
    use cepctx_core::schema::{DataType, Field};

    fn context() -> OperatorContext {
        let mut ctx = OperatorContext::new();
        ctx.set_input_schemas([("S", Schema::new(vec![Field::new("v", DataType::Int32)]))])
            .unwrap();
        ctx.add_plan_with_id("p1", "from S select v insert into Out;")
            .unwrap();
        ctx
    }

    #[test]
    fn start_runs_full_program() {
        let factory = EngineFactory::<StagingEngineManager>::default();
        let worker = Worker::start(context(), &factory).unwrap();
        assert_eq!(
            worker.engine().programs(),
            ["define stream S (v int);from S select v insert into Out;"]
        );
    }

    #[test]
    fn refresh_only_rebuilds_on_change() {
        let factory = EngineFactory::<StagingEngineManager>::default();
        let mut worker = Worker::start(context(), &factory).unwrap();
        let first = worker.engine().instance_id();
        assert!(!worker.refresh(&factory).unwrap());
        assert_eq!(worker.engine().instance_id(), first);

        worker
            .context()
            .plans()
            .unwrap()
            .add_with_id("p2", "from S select v insert into Other;")
            .unwrap();
        assert!(worker.refresh(&factory).unwrap());
        assert_ne!(worker.engine().instance_id(), first);
        assert!(worker.engine().programs()[0].ends_with("insert into Other;"));
    }

    #[test]
    fn start_requires_initialized_plans() {
        let factory = EngineFactory::<StagingEngineManager>::default();
        let err = Worker::start(OperatorContext::<Schema>::new(), &factory)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ExecError::Core(Error::PreconditionUnset(_))
        ));
    }
}
