//! Per-operator context: everything a worker needs to build and feed its
//! embedded CEP engine.
//!
//! Lifecycle contract (not enforced at runtime):
//! 1. Configure a single instance: schemas, extensions, plans, settings.
//! 2. Hand a [`OperatorContext::distribute`] copy to every parallel worker.
//!    From then on only the plan registry may change; replacing schemas or
//!    merging extensions after distribution is the caller's mistake.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use cepctx_core::config::{ExecutionConfig, TimeCharacteristic};
use cepctx_core::error::{require_text, Error, Result as CoreResult};
use cepctx_core::extension::{ExtensionHandle, ExtensionRegistry, ExtensionSnapshot};
use cepctx_core::hash::Hash256;
use cepctx_core::id::{ContextId, PlanId};
use cepctx_core::schema::{Schema, SchemaRegistry, StreamSchema};
use cepctx_planner::{ContextDescriptor, ExecutionPlanner, PlanAssembler, PlanRegistry};

use crate::engine::{EngineFactory, EngineManager};
use crate::error::Result;

#[derive(Debug, Serialize, Deserialize)]
pub struct OperatorContext<S = Schema> {
    id: ContextId,
    name: Option<String>,
    time_characteristic: Option<TimeCharacteristic>,
    execution_config: Option<ExecutionConfig>,
    schemas: SchemaRegistry<S>,
    extensions: ExtensionRegistry,
    plans: Option<PlanRegistry>,
    /// Output stream id → type descriptor, filled in after plan compilation.
    output_bindings: BTreeMap<String, Schema>,
}

impl<S> Default for OperatorContext<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> OperatorContext<S> {
    pub fn new() -> Self {
        Self {
            id: ContextId::generate(),
            name: None,
            time_characteristic: None,
            execution_config: None,
            schemas: SchemaRegistry::new(),
            extensions: ExtensionRegistry::new(),
            plans: None,
            output_bindings: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &ContextId {
        &self.id
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> CoreResult<()> {
        let name = name.into();
        require_text(&name, "name")?;
        self.name = Some(name);
        Ok(())
    }

    /// `"<name> (<id>)"`, or `"Unnamed (<id>)"` before a name is set.
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.name.as_deref().unwrap_or("Unnamed"), self.id)
    }

    // ---- input streams ----

    pub fn set_input_schemas<K, I>(&mut self, mapping: I) -> CoreResult<()>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, S)>,
    {
        self.schemas.replace_all(mapping)
    }

    pub fn input_schema(&self, stream_id: &str) -> CoreResult<&S> {
        self.schemas.get(stream_id)
    }

    pub fn input_stream_ids(&self) -> Vec<String> {
        self.schemas.stream_ids()
    }

    pub fn schemas(&self) -> &SchemaRegistry<S> {
        &self.schemas
    }

    // ---- extensions ----

    pub fn set_extensions<K, I>(&mut self, mapping: I) -> CoreResult<()>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ExtensionHandle)>,
    {
        self.extensions.merge(mapping)
    }

    pub fn extensions(&self) -> ExtensionSnapshot {
        self.extensions.snapshot()
    }

    // ---- execution plans ----

    /// The plan registry, creating an empty one if none exists yet.
    pub fn init_plans(&mut self) -> &PlanRegistry {
        self.plans.get_or_insert_with(PlanRegistry::new)
    }

    /// Shared handle to the plan registry, for control-path edits while
    /// workers run. Fails if no plan was ever registered.
    pub fn plans(&self) -> CoreResult<&PlanRegistry> {
        self.plans
            .as_ref()
            .ok_or(Error::PreconditionUnset("execution plan registry"))
    }

    pub fn add_plan(&mut self, body: impl Into<String>) -> CoreResult<PlanId> {
        self.init_plans().add(body)
    }

    pub fn add_plan_with_id(
        &mut self,
        id: impl Into<PlanId>,
        body: impl Into<String>,
    ) -> CoreResult<()> {
        self.init_plans().add_with_id(id, body)
    }

    pub fn update_plan(
        &mut self,
        id: impl Into<PlanId>,
        body: impl Into<String>,
    ) -> CoreResult<()> {
        self.init_plans().update(id, body)
    }

    pub fn remove_plan(&self, id: &str) -> bool {
        self.plans.as_ref().is_some_and(|p| p.remove(id))
    }

    // ---- output bindings ----

    pub fn set_output_binding(
        &mut self,
        stream_id: impl Into<String>,
        type_descriptor: Schema,
    ) -> CoreResult<()> {
        let stream_id = stream_id.into();
        require_text(&stream_id, "output stream id")?;
        self.output_bindings.insert(stream_id, type_descriptor);
        Ok(())
    }

    pub fn output_binding(&self, stream_id: &str) -> Option<&Schema> {
        self.output_bindings.get(stream_id)
    }

    pub fn output_bindings(&self) -> &BTreeMap<String, Schema> {
        &self.output_bindings
    }

    // ---- environment ----

    pub fn set_time_characteristic(&mut self, tc: TimeCharacteristic) {
        self.time_characteristic = Some(tc);
    }

    pub fn time_characteristic(&self) -> CoreResult<TimeCharacteristic> {
        self.time_characteristic
            .ok_or(Error::PreconditionUnset("time characteristic"))
    }

    pub fn set_execution_config(&mut self, config: ExecutionConfig) {
        self.execution_config = Some(config);
    }

    pub fn execution_config(&self) -> CoreResult<&ExecutionConfig> {
        self.execution_config
            .as_ref()
            .ok_or(Error::PreconditionUnset("execution config"))
    }

    // ---- engine ----

    /// Fresh engine manager with the current extensions registered.
    pub fn new_engine_manager<M: EngineManager>(&self, factory: &EngineFactory<M>) -> Result<M> {
        factory.new_engine_manager(&self.extensions.snapshot())
    }
}

impl<S: StreamSchema> OperatorContext<S> {
    fn assembler(&self) -> PlanAssembler<'_, S> {
        PlanAssembler::new(&self.schemas, self.plans.as_ref())
    }

    /// All stream definitions followed by all plan bodies.
    pub fn assemble_all(&self) -> CoreResult<String> {
        self.assembler().assemble_all()
    }

    /// One plan, enriched with only the streams it references.
    pub fn assemble_one(&self, plan_id: &str) -> CoreResult<String> {
        self.assembler().assemble_one(plan_id)
    }

    pub fn assemble_one_with<P: ExecutionPlanner>(
        &self,
        planner: P,
        plan_id: &str,
    ) -> CoreResult<String> {
        self.assembler().with_planner(planner).assemble_one(plan_id)
    }

    pub fn program_fingerprint(&self) -> CoreResult<Hash256> {
        self.assembler().fingerprint()
    }
}

impl<S: Clone> OperatorContext<S> {
    /// Copy handed to a parallel worker.
    ///
    /// The id is copied verbatim. Every registry is copied by value, including
    /// the plan registry, so the copy no longer shares plans with `self`.
    pub fn distribute(&self) -> Self {
        #[cfg(feature = "tracing")]
        tracing::debug!(context = %self.id, "distributing operator context");
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            time_characteristic: self.time_characteristic,
            execution_config: self.execution_config.clone(),
            schemas: self.schemas.clone(),
            extensions: self.extensions.clone(),
            plans: self.plans.as_ref().map(PlanRegistry::deep_copy),
            output_bindings: self.output_bindings.clone(),
        }
    }
}

impl OperatorContext<Schema> {
    /// Context configured from a parsed descriptor. The plan registry is always
    /// initialized, even when the descriptor lists no plans.
    pub fn from_descriptor(descriptor: ContextDescriptor) -> CoreResult<Self> {
        let mut ctx = Self::new();
        if let Some(name) = descriptor.name {
            ctx.set_name(name)?;
        }
        if let Some(tc) = descriptor.time_characteristic {
            ctx.set_time_characteristic(tc);
        }
        if let Some(cfg) = descriptor.execution_config {
            ctx.set_execution_config(cfg);
        }
        ctx.set_input_schemas(descriptor.schemas)?;
        ctx.set_extensions(descriptor.extensions)?;
        let plans = ctx.init_plans();
        for (id, body) in descriptor.plans {
            match id {
                Some(id) => plans.add_with_id(id, body)?,
                None => {
                    plans.add(body)?;
                }
            }
        }
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cepctx_core::schema::{DataType, Field};

    fn schema() -> Schema {
        Schema::new(vec![Field::new("v", DataType::Int64)])
    }

    #[test]
    fn display_name_keeps_the_same_id() {
        let mut ctx = OperatorContext::<Schema>::new();
        let unnamed = ctx.display_name();
        assert_eq!(unnamed, format!("Unnamed ({})", ctx.id()));
        assert_eq!(unnamed, ctx.display_name());
        ctx.set_name("X").unwrap();
        assert_eq!(ctx.display_name(), format!("X ({})", ctx.id()));
        assert!(matches!(ctx.set_name(""), Err(Error::NullArgument("name"))));
    }

    #[test]
    fn unset_settings_fail_fast() {
        let ctx = OperatorContext::<Schema>::new();
        assert_eq!(
            ctx.time_characteristic(),
            Err(Error::PreconditionUnset("time characteristic"))
        );
        assert!(matches!(
            ctx.execution_config(),
            Err(Error::PreconditionUnset("execution config"))
        ));
        assert!(ctx.plans().is_err());
        assert!(ctx.assemble_all().is_err());
        assert!(!ctx.remove_plan("p1"));
    }

    #[test]
    fn settings_round_trip() {
        let mut ctx = OperatorContext::<Schema>::new();
        ctx.set_time_characteristic(TimeCharacteristic::EventTime);
        let cfg = ExecutionConfig {
            parallelism: 3,
            ..Default::default()
        };
        ctx.set_execution_config(cfg.clone());
        assert_eq!(ctx.time_characteristic().unwrap(), TimeCharacteristic::EventTime);
        assert_eq!(ctx.execution_config().unwrap(), &cfg);
    }

    #[test]
    fn output_bindings_overwrite_silently() {
        let mut ctx = OperatorContext::<Schema>::new();
        ctx.set_output_binding("Alerts", schema()).unwrap();
        let wider = Schema::new(vec![
            Field::new("v", DataType::Int64),
            Field::new("w", DataType::Utf8),
        ]);
        ctx.set_output_binding("Alerts", wider.clone()).unwrap();
        assert_eq!(ctx.output_binding("Alerts"), Some(&wider));
        assert_eq!(ctx.output_binding("Other"), None);
        assert_eq!(ctx.output_bindings().len(), 1);
        assert!(ctx.set_output_binding(" ", schema()).is_err());
    }

    #[test]
    fn plan_lifecycle_through_context() {
        let mut ctx = OperatorContext::new();
        ctx.set_input_schemas([("S", schema())]).unwrap();
        let id = ctx.add_plan("from S select v insert into Out;").unwrap();
        assert_eq!(
            ctx.assemble_one(id.as_str()).unwrap(),
            "define stream S (v long);from S select v insert into Out;"
        );
        assert!(ctx.remove_plan(id.as_str()));
        assert!(!ctx.remove_plan(id.as_str()));
        // emptied, but still initialized
        assert_eq!(ctx.assemble_all().unwrap(), "define stream S (v long);");
    }

    #[test]
    fn distribute_copies_identity_and_detaches_plans() {
        let mut ctx = OperatorContext::new();
        ctx.set_name("op").unwrap();
        ctx.set_input_schemas([("S", schema())]).unwrap();
        ctx.add_plan_with_id("p1", "from S select v insert into Out;")
            .unwrap();

        let copy = ctx.distribute();
        assert_eq!(copy.id(), ctx.id());
        assert_eq!(copy.display_name(), ctx.display_name());
        assert_eq!(copy.assemble_all().unwrap(), ctx.assemble_all().unwrap());

        ctx.update_plan("p1", "from S select v insert into Other;")
            .unwrap();
        assert_ne!(copy.assemble_all().unwrap(), ctx.assemble_all().unwrap());
    }
}
