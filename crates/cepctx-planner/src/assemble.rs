//! Program assembly: stream definitions followed by plan bodies.
//!
//! Both inputs are iterated in key order, so the same schemas and plans always
//! produce the same text. No separators are inserted; definitions and bodies
//! carry their own terminators.

use cepctx_core::error::{Error, Result};
use cepctx_core::hash::{hash_str, Hash256};
use cepctx_core::schema::{SchemaRegistry, StreamSchema};

use crate::planner::{ExecutionPlanner, ReferencedStreamPlanner};
use crate::plans::PlanRegistry;

const PLANS_UNSET: &str = "execution plan registry";

pub struct PlanAssembler<'a, S, P = ReferencedStreamPlanner> {
    schemas: &'a SchemaRegistry<S>,
    plans: Option<&'a PlanRegistry>,
    planner: P,
}

impl<'a, S: StreamSchema> PlanAssembler<'a, S> {
    /// `plans` is `None` when no plan registry was ever initialized, which is
    /// distinct from an initialized but empty one.
    pub fn new(schemas: &'a SchemaRegistry<S>, plans: Option<&'a PlanRegistry>) -> Self {
        Self {
            schemas,
            plans,
            planner: ReferencedStreamPlanner,
        }
    }
}

impl<'a, S: StreamSchema, P: ExecutionPlanner> PlanAssembler<'a, S, P> {
    pub fn with_planner<Q: ExecutionPlanner>(self, planner: Q) -> PlanAssembler<'a, S, Q> {
        PlanAssembler {
            schemas: self.schemas,
            plans: self.plans,
            planner,
        }
    }

    fn plans(&self) -> Result<&'a PlanRegistry> {
        self.plans.ok_or(Error::PreconditionUnset(PLANS_UNSET))
    }

    /// Every stream definition followed by every plan body.
    pub fn assemble_all(&self) -> Result<String> {
        let plans = self.plans()?.list_all();
        let mut out = String::new();
        for (id, schema) in self.schemas.iter() {
            out.push_str(&schema.render_definition(id));
        }
        for body in plans.values() {
            out.push_str(body);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(
            streams = self.schemas.len(),
            plans = plans.len(),
            bytes = out.len(),
            "assembled execution program"
        );
        Ok(out)
    }

    /// The plan under `plan_id`, enriched by the planner.
    pub fn assemble_one(&self, plan_id: &str) -> Result<String> {
        let body = self
            .plans()?
            .get(plan_id)
            .ok_or_else(|| Error::UndefinedPlan(plan_id.to_string()))?;
        self.planner.enrich(self.schemas, &body)
    }

    /// Fingerprint of [`PlanAssembler::assemble_all`].
    pub fn fingerprint(&self) -> Result<Hash256> {
        Ok(hash_str(&self.assemble_all()?))
    }
}
