//! YAML context descriptors.
//!
//! Example:
//! ```yaml
//! name: fraud-detection
//! time_characteristic: EventTime
//! execution_config: { parallelism: 4 }
//! streams:
//!   - id: Payments
//!     fields:
//!       - { name: card, type: Utf8 }
//!       - { name: amount, type: Float64 }
//! extensions:
//!   "custom:velocity": "com.example.VelocityFunction"
//! plans:
//!   - id: large-payments
//!     body: "from Payments[amount > 1000.0] select card insert into Alerts;"
//!   - body: "from Payments select card, amount insert into Audit;"
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use cepctx_core::config::{ExecutionConfig, TimeCharacteristic};
use cepctx_core::error::{Error, Result};
use cepctx_core::extension::ExtensionHandle;
use cepctx_core::schema::{DataType, Field, Schema};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContextDoc {
    pub name: Option<String>,
    pub time_characteristic: Option<String>,
    pub execution_config: Option<ExecutionConfig>,
    pub streams: Vec<StreamDef>,
    pub extensions: BTreeMap<String, String>,
    pub plans: Vec<PlanDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamDef {
    pub id: String,
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanDef {
    #[serde(default)]
    pub id: Option<String>,
    pub body: String,
}

/// Typed result of parsing a descriptor, ready to apply onto a context.
#[derive(Debug, Clone, Default)]
pub struct ContextDescriptor {
    pub name: Option<String>,
    pub time_characteristic: Option<TimeCharacteristic>,
    pub execution_config: Option<ExecutionConfig>,
    pub schemas: BTreeMap<String, Schema>,
    pub extensions: BTreeMap<String, ExtensionHandle>,
    /// Plans in document order; `None` ids get generated on apply.
    pub plans: Vec<(Option<String>, String)>,
}

fn to_schema(stream: &StreamDef) -> Result<Schema> {
    let fields = stream
        .fields
        .iter()
        .map(|f| -> Result<Field> {
            Ok(Field::new(f.name.clone(), f.data_type.parse::<DataType>()?))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Schema::new(fields))
}

pub fn parse_yaml_context(yaml_src: &str) -> Result<ContextDescriptor> {
    let doc: ContextDoc =
        serde_yaml::from_str(yaml_src).map_err(|e| Error::Descriptor(e.to_string()))?;

    let time_characteristic = doc
        .time_characteristic
        .as_deref()
        .map(str::parse::<TimeCharacteristic>)
        .transpose()?;

    let mut schemas = BTreeMap::new();
    for stream in &doc.streams {
        if schemas.insert(stream.id.clone(), to_schema(stream)?).is_some() {
            return Err(Error::Descriptor(format!(
                "stream '{}' is defined twice",
                stream.id
            )));
        }
    }

    let mut seen = BTreeSet::new();
    for id in doc.plans.iter().filter_map(|p| p.id.as_deref()) {
        if !seen.insert(id) {
            return Err(Error::Descriptor(format!("plan '{id}' is defined twice")));
        }
    }

    Ok(ContextDescriptor {
        name: doc.name,
        time_characteristic,
        execution_config: doc.execution_config,
        schemas,
        extensions: doc
            .extensions
            .into_iter()
            .map(|(k, v)| (k, ExtensionHandle::new(v)))
            .collect(),
        plans: doc.plans.into_iter().map(|p| (p.id, p.body)).collect(),
    })
}
