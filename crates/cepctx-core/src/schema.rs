//! Input stream schemas and the registry that maps stream ids onto them.
//!
//! A schema is anything that can render its own stream definition text
//! (`StreamSchema`). The bundled `Schema` renders a
//! `define stream <id> (<field> <type>, ...);` statement.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{require_text, Error, Result};

/// Renders the definition text of one input stream.
///
/// The rendered text must carry its own statement terminator; assembly
/// concatenates definitions without separators.
pub trait StreamSchema {
    fn render_definition(&self, stream_id: &str) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Int32,
    Int64,
    Float32,
    Float64,
    Utf8,
    Object,
}

impl DataType {
    /// Attribute type name used in stream definitions.
    pub fn definition_name(self) -> &'static str {
        match self {
            DataType::Boolean => "bool",
            DataType::Int32 => "int",
            DataType::Int64 => "long",
            DataType::Float32 => "float",
            DataType::Float64 => "double",
            DataType::Utf8 => "string",
            DataType::Object => "object",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.definition_name())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "Boolean" | "bool" => DataType::Boolean,
            "Int32" | "int" => DataType::Int32,
            "Int64" | "long" => DataType::Int64,
            "Float32" | "float" => DataType::Float32,
            "Float64" | "double" => DataType::Float64,
            "Utf8" | "string" => DataType::Utf8,
            "Object" | "object" => DataType::Object,
            other => return Err(Error::Descriptor(format!("unknown field type '{other}'"))),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered field layout. Also used as the type descriptor of output streams.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }
}

impl StreamSchema for Schema {
    fn render_definition(&self, stream_id: &str) -> String {
        let attrs = self
            .fields
            .iter()
            .map(|f| format!("{} {}", f.name, f.data_type))
            .collect::<Vec<_>>()
            .join(", ");
        format!("define stream {stream_id} ({attrs});")
    }
}

/// Stream id → schema mapping, replaced wholesale during configuration.
///
/// Iteration is ordered by stream id so assembled programs are deterministic.
/// Callers must not replace schemas once the owning context was distributed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaRegistry<S = Schema> {
    streams: BTreeMap<String, S>,
}

impl<S> Default for SchemaRegistry<S> {
    fn default() -> Self {
        Self {
            streams: BTreeMap::new(),
        }
    }
}

impl<S> SchemaRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole mapping. Every key is validated before anything is
    /// swapped in, so a rejected call leaves the previous mapping intact.
    pub fn replace_all<K, I>(&mut self, mapping: I) -> Result<()>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, S)>,
    {
        let mut next = BTreeMap::new();
        for (id, schema) in mapping {
            let id = id.into();
            require_text(&id, "stream_id")?;
            next.insert(id, schema);
        }
        self.streams = next;
        Ok(())
    }

    pub fn get(&self, stream_id: &str) -> Result<&S> {
        require_text(stream_id, "stream_id")?;
        self.streams
            .get(stream_id)
            .ok_or_else(|| Error::UndefinedStream(stream_id.to_string()))
    }

    pub fn contains(&self, stream_id: &str) -> bool {
        self.streams.contains_key(stream_id)
    }

    /// Known stream ids, sorted.
    pub fn stream_ids(&self) -> Vec<String> {
        self.streams.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &S)> {
        self.streams.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

impl<S: StreamSchema> SchemaRegistry<S> {
    /// Definition text of a single registered stream.
    pub fn render(&self, stream_id: &str) -> Result<String> {
        Ok(self.get(stream_id)?.render_definition(stream_id))
    }
}
