//! Environment settings a context carries to every worker: the time
//! semantics of the hosting pipeline and its execution configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Notion of time the hosting pipeline runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeCharacteristic {
    ProcessingTime,
    IngestionTime,
    EventTime,
}

impl fmt::Display for TimeCharacteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeCharacteristic::ProcessingTime => "ProcessingTime",
            TimeCharacteristic::IngestionTime => "IngestionTime",
            TimeCharacteristic::EventTime => "EventTime",
        };
        f.write_str(s)
    }
}

impl FromStr for TimeCharacteristic {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['_', '-'], "").as_str() {
            "processingtime" | "processing" => Ok(TimeCharacteristic::ProcessingTime),
            "ingestiontime" | "ingestion" => Ok(TimeCharacteristic::IngestionTime),
            "eventtime" | "event" => Ok(TimeCharacteristic::EventTime),
            _ => Err(Error::Descriptor(format!(
                "unknown time characteristic '{s}'"
            ))),
        }
    }
}

/// Execution configuration of the hosting pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutionConfig {
    /// Default parallelism of operators that do not set their own.
    pub parallelism: usize,

    /// Upper bound for rescaling; `None` leaves it to the pipeline.
    pub max_parallelism: Option<usize>,

    /// Interval between automatic watermark emissions (event time only).
    pub auto_watermark_interval_ms: u64,

    /// Whether records may be reused between operator calls.
    pub object_reuse: bool,

    /// Restart attempts before the job is failed.
    pub restart_attempts: u32,

    /// Free-form job parameters visible to every worker.
    pub global_job_parameters: BTreeMap<String, String>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            parallelism: 1,
            max_parallelism: None,
            auto_watermark_interval_ms: 200,
            object_reuse: false,
            restart_attempts: 3,
            global_job_parameters: BTreeMap::new(),
        }
    }
}

impl ExecutionConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `CEPCTX_PARALLELISM`: default parallelism
    /// - `CEPCTX_MAX_PARALLELISM`: max parallelism
    /// - `CEPCTX_AUTO_WATERMARK_INTERVAL_MS`: watermark interval
    /// - `CEPCTX_OBJECT_REUSE`: `true`/`false`
    /// - `CEPCTX_RESTART_ATTEMPTS`: restart attempts
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ExecutionConfig::from_env`] with an explicit variable source.
    /// Unparseable values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(v) = lookup("CEPCTX_PARALLELISM").and_then(|s| s.parse::<usize>().ok()) {
            cfg.parallelism = v;
        }

        if let Some(v) = lookup("CEPCTX_MAX_PARALLELISM").and_then(|s| s.parse::<usize>().ok()) {
            cfg.max_parallelism = Some(v);
        }

        if let Some(v) =
            lookup("CEPCTX_AUTO_WATERMARK_INTERVAL_MS").and_then(|s| s.parse::<u64>().ok())
        {
            cfg.auto_watermark_interval_ms = v;
        }

        if let Some(v) = lookup("CEPCTX_OBJECT_REUSE").and_then(|s| s.parse::<bool>().ok()) {
            cfg.object_reuse = v;
        }

        if let Some(v) = lookup("CEPCTX_RESTART_ATTEMPTS").and_then(|s| s.parse::<u32>().ok()) {
            cfg.restart_attempts = v;
        }

        cfg
    }
}
