//! Rendering compiled configuration as a collector document

use overseer_core::{CompiledConfig, OverseerError, PipelineSpec, Result, TelemetryConfig};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize)]
struct CollectorDocument<'a> {
    receivers: &'a BTreeMap<String, serde_json::Value>,
    processors: &'a BTreeMap<String, serde_json::Value>,
    exporters: &'a BTreeMap<String, serde_json::Value>,
    service: ServiceSection<'a>,
}

#[derive(Serialize)]
struct ServiceSection<'a> {
    pipelines: &'a BTreeMap<String, PipelineSpec>,
    telemetry: &'a TelemetryConfig,
}

/// Render a [`CompiledConfig`] in the layout a collector loads.
pub trait RenderCollector {
    fn to_collector_yaml(&self) -> Result<String>;
    fn to_collector_json(&self) -> Result<serde_json::Value>;
}

impl RenderCollector for CompiledConfig {
    fn to_collector_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&document(self)).map_err(|e| OverseerError::Render {
            reason: e.to_string(),
        })
    }

    fn to_collector_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(document(self))?)
    }
}

fn document(config: &CompiledConfig) -> CollectorDocument<'_> {
    CollectorDocument {
        receivers: &config.receivers,
        processors: &config.processors,
        exporters: &config.exporters,
        service: ServiceSection {
            pipelines: &config.pipelines,
            telemetry: &config.telemetry,
        },
    }
}
