//! HTTP routes of the platform API

use crate::distribution::PushOutcome;
use crate::error::ApiError;
use crate::state::{AppState, Deployment};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use overseer_core::{
    endpoints, AgentId, AgentRecord, AgentState, OverseerError, PipelineGraph, VERSION,
};
use pipeline_compiler::{compile, RenderCollector};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

type ApiResult<T> = Result<T, ApiError>;

const DEFAULT_SERIES_LIMIT: usize = 60;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(endpoints::HEALTH, get(health_check))
        .route(endpoints::METRICS, get(platform_metrics))
        .route(
            endpoints::API_V1_AGENTS,
            get(list_agents).post(register_agent),
        )
        .route(endpoints::API_V1_AGENT, get(get_agent).delete(remove_agent))
        .route(endpoints::API_V1_AGENT_METRICS, get(agent_metrics))
        .route(endpoints::API_V1_PIPELINES, get(list_deployments))
        .route(endpoints::API_V1_PIPELINES_COMPILE, post(compile_pipeline))
        .route(endpoints::API_V1_PIPELINES_DEPLOY, post(deploy_pipeline))
        .with_state(state)
}

#[instrument]
async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "overseer-platform",
        "version": VERSION
    }))
}

#[instrument(skip(state))]
async fn platform_metrics(State(state): State<Arc<AppState>>) -> Json<Value> {
    let agents = state.monitor.list_agents();
    let connected = agents
        .iter()
        .filter(|a| a.state == AgentState::Connected)
        .count();
    let config = state.monitor.config();

    Json(json!({
        "service": "overseer-platform",
        "tracked_agents": agents.len(),
        "connected_agents": connected,
        "workers": config.workers,
        "queue_capacity": config.queue_capacity(),
        "deployed_pipelines": state.deployment_count(),
        "uptime_secs": (Utc::now() - state.started_at).num_seconds()
    }))
}

#[instrument(skip(state))]
async fn list_agents(State(state): State<Arc<AppState>>) -> Json<Value> {
    let agents = state.monitor.list_agents();
    Json(json!({
        "total": agents.len(),
        "agents": agents
    }))
}

#[instrument(skip(state))]
async fn register_agent(
    State(state): State<Arc<AppState>>,
    Json(record): Json<AgentRecord>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    if record.id.trim().is_empty() || record.hostname.trim().is_empty() {
        return Err(OverseerError::invalid_config("agent id and hostname must not be empty").into());
    }

    state
        .monitor
        .add_agent(&record.id, &record.hostname, record.ip)?;
    let stored = AgentRecord::new(record.id.clone(), record.hostname, record.ip);
    if let Err(e) = state.store.register_agent(&stored).await {
        state.monitor.remove_agent(&record.id);
        return Err(e.into());
    }

    let status = state.monitor.get_agent(&record.id)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "registered", "agent": status })),
    ))
}

#[instrument(skip(state))]
async fn get_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<AgentId>,
) -> ApiResult<Json<Value>> {
    let status = state.monitor.get_agent(&id)?;
    Ok(Json(json!({ "agent": status })))
}

#[instrument(skip(state))]
async fn remove_agent(State(state): State<Arc<AppState>>, Path(id): Path<AgentId>) -> StatusCode {
    state.monitor.remove_agent(&id);
    if let Err(e) = state.store.remove_agent(&id).await {
        warn!(agent_id = %id, error = %e, "Failed to delete agent from store");
    }
    StatusCode::NO_CONTENT
}

#[derive(Debug, Deserialize)]
struct SeriesQuery {
    limit: Option<usize>,
}

#[instrument(skip(state))]
async fn agent_metrics(
    State(state): State<Arc<AppState>>,
    Path(id): Path<AgentId>,
    Query(query): Query<SeriesQuery>,
) -> ApiResult<Json<Value>> {
    let tracked = state.monitor.get_agent(&id).ok();
    let aggregated = state.store.aggregated_metrics(&id).await?;
    if tracked.is_none() && aggregated.is_none() {
        return Err(OverseerError::agent_not_found(id).into());
    }

    let limit = query.limit.unwrap_or(DEFAULT_SERIES_LIMIT);
    let realtime = state.store.realtime_metrics(&id, limit).await?;
    Ok(Json(json!({
        "agent_id": id,
        "state": tracked.map(|s| s.state),
        "aggregated": aggregated,
        "realtime": realtime
    })))
}

#[instrument(skip_all)]
async fn compile_pipeline(Json(graph): Json<PipelineGraph>) -> ApiResult<Json<Value>> {
    let compiled = compile(&graph)?;
    Ok(Json(json!({
        "pipelines": compiled.pipelines.len(),
        "config": compiled.to_collector_json()?,
        "yaml": compiled.to_collector_yaml()?
    })))
}

#[derive(Debug, Deserialize)]
pub struct DeployRequest {
    pub name: String,
    pub graph: PipelineGraph,
    pub agent_ids: Vec<AgentId>,
}

/// Compile, then push to every requested agent. Nothing is pushed when the
/// graph does not compile. Agents that are not tracked are reported as
/// failed outcomes after the attempted ones.
#[instrument(skip_all)]
async fn deploy_pipeline(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DeployRequest>,
) -> ApiResult<Json<Value>> {
    if request.name.trim().is_empty() {
        return Err(OverseerError::invalid_config("deployment name must not be empty").into());
    }
    if request.agent_ids.is_empty() {
        return Err(OverseerError::invalid_config("deployment needs at least one agent").into());
    }

    let compiled = compile(&request.graph)?;
    let yaml = compiled.to_collector_yaml()?;

    let mut seen = HashSet::new();
    let agent_ids: Vec<AgentId> = request
        .agent_ids
        .into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect();

    let mut targets = Vec::with_capacity(agent_ids.len());
    let mut untracked = Vec::new();
    for id in &agent_ids {
        match state.monitor.get_agent(id) {
            Ok(status) => targets.push(status),
            Err(e) => untracked.push(PushOutcome::failed(id.clone(), &e)),
        }
    }

    let mut outcomes = state.distributor.distribute(targets, &yaml).await;
    outcomes.extend(untracked);

    let deployment = Deployment {
        id: Uuid::new_v4(),
        name: request.name,
        graph: request.graph,
        agent_ids,
        outcomes,
        deployed_at: Utc::now(),
    };
    info!(
        deployment_id = %deployment.id,
        name = %deployment.name,
        pipelines = compiled.pipelines.len(),
        delivered = deployment.delivered(),
        "Pipeline deployed"
    );

    let body = json!({
        "delivered": deployment.delivered(),
        "deployment": deployment
    });
    state.record_deployment(deployment);
    Ok(Json(body))
}

#[instrument(skip(state))]
async fn list_deployments(State(state): State<Arc<AppState>>) -> Json<Value> {
    let deployments = state.deployments();
    Json(json!({
        "total": deployments.len(),
        "deployments": deployments
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::Distributor;
    use agent_metrics::{MetricSet, MetricsSource};
    use axum::body::Body;
    use axum::http::Request;
    use fleet_monitor::{FleetHealthMonitor, FleetStore, MemoryStore};
    use overseer_core::{DistributionConfig, MonitorConfig, Result};
    use tower::ServiceExt;

    struct Silent;

    #[async_trait::async_trait]
    impl MetricsSource for Silent {
        async fn fetch(&self, host: &str) -> Result<MetricSet> {
            Err(OverseerError::fetch(host, "connection refused"))
        }
    }

    fn state() -> (Arc<AppState>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let monitor =
            FleetHealthMonitor::new(MonitorConfig::default(), store.clone(), Arc::new(Silent))
                .unwrap();
        let distributor = Distributor::new(&DistributionConfig::default()).unwrap();
        let state = AppState::new(Arc::new(monitor), store.clone(), distributor);
        (Arc::new(state), store)
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn agent_body(id: &str) -> Value {
        json!({ "id": id, "hostname": format!("{id}.local"), "ip": "10.0.0.5" })
    }

    fn chain() -> Value {
        json!({
            "nodes": [
                { "id": "1", "name": "otlp in", "role": "receiver", "type": "otlp" },
                { "id": "2", "name": "debug out", "role": "exporter", "type": "debug" }
            ],
            "edges": [{ "source": "1", "target": "2" }]
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _) = state();
        let (status, body) = send(router(state), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_register_then_conflict() {
        let (state, store) = state();
        let app = router(state.clone());

        let (status, body) =
            send(app.clone(), "POST", "/api/v1/agents", Some(agent_body("edge-1"))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["agent"]["state"], "unknown");
        assert_eq!(body["agent"]["retries_remaining"], 3);
        assert!(store.agent("edge-1").is_some());

        let (status, body) =
            send(app, "POST", "/api/v1/agents", Some(agent_body("edge-1"))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("edge-1"));
        assert_eq!(state.monitor.tracked(), 1);
    }

    #[tokio::test]
    async fn test_get_and_delete_agent() {
        let (state, store) = state();
        let app = router(state);
        send(app.clone(), "POST", "/api/v1/agents", Some(agent_body("edge-1"))).await;

        let (status, body) = send(app.clone(), "GET", "/api/v1/agents/edge-1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["agent"]["hostname"], "edge-1.local");

        let (status, _) = send(app.clone(), "DELETE", "/api/v1/agents/edge-1", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(app.clone(), "DELETE", "/api/v1/agents/edge-1", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(app, "GET", "/api/v1/agents/edge-1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());
        assert!(store.agent("edge-1").is_none());
    }

    #[tokio::test]
    async fn test_blank_registration_rejected() {
        let (state, _) = state();
        let body = json!({ "id": "", "hostname": "h", "ip": "10.0.0.5" });
        let (status, _) = send(router(state), "POST", "/api/v1/agents", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_agent_metrics_unknown_is_404() {
        let (state, _) = state();
        let (status, _) = send(router(state), "GET", "/api/v1/agents/ghost/metrics", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_agent_metrics_for_tracked_agent() {
        let (state, store) = state();
        let app = router(state);
        send(app.clone(), "POST", "/api/v1/agents", Some(agent_body("edge-1"))).await;
        store
            .update_agent_status("edge-1", AgentState::Unknown)
            .await
            .unwrap();

        let (status, body) =
            send(app, "GET", "/api/v1/agents/edge-1/metrics?limit=5", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "unknown");
        assert_eq!(body["realtime"], json!([]));
    }

    #[tokio::test]
    async fn test_compile_endpoint() {
        let (state, _) = state();
        let (status, body) =
            send(router(state), "POST", "/api/v1/pipelines/compile", Some(chain())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pipelines"], 1);
        assert!(body["config"]["service"]["pipelines"].is_object());
        assert!(body["yaml"].as_str().unwrap().contains("receivers:"));
    }

    #[tokio::test]
    async fn test_compile_rejects_unknown_role() {
        let (state, _) = state();
        let graph = json!({
            "nodes": [{ "id": "1", "name": "x", "role": "router", "type": "otlp" }]
        });
        let (status, body) =
            send(router(state), "POST", "/api/v1/pipelines/compile", Some(graph)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("router"));
    }

    #[tokio::test]
    async fn test_deploy_to_untracked_agent_is_recorded() {
        let (state, _) = state();
        let app = router(state.clone());
        let request = json!({ "name": "edge", "graph": chain(), "agent_ids": ["ghost", "ghost"] });

        let (status, body) =
            send(app.clone(), "POST", "/api/v1/pipelines/deploy", Some(request)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["delivered"], 0);
        assert_eq!(body["deployment"]["outcomes"].as_array().unwrap().len(), 1);

        let (_, body) = send(app, "GET", "/api/v1/pipelines", None).await;
        assert_eq!(body["total"], 1);
        assert_eq!(state.deployment_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_compile_deploys_nothing() {
        let (state, _) = state();
        let request = json!({ "name": "edge", "graph": { "nodes": [] }, "agent_ids": ["a"] });
        let (status, _) = send(
            router(state.clone()),
            "POST",
            "/api/v1/pipelines/deploy",
            Some(request),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(state.deployment_count(), 0);
    }

    #[tokio::test]
    async fn test_platform_metrics() {
        let (state, _) = state();
        let app = router(state);
        send(app.clone(), "POST", "/api/v1/agents", Some(agent_body("edge-1"))).await;
        let (_, body) = send(app, "GET", "/metrics", None).await;
        assert_eq!(body["tracked_agents"], 1);
        assert_eq!(body["queue_capacity"], 8);
        assert_eq!(body["deployed_pipelines"], 0);
    }
}
