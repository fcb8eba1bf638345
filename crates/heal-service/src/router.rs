//! HTTP surface of the healing service

use std::collections::BTreeMap;

use axum::{
    extract::State,
    http::{Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use postpilot_core_types::{SelectorDef, SelectorMap, SelectorSet, Version};
use selector_store::fingerprint;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::proposer::{ProposalContext, SelectorProposer};
use crate::state::ServiceState;

pub fn build_router(state: ServiceState) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/selectors/get", post(get_selectors_handler))
        .route("/api/selectors/validate", post(validate_handler))
        .route("/api/selectors/heal", post(heal_handler))
        .route("/api/selectors/update", post(update_handler))
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

fn error_response(message: impl Into<String>, status: StatusCode) -> (StatusCode, Json<Value>) {
    let message = message.into();
    error!(status = status.as_u16(), message, "request failed");
    (status, Json(json!({ "success": false, "error": message })))
}

async fn health_handler(State(state): State<ServiceState>) -> Json<Value> {
    let status = state.store.status().await;
    Json(json!({
        "success": true,
        "status": "healthy",
        "version": state.api_version,
        "environment": state.environment,
        "kv": {
            "connected": status.connected,
            "currentVersion": status
                .current_version
                .map(|v| v.to_string())
                .unwrap_or_else(|| "not initialized".to_string()),
        },
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

#[derive(Debug, Default, Deserialize)]
struct GetRequest {
    #[serde(default)]
    action: Option<String>,
}

async fn get_selectors_handler(
    State(state): State<ServiceState>,
    Json(request): Json<GetRequest>,
) -> (StatusCode, Json<Value>) {
    let current = match state.store.get_current().await {
        Ok(current) => current,
        Err(err) => {
            return error_response(
                format!("Failed to get selectors: {}", err),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        }
    };

    let Some(set) = current else {
        warn!("selector store not initialized");
        return (
            StatusCode::OK,
            Json(json!({
                "success": false,
                "error": "Selectors not initialized",
                "needsInit": true,
            })),
        );
    };

    if let Some(action) = request.action.as_deref() {
        if let Some(category) = set.selectors.get(action) {
            return (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "version": set.version,
                    "selectors": category,
                })),
            );
        }
    }

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "version": set.version,
            "updatedAt": set.updated_at,
            "selectors": set.selectors,
        })),
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateRequest {
    #[serde(rename = "currentDOM")]
    current_dom: String,
    #[serde(default)]
    version: Option<Version>,
    #[serde(default)]
    failed_selectors: Vec<String>,
}

async fn validate_handler(
    State(state): State<ServiceState>,
    Json(request): Json<ValidateRequest>,
) -> (StatusCode, Json<Value>) {
    let stored = match state.store.get_fingerprint().await {
        Ok(stored) => stored,
        Err(err) => {
            return error_response(
                format!("Failed to validate: {}", err),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        }
    };
    let current = fingerprint(&request.current_dom);
    let has_change = stored.as_deref() != Some(current.as_str());
    let has_failed = !request.failed_selectors.is_empty();

    if has_change {
        warn!(stored = stored.as_deref().unwrap_or("<none>"), current = %current, "structural drift detected");
    }

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "isValid": !has_change && !has_failed,
            "hasDOMChange": has_change,
            "hasFailedSelectors": has_failed,
            "needsHealing": has_change || has_failed,
            "currentVersion": request.version,
        })),
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HealRequest {
    #[serde(rename = "currentDOM")]
    current_dom: String,
    #[serde(default)]
    failed_selectors: Vec<String>,
}

async fn heal_handler(
    State(state): State<ServiceState>,
    Json(request): Json<HealRequest>,
) -> (StatusCode, Json<Value>) {
    if request.failed_selectors.is_empty() {
        return error_response("No failed selectors specified", StatusCode::BAD_REQUEST);
    }
    info!(failed = ?request.failed_selectors, "heal requested");

    let current = match state.store.get_current().await {
        Ok(current) => current,
        Err(err) => {
            return error_response(
                format!("Failed to heal selectors: {}", err),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        }
    };

    let ctx = ProposalContext {
        snapshot: request.current_dom.clone(),
        failed: request.failed_selectors.clone(),
        previous: current.clone(),
    };
    let proposal = propose(&state, &ctx).await;

    let base = current.unwrap_or_else(|| SelectorSet::new(Version::initial()));
    let merged = base.healed(&proposal, Utc::now());

    // Persistence failures degrade durability, not the heal itself: the
    // caller still gets the merged definitions for the current attempt and
    // the next run starts from the old version again.
    if let Err(err) = state.store.publish(&merged).await {
        warn!(version = %merged.version, "healed set not persisted: {}", err);
    }
    if let Err(err) = state.store.put_fingerprint(&fingerprint(&request.current_dom)).await {
        warn!("drift baseline not persisted: {}", err);
    }

    info!(
        version = %merged.version,
        healed = proposal.len(),
        "healing completed"
    );

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "version": merged.version,
            "newSelectors": proposal,
            "message": "Selectors healed successfully",
        })),
    )
}

async fn propose(state: &ServiceState, ctx: &ProposalContext) -> BTreeMap<String, SelectorDef> {
    if let Some(generative) = &state.generative {
        match generative.propose(ctx).await {
            Ok(proposal) if !proposal.is_empty() => return proposal,
            Ok(_) => warn!("generative proposal empty, using fallback table"),
            Err(err) => warn!("generative proposal failed, using fallback table: {}", err),
        }
    }
    state
        .fallback
        .propose(ctx)
        .await
        .unwrap_or_default()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest {
    selectors: SelectorMap,
    version: Version,
    #[serde(default)]
    dom_snapshot: Option<String>,
}

async fn update_handler(
    State(state): State<ServiceState>,
    Json(request): Json<UpdateRequest>,
) -> (StatusCode, Json<Value>) {
    info!(version = %request.version, "administrative selector update");

    let set = SelectorSet::new(request.version).with_selectors(request.selectors);
    if let Err(err) = state.store.publish(&set).await {
        return error_response(
            format!("Failed to update selectors: {}", err),
            StatusCode::BAD_REQUEST,
        );
    }

    if let Some(snapshot) = request.dom_snapshot.as_deref() {
        if let Err(err) = state.store.put_fingerprint(&fingerprint(snapshot)).await {
            warn!("drift baseline not persisted: {}", err);
        }
    }

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "version": request.version,
            "message": "Selectors updated successfully",
        })),
    )
}
