// Management API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{ApiError, ApiJson, ApiQuery, AppState};
use crate::config::{
    edit, AmpOpenAIProvider, AmpRoutingMode, AmpSlot, AppConfig, ModelMapping, SlotMapping,
};
use crate::router::{self, RequestOrigin, Resolution};

// Root endpoint
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "CLI Proxy API model router",
        "endpoints": [
            "GET /management/status",
            "GET|PUT /management/config",
            "GET|POST /management/model-mappings",
            "GET|PUT /management/routing",
            "GET|POST /management/amp-providers",
            "POST /management/resolve"
        ]
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    pub running: bool,
    pub host: String,
    pub port: u16,
    pub config_path: String,
}

pub async fn get_status(State(state): State<AppState>) -> Json<ServerStatus> {
    let config = state.store.snapshot();
    Json(ServerStatus {
        running: super::is_server_running(),
        host: config.host,
        port: config.port,
        config_path: state.store.path().display().to_string(),
    })
}

pub async fn get_config(State(state): State<AppState>) -> Json<AppConfig> {
    Json(state.store.snapshot())
}

pub async fn put_config(
    State(state): State<AppState>,
    ApiJson(config): ApiJson<AppConfig>,
) -> Result<Json<AppConfig>, ApiError> {
    state.store.replace(config)?;
    Ok(Json(state.store.snapshot()))
}

/// Which mapping list a request edits
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingTable {
    #[default]
    Custom,
    Amp,
}

#[derive(Debug, Default, Deserialize)]
pub struct TableQuery {
    #[serde(default)]
    pub table: MappingTable,
}

fn table_mut(config: &mut AppConfig, table: MappingTable) -> &mut Vec<ModelMapping> {
    match table {
        MappingTable::Custom => &mut config.custom_model_mappings,
        MappingTable::Amp => &mut config.amp_model_mappings,
    }
}

fn table_of(config: AppConfig, table: MappingTable) -> Vec<ModelMapping> {
    match table {
        MappingTable::Custom => config.custom_model_mappings,
        MappingTable::Amp => config.amp_model_mappings,
    }
}

pub async fn list_mappings(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TableQuery>,
) -> Json<Vec<ModelMapping>> {
    Json(table_of(state.store.snapshot(), query.table))
}

pub async fn add_mapping(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TableQuery>,
    ApiJson(mapping): ApiJson<ModelMapping>,
) -> Result<impl IntoResponse, ApiError> {
    let list = state.store.update(|cfg| {
        let list = table_mut(cfg, query.table);
        edit::add_mapping(list, mapping)?;
        Ok(list.clone())
    })?;
    Ok((StatusCode::CREATED, Json(list)))
}

pub async fn update_mapping(
    State(state): State<AppState>,
    Path(from): Path<String>,
    ApiQuery(query): ApiQuery<TableQuery>,
    ApiJson(mapping): ApiJson<ModelMapping>,
) -> Result<Json<Vec<ModelMapping>>, ApiError> {
    let list = state.store.update(|cfg| {
        let list = table_mut(cfg, query.table);
        edit::update_mapping(list, &from, mapping)?;
        Ok(list.clone())
    })?;
    Ok(Json(list))
}

pub async fn delete_mapping(
    State(state): State<AppState>,
    Path(from): Path<String>,
    ApiQuery(query): ApiQuery<TableQuery>,
) -> Result<Json<Vec<ModelMapping>>, ApiError> {
    let list = state.store.update(|cfg| {
        let list = table_mut(cfg, query.table);
        edit::remove_mapping(list, &from)?;
        Ok(list.clone())
    })?;
    Ok(Json(list))
}

#[derive(Debug, Deserialize)]
pub struct EnabledBody {
    pub enabled: bool,
}

pub async fn set_mapping_enabled(
    State(state): State<AppState>,
    Path(from): Path<String>,
    ApiQuery(query): ApiQuery<TableQuery>,
    ApiJson(body): ApiJson<EnabledBody>,
) -> Result<Json<Vec<ModelMapping>>, ApiError> {
    let list = state.store.update(|cfg| {
        let list = table_mut(cfg, query.table);
        edit::set_mapping_enabled(list, &from, body.enabled)?;
        Ok(list.clone())
    })?;
    Ok(Json(list))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingSettings {
    pub amp_routing_mode: AmpRoutingMode,
    pub amp_default_model: String,
    pub force_model_mappings: bool,
    pub predefined_slots: Vec<SlotMapping>,
}

impl From<AppConfig> for RoutingSettings {
    fn from(config: AppConfig) -> Self {
        Self {
            amp_routing_mode: config.amp_routing_mode,
            amp_default_model: config.amp_default_model,
            force_model_mappings: config.force_model_mappings,
            predefined_slots: config.predefined_slots,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingPatch {
    /// Parsed strictly; unknown modes are rejected rather than read as `mappings`
    pub amp_routing_mode: Option<String>,
    pub amp_default_model: Option<String>,
    pub force_model_mappings: Option<bool>,
}

pub async fn get_routing(State(state): State<AppState>) -> Json<RoutingSettings> {
    Json(state.store.snapshot().into())
}

pub async fn put_routing(
    State(state): State<AppState>,
    ApiJson(patch): ApiJson<RoutingPatch>,
) -> Result<Json<RoutingSettings>, ApiError> {
    let mode = patch
        .amp_routing_mode
        .as_deref()
        .map(str::parse::<AmpRoutingMode>)
        .transpose()?;

    let config = state.store.update(|cfg| {
        if let Some(mode) = mode {
            cfg.amp_routing_mode = mode;
        }
        if let Some(model) = patch.amp_default_model {
            cfg.amp_default_model = model.trim().to_string();
        }
        if let Some(force) = patch.force_model_mappings {
            cfg.force_model_mappings = force;
        }
        Ok(cfg.clone())
    })?;

    tracing::info!(
        "Routing updated: mode={}, force_model_mappings={}",
        config.amp_routing_mode.as_str(),
        config.force_model_mappings
    );
    Ok(Json(config.into()))
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct SlotBody {
    pub to: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

pub async fn put_slot(
    State(state): State<AppState>,
    Path(slot): Path<String>,
    ApiJson(body): ApiJson<SlotBody>,
) -> Result<Json<Vec<SlotMapping>>, ApiError> {
    let slot = AmpSlot::parse(&slot)
        .ok_or_else(|| ApiError::bad_request(format!("Unknown slot: {}", slot)))?;

    let slots = state.store.update(|cfg| {
        edit::set_slot(&mut cfg.predefined_slots, slot, body.to, body.enabled)?;
        Ok(cfg.predefined_slots.clone())
    })?;
    Ok(Json(slots))
}

pub async fn list_providers(State(state): State<AppState>) -> Json<Vec<AmpOpenAIProvider>> {
    Json(state.store.snapshot().amp_openai_providers)
}

pub async fn add_provider(
    State(state): State<AppState>,
    ApiJson(provider): ApiJson<AmpOpenAIProvider>,
) -> Result<impl IntoResponse, ApiError> {
    let id = state
        .store
        .update(|cfg| edit::add_amp_provider(&mut cfg.amp_openai_providers, provider))?;
    tracing::info!("Added OpenAI-compatible provider {}", id);
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

pub async fn update_provider(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(mut provider): ApiJson<AmpOpenAIProvider>,
) -> Result<Json<AmpOpenAIProvider>, ApiError> {
    provider.id = id;
    let stored = provider.clone();
    state
        .store
        .update(|cfg| edit::update_amp_provider(&mut cfg.amp_openai_providers, provider))?;
    Ok(Json(stored))
}

pub async fn delete_provider(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .store
        .update(|cfg| edit::delete_amp_provider(&mut cfg.amp_openai_providers, &id))?;
    tracing::info!("Deleted OpenAI-compatible provider {}", id);
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ResolveBody {
    pub model: String,
    /// Explicit origin; takes priority over `path`
    #[serde(default)]
    pub origin: Option<RequestOrigin>,
    /// Inbound request path, used to detect Amp traffic
    #[serde(default)]
    pub path: Option<String>,
}

pub async fn resolve(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ResolveBody>,
) -> Result<Json<Resolution>, ApiError> {
    let origin = body
        .origin
        .or_else(|| body.path.as_deref().map(RequestOrigin::from_path))
        .unwrap_or_default();

    let config = state.store.snapshot();
    let resolution = router::resolve_model(&config, origin, &body.model)?;
    Ok(Json(resolution))
}
