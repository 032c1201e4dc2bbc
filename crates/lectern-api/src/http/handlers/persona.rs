//! Persona CRUD handlers.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use lectern_types::error::PersonaError;
use lectern_types::persona::{Persona, PersonaDraft, PersonaId, PersonaKind};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PersonaListQuery {
    /// `character`, `reader`, `historical`, or `unspecified`.
    pub kind: Option<String>,
}

fn parse_id(raw: &str) -> Result<PersonaId, AppError> {
    raw.parse()
        .map_err(|_| AppError::Persona(PersonaError::NotFound))
}

fn self_link(persona: &Persona) -> String {
    format!("/api/v1/personas/{}", persona.id)
}

/// POST /api/v1/personas
pub async fn create_persona(
    State(state): State<AppState>,
    Json(body): Json<PersonaDraft>,
) -> Result<Json<ApiResponse<Persona>>, AppError> {
    let start = Instant::now();
    let persona = state.persona_service.create(body).await?;
    let link = self_link(&persona);
    Ok(Json(ApiResponse::success(persona, start).with_link("self", &link)))
}

/// GET /api/v1/personas?kind=
pub async fn list_personas(
    State(state): State<AppState>,
    Query(query): Query<PersonaListQuery>,
) -> Result<Json<ApiResponse<Vec<Persona>>>, AppError> {
    let start = Instant::now();
    let kind = query
        .kind
        .as_deref()
        .map(str::parse::<PersonaKind>)
        .transpose()
        .map_err(AppError::Validation)?;
    let personas = state.persona_service.list(kind).await?;
    Ok(Json(
        ApiResponse::success(personas, start).with_link("self", "/api/v1/personas"),
    ))
}

/// GET /api/v1/personas/{id}
pub async fn get_persona(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Persona>>, AppError> {
    let start = Instant::now();
    let persona = state.persona_service.get(&parse_id(&id)?).await?;
    let link = self_link(&persona);
    Ok(Json(ApiResponse::success(persona, start).with_link("self", &link)))
}

/// PUT /api/v1/personas/{id}
pub async fn update_persona(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<PersonaDraft>,
) -> Result<Json<ApiResponse<Persona>>, AppError> {
    let start = Instant::now();
    let persona = state.persona_service.update(&parse_id(&id)?, body).await?;
    let link = self_link(&persona);
    Ok(Json(ApiResponse::success(persona, start).with_link("self", &link)))
}

/// DELETE /api/v1/personas/{id}
pub async fn delete_persona(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let id = parse_id(&id)?;
    state.persona_service.delete(&id).await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "id": id.to_string(), "deleted": true }),
        start,
    )))
}
