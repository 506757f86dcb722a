use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::catalog::{AvailabilityData, AvailabilityQuery, ProviderList},
    error::AppResult,
    response::ApiResponse,
    routes::params::ProviderQuery,
    services::catalog_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_providers))
        .route("/{id}/availability", get(provider_availability))
}

#[utoipa::path(
    get,
    path = "/api/providers",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("service_id" = Option<Uuid>, Query, description = "Only providers offering this service")
    ),
    responses(
        (status = 200, description = "List service providers", body = ApiResponse<ProviderList>)
    ),
    tag = "Providers"
)]
pub async fn list_providers(
    State(state): State<AppState>,
    Query(query): Query<ProviderQuery>,
) -> AppResult<Json<ApiResponse<ProviderList>>> {
    let resp = catalog_service::list_providers(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/providers/{id}/availability",
    params(
        ("id" = Uuid, Path, description = "Service provider ID"),
        ("start" = String, Query, description = "Candidate start time, RFC 3339")
    ),
    responses(
        (status = 200, description = "Whether the one-hour slot is free", body = ApiResponse<AvailabilityData>),
        (status = 404, description = "Not Found")
    ),
    tag = "Providers"
)]
pub async fn provider_availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> AppResult<Json<ApiResponse<AvailabilityData>>> {
    let resp = catalog_service::provider_availability(&state, id, query.start).await?;
    Ok(Json(resp))
}
