//! `/api/location` routes.

use crate::api::{run_blocking, ActionResponse, ApiError, AppState};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use estate_core::{
    Location, LocationDeletePolicy, LocationService, LocationUpdate, NewLocation,
    PopulatedLocation, SqliteLocationRepository,
};
use serde::Deserialize;
use uuid::Uuid;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_locations).post(create_location))
        .route(
            "/:id",
            get(get_location)
                .put(update_location)
                .delete(delete_location),
        )
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeleteParams {
    policy: Option<LocationDeletePolicy>,
}

async fn list_locations(
    State(state): State<AppState>,
) -> Result<Json<Vec<PopulatedLocation>>, ApiError> {
    let locations = run_blocking(&state, |conn| {
        LocationService::new(SqliteLocationRepository::try_new(conn)?).list_populated_locations()
    })
    .await?;
    Ok(Json(locations))
}

async fn get_location(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<PopulatedLocation>, ApiError> {
    let Path(id) = id?;
    let location = run_blocking(&state, move |conn| {
        LocationService::new(SqliteLocationRepository::try_new(conn)?).get_populated_location(id)
    })
    .await?;
    Ok(Json(location))
}

async fn create_location(
    State(state): State<AppState>,
    body: Result<Json<NewLocation>, JsonRejection>,
) -> Result<(StatusCode, Json<Location>), ApiError> {
    let Json(input) = body?;
    let location = run_blocking(&state, move |conn| {
        LocationService::new(SqliteLocationRepository::try_new(conn)?).create_location(input)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(location)))
}

async fn update_location(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<LocationUpdate>, JsonRejection>,
) -> Result<Json<ActionResponse>, ApiError> {
    let Path(id) = id?;
    let Json(update) = body?;
    run_blocking(&state, move |conn| {
        LocationService::new(SqliteLocationRepository::try_new(conn)?).update_location(id, update)
    })
    .await?;
    Ok(Json(ActionResponse::success(id, "location updated")))
}

async fn delete_location(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    params: Result<Query<DeleteParams>, QueryRejection>,
) -> Result<Json<ActionResponse>, ApiError> {
    let Path(id) = id?;
    let Query(params) = params?;
    let policy = params.policy.unwrap_or_default();
    let deletion = run_blocking(&state, move |conn| {
        LocationService::new(SqliteLocationRepository::try_new(conn)?).delete_location(id, policy)
    })
    .await?;

    let verb = match deletion.policy {
        LocationDeletePolicy::Orphan => "unassigned",
        LocationDeletePolicy::Cascade => "deleted",
    };
    Ok(Json(ActionResponse::success(
        id,
        format!(
            "location deleted; {} propert{} {verb}",
            deletion.affected_properties.len(),
            if deletion.affected_properties.len() == 1 { "y" } else { "ies" }
        ),
    )))
}
