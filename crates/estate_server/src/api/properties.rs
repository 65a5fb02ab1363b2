//! `/api/properties` routes.
//!
//! Reads resolve `Location` to the full location unless `?populate=false`.

use crate::api::{run_blocking, ActionResponse, ApiError, AppState};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use estate_core::{NewProperty, Property, PropertyService, PropertyUpdate, SqlitePropertyRepository};
use serde::Deserialize;
use uuid::Uuid;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_properties).post(create_property))
        .route(
            "/:id",
            get(get_property)
                .put(update_property)
                .delete(delete_property),
        )
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReadParams {
    #[serde(default = "populate_by_default")]
    populate: bool,
}

fn populate_by_default() -> bool {
    true
}

async fn list_properties(
    State(state): State<AppState>,
    params: Result<Query<ReadParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params?;
    if params.populate {
        let properties = run_blocking(&state, |conn| {
            PropertyService::new(SqlitePropertyRepository::try_new(conn)?)
                .list_populated_properties()
        })
        .await?;
        return Ok(Json(properties).into_response());
    }

    let properties = run_blocking(&state, |conn| {
        PropertyService::new(SqlitePropertyRepository::try_new(conn)?).list_properties()
    })
    .await?;
    Ok(Json(properties).into_response())
}

async fn get_property(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    params: Result<Query<ReadParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = id?;
    let Query(params) = params?;
    if params.populate {
        let property = run_blocking(&state, move |conn| {
            PropertyService::new(SqlitePropertyRepository::try_new(conn)?)
                .get_populated_property(id)
        })
        .await?;
        return Ok(Json(property).into_response());
    }

    let property = run_blocking(&state, move |conn| {
        PropertyService::new(SqlitePropertyRepository::try_new(conn)?).get_property(id)
    })
    .await?;
    Ok(Json(property).into_response())
}

async fn create_property(
    State(state): State<AppState>,
    body: Result<Json<NewProperty>, JsonRejection>,
) -> Result<(StatusCode, Json<Property>), ApiError> {
    let Json(input) = body?;
    let property = run_blocking(&state, move |conn| {
        PropertyService::new(SqlitePropertyRepository::try_new(conn)?).create_property(input)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(property)))
}

async fn update_property(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<PropertyUpdate>, JsonRejection>,
) -> Result<Json<ActionResponse>, ApiError> {
    let Path(id) = id?;
    let Json(update) = body?;
    run_blocking(&state, move |conn| {
        PropertyService::new(SqlitePropertyRepository::try_new(conn)?).update_property(id, update)
    })
    .await?;
    Ok(Json(ActionResponse::success(id, "property updated")))
}

async fn delete_property(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ActionResponse>, ApiError> {
    let Path(id) = id?;
    run_blocking(&state, move |conn| {
        PropertyService::new(SqlitePropertyRepository::try_new(conn)?).delete_property(id)
    })
    .await?;
    Ok(Json(ActionResponse::success(id, "property deleted")))
}
