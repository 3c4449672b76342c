// HTTP request handlers
use crate::application::air_quality_service::DateRange;
use crate::domain::category::CategoryBand;
use crate::domain::dashboard::{DashboardOverview, DashboardStatistics, StationSnapshot};
use crate::domain::reading::{NewReading, Reading};
use crate::domain::station::{NewStation, Station, StationPatch};
use crate::infrastructure::http_response::{ApiFailure, ApiSuccess, created, ok};
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DATE_FORMAT: &str = "%Y-%m-%d";

type HandlerResult<T> = Result<ApiSuccess<T>, ApiFailure>;

#[derive(Deserialize)]
pub struct StationQuery {
    pub province: Option<String>,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: &'static str,
}

fn parse_id(raw: &str) -> Result<i64, ApiFailure> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiFailure::invalid_id(raw))
}

fn parse_date(raw: Option<&str>, field: &str) -> Result<Option<NaiveDate>, ApiFailure> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, DATE_FORMAT)
            .map(Some)
            .map_err(|_| ApiFailure::invalid_date(format!("{field} '{value}' is not YYYY-MM-DD"))),
    }
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiFailure> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiFailure::validation(rejection.body_text()))
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiFailure> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| ApiFailure::validation(rejection.body_text()))
}

/// Health check endpoint
pub async fn health_check() -> ApiSuccess<HealthStatus> {
    ok(
        HealthStatus {
            status: "healthy",
            service: env!("CARGO_PKG_NAME"),
        },
        "Service is running",
    )
}

pub async fn list_stations(
    State(state): State<Arc<AppState>>,
    query: Result<Query<StationQuery>, QueryRejection>,
) -> HandlerResult<Vec<Station>> {
    let query = query_params(query)?;
    let province = query.province.as_deref().map(str::trim).filter(|p| !p.is_empty());
    let stations = match province {
        Some(province) => state.station_service.list_by_province(province).await,
        None => state.station_service.list_stations().await,
    }
    .map_err(|e| ApiFailure::from_app(e, "FETCH_ERROR", "Failed to fetch stations"))?;
    Ok(ok(stations, "Stations retrieved successfully"))
}

pub async fn get_station(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> HandlerResult<Station> {
    let id = parse_id(&id)?;
    let station = state
        .station_service
        .get_station(id)
        .await
        .map_err(|e| ApiFailure::from_app(e, "FETCH_ERROR", "Failed to fetch station"))?;
    Ok(ok(station, "Station retrieved successfully"))
}

pub async fn create_station(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewStation>, JsonRejection>,
) -> HandlerResult<Station> {
    let station = json_body(payload)?;
    let station = state
        .station_service
        .create_station(station)
        .await
        .map_err(|e| ApiFailure::from_app(e, "CREATE_ERROR", "Failed to create station"))?;
    Ok(created(station, "Station created successfully"))
}

pub async fn update_station(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<StationPatch>, JsonRejection>,
) -> HandlerResult<Station> {
    let id = parse_id(&id)?;
    let patch = json_body(payload)?;
    let station = state
        .station_service
        .update_station(id, patch)
        .await
        .map_err(|e| ApiFailure::from_app(e, "UPDATE_ERROR", "Failed to update station"))?;
    Ok(ok(station, "Station updated successfully"))
}

pub async fn delete_station(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> HandlerResult<()> {
    let id = parse_id(&id)?;
    state
        .station_service
        .delete_station(id)
        .await
        .map_err(|e| ApiFailure::from_app(e, "DELETE_ERROR", "Failed to delete station"))?;
    Ok(ok((), "Station deleted successfully"))
}

pub async fn list_provinces(State(state): State<Arc<AppState>>) -> HandlerResult<Vec<String>> {
    let provinces = state
        .station_service
        .list_provinces()
        .await
        .map_err(|e| ApiFailure::from_app(e, "FETCH_ERROR", "Failed to fetch provinces"))?;
    Ok(ok(provinces, "Provinces retrieved successfully"))
}

pub async fn latest_air_quality(State(state): State<Arc<AppState>>) -> HandlerResult<Vec<Reading>> {
    let readings = state
        .air_quality_service
        .latest()
        .await
        .map_err(|e| ApiFailure::from_app(e, "FETCH_ERROR", "Failed to fetch air quality data"))?;
    Ok(ok(readings, "Latest air quality data retrieved successfully"))
}

pub async fn station_latest(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> HandlerResult<Reading> {
    let id = parse_id(&id)?;
    let reading = state
        .air_quality_service
        .latest_for_station(id)
        .await
        .map_err(|e| ApiFailure::from_app(e, "FETCH_ERROR", "Failed to fetch air quality data"))?;
    Ok(ok(reading, "Latest station reading retrieved successfully"))
}

pub async fn station_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> HandlerResult<Vec<Reading>> {
    let id = parse_id(&id)?;
    let query = query_params(query)?;
    let start = parse_date(query.start_date.as_deref(), "start_date")?;
    let end = parse_date(query.end_date.as_deref(), "end_date")?;
    let range = DateRange::from_dates(start, end, Utc::now().date_naive())
        .map_err(|e| ApiFailure::from_app(e, "FETCH_ERROR", "Failed to fetch air quality history"))?;

    let readings = state
        .air_quality_service
        .history(id, range)
        .await
        .map_err(|e| ApiFailure::from_app(e, "FETCH_ERROR", "Failed to fetch air quality history"))?;
    Ok(ok(readings, "Air quality history retrieved successfully"))
}

pub async fn insert_reading(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewReading>, JsonRejection>,
) -> HandlerResult<Reading> {
    let reading = json_body(payload)?;
    let reading = state
        .air_quality_service
        .insert(reading)
        .await
        .map_err(|e| ApiFailure::from_app(e, "INSERT_ERROR", "Failed to insert air quality data"))?;
    Ok(created(reading, "Air quality data inserted successfully"))
}

pub async fn dashboard_overview(
    State(state): State<Arc<AppState>>,
) -> HandlerResult<DashboardOverview> {
    let overview = state
        .dashboard_service
        .overview()
        .await
        .map_err(|e| ApiFailure::from_app(e, "FETCH_ERROR", "Failed to fetch dashboard overview"))?;
    Ok(ok(overview, "Dashboard overview retrieved successfully"))
}

pub async fn dashboard_statistics(
    State(state): State<Arc<AppState>>,
) -> HandlerResult<DashboardStatistics> {
    let statistics = state
        .dashboard_service
        .statistics()
        .await
        .map_err(|e| ApiFailure::from_app(e, "FETCH_ERROR", "Failed to fetch statistics"))?;
    Ok(ok(statistics, "Statistics retrieved successfully"))
}

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> HandlerResult<Vec<CategoryBand>> {
    let categories = state
        .dashboard_service
        .categories()
        .await
        .map_err(|e| ApiFailure::from_app(e, "FETCH_ERROR", "Failed to fetch ISPU categories"))?;
    Ok(ok(categories, "ISPU categories retrieved successfully"))
}

pub async fn map_stations(
    State(state): State<Arc<AppState>>,
) -> HandlerResult<Vec<StationSnapshot>> {
    let snapshots = state
        .dashboard_service
        .map_stations()
        .await
        .map_err(|e| ApiFailure::from_app(e, "FETCH_ERROR", "Failed to fetch map data"))?;
    Ok(ok(snapshots, "Map data retrieved successfully"))
}

pub async fn route_not_found() -> ApiFailure {
    ApiFailure::route_not_found()
}

/// Replace axum's empty 405 with the envelope, keeping the `Allow` header.
pub async fn method_not_allowed_envelope(response: Response) -> Response {
    if response.status() != StatusCode::METHOD_NOT_ALLOWED {
        return response;
    }
    let allow = response.headers().get(header::ALLOW).cloned();
    let mut enveloped = ApiFailure::method_not_allowed().into_response();
    if let Some(allow) = allow {
        enveloped.headers_mut().insert(header::ALLOW, allow);
    }
    enveloped
}
