// Route table and HTTP middleware
use crate::infrastructure::config::CorsSettings;
use crate::infrastructure::http_response::panic_response;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    create_station, dashboard_overview, dashboard_statistics, delete_station, get_station,
    health_check, insert_reading, latest_air_quality, list_categories, list_provinces,
    list_stations, map_stations, method_not_allowed_envelope, route_not_found, station_history,
    station_latest, update_station,
};
use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware::map_response,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub const API_PREFIX: &str = "/api/v1";

pub fn build_router(state: Arc<AppState>, cors: &CorsSettings) -> Router {
    let api = Router::new()
        .route("/health", get(health_check))
        .route("/stations", get(list_stations).post(create_station))
        .route(
            "/stations/:id",
            get(get_station).put(update_station).delete(delete_station),
        )
        .route("/stations/:id/latest", get(station_latest))
        .route("/provinces", get(list_provinces))
        .route("/air-quality", post(insert_reading))
        .route("/air-quality/latest", get(latest_air_quality))
        .route("/air-quality/station/:id", get(station_history))
        .route("/dashboard/overview", get(dashboard_overview))
        .route("/dashboard/statistics", get(dashboard_statistics))
        .route("/categories", get(list_categories))
        .route("/map/stations", get(map_stations));

    Router::new()
        .nest(API_PREFIX, api)
        .fallback(route_not_found)
        .with_state(state)
        .layer(map_response(method_not_allowed_envelope))
        .layer(CompressionLayer::new().br(true).gzip(true))
        .layer(cors_layer(cors))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
}

fn cors_layer(settings: &CorsSettings) -> CorsLayer {
    let origins = settings.origins();
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let values: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(%origin, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(values)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
}
