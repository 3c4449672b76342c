// Application state for HTTP handlers
use crate::application::air_quality_service::AirQualityService;
use crate::application::dashboard_service::DashboardService;
use crate::application::station_service::StationService;

#[derive(Clone)]
pub struct AppState {
    pub station_service: StationService,
    pub air_quality_service: AirQualityService,
    pub dashboard_service: DashboardService,
}
