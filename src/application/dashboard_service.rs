// Dashboard service - Use case for building the overview and map snapshot
use crate::application::cache::{
    CacheAside, DASHBOARD_OVERVIEW_KEY, DASHBOARD_OVERVIEW_TTL, MAP_STATIONS_KEY, MAP_STATIONS_TTL,
};
use crate::application::error::{AppError, AppResult};
use crate::application::monitoring_repository::{MonitoringRepository, RepoError, StationFilter};
use crate::domain::category::CategoryBand;
use crate::domain::dashboard::{
    DashboardOverview, DashboardStatistics, DashboardSummary, StationSnapshot,
    category_distribution, province_statistics,
};
use std::sync::Arc;

/// Outcome of one best-effort overview sub-query: the loaded value, or the
/// zero value together with the reason it was substituted.
#[derive(Debug)]
pub enum Partial<T> {
    Loaded(T),
    Defaulted { query: &'static str, reason: String },
}

impl<T: Default> Partial<T> {
    pub fn from_result(query: &'static str, result: Result<T, RepoError>) -> Self {
        match result {
            Ok(value) => Self::Loaded(value),
            Err(e) => Self::Defaulted {
                query,
                reason: e.to_string(),
            },
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, Self::Defaulted { .. })
    }

    pub fn into_value(self) -> T {
        match self {
            Self::Loaded(value) => value,
            Self::Defaulted { query, reason } => {
                tracing::warn!(query, reason = %reason, "dashboard sub-query failed, using default");
                T::default()
            }
        }
    }
}

#[derive(Clone)]
pub struct DashboardService {
    repository: Arc<dyn MonitoringRepository>,
    cache: CacheAside,
}

impl DashboardService {
    pub fn new(repository: Arc<dyn MonitoringRepository>, cache: CacheAside) -> Self {
        Self { repository, cache }
    }

    pub async fn overview(&self) -> AppResult<DashboardOverview> {
        self.cache
            .fetch(DASHBOARD_OVERVIEW_KEY, DASHBOARD_OVERVIEW_TTL, || async {
                Ok::<DashboardOverview, AppError>(self.build_overview().await)
            })
            .await
    }

    pub async fn statistics(&self) -> AppResult<DashboardStatistics> {
        Ok(self.overview().await?.into())
    }

    pub async fn categories(&self) -> AppResult<Vec<CategoryBand>> {
        Ok(self.repository.list_category_bands().await?)
    }

    /// Latest classified reading per station for the map. Unlike the overview,
    /// a failing readings query is an error here.
    pub async fn map_stations(&self) -> AppResult<Vec<StationSnapshot>> {
        self.cache
            .fetch(MAP_STATIONS_KEY, MAP_STATIONS_TTL, || async {
                let bands = Partial::from_result(
                    "category_bands",
                    self.repository.list_category_bands().await,
                )
                .into_value();
                let readings = self.repository.latest_reading_per_station().await?;
                Ok::<Vec<StationSnapshot>, AppError>(
                    readings
                        .iter()
                        .filter_map(|r| StationSnapshot::from_reading(r, &bands))
                        .collect(),
                )
            })
            .await
    }

    /// Assemble the overview from independent sub-queries. Any sub-query that
    /// fails contributes its zero value instead of failing the whole overview.
    pub async fn build_overview(&self) -> DashboardOverview {
        let repo = &self.repository;
        let (total, active, average, last_update, bands, latest) = tokio::join!(
            repo.count_stations(StationFilter::All),
            repo.count_stations(StationFilter::Active),
            repo.average_index(),
            repo.max_timestamp(),
            repo.list_category_bands(),
            repo.latest_reading_per_station(),
        );

        let total = Partial::from_result("total_stations", total);
        let active = Partial::from_result("active_stations", active);
        let average = Partial::from_result("average_ispu", average);
        let last_update = Partial::from_result("last_update", last_update);
        let bands = Partial::from_result("category_bands", bands);
        let latest = Partial::from_result("latest_readings", latest);

        let defaulted = [
            total.is_defaulted(),
            active.is_defaulted(),
            average.is_defaulted(),
            last_update.is_defaulted(),
            bands.is_defaulted(),
            latest.is_defaulted(),
        ]
        .into_iter()
        .filter(|d| *d)
        .count();
        if defaulted > 0 {
            tracing::debug!(defaulted, "overview assembled with defaulted sub-queries");
        }

        let bands = bands.into_value();
        let recent_readings: Vec<StationSnapshot> = latest
            .into_value()
            .iter()
            .filter_map(|r| StationSnapshot::from_reading(r, &bands))
            .collect();

        DashboardOverview {
            summary: DashboardSummary {
                total_stations: total.into_value(),
                active_stations: active.into_value(),
                last_update: last_update.into_value(),
                average_ispu: average.into_value(),
            },
            category_distribution: category_distribution(&recent_readings),
            province_stats: province_statistics(&recent_readings),
            recent_readings,
        }
    }
}
