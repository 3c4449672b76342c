// Station service - Station registry use cases with cache-aside reads
use crate::application::cache::{
    ALL_STATIONS_KEY, ALL_STATIONS_TTL, CacheAside, DASHBOARD_OVERVIEW_KEY, LATEST_AIR_QUALITY_KEY,
    MAP_STATIONS_KEY, STATION_TTL, station_key,
};
use crate::application::error::{AppError, AppResult};
use crate::application::monitoring_repository::MonitoringRepository;
use crate::domain::station::{NewStation, Station, StationPatch};
use std::sync::Arc;

const STATION: &str = "station";

#[derive(Clone)]
pub struct StationService {
    repository: Arc<dyn MonitoringRepository>,
    cache: CacheAside,
}

impl StationService {
    pub fn new(repository: Arc<dyn MonitoringRepository>, cache: CacheAside) -> Self {
        Self { repository, cache }
    }

    pub async fn list_stations(&self) -> AppResult<Vec<Station>> {
        self.cache
            .fetch(ALL_STATIONS_KEY, ALL_STATIONS_TTL, || async {
                self.repository
                    .list_active_stations()
                    .await
                    .map_err(AppError::from)
            })
            .await
    }

    pub async fn get_station(&self, id: i64) -> AppResult<Station> {
        self.cache
            .fetch(&station_key(id), STATION_TTL, || async {
                self.repository
                    .get_station(id)
                    .await
                    .map_err(|e| AppError::from_repo(e, STATION))
            })
            .await
    }

    pub async fn list_by_province(&self, province: &str) -> AppResult<Vec<Station>> {
        Ok(self.repository.list_stations_by_province(province).await?)
    }

    pub async fn list_provinces(&self) -> AppResult<Vec<String>> {
        Ok(self.repository.list_active_provinces().await?)
    }

    pub async fn create_station(&self, station: NewStation) -> AppResult<Station> {
        station.validate().map_err(AppError::Validation)?;

        let created = self
            .cache
            .invalidating(&listing_keys(), self.repository.create_station(&station))
            .await?;
        tracing::info!(id = created.id, code = %created.code, "station created");
        Ok(created)
    }

    pub async fn update_station(&self, id: i64, patch: StationPatch) -> AppResult<Station> {
        patch.validate().map_err(AppError::Validation)?;

        self.cache
            .invalidating(&station_keys(id), self.repository.update_station(id, &patch))
            .await
            .map_err(|e| AppError::from_repo(e, STATION))
    }

    pub async fn delete_station(&self, id: i64) -> AppResult<()> {
        self.cache
            .invalidating(&station_keys(id), self.repository.soft_delete_station(id))
            .await
            .map_err(|e| AppError::from_repo(e, STATION))?;
        tracing::info!(id, "station deactivated");
        Ok(())
    }
}

/// Keys whose contents embed station data.
fn listing_keys() -> Vec<String> {
    vec![
        ALL_STATIONS_KEY.to_string(),
        LATEST_AIR_QUALITY_KEY.to_string(),
        DASHBOARD_OVERVIEW_KEY.to_string(),
        MAP_STATIONS_KEY.to_string(),
    ]
}

fn station_keys(id: i64) -> Vec<String> {
    let mut keys = listing_keys();
    keys.push(station_key(id));
    keys
}
