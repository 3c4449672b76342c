// Repository trait for station, reading and category data access
use crate::domain::category::CategoryBand;
use crate::domain::reading::{NewReading, Reading};
use crate::domain::station::{NewStation, Station, StationPatch};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("record not found")]
    NotFound,
    #[error("duplicate value: {0}")]
    Duplicate(String),
    #[error("store failure: {message}")]
    Store { message: String },
}

impl RepoError {
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }
}

/// Which stations a count covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationFilter {
    All,
    Active,
}

#[async_trait]
pub trait MonitoringRepository: Send + Sync {
    /// Active stations ordered by name
    async fn list_active_stations(&self) -> Result<Vec<Station>, RepoError>;

    async fn get_station(&self, id: i64) -> Result<Station, RepoError>;

    /// Active stations in one province
    async fn list_stations_by_province(&self, province: &str) -> Result<Vec<Station>, RepoError>;

    /// Fails with `Duplicate` when the code is already taken
    async fn create_station(&self, station: &NewStation) -> Result<Station, RepoError>;

    /// Merge the present fields of `patch` into the stored station
    async fn update_station(&self, id: i64, patch: &StationPatch) -> Result<Station, RepoError>;

    /// Mark the station inactive; the row is kept
    async fn soft_delete_station(&self, id: i64) -> Result<(), RepoError>;

    async fn count_stations(&self, filter: StationFilter) -> Result<i64, RepoError>;

    async fn list_active_provinces(&self) -> Result<Vec<String>, RepoError>;

    /// One reading per station (the newest), with the station attached,
    /// ordered by timestamp descending
    async fn latest_reading_per_station(&self) -> Result<Vec<Reading>, RepoError>;

    async fn latest_reading_for_station(&self, station_id: i64) -> Result<Reading, RepoError>;

    /// Readings with `start <= timestamp <= end`, newest first
    async fn readings_in_range(
        &self,
        station_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reading>, RepoError>;

    async fn insert_reading(
        &self,
        reading: &NewReading,
        timestamp: DateTime<Utc>,
    ) -> Result<Reading, RepoError>;

    /// Mean index over every stored reading, 0 when there are none
    async fn average_index(&self) -> Result<f64, RepoError>;

    async fn max_timestamp(&self) -> Result<Option<DateTime<Utc>>, RepoError>;

    /// Bands ordered by lower bound ascending
    async fn list_category_bands(&self) -> Result<Vec<CategoryBand>, RepoError>;
}
