// Air quality service - Reading retrieval and ingestion
use crate::application::cache::{
    CacheAside, DASHBOARD_OVERVIEW_KEY, LATEST_AIR_QUALITY_KEY, LATEST_AIR_QUALITY_TTL,
    MAP_STATIONS_KEY,
};
use crate::application::error::{AppError, AppResult};
use crate::application::monitoring_repository::MonitoringRepository;
use crate::domain::reading::{NewReading, Reading};
use chrono::{DateTime, Days, NaiveDate, Utc};
use std::sync::Arc;

/// Days covered by a history request that omits `start_date`.
pub const DEFAULT_HISTORY_DAYS: u64 = 7;

/// Inclusive timestamp window derived from two calendar dates (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// `[start 00:00:00, end 23:59:59]`. Missing dates default to the last
    /// week ending `today`.
    pub fn from_dates(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
    ) -> AppResult<Self> {
        let end = end.unwrap_or(today);
        let start = start.unwrap_or_else(|| {
            today
                .checked_sub_days(Days::new(DEFAULT_HISTORY_DAYS))
                .unwrap_or(today)
        });
        if start > end {
            return Err(AppError::validation(format!(
                "start_date {start} is after end_date {end}"
            )));
        }

        match (start.and_hms_opt(0, 0, 0), end.and_hms_opt(23, 59, 59)) {
            (Some(start), Some(end)) => Ok(Self {
                start: start.and_utc(),
                end: end.and_utc(),
            }),
            _ => Err(AppError::validation("date range is out of bounds")),
        }
    }
}

#[derive(Clone)]
pub struct AirQualityService {
    repository: Arc<dyn MonitoringRepository>,
    cache: CacheAside,
}

impl AirQualityService {
    pub fn new(repository: Arc<dyn MonitoringRepository>, cache: CacheAside) -> Self {
        Self { repository, cache }
    }

    /// Newest reading of every station, classified.
    pub async fn latest(&self) -> AppResult<Vec<Reading>> {
        self.cache
            .fetch(LATEST_AIR_QUALITY_KEY, LATEST_AIR_QUALITY_TTL, || async {
                let readings = self.repository.latest_reading_per_station().await?;
                let bands = self.repository.list_category_bands().await?;
                Ok::<Vec<Reading>, AppError>(readings.into_iter().map(|r| r.classified(&bands)).collect())
            })
            .await
    }

    pub async fn latest_for_station(&self, station_id: i64) -> AppResult<Reading> {
        let reading = self
            .repository
            .latest_reading_for_station(station_id)
            .await
            .map_err(|e| AppError::from_repo(e, "reading"))?;
        let bands = self.repository.list_category_bands().await?;
        Ok(reading.classified(&bands))
    }

    pub async fn history(&self, station_id: i64, range: DateRange) -> AppResult<Vec<Reading>> {
        let readings = self
            .repository
            .readings_in_range(station_id, range.start, range.end)
            .await?;
        let bands = self.repository.list_category_bands().await?;
        Ok(readings.into_iter().map(|r| r.classified(&bands)).collect())
    }

    /// Store one reading; a missing timestamp means "now".
    pub async fn insert(&self, reading: NewReading) -> AppResult<Reading> {
        reading.validate().map_err(AppError::Validation)?;
        let timestamp = reading.timestamp.unwrap_or_else(Utc::now);

        let keys = [
            LATEST_AIR_QUALITY_KEY.to_string(),
            DASHBOARD_OVERVIEW_KEY.to_string(),
            MAP_STATIONS_KEY.to_string(),
        ];
        let stored = self
            .cache
            .invalidating(&keys, self.repository.insert_reading(&reading, timestamp))
            .await?;
        tracing::debug!(station_id = stored.station_id, ispu = stored.ispu, "reading stored");
        Ok(stored)
    }
}
