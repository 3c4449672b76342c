// In-memory collaborators for service and handler tests
use crate::application::cache::{CacheError, CacheStore};
use crate::application::monitoring_repository::{MonitoringRepository, RepoError, StationFilter};
use crate::domain::category::CategoryBand;
use crate::domain::reading::{NewReading, Reading};
use crate::domain::station::{NewStation, Station, StationPatch, StationStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Cache double that records TTLs and deletions; `failing()` rejects every call.
#[derive(Default)]
pub struct RecordingCache {
    entries: Mutex<HashMap<String, (Vec<u8>, Duration)>>,
    deleted: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingCache {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn insert_raw(&self, key: &str, value: Vec<u8>) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value, Duration::ZERO));
    }

    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().unwrap().get(key).map(|(v, _)| v.clone())
    }

    pub fn last_ttl(&self, key: &str) -> Option<Duration> {
        self.entries.lock().unwrap().get(key).map(|(_, ttl)| *ttl)
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), CacheError> {
        if self.fail {
            Err(CacheError::backend("cache unavailable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheStore for RecordingCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.check()?;
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.check()?;
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value, ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.check()?;
        self.entries.lock().unwrap().remove(key);
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }
}

/// Repository double backed by vectors. Operations named in `failing` return
/// a store error; `calls` counts invocations per operation.
#[derive(Default)]
pub struct FakeRepository {
    stations: Mutex<Vec<Station>>,
    readings: Mutex<Vec<Reading>>,
    bands: Vec<CategoryBand>,
    failing: Mutex<HashSet<&'static str>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    next_id: AtomicUsize,
}

impl FakeRepository {
    pub fn with_bands(bands: Vec<CategoryBand>) -> Self {
        Self {
            bands,
            ..Default::default()
        }
    }

    pub fn fail(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.calls.lock().unwrap().get(operation).copied().unwrap_or(0)
    }

    pub fn add_station(&self, code: &str, name: &str, province: &str) -> Station {
        let station = self.build_station(code, name, province);
        self.stations.lock().unwrap().push(station.clone());
        station
    }

    fn build_station(&self, code: &str, name: &str, province: &str) -> Station {
        let now = Utc::now();
        Station {
            id: self.next_id(),
            name: name.to_string(),
            code: code.to_string(),
            station_type: "KLHK".to_string(),
            latitude: -6.2,
            longitude: 106.8,
            province: province.to_string(),
            city: String::new(),
            address: String::new(),
            status: StationStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn add_reading(&self, station_id: i64, ispu: i32, timestamp: DateTime<Utc>) -> Reading {
        self.store_reading(Reading {
            id: self.next_id(),
            station_id,
            ispu,
            pollutants: Default::default(),
            timestamp,
            created_at: timestamp,
            station: None,
            category: None,
            color: None,
        })
    }

    fn store_reading(&self, reading: Reading) -> Reading {
        self.readings.lock().unwrap().push(reading.clone());
        reading
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) as i64 + 1
    }

    fn enter(&self, operation: &'static str) -> Result<(), RepoError> {
        *self.calls.lock().unwrap().entry(operation).or_insert(0) += 1;
        if self.failing.lock().unwrap().contains(operation) {
            return Err(RepoError::store(format!("{operation} failed")));
        }
        Ok(())
    }

    fn station(&self, id: i64) -> Option<Station> {
        self.stations.lock().unwrap().iter().find(|s| s.id == id).cloned()
    }
}

#[async_trait]
impl MonitoringRepository for FakeRepository {
    async fn list_active_stations(&self) -> Result<Vec<Station>, RepoError> {
        self.enter("list_active_stations")?;
        let mut stations: Vec<Station> = self
            .stations
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.status.is_active())
            .cloned()
            .collect();
        stations.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(stations)
    }

    async fn get_station(&self, id: i64) -> Result<Station, RepoError> {
        self.enter("get_station")?;
        self.station(id).ok_or(RepoError::NotFound)
    }

    async fn list_stations_by_province(&self, province: &str) -> Result<Vec<Station>, RepoError> {
        self.enter("list_stations_by_province")?;
        Ok(self
            .stations
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.status.is_active() && s.province == province)
            .cloned()
            .collect())
    }

    async fn create_station(&self, station: &NewStation) -> Result<Station, RepoError> {
        self.enter("create_station")?;
        if self.stations.lock().unwrap().iter().any(|s| s.code == station.code) {
            return Err(RepoError::Duplicate(format!("station code {} already exists", station.code)));
        }
        let mut created = self.build_station(&station.code, &station.name, &station.province);
        created.station_type = station.station_type.clone();
        created.latitude = station.latitude;
        created.longitude = station.longitude;
        self.stations.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_station(&self, id: i64, patch: &StationPatch) -> Result<Station, RepoError> {
        self.enter("update_station")?;
        let mut stations = self.stations.lock().unwrap();
        let station = stations.iter_mut().find(|s| s.id == id).ok_or(RepoError::NotFound)?;
        if let Some(name) = &patch.name {
            station.name = name.clone();
        }
        if let Some(code) = &patch.code {
            station.code = code.clone();
        }
        if let Some(station_type) = &patch.station_type {
            station.station_type = station_type.clone();
        }
        if let Some(latitude) = patch.latitude {
            station.latitude = latitude;
        }
        if let Some(longitude) = patch.longitude {
            station.longitude = longitude;
        }
        if let Some(province) = &patch.province {
            station.province = province.clone();
        }
        if let Some(city) = &patch.city {
            station.city = city.clone();
        }
        if let Some(address) = &patch.address {
            station.address = address.clone();
        }
        if let Some(status) = patch.status {
            station.status = status;
        }
        station.updated_at = Utc::now();
        Ok(station.clone())
    }

    async fn soft_delete_station(&self, id: i64) -> Result<(), RepoError> {
        self.enter("soft_delete_station")?;
        let mut stations = self.stations.lock().unwrap();
        let station = stations.iter_mut().find(|s| s.id == id).ok_or(RepoError::NotFound)?;
        station.status = StationStatus::Inactive;
        Ok(())
    }

    async fn count_stations(&self, filter: StationFilter) -> Result<i64, RepoError> {
        self.enter("count_stations")?;
        let stations = self.stations.lock().unwrap();
        let count = match filter {
            StationFilter::All => stations.len(),
            StationFilter::Active => stations.iter().filter(|s| s.status.is_active()).count(),
        };
        Ok(count as i64)
    }

    async fn list_active_provinces(&self) -> Result<Vec<String>, RepoError> {
        self.enter("list_active_provinces")?;
        let mut provinces: Vec<String> = self
            .stations
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.status.is_active() && !s.province.is_empty())
            .map(|s| s.province.clone())
            .collect();
        provinces.sort();
        provinces.dedup();
        Ok(provinces)
    }

    async fn latest_reading_per_station(&self) -> Result<Vec<Reading>, RepoError> {
        self.enter("latest_reading_per_station")?;
        let mut latest: HashMap<i64, Reading> = HashMap::new();
        for reading in self.readings.lock().unwrap().iter() {
            let newer = latest
                .get(&reading.station_id)
                .is_none_or(|current| (reading.timestamp, reading.id) > (current.timestamp, current.id));
            if newer {
                latest.insert(reading.station_id, reading.clone());
            }
        }
        let mut rows: Vec<Reading> = latest
            .into_values()
            .filter_map(|mut r| {
                r.station = Some(self.station(r.station_id)?);
                Some(r)
            })
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(rows)
    }

    async fn latest_reading_for_station(&self, station_id: i64) -> Result<Reading, RepoError> {
        self.enter("latest_reading_for_station")?;
        self.readings
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.station_id == station_id)
            .max_by_key(|r| (r.timestamp, r.id))
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn readings_in_range(
        &self,
        station_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reading>, RepoError> {
        self.enter("readings_in_range")?;
        let mut rows: Vec<Reading> = self
            .readings
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.station_id == station_id && r.timestamp >= start && r.timestamp <= end)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(rows)
    }

    async fn insert_reading(
        &self,
        reading: &NewReading,
        timestamp: DateTime<Utc>,
    ) -> Result<Reading, RepoError> {
        self.enter("insert_reading")?;
        Ok(self.store_reading(Reading {
            id: self.next_id(),
            station_id: reading.station_id,
            ispu: reading.ispu,
            pollutants: reading.pollutants.clone(),
            timestamp,
            created_at: Utc::now(),
            station: None,
            category: None,
            color: None,
        }))
    }

    async fn average_index(&self) -> Result<f64, RepoError> {
        self.enter("average_index")?;
        let readings = self.readings.lock().unwrap();
        if readings.is_empty() {
            return Ok(0.0);
        }
        let total: i64 = readings.iter().map(|r| i64::from(r.ispu)).sum();
        Ok(total as f64 / readings.len() as f64)
    }

    async fn max_timestamp(&self) -> Result<Option<DateTime<Utc>>, RepoError> {
        self.enter("max_timestamp")?;
        Ok(self.readings.lock().unwrap().iter().map(|r| r.timestamp).max())
    }

    async fn list_category_bands(&self) -> Result<Vec<CategoryBand>, RepoError> {
        self.enter("list_category_bands")?;
        Ok(self.bands.clone())
    }
}
