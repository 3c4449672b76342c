// Dashboard domain model
use super::category::{CategoryBand, classify};
use super::reading::{Pollutants, Reading};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_stations: i64,
    pub active_stations: i64,
    pub last_update: Option<DateTime<Utc>>,
    pub average_ispu: f64,
}

/// A station joined with its most recent reading and that reading's category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationSnapshot {
    pub id: i64,
    pub name: String,
    pub code: String,
    #[serde(rename = "type")]
    pub station_type: String,
    pub latitude: f64,
    pub longitude: f64,
    pub province: String,
    pub city: String,
    pub address: String,
    pub ispu: i32,
    pub category: String,
    pub color: Option<String>,
    #[serde(flatten)]
    pub pollutants: Pollutants,
    pub timestamp: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
}

impl StationSnapshot {
    /// Builds a snapshot from a reading that carries its station; readings
    /// without a joined station yield `None`.
    pub fn from_reading(reading: &Reading, bands: &[CategoryBand]) -> Option<Self> {
        let station = reading.station.as_ref()?;
        let classification = classify(reading.ispu, bands);
        Some(Self {
            id: station.id,
            name: station.name.clone(),
            code: station.code.clone(),
            station_type: station.station_type.clone(),
            latitude: station.latitude,
            longitude: station.longitude,
            province: station.province.clone(),
            city: station.city.clone(),
            address: station.address.clone(),
            ispu: reading.ispu,
            category: classification.label,
            color: classification.color,
            pollutants: reading.pollutants.clone(),
            timestamp: reading.timestamp,
            last_update: reading.timestamp,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvinceStatistic {
    pub province: String,
    pub station_count: i64,
    pub average_ispu: f64,
    pub worst_category: String,
    pub best_category: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardOverview {
    pub summary: DashboardSummary,
    pub category_distribution: BTreeMap<String, u64>,
    pub recent_readings: Vec<StationSnapshot>,
    pub province_stats: Vec<ProvinceStatistic>,
}

/// Subset of the overview served by the statistics endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStatistics {
    pub summary: DashboardSummary,
    pub category_distribution: BTreeMap<String, u64>,
}

impl From<DashboardOverview> for DashboardStatistics {
    fn from(overview: DashboardOverview) -> Self {
        Self {
            summary: overview.summary,
            category_distribution: overview.category_distribution,
        }
    }
}

/// Count snapshots per category label.
pub fn category_distribution(snapshots: &[StationSnapshot]) -> BTreeMap<String, u64> {
    let mut distribution = BTreeMap::new();
    for snapshot in snapshots {
        *distribution.entry(snapshot.category.clone()).or_insert(0) += 1;
    }
    distribution
}

/// Per-province rollup of the latest snapshots, ordered by province name.
/// Snapshots without a province are skipped.
pub fn province_statistics(snapshots: &[StationSnapshot]) -> Vec<ProvinceStatistic> {
    let mut by_province: BTreeMap<&str, Vec<&StationSnapshot>> = BTreeMap::new();
    for snapshot in snapshots.iter().filter(|s| !s.province.is_empty()) {
        by_province.entry(snapshot.province.as_str()).or_default().push(snapshot);
    }

    by_province
        .into_iter()
        .filter_map(|(province, members)| {
            let worst = members.iter().max_by_key(|s| s.ispu)?;
            let best = members.iter().min_by_key(|s| s.ispu)?;
            let total: i64 = members.iter().map(|s| i64::from(s.ispu)).sum();
            Some(ProvinceStatistic {
                province: province.to_string(),
                station_count: members.len() as i64,
                average_ispu: total as f64 / members.len() as f64,
                worst_category: worst.category.clone(),
                best_category: best.category.clone(),
            })
        })
        .collect()
}
