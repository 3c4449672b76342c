// Station domain model
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle flag of a station. Deleting a station only flips it to `Inactive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StationStatus {
    Active,
    Inactive,
}

impl StationStatus {
    pub fn from_active(is_active: bool) -> Self {
        if is_active { Self::Active } else { Self::Inactive }
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
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
    pub status: StationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for registering a station.
#[derive(Debug, Clone, Deserialize)]
pub struct NewStation {
    pub name: String,
    pub code: String,
    #[serde(rename = "type")]
    pub station_type: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub address: String,
}

impl NewStation {
    /// Returns the first rule the payload breaks, if any.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is required".to_string());
        }
        if self.code.trim().is_empty() {
            return Err("code is required".to_string());
        }
        if self.station_type.trim().is_empty() {
            return Err("type is required".to_string());
        }
        validate_coordinates(Some(self.latitude), Some(self.longitude))
    }
}

/// Partial update: only the fields present are merged into the stored station.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StationPatch {
    pub name: Option<String>,
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub station_type: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub province: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub status: Option<StationStatus>,
}

impl StationPatch {
    pub fn validate(&self) -> Result<(), String> {
        let blank = |field: &Option<String>| field.as_deref().is_some_and(|v| v.trim().is_empty());
        if blank(&self.name) {
            return Err("name must not be blank".to_string());
        }
        if blank(&self.code) {
            return Err("code must not be blank".to_string());
        }
        if blank(&self.station_type) {
            return Err("type must not be blank".to_string());
        }
        validate_coordinates(self.latitude, self.longitude)
    }
}

fn validate_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> Result<(), String> {
    if let Some(lat) = latitude {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(format!("latitude {lat} is outside [-90, 90]"));
        }
    }
    if let Some(lon) = longitude {
        if !(-180.0..=180.0).contains(&lon) {
            return Err(format!("longitude {lon} is outside [-180, 180]"));
        }
    }
    Ok(())
}
