// Air quality reading domain models
use super::category::{CategoryBand, classify};
use super::station::Station;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Optional pollutant concentrations reported alongside the index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pollutants {
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
    pub co: Option<f64>,
    pub no2: Option<f64>,
    pub o3: Option<f64>,
    pub so2: Option<f64>,
    pub hc: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub id: i64,
    pub station_id: i64,
    pub ispu: i32,
    #[serde(flatten)]
    pub pollutants: Pollutants,
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station: Option<Station>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Reading {
    /// Attach the category label and color for this reading's index.
    pub fn classified(mut self, bands: &[CategoryBand]) -> Self {
        let classification = classify(self.ispu, bands);
        self.category = Some(classification.label);
        self.color = classification.color;
        self
    }
}

/// Payload for a single synchronous ingestion.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReading {
    pub station_id: i64,
    pub ispu: i32,
    #[serde(flatten)]
    pub pollutants: Pollutants,
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewReading {
    pub fn validate(&self) -> Result<(), String> {
        if self.station_id <= 0 {
            return Err("station_id must be a positive id".to_string());
        }
        if self.ispu < 0 {
            return Err(format!("ispu must be >= 0, got {}", self.ispu));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::category::tests::sample_bands;

    fn reading(ispu: i32) -> Reading {
        let now = Utc::now();
        Reading {
            id: 1,
            station_id: 7,
            ispu,
            pollutants: Pollutants {
                pm25: Some(12.5),
                ..Default::default()
            },
            timestamp: now,
            created_at: now,
            station: None,
            category: None,
            color: None,
        }
    }

    #[test]
    fn test_classified_reading() {
        let r = reading(120).classified(&sample_bands());
        assert_eq!(r.category.as_deref(), Some("Unhealthy"));
        assert_eq!(r.color.as_deref(), Some("#ff7e00"));

        let r = reading(120).classified(&[]);
        assert_eq!(r.category.as_deref(), Some("Unknown"));
        assert_eq!(r.color, None);
    }

    #[test]
    fn test_new_reading_validation() {
        let json = r#"{"station_id": 3, "ispu": -4, "pm10": 40.0}"#;
        let payload: NewReading = serde_json::from_str(json).unwrap();
        assert_eq!(payload.pollutants.pm10, Some(40.0));
        assert!(payload.timestamp.is_none());
        assert!(payload.validate().unwrap_err().contains("ispu"));

        let payload = NewReading { ispu: 0, ..payload };
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn test_pollutants_are_flattened() {
        let value = serde_json::to_value(reading(10)).unwrap();
        assert_eq!(value["pm25"], 12.5);
        assert!(value["hc"].is_null());
        assert!(value.get("station").is_none());
    }
}
