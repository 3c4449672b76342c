// ISPU category bands and the classification rule
use serde::{Deserialize, Serialize};

/// Label returned when no band contains the index.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// One severity band: `[min_value, max_value]`, open-ended when `max_value` is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBand {
    pub id: i64,
    pub min_value: i32,
    pub max_value: Option<i32>,
    pub category: String,
    pub description: String,
    pub color: String,
}

impl CategoryBand {
    pub fn contains(&self, index: i32) -> bool {
        index >= self.min_value && self.max_value.is_none_or(|max| index <= max)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub label: String,
    pub color: Option<String>,
}

impl Classification {
    fn unknown() -> Self {
        Self {
            label: UNKNOWN_CATEGORY.to_string(),
            color: None,
        }
    }
}

/// Map an index onto the first band that contains it.
///
/// `bands` must already be sorted ascending by `min_value`; the first match in
/// iteration order wins.
pub fn classify(index: i32, bands: &[CategoryBand]) -> Classification {
    bands
        .iter()
        .find(|band| band.contains(index))
        .map(|band| Classification {
            label: band.category.clone(),
            color: Some(band.color.clone()),
        })
        .unwrap_or_else(Classification::unknown)
}
