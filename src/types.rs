use crate::error::{NeoError, Result};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};

/// Raw response body of the NEO feed, kept as untyped JSON until normalization.
#[derive(Debug, Clone)]
pub struct NeoFeed {
    raw: Value,
}

impl NeoFeed {
    pub fn from_value(raw: Value) -> Self {
        Self { raw }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let raw: Value = serde_json::from_slice(bytes)
            .map_err(|e| NeoError::Parse(format!("response body is not JSON: {}", e)))?;
        Ok(Self { raw })
    }

    /// The `near_earth_objects` mapping of date key to object list.
    pub fn near_earth_objects(&self) -> Result<&Map<String, Value>> {
        self.raw
            .get("near_earth_objects")
            .ok_or_else(|| NeoError::Parse("missing 'near_earth_objects'".to_string()))?
            .as_object()
            .ok_or_else(|| NeoError::Parse("'near_earth_objects' is not an object".to_string()))
    }

    /// Object count reported by the feed itself, when present.
    pub fn element_count(&self) -> Option<u64> {
        self.raw.get("element_count").and_then(|v| v.as_u64())
    }
}

/// One row per asteroid, describing its first listed close approach.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AsteroidApproachRecord {
    name: String,
    close_approach_date: NaiveDate,
    miss_distance_km: f64,
    velocity_km_s: f64,
    diameter_m: f64,
    is_potentially_hazardous: bool,
}

impl AsteroidApproachRecord {
    pub fn new(
        name: impl Into<String>,
        close_approach_date: NaiveDate,
        miss_distance_km: f64,
        velocity_km_s: f64,
        diameter_m: f64,
        is_potentially_hazardous: bool,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(NeoError::record(name, "name is empty"));
        }
        for (field, value) in [
            ("miss_distance_km", miss_distance_km),
            ("velocity_km_s", velocity_km_s),
            ("diameter_m", diameter_m),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(NeoError::record(
                    name,
                    format!("{} must be a finite non-negative number, got {}", field, value),
                ));
            }
        }

        Ok(Self {
            name,
            close_approach_date,
            miss_distance_km,
            velocity_km_s,
            diameter_m,
            is_potentially_hazardous,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn close_approach_date(&self) -> NaiveDate {
        self.close_approach_date
    }

    pub fn miss_distance_km(&self) -> f64 {
        self.miss_distance_km
    }

    pub fn velocity_km_s(&self) -> f64 {
        self.velocity_km_s
    }

    pub fn diameter_m(&self) -> f64 {
        self.diameter_m
    }

    pub fn is_potentially_hazardous(&self) -> bool {
        self.is_potentially_hazardous
    }
}

/// An equal-width diameter interval `(lower, upper]` and how many records fell in it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiameterBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    /// `(lower + upper) / 2` rounded to the nearest integer, ties to even.
    pub midpoint: i64,
}

impl DiameterBin {
    pub fn new(lower: f64, upper: f64, count: usize) -> Self {
        Self {
            lower,
            upper,
            count,
            midpoint: ((lower + upper) / 2.0).round_ties_even() as i64,
        }
    }

    /// Range rounded down to hundreds, e.g. `(300 to 600)`.
    pub fn label(&self) -> String {
        let floor_100 = |v: f64| 100 * (v / 100.0).floor() as i64;
        format!("({} to {})", floor_100(self.lower), floor_100(self.upper))
    }
}

/// Hazardous and non-hazardous approach counts for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyHazardCount {
    pub date: NaiveDate,
    pub hazardous: usize,
    pub non_hazardous: usize,
}

/// The closest approach recorded on one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyMinimum {
    pub date: NaiveDate,
    pub name: String,
    pub miss_distance_km: f64,
}

impl DailyMinimum {
    /// Name without the parentheses the feed wraps provisional designations in.
    pub fn display_name(&self) -> String {
        self.name.replace(['(', ')'], "")
    }
}
