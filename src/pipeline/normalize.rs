use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::constants::FEED_DATE_FORMAT;
use crate::error::{NeoError, Result};
use crate::types::{AsteroidApproachRecord, NeoFeed};

/// What to do when a single object in the feed cannot become a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordPolicy {
    /// Drop the object, keep its error in the outcome and continue.
    #[default]
    SkipInvalid,
    /// Abort the batch on the first invalid object.
    FailBatch,
}

/// Records extracted from one feed plus the objects that were dropped.
#[derive(Debug, Default)]
pub struct NormalizeOutcome {
    pub records: Vec<AsteroidApproachRecord>,
    pub skipped: Vec<NeoError>,
    /// Objects seen across all date keys, valid or not.
    pub total_objects: usize,
    /// The feed's own `element_count`, when it sent one.
    pub reported_objects: Option<u64>,
}

impl NormalizeOutcome {
    /// The reported count when it disagrees with the objects actually listed.
    pub fn count_mismatch(&self) -> Option<u64> {
        self.reported_objects
            .filter(|&reported| reported != self.total_objects as u64)
    }
}

/// Flattens the per-date object lists of a feed into approach records.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedNormalizer {
    pub policy: RecordPolicy,
}

impl FeedNormalizer {
    pub fn new(policy: RecordPolicy) -> Self {
        Self { policy }
    }

    /// Walks date keys in ascending order and objects in list order.
    ///
    /// A feed without `near_earth_objects`, or with a date key that does not
    /// map to a list, is a structural error and aborts regardless of policy.
    pub fn normalize(&self, feed: &NeoFeed) -> Result<NormalizeOutcome> {
        let by_date = feed.near_earth_objects()?;
        let mut outcome = NormalizeOutcome {
            reported_objects: feed.element_count(),
            ..NormalizeOutcome::default()
        };

        for (date_key, objects) in by_date {
            let objects = objects.as_array().ok_or_else(|| {
                NeoError::Parse(format!("near_earth_objects['{}'] is not a list", date_key))
            })?;
            debug!(date = %date_key, objects = objects.len(), "Normalizing date bucket");

            for object in objects {
                outcome.total_objects += 1;
                match normalize_object(object) {
                    Ok(record) => outcome.records.push(record),
                    Err(e) if self.policy == RecordPolicy::SkipInvalid && !e.is_fatal() => {
                        warn!(date = %date_key, "Skipping object: {}", e);
                        outcome.skipped.push(e);
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(outcome)
    }
}

/// Convenience wrapper using the skip-and-continue policy.
pub fn normalize_feed(feed: &NeoFeed) -> Result<NormalizeOutcome> {
    FeedNormalizer::default().normalize(feed)
}

#[derive(Debug, Deserialize)]
struct WireObject {
    name: String,
    // Kept untyped so that only the first entry has to be well formed.
    close_approach_data: Vec<Value>,
    estimated_diameter: WireDiameter,
    is_potentially_hazardous_asteroid: bool,
}

#[derive(Debug, Deserialize)]
struct WireApproach {
    close_approach_date: String,
    miss_distance: WireMissDistance,
    relative_velocity: WireVelocity,
}

#[derive(Debug, Deserialize)]
struct WireMissDistance {
    #[serde(deserialize_with = "number_or_string")]
    kilometers: f64,
}

#[derive(Debug, Deserialize)]
struct WireVelocity {
    #[serde(deserialize_with = "number_or_string")]
    kilometers_per_second: f64,
}

#[derive(Debug, Deserialize)]
struct WireDiameter {
    meters: WireDiameterRange,
}

#[derive(Debug, Deserialize)]
struct WireDiameterRange {
    #[serde(deserialize_with = "number_or_string")]
    estimated_diameter_max: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

/// The feed sends distances and velocities as decimal strings, diameters as numbers.
fn number_or_string<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| serde::de::Error::custom(format!("'{}' is not a number: {}", s, e))),
    }
}

/// Builds a record from one feed object using its first close-approach entry.
pub fn normalize_object(object: &Value) -> Result<AsteroidApproachRecord> {
    let label = object
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or("<unnamed>")
        .to_string();

    let wire =
        WireObject::deserialize(object).map_err(|e| NeoError::record(&label, e.to_string()))?;

    let first = wire
        .close_approach_data
        .first()
        .ok_or_else(|| NeoError::record(&label, "close_approach_data is empty"))?;
    let approach = WireApproach::deserialize(first)
        .map_err(|e| NeoError::record(&label, format!("close_approach_data[0]: {}", e)))?;

    let date = NaiveDate::parse_from_str(&approach.close_approach_date, FEED_DATE_FORMAT)
        .map_err(|e| {
            NeoError::record(
                &label,
                format!(
                    "close_approach_date '{}' is not a date: {}",
                    approach.close_approach_date, e
                ),
            )
        })?;

    AsteroidApproachRecord::new(
        wire.name,
        date,
        approach.miss_distance.kilometers,
        approach.relative_velocity.kilometers_per_second,
        wire.estimated_diameter.meters.estimated_diameter_max,
        wire.is_potentially_hazardous_asteroid,
    )
}
