//! Derived tables computed from a normalized record set.
//!
//! Every function here is pure: it reads a slice of records and returns a new
//! table, so each can be called without going through a fetch.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::error::{NeoError, Result};
use crate::types::{AsteroidApproachRecord, DailyHazardCount, DailyMinimum, DiameterBin};

/// Share of the value range the first edge is pushed down by so the minimum is included.
const EDGE_ADJUST: f64 = 0.001;

/// Partition the observed diameter range into `n_bins` equal-width
/// `(lower, upper]` intervals.
///
/// Bins without members are left out of the result.
pub fn bin_diameters(
    records: &[AsteroidApproachRecord],
    n_bins: usize,
) -> Result<Vec<DiameterBin>> {
    if n_bins == 0 {
        return Err(NeoError::Config("bin count must be at least 1".to_string()));
    }
    if records.is_empty() {
        return Ok(vec![]);
    }

    let min_val = records.iter().map(|r| r.diameter_m()).fold(f64::INFINITY, f64::min);
    let max_val = records.iter().map(|r| r.diameter_m()).fold(f64::NEG_INFINITY, f64::max);
    let edges = equal_width_edges(min_val, max_val, n_bins);

    let mut counts = vec![0usize; n_bins];
    for record in records {
        counts[bin_index(&edges, record.diameter_m())] += 1;
    }

    Ok(edges
        .windows(2)
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|(edge, count)| DiameterBin::new(edge[0], edge[1], count))
        .collect())
}

fn equal_width_edges(min_val: f64, max_val: f64, n_bins: usize) -> Vec<f64> {
    let (lo, hi) = if min_val == max_val {
        if min_val == 0.0 {
            (-EDGE_ADJUST, EDGE_ADJUST)
        } else {
            (min_val - EDGE_ADJUST * min_val.abs(), max_val + EDGE_ADJUST * max_val.abs())
        }
    } else {
        (min_val, max_val)
    };

    let width = (hi - lo) / n_bins as f64;
    let mut edges: Vec<f64> = (0..=n_bins).map(|i| lo + width * i as f64).collect();
    edges[n_bins] = hi;
    if min_val != max_val {
        edges[0] -= (max_val - min_val) * EDGE_ADJUST;
    }
    edges
}

fn bin_index(edges: &[f64], value: f64) -> usize {
    let last = edges.len() - 2;
    edges[1..]
        .iter()
        .position(|&upper| value <= upper)
        .unwrap_or(last)
}

/// For every day, the approach with the smallest miss distance.
///
/// Days come out in ascending order. On a tie the record seen first in
/// `records` is kept.
pub fn min_miss_distance_per_day(records: &[AsteroidApproachRecord]) -> Vec<DailyMinimum> {
    let mut closest: BTreeMap<NaiveDate, &AsteroidApproachRecord> = BTreeMap::new();
    for record in records {
        closest
            .entry(record.close_approach_date())
            .and_modify(|current| {
                if record.miss_distance_km() < current.miss_distance_km() {
                    *current = record;
                }
            })
            .or_insert(record);
    }

    closest
        .into_iter()
        .map(|(date, record)| DailyMinimum {
            date,
            name: record.name().to_string(),
            miss_distance_km: record.miss_distance_km(),
        })
        .collect()
}

/// Hazardous and non-hazardous counts for every day that has at least one approach.
pub fn hazard_counts_per_day(records: &[AsteroidApproachRecord]) -> Vec<DailyHazardCount> {
    let mut hazardous: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    let mut non_hazardous: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for record in records {
        let side = if record.is_potentially_hazardous() {
            &mut hazardous
        } else {
            &mut non_hazardous
        };
        *side.entry(record.close_approach_date()).or_insert(0) += 1;
    }
    merge_hazard_counts(&hazardous, &non_hazardous)
}

/// Outer-join two per-day counts; a day missing on one side counts as zero there.
pub fn merge_hazard_counts(
    hazardous: &BTreeMap<NaiveDate, usize>,
    non_hazardous: &BTreeMap<NaiveDate, usize>,
) -> Vec<DailyHazardCount> {
    let mut merged: BTreeMap<NaiveDate, DailyHazardCount> = BTreeMap::new();
    for (&date, &count) in hazardous {
        merged.entry(date).or_insert_with(|| empty_day(date)).hazardous = count;
    }
    for (&date, &count) in non_hazardous {
        merged.entry(date).or_insert_with(|| empty_day(date)).non_hazardous = count;
    }
    merged.into_values().collect()
}

fn empty_day(date: NaiveDate) -> DailyHazardCount {
    DailyHazardCount {
        date,
        hazardous: 0,
        non_hazardous: 0,
    }
}

/// The `n` records with the smallest diameters, stable on ties.
pub fn smallest_by_diameter(
    records: &[AsteroidApproachRecord],
    n: usize,
) -> Vec<AsteroidApproachRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| a.diameter_m().total_cmp(&b.diameter_m()));
    sorted.truncate(n);
    sorted
}

/// The `n` earliest records by approach date, stable on ties.
pub fn earliest_by_date(
    records: &[AsteroidApproachRecord],
    n: usize,
) -> Vec<AsteroidApproachRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by_key(|r| r.close_approach_date());
    sorted.truncate(n);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn record(
        name: &str,
        date: NaiveDate,
        miss: f64,
        diameter: f64,
        hazardous: bool,
    ) -> AsteroidApproachRecord {
        AsteroidApproachRecord::new(name, date, miss, 10.0, diameter, hazardous).unwrap()
    }

    fn in_bin(bin: &DiameterBin, value: f64) -> bool {
        value > bin.lower && value <= bin.upper
    }

    fn with_diameters(diameters: &[f64]) -> Vec<AsteroidApproachRecord> {
        diameters
            .iter()
            .enumerate()
            .map(|(i, &d)| record(&format!("({})", i), day(1), 1000.0, d, false))
            .collect()
    }

    #[test]
    fn test_three_bins_cover_range() {
        let values = [10.0, 50.0, 500.0, 999.0];
        let bins = bin_diameters(&with_diameters(&values), 3).unwrap();

        assert_eq!(bins.len(), 3);
        assert!(bins[0].lower < 10.0);
        assert_eq!(bins[2].upper, 999.0);
        for pair in bins.windows(2) {
            assert_eq!(pair[0].upper, pair[1].lower);
        }
        for value in values {
            assert_eq!(bins.iter().filter(|b| in_bin(b, value)).count(), 1);
        }
        assert_eq!(bins.iter().map(|b| b.count).collect::<Vec<_>>(), vec![2, 1, 1]);
        assert_eq!(bins[0].midpoint, 174);
        assert_eq!(bins[0].label(), "(0 to 300)");
    }

    #[test]
    fn test_empty_bins_are_dropped() {
        let bins = bin_diameters(&with_diameters(&[10.0, 50.0, 999.0]), 3).unwrap();
        assert_eq!(bins.len(), 2);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 3);
        assert!(bins.iter().all(|b| b.count > 0));
    }

    #[test]
    fn test_constant_diameters_share_one_bin() {
        let bins = bin_diameters(&with_diameters(&[40.0, 40.0, 40.0]), 5).unwrap();
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].count, 3);
        assert!(in_bin(&bins[0], 40.0));
    }

    #[test]
    fn test_all_zero_diameters() {
        let bins = bin_diameters(&with_diameters(&[0.0, 0.0]), 3).unwrap();
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].count, 2);
    }

    #[test]
    fn test_bin_edge_cases() {
        assert!(bin_diameters(&[], 3).unwrap().is_empty());
        assert!(matches!(bin_diameters(&with_diameters(&[1.0]), 0), Err(NeoError::Config(_))));
    }

    #[test]
    fn test_min_per_day_prefers_first_on_tie() {
        let records = vec![
            record("A", day(1), 500.0, 10.0, false),
            record("B", day(1), 300.0, 10.0, false),
            record("C", day(1), 300.0, 10.0, false),
            record("D", day(2), 900.0, 10.0, false),
        ];

        let minima = min_miss_distance_per_day(&records);
        assert_eq!(minima.len(), 2);
        assert_eq!(minima[0].name, "B");
        assert_eq!(minima[0].miss_distance_km, 300.0);
        assert_eq!(minima[1].date, day(2));
        assert_eq!(minima[1].name, "D");
    }

    #[test]
    fn test_merge_hazard_counts_fills_zeros() {
        let hazardous = BTreeMap::from([(day(1), 2)]);
        let non_hazardous = BTreeMap::from([(day(1), 1), (day(2), 3)]);

        let merged = merge_hazard_counts(&hazardous, &non_hazardous);
        assert_eq!(
            merged,
            vec![
                DailyHazardCount { date: day(1), hazardous: 2, non_hazardous: 1 },
                DailyHazardCount { date: day(2), hazardous: 0, non_hazardous: 3 },
            ]
        );
    }

    #[test]
    fn test_hazard_counts_per_day() {
        let records = vec![
            record("A", day(3), 1.0, 1.0, true),
            record("B", day(1), 1.0, 1.0, false),
            record("C", day(3), 1.0, 1.0, true),
        ];

        let counts = hazard_counts_per_day(&records);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0], DailyHazardCount { date: day(1), hazardous: 0, non_hazardous: 1 });
        assert_eq!(counts[1].hazardous, 2);
        assert_eq!(counts[1].non_hazardous, 0);
    }

    #[test]
    fn test_empty_records_give_empty_tables() {
        assert!(min_miss_distance_per_day(&[]).is_empty());
        assert!(hazard_counts_per_day(&[]).is_empty());
        assert!(smallest_by_diameter(&[], 5).is_empty());
    }

    #[test]
    fn test_subset_selection() {
        let records = vec![
            record("big", day(1), 1.0, 900.0, false),
            record("small", day(3), 1.0, 5.0, false),
            record("mid", day(2), 1.0, 50.0, false),
        ];

        let smallest = smallest_by_diameter(&records, 2);
        assert_eq!(smallest.iter().map(|r| r.name()).collect::<Vec<_>>(), vec!["small", "mid"]);

        let earliest = earliest_by_date(&records, 2);
        assert_eq!(earliest.iter().map(|r| r.name()).collect::<Vec<_>>(), vec!["big", "mid"]);

        assert_eq!(earliest_by_date(&records, 10).len(), 3);
    }
}
