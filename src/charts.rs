//! Chart figure generation.
//!
//! Builds Plotly figure JSON (`{"data": [...], "layout": {...}}`) for the
//! exploratory NEO charts. Writing the figures out is the job of a
//! [`ChartRendererPort`](crate::app::ports::ChartRendererPort).

use serde_json::{json, Value};
use tracing::debug;

use crate::config::ChartConfig;
use crate::error::Result;
use crate::pipeline::aggregate;
use crate::types::{AsteroidApproachRecord, DailyHazardCount, DailyMinimum, DiameterBin};

/// Largest bubble in the miss-distance scatter, in pixels.
const SCATTER_SIZE_MAX: f64 = 90.0;

/// Text and padding of one 3D bin chart.
#[derive(Debug, Clone, Copy)]
pub struct BinChartStyle {
    /// Share of the midpoint span the x range is widened by on each side.
    pub pad_ratio: f64,
    /// Name of the x value in hover text and on the axis.
    pub midpoint_label: &'static str,
    pub bin_text: fn(&DiameterBin) -> String,
}

impl BinChartStyle {
    /// Bins over every record.
    pub fn full_range() -> Self {
        Self {
            pad_ratio: 0.4,
            midpoint_label: "Diameter Bin Midpoint",
            bin_text: |b| format!("Diameter Range (m): {}<br>Count: {}", b.label(), b.count),
        }
    }

    /// Bins over the smallest objects only.
    pub fn zoomed() -> Self {
        Self {
            pad_ratio: 0.3,
            midpoint_label: "Diameter Midpoint",
            bin_text: |b| format!("Diameter: {} meters<br>Asteroids: {}", b.label(), b.count),
        }
    }
}

/// A finished figure ready to be rendered.
#[derive(Debug, Clone)]
pub struct ChartSpec {
    /// File-name friendly identifier.
    pub id: String,
    pub title: String,
    pub figure: Value,
}

/// Builds chart figures from records and the derived tables.
pub struct ChartBuilder {
    config: ChartConfig,
}

impl ChartBuilder {
    pub fn new(config: ChartConfig) -> Self {
        Self { config }
    }

    /// Every chart that has data to show, in a fixed order.
    pub fn build_all(&self, records: &[AsteroidApproachRecord]) -> Result<Vec<ChartSpec>> {
        let minima = aggregate::min_miss_distance_per_day(records);
        let earliest = aggregate::earliest_by_date(records, self.config.first_n_by_date);
        let first_minima = aggregate::min_miss_distance_per_day(&earliest);
        let bins = aggregate::bin_diameters(records, self.config.diameter_bins)?;
        let zoomed_bins = aggregate::bin_diameters(
            &aggregate::smallest_by_diameter(records, self.config.zoom_smallest),
            self.config.zoom_bins,
        )?;

        let charts: Vec<ChartSpec> = [
            self.miss_distance_vs_velocity(records),
            self.hazard_counts_by_date(&aggregate::hazard_counts_per_day(records)),
            self.min_miss_distance_by_date(
                "min_miss_distance_by_date",
                "Minimum Earth Miss Distance by Date",
                &minima,
                36.0,
            ),
            self.min_miss_distance_by_date(
                "min_miss_distance_by_date_first_n",
                "Minimum Earth Miss Distance by Date (Earliest Approaches)",
                &first_minima,
                80.0,
            ),
            self.diameter_bins_3d(
                "diameter_bins_3d",
                "3D Scatter Plot of Asteroid Diameter Range",
                &bins,
                BinChartStyle::full_range(),
            ),
            self.diameter_bins_3d(
                "diameter_bins_3d_zoomed",
                "3D Scatter Plot of Asteroid Diameter Bins (Smallest Objects - Zoomed)",
                &zoomed_bins,
                BinChartStyle::zoomed(),
            ),
        ]
        .into_iter()
        .flatten()
        .collect();

        debug!("Built {} charts from {} records", charts.len(), records.len());
        Ok(charts)
    }

    /// Bubble scatter of miss distance against velocity, sized and coloured by diameter.
    pub fn miss_distance_vs_velocity(
        &self,
        records: &[AsteroidApproachRecord],
    ) -> Option<ChartSpec> {
        if records.is_empty() {
            return None;
        }

        let diameters: Vec<f64> = records.iter().map(|r| r.diameter_m()).collect();
        let max_diameter = diameters.iter().copied().fold(0.0, f64::max);
        let size_ref = if max_diameter > 0.0 {
            2.0 * max_diameter / (SCATTER_SIZE_MAX * SCATTER_SIZE_MAX)
        } else {
            1.0
        };
        let title = "Miss Distance vs. Velocity vs. Diameter of NEOs";

        let figure = json!({
            "data": [{
                "type": "scatter",
                "mode": "markers",
                "x": records.iter().map(|r| r.miss_distance_km()).collect::<Vec<_>>(),
                "y": records.iter().map(|r| r.velocity_km_s()).collect::<Vec<_>>(),
                "text": records.iter().map(|r| r.name()).collect::<Vec<_>>(),
                "hovertemplate": concat!(
                    "<b>%{text}</b><br>Miss Distance (km): %{x}<br>Velocity (km/s): %{y}",
                    "<br>Diameter (m): %{marker.color}<extra></extra>"
                ),
                "marker": {
                    "size": diameters.clone(),
                    "sizemode": "area",
                    "sizeref": size_ref,
                    "sizemin": 2,
                    "color": diameters,
                    "colorscale": "Rainbow",
                    "showscale": true,
                    "colorbar": { "title": { "text": "Diameter (m)" } }
                }
            }],
            "layout": {
                "title": { "text": title, "font": { "size": 24 } },
                "width": 1600,
                "height": 850,
                "font": { "size": 23 },
                "xaxis": { "title": { "text": "Miss Distance (km)" } },
                "yaxis": { "title": { "text": "Velocity (km/s)" } }
            }
        });

        Some(ChartSpec {
            id: "miss_distance_vs_velocity".to_string(),
            title: title.to_string(),
            figure,
        })
    }

    /// Stacked bars of hazardous and non-hazardous approaches per day.
    pub fn hazard_counts_by_date(&self, counts: &[DailyHazardCount]) -> Option<ChartSpec> {
        if counts.is_empty() {
            return None;
        }

        let dates: Vec<String> = counts.iter().map(|c| c.date.to_string()).collect();
        let bar = |name: &str, values: Vec<usize>, color: &str, shape: &str| {
            json!({
                "type": "bar",
                "name": name,
                "x": dates.clone(),
                "y": values,
                "marker": { "color": color, "pattern": { "shape": shape } },
                "texttemplate": "%{y}",
                "textposition": "inside",
                "textfont": { "size": 14 }
            })
        };
        let title = "Hazardous vs. Non-Hazardous Asteroids by Date";

        let hazardous: Vec<usize> = counts.iter().map(|c| c.hazardous).collect();
        let non_hazardous: Vec<usize> = counts.iter().map(|c| c.non_hazardous).collect();

        let figure = json!({
            "data": [
                bar("hazardous_count", hazardous, "red", "x"),
                bar("non_hazardous_count", non_hazardous, "blue", "+"),
            ],
            "layout": {
                "title": { "text": title, "font": { "size": 24 } },
                "barmode": "stack",
                "width": 1200,
                "height": 850,
                "font": { "size": 16 },
                "uniformtext": { "minsize": 16.5, "mode": "hide" },
                "legend": { "title": { "text": "Type" } },
                "xaxis": { "title": { "text": "Date" }, "type": "date" },
                "yaxis": { "title": { "text": "Number of Asteroids" } }
            }
        });

        Some(ChartSpec {
            id: "hazard_counts_by_date".to_string(),
            title: title.to_string(),
            figure,
        })
    }

    /// Line of each day's closest approach, labelled with the object name.
    ///
    /// When marker images are configured they are cycled over the points in order.
    pub fn min_miss_distance_by_date(
        &self,
        id: &str,
        title: &str,
        minima: &[DailyMinimum],
        marker_size: f64,
    ) -> Option<ChartSpec> {
        if minima.is_empty() {
            return None;
        }

        let dates: Vec<String> = minima.iter().map(|m| m.date.to_string()).collect();
        let names: Vec<String> = minima.iter().map(|m| m.display_name()).collect();
        let images: Vec<Value> = if self.config.marker_images.is_empty() {
            Vec::new()
        } else {
            minima
                .iter()
                .enumerate()
                .map(|(i, m)| {
                    json!({
                        "source": self.config.marker_images[i % self.config.marker_images.len()],
                        "x": m.date.to_string(),
                        "y": m.miss_distance_km,
                        "xref": "x",
                        "yref": "y",
                        "sizex": self.config.marker_image_size,
                        "sizey": self.config.marker_image_size,
                        "xanchor": "center",
                        "yanchor": "middle"
                    })
                })
                .collect()
        };

        let figure = json!({
            "data": [{
                "type": "scatter",
                "mode": "lines+markers+text",
                "x": dates,
                "y": minima.iter().map(|m| m.miss_distance_km).collect::<Vec<_>>(),
                "text": names.clone(),
                "customdata": names,
                "textposition": "top center",
                "textfont": { "size": 20 },
                "marker": { "size": marker_size },
                "hovertemplate": concat!(
                    "Name: %{customdata}<br>Date: %{x|%Y-%m-%d}",
                    "<br>Miss Distance: %{y:.2f} km<extra></extra>"
                )
            }],
            "layout": {
                "title": { "text": title, "font": { "size": 24 } },
                "width": 1400,
                "height": 800,
                "font": { "size": 23 },
                "images": images,
                "xaxis": { "title": { "text": "Close Approach Date" }, "type": "date" },
                "yaxis": { "title": { "text": "Minimum Miss Distance (km)" } }
            }
        });

        Some(ChartSpec {
            id: id.to_string(),
            title: title.to_string(),
            figure,
        })
    }

    /// 3D scatter with one marker per diameter bin, stepped along z.
    pub fn diameter_bins_3d(
        &self,
        id: &str,
        title: &str,
        bins: &[DiameterBin],
        style: BinChartStyle,
    ) -> Option<ChartSpec> {
        if bins.is_empty() {
            return None;
        }

        let midpoints: Vec<i64> = bins.iter().map(|b| b.midpoint).collect();
        let x_min = midpoints.iter().copied().min().unwrap_or(0) as f64;
        let x_max = midpoints.iter().copied().max().unwrap_or(0) as f64;
        let x_pad = (x_max - x_min) * style.pad_ratio;
        let size_scale = if x_max > 0.0 { 100.0 / x_max } else { 1.0 };
        let steps: Vec<usize> = (0..bins.len()).collect();

        let figure = json!({
            "data": [{
                "type": "scatter3d",
                "mode": "markers+text",
                "x": midpoints.clone(),
                "y": vec![0.5; bins.len()],
                "z": steps.clone(),
                "text": bins.iter().map(style.bin_text).collect::<Vec<_>>(),
                "textposition": "top center",
                "marker": {
                    "size": midpoints.iter().map(|&m| m as f64 * size_scale).collect::<Vec<_>>(),
                    "color": midpoints,
                    "colorscale": "Viridis",
                    "opacity": 0.8
                },
                "hovertemplate": format!(
                    "{}: %{{x}}m<br>%{{text}}<extra></extra>",
                    style.midpoint_label
                )
            }],
            "layout": {
                "title": { "text": title, "font": { "size": 24 } },
                "width": 1100,
                "height": 1100,
                "font": { "size": 16 },
                "scene": {
                    "xaxis": {
                        "title": { "text": format!("{} (m)", style.midpoint_label) },
                        "range": [x_min - x_pad, x_max + x_pad]
                    },
                    "yaxis": { "title": { "text": "" }, "showticklabels": false, "range": [0, 1] },
                    "zaxis": {
                        "title": { "text": "" },
                        "tickvals": steps,
                        "showticklabels": false,
                        "range": [-1, bins.len()]
                    }
                }
            }
        });

        Some(ChartSpec {
            id: id.to_string(),
            title: title.to_string(),
            figure,
        })
    }
}
