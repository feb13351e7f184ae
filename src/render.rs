//! Figure descriptions handed to the web view.
//!
//! Nothing here draws pixels: a figure is the data plus the color policy
//! (scale, binning, ticks, hover text) the front end needs to plot it.

use crate::config::{title_case, Category};
use crate::i18n::{Language, Localizer, MessageKey};
use crate::types::{RasterLayer, VectorLayer, YearKey};
use crate::vector_io::VectorIO;
use ndarray::{Array2, Zip};
use serde::Serialize;

pub const GPP_BREAKPOINTS: [f64; 11] = [
    0.0, 150.0, 300.0, 450.0, 600.0, 750.0, 900.0, 1100.0, 1500.0, 4000.0, 60000.0,
];
pub const POPULATION_BREAKPOINTS: [f64; 12] = [
    0.0, 1.0, 2.0, 4.0, 8.0, 15.0, 30.0, 50.0, 100.0, 200.0, 500.0, 1000.0,
];

pub const CHANGE_DECLINE: f32 = 0.0;
pub const CHANGE_NEUTRAL: f32 = 0.5;
pub const CHANGE_IMPROVEMENT: f32 = 1.0;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ColorScale {
    Named(String),
    Stops(Vec<(f64, String)>),
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ColorBar {
    pub title: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tick_vals: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tick_text: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeatmapFigure {
    pub title: String,
    /// Longitude of each column.
    pub x: Vec<f64>,
    /// Latitude of each row.
    pub y: Vec<f64>,
    /// Row-major grid, `None` for missing cells.
    pub z: Vec<Vec<Option<f32>>>,
    pub zmin: Option<f64>,
    pub zmax: Option<f64>,
    pub color_scale: ColorScale,
    pub color_bar: ColorBar,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hover_text: Option<Vec<Vec<String>>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChoroplethFigure {
    pub title: String,
    pub geojson: serde_json::Value,
    /// One value per feature, aligned with the GeoJSON feature ids.
    pub color_values: Vec<serde_json::Value>,
    pub color_title: String,
    pub color_scale: ColorScale,
    pub center: Option<(f64, f64)>,
    pub opacity: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendFigure {
    pub title: String,
    pub x: Vec<String>,
    pub y: Vec<Option<f64>>,
    pub x_title: String,
    pub y_title: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Figure {
    Heatmap(HeatmapFigure),
    Choropleth(ChoroplethFigure),
    Trend(TrendFigure),
    Message { title: String, message: String },
}

impl Figure {
    pub fn message(title: impl Into<String>, message: impl Into<String>) -> Self {
        Figure::Message {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Evenly spaced `n` values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Piecewise-linear map of `value` from `breakpoints` onto evenly spaced
/// positions in [0, 1]; clamped outside the first and last breakpoint.
pub fn normalize_by_breakpoints(value: f64, breakpoints: &[f64]) -> f64 {
    let n = breakpoints.len();
    if n < 2 {
        return 0.0;
    }
    if value <= breakpoints[0] {
        return 0.0;
    }
    if value >= breakpoints[n - 1] {
        return 1.0;
    }
    let step = 1.0 / (n - 1) as f64;
    let i = breakpoints.windows(2).position(|w| value < w[1]).unwrap_or(n - 2);
    let (lo, hi) = (breakpoints[i], breakpoints[i + 1]);
    let frac = if hi > lo { (value - lo) / (hi - lo) } else { 0.0 };
    (i as f64 + frac) * step
}

/// Three-valued change map: decline, improvement, or neutral; NaN otherwise.
pub fn change_mask(primary: &Array2<f32>, difference: &Array2<f32>) -> Array2<f32> {
    let mut mask = Array2::from_elem(primary.dim(), f32::NAN);
    Zip::from(&mut mask)
        .and(primary)
        .and(difference)
        .for_each(|m, &p, &d| {
            *m = if p == 1.0 && d < 0.0 {
                CHANGE_DECLINE
            } else if p == 1.0 && d > 0.0 {
                CHANGE_IMPROVEMENT
            } else if p == 0.0 {
                CHANGE_NEUTRAL
            } else {
                f32::NAN
            };
        });
    mask
}

fn to_rows(grid: &Array2<f32>) -> Vec<Vec<Option<f32>>> {
    grid.outer_iter()
        .map(|row| row.iter().map(|v| v.is_finite().then_some(*v)).collect())
        .collect()
}

fn format_cell(v: f32) -> String {
    if v.is_finite() {
        format!("{}", v)
    } else {
        "NaN".to_string()
    }
}

/// Longitudes per column and latitudes per row, the grid's shape by construction.
pub fn axes(layer: &RasterLayer) -> (Vec<f64>, Vec<f64>) {
    let (height, width) = layer.dim();
    let bounds = layer.bounds();
    let lons = linspace(bounds.min().x, bounds.max().x, width);
    let lats = if layer.flipped {
        linspace(bounds.min().y, bounds.max().y, height)
    } else {
        linspace(bounds.max().y, bounds.min().y, height)
    };
    (lons, lats)
}

fn land_cover_scale(loc: &Localizer, lang: Language) -> (ColorScale, ColorBar) {
    let colors = [
        "rgb(0,0,0)",
        "rgb(0,100,0)",
        "rgb(144,238,144)",
        "rgb(255,255,0)",
        "rgb(128,128,128)",
        "rgb(0,0,255)",
        "rgb(255,228,181)",
    ];
    let classes = [
        MessageKey::LandUnclassified,
        MessageKey::LandForest,
        MessageKey::LandGrassland,
        MessageKey::LandCropland,
        MessageKey::LandUrban,
        MessageKey::LandWater,
        MessageKey::LandDesert,
    ];
    let stops = colors
        .iter()
        .enumerate()
        .map(|(i, c)| (i as f64 / 6.0, c.to_string()))
        .collect();
    let bar = ColorBar {
        title: loc.text(lang, MessageKey::LandCoverClass),
        tick_vals: (0..7).map(f64::from).collect(),
        tick_text: classes.iter().map(|k| loc.text(lang, *k)).collect(),
    };
    (ColorScale::Stops(stops), bar)
}

pub struct Renderer<'a> {
    pub localizer: &'a Localizer,
    pub language: Language,
}

impl<'a> Renderer<'a> {
    pub fn new(localizer: &'a Localizer, language: Language) -> Self {
        Self { localizer, language }
    }

    fn title(&self, category: &Category, year: &YearKey) -> String {
        format!("{} - {}", category.label(self.language.code()), year)
    }

    pub fn raster_figure(&self, category: &Category, year: &YearKey, layer: &RasterLayer) -> Figure {
        let (x, y) = axes(layer);
        let title = self.title(category, year);

        if category.change_detection {
            return Figure::Heatmap(self.change_figure(title, x, y, layer));
        }

        let breakpoints: Option<&[f64]> = match category.key.as_str() {
            "gross_primary_production" => Some(&GPP_BREAKPOINTS),
            "population_density" => Some(&POPULATION_BREAKPOINTS),
            _ => None,
        };

        if let Some(breakpoints) = breakpoints {
            let normalized = layer.primary.mapv(|v| {
                if v.is_finite() {
                    normalize_by_breakpoints(v as f64, breakpoints) as f32
                } else {
                    f32::NAN
                }
            });
            return Figure::Heatmap(HeatmapFigure {
                title,
                x,
                y,
                z: to_rows(&normalized),
                zmin: Some(0.0),
                zmax: Some(1.0),
                color_scale: ColorScale::Named(
                    category.color_scale.clone().unwrap_or_else(|| "Viridis".into()),
                ),
                color_bar: ColorBar {
                    title: category.unit.clone(),
                    tick_vals: linspace(0.0, 1.0, breakpoints.len()),
                    tick_text: breakpoints.iter().map(|b| format!("{}", b)).collect(),
                },
                hover_text: None,
            });
        }

        let stats = layer.stats();
        if category.key == "land_cover" {
            let (color_scale, color_bar) = land_cover_scale(self.localizer, self.language);
            return Figure::Heatmap(HeatmapFigure {
                title,
                x,
                y,
                z: to_rows(&layer.primary),
                zmin: Some(0.0),
                zmax: Some(6.0),
                color_scale,
                color_bar,
                hover_text: None,
            });
        }

        Figure::Heatmap(HeatmapFigure {
            title,
            x,
            y,
            z: to_rows(&layer.primary),
            zmin: stats.map(|s| s.min),
            zmax: stats.map(|s| s.max),
            color_scale: ColorScale::Named(
                category.color_scale.clone().unwrap_or_else(|| "Viridis".into()),
            ),
            color_bar: ColorBar {
                title: category.unit.clone(),
                ..ColorBar::default()
            },
            hover_text: None,
        })
    }

    fn change_figure(&self, title: String, x: Vec<f64>, y: Vec<f64>, layer: &RasterLayer) -> HeatmapFigure {
        let mask = change_mask(&layer.primary, &layer.difference);
        let value_label = self.localizer.text(self.language, MessageKey::HoverValue);
        let diff_label = self.localizer.text(self.language, MessageKey::HoverDifference);

        let hover: Vec<Vec<String>> = layer
            .primary
            .outer_iter()
            .zip(layer.difference.outer_iter())
            .map(|(p_row, d_row)| {
                p_row
                    .iter()
                    .zip(d_row.iter())
                    .map(|(p, d)| {
                        format!("{}: {}<br>{}: {}", value_label, format_cell(*p), diff_label, format_cell(*d))
                    })
                    .collect()
            })
            .collect();

        HeatmapFigure {
            title,
            x,
            y,
            z: to_rows(&mask),
            zmin: Some(0.0),
            zmax: Some(1.0),
            color_scale: ColorScale::Stops(vec![
                (0.0, "red".into()),
                (0.5, "gray".into()),
                (1.0, "green".into()),
            ]),
            color_bar: ColorBar {
                title: String::new(),
                tick_vals: vec![0.0, 0.5, 1.0],
                tick_text: vec![
                    self.localizer.text(self.language, MessageKey::Decline),
                    self.localizer.text(self.language, MessageKey::Neutral),
                    self.localizer.text(self.language, MessageKey::Improvement),
                ],
            },
            hover_text: Some(hover),
        }
    }

    pub fn vector_figure(&self, category: &Category, year: &YearKey, layer: &VectorLayer) -> Figure {
        let (color_values, color_title) = match layer.color_column() {
            Some(column) => (
                layer
                    .features
                    .iter()
                    .map(|f| f.properties.get(column).cloned().unwrap_or(serde_json::Value::Null))
                    .collect(),
                title_case(column),
            ),
            None => (
                (0..layer.len())
                    .map(|i| serde_json::Value::String(i.to_string()))
                    .collect(),
                self.localizer.text(self.language, MessageKey::RegionId),
            ),
        };

        let center = layer.extent.map(|r| {
            let c = r.center();
            (c.x, c.y)
        });

        Figure::Choropleth(ChoroplethFigure {
            title: self.title(category, year),
            geojson: VectorIO::to_geojson(layer),
            color_values,
            color_title,
            color_scale: ColorScale::Named("Viridis".into()),
            center,
            opacity: 0.7,
        })
    }

    pub fn raster_info(&self, category: &Category, year: &YearKey, layer: &RasterLayer) -> Vec<String> {
        let loc = self.localizer;
        let lang = self.language;
        let (rows, cols) = layer.dim();
        let mut info = vec![
            loc.format(lang, MessageKey::InfoDataType, &[&category.label(lang.code())]),
            loc.format(lang, MessageKey::InfoYear, &[&year.to_string()]),
            loc.format(lang, MessageKey::InfoFile, &[&layer.filename]),
            loc.format(lang, MessageKey::InfoDimensions, &[&rows.to_string(), &cols.to_string()]),
        ];
        match layer.stats() {
            Some(stats) => {
                info.push(loc.format(lang, MessageKey::InfoMin, &[&format!("{:.2}", stats.min)]));
                info.push(loc.format(lang, MessageKey::InfoMax, &[&format!("{:.2}", stats.max)]));
                info.push(loc.format(lang, MessageKey::InfoMean, &[&format!("{:.2}", stats.mean)]));
            }
            None => info.push(loc.text(lang, MessageKey::AllMissing)),
        }
        info
    }

    pub fn vector_info(&self, category: &Category, year: &YearKey, layer: &VectorLayer) -> Vec<String> {
        let loc = self.localizer;
        let lang = self.language;
        vec![
            loc.format(lang, MessageKey::InfoDataType, &[&category.label(lang.code())]),
            loc.format(lang, MessageKey::InfoYear, &[&year.to_string()]),
            loc.format(lang, MessageKey::InfoFile, &[&layer.filename]),
            loc.format(lang, MessageKey::InfoElementCount, &[&layer.len().to_string()]),
            loc.format(lang, MessageKey::InfoColumns, &[&layer.columns.join(", ")]),
        ]
    }
}
