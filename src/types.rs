use geo_types::{Coord, Rect};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// How a category's files are stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    Vector,
    Raster,
}

/// Top-level dropdown grouping of categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataMode {
    /// Single-date datasets (population, land cover, ...).
    Snapshot,
    /// Two-band change-detection products keyed by year range.
    Change,
}

impl DataMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataMode::Snapshot => "snapshot",
            DataMode::Change => "change",
        }
    }
}

/// Year (or year range) a dataset file belongs to, as inferred from its name.
///
/// The string form is what the UI sees and sends back: `2020`, `2015_2020`
/// or `N/A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum YearKey {
    Year(i32),
    Range { start: i32, end: i32 },
    NotAvailable,
}

pub const NOT_AVAILABLE: &str = "N/A";

impl YearKey {
    fn rank(&self) -> u8 {
        match self {
            YearKey::Year(_) => 0,
            YearKey::Range { .. } => 1,
            YearKey::NotAvailable => 2,
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, YearKey::NotAvailable)
    }
}

impl Ord for YearKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (YearKey::Year(a), YearKey::Year(b)) => a.cmp(b),
            (
                YearKey::Range { start: s1, end: e1 },
                YearKey::Range { start: s2, end: e2 },
            ) => (s1, e1).cmp(&(s2, e2)),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for YearKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for YearKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YearKey::Year(year) => write!(f, "{}", year),
            YearKey::Range { start, end } => write!(f, "{}_{}", start, end),
            YearKey::NotAvailable => f.write_str(NOT_AVAILABLE),
        }
    }
}

impl FromStr for YearKey {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(NOT_AVAILABLE) {
            return Ok(YearKey::NotAvailable);
        }
        let invalid = || DashboardError::InvalidYear(s.to_string());
        match s.split_once('_') {
            Some((start, end)) => Ok(YearKey::Range {
                start: start.parse().map_err(|_| invalid())?,
                end: end.parse().map_err(|_| invalid())?,
            }),
            None => s.parse().map(YearKey::Year).map_err(|_| invalid()),
        }
    }
}

impl TryFrom<String> for YearKey {
    type Error = DashboardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearKey> for String {
    fn from(key: YearKey) -> Self {
        key.to_string()
    }
}

/// A decoded raster, band 1 as `primary` and band 2 (or all-NaN) as `difference`.
#[derive(Debug, Clone)]
pub struct RasterLayer {
    pub primary: Array2<f32>,
    pub difference: Array2<f32>,
    pub transform: [f64; 6],
    pub projection: String,
    pub no_data_value: Option<f32>,
    /// Rows are stored south-to-north (change-detection rasters).
    pub flipped: bool,
    pub filename: String,
}

impl RasterLayer {
    /// (rows, cols)
    pub fn dim(&self) -> (usize, usize) {
        self.primary.dim()
    }

    pub fn bounds(&self) -> Rect<f64> {
        let (height, width) = self.dim();
        let t = &self.transform;
        let x0 = t[0];
        let x1 = t[0] + width as f64 * t[1] + height as f64 * t[2];
        let y0 = t[3];
        let y1 = t[3] + width as f64 * t[4] + height as f64 * t[5];
        Rect::new(Coord { x: x0, y: y0 }, Coord { x: x1, y: y1 })
    }

    /// Summary statistics over band 1, skipping missing cells.
    pub fn stats(&self) -> Option<GridStats> {
        GridStats::from_values(self.primary.iter().copied())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub count: usize,
}

impl GridStats {
    pub fn from_values(values: impl Iterator<Item = f32>) -> Option<Self> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut count = 0usize;
        for v in values.filter(|v| v.is_finite()) {
            let v = v as f64;
            min = min.min(v);
            max = max.max(v);
            sum += v;
            count += 1;
        }
        (count > 0).then(|| GridStats {
            min,
            max,
            mean: sum / count as f64,
            count,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorFeature {
    /// GeoJSON geometry object, `null` for features without geometry.
    pub geometry: serde_json::Value,
    pub properties: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct VectorLayer {
    pub features: Vec<VectorFeature>,
    pub columns: Vec<String>,
    pub extent: Option<Rect<f64>>,
    pub filename: String,
}

pub const COLOR_COLUMN_CANDIDATES: [&str; 5] = ["admin_level", "level", "type", "class", "category"];

impl VectorLayer {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// First recognised classification column, `None` means color by row index.
    pub fn color_column(&self) -> Option<&'static str> {
        COLOR_COLUMN_CANDIDATES
            .iter()
            .copied()
            .find(|candidate| self.columns.iter().any(|c| c == candidate))
    }
}

#[derive(Debug, Clone)]
pub enum Layer {
    Raster(RasterLayer),
    Vector(VectorLayer),
}

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Unknown category: {0}")]
    UnknownCategory(String),
    #[error("Invalid year: {0}")]
    InvalidYear(String),
    #[error("Localization table error: {0}")]
    Localization(String),
    #[error("Unexpected raster shape: {0}")]
    Shape(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_keys_parse_and_print() {
        assert_eq!("2020".parse::<YearKey>().unwrap(), YearKey::Year(2020));
        assert_eq!(
            "2015_2020".parse::<YearKey>().unwrap(),
            YearKey::Range { start: 2015, end: 2020 }
        );
        assert_eq!("N/A".parse::<YearKey>().unwrap(), YearKey::NotAvailable);
        assert!("twenty".parse::<YearKey>().is_err());
        assert_eq!(YearKey::Range { start: 2001, end: 2010 }.to_string(), "2001_2010");
    }

    #[test]
    fn year_keys_sort_years_then_ranges_then_missing() {
        let mut keys = vec![
            YearKey::NotAvailable,
            YearKey::Range { start: 2000, end: 2010 },
            YearKey::Year(2020),
            YearKey::Year(2010),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                YearKey::Year(2010),
                YearKey::Year(2020),
                YearKey::Range { start: 2000, end: 2010 },
                YearKey::NotAvailable,
            ]
        );
    }

    #[test]
    fn year_key_serializes_as_string() {
        let json = serde_json::to_string(&YearKey::Year(2020)).unwrap();
        assert_eq!(json, "\"2020\"");
        let back: YearKey = serde_json::from_str("\"2015_2020\"").unwrap();
        assert_eq!(back, YearKey::Range { start: 2015, end: 2020 });
    }

    #[test]
    fn stats_skip_missing_cells() {
        let stats = GridStats::from_values([1.0, f32::NAN, 3.0].into_iter()).unwrap();
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 3.0);
        assert_eq!(stats.mean, 2.0);
        assert_eq!(stats.count, 2);
        assert!(GridStats::from_values([f32::NAN].into_iter()).is_none());
    }
}
