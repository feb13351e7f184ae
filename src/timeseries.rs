//! Per-pixel history across every indexed year of a raster category.

use crate::config::{Category, DashboardConfig};
use crate::loader::load_raster;
use crate::raster_io::RasterIO;
use crate::resolver::resolve_files;
use crate::types::YearKey;
use geo_types::Coord;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub year: YearKey,
    pub value: Option<f64>,
}

/// Lazily evaluated pixel history at one coordinate.
///
/// Nothing is read until iterated; each call to [`PixelHistory::iter`]
/// re-reads every raster.
pub struct PixelHistory<'a> {
    config: &'a DashboardConfig,
    category: &'a Category,
    years: &'a [YearKey],
    at: Coord<f64>,
}

impl<'a> PixelHistory<'a> {
    pub fn new(config: &'a DashboardConfig, category: &'a Category, years: &'a [YearKey], at: Coord<f64>) -> Self {
        Self {
            config,
            category,
            years,
            at,
        }
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// One point per indexed year, in index order; gaps are `None`.
    pub fn iter(&self) -> impl Iterator<Item = SeriesPoint> + '_ {
        self.years.iter().map(move |year| SeriesPoint {
            year: *year,
            value: self.value_for(year),
        })
    }

    fn value_for(&self, year: &YearKey) -> Option<f64> {
        let files = resolve_files(self.config, self.category, year);
        let path = files.raster.first()?;
        match load_raster(self.config, self.category, path) {
            Ok(layer) => RasterIO::sample(&layer, self.at),
            Err(e) => {
                tracing::warn!(
                    category = %self.category.key,
                    %year,
                    "Skipping {} in pixel history: {}",
                    path.display(),
                    e
                );
                None
            }
        }
    }
}
