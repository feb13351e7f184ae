//! Folder-at-a-glance viewers: every GeoTIFF (or every shapefile) of one
//! folder laid out on a near-square grid.

use crate::catalog::basename;
use crate::raster_io::RasterIO;
use crate::render::{axes, ColorBar, ColorScale};
use crate::types::{DashboardError, RasterLayer};
use crate::vector_io::VectorIO;
use ndarray::Array2;
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const DEFAULT_BOUNDARIES: [f64; 4] = [1000.0, 2000.0, 5000.0, 10000.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridLayout {
    pub rows: usize,
    pub cols: usize,
}

impl GridLayout {
    /// Smallest near-square grid holding `n` panels.
    pub fn for_count(n: usize) -> Self {
        if n == 0 {
            return GridLayout { rows: 0, cols: 0 };
        }
        let cols = (n as f64).sqrt().ceil() as usize;
        let rows = n.div_ceil(cols);
        GridLayout { rows, cols }
    }
}

/// Class index of `value` among `boundaries`: `i` when `b[i] <= v < b[i + 1]`.
/// Values outside the boundaries, and missing values, have no class.
pub fn boundary_class(value: f32, boundaries: &[f64]) -> Option<usize> {
    if !value.is_finite() {
        return None;
    }
    let v = value as f64;
    boundaries.windows(2).position(|w| w[0] <= v && v < w[1])
}

#[derive(Debug, Clone, Serialize)]
pub struct RasterPanel {
    pub title: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// Class index per cell; class `i` spans `boundaries[i]..boundaries[i + 1]`.
    pub classes: Vec<Vec<Option<usize>>>,
    pub zmin: f64,
    pub zmax: f64,
    pub color_scale: ColorScale,
    pub color_bar: ColorBar,
}

#[derive(Debug, Clone, Serialize)]
pub struct VectorPanel {
    pub title: String,
    pub geojson: serde_json::Value,
    pub x_title: String,
    pub y_title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Gallery<P> {
    pub layout: GridLayout,
    pub panels: Vec<P>,
    /// Set when the folder held nothing to show.
    pub message: Option<String>,
}

fn files_with_extension(folder: &Path, ext: &str) -> Result<Vec<PathBuf>, DashboardError> {
    if !folder.is_dir() {
        return Err(DashboardError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not a directory", folder.display()),
        )));
    }
    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry in {}: {}", folder.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map_or(false, |e| e.eq_ignore_ascii_case(ext))
        })
        .collect();
    files.sort();
    Ok(files)
}

fn raster_panel(layer: &RasterLayer, boundaries: &[f64], unit: &str) -> RasterPanel {
    let (x, y) = axes(layer);
    let classes: Array2<Option<usize>> = layer.primary.mapv(|v| boundary_class(v, boundaries));
    let n_classes = boundaries.len().saturating_sub(1).max(1);
    RasterPanel {
        title: layer.filename.clone(),
        x,
        y,
        classes: classes.outer_iter().map(|row| row.to_vec()).collect(),
        zmin: 0.0,
        zmax: (n_classes - 1) as f64,
        color_scale: ColorScale::Named("Plasma".into()),
        color_bar: ColorBar {
            title: unit.to_string(),
            tick_vals: (0..n_classes).map(|i| i as f64).collect(),
            tick_text: boundaries
                .windows(2)
                .map(|w| format!("{} - {}", w[0], w[1]))
                .collect(),
        },
    }
}

/// Every `.tif` directly inside `folder`, binned by `boundaries`.
///
/// `empty_message` is reported when no file is found.
pub fn tiff_gallery(
    folder: &Path,
    boundaries: &[f64],
    unit: &str,
    empty_message: impl FnOnce() -> String,
) -> Result<Gallery<RasterPanel>, DashboardError> {
    let files = files_with_extension(folder, "tif")?;
    if files.is_empty() {
        return Ok(Gallery {
            layout: GridLayout::for_count(0),
            panels: Vec::new(),
            message: Some(empty_message()),
        });
    }

    let mut panels = Vec::with_capacity(files.len());
    for path in &files {
        match RasterIO::read_layer(path, false) {
            Ok(layer) => panels.push(raster_panel(&layer, boundaries, unit)),
            Err(e) => tracing::warn!("Skipping {} in gallery: {}", basename(path), e),
        }
    }

    Ok(Gallery {
        layout: GridLayout::for_count(panels.len()),
        panels,
        message: None,
    })
}

/// Every `.shp` directly inside `folder`; unreadable files are skipped.
pub fn shapefile_gallery(
    folder: &Path,
    x_title: &str,
    y_title: &str,
    empty_message: impl FnOnce() -> String,
) -> Result<Gallery<VectorPanel>, DashboardError> {
    let files = files_with_extension(folder, "shp")?;
    if files.is_empty() {
        return Ok(Gallery {
            layout: GridLayout::for_count(0),
            panels: Vec::new(),
            message: Some(empty_message()),
        });
    }

    let panels: Vec<VectorPanel> = files
        .iter()
        .filter_map(|path| match VectorIO::read_layer(path) {
            Ok(layer) => Some(VectorPanel {
                title: layer.filename.clone(),
                geojson: VectorIO::to_geojson(&layer),
                x_title: x_title.to_string(),
                y_title: y_title.to_string(),
            }),
            Err(e) => {
                tracing::warn!("Error reading {}: {}", path.display(), e);
                None
            }
        })
        .collect();

    Ok(Gallery {
        layout: GridLayout::for_count(panels.len()),
        panels,
        message: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster_io::testutil::{degree_transform, write_geotiff};
    use ndarray::array;

    #[test]
    fn layout_is_near_square() {
        assert_eq!(GridLayout::for_count(1), GridLayout { rows: 1, cols: 1 });
        assert_eq!(GridLayout::for_count(3), GridLayout { rows: 2, cols: 2 });
        assert_eq!(GridLayout::for_count(5), GridLayout { rows: 2, cols: 3 });
        assert_eq!(GridLayout::for_count(10), GridLayout { rows: 3, cols: 4 });
        assert_eq!(GridLayout::for_count(0), GridLayout { rows: 0, cols: 0 });
    }

    #[test]
    fn boundary_classes_are_half_open() {
        let b = DEFAULT_BOUNDARIES;
        assert_eq!(boundary_class(999.0, &b), None);
        assert_eq!(boundary_class(1000.0, &b), Some(0));
        assert_eq!(boundary_class(4999.0, &b), Some(1));
        assert_eq!(boundary_class(5000.0, &b), Some(2));
        assert_eq!(boundary_class(10000.0, &b), None);
        assert_eq!(boundary_class(f32::NAN, &b), None);
    }

    #[test]
    fn tiff_gallery_masks_nodata_and_skips_other_files() {
        let dir = tempfile::tempdir().unwrap();
        write_geotiff(
            &dir.path().join("b_2020.tif"),
            &[array![[1500.0f32, -9999.0]]],
            &degree_transform(0.0, 1.0),
            Some(-9999.0),
        );
        write_geotiff(
            &dir.path().join("a_2019.tif"),
            &[array![[6000.0f32]]],
            &degree_transform(0.0, 1.0),
            None,
        );
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let gallery = tiff_gallery(dir.path(), &DEFAULT_BOUNDARIES, "people/km²", || "empty".into()).unwrap();
        assert_eq!(gallery.layout, GridLayout { rows: 1, cols: 2 });
        assert_eq!(gallery.panels.len(), 2);
        assert_eq!(gallery.panels[0].title, "a_2019.tif");
        assert_eq!(gallery.panels[0].classes, vec![vec![Some(2)]]);
        assert_eq!(gallery.panels[1].classes, vec![vec![Some(0), None]]);
        assert!(gallery.message.is_none());

        let bar = &gallery.panels[0].color_bar;
        assert_eq!(bar.tick_vals, vec![0.0, 1.0, 2.0]);
        assert_eq!(bar.tick_text, vec!["1000 - 2000", "2000 - 5000", "5000 - 10000"]);
        assert_eq!(gallery.panels[0].zmax, 2.0);
    }

    #[test]
    fn gallery_lists_only_the_folder_itself() {
        let dir = tempfile::tempdir().unwrap();
        write_geotiff(&dir.path().join("top.TIF"), &[array![[1500.0f32]]], &degree_transform(0.0, 1.0), None);
        let nested = dir.path().join("nested");
        std::fs::create_dir_all(&nested).unwrap();
        write_geotiff(&nested.join("deep.tif"), &[array![[1500.0f32]]], &degree_transform(0.0, 1.0), None);

        let gallery = tiff_gallery(dir.path(), &DEFAULT_BOUNDARIES, "", || "empty".into()).unwrap();
        let titles: Vec<_> = gallery.panels.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["top.TIF"]);
        assert_eq!(gallery.layout, GridLayout { rows: 1, cols: 1 });
    }

    #[test]
    fn missing_folder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(tiff_gallery(&dir.path().join("absent"), &DEFAULT_BOUNDARIES, "", || "empty".into()).is_err());
    }

    #[test]
    fn empty_folder_reports_message() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = shapefile_gallery(dir.path(), "Longitude", "Latitude", || "nothing here".into()).unwrap();
        assert!(gallery.panels.is_empty());
        assert_eq!(gallery.message.as_deref(), Some("nothing here"));
    }
}
