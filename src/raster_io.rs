use crate::types::*;
use gdal::raster::ResampleAlg;
use gdal::Dataset;
use geo_types::Coord;
use ndarray::{Array2, Axis};
use std::path::Path;

/// Primary-band value that means "no measurement" in change-detection rasters.
pub const CHANGE_SENTINEL: f32 = -1.0;

pub struct RasterIO;

impl RasterIO {
    /// Reads band 1 (and band 2 when present) with nodata mapped to NaN.
    ///
    /// With `change_detection` set, `-1` in band 1 is also treated as missing
    /// and both grids are flipped to south-to-north row order.
    pub fn read_layer(path: &Path, change_detection: bool) -> Result<RasterLayer, DashboardError> {
        let dataset = Dataset::open(path)?;
        let transform = dataset.geo_transform()?;
        let projection = dataset.projection();

        let n_bands = dataset.raster_count() as usize;
        if n_bands == 0 {
            return Err(DashboardError::Shape("No bands found in raster".to_string()));
        }

        let band = dataset.rasterband(1)?;
        let no_data_value = band.no_data_value().map(|v| v as f32);
        let (width, height) = band.size();

        let mut primary = Self::read_band(&dataset, 1, width, height)?;
        let mut difference = if n_bands >= 2 {
            Self::read_band(&dataset, 2, width, height)?
        } else {
            Array2::from_elem((height, width), f32::NAN)
        };

        if change_detection {
            mask_value(&mut primary, CHANGE_SENTINEL);
            primary.invert_axis(Axis(0));
            difference.invert_axis(Axis(0));
        }
        if let Some(nodata) = no_data_value {
            mask_value(&mut primary, nodata);
            mask_value(&mut difference, nodata);
        }

        tracing::debug!(
            file = %path.display(),
            bands = n_bands,
            width,
            height,
            ?no_data_value,
            change_detection,
            "Read raster"
        );

        Ok(RasterLayer {
            primary,
            difference,
            transform,
            projection,
            no_data_value,
            flipped: change_detection,
            filename: crate::catalog::basename(path),
        })
    }

    fn read_band(
        dataset: &Dataset,
        index: usize,
        width: usize,
        height: usize,
    ) -> Result<Array2<f32>, DashboardError> {
        let band = dataset.rasterband(index as isize)?;
        let mut data = vec![0f32; width * height];
        band.read_into_slice(
            (0, 0),
            (width, height),
            (width, height),
            &mut data,
            Some(ResampleAlg::NearestNeighbour),
        )?;

        Array2::from_shape_vec((height, width), data).map_err(|e| {
            DashboardError::Shape(format!("Failed to create array for band {}: {}", index, e))
        })
    }

    /// Inverse of a GDAL geotransform, `None` when it is singular.
    pub fn invert_transform(transform: &[f64; 6]) -> Option<[f64; 6]> {
        let det = transform[1] * transform[5] - transform[2] * transform[4];
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        Some([
            -transform[0] * transform[5] / det + transform[2] * transform[3] / det,
            transform[5] / det,
            -transform[2] / det,
            transform[0] * transform[4] / det - transform[1] * transform[3] / det,
            -transform[4] / det,
            transform[1] / det,
        ])
    }

    /// (col, row) of the pixel nearest to `(x, y)`, rounded like the dashboard's click lookup.
    pub fn world_to_pixel(x: f64, y: f64, inv_transform: &[f64; 6]) -> (i64, i64) {
        let col = inv_transform[0] + inv_transform[1] * x + inv_transform[2] * y;
        let row = inv_transform[3] + inv_transform[4] * x + inv_transform[5] * y;
        (col.round() as i64, row.round() as i64)
    }

    pub fn pixel_to_world(col: usize, row: usize, transform: &[f64; 6]) -> (f64, f64) {
        let x = transform[0] + col as f64 * transform[1] + row as f64 * transform[2];
        let y = transform[3] + col as f64 * transform[4] + row as f64 * transform[5];
        (x, y)
    }

    /// Band-1 value under a geographic coordinate.
    ///
    /// Outside the grid, on a singular transform or on a missing cell the
    /// result is `None`.
    pub fn sample(layer: &RasterLayer, at: Coord<f64>) -> Option<f64> {
        let inv = Self::invert_transform(&layer.transform)?;
        let (col, row) = Self::world_to_pixel(at.x, at.y, &inv);
        let (height, width) = layer.dim();
        if col < 0 || row < 0 || col >= width as i64 || row >= height as i64 {
            return None;
        }
        let (col, row) = (col as usize, row as usize);
        let row = if layer.flipped { height - 1 - row } else { row };
        let value = layer.primary[[row, col]];
        value.is_finite().then_some(value as f64)
    }
}

fn mask_value(grid: &mut Array2<f32>, sentinel: f32) {
    grid.mapv_inplace(|v| if v == sentinel { f32::NAN } else { v });
}

/// True when a filename belongs to one of the change-detection categories.
pub fn is_change_detection_file<'a>(filename: &str, mut keys: impl Iterator<Item = &'a str>) -> bool {
    let name = filename.to_lowercase();
    keys.any(|key| name.contains(&key.to_lowercase()))
}

#[cfg(test)]
pub(crate) mod testutil {
    use gdal::raster::Buffer;
    use gdal::spatial_ref::SpatialRef;
    use gdal::DriverManager;
    use ndarray::Array2;
    use std::path::Path;

    /// 1-degree pixels anchored at (`origin_x`, `origin_y`), north-up.
    pub fn degree_transform(origin_x: f64, origin_y: f64) -> [f64; 6] {
        [origin_x, 1.0, 0.0, origin_y, 0.0, -1.0]
    }

    pub fn write_geotiff(
        path: &Path,
        bands: &[Array2<f32>],
        transform: &[f64; 6],
        no_data: Option<f64>,
    ) {
        let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
        let (height, width) = bands[0].dim();

        let mut dataset = driver
            .create_with_band_type::<f32, _>(path, width as isize, height as isize, bands.len() as isize)
            .unwrap();
        dataset.set_geo_transform(transform).unwrap();
        let wkt = SpatialRef::from_epsg(4326).unwrap().to_wkt().unwrap();
        dataset.set_projection(&wkt).unwrap();

        for (idx, data) in bands.iter().enumerate() {
            let mut band = dataset.rasterband((idx + 1) as isize).unwrap();
            if let Some(nd) = no_data {
                band.set_no_data_value(Some(nd)).unwrap();
            }
            let buffer = Buffer::new((width, height), data.iter().cloned().collect());
            band.write((0, 0), (width, height), &buffer).unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testutil::*;
    use super::*;
    use ndarray::array;

    #[test]
    fn nodata_cells_become_missing_and_skip_stats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pop_2020.tif");
        let grid = array![[1.0f32, 2.0], [-9999.0, 6.0]];
        write_geotiff(&path, &[grid], &degree_transform(-17.0, 26.0), Some(-9999.0));

        let layer = RasterIO::read_layer(&path, false).unwrap();
        assert_eq!(layer.dim(), (2, 2));
        assert_eq!(layer.no_data_value, Some(-9999.0));
        assert!(layer.primary[[1, 0]].is_nan());
        assert!(layer.difference.iter().all(|v| v.is_nan()));
        assert!(!layer.flipped);

        let stats = layer.stats().unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 6.0);
        assert_eq!(stats.mean, 3.0);

        let bounds = layer.bounds();
        assert_eq!(bounds.min().x, -17.0);
        assert_eq!(bounds.max().x, -15.0);
        assert_eq!(bounds.min().y, 24.0);
        assert_eq!(bounds.max().y, 26.0);
    }

    #[test]
    fn change_detection_masks_sentinel_and_flips_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deforestation_2015_2020.tif");
        let state = array![[1.0f32, -1.0], [0.0, 1.0]];
        let diff = array![[-3.0f32, -1.0], [0.0, 2.0]];
        write_geotiff(&path, &[state, diff], &degree_transform(0.0, 2.0), None);

        let layer = RasterIO::read_layer(&path, true).unwrap();
        assert!(layer.flipped);
        // row order reversed
        assert_eq!(layer.primary[[0, 0]], 0.0);
        assert_eq!(layer.primary[[0, 1]], 1.0);
        assert_eq!(layer.primary[[1, 0]], 1.0);
        assert!(layer.primary[[1, 1]].is_nan());
        // -1 stays a valid difference
        assert_eq!(layer.difference[[1, 1]], -1.0);
        assert_eq!(layer.difference[[0, 1]], 2.0);
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken_2020.tif");
        std::fs::write(&path, b"not a tiff").unwrap();
        assert!(RasterIO::read_layer(&path, false).is_err());
    }

    #[test]
    fn sample_rounds_to_nearest_pixel_and_checks_bounds() {
        let layer = RasterLayer {
            primary: array![[1.0f32, 2.0, 3.0], [4.0, f32::NAN, 6.0]],
            difference: Array2::from_elem((2, 3), f32::NAN),
            transform: degree_transform(10.0, 50.0),
            projection: String::new(),
            no_data_value: None,
            flipped: false,
            filename: "t.tif".into(),
        };
        assert_eq!(RasterIO::sample(&layer, Coord { x: 10.2, y: 49.9 }), Some(1.0));
        assert_eq!(RasterIO::sample(&layer, Coord { x: 11.6, y: 49.9 }), Some(3.0));
        assert_eq!(RasterIO::sample(&layer, Coord { x: 12.1, y: 49.0 }), Some(6.0));
        assert_eq!(RasterIO::sample(&layer, Coord { x: 11.0, y: 49.0 }), None);
        assert_eq!(RasterIO::sample(&layer, Coord { x: 9.0, y: 49.9 }), None);
        assert_eq!(RasterIO::sample(&layer, Coord { x: 10.2, y: 47.0 }), None);

        let flipped = RasterLayer { flipped: true, ..layer.clone() };
        assert_eq!(RasterIO::sample(&flipped, Coord { x: 10.2, y: 49.9 }), Some(4.0));

        let singular = RasterLayer {
            transform: [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            ..layer
        };
        assert_eq!(RasterIO::sample(&singular, Coord { x: 0.0, y: 0.0 }), None);
    }

    #[test]
    fn transform_round_trip() {
        let t = degree_transform(-17.0, 26.0);
        let inv = RasterIO::invert_transform(&t).unwrap();
        let (x, y) = RasterIO::pixel_to_world(3, 4, &t);
        assert_eq!(RasterIO::world_to_pixel(x, y, &inv), (3, 4));
    }

    #[test]
    fn change_detection_files_are_recognised_by_name() {
        let keys = ["deforestation", "land_cover_change"];
        assert!(is_change_detection_file("Deforestation_2015_2020.tif", keys.iter().copied()));
        assert!(is_change_detection_file("land_cover_change_2001_2020.tif", keys.iter().copied()));
        assert!(!is_change_detection_file("land_cover_2020.tif", keys.iter().copied()));
    }
}
