use crate::catalog::basename;
use crate::config::{Category, DashboardConfig};
use crate::raster_io::{is_change_detection_file, RasterIO};
use crate::types::{DashboardError, Layer, RasterLayer, StorageKind};
use crate::vector_io::VectorIO;
use std::path::Path;

/// Reads a raster for `category`, applying change-detection handling when
/// either the category or the filename calls for it.
pub fn load_raster(
    config: &DashboardConfig,
    category: &Category,
    path: &Path,
) -> Result<RasterLayer, DashboardError> {
    let change_detection = category.change_detection
        || is_change_detection_file(&basename(path), config.change_detection_keys());
    RasterIO::read_layer(path, change_detection)
}

pub fn load_layer(config: &DashboardConfig, category: &Category, path: &Path) -> Result<Layer, DashboardError> {
    match category.storage {
        StorageKind::Raster => load_raster(config, category, path).map(Layer::Raster),
        StorageKind::Vector => VectorIO::read_layer(path).map(Layer::Vector),
    }
}
