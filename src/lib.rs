//! Backend of the GeoAtlas dashboard: dataset catalog, file resolution,
//! GDAL-backed layer loading and the figure descriptions drawn by the
//! web view.

pub mod catalog;
pub mod config;
pub mod gallery;
pub mod handlers;
pub mod i18n;
pub mod loader;
pub mod logging;
pub mod raster_io;
pub mod render;
pub mod resolver;
pub mod timeseries;
pub mod types;
pub mod vector_io;

pub use config::DashboardConfig;
pub use handlers::Dashboard;
pub use types::{DashboardError, YearKey};
