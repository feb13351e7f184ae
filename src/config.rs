//! Dashboard configuration: data root, file extensions and the category table.
//!
//! Loaded from a JSON file when one is found, otherwise the built-in table is
//! used. `GEOATLAS_DATA_ROOT` overrides the data root in either case.

use crate::types::{DashboardError, DataMode, StorageKind, YearKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "GEOATLAS_CONFIG";
pub const DATA_ROOT_ENV: &str = "GEOATLAS_DATA_ROOT";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub key: String,
    /// Display labels keyed by language code ("en", "fr").
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Directory relative to the data root (absolute paths are kept as-is).
    pub dir: PathBuf,
    pub storage: StorageKind,
    #[serde(default)]
    pub unit: String,
    #[serde(default = "default_true")]
    pub year_partitioned: bool,
    #[serde(default)]
    pub change_detection: bool,
    #[serde(default = "default_mode")]
    pub mode: DataMode,
    #[serde(default)]
    pub color_scale: Option<String>,
    /// Years reported when the directory is missing at scan time.
    #[serde(default)]
    pub default_years: Vec<YearKey>,
}

fn default_true() -> bool {
    true
}

fn default_mode() -> DataMode {
    DataMode::Snapshot
}

impl Category {
    pub fn label(&self, language: &str) -> String {
        self.labels
            .get(language)
            .or_else(|| self.labels.get("en"))
            .cloned()
            .unwrap_or_else(|| title_case(&self.key))
    }

    pub fn is_raster(&self) -> bool {
        self.storage == StorageKind::Raster
    }
}

/// `land_cover_change` -> `Land Cover Change`
pub fn title_case(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub data_root: PathBuf,
    #[serde(default = "default_language")]
    pub default_language: String,
    #[serde(default = "default_vector_extensions")]
    pub vector_extensions: Vec<String>,
    #[serde(default = "default_raster_extensions")]
    pub raster_extensions: Vec<String>,
    pub categories: Vec<Category>,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_vector_extensions() -> Vec<String> {
    vec!["shp".into(), "geojson".into(), "gpkg".into()]
}

fn default_raster_extensions() -> Vec<String> {
    vec!["tif".into(), "tiff".into()]
}

impl DashboardConfig {
    /// Resolution order: `GEOATLAS_CONFIG`, the platform config dir, built-in defaults.
    pub fn load() -> Result<Self, DashboardError> {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let user = dirs::config_dir().map(|d| d.join("geoatlas").join("dashboard.json"));

        let mut config = match (explicit, user) {
            (Some(path), _) => Self::from_file(&path)?,
            (None, Some(path)) if path.exists() => Self::from_file(&path)?,
            _ => {
                tracing::info!("No configuration file found, using built-in categories");
                Self::default()
            }
        };

        if let Some(root) = std::env::var_os(DATA_ROOT_ENV) {
            config.data_root = PathBuf::from(root);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, DashboardError> {
        tracing::info!(path = %path.display(), "Loading configuration");
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            DashboardError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DashboardError> {
        if self.categories.is_empty() {
            return Err(DashboardError::Config("No categories configured".to_string()));
        }
        let mut seen = std::collections::HashSet::new();
        for category in &self.categories {
            if !seen.insert(category.key.as_str()) {
                return Err(DashboardError::Config(format!(
                    "Duplicate category key: {}",
                    category.key
                )));
            }
            if category.change_detection && category.storage != StorageKind::Raster {
                return Err(DashboardError::Config(format!(
                    "Change-detection category {} must be raster",
                    category.key
                )));
            }
        }
        Ok(())
    }

    pub fn category(&self, key: &str) -> Result<&Category, DashboardError> {
        self.categories
            .iter()
            .find(|c| c.key == key)
            .ok_or_else(|| DashboardError::UnknownCategory(key.to_string()))
    }

    pub fn category_dir(&self, category: &Category) -> PathBuf {
        if category.dir.is_absolute() {
            category.dir.clone()
        } else {
            self.data_root.join(&category.dir)
        }
    }

    pub fn is_vector_file(&self, path: &Path) -> bool {
        has_extension(path, &self.vector_extensions)
    }

    pub fn is_raster_file(&self, path: &Path) -> bool {
        has_extension(path, &self.raster_extensions)
    }

    /// Keys of every change-detection category, used to recognise their files by name.
    pub fn change_detection_keys(&self) -> impl Iterator<Item = &str> {
        self.categories
            .iter()
            .filter(|c| c.change_detection)
            .map(|c| c.key.as_str())
    }
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |ext| extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)))
}

fn category(
    key: &str,
    en: &str,
    fr: &str,
    dir: &str,
    storage: StorageKind,
    unit: &str,
    color_scale: Option<&str>,
) -> Category {
    Category {
        key: key.to_string(),
        labels: BTreeMap::from([("en".to_string(), en.to_string()), ("fr".to_string(), fr.to_string())]),
        dir: PathBuf::from(dir),
        storage,
        unit: unit.to_string(),
        year_partitioned: true,
        change_detection: false,
        mode: DataMode::Snapshot,
        color_scale: color_scale.map(str::to_string),
        default_years: Vec::new(),
    }
}

fn change_category(key: &str, en: &str, fr: &str, dir: &str) -> Category {
    Category {
        change_detection: true,
        mode: DataMode::Change,
        ..category(key, en, fr, dir, StorageKind::Raster, "", None)
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        let span = |from: i32, to: i32| (from..=to).map(YearKey::Year).collect::<Vec<_>>();

        let mut admin = category(
            "admin_layers",
            "Admin Layers",
            "Limites administratives",
            "Admin_layers",
            StorageKind::Vector,
            "",
            None,
        );
        admin.year_partitioned = false;

        let mut streams = category(
            "streams_roads",
            "Streams and Roads",
            "Cours d'eau et routes",
            "Streamwater_Line_Road_Network",
            StorageKind::Vector,
            "",
            None,
        );
        streams.year_partitioned = false;

        let mut precipitation = category(
            "climate_precipitations",
            "Climate Precipitations",
            "Précipitations",
            "Climate_Precipitation_Data",
            StorageKind::Raster,
            "mm",
            Some("Blues"),
        );
        precipitation.default_years = span(2010, 2023);

        let mut population = category(
            "population_density",
            "Population Density",
            "Densité de population",
            "Gridded_Population_Density_Data",
            StorageKind::Raster,
            "people/km²",
            Some("Reds"),
        );
        population.default_years = vec![YearKey::Year(2010), YearKey::Year(2015), YearKey::Year(2020)];

        let mut gpp = category(
            "gross_primary_production",
            "Gross Primary Production",
            "Production primaire brute",
            "MODIS_Gross_Primary_Production_GPP",
            StorageKind::Raster,
            "gC/m²/day",
            Some("Greens"),
        );
        gpp.default_years = span(2010, 2023);

        let mut land_cover = category(
            "land_cover",
            "Land Cover",
            "Occupation du sol",
            "Modis_Land_Cover_Data",
            StorageKind::Raster,
            "class",
            None,
        );
        land_cover.default_years = span(2010, 2023);

        DashboardConfig {
            data_root: PathBuf::from("./Datasets_Hackathon"),
            default_language: default_language(),
            vector_extensions: default_vector_extensions(),
            raster_extensions: default_raster_extensions(),
            categories: vec![
                admin,
                precipitation,
                population,
                gpp,
                land_cover,
                streams,
                change_category(
                    "deforestation",
                    "Deforestation Prediction",
                    "Prévision de la déforestation",
                    "Deforestation",
                ),
                change_category(
                    "climate_change",
                    "Climate Change",
                    "Changement climatique",
                    "Climate_Change",
                ),
                change_category(
                    "land_cover_change",
                    "Land Cover Change",
                    "Changement d'occupation du sol",
                    "Land_Cover_Change",
                ),
            ],
        }
    }
}
