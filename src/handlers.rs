//! Request/response handlers behind the UI.
//!
//! Each handler takes the current selection and returns everything the view
//! needs to redraw. None of them mutate the dashboard; the catalog is
//! scanned once in [`Dashboard::new`].

use crate::catalog::Catalog;
use crate::config::{Category, DashboardConfig};
use crate::gallery::{self, Gallery, RasterPanel, VectorPanel};
use crate::i18n::{Language, Localizer, MessageKey};
use crate::loader::load_layer;
use crate::render::{Figure, Renderer, TrendFigure};
use crate::resolver::resolve_files;
use crate::timeseries::{PixelHistory, SeriesPoint};
use crate::types::{DashboardError, DataMode, Layer, YearKey};
use chrono::{DateTime, Utc};
use geo_types::Coord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct DropdownOption {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct YearOptions {
    pub options: Vec<DropdownOption>,
    pub value: YearKey,
    pub disabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapRequest {
    pub category: String,
    pub year: Option<YearKey>,
    pub language: Language,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapResponse {
    pub figure: Figure,
    pub info: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrendRequest {
    pub category: String,
    pub lon: f64,
    pub lat: f64,
    pub language: Language,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendResponse {
    pub figure: Figure,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendProgress {
    pub done: usize,
    pub total: usize,
    pub year: YearKey,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    pub key: String,
    pub years: Vec<YearKey>,
    pub file_count: usize,
    pub scanned: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogSummary {
    pub scanned_at: DateTime<Utc>,
    pub categories: Vec<CategorySummary>,
}

pub struct Dashboard {
    config: DashboardConfig,
    catalog: Arc<Catalog>,
    localizer: Localizer,
}

impl Dashboard {
    /// Scans the catalog and validates the message table.
    pub fn new(config: DashboardConfig) -> Result<Self, DashboardError> {
        let localizer = Localizer::new()?;
        let catalog = Arc::new(Catalog::scan(&config));
        Ok(Self::with_catalog(config, catalog, localizer))
    }

    pub fn with_catalog(config: DashboardConfig, catalog: Arc<Catalog>, localizer: Localizer) -> Self {
        Self {
            config,
            catalog,
            localizer,
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn default_language(&self) -> Language {
        Language::from_code(&self.config.default_language).unwrap_or(Language::En)
    }

    pub fn strings(&self, language: Language) -> HashMap<MessageKey, String> {
        self.localizer.table(language)
    }

    pub fn languages(&self) -> Vec<DropdownOption> {
        Language::ALL
            .into_iter()
            .map(|l| DropdownOption {
                label: l.name().to_string(),
                value: l.code().to_string(),
            })
            .collect()
    }

    pub fn data_modes(&self, language: Language) -> Vec<DropdownOption> {
        [(DataMode::Snapshot, MessageKey::ModeSnapshot), (DataMode::Change, MessageKey::ModeChange)]
            .into_iter()
            .filter(|(mode, _)| self.config.categories.iter().any(|c| c.mode == *mode))
            .map(|(mode, key)| DropdownOption {
                label: self.localizer.text(language, key),
                value: mode.as_str().to_string(),
            })
            .collect()
    }

    pub fn category_options(&self, mode: DataMode, language: Language) -> Vec<DropdownOption> {
        self.config
            .categories
            .iter()
            .filter(|c| c.mode == mode)
            .map(|c| DropdownOption {
                label: c.label(language.code()),
                value: c.key.clone(),
            })
            .collect()
    }

    /// Year dropdown for a category: the most recent key is preselected; an
    /// empty or undated index selects `N/A` and disables the dropdown.
    pub fn year_options(&self, category: &str) -> Result<YearOptions, DashboardError> {
        self.config.category(category)?;
        let years = self.catalog.years(category);
        let options = years
            .iter()
            .map(|y| DropdownOption {
                label: y.to_string(),
                value: y.to_string(),
            })
            .collect::<Vec<_>>();

        if years.is_empty() || years.contains(&YearKey::NotAvailable) {
            let options = if options.is_empty() {
                vec![DropdownOption {
                    label: YearKey::NotAvailable.to_string(),
                    value: YearKey::NotAvailable.to_string(),
                }]
            } else {
                options
            };
            return Ok(YearOptions {
                options,
                value: YearKey::NotAvailable,
                disabled: true,
            });
        }

        let latest = years.iter().max().copied().unwrap_or(YearKey::NotAvailable);
        Ok(YearOptions {
            options,
            value: latest,
            disabled: false,
        })
    }

    pub fn update_map(&self, request: &MapRequest) -> MapResponse {
        let lang = request.language;
        let renderer = Renderer::new(&self.localizer, lang);

        let category = match self.config.category(&request.category) {
            Ok(c) => c,
            Err(e) => return self.message(lang, e.to_string()),
        };
        let label = category.label(lang.code());
        let year = match request.year {
            Some(year) => year,
            None => return self.message(lang, self.localizer.text(lang, MessageKey::NoData)),
        };

        let files = resolve_files(&self.config, category, &year);
        let path = match files.primary(category) {
            Some(path) => path,
            None => {
                let text = self.localizer.format(lang, MessageKey::NoDataFor, &[&label, &year.to_string()]);
                return self.message(lang, text);
            }
        };

        tracing::info!(category = %category.key, %year, file = %path.display(), "Rendering map");
        match load_layer(&self.config, category, path) {
            Ok(Layer::Raster(layer)) => MapResponse {
                figure: renderer.raster_figure(category, &year, &layer),
                info: renderer.raster_info(category, &year, &layer),
            },
            Ok(Layer::Vector(layer)) => MapResponse {
                figure: renderer.vector_figure(category, &year, &layer),
                info: renderer.vector_info(category, &year, &layer),
            },
            Err(e) => {
                tracing::warn!("Failed to load {}: {}", path.display(), e);
                let name = crate::catalog::basename(path);
                let text = self.localizer.format(lang, MessageKey::LoadError, &[&name, &e.to_string()]);
                self.message(lang, text)
            }
        }
    }

    fn message(&self, lang: Language, text: String) -> MapResponse {
        MapResponse {
            figure: Figure::message(self.localizer.text(lang, MessageKey::AppTitle), text.clone()),
            info: vec![text],
        }
    }

    pub fn historical_trend(&self, request: &TrendRequest) -> Result<TrendResponse, DashboardError> {
        self.historical_trend_with_progress(request, |_| {})
    }

    /// Pixel history at the clicked point; `progress` is called after each year.
    pub fn historical_trend_with_progress(
        &self,
        request: &TrendRequest,
        mut progress: impl FnMut(TrendProgress),
    ) -> Result<TrendResponse, DashboardError> {
        let lang = request.language;
        let category = self.config.category(&request.category)?;
        if !category.is_raster() {
            let text = self
                .localizer
                .format(lang, MessageKey::TrendUnsupported, &[&category.label(lang.code())]);
            return Ok(TrendResponse {
                figure: Figure::message(self.localizer.text(lang, MessageKey::HistoricalTrend), text),
                points: Vec::new(),
            });
        }

        let years = self.catalog.years(&category.key);
        let history = PixelHistory::new(&self.config, category, years, Coord { x: request.lon, y: request.lat });
        let total = history.len();
        let points: Vec<SeriesPoint> = history
            .iter()
            .enumerate()
            .map(|(i, point)| {
                progress(TrendProgress {
                    done: i + 1,
                    total,
                    year: point.year,
                });
                point
            })
            .collect();

        tracing::debug!(
            category = %category.key,
            lon = request.lon,
            lat = request.lat,
            present = points.iter().filter(|p| p.value.is_some()).count(),
            total,
            "Built pixel history"
        );

        Ok(TrendResponse {
            figure: self.trend_figure(category, request, &points),
            points,
        })
    }

    fn trend_figure(&self, category: &Category, request: &TrendRequest, points: &[SeriesPoint]) -> Figure {
        let lang = request.language;
        let title = self.localizer.format(
            lang,
            MessageKey::TrendTitle,
            &[
                &category.label(lang.code()),
                &format!("{:.4}", request.lon),
                &format!("{:.4}", request.lat),
            ],
        );
        Figure::Trend(TrendFigure {
            title,
            x: points.iter().map(|p| p.year.to_string()).collect(),
            y: points.iter().map(|p| p.value).collect(),
            x_title: self.localizer.text(lang, MessageKey::TrendYearAxis),
            y_title: category.unit.clone(),
        })
    }

    pub fn tiff_gallery(
        &self,
        folder: &Path,
        boundaries: Option<Vec<f64>>,
        language: Language,
    ) -> Result<Gallery<RasterPanel>, DashboardError> {
        let boundaries = boundaries.unwrap_or_else(|| gallery::DEFAULT_BOUNDARIES.to_vec());
        gallery::tiff_gallery(folder, &boundaries, "", || {
            self.localizer
                .format(language, MessageKey::GalleryEmpty, &["tif", &folder.display().to_string()])
        })
    }

    pub fn shapefile_gallery(&self, folder: &Path, language: Language) -> Result<Gallery<VectorPanel>, DashboardError> {
        gallery::shapefile_gallery(
            folder,
            &self.localizer.text(language, MessageKey::Longitude),
            &self.localizer.text(language, MessageKey::Latitude),
            || {
                self.localizer
                    .format(language, MessageKey::GalleryEmpty, &["shp", &folder.display().to_string()])
            },
        )
    }

    pub fn catalog_summary(&self) -> CatalogSummary {
        CatalogSummary {
            scanned_at: self.catalog.scanned_at(),
            categories: self
                .catalog
                .entries()
                .map(|(key, entry)| CategorySummary {
                    key: key.to_string(),
                    years: entry.years.clone(),
                    file_count: entry.file_count,
                    scanned: entry.scanned,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster_io::testutil::{degree_transform, write_geotiff};
    use ndarray::array;
    use std::fs;

    fn dashboard(root: &Path) -> Dashboard {
        let config = DashboardConfig {
            data_root: root.to_path_buf(),
            ..DashboardConfig::default()
        };
        Dashboard::new(config).unwrap()
    }

    #[test]
    fn population_scenario_excludes_nodata_from_mean() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("Gridded_Population_Density_Data");
        fs::create_dir_all(&dir).unwrap();
        write_geotiff(
            &dir.join("pop_2020.tif"),
            &[array![[2.0f32, 4.0], [-9999.0, 6.0]]],
            &degree_transform(-17.0, 26.0),
            Some(-9999.0),
        );

        let dash = dashboard(root.path());
        let years = dash.year_options("population_density").unwrap();
        assert_eq!(years.value, YearKey::Year(2020));
        assert!(!years.disabled);

        let response = dash.update_map(&MapRequest {
            category: "population_density".into(),
            year: Some(YearKey::Year(2020)),
            language: Language::En,
        });
        match &response.figure {
            Figure::Heatmap(fig) => {
                assert_eq!(fig.z[1][0], None);
                assert_eq!((fig.y.len(), fig.x.len()), (2, 2));
            }
            other => panic!("unexpected figure {:?}", other),
        }
        assert!(response.info.contains(&"Mean value: 4.00".to_string()));
        assert!(response.info.contains(&"Minimum value: 2.00".to_string()));
    }

    #[test]
    fn missing_year_file_is_a_message() {
        let root = tempfile::tempdir().unwrap();
        let dash = dashboard(root.path());
        let response = dash.update_map(&MapRequest {
            category: "land_cover".into(),
            year: Some(YearKey::Year(2012)),
            language: Language::Fr,
        });
        assert!(matches!(response.figure, Figure::Message { .. }));
        assert_eq!(response.info, vec!["Aucun fichier trouvé pour Occupation du sol en 2012"]);
    }

    #[test]
    fn broken_file_is_reported_not_raised() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("Modis_Land_Cover_Data");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("lc_2020.tif"), b"nope").unwrap();

        let dash = dashboard(root.path());
        let response = dash.update_map(&MapRequest {
            category: "land_cover".into(),
            year: Some(YearKey::Year(2020)),
            language: Language::En,
        });
        assert!(matches!(response.figure, Figure::Message { .. }));
        assert!(response.info[0].starts_with("Error loading file lc_2020.tif"));
    }

    #[test]
    fn undated_or_empty_index_disables_year_dropdown() {
        let root = tempfile::tempdir().unwrap();
        let admin = root.path().join("Admin_layers");
        fs::create_dir_all(&admin).unwrap();
        fs::write(admin.join("mrt_admin1.shp"), b"").unwrap();

        let dash = dashboard(root.path());
        let years = dash.year_options("admin_layers").unwrap();
        assert!(years.disabled);
        assert_eq!(years.value, YearKey::NotAvailable);

        // directory missing: nothing pre-seeded for deforestation
        let years = dash.year_options("deforestation").unwrap();
        assert!(years.disabled);
        assert_eq!(years.options.len(), 1);

        // directory missing: pre-seeded defaults survive
        let years = dash.year_options("climate_precipitations").unwrap();
        assert_eq!(years.value, YearKey::Year(2023));

        assert!(dash.year_options("nope").is_err());
    }

    #[test]
    fn trend_covers_every_indexed_year() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("MODIS_Gross_Primary_Production_GPP");
        fs::create_dir_all(&dir).unwrap();
        write_geotiff(&dir.join("gpp_2018.tif"), &[array![[100.0f32]]], &degree_transform(0.0, 1.0), None);
        write_geotiff(&dir.join("gpp_2019.tif"), &[array![[5.0f32]]], &degree_transform(50.0, 1.0), None);
        write_geotiff(&dir.join("gpp_2020.tif"), &[array![[300.0f32]]], &degree_transform(0.0, 1.0), None);

        let dash = dashboard(root.path());
        let mut seen = Vec::new();
        let response = dash
            .historical_trend_with_progress(
                &TrendRequest {
                    category: "gross_primary_production".into(),
                    lon: 0.4,
                    lat: 0.6,
                    language: Language::En,
                },
                |p| seen.push((p.done, p.total)),
            )
            .unwrap();

        let values: Vec<_> = response.points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![Some(100.0), None, Some(300.0)]);
        assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);
        match response.figure {
            Figure::Trend(fig) => assert_eq!(fig.x, vec!["2018", "2019", "2020"]),
            other => panic!("unexpected figure {:?}", other),
        }
    }

    #[test]
    fn vector_category_has_no_trend() {
        let root = tempfile::tempdir().unwrap();
        let dash = dashboard(root.path());
        let response = dash
            .historical_trend(&TrendRequest {
                category: "streams_roads".into(),
                lon: 0.0,
                lat: 0.0,
                language: Language::En,
            })
            .unwrap();
        assert!(response.points.is_empty());
        assert!(matches!(response.figure, Figure::Message { .. }));
    }

    #[test]
    fn vector_map_colors_by_classification_column() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("Streamwater_Line_Road_Network");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("network.geojson"),
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {"name": "Main Highway", "type": "road"},
                 "geometry": {"type": "LineString", "coordinates": [[-17, 18], [-12, 18]]}},
                {"type": "Feature", "properties": {"name": "River 1", "type": "stream"},
                 "geometry": {"type": "LineString", "coordinates": [[-14, 26], [-14, 22]]}}
            ]}"#,
        )
        .unwrap();

        let dash = dashboard(root.path());
        let response = dash.update_map(&MapRequest {
            category: "streams_roads".into(),
            year: Some(YearKey::NotAvailable),
            language: Language::En,
        });
        match &response.figure {
            Figure::Choropleth(fig) => {
                assert_eq!(fig.color_title, "Type");
                assert_eq!(fig.color_values, vec!["road", "stream"]);
            }
            other => panic!("unexpected figure {:?}", other),
        }
        assert!(response.info.contains(&"Number of elements: 2".to_string()));
        assert!(response.info.contains(&"Available columns: name, type".to_string()));
    }

    #[test]
    fn modes_and_categories() {
        let root = tempfile::tempdir().unwrap();
        let dash = dashboard(root.path());
        let modes = dash.data_modes(Language::En);
        assert_eq!(modes.len(), 2);
        assert_eq!(modes[1].value, "change");
        let change = dash.category_options(DataMode::Change, Language::En);
        assert_eq!(change.len(), 3);
        assert_eq!(change[0].value, "deforestation");

        let summary = dash.catalog_summary();
        assert_eq!(summary.categories.len(), dash.config().categories.len());
    }
}
