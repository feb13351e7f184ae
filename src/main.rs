#![cfg_attr(
    all(not(debug_assertions), target_os = "windows"),
    windows_subsystem = "windows"
)]

use anyhow::Context;
use geoatlas::gallery::{Gallery, RasterPanel, VectorPanel};
use geoatlas::handlers::{
    CatalogSummary, DropdownOption, MapRequest, MapResponse, TrendRequest, TrendResponse, YearOptions,
};
use geoatlas::i18n::{Language, MessageKey};
use geoatlas::types::DataMode;
use geoatlas::{logging, Dashboard, DashboardConfig};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tauri::{Manager, State};

struct AppState {
    dashboard: Arc<Dashboard>,
}

/// Runs a handler off the async runtime; GDAL reads block.
async fn blocking<T, F>(state: &State<'_, AppState>, f: F) -> Result<T, String>
where
    T: Send + 'static,
    F: FnOnce(&Dashboard) -> Result<T, String> + Send + 'static,
{
    let dashboard = Arc::clone(&state.dashboard);
    tokio::task::spawn_blocking(move || f(&dashboard))
        .await
        .map_err(|e| format!("Worker failed: {}", e))?
}

#[tauri::command]
fn get_default_language(state: State<'_, AppState>) -> Language {
    state.dashboard.default_language()
}

#[tauri::command]
fn list_languages(state: State<'_, AppState>) -> Vec<DropdownOption> {
    state.dashboard.languages()
}

#[tauri::command]
fn get_strings(language: Language, state: State<'_, AppState>) -> HashMap<MessageKey, String> {
    state.dashboard.strings(language)
}

#[tauri::command]
fn list_data_modes(language: Language, state: State<'_, AppState>) -> Vec<DropdownOption> {
    state.dashboard.data_modes(language)
}

#[tauri::command]
fn list_categories(mode: DataMode, language: Language, state: State<'_, AppState>) -> Vec<DropdownOption> {
    state.dashboard.category_options(mode, language)
}

#[tauri::command]
fn get_year_options(category: String, state: State<'_, AppState>) -> Result<YearOptions, String> {
    state.dashboard.year_options(&category).map_err(|e| e.to_string())
}

#[tauri::command]
async fn update_map(request: MapRequest, state: State<'_, AppState>) -> Result<MapResponse, String> {
    blocking(&state, move |dashboard| Ok(dashboard.update_map(&request))).await
}

#[tauri::command]
async fn get_historical_trend(
    request: TrendRequest,
    state: State<'_, AppState>,
    app_handle: tauri::AppHandle,
) -> Result<TrendResponse, String> {
    blocking(&state, move |dashboard| {
        dashboard
            .historical_trend_with_progress(&request, |progress| {
                let _ = app_handle.emit_all("trend-progress", &progress);
            })
            .map_err(|e| e.to_string())
    })
    .await
}

#[tauri::command]
async fn tiff_gallery(
    folder: String,
    boundaries: Option<Vec<f64>>,
    language: Language,
    state: State<'_, AppState>,
) -> Result<Gallery<RasterPanel>, String> {
    blocking(&state, move |dashboard| {
        dashboard
            .tiff_gallery(&PathBuf::from(folder), boundaries, language)
            .map_err(|e| e.to_string())
    })
    .await
}

#[tauri::command]
async fn shapefile_gallery(
    folder: String,
    language: Language,
    state: State<'_, AppState>,
) -> Result<Gallery<VectorPanel>, String> {
    blocking(&state, move |dashboard| {
        dashboard
            .shapefile_gallery(&PathBuf::from(folder), language)
            .map_err(|e| e.to_string())
    })
    .await
}

#[tauri::command]
fn get_catalog_summary(state: State<'_, AppState>) -> CatalogSummary {
    state.dashboard.catalog_summary()
}

fn main() -> anyhow::Result<()> {
    logging::init();

    let config = DashboardConfig::load().context("Failed to load dashboard configuration")?;
    tracing::info!(
        data_root = %config.data_root.display(),
        categories = config.categories.len(),
        "Starting dashboard"
    );
    let dashboard = Dashboard::new(config).context("Failed to initialise dashboard")?;

    tauri::Builder::default()
        .manage(AppState {
            dashboard: Arc::new(dashboard),
        })
        .invoke_handler(tauri::generate_handler![
            get_default_language,
            list_languages,
            get_strings,
            list_data_modes,
            list_categories,
            get_year_options,
            update_map,
            get_historical_trend,
            tiff_gallery,
            shapefile_gallery,
            get_catalog_summary
        ])
        .run(tauri::generate_context!())
        .context("error while running tauri application")?;
    Ok(())
}
