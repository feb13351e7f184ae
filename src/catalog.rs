//! Year index built from dataset filenames.
//!
//! Filenames are the only source of temporal metadata: `pop_2020.tif`
//! belongs to 2020, `deforestation_2015_2020.tif` to the range 2015-2020.
//! The index is computed once at startup and then shared read-only.

use crate::config::{Category, DashboardConfig};
use crate::types::YearKey;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2030;

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("static pattern"));

fn in_range(year: i32) -> bool {
    (MIN_YEAR..=MAX_YEAR).contains(&year)
}

/// Standalone runs of exactly four digits, with their byte span.
fn four_digit_runs(name: &str) -> Vec<(usize, usize, i32)> {
    DIGIT_RUN
        .find_iter(name)
        .filter(|m| m.as_str().len() == 4)
        .filter_map(|m| m.as_str().parse().ok().map(|y| (m.start(), m.end(), y)))
        .collect()
}

/// Years carried by one filename.
///
/// A `YYYY_YYYY` pair (both in range) wins and suppresses single-year
/// matching; otherwise every standalone in-range year is returned. A name
/// with no four-digit run at all is `N/A`. A name whose four-digit runs are
/// all out of range contributes nothing.
pub fn years_in_filename(name: &str) -> Vec<YearKey> {
    let runs = four_digit_runs(name);

    let pair = runs.windows(2).find_map(|w| {
        let (_, end_a, start) = w[0];
        let (start_b, _, end) = w[1];
        let joined = &name[end_a..start_b] == "_";
        (joined && in_range(start) && in_range(end)).then_some(YearKey::Range { start, end })
    });
    if let Some(pair) = pair {
        return vec![pair];
    }

    if runs.is_empty() {
        return vec![YearKey::NotAvailable];
    }

    runs.into_iter()
        .map(|(_, _, year)| year)
        .filter(|year| in_range(*year))
        .map(YearKey::Year)
        .collect()
}

/// Whether a filename carries no year or year range at all.
pub fn is_undated(name: &str) -> bool {
    years_in_filename(name) == [YearKey::NotAvailable]
}

/// Recursively lists files under `dir` accepted by `keep`, sorted by path.
pub fn list_files(dir: &Path, keep: impl Fn(&Path) -> bool) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry under {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| keep(path))
        .collect();
    files.sort();
    files
}

pub fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryIndex {
    pub years: Vec<YearKey>,
    pub file_count: usize,
    /// False when the directory was missing and `years` are the configured defaults.
    pub scanned: bool,
}

/// Immutable per-category year index.
#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    entries: BTreeMap<String, CategoryIndex>,
    scanned_at: DateTime<Utc>,
}

impl Catalog {
    pub fn scan(config: &DashboardConfig) -> Self {
        let entries = config
            .categories
            .iter()
            .map(|category| (category.key.clone(), scan_category(config, category)))
            .collect();
        Catalog {
            entries,
            scanned_at: Utc::now(),
        }
    }

    pub fn years(&self, key: &str) -> &[YearKey] {
        self.entries.get(key).map_or(&[], |e| e.years.as_slice())
    }

    pub fn entry(&self, key: &str) -> Option<&CategoryIndex> {
        self.entries.get(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &CategoryIndex)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn scanned_at(&self) -> DateTime<Utc> {
        self.scanned_at
    }
}

fn scan_category(config: &DashboardConfig, category: &Category) -> CategoryIndex {
    let dir = config.category_dir(category);
    if !dir.is_dir() {
        tracing::debug!(
            category = %category.key,
            "Directory {} not found, keeping default years",
            dir.display()
        );
        let mut years = category.default_years.clone();
        years.sort();
        years.dedup();
        return CategoryIndex {
            years,
            file_count: 0,
            scanned: false,
        };
    }

    let files = list_files(&dir, |p| config.is_vector_file(p) || config.is_raster_file(p));

    let mut singles = BTreeSet::new();
    let mut ranges = BTreeSet::new();
    for path in &files {
        for key in years_in_filename(&basename(path)) {
            match key {
                YearKey::Range { .. } => ranges.insert(key),
                _ => singles.insert(key),
            };
        }
    }

    let years: Vec<YearKey> = if category.change_detection {
        ranges.into_iter().collect()
    } else if singles.is_empty() && !files.is_empty() {
        // files present but none carries a usable year
        vec![YearKey::NotAvailable]
    } else {
        singles.into_iter().collect()
    };

    tracing::info!(
        category = %category.key,
        files = files.len(),
        "Indexed years: {}",
        years.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    );

    CategoryIndex {
        years,
        file_count: files.len(),
        scanned: true,
    }
}
