use crate::catalog::{basename, is_undated, list_files};
use crate::config::{Category, DashboardConfig};
use crate::types::YearKey;
use std::path::PathBuf;

/// Files of one category matching a year selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedFiles {
    pub vector: Vec<PathBuf>,
    pub raster: Vec<PathBuf>,
}

impl ResolvedFiles {
    pub fn is_empty(&self) -> bool {
        self.vector.is_empty() && self.raster.is_empty()
    }

    /// First file of the kind the category renders.
    pub fn primary(&self, category: &Category) -> Option<&PathBuf> {
        if category.is_raster() {
            self.raster.first()
        } else {
            self.vector.first()
        }
    }
}

/// Lists the category's files for `year`.
///
/// Categories that are not year-partitioned return every file. `N/A`
/// selects the files with no year in their name; any other key keeps
/// names containing its literal text. A missing directory resolves to
/// nothing.
pub fn resolve_files(config: &DashboardConfig, category: &Category, year: &YearKey) -> ResolvedFiles {
    let dir = config.category_dir(category);
    if !dir.is_dir() {
        return ResolvedFiles::default();
    }

    let needle = year.to_string();
    let matches = |path: &PathBuf| {
        if !category.year_partitioned {
            return true;
        }
        let name = basename(path);
        match year {
            YearKey::NotAvailable => is_undated(&name),
            _ => name.contains(&needle),
        }
    };

    let vector = list_files(&dir, |p| config.is_vector_file(p));
    let raster = list_files(&dir, |p| config.is_raster_file(p));

    let resolved = ResolvedFiles {
        vector: vector.into_iter().filter(|p| matches(p)).collect(),
        raster: raster.into_iter().filter(|p| matches(p)).collect(),
    };
    tracing::debug!(
        category = %category.key,
        year = %year,
        vector = resolved.vector.len(),
        raster = resolved.raster.len(),
        "Resolved files"
    );
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn touch(dir: &Path, name: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(name), b"").unwrap();
    }

    fn setup() -> (tempfile::TempDir, DashboardConfig) {
        let root = tempfile::tempdir().unwrap();
        let config = DashboardConfig {
            data_root: root.path().to_path_buf(),
            ..DashboardConfig::default()
        };
        (root, config)
    }

    #[test]
    fn unpartitioned_category_returns_everything() {
        let (root, config) = setup();
        let dir = root.path().join("Admin_layers");
        touch(&dir, "mrt_admin1.shp");
        touch(&dir, "mrt_admin2_2018.shp");
        touch(&dir, "mrt_admin2_2018.dbf");

        let admin = config.category("admin_layers").unwrap();
        let files = resolve_files(&config, admin, &YearKey::Year(1990));
        assert_eq!(files.vector.len(), 2);
        assert!(files.raster.is_empty());
        assert_eq!(files.primary(admin), Some(&dir.join("mrt_admin1.shp")));
    }

    #[test]
    fn partitioned_category_filters_by_literal_year() {
        let (root, config) = setup();
        let dir = root.path().join("Gridded_Population_Density_Data");
        touch(&dir, "pop_2010.tif");
        touch(&dir, "pop_2020.tif");
        touch(&dir.join("nested"), "pop_2020_v2.tif");
        touch(&dir, "pop_undated.tif");

        let pop = config.category("population_density").unwrap();
        let files = resolve_files(&config, pop, &YearKey::Year(2020));
        assert_eq!(
            files.raster,
            vec![dir.join("nested").join("pop_2020_v2.tif"), dir.join("pop_2020.tif")]
        );

        let undated = resolve_files(&config, pop, &YearKey::NotAvailable);
        assert_eq!(undated.raster, vec![dir.join("pop_undated.tif")]);

        assert!(resolve_files(&config, pop, &YearKey::Year(2005)).is_empty());
    }

    #[test]
    fn ranges_match_their_literal_text() {
        let (root, config) = setup();
        let dir = root.path().join("Deforestation");
        touch(&dir, "deforestation_2015_2020.tif");
        touch(&dir, "deforestation_2010_2015.tif");

        let defo = config.category("deforestation").unwrap();
        let files = resolve_files(&config, defo, &YearKey::Range { start: 2015, end: 2020 });
        assert_eq!(files.raster, vec![dir.join("deforestation_2015_2020.tif")]);
    }

    #[test]
    fn missing_directory_resolves_to_nothing() {
        let (_root, config) = setup();
        let pop = config.category("population_density").unwrap();
        assert!(resolve_files(&config, pop, &YearKey::Year(2020)).is_empty());
    }
}
