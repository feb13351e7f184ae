//! English / French message table.
//!
//! Every (language, key) pair must be present, and all translations of a key
//! must use the same `{n}` placeholders. `Localizer::new` checks both and
//! fails startup otherwise.

use crate::types::DashboardError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Fr,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::En, Language::Fr];

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Fr => "fr",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Fr => "Français",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.code().eq_ignore_ascii_case(code))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKey {
    AppTitle,
    SelectDataMode,
    SelectCategory,
    SelectYear,
    SelectLanguage,
    Information,
    HistoricalTrend,
    ClickForTrend,
    ModeSnapshot,
    ModeChange,
    NoData,
    NoDataFor,
    LoadError,
    TrendUnsupported,
    TrendTitle,
    TrendYearAxis,
    InfoDataType,
    InfoYear,
    InfoFile,
    InfoDimensions,
    InfoMin,
    InfoMax,
    InfoMean,
    InfoElementCount,
    InfoColumns,
    AllMissing,
    HoverValue,
    HoverDifference,
    Decline,
    Improvement,
    Neutral,
    RegionId,
    LandCoverClass,
    LandUnclassified,
    LandForest,
    LandGrassland,
    LandCropland,
    LandUrban,
    LandWater,
    LandDesert,
    GalleryEmpty,
    Longitude,
    Latitude,
}

impl MessageKey {
    pub const ALL: [MessageKey; 43] = [
        MessageKey::AppTitle,
        MessageKey::SelectDataMode,
        MessageKey::SelectCategory,
        MessageKey::SelectYear,
        MessageKey::SelectLanguage,
        MessageKey::Information,
        MessageKey::HistoricalTrend,
        MessageKey::ClickForTrend,
        MessageKey::ModeSnapshot,
        MessageKey::ModeChange,
        MessageKey::NoData,
        MessageKey::NoDataFor,
        MessageKey::LoadError,
        MessageKey::TrendUnsupported,
        MessageKey::TrendTitle,
        MessageKey::TrendYearAxis,
        MessageKey::InfoDataType,
        MessageKey::InfoYear,
        MessageKey::InfoFile,
        MessageKey::InfoDimensions,
        MessageKey::InfoMin,
        MessageKey::InfoMax,
        MessageKey::InfoMean,
        MessageKey::InfoElementCount,
        MessageKey::InfoColumns,
        MessageKey::AllMissing,
        MessageKey::HoverValue,
        MessageKey::HoverDifference,
        MessageKey::Decline,
        MessageKey::Improvement,
        MessageKey::Neutral,
        MessageKey::RegionId,
        MessageKey::LandCoverClass,
        MessageKey::LandUnclassified,
        MessageKey::LandForest,
        MessageKey::LandGrassland,
        MessageKey::LandCropland,
        MessageKey::LandUrban,
        MessageKey::LandWater,
        MessageKey::LandDesert,
        MessageKey::GalleryEmpty,
        MessageKey::Longitude,
        MessageKey::Latitude,
    ];
}

use Language::{En, Fr};
use MessageKey::*;

const MESSAGES: &[(Language, MessageKey, &str)] = &[
    (En, AppTitle, "Mauritania Geographic Data Dashboard"),
    (Fr, AppTitle, "Tableau de bord des données géographiques de la Mauritanie"),
    (En, SelectDataMode, "Select data mode:"),
    (Fr, SelectDataMode, "Sélectionnez le mode de données :"),
    (En, SelectCategory, "Select data type:"),
    (Fr, SelectCategory, "Sélectionnez le type de données :"),
    (En, SelectYear, "Select year:"),
    (Fr, SelectYear, "Sélectionnez l'année :"),
    (En, SelectLanguage, "Language:"),
    (Fr, SelectLanguage, "Langue :"),
    (En, Information, "Information"),
    (Fr, Information, "Informations"),
    (En, HistoricalTrend, "Historical trend"),
    (Fr, HistoricalTrend, "Tendance historique"),
    (En, ClickForTrend, "Click on the map to see the historical trend of a pixel."),
    (Fr, ClickForTrend, "Cliquez sur la carte pour voir la tendance historique d'un pixel."),
    (En, ModeSnapshot, "Datasets"),
    (Fr, ModeSnapshot, "Jeux de données"),
    (En, ModeChange, "Change detection"),
    (Fr, ModeChange, "Détection des changements"),
    (En, NoData, "No data available."),
    (Fr, NoData, "Aucune donnée disponible."),
    (En, NoDataFor, "No file found for {0} in {1}"),
    (Fr, NoDataFor, "Aucun fichier trouvé pour {0} en {1}"),
    (En, LoadError, "Error loading file {0}: {1}"),
    (Fr, LoadError, "Erreur lors du chargement du fichier {0} : {1}"),
    (En, TrendUnsupported, "No historical trend for vector data ({0})"),
    (Fr, TrendUnsupported, "Pas de tendance historique pour les données vectorielles ({0})"),
    (En, TrendTitle, "{0} at ({1}, {2})"),
    (Fr, TrendTitle, "{0} à ({1}, {2})"),
    (En, TrendYearAxis, "Year"),
    (Fr, TrendYearAxis, "Année"),
    (En, InfoDataType, "Data type: {0}"),
    (Fr, InfoDataType, "Type de données : {0}"),
    (En, InfoYear, "Year: {0}"),
    (Fr, InfoYear, "Année : {0}"),
    (En, InfoFile, "File: {0}"),
    (Fr, InfoFile, "Fichier : {0}"),
    (En, InfoDimensions, "Dimensions: {0} x {1} pixels"),
    (Fr, InfoDimensions, "Dimensions : {0} x {1} pixels"),
    (En, InfoMin, "Minimum value: {0}"),
    (Fr, InfoMin, "Valeur minimale : {0}"),
    (En, InfoMax, "Maximum value: {0}"),
    (Fr, InfoMax, "Valeur maximale : {0}"),
    (En, InfoMean, "Mean value: {0}"),
    (Fr, InfoMean, "Valeur moyenne : {0}"),
    (En, InfoElementCount, "Number of elements: {0}"),
    (Fr, InfoElementCount, "Nombre d'éléments : {0}"),
    (En, InfoColumns, "Available columns: {0}"),
    (Fr, InfoColumns, "Colonnes disponibles : {0}"),
    (En, AllMissing, "Every cell is missing."),
    (Fr, AllMissing, "Toutes les cellules sont manquantes."),
    (En, HoverValue, "Value"),
    (Fr, HoverValue, "Valeur"),
    (En, HoverDifference, "Difference"),
    (Fr, HoverDifference, "Différence"),
    (En, Decline, "Decline"),
    (Fr, Decline, "Déclin"),
    (En, Improvement, "Improvement"),
    (Fr, Improvement, "Amélioration"),
    (En, Neutral, "Neutral"),
    (Fr, Neutral, "Neutre"),
    (En, RegionId, "Region ID"),
    (Fr, RegionId, "ID de région"),
    (En, LandCoverClass, "class"),
    (Fr, LandCoverClass, "classe"),
    (En, LandUnclassified, "Unclassified"),
    (Fr, LandUnclassified, "Non classé"),
    (En, LandForest, "Forest"),
    (Fr, LandForest, "Forêt"),
    (En, LandGrassland, "Grassland"),
    (Fr, LandGrassland, "Prairie"),
    (En, LandCropland, "Cropland"),
    (Fr, LandCropland, "Cultures"),
    (En, LandUrban, "Urban"),
    (Fr, LandUrban, "Urbain"),
    (En, LandWater, "Water"),
    (Fr, LandWater, "Eau"),
    (En, LandDesert, "Desert"),
    (Fr, LandDesert, "Désert"),
    (En, GalleryEmpty, "No .{0} file found in folder {1}"),
    (Fr, GalleryEmpty, "Aucun fichier .{0} trouvé dans le dossier {1}"),
    (En, Longitude, "Longitude"),
    (Fr, Longitude, "Longitude"),
    (En, Latitude, "Latitude"),
    (Fr, Latitude, "Latitude"),
];

fn placeholders(template: &str) -> BTreeSet<usize> {
    let mut found = BTreeSet::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        rest = &rest[open + 1..];
        if let Some(close) = rest.find('}') {
            if let Ok(n) = rest[..close].parse() {
                found.insert(n);
            }
            rest = &rest[close + 1..];
        }
    }
    found
}

#[derive(Debug, Clone)]
pub struct Localizer {
    messages: HashMap<(Language, MessageKey), &'static str>,
}

impl Localizer {
    pub fn new() -> Result<Self, DashboardError> {
        Self::from_entries(MESSAGES)
    }

    pub fn from_entries(entries: &[(Language, MessageKey, &'static str)]) -> Result<Self, DashboardError> {
        let mut messages = HashMap::new();
        for (lang, key, text) in entries {
            if messages.insert((*lang, *key), *text).is_some() {
                return Err(DashboardError::Localization(format!(
                    "duplicate entry {:?} for {}",
                    key,
                    lang.code()
                )));
            }
        }

        for key in MessageKey::ALL {
            let mut reference: Option<(Language, BTreeSet<usize>)> = None;
            for lang in Language::ALL {
                let text = messages.get(&(lang, key)).ok_or_else(|| {
                    DashboardError::Localization(format!("missing {:?} for {}", key, lang.code()))
                })?;
                let found = placeholders(text);
                match &reference {
                    Some((ref_lang, expected)) if *expected != found => {
                        return Err(DashboardError::Localization(format!(
                            "{:?}: placeholders differ between {} and {}",
                            key,
                            ref_lang.code(),
                            lang.code()
                        )));
                    }
                    Some(_) => {}
                    None => reference = Some((lang, found)),
                }
            }
        }

        Ok(Self { messages })
    }

    pub fn text(&self, lang: Language, key: MessageKey) -> String {
        self.messages
            .get(&(lang, key))
            .map(|t| t.to_string())
            .unwrap_or_else(|| format!("{:?}", key))
    }

    /// Template with `{0}`, `{1}`, ... replaced by `args`.
    pub fn format(&self, lang: Language, key: MessageKey, args: &[&str]) -> String {
        args.iter()
            .enumerate()
            .fold(self.text(lang, key), |text, (i, arg)| text.replace(&format!("{{{}}}", i), arg))
    }

    /// Whole table for one language, for the static labels of the UI.
    pub fn table(&self, lang: Language) -> HashMap<MessageKey, String> {
        MessageKey::ALL
            .into_iter()
            .map(|key| (key, self.text(lang, key)))
            .collect()
    }
}
