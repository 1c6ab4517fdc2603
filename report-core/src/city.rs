use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, error, info};

use crate::{
    error::{ConfigError, NotFoundError},
    model::CityRecord,
};

/// The 81 provinces, compiled in so the binary can fall back on them in tests.
const BUNDLED_CITIES: &str = include_str!("../../data/turkey_cities.json");

/// Immutable list of selectable cities, loaded once at startup.
#[derive(Debug, Clone)]
pub struct CityDirectory {
    cities: Vec<CityRecord>,
}

impl CityDirectory {
    /// Load a JSON city list of the form `[{"id": 1, "name": "Adana", "query": "Adana,TR"}, ...]`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| {
            error!("City file could not be read at {}: {}", path.display(), source);
            ConfigError::CityListUnreadable { path: path.to_path_buf(), source }
        })?;

        let directory = Self::parse(&contents, path)?;
        info!("Loaded {} cities from {}", directory.len(), path.display());
        Ok(directory)
    }

    /// The compiled-in list of Turkish provinces.
    pub fn bundled() -> Result<Self, ConfigError> {
        Self::parse(BUNDLED_CITIES, Path::new("<bundled>"))
    }

    /// Build a directory from records, rejecting duplicates and empty lists.
    pub fn from_records(records: Vec<CityRecord>) -> Result<Self, ConfigError> {
        if records.is_empty() {
            return Err(ConfigError::EmptyCityList);
        }

        let mut names = HashSet::new();
        let mut ids = HashSet::new();
        for record in &records {
            if !names.insert(fold_name(&record.name)) {
                return Err(ConfigError::DuplicateCity(record.name.clone()));
            }
            if !ids.insert(record.id) {
                return Err(ConfigError::DuplicateCityId(record.id));
            }
        }

        Ok(Self { cities: records })
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let records: Vec<CityRecord> = serde_json::from_str(contents).map_err(|source| {
            error!("Failed to parse city file {}: {}", path.display(), source);
            ConfigError::CityListMalformed { path: PathBuf::from(path), source }
        })?;

        Self::from_records(records)
    }

    pub fn cities(&self) -> &[CityRecord] {
        &self.cities
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn get_by_id(&self, id: u32) -> Option<&CityRecord> {
        self.cities.iter().find(|c| c.id == id)
    }

    /// Resolve user input to a city.
    ///
    /// An all-digit input selects by id (the numbered menu). Anything else is
    /// matched by name, ignoring case and Turkish diacritics, so `"istanbul"`,
    /// `"ISTANBUL"` and `"İstanbul"` all find the same record.
    pub fn resolve(&self, input: &str) -> Result<&CityRecord, NotFoundError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(NotFoundError(String::new()));
        }

        let found = if trimmed.chars().all(|c| c.is_ascii_digit()) {
            trimmed.parse::<u32>().ok().and_then(|id| self.get_by_id(id))
        } else {
            let wanted = fold_name(trimmed);
            self.cities.iter().find(|c| fold_name(&c.name) == wanted)
        };

        match found {
            Some(city) => {
                debug!("Resolved '{}' to {} ({})", trimmed, city.name, city.lookup_key);
                Ok(city)
            }
            None => Err(NotFoundError(trimmed.to_string())),
        }
    }
}

/// Lower-case and strip Turkish diacritics.
///
/// Applied before `to_lowercase` because `'İ'.to_lowercase()` yields `i` plus a
/// combining dot, which would never match a plain `i`.
pub fn fold_name(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.trim().chars() {
        match c {
            'ç' | 'Ç' => out.push('c'),
            'ğ' | 'Ğ' => out.push('g'),
            'ı' | 'İ' | 'î' | 'Î' => out.push('i'),
            'ö' | 'Ö' => out.push('o'),
            'ş' | 'Ş' => out.push('s'),
            'ü' | 'Ü' | 'û' | 'Û' => out.push('u'),
            'â' | 'Â' => out.push('a'),
            // combining marks from decomposed input
            '\u{0300}'..='\u{036F}' => {}
            other => out.extend(other.to_lowercase()),
        }
    }
    out
}
