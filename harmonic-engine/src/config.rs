use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use harmonic_db::error::DataError;
use harmonic_db::history::SyntheticHistory;
use harmonic_db::models::Game;
use harmonic_db::storage::{read_file, write_atomic};

use crate::error::EngineResult;
use crate::generator::MAX_ATTEMPTS;
use crate::montecarlo::MonteCarloConfig;
use crate::strategy::HotColdSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Niveau par défaut, remplacé par `RUST_LOG` s'il est défini.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarmonicConfig {
    pub data_dir: PathBuf,
    /// Jeu dont l'historique alimente l'analyse, quel que soit le jeu demandé.
    pub reference_game: Game,
    /// Fichier réimporté par `update`.
    pub import_source: Option<PathBuf>,
    pub synthetic: SyntheticHistory,
    pub cache_ttl_secs: u64,
    pub max_attempts: usize,
    pub monte_carlo: MonteCarloConfig,
    pub hot_cold_source: HotColdSource,
    /// Graine des générations ; `None` = aléatoire.
    pub seed: Option<u64>,
    pub log: LogConfig,
}

impl Default for HarmonicConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            reference_game: Game::Lotto,
            import_source: None,
            synthetic: SyntheticHistory::default(),
            cache_ttl_secs: 300,
            max_attempts: MAX_ATTEMPTS,
            monte_carlo: MonteCarloConfig::default(),
            hot_cold_source: HotColdSource::default(),
            seed: None,
            log: LogConfig::default(),
        }
    }
}

impl HarmonicConfig {
    pub const DEFAULT_FILE: &'static str = "harmonic.json";

    /// Fichier absent : configuration par défaut. Fichier illisible ou invalide : erreur.
    pub fn load_or_default(path: &Path) -> EngineResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "pas de fichier de configuration, valeurs par défaut");
            return Ok(Self::default());
        }
        let bytes = read_file(path)?;
        let config = serde_json::from_slice(&bytes).map_err(DataError::from)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> EngineResult<()> {
        let json = serde_json::to_vec_pretty(self).map_err(DataError::from)?;
        write_atomic(path, &json)?;
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
