use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{DataError, DataResult};
use crate::models::Game;
use crate::storage::{read_file, write_atomic};

/// Écart -> nombre d'occurrences. Ordonné pour que l'échantillonnage reste reproductible.
pub type Histogram = BTreeMap<u32, u64>;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GapStatistics {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: u32,
    pub max: u32,
    pub count: usize,
}

impl GapStatistics {
    /// Aucun écart observé (historique vide ou jeu à un seul numéro).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub total_draws: usize,
    pub total_gaps: usize,
    pub mean_gap: f64,
    pub is_harmonic: bool,
    pub harmonic_range: (f64, f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    pub game: Game,
    pub path: PathBuf,
    pub synthetic: bool,
    pub draw_count: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSnapshot {
    pub analysis: AnalysisSummary,
    pub overall_stats: GapStatistics,
    pub histogram: Histogram,
    pub time_windows: BTreeMap<String, GapStatistics>,
    pub data_source: DataSource,
    pub generated_at: DateTime<Utc>,
}

/// Instantané JSON de la dernière analyse, réécrit en entier à chaque analyse.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join("harmonic_analysis.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load_raw(&self) -> DataResult<Vec<u8>> {
        if !self.exists() {
            return Err(DataError::StatsNotGenerated);
        }
        read_file(&self.path)
    }

    pub fn load(&self) -> DataResult<AnalysisSnapshot> {
        let bytes = self.load_raw()?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn save(&self, snapshot: &AnalysisSnapshot) -> DataResult<()> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        write_atomic(&self.path, &bytes)?;
        info!(path = %self.path.display(), "instantané d'analyse enregistré");
        Ok(())
    }
}
