//! Façade : analyse, statistiques en cache, génération de lots.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

use harmonic_db::error::DataError;
use harmonic_db::history::{HistoryStore, ImportSummary, LoadedHistory};
use harmonic_db::models::{Draw, Game, Strategy};
use harmonic_db::snapshot::{AnalysisSnapshot, SnapshotStore};

use crate::cache::{Clock, SystemClock, TtlCache};
use crate::config::HarmonicConfig;
use crate::error::{EngineError, EngineResult};
use crate::gaps;
use crate::generator::{GeneratedSet, GenerationContext, NumberSetGenerator};
use crate::montecarlo::{rank_numbers, MonteCarloConfig, MonteCarloOutcome, MonteCarloScorer};
use crate::strategy::StrategyAdjuster;

pub const MAX_SETS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateRequest {
    game: Game,
    strategy: Strategy,
    n_sets: usize,
}

impl GenerateRequest {
    pub fn new(game: Game, strategy: Strategy, n_sets: usize) -> EngineResult<Self> {
        if !(1..=MAX_SETS).contains(&n_sets) {
            return Err(EngineError::InvalidRequest(format!(
                "nombre de grilles {} hors de [1, {}]",
                n_sets, MAX_SETS
            )));
        }
        Ok(Self {
            game,
            strategy,
            n_sets,
        })
    }

    pub fn parse(game: &str, strategy: &str, n_sets: usize) -> EngineResult<Self> {
        let game: Game = game
            .parse()
            .map_err(|e: DataError| EngineError::InvalidRequest(e.to_string()))?;
        let strategy: Strategy = strategy
            .parse()
            .map_err(|e: DataError| EngineError::InvalidRequest(e.to_string()))?;
        Self::new(game, strategy, n_sets)
    }

    pub fn game(&self) -> Game {
        self.game
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn n_sets(&self) -> usize {
        self.n_sets
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarmonicAnalysis {
    pub mean_gap: f64,
    pub is_harmonic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub sets: Vec<GeneratedSet>,
    pub strategy: Strategy,
    pub game: Game,
    pub generated_at: DateTime<Utc>,
    pub harmonic_analysis: HarmonicAnalysis,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateReport {
    /// Présent quand une source d'import est configurée.
    pub import: Option<ImportSummary>,
    pub regenerated: bool,
    pub snapshot: AnalysisSnapshot,
}

pub struct HarmonicService {
    config: HarmonicConfig,
    history: HistoryStore,
    snapshots: SnapshotStore,
    clock: Arc<dyn Clock>,
    stats_cache: TtlCache<(), AnalysisSnapshot>,
    history_cache: TtlCache<Game, Arc<LoadedHistory>>,
    generator: NumberSetGenerator,
}

impl HarmonicService {
    pub fn new(config: HarmonicConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: HarmonicConfig, clock: Arc<dyn Clock>) -> Self {
        let history = HistoryStore::in_dir(&config.data_dir, config.reference_game);
        let snapshots = SnapshotStore::in_dir(&config.data_dir);
        let scorer = MonteCarloScorer::new(config.monte_carlo.clone());
        let generator = NumberSetGenerator::new(
            config.max_attempts,
            StrategyAdjuster::new(scorer),
            config.hot_cold_source,
        );

        Self {
            stats_cache: TtlCache::new(config.cache_ttl()),
            history_cache: TtlCache::new(config.cache_ttl()),
            config,
            history,
            snapshots,
            clock,
            generator,
        }
    }

    pub fn config(&self) -> &HarmonicConfig {
        &self.config
    }

    pub fn history_store(&self) -> &HistoryStore {
        &self.history
    }

    pub fn snapshot_store(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// Historique du jeu de référence, synthétisé au premier accès si le fichier manque.
    pub fn load_history(&self) -> EngineResult<Arc<LoadedHistory>> {
        let game = self.config.reference_game;
        if let Some(history) = self.history_cache.get(&game, self.clock.as_ref()) {
            return Ok(history);
        }

        let loaded = self
            .history
            .load_or_synthesize(&self.config.synthetic, self.clock.today())?;
        let history = Arc::new(loaded);
        self.history_cache
            .insert(game, Arc::clone(&history), self.clock.as_ref());
        Ok(history)
    }

    /// Recalcule l'analyse depuis l'historique courant et la persiste.
    pub fn analyze(&self) -> EngineResult<AnalysisSnapshot> {
        let history = self.load_history()?;
        let snapshot = gaps::analyze(self.config.reference_game, &history, self.clock.now());
        self.snapshots.save(&snapshot)?;
        self.stats_cache
            .insert((), snapshot.clone(), self.clock.as_ref());

        info!(
            draws = snapshot.analysis.total_draws,
            mean_gap = snapshot.analysis.mean_gap,
            harmonic = snapshot.analysis.is_harmonic,
            "analyse terminée"
        );
        Ok(snapshot)
    }

    /// Cache puis disque. Sans instantané : `StatsNotGenerated`.
    pub fn get_stats(&self) -> EngineResult<AnalysisSnapshot> {
        if let Some(snapshot) = self.stats_cache.get(&(), self.clock.as_ref()) {
            return Ok(snapshot);
        }
        let snapshot = self.snapshots.load()?;
        self.stats_cache
            .insert((), snapshot.clone(), self.clock.as_ref());
        Ok(snapshot)
    }

    pub fn import(&self, source: &Path) -> EngineResult<ImportSummary> {
        let summary = self.history.import_csv(source)?;
        self.history_cache.clear();
        Ok(summary)
    }

    /// Rafraîchit l'historique (import configuré, sinon série synthétique), vide les caches
    /// et relance l'analyse. Un historique réel sans source d'import est simplement relu.
    pub fn update_analysis(&self) -> EngineResult<UpdateReport> {
        let mut import = None;
        let mut regenerated = false;

        if let Some(source) = &self.config.import_source {
            import = Some(self.history.import_csv(source)?);
        } else if self.config.synthetic.enabled
            && (!self.history.exists() || self.history.is_synthetic())
        {
            self.history
                .regenerate_synthetic(&self.config.synthetic, self.clock.today())?;
            regenerated = true;
        }

        self.history_cache.clear();
        self.stats_cache.clear();

        let snapshot = self.analyze()?;
        Ok(UpdateReport {
            import,
            regenerated,
            snapshot,
        })
    }

    pub async fn generate(&self, request: GenerateRequest) -> EngineResult<GenerationResponse> {
        self.generate_observed(request, |_| {}).await
    }

    /// `on_set` reçoit le nombre de grilles déjà produites.
    pub async fn generate_observed<F>(
        &self,
        request: GenerateRequest,
        mut on_set: F,
    ) -> EngineResult<GenerationResponse>
    where
        F: FnMut(usize),
    {
        let snapshot = match self.get_stats() {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_stats_not_generated() => {
                info!("aucun instantané, analyse à la demande");
                self.analyze()?
            }
            Err(e) => return Err(e),
        };
        let history = self.load_history()?;

        // Tables chaud/froid historiques uniquement pour le jeu réellement analysé
        let draws: &[Draw] = if request.game() == self.config.reference_game {
            history.draws.as_slice()
        } else {
            &[]
        };
        let ctx = GenerationContext {
            stats: &snapshot.overall_stats,
            histogram: &snapshot.histogram,
            draws,
        };

        let mut rng = self.rng();
        let mut sets = Vec::with_capacity(request.n_sets());
        for i in 0..request.n_sets() {
            let set = self
                .generator
                .generate_one(request.game(), request.strategy(), &ctx, &mut rng)
                .await?;
            sets.push(set);
            on_set(i + 1);
        }
        sets.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        info!(
            game = %request.game(),
            strategy = %request.strategy(),
            sets = sets.len(),
            "grilles générées"
        );

        Ok(GenerationResponse {
            sets,
            strategy: request.strategy(),
            game: request.game(),
            generated_at: self.clock.now(),
            harmonic_analysis: HarmonicAnalysis {
                mean_gap: snapshot.analysis.mean_gap,
                is_harmonic: snapshot.analysis.is_harmonic,
            },
        })
    }

    /// Simulation seule, hors génération. Les erreurs du worker sont remontées.
    pub async fn simulate(
        &self,
        numbers: &[u8],
        iterations: Option<usize>,
    ) -> EngineResult<MonteCarloOutcome> {
        if numbers.is_empty() {
            return Err(EngineError::InvalidRequest("aucun numéro".into()));
        }
        let mut unique = numbers.to_vec();
        unique.sort_unstable();
        unique.dedup();
        if unique.len() != numbers.len() {
            return Err(EngineError::InvalidRequest("numéros en double".into()));
        }

        let config = MonteCarloConfig {
            iterations: iterations.unwrap_or(self.config.monte_carlo.iterations),
            ..self.config.monte_carlo.clone()
        };
        let seed: u64 = self.rng().random();
        let scores = MonteCarloScorer::new(config).score(numbers, seed).await?;

        Ok(MonteCarloOutcome {
            best_numbers: rank_numbers(numbers, &scores),
            scores,
        })
    }

    fn rng(&self) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        }
    }
}
