//! Simulation Monte Carlo de la stratégie `chess`.
//!
//! Chaque essai tire une grille de référence uniforme, sans remise, dans [1, 49]. Chaque numéro
//! candidat présent dans la référence gagne le nombre total de numéros communs de l'essai.
//! La simulation tourne sur un worker bloquant ; un échec du worker n'est jamais propagé.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};

pub const DEFAULT_ITERATIONS: usize = 10_000;
pub const REFERENCE_POOL_MAX: u8 = 49;
pub const DEFAULT_CHUNK_SIZE: usize = 1_000;

/// Numéro -> score cumulé.
pub type Scores = BTreeMap<u8, u64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    pub iterations: usize,
    pub pool_max: u8,
    /// Essais par tâche rayon. Chaque tâche a sa propre graine dérivée.
    pub chunk_size: usize,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            pool_max: REFERENCE_POOL_MAX,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonteCarloOutcome {
    pub scores: Scores,
    pub best_numbers: Vec<u8>,
}

pub fn simulate(numbers: &[u8], iterations: usize, pool_max: u8, rng: &mut StdRng) -> Scores {
    let mut scores = Scores::new();
    let size = numbers.len().min(pool_max as usize);
    if size == 0 {
        return scores;
    }

    for _ in 0..iterations {
        let reference: Vec<u8> = index::sample(rng, pool_max as usize, size)
            .iter()
            .map(|i| (i + 1) as u8)
            .collect();
        let hits = numbers.iter().filter(|n| reference.contains(n)).count() as u64;
        if hits == 0 {
            continue;
        }
        for n in numbers.iter().filter(|n| reference.contains(n)) {
            *scores.entry(*n).or_insert(0) += hits;
        }
    }

    scores
}

fn merge_scores(mut acc: Scores, other: Scores) -> Scores {
    for (n, s) in other {
        *acc.entry(n).or_insert(0) += s;
    }
    acc
}

/// Découpe les essais en tâches rayon ; même graine, même résultat.
pub fn simulate_parallel(numbers: &[u8], config: &MonteCarloConfig, seed: u64) -> Scores {
    let chunk = config.chunk_size.max(1);
    let n_chunks = config.iterations.div_ceil(chunk);

    (0..n_chunks)
        .into_par_iter()
        .map(|c| {
            let iterations = chunk.min(config.iterations - c * chunk);
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(c as u64));
            simulate(numbers, iterations, config.pool_max, &mut rng)
        })
        .reduce(Scores::new, merge_scores)
}

/// Classe les numéros par score décroissant (égalités : plus petit numéro d'abord), puis
/// complète avec les numéros d'origine jamais touchés.
pub fn rank_numbers(numbers: &[u8], scores: &Scores) -> Vec<u8> {
    let mut ranked: Vec<(u8, u64)> = scores
        .iter()
        .filter(|(n, _)| numbers.contains(n))
        .map(|(&n, &s)| (n, s))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut best: Vec<u8> = ranked
        .into_iter()
        .map(|(n, _)| n)
        .take(numbers.len())
        .collect();
    for &n in numbers {
        if best.len() >= numbers.len() {
            break;
        }
        if !best.contains(&n) {
            best.push(n);
        }
    }
    best
}

/// Exécute `job` sur un thread bloquant. Panique ou erreur du job -> `WorkerFailure`.
pub async fn run_worker<F>(numbers: Vec<u8>, job: F) -> EngineResult<Scores>
where
    F: FnOnce(Vec<u8>) -> EngineResult<Scores> + Send + 'static,
{
    tokio::task::spawn_blocking(move || job(numbers))
        .await
        .map_err(|e| EngineError::WorkerFailure(e.to_string()))?
}

/// Ne remonte jamais d'erreur : en cas d'échec, numéros d'origine et scores vides.
pub async fn rank_with<F>(numbers: &[u8], job: F) -> MonteCarloOutcome
where
    F: FnOnce(Vec<u8>) -> EngineResult<Scores> + Send + 'static,
{
    match run_worker(numbers.to_vec(), job).await {
        Ok(scores) => {
            debug!(scored = scores.len(), "simulation Monte Carlo terminée");
            MonteCarloOutcome {
                best_numbers: rank_numbers(numbers, &scores),
                scores,
            }
        }
        Err(e) => {
            warn!(error = %e, "simulation abandonnée, grille d'origine conservée");
            MonteCarloOutcome {
                scores: Scores::new(),
                best_numbers: numbers.to_vec(),
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MonteCarloScorer {
    config: MonteCarloConfig,
}

impl MonteCarloScorer {
    pub fn new(config: MonteCarloConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MonteCarloConfig {
        &self.config
    }

    pub async fn score(&self, numbers: &[u8], seed: u64) -> EngineResult<Scores> {
        let config = self.config.clone();
        run_worker(numbers.to_vec(), move |nums| Ok(simulate_parallel(&nums, &config, seed))).await
    }

    pub async fn rank(&self, numbers: &[u8], seed: u64) -> MonteCarloOutcome {
        let config = self.config.clone();
        rank_with(numbers, move |nums| Ok(simulate_parallel(&nums, &config, seed))).await
    }
}
