use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use harmonic_db::models::{Draw, GameConfig, Strategy, HOT_NUMBERS};

use crate::montecarlo::{MonteCarloScorer, Scores};

/// Probabilité qu'une position soit retouchée par la stratégie équilibrée.
pub const BALANCED_POSITION_PROBABILITY: f64 = 0.5;
/// Probabilité de substitution par position pour les stratégies chaude et froide.
pub const HOT_COLD_PROBABILITY: f64 = 0.7;

/// Origine des tables chaud/froid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HotColdSource {
    /// Tables constantes, quel que soit l'historique.
    #[default]
    Static,
    /// Numéros les plus et les moins fréquents de l'historique.
    Historical,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HotColdTables {
    pub hot: Vec<u8>,
    pub cold: Vec<u8>,
}

impl HotColdTables {
    pub fn fixed(config: &GameConfig) -> Self {
        Self {
            hot: config.hot_numbers(),
            cold: config.cold_numbers(),
        }
    }

    /// Classement par fréquence d'apparition, égalités départagées par le plus petit numéro.
    pub fn from_history(draws: &[Draw], config: &GameConfig, size: usize) -> Self {
        if draws.is_empty() {
            return Self::fixed(config);
        }

        let mut counts = vec![0u32; config.max_number as usize];
        for draw in draws {
            for &n in draw.numbers() {
                let idx = (n - 1) as usize;
                if idx < counts.len() {
                    counts[idx] += 1;
                }
            }
        }

        let mut by_frequency: Vec<(u8, u32)> = counts
            .iter()
            .enumerate()
            .map(|(i, &c)| ((i + 1) as u8, c))
            .collect();
        by_frequency.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let size = size.min(by_frequency.len() / 2);
        let hot = by_frequency.iter().take(size).map(|&(n, _)| n).collect();
        let cold = by_frequency.iter().rev().take(size).map(|&(n, _)| n).collect();
        Self { hot, cold }
    }

    pub fn resolve(source: HotColdSource, draws: &[Draw], config: &GameConfig) -> Self {
        match source {
            HotColdSource::Static => Self::fixed(config),
            HotColdSource::Historical => Self::from_history(draws, config, HOT_NUMBERS.len()),
        }
    }
}

/// Substitutions des stratégies balanced/hot/cold. Une substitution qui créerait un doublon
/// est ignorée. `chess` laisse la grille intacte (voir `StrategyAdjuster::apply`).
pub fn substitute(
    numbers: &[u8],
    strategy: Strategy,
    tables: &HotColdTables,
    rng: &mut StdRng,
) -> Vec<u8> {
    let mut adjusted = numbers.to_vec();

    for i in 0..adjusted.len() {
        let table = match strategy {
            Strategy::Balanced => {
                if !rng.random_bool(BALANCED_POSITION_PROBABILITY) {
                    continue;
                }
                if rng.random_bool(0.5) {
                    &tables.hot
                } else {
                    &tables.cold
                }
            }
            Strategy::Hot => {
                if !rng.random_bool(HOT_COLD_PROBABILITY) {
                    continue;
                }
                &tables.hot
            }
            Strategy::Cold => {
                if !rng.random_bool(HOT_COLD_PROBABILITY) {
                    continue;
                }
                &tables.cold
            }
            Strategy::Chess => return adjusted,
        };

        if let Some(&pick) = table.choose(rng) {
            if !adjusted.contains(&pick) {
                adjusted[i] = pick;
            }
        }
    }

    adjusted
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdjustedSet {
    pub numbers: Vec<u8>,
    /// Présent uniquement pour `chess` ; vide si la simulation a échoué.
    pub scores: Option<Scores>,
}

#[derive(Debug, Clone)]
pub struct StrategyAdjuster {
    scorer: MonteCarloScorer,
}

impl StrategyAdjuster {
    pub fn new(scorer: MonteCarloScorer) -> Self {
        Self { scorer }
    }

    pub fn scorer(&self) -> &MonteCarloScorer {
        &self.scorer
    }

    pub async fn apply(
        &self,
        numbers: &[u8],
        strategy: Strategy,
        tables: &HotColdTables,
        rng: &mut StdRng,
    ) -> AdjustedSet {
        match strategy {
            Strategy::Chess => {
                let seed: u64 = rng.random();
                let outcome = self.scorer.rank(numbers, seed).await;
                AdjustedSet {
                    numbers: outcome.best_numbers,
                    scores: Some(outcome.scores),
                }
            }
            _ => AdjustedSet {
                numbers: substitute(numbers, strategy, tables, rng),
                scores: None,
            },
        }
    }
}
