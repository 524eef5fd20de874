//! Génération de grilles guidée par l'histogramme des écarts.
//!
//! Une tentative : écarts tirés dans l'histogramme, bornés pour tenir dans `[1, max]`, posés à
//! partir d'une graine dans le premier tiers, puis stratégie, filtres et score de confiance.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use harmonic_db::models::{gaps_of, Draw, Game, GameConfig, SecondaryGroup, Strategy};
use harmonic_db::snapshot::{GapStatistics, Histogram};

use crate::confidence::confidence;
use crate::error::{EngineError, EngineResult};
use crate::filters::{analyze_set, check_filters, check_range, Rejection, SetAnalysis};
use crate::montecarlo::Scores;
use crate::strategy::{HotColdSource, HotColdTables, StrategyAdjuster};

pub const MAX_ATTEMPTS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSet {
    pub numbers: Vec<u8>,
    pub gaps: Vec<u32>,
    pub confidence: f64,
    pub analysis: SetAnalysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scores: Option<Scores>,
    pub attempts: usize,
}

/// Ce que la génération lit de l'analyse courante.
#[derive(Debug, Clone, Copy)]
pub struct GenerationContext<'a> {
    pub stats: &'a GapStatistics,
    pub histogram: &'a Histogram,
    pub draws: &'a [Draw],
}

/// Inversion de la fonction de répartition sur l'histogramme ordonné.
/// `None` si l'histogramme est vide.
pub fn sample_gap(histogram: &Histogram, rng: &mut StdRng) -> Option<u32> {
    let total: u64 = histogram.values().sum();
    if total == 0 {
        return None;
    }

    let r: f64 = rng.random();
    let mut cumulative = 0.0;
    for (&gap, &count) in histogram {
        cumulative += count as f64 / total as f64;
        if r < cumulative {
            return Some(gap);
        }
    }
    // Arrondi flottant
    histogram.keys().next().copied()
}

/// Borne chaque écart pour que la somme courante plus un pas minimal par écart restant
/// tienne dans `budget`, soit `max - seed`. Chaque écart vaut au moins 1.
pub fn bound_gaps(raw: &[u32], budget: u32) -> Vec<u32> {
    let mut sum = 0u32;
    let mut bounded = Vec::with_capacity(raw.len());

    for (i, &gap) in raw.iter().enumerate() {
        let remaining = (raw.len() - i - 1) as u32;
        let feasible = budget.saturating_sub(sum).saturating_sub(remaining).max(1);
        let gap = gap.clamp(1, feasible);
        sum += gap;
        bounded.push(gap);
    }

    bounded
}

/// Pose les écarts à partir de `seed`. Un pas qui retomberait sur un numéro déjà pris est
/// sauté ; le manque est comblé par des numéros libres tirés uniformément.
pub fn gaps_to_numbers(gaps: &[u32], seed: u32, config: &GameConfig, rng: &mut StdRng) -> Vec<u32> {
    let mut numbers = vec![seed];
    let mut current = seed;
    for &gap in gaps {
        current += gap;
        if !numbers.contains(&current) {
            numbers.push(current);
        }
    }

    let max = u32::from(config.max_number);
    while numbers.len() < config.numbers_count {
        let unused: Vec<u32> = (1..=max).filter(|n| !numbers.contains(n)).collect();
        if unused.is_empty() {
            break;
        }
        numbers.push(unused[rng.random_range(0..unused.len())]);
    }

    numbers
}

/// Étapes 1 à 4 d'une tentative : grille brute, triée, avant stratégie.
pub fn raw_candidate(
    config: &GameConfig,
    histogram: &Histogram,
    rng: &mut StdRng,
) -> Result<Vec<u8>, Rejection> {
    let max = u32::from(config.max_number);
    let seed = rng.random_range(1..=(max / 3).max(1));
    let fallback_max = (max / config.numbers_count as u32).max(1);
    let mut raw = Vec::with_capacity(config.numbers_count.saturating_sub(1));
    for _ in 1..config.numbers_count {
        let gap = match sample_gap(histogram, rng) {
            Some(gap) => gap,
            // Histogramme vide : écart uniforme
            None => rng.random_range(1..=fallback_max),
        };
        raw.push(gap);
    }
    let gaps = bound_gaps(&raw, max - seed);
    let numbers = gaps_to_numbers(&gaps, seed, config, rng);

    if numbers.iter().any(|&n| n > max) {
        return Err(Rejection::OutOfRange);
    }
    let mut numbers: Vec<u8> = numbers.into_iter().map(|n| n as u8).collect();
    check_range(&numbers, config)?;
    numbers.sort_unstable();
    Ok(numbers)
}

pub fn draw_secondary(group: &SecondaryGroup, rng: &mut StdRng) -> Vec<u8> {
    let count = group.count.min(group.max_number as usize);
    let mut numbers: Vec<u8> = index::sample(rng, group.max_number as usize, count)
        .iter()
        .map(|i| (i + 1) as u8)
        .collect();
    numbers.sort_unstable();
    numbers
}

#[derive(Debug, Clone)]
pub struct NumberSetGenerator {
    max_attempts: usize,
    adjuster: StrategyAdjuster,
    hot_cold_source: HotColdSource,
}

impl NumberSetGenerator {
    pub fn new(max_attempts: usize, adjuster: StrategyAdjuster, hot_cold_source: HotColdSource) -> Self {
        Self {
            max_attempts,
            adjuster,
            hot_cold_source,
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn adjuster(&self) -> &StrategyAdjuster {
        &self.adjuster
    }

    pub async fn generate_one(
        &self,
        game: Game,
        strategy: Strategy,
        ctx: &GenerationContext<'_>,
        rng: &mut StdRng,
    ) -> EngineResult<GeneratedSet> {
        let config = game.config();
        let tables = HotColdTables::resolve(self.hot_cold_source, ctx.draws, &config);

        for attempt in 1..=self.max_attempts {
            let candidate = match raw_candidate(&config, ctx.histogram, rng) {
                Ok(candidate) => candidate,
                Err(reason) => {
                    debug!(attempt, %reason, "candidat rejeté");
                    continue;
                }
            };

            // chess ne change pas la composition de la grille : inutile de simuler un rejet
            if strategy == Strategy::Chess {
                if let Err(reason) = check_filters(&candidate, &config) {
                    debug!(attempt, %reason, "candidat rejeté");
                    continue;
                }
            }

            let adjusted = self.adjuster.apply(&candidate, strategy, &tables, rng).await;
            let mut numbers = adjusted.numbers;
            numbers.sort_unstable();

            if let Err(reason) = check_filters(&numbers, &config) {
                debug!(attempt, %reason, "candidat rejeté");
                continue;
            }

            let confidence = confidence(&numbers, ctx.stats, ctx.histogram, strategy);
            let secondary = config.secondary.as_ref().map(|group| draw_secondary(group, rng));

            return Ok(GeneratedSet {
                gaps: gaps_of(&numbers),
                analysis: analyze_set(&numbers, &config),
                numbers,
                confidence,
                secondary,
                scores: adjusted.scores,
                attempts: attempt,
            });
        }

        Err(EngineError::GenerationExhausted {
            attempts: self.max_attempts,
        })
    }
}
