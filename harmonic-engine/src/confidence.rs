use harmonic_db::models::{gaps_of, Strategy};
use harmonic_db::snapshot::{GapStatistics, Histogram};

pub const GAP_WEIGHT: f64 = 0.4;
pub const HISTOGRAM_WEIGHT: f64 = 0.3;

pub fn strategy_bonus(strategy: Strategy) -> f64 {
    match strategy {
        Strategy::Balanced => 0.1,
        Strategy::Hot | Strategy::Cold => 0.15,
        Strategy::Chess => 0.2,
    }
}

/// Proximité entre l'écart moyen de la grille et l'écart moyen historique, dans [0, 1].
pub fn gap_confidence(gaps: &[u32], stats: &GapStatistics) -> f64 {
    if gaps.is_empty() || stats.mean <= 0.0 {
        return 0.0;
    }
    let avg = gaps.iter().map(|&g| g as f64).sum::<f64>() / gaps.len() as f64;
    (1.0 - (avg - stats.mean).abs() / stats.mean).max(0.0)
}

/// Fréquence moyenne des écarts de la grille, relative à l'écart le plus fréquent.
pub fn histogram_confidence(gaps: &[u32], histogram: &Histogram) -> f64 {
    let max_freq = histogram.values().copied().max().unwrap_or(0);
    if gaps.is_empty() || max_freq == 0 {
        return 0.0;
    }
    let total: f64 = gaps
        .iter()
        .map(|g| histogram.get(g).copied().unwrap_or(0) as f64 / max_freq as f64)
        .sum();
    total / gaps.len() as f64
}

pub fn confidence(
    numbers: &[u8],
    stats: &GapStatistics,
    histogram: &Histogram,
    strategy: Strategy,
) -> f64 {
    let mut sorted = numbers.to_vec();
    sorted.sort_unstable();
    let gaps = gaps_of(&sorted);

    let score = GAP_WEIGHT * gap_confidence(&gaps, stats)
        + HISTOGRAM_WEIGHT * histogram_confidence(&gaps, histogram)
        + strategy_bonus(strategy);

    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}
