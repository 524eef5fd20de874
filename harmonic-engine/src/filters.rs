use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use harmonic_db::models::{GameConfig, BIRTHDAY_MAX};

/// Longueur de suite consécutive refusée.
pub const MAX_RUN: usize = 3;
/// Nombre maximal de numéros par dizaine.
pub const MAX_PER_DECADE: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    OutOfRange,
    Duplicate,
    Parity,
    Balance,
    Run,
    Decade,
    Popular,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::OutOfRange => write!(f, "hors limites"),
            Rejection::Duplicate => write!(f, "doublon"),
            Rejection::Parity => write!(f, "parité"),
            Rejection::Balance => write!(f, "équilibre bas/haut"),
            Rejection::Run => write!(f, "suite consécutive"),
            Rejection::Decade => write!(f, "dizaine surchargée"),
            Rejection::Popular => write!(f, "grille populaire"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAnalysis {
    pub sum: u32,
    pub even_count: usize,
    pub odd_count: usize,
    pub low_count: usize,
    pub high_count: usize,
}

pub fn analyze_set(numbers: &[u8], config: &GameConfig) -> SetAnalysis {
    let split = config.low_high_split();
    let even_count = numbers.iter().filter(|&&n| n % 2 == 0).count();
    let low_count = numbers.iter().filter(|&&n| n <= split).count();
    SetAnalysis {
        sum: numbers.iter().map(|&n| u32::from(n)).sum(),
        even_count,
        odd_count: numbers.len() - even_count,
        low_count,
        high_count: numbers.len() - low_count,
    }
}

pub fn check_range(numbers: &[u8], config: &GameConfig) -> Result<(), Rejection> {
    if numbers.iter().any(|&n| n < 1 || n > config.max_number) {
        return Err(Rejection::OutOfRange);
    }
    let mut seen = numbers.to_vec();
    seen.sort_unstable();
    seen.dedup();
    if seen.len() != numbers.len() {
        return Err(Rejection::Duplicate);
    }
    Ok(())
}

pub fn passes_parity(numbers: &[u8], config: &GameConfig) -> bool {
    let (low, high) = config.parity_bounds();
    let even = numbers.iter().filter(|&&n| n % 2 == 0).count();
    (low..=high).contains(&even)
}

pub fn passes_balance(numbers: &[u8], config: &GameConfig) -> bool {
    let analysis = analyze_set(numbers, config);
    analysis.low_count.abs_diff(analysis.high_count) <= 1
}

/// `sorted` trié par ordre croissant.
pub fn has_run(sorted: &[u8], length: usize) -> bool {
    let mut run = 1;
    for w in sorted.windows(2) {
        if w[1] == w[0] + 1 {
            run += 1;
            if run >= length {
                return true;
            }
        } else {
            run = 1;
        }
    }
    false
}

pub fn passes_decades(numbers: &[u8]) -> bool {
    let mut buckets: HashMap<u8, usize> = HashMap::new();
    for &n in numbers {
        *buckets.entry(n / 10).or_insert(0) += 1;
    }
    buckets.values().all(|&c| c <= MAX_PER_DECADE)
}

/// Trop de numéros "anniversaire" (<= 31) ou une suite de 3.
pub fn is_popular(sorted: &[u8], config: &GameConfig) -> bool {
    let birthday = sorted.iter().filter(|&&n| n <= BIRTHDAY_MAX).count();
    birthday >= config.popularity_threshold() || has_run(sorted, MAX_RUN)
}

/// Filtres combinatoires puis test de popularité, dans cet ordre.
pub fn check_filters(sorted: &[u8], config: &GameConfig) -> Result<(), Rejection> {
    if !passes_parity(sorted, config) {
        return Err(Rejection::Parity);
    }
    if !passes_balance(sorted, config) {
        return Err(Rejection::Balance);
    }
    if has_run(sorted, MAX_RUN) {
        return Err(Rejection::Run);
    }
    if !passes_decades(sorted) {
        return Err(Rejection::Decade);
    }
    if is_popular(sorted, config) {
        return Err(Rejection::Popular);
    }
    Ok(())
}
