use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{DataError, DataResult};

/// Numéros "chauds" (poids 1.3 dans l'historique synthétique).
pub const HOT_NUMBERS: [u8; 9] = [5, 12, 17, 24, 28, 34, 39, 43, 47];
/// Numéros "froids" (poids 0.7 dans l'historique synthétique).
pub const COLD_NUMBERS: [u8; 9] = [2, 13, 20, 29, 33, 38, 41, 46, 50];

pub const HOT_WEIGHT: f64 = 1.3;
pub const COLD_WEIGHT: f64 = 0.7;

/// Borne haute des numéros "anniversaire" pour le test de popularité.
pub const BIRTHDAY_MAX: u8 = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Game {
    Lotto,
    MiniLotto,
    MultiMulti,
    Eurojackpot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecondaryGroup {
    pub count: usize,
    pub max_number: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameConfig {
    pub numbers_count: usize,
    pub max_number: u8,
    pub secondary: Option<SecondaryGroup>,
}

impl Game {
    pub const ALL: [Game; 4] = [Game::Lotto, Game::MiniLotto, Game::MultiMulti, Game::Eurojackpot];

    pub fn config(&self) -> GameConfig {
        match self {
            Game::Lotto => GameConfig {
                numbers_count: 6,
                max_number: 49,
                secondary: None,
            },
            Game::MiniLotto => GameConfig {
                numbers_count: 5,
                max_number: 42,
                secondary: None,
            },
            Game::MultiMulti => GameConfig {
                numbers_count: 10,
                max_number: 80,
                secondary: None,
            },
            Game::Eurojackpot => GameConfig {
                numbers_count: 5,
                max_number: 50,
                secondary: Some(SecondaryGroup {
                    count: 2,
                    max_number: 12,
                }),
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Game::Lotto => "lotto",
            Game::MiniLotto => "miniLotto",
            Game::MultiMulti => "multiMulti",
            Game::Eurojackpot => "eurojackpot",
        }
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Game {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "lotto" => Ok(Game::Lotto),
            "minilotto" => Ok(Game::MiniLotto),
            "multimulti" => Ok(Game::MultiMulti),
            "eurojackpot" => Ok(Game::Eurojackpot),
            _ => Err(DataError::InvalidDraw(format!("Jeu inconnu : '{}'", s))),
        }
    }
}

impl GameConfig {
    /// Bornes du nombre de pairs : [n/3, n - n/3], soit [2,4] pour 6 numéros.
    pub fn parity_bounds(&self) -> (usize, usize) {
        let low = self.numbers_count / 3;
        (low, self.numbers_count - low)
    }

    /// Seuil de numéros <= 31 au-delà duquel une grille est jugée populaire (4 pour 6 numéros).
    pub fn popularity_threshold(&self) -> usize {
        (2 * self.numbers_count + 2) / 3
    }

    /// Les numéros <= split sont "bas", les autres "hauts".
    pub fn low_high_split(&self) -> u8 {
        self.max_number / 2
    }

    pub fn hot_numbers(&self) -> Vec<u8> {
        HOT_NUMBERS.iter().copied().filter(|&n| n <= self.max_number).collect()
    }

    pub fn cold_numbers(&self) -> Vec<u8> {
        COLD_NUMBERS.iter().copied().filter(|&n| n <= self.max_number).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Balanced,
    Hot,
    Cold,
    Chess,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [Strategy::Balanced, Strategy::Hot, Strategy::Cold, Strategy::Chess];

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Balanced => "balanced",
            Strategy::Hot => "hot",
            Strategy::Cold => "cold",
            Strategy::Chess => "chess",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Strategy {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "balanced" => Ok(Strategy::Balanced),
            "hot" => Ok(Strategy::Hot),
            "cold" => Ok(Strategy::Cold),
            "chess" => Ok(Strategy::Chess),
            _ => Err(DataError::InvalidDraw(format!("Stratégie inconnue : '{}'", s))),
        }
    }
}

/// Un tirage historique. Les numéros sont uniques et triés.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draw {
    date: NaiveDate,
    numbers: Vec<u8>,
}

impl Draw {
    pub fn new(date: NaiveDate, mut numbers: Vec<u8>, config: &GameConfig) -> DataResult<Self> {
        validate_numbers(&numbers, config.numbers_count, config.max_number)?;
        numbers.sort_unstable();
        Ok(Self { date, numbers })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn numbers(&self) -> &[u8] {
        &self.numbers
    }

    /// Écarts successifs entre numéros triés (longueur = count - 1).
    pub fn gaps(&self) -> Vec<u32> {
        gaps_of(&self.numbers)
    }
}

/// `sorted` doit être trié par ordre croissant.
pub fn gaps_of(sorted: &[u8]) -> Vec<u32> {
    sorted
        .windows(2)
        .map(|w| u32::from(w[1].saturating_sub(w[0])))
        .collect()
}

pub fn validate_numbers(numbers: &[u8], count: usize, max: u8) -> DataResult<()> {
    if numbers.len() != count {
        return Err(DataError::InvalidDraw(format!(
            "{} numéros au lieu de {}",
            numbers.len(),
            count
        )));
    }
    for &n in numbers {
        if n < 1 || n > max {
            return Err(DataError::InvalidDraw(format!("Numéro {} hors limites (1-{})", n, max)));
        }
    }
    for i in 0..numbers.len() {
        for j in (i + 1)..numbers.len() {
            if numbers[i] == numbers[j] {
                return Err(DataError::InvalidDraw(format!("Numéro en double : {}", numbers[i])));
            }
        }
    }
    Ok(())
}

/// Historique de test : `n` tirages de Lotto espacés de 3 jours à partir du 2015-01-01.
pub fn make_test_draws(n: usize) -> Vec<Draw> {
    let config = Game::Lotto.config();
    let start = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or_default();
    (0..n)
        .filter_map(|i| {
            let base = (i % 7) as u8;
            let numbers = vec![
                base + 1,
                base + 9,
                base + 17,
                base + 26,
                base + 34,
                base + 42,
            ];
            let date = start + chrono::Days::new(3 * i as u64);
            Draw::new(date, numbers, &config).ok()
        })
        .collect()
}
