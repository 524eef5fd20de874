use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use rand::distr::weighted::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{DataError, DataResult};
use crate::models::{COLD_NUMBERS, COLD_WEIGHT, Draw, Game, GameConfig, HOT_NUMBERS, HOT_WEIGHT};
use crate::storage::write_atomic;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y"];

/// Paramètres de l'historique synthétique utilisé quand aucun fichier n'existe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticHistory {
    pub enabled: bool,
    pub start: NaiveDate,
    /// `None` = date du jour.
    pub end: Option<NaiveDate>,
    pub seed: u64,
}

impl Default for SyntheticHistory {
    fn default() -> Self {
        Self {
            enabled: true,
            start: NaiveDate::from_ymd_opt(2005, 1, 1).unwrap_or_default(),
            end: None,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedHistory {
    pub draws: Vec<Draw>,
    pub synthetic: bool,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseSummary {
    pub total_records: u32,
    pub accepted: u32,
    pub errors: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportSummary {
    pub total_records: u32,
    pub imported: u32,
    pub skipped: u32,
    pub errors: u32,
}

/// Historique d'un jeu, stocké en CSV : `date,n1,...,nN`, une ligne par tirage.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    game: Game,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>, game: Game) -> Self {
        Self {
            path: path.into(),
            game,
        }
    }

    pub fn in_dir(dir: &Path, game: Game) -> Self {
        Self::new(dir.join(format!("{}_history.csv", game.name())), game)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn game(&self) -> Game {
        self.game
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Vrai si le fichier courant a été fabriqué par `regenerate_synthetic`.
    pub fn is_synthetic(&self) -> bool {
        self.marker_path().exists()
    }

    fn marker_path(&self) -> PathBuf {
        self.path.with_extension("synthetic")
    }

    /// Tirages triés par date croissante. Les lignes invalides sont ignorées.
    pub fn load(&self) -> DataResult<Vec<Draw>> {
        if !self.exists() {
            return Err(DataError::DataUnavailable(format!(
                "{:?} introuvable",
                self.path
            )));
        }
        let (draws, summary) = parse_history(&self.path, self.game)?;
        if summary.errors > 0 {
            warn!(
                path = %self.path.display(),
                errors = summary.errors,
                accepted = summary.accepted,
                "lignes d'historique ignorées"
            );
        }
        Ok(draws)
    }

    pub fn load_or_synthesize(
        &self,
        synthetic: &SyntheticHistory,
        today: NaiveDate,
    ) -> DataResult<LoadedHistory> {
        if self.exists() {
            let draws = self.load()?;
            return Ok(LoadedHistory {
                draws,
                synthetic: self.is_synthetic(),
                path: self.path.clone(),
            });
        }
        if !synthetic.enabled {
            return Err(DataError::DataUnavailable(format!(
                "{:?} introuvable et synthèse désactivée",
                self.path
            )));
        }
        let draws = self.regenerate_synthetic(synthetic, today)?;
        Ok(LoadedHistory {
            draws,
            synthetic: true,
            path: self.path.clone(),
        })
    }

    /// Fabrique puis persiste un historique synthétique ; les chargements suivants le relisent tel quel.
    pub fn regenerate_synthetic(
        &self,
        synthetic: &SyntheticHistory,
        today: NaiveDate,
    ) -> DataResult<Vec<Draw>> {
        let end = synthetic.end.unwrap_or(today);
        let draws = generate_synthetic_history(self.game, synthetic.start, end, synthetic.seed)?;
        self.save(&draws)?;
        write_atomic(&self.marker_path(), b"")?;
        info!(
            game = %self.game,
            draws = draws.len(),
            path = %self.path.display(),
            "historique synthétique généré"
        );
        Ok(draws)
    }

    pub fn save(&self, draws: &[Draw]) -> DataResult<()> {
        let count = self.game.config().numbers_count;
        let mut writer = csv::Writer::from_writer(Vec::new());

        let mut header = vec!["date".to_string()];
        header.extend((1..=count).map(|i| format!("n{}", i)));
        writer.write_record(&header)?;

        for draw in draws {
            let mut record = vec![draw.date().format("%Y-%m-%d").to_string()];
            record.extend(draw.numbers().iter().map(|n| n.to_string()));
            writer.write_record(&record)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| DataError::Csv(csv::Error::from(e.into_error())))?;
        write_atomic(&self.path, &bytes)
    }

    /// Importe un fichier externe (`;`, `,` ou tabulation). Un tirage déjà connu (même date,
    /// mêmes numéros) est ignoré ; plusieurs tirages le même jour sont conservés.
    /// Un historique synthétique existant est remplacé.
    pub fn import_csv(&self, source: &Path) -> DataResult<ImportSummary> {
        let (incoming, parsed) = parse_history(source, self.game)?;

        let mut by_date: BTreeMap<NaiveDate, Vec<Draw>> = BTreeMap::new();
        if self.exists() && !self.is_synthetic() {
            for draw in self.load()? {
                by_date.entry(draw.date()).or_default().push(draw);
            }
        }

        let mut summary = ImportSummary {
            total_records: parsed.total_records,
            imported: 0,
            skipped: 0,
            errors: parsed.errors,
        };

        for draw in incoming {
            let same_day = by_date.entry(draw.date()).or_default();
            if same_day.iter().any(|d| d.numbers() == draw.numbers()) {
                summary.skipped += 1;
            } else {
                same_day.push(draw);
                summary.imported += 1;
            }
        }

        if summary.imported == 0 {
            return Ok(summary);
        }

        let draws: Vec<Draw> = by_date.into_values().flatten().collect();
        self.save(&draws)?;

        let marker = self.marker_path();
        if marker.exists() {
            std::fs::remove_file(&marker).map_err(|e| DataError::io(&marker, e))?;
        }

        info!(
            game = %self.game,
            imported = summary.imported,
            skipped = summary.skipped,
            errors = summary.errors,
            "import terminé"
        );
        Ok(summary)
    }
}

pub fn parse_history(path: &Path, game: Game) -> DataResult<(Vec<Draw>, ParseSummary)> {
    let delimiter = sniff_delimiter(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_path(path)?;

    let config = game.config();
    let mut draws = Vec::new();
    let mut summary = ParseSummary::default();

    for (line, record_result) in reader.records().enumerate() {
        let record = match record_result {
            Ok(record) => record,
            Err(e) => {
                summary.total_records += 1;
                summary.errors += 1;
                debug!(line = line + 1, error = %e, "ligne illisible");
                continue;
            }
        };

        let raw_date = record.get(0).map(str::trim).unwrap_or_default();
        // En-tête éventuel
        if line == 0 && parse_date(raw_date).is_err() {
            continue;
        }

        summary.total_records += 1;
        match parse_record(&record, &config) {
            Ok(draw) => {
                summary.accepted += 1;
                draws.push(draw);
            }
            Err(e) => {
                summary.errors += 1;
                debug!(line = line + 1, error = %e, "ligne ignorée");
            }
        }
    }

    draws.sort_by_key(|d| d.date());
    Ok((draws, summary))
}

/// Première colonne = date, colonnes suivantes = numéros. Les valeurs hors limites ou répétées
/// sont filtrées, puis seuls les `numbers_count` premiers numéros valides sont retenus.
fn parse_record(record: &csv::StringRecord, config: &GameConfig) -> DataResult<Draw> {
    let raw_date = record.get(0).map(str::trim).unwrap_or_default();
    let date = parse_date(raw_date)?;

    let mut numbers = Vec::with_capacity(config.numbers_count);
    for field in record.iter().skip(1) {
        if numbers.len() == config.numbers_count {
            break;
        }
        let Ok(value) = field.trim().parse::<u32>() else {
            continue;
        };
        if value < 1 || value > u32::from(config.max_number) {
            continue;
        }
        let value = value as u8;
        if !numbers.contains(&value) {
            numbers.push(value);
        }
    }

    Draw::new(date, numbers, config)
}

pub fn parse_date(raw: &str) -> DataResult<NaiveDate> {
    let token = raw.split_whitespace().next().unwrap_or_default();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(token, fmt).ok())
        .ok_or_else(|| DataError::InvalidDraw(format!("Format de date invalide : '{}'", raw)))
}

fn sniff_delimiter(path: &Path) -> DataResult<u8> {
    let file = File::open(path).map_err(|e| DataError::io(path, e))?;
    let mut first_line = String::new();
    BufReader::new(file)
        .read_line(&mut first_line)
        .map_err(|e| DataError::io(path, e))?;

    Ok(if first_line.contains(';') {
        b';'
    } else if first_line.contains('\t') {
        b'\t'
    } else {
        b','
    })
}

fn number_weight(n: u8) -> f64 {
    if HOT_NUMBERS.contains(&n) {
        HOT_WEIGHT
    } else if COLD_NUMBERS.contains(&n) {
        COLD_WEIGHT
    } else {
        1.0
    }
}

/// Un tirage tous les 2 ou 3 jours entre `start` et `end` inclus, numéros tirés sans remise
/// selon les poids chaud/froid. Même seed, même série.
pub fn generate_synthetic_history(
    game: Game,
    start: NaiveDate,
    end: NaiveDate,
    seed: u64,
) -> DataResult<Vec<Draw>> {
    let config = game.config();
    let mut rng = StdRng::seed_from_u64(seed);
    let weighted: Vec<(u8, f64)> = (1..=config.max_number)
        .map(|n| (n, number_weight(n)))
        .collect();

    let mut draws = Vec::new();
    let mut date = start;
    while date <= end {
        let numbers = sample_without_replacement(&weighted, config.numbers_count, &mut rng)?;
        draws.push(Draw::new(date, numbers, &config)?);

        let step = rng.random_range(2..=3u64);
        match date.checked_add_days(Days::new(step)) {
            Some(next) => date = next,
            None => break,
        }
    }

    Ok(draws)
}

fn sample_without_replacement(
    weighted: &[(u8, f64)],
    count: usize,
    rng: &mut StdRng,
) -> DataResult<Vec<u8>> {
    let mut available = weighted.to_vec();
    let mut selected = Vec::with_capacity(count);

    for _ in 0..count {
        let weights: Vec<f64> = available.iter().map(|(_, w)| *w).collect();
        let dist = WeightedIndex::new(&weights)
            .map_err(|e| DataError::DataUnavailable(format!("Poids invalides : {}", e)))?;
        let idx = dist.sample(rng);

        let (number, _) = available.remove(idx);
        selected.push(number);
    }

    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2024-03-09").unwrap(), date(2024, 3, 9));
        assert_eq!(parse_date("09.03.2024").unwrap(), date(2024, 3, 9));
        assert_eq!(parse_date("09/03/2024").unwrap(), date(2024, 3, 9));
        assert_eq!(parse_date("2024-03-09 21:40").unwrap(), date(2024, 3, 9));
        assert!(parse_date("mars 2024").is_err());
    }

    #[test]
    fn test_parse_history_row_rules() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "h.csv",
            "date,n1,n2,n3,n4,n5,n6\n\
             2024-01-05,40,3,17,9,22,31\n\
             2024-01-02,1,2,3\n\
             2024-01-03,5,60,11,11,19,24,33,41,48\n\
             pas-une-date,1,2,3,4,5,6\n",
        );

        let (draws, summary) = parse_history(&path, Game::Lotto).unwrap();

        assert_eq!(summary.total_records, 4);
        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.errors, 2);
        // Triés par date
        assert_eq!(draws[0].date(), date(2024, 1, 3));
        // 60 hors limites et le second 11 filtrés, puis tronqué aux 6 premiers valides
        assert_eq!(draws[0].numbers(), &[5, 11, 19, 24, 33, 41]);
        assert_eq!(draws[1].numbers(), &[3, 9, 17, 22, 31, 40]);
    }

    #[test]
    fn test_parse_history_semicolon_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "h.csv", "05.01.2024;1;12;23;34;45;49\n");
        let (draws, summary) = parse_history(&path, Game::Lotto).unwrap();
        assert_eq!(summary.accepted, 1);
        assert_eq!(draws[0].numbers(), &[1, 12, 23, 34, 45, 49]);
    }

    #[test]
    fn test_load_missing_is_data_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::in_dir(dir.path(), Game::Lotto);
        assert!(matches!(store.load(), Err(DataError::DataUnavailable(_))));
    }

    #[test]
    fn test_synthesis_disabled_is_data_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::in_dir(dir.path(), Game::Lotto);
        let synthetic = SyntheticHistory {
            enabled: false,
            ..SyntheticHistory::default()
        };
        let result = store.load_or_synthesize(&synthetic, date(2024, 1, 1));
        assert!(matches!(result, Err(DataError::DataUnavailable(_))));
    }

    #[test]
    fn test_synthetic_history_cadence_and_validity() {
        let draws = generate_synthetic_history(Game::Lotto, date(2020, 1, 1), date(2020, 12, 31), 7).unwrap();
        assert!(draws.len() > 100);
        for pair in draws.windows(2) {
            let days = (pair[1].date() - pair[0].date()).num_days();
            assert!((2..=3).contains(&days), "écart de {} jours", days);
        }
        for draw in &draws {
            assert_eq!(draw.numbers().len(), 6);
            assert!(draw.numbers().windows(2).all(|w| w[0] < w[1]));
            assert!(draw.numbers().iter().all(|&n| (1..=49).contains(&n)));
        }
    }

    #[test]
    fn test_synthetic_history_deterministic() {
        let a = generate_synthetic_history(Game::Eurojackpot, date(2019, 1, 1), date(2019, 6, 1), 11).unwrap();
        let b = generate_synthetic_history(Game::Eurojackpot, date(2019, 1, 1), date(2019, 6, 1), 11).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_load_or_synthesize_persists_stable_series() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::in_dir(dir.path(), Game::Lotto);
        let synthetic = SyntheticHistory {
            start: date(2023, 1, 1),
            end: Some(date(2023, 6, 30)),
            ..SyntheticHistory::default()
        };

        let first = store.load_or_synthesize(&synthetic, date(2030, 1, 1)).unwrap();
        assert!(first.synthetic);
        assert!(store.exists());

        // Seed différent : le fichier existant doit primer
        let other = SyntheticHistory { seed: 99, ..synthetic };
        let second = store.load_or_synthesize(&other, date(2030, 1, 1)).unwrap();
        assert!(second.synthetic);
        assert_eq!(first.draws, second.draws);
    }

    #[test]
    fn test_import_merges_and_replaces_synthetic() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::in_dir(dir.path(), Game::Lotto);
        store
            .regenerate_synthetic(
                &SyntheticHistory {
                    end: Some(date(2005, 2, 1)),
                    ..SyntheticHistory::default()
                },
                date(2030, 1, 1),
            )
            .unwrap();
        assert!(store.is_synthetic());

        let source = write(
            dir.path(),
            "fdj.csv",
            "id;date;b1;b2;b3;b4;b5;b6\n\
             x;2024-01-05;40;3;17;9;22;31\n",
        );
        // Colonne id en tête : la date n'est pas en première position, ligne rejetée
        let summary = store.import_csv(&source).unwrap();
        assert_eq!(summary.imported, 0);
        assert_eq!(summary.errors, 1);
        assert!(store.is_synthetic());

        let source = write(
            dir.path(),
            "ok.csv",
            "2024-01-05;40;3;17;9;22;31\n2024-01-08;1;12;23;34;45;49\n2024-01-05;40;3;17;9;22;31\n",
        );
        let summary = store.import_csv(&source).unwrap();
        assert_eq!(summary.total_records, 3);
        assert_eq!(summary.imported, 2);
        assert_eq!(summary.skipped, 1);
        assert!(!store.is_synthetic());

        let draws = store.load().unwrap();
        assert_eq!(draws.len(), 2);

        // Second import : tout est déjà connu
        let summary = store.import_csv(&source).unwrap();
        assert_eq!(summary.imported, 0);
        assert_eq!(summary.skipped, 3);
        assert_eq!(store.load().unwrap().len(), 2);
    }

    #[test]
    fn test_import_keeps_several_draws_per_day() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::in_dir(dir.path(), Game::MultiMulti);
        let source = write(
            dir.path(),
            "multi.csv",
            "2024-03-01;1;5;9;14;18;22;27;31;36;40
             2024-03-01;2;7;11;15;19;24;28;33;37;41
             2024-03-01;1;5;9;14;18;22;27;31;36;40
",
        );

        let summary = store.import_csv(&source).unwrap();
        assert_eq!(summary.imported, 2);
        assert_eq!(summary.skipped, 1);

        let draws = store.load().unwrap();
        assert_eq!(draws.len(), 2);
        assert!(draws.iter().all(|d| d.date() == date(2024, 3, 1)));
        assert_ne!(draws[0].numbers(), draws[1].numbers());
    }
}
