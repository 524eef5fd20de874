use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};

use harmonic_db::error::DataError;
use harmonic_db::history::{HistoryStore, SyntheticHistory};
use harmonic_db::models::{Game, Strategy};
use harmonic_engine::cache::ManualClock;
use harmonic_engine::config::HarmonicConfig;
use harmonic_engine::error::{EngineError, EngineResult};
use harmonic_engine::filters::check_filters;
use harmonic_engine::montecarlo::{rank_with, MonteCarloConfig, MonteCarloOutcome, Scores};
use harmonic_engine::service::{GenerateRequest, HarmonicService};

fn config(dir: &Path) -> HarmonicConfig {
    HarmonicConfig {
        data_dir: dir.to_path_buf(),
        synthetic: SyntheticHistory {
            start: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
            end: Some(NaiveDate::from_ymd_opt(2019, 12, 31).unwrap()),
            ..SyntheticHistory::default()
        },
        // Plafond relevé pour chess, environ un candidat sur vingt passe
        max_attempts: 500,
        monte_carlo: MonteCarloConfig {
            iterations: 300,
            ..MonteCarloConfig::default()
        },
        seed: Some(2024),
        ..HarmonicConfig::default()
    }
}

/// Dix tirages de Lotto, tous partant de 1, écarts en cycle 3,5,7,6,4 / 9,2,8,5,7.
fn write_fixed_history(dir: &Path) {
    let mut csv = String::from("date,n1,n2,n3,n4,n5,n6\n");
    let start = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
    for i in 0..10u64 {
        let numbers = if i % 2 == 0 {
            "1,4,9,16,22,26"
        } else {
            "1,10,12,20,25,32"
        };
        let date = start + chrono::Days::new(3 * i);
        csv.push_str(&format!("{},{}\n", date.format("%Y-%m-%d"), numbers));
    }
    let store = HistoryStore::in_dir(dir, Game::Lotto);
    std::fs::write(store.path(), csv).unwrap();
}

fn start_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        DateTime::parse_from_rfc3339("2025-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc),
    ))
}

#[test]
fn test_fixed_history_statistics() {
    let dir = tempfile::tempdir().unwrap();
    write_fixed_history(dir.path());
    let service = HarmonicService::new(config(dir.path()));

    let snapshot = service.analyze().unwrap();
    let stats = snapshot.overall_stats;

    assert_eq!(stats.count, 50);
    assert!((stats.mean - 5.6).abs() < 1e-9);
    assert!((stats.median - 5.5).abs() < 1e-9);
    assert!((stats.std_dev - 4.44f64.sqrt()).abs() < 1e-9);
    assert_eq!((stats.min, stats.max), (2, 9));

    assert_eq!(snapshot.histogram.get(&5), Some(&10));
    assert_eq!(snapshot.histogram.get(&7), Some(&10));
    assert_eq!(snapshot.histogram.get(&2), Some(&5));
    assert_eq!(snapshot.histogram.values().sum::<u64>(), 50);

    assert_eq!(snapshot.analysis.total_draws, 10);
    assert!(!snapshot.analysis.is_harmonic);
    assert!(!snapshot.data_source.synthetic);
    assert_eq!(snapshot.time_windows.len(), 1);
    assert_eq!(snapshot.time_windows["2015-2019"].count, 50);
    assert!(service.snapshot_store().exists());
}

#[tokio::test]
async fn test_generate_balanced_lotto_batch() {
    let dir = tempfile::tempdir().unwrap();
    let service = HarmonicService::new(config(dir.path()));
    assert!(!service.snapshot_store().exists());

    let request = GenerateRequest::new(Game::Lotto, Strategy::Balanced, 5).unwrap();
    let response = service.generate(request).await.unwrap();

    // Analyse lancée à la demande
    assert!(service.snapshot_store().exists());
    assert_eq!(response.sets.len(), 5);
    assert_eq!(response.game, Game::Lotto);
    assert_eq!(response.strategy, Strategy::Balanced);

    let config = Game::Lotto.config();
    for set in &response.sets {
        assert_eq!(set.numbers.len(), 6);
        assert!(set.numbers.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(check_filters(&set.numbers, &config), Ok(()));
        assert!((0.0..=1.0).contains(&set.confidence));
        assert!(set.secondary.is_none());
    }
    assert!(response
        .sets
        .windows(2)
        .all(|w| w[0].confidence >= w[1].confidence));

    let stats = service.get_stats().unwrap();
    assert_eq!(response.harmonic_analysis.mean_gap, stats.analysis.mean_gap);
}

#[tokio::test]
async fn test_generate_lotto_batches_within_default_attempts() {
    let default_attempts = HarmonicConfig::default().max_attempts;
    for seed in [1, 7, 42, 2024] {
        let dir = tempfile::tempdir().unwrap();
        let service = HarmonicService::new(HarmonicConfig {
            max_attempts: default_attempts,
            seed: Some(seed),
            ..config(dir.path())
        });

        let request = GenerateRequest::new(Game::Lotto, Strategy::Balanced, 5).unwrap();
        let response = service
            .generate(request)
            .await
            .unwrap_or_else(|e| panic!("seed {}: {}", seed, e));

        assert_eq!(response.sets.len(), 5);
        let config = Game::Lotto.config();
        for set in &response.sets {
            assert_eq!(check_filters(&set.numbers, &config), Ok(()));
            assert!(set.attempts <= default_attempts);
        }
    }
}

#[tokio::test]
async fn test_generate_eurojackpot_secondary_group() {
    let dir = tempfile::tempdir().unwrap();
    let service = HarmonicService::new(config(dir.path()));

    let request = GenerateRequest::parse("eurojackpot", "cold", 1).unwrap();
    let response = service.generate(request).await.unwrap();

    let set = &response.sets[0];
    assert_eq!(set.numbers.len(), 5);
    assert!(set.numbers.iter().all(|&n| (1..=50).contains(&n)));
    let secondary = set.secondary.as_ref().unwrap();
    assert_eq!(secondary.len(), 2);
    assert_ne!(secondary[0], secondary[1]);
    assert!(secondary.iter().all(|&n| (1..=12).contains(&n)));
}

#[tokio::test]
async fn test_generate_chess_carries_scores() {
    let dir = tempfile::tempdir().unwrap();
    let service = HarmonicService::new(config(dir.path()));

    let request = GenerateRequest::new(Game::Lotto, Strategy::Chess, 2).unwrap();
    let response = service.generate(request).await.unwrap();

    for set in &response.sets {
        let scores = set.scores.as_ref().unwrap();
        assert!(scores.keys().all(|n| set.numbers.contains(n)));
    }
}

#[tokio::test]
async fn test_seeded_batches_are_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    let service = HarmonicService::new(config(dir.path()));
    let request = GenerateRequest::new(Game::MiniLotto, Strategy::Hot, 3).unwrap();

    let a = service.generate(request).await.unwrap();
    let b = service.generate(request).await.unwrap();
    assert_eq!(a.sets, b.sets);
}

#[tokio::test]
async fn test_generate_observed_reports_progress() {
    let dir = tempfile::tempdir().unwrap();
    let service = HarmonicService::new(config(dir.path()));
    let request = GenerateRequest::new(Game::Lotto, Strategy::Hot, 4).unwrap();

    let mut seen = Vec::new();
    service
        .generate_observed(request, |done| seen.push(done))
        .await
        .unwrap();
    assert_eq!(seen, vec![1, 2, 3, 4]);
}

#[test]
fn test_get_stats_without_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let service = HarmonicService::new(config(dir.path()));

    let err = service.get_stats().unwrap_err();
    assert!(err.is_stats_not_generated());
    assert!(matches!(err, EngineError::Data(DataError::StatsNotGenerated)));
}

#[tokio::test]
async fn test_worker_failure_keeps_original_numbers() {
    let numbers = [3, 14, 22, 27, 38, 45];
    let outcome = rank_with(&numbers, |_| -> EngineResult<Scores> { panic!("worker arrêté") }).await;
    assert_eq!(
        outcome,
        MonteCarloOutcome {
            scores: Scores::new(),
            best_numbers: numbers.to_vec(),
        }
    );
}

#[test]
fn test_get_stats_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write_fixed_history(dir.path());
    HarmonicService::new(config(dir.path())).analyze().unwrap();

    let service = HarmonicService::new(config(dir.path()));
    let path = service.snapshot_store().path().to_path_buf();
    let before = std::fs::read(&path).unwrap();

    let first = service.get_stats().unwrap();
    let second = service.get_stats().unwrap();
    assert_eq!(first, second);
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[test]
fn test_stats_cache_expires() {
    let dir = tempfile::tempdir().unwrap();
    write_fixed_history(dir.path());
    let clock = start_clock();
    let service = HarmonicService::with_clock(config(dir.path()), clock.clone());

    service.analyze().unwrap();
    std::fs::remove_file(service.snapshot_store().path()).unwrap();

    // Encore servi par le cache
    clock.advance(Duration::from_secs(299));
    assert!(service.get_stats().is_ok());

    clock.advance(Duration::from_secs(1));
    assert!(service.get_stats().unwrap_err().is_stats_not_generated());
}

#[test]
fn test_history_cache_expires() {
    let dir = tempfile::tempdir().unwrap();
    write_fixed_history(dir.path());
    let clock = start_clock();
    let service = HarmonicService::with_clock(config(dir.path()), clock.clone());

    assert_eq!(service.load_history().unwrap().draws.len(), 10);

    let store = HistoryStore::in_dir(dir.path(), Game::Lotto);
    let draws = store.load().unwrap();
    store.save(&draws[..4]).unwrap();

    assert_eq!(service.load_history().unwrap().draws.len(), 10);
    clock.advance(Duration::from_secs(300));
    assert_eq!(service.load_history().unwrap().draws.len(), 4);
}

#[test]
fn test_update_analysis_imports_configured_source() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("fdj.csv");
    std::fs::write(
        &source,
        "date;b1;b2;b3;b4;b5;b6\n\
         05.01.2024;40;3;17;9;22;31\n\
         08.01.2024;1;12;23;34;45;49\n",
    )
    .unwrap();

    let service = HarmonicService::new(config(dir.path()));
    let synthetic = service.analyze().unwrap();
    assert!(synthetic.data_source.synthetic);

    let service = HarmonicService::new(HarmonicConfig {
        import_source: Some(source),
        ..config(dir.path())
    });
    let report = service.update_analysis().unwrap();

    let import = report.import.unwrap();
    assert_eq!(import.imported, 2);
    assert!(!report.regenerated);
    assert!(!report.snapshot.data_source.synthetic);
    assert_eq!(report.snapshot.analysis.total_draws, 2);
    assert_eq!(service.get_stats().unwrap().analysis.total_draws, 2);
}

#[test]
fn test_update_analysis_regenerates_synthetic() {
    let dir = tempfile::tempdir().unwrap();
    let clock = start_clock();
    let service = HarmonicService::with_clock(config(dir.path()), clock.clone());

    let first = service.analyze().unwrap();
    clock.advance(Duration::from_secs(60));
    let report = service.update_analysis().unwrap();

    assert!(report.regenerated);
    assert!(report.import.is_none());
    assert!(report.snapshot.generated_at > first.generated_at);
    assert_eq!(report.snapshot.analysis.total_draws, first.analysis.total_draws);
}

#[test]
fn test_update_analysis_rereads_real_history() {
    let dir = tempfile::tempdir().unwrap();
    write_fixed_history(dir.path());
    let service = HarmonicService::new(config(dir.path()));

    let report = service.update_analysis().unwrap();
    assert!(!report.regenerated);
    assert_eq!(report.snapshot.analysis.total_draws, 10);
}
