use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};

use harmonic_db::history::LoadedHistory;
use harmonic_db::models::{Draw, Game};
use harmonic_db::snapshot::{AnalysisSnapshot, AnalysisSummary, DataSource, GapStatistics, Histogram};

/// Bande [7, 8] d'écart moyen qualifiée d'"harmonique". Constante du domaine.
pub const HARMONIC_RANGE: (f64, f64) = (7.0, 8.0);

/// Périodes fixes de l'historique, bornes incluses.
pub const TIME_WINDOWS: [(i32, i32); 5] = [
    (2005, 2009),
    (2010, 2014),
    (2015, 2019),
    (2020, 2024),
    (2025, 2029),
];

pub fn all_gaps(draws: &[Draw]) -> Vec<u32> {
    draws.iter().flat_map(|d| d.gaps()).collect()
}

/// Statistiques sur la concaténation de tous les écarts (pas de moyenne par tirage).
pub fn compute_stats(draws: &[Draw]) -> GapStatistics {
    stats_from_gaps(&all_gaps(draws))
}

pub fn stats_from_gaps(gaps: &[u32]) -> GapStatistics {
    if gaps.is_empty() {
        return GapStatistics::empty();
    }

    let n = gaps.len() as f64;
    let mean = gaps.iter().map(|&g| g as f64).sum::<f64>() / n;
    let variance = gaps.iter().map(|&g| (g as f64 - mean).powi(2)).sum::<f64>() / n;

    let mut sorted = gaps.to_vec();
    sorted.sort_unstable();

    GapStatistics {
        mean,
        median: median(&sorted),
        std_dev: variance.sqrt(),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        count: sorted.len(),
    }
}

/// `sorted` non vide et trié.
fn median(sorted: &[u32]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0
    } else {
        sorted[mid] as f64
    }
}

pub fn compute_histogram(draws: &[Draw]) -> Histogram {
    let mut histogram = Histogram::new();
    for gap in draws.iter().flat_map(|d| d.gaps()) {
        *histogram.entry(gap).or_insert(0) += 1;
    }
    histogram
}

pub fn window_name(start: i32, end: i32) -> String {
    format!("{}-{}", start, end)
}

/// Les périodes sans tirage sont absentes du résultat.
pub fn compute_time_windows(draws: &[Draw]) -> BTreeMap<String, GapStatistics> {
    TIME_WINDOWS
        .iter()
        .filter_map(|&(start, end)| {
            let in_window: Vec<Draw> = draws
                .iter()
                .filter(|d| (start..=end).contains(&d.date().year()))
                .cloned()
                .collect();
            if in_window.is_empty() {
                None
            } else {
                Some((window_name(start, end), compute_stats(&in_window)))
            }
        })
        .collect()
}

pub fn is_harmonic(mean: f64) -> bool {
    mean >= HARMONIC_RANGE.0 && mean <= HARMONIC_RANGE.1
}

pub fn analyze(game: Game, history: &LoadedHistory, generated_at: DateTime<Utc>) -> AnalysisSnapshot {
    let draws = &history.draws;
    let overall_stats = compute_stats(draws);

    AnalysisSnapshot {
        analysis: AnalysisSummary {
            total_draws: draws.len(),
            total_gaps: overall_stats.count,
            mean_gap: overall_stats.mean,
            is_harmonic: is_harmonic(overall_stats.mean),
            harmonic_range: HARMONIC_RANGE,
        },
        overall_stats,
        histogram: compute_histogram(draws),
        time_windows: compute_time_windows(draws),
        data_source: DataSource {
            game,
            path: history.path.clone(),
            synthetic: history.synthetic,
            draw_count: draws.len(),
            first_date: draws.first().map(|d| d.date()),
            last_date: draws.last().map(|d| d.date()),
        },
        generated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use harmonic_db::models::{make_test_draws, Game};
    use proptest::prelude::*;

    fn draw(y: i32, numbers: &[u8]) -> Draw {
        Draw::new(
            NaiveDate::from_ymd_opt(y, 6, 1).unwrap(),
            numbers.to_vec(),
            &Game::Lotto.config(),
        )
        .unwrap()
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(stats_from_gaps(&[5, 1, 3]).median, 3.0);
        assert_eq!(stats_from_gaps(&[4, 1, 3, 2]).median, 2.5);
    }

    #[test]
    fn test_empty_gaps_are_no_gaps() {
        let stats = stats_from_gaps(&[]);
        assert!(stats.is_empty());
        assert_eq!(stats.mean, 0.0);
        assert_eq!(compute_stats(&[]), GapStatistics::empty());
    }

    #[test]
    fn test_single_gap() {
        let stats = stats_from_gaps(&[6]);
        assert_eq!(stats.mean, 6.0);
        assert_eq!(stats.median, 6.0);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!((stats.min, stats.max, stats.count), (6, 6, 1));
    }

    #[test]
    fn test_stats_are_pooled_not_averaged() {
        // Moyennes par tirage 1 et 9 ; la moyenne groupée reste 5
        let draws = vec![draw(2015, &[1, 2, 3, 4, 5, 6]), draw(2015, &[1, 10, 19, 28, 37, 46])];
        let stats = compute_stats(&draws);
        assert_eq!(stats.count, 10);
        assert!((stats.mean - 5.0).abs() < 1e-12);
        assert!((stats.std_dev - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_histogram_counts() {
        let draws = vec![draw(2015, &[1, 2, 3, 4, 5, 6]), draw(2016, &[1, 3, 5, 7, 9, 20])];
        let histogram = compute_histogram(&draws);
        assert_eq!(histogram, BTreeMap::from([(1, 5), (2, 4), (11, 1)]));
    }

    #[test]
    fn test_time_windows_partition_and_omit_empty() {
        let draws = vec![
            draw(2006, &[1, 2, 3, 4, 5, 6]),
            draw(2009, &[1, 3, 5, 7, 9, 11]),
            draw(2021, &[1, 11, 21, 31, 41, 49]),
        ];
        let windows = compute_time_windows(&draws);

        assert_eq!(windows.len(), 2);
        assert_eq!(windows["2005-2009"].count, 10);
        assert!((windows["2005-2009"].mean - 1.5).abs() < 1e-12);
        assert_eq!(windows["2020-2024"].count, 5);
        assert!(!windows.contains_key("2010-2014"));
    }

    #[test]
    fn test_harmonic_range_inclusive() {
        assert!(is_harmonic(7.0));
        assert!(is_harmonic(7.5));
        assert!(is_harmonic(8.0));
        assert!(!is_harmonic(6.99));
        assert!(!is_harmonic(8.01));
    }

    #[test]
    fn test_analyze_summary() {
        let history = LoadedHistory {
            draws: make_test_draws(12),
            synthetic: false,
            path: "lotto_history.csv".into(),
        };
        let generated_at = Utc::now();
        let snapshot = analyze(Game::Lotto, &history, generated_at);

        assert_eq!(snapshot.analysis.total_draws, 12);
        assert_eq!(snapshot.analysis.total_gaps, 60);
        assert_eq!(snapshot.histogram.values().sum::<u64>(), 60);
        assert_eq!(snapshot.data_source.draw_count, 12);
        assert_eq!(snapshot.data_source.first_date, history.draws.first().map(|d| d.date()));
        assert_eq!(snapshot.generated_at, generated_at);
        assert_eq!(snapshot.analysis.is_harmonic, is_harmonic(snapshot.overall_stats.mean));
    }

    fn arb_draw() -> impl Strategy<Value = Draw> {
        proptest::sample::subsequence((1u8..=49).collect::<Vec<_>>(), 6).prop_map(|numbers| {
            Draw::new(NaiveDate::from_ymd_opt(2018, 3, 3).unwrap(), numbers, &Game::Lotto.config()).unwrap()
        })
    }

    proptest! {
        #[test]
        fn proptest_gaps_length_and_sum(draw in arb_draw()) {
            let gaps = draw.gaps();
            let numbers = draw.numbers();
            prop_assert_eq!(gaps.len(), numbers.len() - 1);
            prop_assert_eq!(gaps.iter().sum::<u32>(), u32::from(numbers[5] - numbers[0]));
        }

        #[test]
        fn proptest_histogram_total(draws in proptest::collection::vec(arb_draw(), 0..40)) {
            let histogram = compute_histogram(&draws);
            prop_assert_eq!(histogram.values().sum::<u64>() as usize, all_gaps(&draws).len());
            prop_assert!(histogram.keys().all(|&k| k >= 1));
        }
    }
}
