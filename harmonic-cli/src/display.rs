use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use harmonic_db::history::ImportSummary;
use harmonic_db::models::Draw;
use harmonic_db::snapshot::{AnalysisSnapshot, GapStatistics};
use harmonic_engine::montecarlo::MonteCarloOutcome;
use harmonic_engine::service::{GenerationResponse, UpdateReport};

fn join_numbers(numbers: &[u8]) -> String {
    numbers
        .iter()
        .map(|n| format!("{:2}", n))
        .collect::<Vec<_>>()
        .join(" - ")
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn display_import_summary(summary: &ImportSummary) {
    println!("Import terminé :");
    println!("  Total lignes lues : {}", summary.total_records);
    println!("  Importés          : {}", summary.imported);
    println!("  Doublons ignorés  : {}", summary.skipped);
    if summary.errors > 0 {
        println!("  Erreurs           : {}", summary.errors);
    }
}

pub fn display_draws(draws: &[Draw]) {
    if draws.is_empty() {
        println!("Aucun tirage à afficher.");
        return;
    }

    let mut table = new_table(vec!["Date", "Numéros", "Écarts"]);
    for draw in draws {
        let gaps = draw
            .gaps()
            .iter()
            .map(|g| g.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        table.add_row(vec![
            draw.date().format("%Y-%m-%d").to_string(),
            join_numbers(draw.numbers()),
            gaps,
        ]);
    }
    println!("{table}");
}

fn stats_row(label: &str, stats: &GapStatistics) -> Vec<String> {
    if stats.is_empty() {
        return vec![label.to_string(), "0".into(), "—".into(), "—".into(), "—".into(), "—".into()];
    }
    vec![
        label.to_string(),
        stats.count.to_string(),
        format!("{:.3}", stats.mean),
        format!("{:.1}", stats.median),
        format!("{:.3}", stats.std_dev),
        format!("{}-{}", stats.min, stats.max),
    ]
}

pub fn display_snapshot(snapshot: &AnalysisSnapshot) {
    let source = &snapshot.data_source;
    let provenance = if source.synthetic { " (synthétique)" } else { "" };
    println!(
        "\n📊 Analyse des écarts : {}{} – {} tirages",
        source.game, provenance, source.draw_count
    );
    if let (Some(first), Some(last)) = (source.first_date, source.last_date) {
        println!("   du {} au {}", first, last);
    }
    println!("   générée le {}\n", snapshot.generated_at.format("%Y-%m-%d %H:%M:%S UTC"));

    let mut table = new_table(vec!["Période", "Écarts", "Moyenne", "Médiane", "Écart-type", "Min-Max"]);
    table.add_row(stats_row("Global", &snapshot.overall_stats));
    for (name, stats) in &snapshot.time_windows {
        table.add_row(stats_row(name, stats));
    }
    println!("{table}");

    let (low, high) = snapshot.analysis.harmonic_range;
    let (label, color) = if snapshot.analysis.is_harmonic {
        ("harmonique", Color::Green)
    } else {
        ("hors plage", Color::Red)
    };
    let mut verdict = Table::new();
    verdict.load_preset(UTF8_FULL).add_row(vec![
        Cell::new(format!("Écart moyen {:.3} (plage [{}, {}])", snapshot.analysis.mean_gap, low, high)),
        Cell::new(label).fg(color),
    ]);
    println!("{verdict}");

    println!("\n── Histogramme des écarts ──");
    let total: u64 = snapshot.histogram.values().sum();
    let mut table = new_table(vec!["Écart", "Occurrences", "Part"]);
    for (gap, count) in &snapshot.histogram {
        let share = if total > 0 { *count as f64 / total as f64 } else { 0.0 };
        table.add_row(vec![
            format!("{:2}", gap),
            count.to_string(),
            format!("{:.2} %", share * 100.0),
        ]);
    }
    println!("{table}");
}

pub fn display_update(report: &UpdateReport) {
    if let Some(import) = &report.import {
        display_import_summary(import);
    }
    if report.regenerated {
        println!("Historique synthétique régénéré.");
    }
    display_snapshot(&report.snapshot);
}

pub fn display_generation(response: &GenerationResponse) {
    println!(
        "\n🎲 {} grille(s) {} – stratégie {}\n",
        response.sets.len(),
        response.game,
        response.strategy
    );

    let has_secondary = response.sets.iter().any(|s| s.secondary.is_some());
    let mut header = vec!["#", "Numéros"];
    if has_secondary {
        header.push("Complémentaires");
    }
    header.extend(["Écarts", "Somme", "Pair/Impair", "Bas/Haut", "Confiance"]);
    let mut table = new_table(header);

    for (i, set) in response.sets.iter().enumerate() {
        let mut row = vec![Cell::new(i + 1), Cell::new(join_numbers(&set.numbers))];
        if has_secondary {
            row.push(Cell::new(set.secondary.as_deref().map(join_numbers).unwrap_or_default()));
        }
        let gaps = set.gaps.iter().map(|g| g.to_string()).collect::<Vec<_>>().join(" ");
        let color = if set.confidence >= 0.6 {
            Color::Green
        } else if set.confidence >= 0.4 {
            Color::Yellow
        } else {
            Color::Red
        };
        row.extend([
            Cell::new(gaps),
            Cell::new(set.analysis.sum),
            Cell::new(format!("{}/{}", set.analysis.even_count, set.analysis.odd_count)),
            Cell::new(format!("{}/{}", set.analysis.low_count, set.analysis.high_count)),
            Cell::new(format!("{:.3}", set.confidence)).fg(color),
        ]);
        table.add_row(row);
    }
    println!("{table}");

    let harmonic = &response.harmonic_analysis;
    println!(
        "Écart moyen historique : {:.3} ({})",
        harmonic.mean_gap,
        if harmonic.is_harmonic { "harmonique" } else { "hors plage" }
    );
}

pub fn display_simulation(outcome: &MonteCarloOutcome, iterations: usize) {
    println!("\n♟  Simulation Monte Carlo – {} essais\n", iterations);

    let mut table = new_table(vec!["Rang", "Numéro", "Score"]);
    for (rank, n) in outcome.best_numbers.iter().enumerate() {
        let score = outcome.scores.get(n).copied().unwrap_or(0);
        table.add_row(vec![
            (rank + 1).to_string(),
            format!("{:2}", n),
            score.to_string(),
        ]);
    }
    println!("{table}");
}
