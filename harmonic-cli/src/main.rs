mod display;
mod logging;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use harmonic_db::models::Game;
use harmonic_engine::config::HarmonicConfig;
use harmonic_engine::service::{GenerateRequest, HarmonicService};

use crate::display::{
    display_draws, display_generation, display_import_summary, display_simulation,
    display_snapshot, display_update,
};

#[derive(Parser)]
#[command(name = "harmonic", about = "Analyse des écarts entre numéros de loterie")]
struct Cli {
    /// Fichier de configuration
    #[arg(long, global = true, default_value = HarmonicConfig::DEFAULT_FILE)]
    config: PathBuf,

    /// Répertoire des données (remplace la configuration)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Seed pour la reproductibilité
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Logs détaillés
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Importer des tirages depuis un fichier CSV
    Import {
        /// Chemin vers le fichier CSV (`;`, `,` ou tabulation)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Recalculer l'analyse des écarts et l'enregistrer
    Analyze,

    /// Afficher la dernière analyse enregistrée
    Stats,

    /// Rafraîchir l'historique puis relancer l'analyse
    Update,

    /// Générer des grilles
    Generate {
        /// Jeu : lotto, miniLotto, multiMulti, eurojackpot
        #[arg(short, long, default_value = "lotto")]
        game: String,

        /// Stratégie : balanced, hot, cold, chess
        #[arg(short, long, default_value = "balanced")]
        strategy: String,

        /// Nombre de grilles (1 à 20)
        #[arg(short = 'n', long, default_value = "5")]
        sets: usize,

        /// Sortie JSON
        #[arg(long)]
        json: bool,
    },

    /// Scorer une grille par simulation Monte Carlo
    Simulate {
        /// Numéros séparés par des virgules
        #[arg(value_delimiter = ',', required = true)]
        numbers: Vec<u8>,

        /// Nombre d'essais
        #[arg(short, long)]
        iterations: Option<usize>,
    },

    /// Lister les derniers tirages de l'historique
    History {
        /// Jeu (par défaut : jeu de référence)
        #[arg(short, long)]
        game: Option<String>,

        /// Nombre de tirages à afficher
        #[arg(short, long, default_value = "10")]
        last: usize,
    },

    /// Afficher ou créer le fichier de configuration
    Config {
        /// Écrire la configuration par défaut
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = HarmonicConfig::load_or_default(&cli.config)
        .with_context(|| format!("lecture de {}", cli.config.display()))?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    logging::init(&config.log, cli.verbose)?;

    match cli.command {
        Command::Import { file } => cmd_import(config, &file),
        Command::Analyze => cmd_analyze(config),
        Command::Stats => cmd_stats(config),
        Command::Update => cmd_update(config),
        Command::Generate {
            game,
            strategy,
            sets,
            json,
        } => cmd_generate(config, &game, &strategy, sets, json).await,
        Command::Simulate {
            numbers,
            iterations,
        } => cmd_simulate(config, &numbers, iterations).await,
        Command::History { game, last } => cmd_history(config, game.as_deref(), last),
        Command::Config { init } => cmd_config(&config, &cli.config, init),
    }
}

fn cmd_import(config: HarmonicConfig, file: &Path) -> Result<()> {
    let service = HarmonicService::new(config);
    let summary = service
        .import(file)
        .with_context(|| format!("import de {}", file.display()))?;
    display_import_summary(&summary);
    if summary.imported > 0 {
        println!("Relancez l'analyse : harmonic analyze");
    }
    Ok(())
}

fn cmd_analyze(config: HarmonicConfig) -> Result<()> {
    let service = HarmonicService::new(config);
    let snapshot = service.analyze().context("analyse des écarts")?;
    display_snapshot(&snapshot);
    Ok(())
}

fn cmd_stats(config: HarmonicConfig) -> Result<()> {
    let service = HarmonicService::new(config);
    match service.get_stats() {
        Ok(snapshot) => {
            display_snapshot(&snapshot);
            Ok(())
        }
        Err(e) if e.is_stats_not_generated() => {
            println!("Aucune analyse enregistrée. Lancez d'abord : harmonic analyze");
            Ok(())
        }
        Err(e) => Err(e).context("lecture de l'analyse"),
    }
}

fn cmd_update(config: HarmonicConfig) -> Result<()> {
    let service = HarmonicService::new(config);
    let report = service.update_analysis().context("mise à jour de l'analyse")?;
    display_update(&report);
    Ok(())
}

async fn cmd_generate(
    config: HarmonicConfig,
    game: &str,
    strategy: &str,
    sets: usize,
    json: bool,
) -> Result<()> {
    let request = GenerateRequest::parse(game, strategy, sets)?;
    let service = HarmonicService::new(config);

    let pb = if json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(request.n_sets() as u64)
    };
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
            .context("style de la barre de progression")?
            .progress_chars("=> "),
    );

    let response = service
        .generate_observed(request, |done| pb.set_position(done as u64))
        .await
        .context("génération des grilles")?;
    pb.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        display_generation(&response);
    }
    Ok(())
}

async fn cmd_simulate(config: HarmonicConfig, numbers: &[u8], iterations: Option<usize>) -> Result<()> {
    let effective = iterations.unwrap_or(config.monte_carlo.iterations);
    let service = HarmonicService::new(config);
    let outcome = service
        .simulate(numbers, iterations)
        .await
        .context("simulation Monte Carlo")?;
    display_simulation(&outcome, effective);
    Ok(())
}

fn cmd_history(mut config: HarmonicConfig, game: Option<&str>, last: usize) -> Result<()> {
    if let Some(game) = game {
        config.reference_game = game.parse::<Game>()?;
    }
    let service = HarmonicService::new(config);
    let history = service.load_history().context("chargement de l'historique")?;

    if history.synthetic {
        println!("Historique synthétique ({}).", history.path.display());
    }
    let start = history.draws.len().saturating_sub(last);
    let mut recent = history.draws[start..].to_vec();
    recent.reverse();
    display_draws(&recent);
    Ok(())
}

fn cmd_config(config: &HarmonicConfig, path: &Path, init: bool) -> Result<()> {
    if init {
        if path.exists() {
            bail!("{} existe déjà", path.display());
        }
        HarmonicConfig::default()
            .save(path)
            .with_context(|| format!("écriture de {}", path.display()))?;
        println!("Configuration écrite dans {}", path.display());
        return Ok(());
    }
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
