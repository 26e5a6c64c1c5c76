// nbapr entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file)
// 2. Load config
// 3. Load the player pool (CSV file or stats.nba.com)
// 4. Clean stats and build the engine pool
// 5. Run the simulation on the blocking pool
// 6. Write results and print the top of the table

use std::path::Path;

use anyhow::Context;
use nbapr_app::config::{self, Config, PoolSource};
use nbapr_app::{fetch, output, stats};
use nbapr_core::ScoreTable;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, stdout carries the results table)
    init_tracing()?;
    info!("nbapr starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: {} leagues of {} teams x {} players, categories {:?}",
        config.simulation.n_iterations,
        config.simulation.n_teams,
        config.simulation.n_players,
        config.league.categories
    );

    // 3. Load the player pool
    let players = load_players(&config).await?;

    // 4. Clean and convert
    let players = stats::clean_stats(players, &config.pool.clean_options())
        .context("failed to clean player stats")?;
    let pool = stats::to_pool(&players).context("failed to build player pool")?;

    // 5. Simulate off the async runtime
    let sim_config = config.simulation.clone();
    let categories = config.league.categories.clone();
    let weight_column = config.league.weight_column.clone();
    let table = tokio::task::spawn_blocking(move || {
        nbapr_core::simulate(&pool, &sim_config, categories.as_slice(), &weight_column)
    })
    .await
    .context("simulation task panicked")?
    .context("simulation failed")?;

    // 6. Report
    let table = finish_table(table, &config);
    if let Some(path) = &config.output.path {
        output::save(&table, Path::new(path), config.output.format)
            .with_context(|| format!("failed to write results to {path}"))?;
    }
    print!("{}", output::render_table(&table, config.output.max_rows));

    info!("nbapr finished");
    Ok(())
}

async fn load_players(config: &Config) -> anyhow::Result<Vec<stats::PlayerStats>> {
    match config.pool.source {
        PoolSource::File => {
            // validate() guarantees a path for file sources
            let path = config
                .pool
                .path
                .as_deref()
                .context("pool.path is required when pool.source = \"file\"")?;
            stats::load_stats(Path::new(path)).context("failed to load player stats")
        }
        PoolSource::Web => {
            let season = config.pool.season.clone().unwrap_or_else(|| {
                fetch::current_season_code(chrono::Local::now().date_naive())
            });
            fetch::fetch_player_stats(
                &season,
                config.pool.per_mode,
                config.pool.last_n,
                config.pool.date_from,
            )
            .await
            .with_context(|| format!("failed to fetch player stats for {season}"))
        }
    }
}

fn finish_table(table: ScoreTable, config: &Config) -> ScoreTable {
    let table = if config.output.vorp {
        table.over_replacement(config.simulation.n_teams)
    } else {
        table
    };
    table.sorted_by_score()
}

/// Initialize tracing to log to a file, keeping stdout for the results table.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("nbapr.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("nbapr=info,nbapr_app=info,nbapr_core=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
