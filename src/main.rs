//! Binary entry point: resolve configuration, open the movie database, and
//! drive the Ratatui event loop until the user exits.
use anyhow::Context;
use movie_list_manager::{logging, run_app, App, Config, MovieCoordinator, MovieStore};

fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    logging::init(&config.log_path())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let (store, outcome) = MovieStore::open(&config.db_path)
        .with_context(|| format!("failed to open {}", config.db_path.display()))?;
    log::info!("movie store ready ({outcome:?})");

    let coordinator =
        MovieCoordinator::new(store, runtime.handle().clone(), config.idle_timeout);
    let mut app = App::new(coordinator, runtime.handle().clone(), config.theme);
    run_app(&mut app)
}
