use anyhow::{Context, Result};
use clap::Parser;
use rand::{distr::Alphanumeric, Rng};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use soundclone_server::config::{AppConfig, CliConfig, FileConfig};
use soundclone_server::content::{ContentManager, SqliteContentStore};
use soundclone_server::search::{SearchManager, SqliteSearchStore};
use soundclone_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig, ServerState};
use soundclone_server::user::{SqliteUserStore, TokenIssuer, UserManager};

const GENERATED_SECRET_LENGTH: usize = 64;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory holding user.db, content.db and search.db.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Path to a TOML config file. Its values override the CLI ones.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Secret used to sign tokens. A random one is generated when missing,
    /// which invalidates every token on restart.
    #[clap(long, env = "SOUNDCLONE_JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Grant admin rights to the user with this email and exit.
    #[clap(long)]
    pub promote_admin: Option<String>,
}

fn generate_secret() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_SECRET_LENGTH)
        .map(char::from)
        .collect()
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl-c: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = cli_args
        .config
        .as_deref()
        .map(FileConfig::load)
        .transpose()?;
    let cli_config = CliConfig {
        db_dir: cli_args.db_dir,
        port: cli_args.port,
        metrics_port: cli_args.metrics_port,
        logging_level: cli_args.logging_level,
        frontend_dir_path: cli_args.frontend_dir_path,
        jwt_secret: cli_args.jwt_secret,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    let jwt_secret = match config.auth.jwt_secret.clone() {
        Some(secret) => secret,
        None => {
            warn!("No JWT secret configured, generating a random one for this process");
            generate_secret()
        }
    };
    let tokens = TokenIssuer::new(
        jwt_secret.as_bytes(),
        chrono::Duration::minutes(config.auth.access_token_lifetime_minutes),
        chrono::Duration::hours(config.auth.refresh_token_lifetime_hours),
    );

    info!("Opening user database at {:?}...", config.user_db_path());
    let user_store = Arc::new(SqliteUserStore::new(config.user_db_path())?);
    let user_manager = Arc::new(UserManager::new(user_store.clone(), tokens));

    if let Some(email) = cli_args.promote_admin {
        let user_id = user_manager.promote_admin(&email)?;
        info!("User {} ({}) is now an admin", user_id, email);
        return Ok(());
    }

    info!("Opening content database at {:?}...", config.content_db_path());
    let content_store = Arc::new(SqliteContentStore::new(config.content_db_path())?);
    info!("Opening search database at {:?}...", config.search_db_path());
    let search_store = Arc::new(SqliteSearchStore::new(config.search_db_path())?);

    let content_manager = Arc::new(ContentManager::new(
        content_store.clone(),
        user_store.clone(),
    ));
    let search_manager = Arc::new(SearchManager::new(search_store, content_store));

    info!("Initializing metrics...");
    metrics::init_metrics();

    // Blacklist pruning and content gauges share one housekeeping loop.
    {
        let user_manager = user_manager.clone();
        let content_manager = content_manager.clone();
        let interval_minutes = config.auth.blacklist_prune_interval_minutes.max(1);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_minutes * 60));
            loop {
                ticker.tick().await;

                match user_manager.prune_token_blacklist() {
                    Ok(count) if count > 0 => info!("Pruned {} expired blacklisted tokens", count),
                    Ok(_) => {}
                    Err(e) => error!("Failed to prune token blacklist: {}", e),
                }

                match (user_manager.count_users(), content_manager.content_counts()) {
                    (Ok(users), Ok((songs, albums, playlists))) => {
                        metrics::set_content_items(users, songs, albums, playlists)
                    }
                    (Err(e), _) | (_, Err(e)) => error!("Failed to count content: {}", e),
                }
            }
        });
    }

    let server_config = ServerConfig {
        requests_logging_level: config.logging_level.clone(),
        port: config.port,
        metrics_port: config.metrics_port,
        frontend_dir_path: config.frontend_dir_path.clone(),
        cors_allowed_origins: config.cors_allowed_origins.clone(),
    };
    let state = ServerState::new(server_config, user_manager, content_manager, search_manager);

    info!("Ready to serve at port {}!", config.port);
    info!("Metrics available at port {}!", config.metrics_port);
    run_server(state, shutdown_signal()).await
}
