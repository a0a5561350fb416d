use std::env;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use kickbot_common::traits::api::KickApi;
use kickbot_common::traits::auth_traits::TokenProvider;
use kickbot_common::traits::repository_traits::TrackedStreamRepository;
use kickbot_core::platforms::discord::DiscordPlatform;
use kickbot_core::platforms::kick::{KickApiClient, KickAuthenticator};
use kickbot_core::repositories::PostgresTrackedStreamRepository;
use kickbot_core::services::notifier::StreamNotifier;
use kickbot_core::services::TrackingService;
use kickbot_core::tasks::spawn_stream_update_task;
use kickbot_core::{Database, Error};

#[derive(Parser, Debug, Clone)]
#[command(name = "kickbot")]
#[command(author, version, about = "Kick live-stream notifications for Discord")]
struct Args {
    /// Postgres connection URL.
    #[arg(long, default_value = "postgres://kickbot@localhost:5432/kickbot")]
    db_url: String,

    /// Seconds between poll-and-reconcile passes.
    #[arg(long, default_value_t = 60)]
    poll_interval_secs: u64,
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive("kickbot=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub)
        .expect("Failed to set global subscriber");
}

fn required_env(name: &str) -> Result<String, Error> {
    env::var(name).map_err(|_| Error::Auth(format!("missing {name} environment variable")))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    info!(
        "Kickbot starting. poll_interval={}s",
        args.poll_interval_secs
    );

    if let Err(e) = run(args).await {
        error!("Server error: {:?}", e);
        return Err(e.into());
    }
    info!("Main finished. Goodbye!");
    Ok(())
}

async fn run(args: Args) -> Result<(), Error> {
    let discord_token = required_env("DISCORD_TOKEN")?;
    let kick_client_id = required_env("KICK_CLIENT_ID")?;
    let kick_client_secret = required_env("KICK_CLIENT_SECRET")?;

    // 1) Connect to Postgres and bring the schema up to date.
    info!("Using Postgres DB URL: {}", args.db_url);
    let db = Database::new(&args.db_url).await?;
    db.migrate().await?;

    // 2) Store, Kick credentials, and the tracking CRUD service.
    let repo: Arc<dyn TrackedStreamRepository> =
        Arc::new(PostgresTrackedStreamRepository::new(db.pool().clone()));
    let tokens: Arc<dyn TokenProvider> =
        Arc::new(KickAuthenticator::new(kick_client_id, kick_client_secret));
    let kick: Arc<dyn KickApi> = Arc::new(KickApiClient::new());
    let tracking = Arc::new(TrackingService::new(
        repo.clone(),
        tokens.clone(),
        kick.clone(),
    ));

    // 3) Bring up the Discord connection (gateway + slash commands).
    let mut discord = DiscordPlatform::new(discord_token, tracking);
    discord.connect().await?;
    let invite_url = discord.invite_url()?;
    let discord: Arc<DiscordPlatform> = Arc::new(discord);

    // 4) Start the poll-and-reconcile loop.
    let notifier = Arc::new(StreamNotifier::new(
        repo,
        tokens,
        kick,
        discord.clone(),
        invite_url,
    ));
    let update_handle = spawn_stream_update_task(
        notifier,
        Duration::from_secs(args.poll_interval_secs),
    );

    // 5) Run until Ctrl-C.
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| Error::Io(e))?;
    info!("Ctrl-C detected; shutting down...");

    update_handle.abort();

    Ok(())
}
