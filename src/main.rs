use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use match_aggregator::{
    ApiRateLimiter, ApiSession, IngestionConfig, IngestionService, MatchFetcher, MatchKind,
    MemoryStore, ProfileResolver, StatsApi, StatsClient, StatsClientConfig, TrustWorkflow,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "match-aggregator")]
#[command(about = "Ingests and validates competitive match history")]
struct Cli {
    /// Outbound requests per second shared by all API calls
    #[arg(long, default_value_t = 5)]
    requests_per_second: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// One-shot ingestion of a player's match history
    Ingest {
        /// Gamertag of the player whose history to ingest
        gamertag: String,
        /// Maximum number of matches to ingest
        #[arg(long, default_value_t = 25)]
        count: usize,
        /// Rank-eligibility cutoff date (RFC 3339)
        #[arg(long, default_value = "2024-01-01T00:00:00Z")]
        since: DateTime<Utc>,
        #[arg(long, value_enum, default_value = "custom")]
        kind: KindArg,
    },
    /// Periodically sweep all trusted players' recent custom matches
    Track {
        /// Seconds between sweeps
        #[arg(long, default_value_t = 180)]
        interval_secs: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    All,
    Custom,
    Matchmaking,
    Ranked,
}

impl From<KindArg> for MatchKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::All => MatchKind::All,
            KindArg::Custom => MatchKind::Custom,
            KindArg::Matchmaking => MatchKind::Matchmaking,
            KindArg::Ranked => MatchKind::Ranked,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("match_aggregator=info")),
        )
        .init();

    let cli = Cli::parse();

    // Token acquisition belongs to the identity collaborator; we only read
    // the issued pair from the environment.
    let spartan_token =
        std::env::var("SPARTAN_TOKEN").context("SPARTAN_TOKEN environment variable not set")?;
    let clearance_token =
        std::env::var("CLEARANCE_TOKEN").context("CLEARANCE_TOKEN environment variable not set")?;
    let session = Arc::new(RwLock::new(ApiSession::new(spartan_token, clearance_token)));

    let rate_limiter = Arc::new(ApiRateLimiter::new(cli.requests_per_second));
    let client: Arc<dyn StatsApi> = Arc::new(StatsClient::new(
        StatsClientConfig::default(),
        rate_limiter,
        session,
    ));
    let store = Arc::new(MemoryStore::new());

    let resolver = Arc::new(ProfileResolver::new(client.clone(), store.clone()));
    let fetcher = MatchFetcher::new(client.clone(), resolver);

    let (review_tx, review_rx) = flume::unbounded();
    let trust = TrustWorkflow::new(store.clone(), review_tx);

    // Stand-in for the moderation-notification collaborator: log each
    // escalation as it comes in.
    tokio::spawn(async move {
        while let Ok(request) = review_rx.recv_async().await {
            info!(
                "review requested for {} ({})",
                request.gamertag, request.xuid
            );
        }
    });

    match cli.command {
        Command::Ingest {
            gamertag,
            count,
            since,
            kind,
        } => {
            let service = IngestionService::new(fetcher, trust, store, IngestionConfig::default());

            let profile = client
                .get_profile_by_tag(&gamertag)
                .await?
                .with_context(|| format!("no player found for gamertag {gamertag}"))?;
            info!("resolved {gamertag} to xuid {}", profile.xuid);

            let summary = service
                .ingest(profile.xuid, since, count, kind.into())
                .await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Track { interval_secs } => {
            let config = IngestionConfig {
                tracking_interval: Duration::from_secs(interval_secs),
                ..Default::default()
            };
            let service = IngestionService::new(fetcher, trust, store, config);

            let cancellation_token = CancellationToken::new();
            let cancel = cancellation_token.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("shutdown signal received");
                    cancel.cancel();
                }
            });

            service.run_tracking(cancellation_token).await;
        }
    }

    Ok(())
}
