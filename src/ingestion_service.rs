//! End-to-end ingestion runs
//!
//! Coordinates fetch, classification, trust review, and idempotent
//! persistence. A unit-level failure (one match) is recorded in the summary
//! and never aborts the rest of the run; re-ingesting known matches counts
//! them as duplicates.

use crate::error::IngestError;
use crate::match_fetcher::MatchFetcher;
use crate::match_validity;
use crate::models::{IngestionSummary, MatchKind, ResolvedMatch};
use crate::store::MatchStore;
use crate::trust_workflow::TrustWorkflow;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct IngestionConfig {
    /// Matches played before this instant are never rank-eligible.
    pub cutoff: DateTime<Utc>,
    /// Cadence of the periodic tracking sweep.
    pub tracking_interval: Duration,
    /// Matches fetched per player during a sweep.
    pub tracking_count: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            cutoff: DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
                .expect("static timestamp")
                .with_timezone(&Utc),
            tracking_interval: Duration::from_secs(180),
            tracking_count: 25,
        }
    }
}

pub struct IngestionService {
    fetcher: MatchFetcher,
    trust: TrustWorkflow,
    store: Arc<dyn MatchStore>,
    config: IngestionConfig,
}

impl IngestionService {
    pub fn new(
        fetcher: MatchFetcher,
        trust: TrustWorkflow,
        store: Arc<dyn MatchStore>,
        config: IngestionConfig,
    ) -> Self {
        Self {
            fetcher,
            trust,
            store,
            config,
        }
    }

    /// Ingest up to `target_count` matches of `kind` from a player's history.
    /// Matches before `since` are still persisted, classified Invalid.
    pub async fn ingest(
        &self,
        xuid: u64,
        since: DateTime<Utc>,
        target_count: usize,
        kind: MatchKind,
    ) -> Result<IngestionSummary, IngestError> {
        let matches = self.fetcher.fetch_matches(xuid, target_count, kind).await?;

        let mut summary = IngestionSummary {
            fetched: matches.len(),
            ..Default::default()
        };

        for mut resolved in matches {
            resolved.validity = match_validity::classify(&resolved, since);
            if let Err(err) = self.persist_match(&resolved, &mut summary).await {
                warn!("match {} not ingested: {err}", resolved.match_id());
                summary
                    .failures
                    .push(format!("{}: {err}", resolved.match_id()));
            }
        }

        info!(
            "ingestion run for xuid {xuid}: fetched={} persisted={} duplicates={} failures={}",
            summary.fetched,
            summary.persisted,
            summary.duplicates,
            summary.failures.len()
        );
        Ok(summary)
    }

    async fn persist_match(
        &self,
        resolved: &ResolvedMatch,
        summary: &mut IngestionSummary,
    ) -> Result<(), IngestError> {
        self.trust.review_batch(&resolved.participants).await?;

        let outcome = self
            .store
            .upsert_match(resolved.match_id(), resolved.validity)
            .await?;
        if outcome.created() {
            let xuids: Vec<u64> = resolved
                .participants
                .iter()
                .filter_map(|p| p.xuid())
                .collect();
            self.store
                .link_participants(resolved.match_id(), &xuids)
                .await?;
            summary.persisted += 1;
        } else {
            summary.duplicates += 1;
        }
        Ok(())
    }

    /// Apply an external moderator decision.
    pub async fn resolve_review(&self, xuid: u64, accepted: bool) -> Result<(), IngestError> {
        self.trust.resolve_review(xuid, accepted).await
    }

    /// Periodic sweep over every trusted player's recent custom matches,
    /// until cancelled.
    pub async fn run_tracking(&self, cancellation_token: CancellationToken) {
        let mut ticker = interval(self.config.tracking_interval);

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    info!("match tracking cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.sweep().await {
                        error!("tracking sweep failed: {err}");
                    }
                }
            }
        }
    }

    async fn sweep(&self) -> Result<(), IngestError> {
        let players = self.store.trusted_players().await?;
        info!("tracking sweep over {} trusted players", players.len());

        for player in players {
            match self
                .ingest(
                    player.xuid,
                    self.config.cutoff,
                    self.config.tracking_count,
                    MatchKind::Custom,
                )
                .await
            {
                Ok(summary) if summary.persisted > 0 => {
                    info!(
                        "tracked {} new matches for {}",
                        summary.persisted, player.gamertag
                    );
                }
                Ok(_) => {}
                // One player's failure should not starve the rest of the sweep.
                Err(err) => error!("sweep failed for {}: {err}", player.gamertag),
            }
        }
        Ok(())
    }
}
