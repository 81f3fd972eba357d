//! Player trust state machine
//!
//! `Unverified -> PendingReview -> {Trusted, Rejected}`. Escalation to review
//! fires at most once per player: the review-requested flag is set in the
//! same step that emits the request, so the condition cannot re-fire while a
//! decision is pending. Terminal states are only reset by an administrative
//! override outside this core.

use crate::error::IngestError;
use crate::models::{Participant, TrustState};
use crate::store::MatchStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A player escalated for checking more than this many recorded matches.
const MATCH_COUNT_THRESHOLD: usize = 3;

/// Request for a human moderator to classify a player, consumed by the
/// moderation-notification collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRequest {
    pub xuid: u64,
    pub gamertag: String,
}

pub struct TrustWorkflow {
    store: Arc<dyn MatchStore>,
    review_tx: flume::Sender<ReviewRequest>,
}

impl TrustWorkflow {
    pub fn new(store: Arc<dyn MatchStore>, review_tx: flume::Sender<ReviewRequest>) -> Self {
        Self { store, review_tx }
    }

    /// Run the escalation rule over the co-participants of one match. An
    /// Unverified player who has not been asked yet moves to PendingReview
    /// when they have more than [`MATCH_COUNT_THRESHOLD`] recorded matches or
    /// more than half of the batch is already Trusted.
    pub async fn review_batch(&self, participants: &[Participant]) -> Result<(), IngestError> {
        let mut players = Vec::new();
        for participant in participants {
            let Some(xuid) = participant.xuid() else {
                continue;
            };
            if let Some(player) = self.store.get_player_by_xuid(xuid).await? {
                players.push(player);
            }
        }

        let batch_size = players.len();
        let trusted = players
            .iter()
            .filter(|p| p.trust == TrustState::Trusted)
            .count();

        for player in players {
            if player.trust != TrustState::Unverified || player.review_requested {
                continue;
            }

            let recorded = self.store.count_matches_for_player(player.xuid).await?;
            let majority_trusted = trusted * 2 > batch_size;
            if recorded <= MATCH_COUNT_THRESHOLD && !majority_trusted {
                continue;
            }

            self.store
                .update_player_trust(player.xuid, TrustState::PendingReview, true)
                .await?;
            info!(
                "escalating {} ({}) for review: {recorded} recorded matches, \
                 {trusted}/{batch_size} trusted co-participants",
                player.gamertag, player.xuid
            );

            let request = ReviewRequest {
                xuid: player.xuid,
                gamertag: player.gamertag,
            };
            if self.review_tx.send_async(request).await.is_err() {
                // The flag stays set; the moderation side picks the player up
                // once it reconnects and re-reads pending reviews.
                warn!("moderation channel closed, review request not delivered");
            }
        }

        Ok(())
    }

    /// Apply a moderator decision. Only players in PendingReview move;
    /// anything else is a stale or duplicate decision and is ignored.
    pub async fn resolve_review(&self, xuid: u64, accepted: bool) -> Result<(), IngestError> {
        let Some(player) = self.store.get_player_by_xuid(xuid).await? else {
            warn!("review decision for unknown player {xuid}");
            return Ok(());
        };
        if player.trust != TrustState::PendingReview {
            debug!(
                "ignoring review decision for {} in state {:?}",
                player.gamertag, player.trust
            );
            return Ok(());
        }

        let next = if accepted {
            TrustState::Trusted
        } else {
            TrustState::Rejected
        };
        self.store.update_player_trust(xuid, next, false).await?;
        info!("review resolved: {} -> {:?}", player.gamertag, next);
        Ok(())
    }
}
