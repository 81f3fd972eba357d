//! Persistence contract and in-memory implementation
//!
//! The relational engine is an external collaborator; the pipeline only
//! depends on this trait. Upserts report whether they created or found an
//! existing row, so duplicate inserts are an expected outcome rather than a
//! caught fault. Participation links are held as an explicit
//! `(match_id, xuid)` association, not an in-memory object graph.

use crate::error::UpsertOutcome;
use crate::models::{Profile, TrustState, Validity};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend failure: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPlayer {
    pub xuid: u64,
    pub gamertag: String,
    pub trust: TrustState,
    pub review_requested: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMatch {
    pub match_id: String,
    pub validity: Validity,
}

#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn get_player_by_xuid(&self, xuid: u64) -> Result<Option<StoredPlayer>, StoreError>;

    /// Insert or refresh a player row. On conflict the upstream gamertag
    /// overwrites the stored one and the existing trust state is kept.
    async fn upsert_player(
        &self,
        profile: &Profile,
    ) -> Result<(StoredPlayer, UpsertOutcome), StoreError>;

    async fn get_match_by_id(&self, match_id: &str) -> Result<Option<StoredMatch>, StoreError>;

    /// Insert a match row. `AlreadyExists` means the match was ingested in an
    /// earlier run; callers treat it as a no-op.
    async fn upsert_match(
        &self,
        match_id: &str,
        validity: Validity,
    ) -> Result<UpsertOutcome, StoreError>;

    async fn link_participants(&self, match_id: &str, xuids: &[u64]) -> Result<(), StoreError>;

    async fn update_player_trust(
        &self,
        xuid: u64,
        trust: TrustState,
        review_requested: bool,
    ) -> Result<(), StoreError>;

    /// Number of stored matches this player participated in.
    async fn count_matches_for_player(&self, xuid: u64) -> Result<usize, StoreError>;

    /// Players in the `Trusted` state; drives the periodic tracking sweep.
    async fn trusted_players(&self) -> Result<Vec<StoredPlayer>, StoreError>;
}

#[derive(Default)]
struct MemoryStoreInner {
    players: HashMap<u64, StoredPlayer>,
    matches: HashMap<String, StoredMatch>,
    links: HashSet<(String, u64)>,
}

/// HashMap-backed store used by tests and as the default wiring.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn match_count(&self) -> usize {
        self.inner.read().matches.len()
    }

    pub fn link_count(&self) -> usize {
        self.inner.read().links.len()
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn get_player_by_xuid(&self, xuid: u64) -> Result<Option<StoredPlayer>, StoreError> {
        Ok(self.inner.read().players.get(&xuid).cloned())
    }

    async fn upsert_player(
        &self,
        profile: &Profile,
    ) -> Result<(StoredPlayer, UpsertOutcome), StoreError> {
        let mut inner = self.inner.write();
        match inner.players.get_mut(&profile.xuid) {
            Some(existing) => {
                existing.gamertag = profile.gamertag.clone();
                Ok((existing.clone(), UpsertOutcome::AlreadyExists))
            }
            None => {
                let player = StoredPlayer {
                    xuid: profile.xuid,
                    gamertag: profile.gamertag.clone(),
                    trust: TrustState::Unverified,
                    review_requested: false,
                };
                inner.players.insert(profile.xuid, player.clone());
                Ok((player, UpsertOutcome::Created))
            }
        }
    }

    async fn get_match_by_id(&self, match_id: &str) -> Result<Option<StoredMatch>, StoreError> {
        Ok(self.inner.read().matches.get(match_id).cloned())
    }

    async fn upsert_match(
        &self,
        match_id: &str,
        validity: Validity,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut inner = self.inner.write();
        if inner.matches.contains_key(match_id) {
            return Ok(UpsertOutcome::AlreadyExists);
        }
        inner.matches.insert(
            match_id.to_string(),
            StoredMatch {
                match_id: match_id.to_string(),
                validity,
            },
        );
        Ok(UpsertOutcome::Created)
    }

    async fn link_participants(&self, match_id: &str, xuids: &[u64]) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        for &xuid in xuids {
            inner.links.insert((match_id.to_string(), xuid));
        }
        Ok(())
    }

    async fn update_player_trust(
        &self,
        xuid: u64,
        trust: TrustState,
        review_requested: bool,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if let Some(player) = inner.players.get_mut(&xuid) {
            player.trust = trust;
            player.review_requested = review_requested;
        }
        Ok(())
    }

    async fn count_matches_for_player(&self, xuid: u64) -> Result<usize, StoreError> {
        Ok(self
            .inner
            .read()
            .links
            .iter()
            .filter(|(_, linked)| *linked == xuid)
            .count())
    }

    async fn trusted_players(&self) -> Result<Vec<StoredPlayer>, StoreError> {
        Ok(self
            .inner
            .read()
            .players
            .values()
            .filter(|p| p.trust == TrustState::Trusted)
            .cloned()
            .collect())
    }
}
