//! Cache-aside player identity resolution
//!
//! The profile store is consulted first; only ids it does not know go to the
//! remote identity service, in batches, and the results are written back so
//! the next run hits the cache. Bot participants resolve from the static name
//! table and never touch the network or the store.
//!
//! Staleness policy: a store hit wins for the rest of the run (no refresh call
//! is made for it), but whenever a fresh upstream profile is in hand its
//! gamertag overwrites the stored one via the upsert.

use crate::error::IngestError;
use crate::models::{bot_display_name, is_bot_id, unwrap_xuid, Participant, Profile};
use crate::stats_client::{StatsApi, PROFILE_BATCH_SIZE};
use crate::store::MatchStore;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct ProfileResolver {
    api: Arc<dyn StatsApi>,
    store: Arc<dyn MatchStore>,
}

impl ProfileResolver {
    pub fn new(api: Arc<dyn StatsApi>, store: Arc<dyn MatchStore>) -> Self {
        Self { api, store }
    }

    /// Resolve every participant id of one match. Output order is not
    /// significant. Ids the identity service does not recognize are dropped
    /// with a warning.
    pub async fn resolve(&self, player_ids: &[String]) -> Result<Vec<Participant>, IngestError> {
        let mut participants = Vec::with_capacity(player_ids.len());
        let mut missing = Vec::new();

        for id in player_ids {
            if is_bot_id(id) {
                participants.push(Participant::Bot {
                    id: id.clone(),
                    name: bot_display_name(id),
                });
                continue;
            }
            let Some(xuid) = unwrap_xuid(id) else {
                warn!("skipping malformed participant id {id}");
                continue;
            };
            match self.store.get_player_by_xuid(xuid).await? {
                Some(cached) => {
                    participants.push(Participant::CachedHuman(Profile {
                        xuid: cached.xuid,
                        gamertag: cached.gamertag,
                    }));
                }
                None => missing.push(xuid),
            }
        }

        if missing.is_empty() {
            return Ok(participants);
        }
        debug!(
            "{} of {} participants missed the profile cache",
            missing.len(),
            player_ids.len()
        );

        for chunk in missing.chunks(PROFILE_BATCH_SIZE) {
            let profiles = self.api.get_profiles_by_ids(chunk).await.map_err(|source| {
                IngestError::ProfileBatch {
                    count: chunk.len(),
                    source,
                }
            })?;

            let mut seen = HashSet::with_capacity(profiles.len());
            for profile in profiles {
                // A concurrent resolution may have inserted the row already;
                // AlreadyExists re-reads it and counts as success.
                let (stored, _outcome) = self.store.upsert_player(&profile).await?;
                seen.insert(stored.xuid);
                participants.push(Participant::Human(Profile {
                    xuid: stored.xuid,
                    gamertag: stored.gamertag,
                }));
            }

            for &xuid in chunk {
                if !seen.contains(&xuid) {
                    warn!("identity service returned no profile for xuid {xuid}");
                }
            }
        }

        Ok(participants)
    }
}
