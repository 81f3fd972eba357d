//! Paginated match discovery and concurrent detail gathering
//!
//! Pages are requested strictly in sequence because the stop condition
//! depends on each page's content; within a page, playlist checks and full
//! match detail are gathered concurrently. A failure inside one page's gather
//! fails that batch.

use crate::error::IngestError;
use crate::models::{
    Asset, MatchKind, MatchSummary, Participant, ResolvedMatch, Validity,
};
use crate::profile_resolver::ProfileResolver;
use crate::stats_client::StatsApi;
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, info};

/// Page size for match history requests.
const PAGE_SIZE: usize = 25;

pub struct MatchFetcher {
    api: Arc<dyn StatsApi>,
    resolver: Arc<ProfileResolver>,
    page_size: usize,
}

impl MatchFetcher {
    pub fn new(api: Arc<dyn StatsApi>, resolver: Arc<ProfileResolver>) -> Self {
        Self {
            api,
            resolver,
            page_size: PAGE_SIZE,
        }
    }

    #[cfg(test)]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Page through a player's match history, newest first, until
    /// `target_count` matches of the requested kind are fully resolved or the
    /// history is exhausted. For [`MatchKind::Ranked`] this scans under the
    /// API's `all` filter and may inspect more raw matches than it returns.
    pub async fn fetch_matches(
        &self,
        xuid: u64,
        target_count: usize,
        kind: MatchKind,
    ) -> Result<Vec<ResolvedMatch>, IngestError> {
        let mut resolved = Vec::new();
        let mut start = 0usize;
        let mut scanned = 0usize;

        while resolved.len() < target_count {
            let page = self
                .api
                .get_match_history(xuid, start, self.page_size, kind)
                .await?;
            if page.is_empty() {
                debug!("history exhausted for xuid {xuid} after {scanned} matches");
                break;
            }
            scanned += page.len();
            start += self.page_size;

            let mut candidates = match kind {
                MatchKind::Ranked => self.filter_ranked(page).await?,
                _ => page.into_iter().map(|s| (s, None)).collect(),
            };
            candidates.truncate(target_count - resolved.len());
            if candidates.is_empty() {
                continue;
            }

            // One failed match fails the page's whole gather.
            let batch = try_join_all(
                candidates
                    .into_iter()
                    .map(|(summary, playlist)| self.resolve_match(summary, playlist)),
            )
            .await?;
            resolved.extend(batch);
        }

        info!(
            "resolved {} matches for xuid {xuid} (scanned {scanned})",
            resolved.len()
        );
        Ok(resolved)
    }

    /// Keep only matches whose playlist is one of the ranked queues. Playlist
    /// assets are resolved concurrently; matches without a playlist (pure
    /// customs) are dropped.
    async fn filter_ranked(
        &self,
        page: Vec<MatchSummary>,
    ) -> Result<Vec<(MatchSummary, Option<Asset>)>, IngestError> {
        let checks = page.iter().map(|summary| async move {
            let Some(playlist_ref) = summary.match_info.playlist.as_ref() else {
                return Ok::<_, IngestError>(None);
            };
            let asset = self.api.get_playlist_asset(playlist_ref).await?;
            Ok(asset.filter(|a| {
                MatchKind::ranked_playlist_names().contains(&a.public_name.as_str())
            }))
        });
        let playlists = try_join_all(checks).await?;

        Ok(page
            .into_iter()
            .zip(playlists)
            .filter_map(|(summary, playlist)| playlist.map(|p| (summary, Some(p))))
            .collect())
    }

    /// Gather one match's full detail: stats, map and gamemode assets, and
    /// participant identities. Asset 404s degrade to `None`.
    async fn resolve_match(
        &self,
        summary: MatchSummary,
        playlist: Option<Asset>,
    ) -> Result<ResolvedMatch, IngestError> {
        let map_ref = summary.match_info.map_variant.clone();
        let gamemode_ref = summary.match_info.ugc_game_variant.clone();

        let (stats, map, gamemode) = tokio::try_join!(
            self.api.get_match_stats(&summary.match_id),
            self.api.get_map_asset(&map_ref),
            self.api.get_gamemode_asset(&gamemode_ref),
        )
        .map_err(|source| IngestError::Match {
            match_id: summary.match_id.clone(),
            source,
        })?;

        let player_ids: Vec<String> = stats.players.iter().map(|p| p.player_id.clone()).collect();
        let participants: Vec<Participant> = self.resolver.resolve(&player_ids).await?;

        Ok(ResolvedMatch {
            stats,
            map,
            gamemode,
            playlist,
            participants,
            validity: Validity::Unknown,
        })
    }
}
