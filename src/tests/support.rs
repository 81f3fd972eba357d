//! Shared fixtures and a mock stats API for unit tests

use crate::error::ApiError;
use crate::models::{
    wrap_xuid, Asset, AssetRef, MatchInfo, MatchKind, MatchStats, MatchSummary,
    ParticipationInfo, PlayerStats, Profile, StatsBundle, TeamStats,
};
use crate::stats_client::StatsApi;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn after_cutoff() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 18, 0, 0).unwrap()
}

pub fn cutoff() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn asset_ref(id: &str) -> AssetRef {
    AssetRef {
        asset_id: id.to_string(),
        version_id: "v1".to_string(),
    }
}

pub fn asset(id: &str, name: &str) -> Asset {
    Asset {
        asset_id: id.to_string(),
        public_name: name.to_string(),
        description: String::new(),
    }
}

pub fn match_info(
    start_time: DateTime<Utc>,
    duration_minutes: i64,
    teams_enabled: bool,
    playlist: Option<&str>,
) -> MatchInfo {
    MatchInfo {
        start_time,
        end_time: None,
        playable_duration: Duration::minutes(duration_minutes),
        teams_enabled,
        map_variant: asset_ref("map-1"),
        ugc_game_variant: asset_ref("gm-1"),
        playlist: playlist.map(asset_ref),
    }
}

pub fn human_player(xuid: u64, present: bool) -> PlayerStats {
    PlayerStats {
        player_id: wrap_xuid(xuid),
        participation_info: ParticipationInfo {
            present_at_completion: present,
        },
    }
}

pub fn bot_player(id: &str) -> PlayerStats {
    PlayerStats {
        player_id: id.to_string(),
        participation_info: ParticipationInfo {
            present_at_completion: true,
        },
    }
}

pub fn team(team_id: u8, score: i64, rounds_won: u32) -> TeamStats {
    TeamStats {
        team_id,
        stats: StatsBundle {
            core_stats: crate::models::CoreStats { score, rounds_won },
        },
    }
}

pub fn match_stats(
    match_id: &str,
    info: MatchInfo,
    teams: Vec<TeamStats>,
    players: Vec<PlayerStats>,
) -> MatchStats {
    MatchStats {
        match_id: match_id.to_string(),
        match_info: info,
        teams,
        players,
    }
}

/// Eight humans (xuids 1..=8), all present at completion.
pub fn full_lobby() -> Vec<PlayerStats> {
    (1..=8).map(|x| human_player(x, true)).collect()
}

pub fn profile(xuid: u64) -> Profile {
    Profile {
        xuid,
        gamertag: format!("Player{xuid}"),
    }
}

/// In-memory stand-in for the remote stats / identity API.
#[derive(Default)]
pub struct MockApi {
    pub history: Mutex<Vec<MatchSummary>>,
    pub matches: Mutex<HashMap<String, MatchStats>>,
    pub maps: Mutex<HashMap<String, Asset>>,
    pub gamemodes: Mutex<HashMap<String, Asset>>,
    pub playlists: Mutex<HashMap<String, Asset>>,
    pub profiles: Mutex<HashMap<u64, Profile>>,
    pub history_calls: AtomicUsize,
    pub profile_batch_sizes: Mutex<Vec<usize>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_match(&self, summary: MatchSummary, stats: MatchStats) {
        self.matches.lock().insert(stats.match_id.clone(), stats);
        self.history.lock().push(summary);
    }

    pub fn add_profiles(&self, count: u64) {
        let mut profiles = self.profiles.lock();
        for xuid in 1..=count {
            profiles.insert(xuid, profile(xuid));
        }
    }

    /// A ranked-eligible custom match with a full lobby, winning team at the
    /// given score/rounds.
    pub fn add_standard_match(&self, match_id: &str, gamemode_name: &str, score: i64, rounds: u32) {
        let info = match_info(after_cutoff(), 12, true, None);
        let summary = MatchSummary {
            match_id: match_id.to_string(),
            match_info: info.clone(),
        };
        let stats = match_stats(
            match_id,
            info,
            vec![team(0, score, rounds), team(1, 0, 0)],
            full_lobby(),
        );
        self.gamemodes
            .lock()
            .insert("gm-1".to_string(), asset("gm-1", gamemode_name));
        self.maps
            .lock()
            .insert("map-1".to_string(), asset("map-1", "Aquarius"));
        self.add_match(summary, stats);
    }
}

#[async_trait]
impl StatsApi for MockApi {
    async fn get_match_history(
        &self,
        _xuid: u64,
        start: usize,
        count: usize,
        _kind: MatchKind,
    ) -> Result<Vec<MatchSummary>, ApiError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        let history = self.history.lock();
        let end = (start + count).min(history.len());
        if start >= history.len() {
            return Ok(vec![]);
        }
        Ok(history[start..end].to_vec())
    }

    async fn get_match_stats(&self, match_id: &str) -> Result<MatchStats, ApiError> {
        self.matches
            .lock()
            .get(match_id)
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    async fn get_map_asset(&self, asset: &AssetRef) -> Result<Option<Asset>, ApiError> {
        Ok(self.maps.lock().get(&asset.asset_id).cloned())
    }

    async fn get_gamemode_asset(&self, asset: &AssetRef) -> Result<Option<Asset>, ApiError> {
        Ok(self.gamemodes.lock().get(&asset.asset_id).cloned())
    }

    async fn get_playlist_asset(&self, asset: &AssetRef) -> Result<Option<Asset>, ApiError> {
        Ok(self.playlists.lock().get(&asset.asset_id).cloned())
    }

    async fn get_profiles_by_ids(&self, xuids: &[u64]) -> Result<Vec<Profile>, ApiError> {
        self.profile_batch_sizes.lock().push(xuids.len());
        let profiles = self.profiles.lock();
        Ok(xuids
            .iter()
            .filter_map(|xuid| profiles.get(xuid).cloned())
            .collect())
    }

    async fn get_profile_by_tag(&self, gamertag: &str) -> Result<Option<Profile>, ApiError> {
        Ok(self
            .profiles
            .lock()
            .values()
            .find(|p| p.gamertag == gamertag)
            .cloned())
    }
}
