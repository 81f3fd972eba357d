//! Typed client for the game statistics, asset discovery, and identity APIs
//!
//! Every outbound call goes through the shared [`ApiRateLimiter`] first.
//! Transient failures get a bounded retry; an upstream burst rejection (429)
//! triggers the global cooldown and retries with the attempt counter reset;
//! a 404 on asset or profile lookups resolves to an absent value.

use crate::error::ApiError;
use crate::models::{unwrap_xuid, Asset, AssetRef, MatchKind, MatchStats, MatchSummary, Profile};
use crate::rate_limiter::ApiRateLimiter;
use crate::session::ApiSession;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Attempts per call for transient failures.
const MAX_ATTEMPTS: u32 = 4;
/// Consecutive burst cooldowns tolerated before the call is surfaced as failed.
const MAX_COOLDOWNS: u32 = 3;
/// Identity service caps batch lookups at this many ids per request.
pub const PROFILE_BATCH_SIZE: usize = 100;

/// Seam between the fetch pipeline and the remote APIs. Production code uses
/// [`StatsClient`]; tests substitute mocks.
#[async_trait]
pub trait StatsApi: Send + Sync {
    async fn get_match_history(
        &self,
        xuid: u64,
        start: usize,
        count: usize,
        kind: MatchKind,
    ) -> Result<Vec<MatchSummary>, ApiError>;

    async fn get_match_stats(&self, match_id: &str) -> Result<MatchStats, ApiError>;

    async fn get_map_asset(&self, asset: &AssetRef) -> Result<Option<Asset>, ApiError>;

    async fn get_gamemode_asset(&self, asset: &AssetRef) -> Result<Option<Asset>, ApiError>;

    async fn get_playlist_asset(&self, asset: &AssetRef) -> Result<Option<Asset>, ApiError>;

    /// Batched identity lookup. Callers may pass more than
    /// [`PROFILE_BATCH_SIZE`] ids; the client chunks internally.
    async fn get_profiles_by_ids(&self, xuids: &[u64]) -> Result<Vec<Profile>, ApiError>;

    async fn get_profile_by_tag(&self, gamertag: &str) -> Result<Option<Profile>, ApiError>;
}

#[derive(Debug, Clone)]
pub struct StatsClientConfig {
    pub stats_host: String,
    pub discovery_host: String,
    pub profile_host: String,
}

impl Default for StatsClientConfig {
    fn default() -> Self {
        Self {
            stats_host: "https://halostats.svc.halowaypoint.com".to_string(),
            discovery_host: "https://discovery-infiniteugc.svc.halowaypoint.com".to_string(),
            profile_host: "https://profile.xboxlive.com".to_string(),
        }
    }
}

pub struct StatsClient {
    http: reqwest::Client,
    config: StatsClientConfig,
    rate_limiter: Arc<ApiRateLimiter>,
    session: Arc<RwLock<ApiSession>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HistoryResponse {
    results: Vec<MatchSummary>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchProfileRequest<'a> {
    user_ids: &'a [u64],
    settings: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileEnvelope {
    profile_users: Vec<ProfileUser>,
}

#[derive(Debug, Deserialize)]
struct ProfileUser {
    id: String,
    settings: Vec<ProfileSetting>,
}

#[derive(Debug, Deserialize)]
struct ProfileSetting {
    id: String,
    value: String,
}

impl ProfileUser {
    fn into_profile(self) -> Option<Profile> {
        let xuid = self.id.parse().ok().or_else(|| unwrap_xuid(&self.id))?;
        let gamertag = self
            .settings
            .into_iter()
            .find(|s| s.id == "Gamertag")
            .map(|s| s.value)?;
        Some(Profile { xuid, gamertag })
    }
}

impl StatsClient {
    pub fn new(
        config: StatsClientConfig,
        rate_limiter: Arc<ApiRateLimiter>,
        session: Arc<RwLock<ApiSession>>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            rate_limiter,
            session,
        }
    }

    /// Issue one request with rate limiting, bounded transient retry, and
    /// cooldown-and-retry on burst rejection.
    async fn request<T: DeserializeOwned>(
        &self,
        build: impl Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let mut attempts = 0u32;
        let mut cooldowns = 0u32;

        loop {
            self.rate_limiter.acquire().await;

            let (spartan, clearance) = {
                let session = self.session.read().await;
                if session.is_expired() {
                    return Err(ApiError::SessionExpired);
                }
                (
                    session.spartan_token.clone(),
                    session.clearance_token.clone(),
                )
            };

            let response = build(&self.http)
                .header("x-343-authorization-spartan", spartan)
                .header("343-clearance", clearance)
                .header("Accept", "application/json")
                .send()
                .await;

            let failure = match response {
                Ok(resp) => match resp.status() {
                    status if status.is_success() => {
                        return resp.json::<T>().await.map_err(ApiError::from)
                    }
                    StatusCode::NOT_FOUND => return Err(ApiError::NotFound),
                    StatusCode::TOO_MANY_REQUESTS => {
                        cooldowns += 1;
                        if cooldowns > MAX_COOLDOWNS {
                            return Err(ApiError::RateLimited);
                        }
                        self.rate_limiter.report_burst_rejected().await;
                        // Burst rejections do not consume transient attempts.
                        attempts = 0;
                        continue;
                    }
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                        return Err(ApiError::SessionExpired)
                    }
                    status => ApiError::Transient(format!("upstream returned {status}")),
                },
                Err(err) => ApiError::from(err),
            };

            attempts += 1;
            if attempts >= MAX_ATTEMPTS || !failure.is_transient() {
                return Err(failure);
            }
            let backoff = Duration::from_millis(500 * u64::from(attempts));
            debug!("retrying after transient failure ({failure}), attempt {attempts}");
            tokio::time::sleep(backoff).await;
        }
    }

    async fn get_asset(&self, kind: &str, asset: &AssetRef) -> Result<Option<Asset>, ApiError> {
        let url = format!(
            "{}/hi/{}/{}/versions/{}",
            self.config.discovery_host, kind, asset.asset_id, asset.version_id
        );
        match self.request::<Asset>(move |http| http.get(url.as_str())).await {
            Ok(found) => Ok(Some(found)),
            Err(ApiError::NotFound) => {
                debug!("{kind} asset {} not found upstream", asset.asset_id);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl StatsApi for StatsClient {
    async fn get_match_history(
        &self,
        xuid: u64,
        start: usize,
        count: usize,
        kind: MatchKind,
    ) -> Result<Vec<MatchSummary>, ApiError> {
        let url = format!(
            "{}/hi/players/xuid({xuid})/matches?start={start}&count={count}&type={}",
            self.config.stats_host,
            kind.query_value()
        );
        let response: HistoryResponse = self.request(move |http| http.get(url.as_str())).await?;
        Ok(response.results)
    }

    async fn get_match_stats(&self, match_id: &str) -> Result<MatchStats, ApiError> {
        let url = format!("{}/hi/matches/{match_id}/stats", self.config.stats_host);
        self.request(move |http| http.get(url.as_str())).await
    }

    async fn get_map_asset(&self, asset: &AssetRef) -> Result<Option<Asset>, ApiError> {
        self.get_asset("maps", asset).await
    }

    async fn get_gamemode_asset(&self, asset: &AssetRef) -> Result<Option<Asset>, ApiError> {
        self.get_asset("ugcGameVariants", asset).await
    }

    async fn get_playlist_asset(&self, asset: &AssetRef) -> Result<Option<Asset>, ApiError> {
        self.get_asset("playlists", asset).await
    }

    async fn get_profiles_by_ids(&self, xuids: &[u64]) -> Result<Vec<Profile>, ApiError> {
        let mut profiles = Vec::with_capacity(xuids.len());
        for chunk in xuids.chunks(PROFILE_BATCH_SIZE) {
            let url = format!("{}/users/batch/profile/settings", self.config.profile_host);
            let body = serde_json::to_value(BatchProfileRequest {
                user_ids: chunk,
                settings: &["Gamertag"],
            })
            .map_err(|e| ApiError::Decode(e.to_string()))?;

            let envelope: ProfileEnvelope = self
                .request(move |http| http.post(url.as_str()).json(&body))
                .await?;

            for user in envelope.profile_users {
                match user.into_profile() {
                    Some(profile) => profiles.push(profile),
                    None => warn!("identity service returned a profile without a gamertag"),
                }
            }
        }
        Ok(profiles)
    }

    async fn get_profile_by_tag(&self, gamertag: &str) -> Result<Option<Profile>, ApiError> {
        let url = format!(
            "{}/users/gt({gamertag})/profile/settings?settings=Gamertag",
            self.config.profile_host
        );
        match self
            .request::<ProfileEnvelope>(move |http| http.get(url.as_str()))
            .await
        {
            Ok(envelope) => Ok(envelope
                .profile_users
                .into_iter()
                .next()
                .and_then(ProfileUser::into_profile)),
            Err(ApiError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }
}
