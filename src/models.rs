//! Wire and domain types for match ingestion
//!
//! The upstream stats API serializes in PascalCase; the Xbox profile service
//! has its own envelope which `stats_client` flattens into [`Profile`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Reserved id prefix for synthetic (non-human) participants.
const BOT_ID_PREFIX: &str = "bid(";

/// Known bot ids and their display names. Unknown bot ids fall back to a
/// generated name; they never hit the identity service or the store.
const BOT_NAMES: &[(&str, &str)] = &[
    ("bid(1.0)", "343 Connmando"),
    ("bid(2.0)", "343 Beta-5"),
    ("bid(3.0)", "343 Aim Bot"),
    ("bid(4.0)", "343 Ritzy"),
    ("bid(5.0)", "343 Meowlnir"),
];

/// Wrap a numeric platform id in the API's `xuid(...)` form.
pub fn wrap_xuid(xuid: u64) -> String {
    format!("xuid({xuid})")
}

/// Extract the numeric id from an `xuid(...)` token. Returns `None` for bot
/// ids and malformed tokens.
pub fn unwrap_xuid(id: &str) -> Option<u64> {
    id.strip_prefix("xuid(")?.strip_suffix(')')?.parse().ok()
}

/// Whether a participant id uses the platform-reserved bot pattern.
pub fn is_bot_id(id: &str) -> bool {
    id.starts_with(BOT_ID_PREFIX)
}

/// Display name for a bot participant.
pub fn bot_display_name(id: &str) -> String {
    BOT_NAMES
        .iter()
        .find(|(bot_id, _)| *bot_id == id)
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| format!("Bot {id}"))
}

/// Match history type filter. `Ranked` is narrower than the API's native
/// filters and is implemented client-side by playlist inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    All,
    Custom,
    Matchmaking,
    Ranked,
}

impl MatchKind {
    /// The value sent in the history request's `type` parameter. Ranked has
    /// no native filter and pages under `all`.
    pub fn query_value(&self) -> &'static str {
        match self {
            MatchKind::All | MatchKind::Ranked => "all",
            MatchKind::Custom => "custom",
            MatchKind::Matchmaking => "matchmaking",
        }
    }

    /// Playlist names that count as ranked when filtering client-side.
    pub fn ranked_playlist_names() -> &'static [&'static str] {
        &["Ranked Arena", "Ranked Slayer", "Ranked Doubles"]
    }
}

/// Reference to a versioned upstream asset (map, game variant, playlist).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AssetRef {
    pub asset_id: String,
    pub version_id: String,
}

/// Resolved asset metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Asset {
    pub asset_id: String,
    pub public_name: String,
    #[serde(default)]
    pub description: String,
}

/// One entry of a player's match history.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MatchSummary {
    pub match_id: String,
    pub match_info: MatchInfo,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MatchInfo {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "deserialize_iso8601_duration")]
    pub playable_duration: Duration,
    pub teams_enabled: bool,
    pub map_variant: AssetRef,
    pub ugc_game_variant: AssetRef,
    /// Absent for custom games that never went through matchmaking.
    pub playlist: Option<AssetRef>,
}

/// Full statistics for a finished match.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MatchStats {
    pub match_id: String,
    pub match_info: MatchInfo,
    pub teams: Vec<TeamStats>,
    pub players: Vec<PlayerStats>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TeamStats {
    pub team_id: u8,
    pub stats: StatsBundle,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatsBundle {
    pub core_stats: CoreStats,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CoreStats {
    pub score: i64,
    pub rounds_won: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlayerStats {
    /// Either `xuid(...)` for humans or `bid(...)` for bots.
    pub player_id: String,
    pub participation_info: ParticipationInfo,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParticipationInfo {
    pub present_at_completion: bool,
}

/// Resolved player identity from the identity service or the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub xuid: u64,
    pub gamertag: String,
}

/// A match participant after identity resolution. The variant records where
/// the identity came from so callers never probe attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Participant {
    /// Freshly fetched from the identity service.
    Human(Profile),
    /// Served from the local profile store.
    CachedHuman(Profile),
    /// Synthetic participant; resolved from the static bot table.
    Bot { id: String, name: String },
}

impl Participant {
    pub fn xuid(&self) -> Option<u64> {
        match self {
            Participant::Human(p) | Participant::CachedHuman(p) => Some(p.xuid),
            Participant::Bot { .. } => None,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Participant::Human(p) | Participant::CachedHuman(p) => &p.gamertag,
            Participant::Bot { name, .. } => name,
        }
    }

    pub fn is_human(&self) -> bool {
        !matches!(self, Participant::Bot { .. })
    }
}

/// Moderation classification of a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrustState {
    Unverified,
    PendingReview,
    Trusted,
    Rejected,
}

/// Rank eligibility of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Validity {
    Unknown,
    Valid,
    Invalid,
}

/// A match with all remote lookups completed, ready for classification and
/// persistence. Asset lookups that 404'd stay `None`.
#[derive(Debug, Clone)]
pub struct ResolvedMatch {
    pub stats: MatchStats,
    pub map: Option<Asset>,
    pub gamemode: Option<Asset>,
    pub playlist: Option<Asset>,
    pub participants: Vec<Participant>,
    pub validity: Validity,
}

impl ResolvedMatch {
    pub fn match_id(&self) -> &str {
        &self.stats.match_id
    }
}

/// Outcome counts for one ingestion run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestionSummary {
    pub fetched: usize,
    pub persisted: usize,
    pub duplicates: usize,
    pub failures: Vec<String>,
}

/// Parse the API's ISO-8601 durations (`PT11M22.153S`) into a `Duration`.
fn deserialize_iso8601_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_iso8601_duration(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid ISO-8601 duration: {raw}")))
}

fn parse_iso8601_duration(raw: &str) -> Option<Duration> {
    let body = raw.strip_prefix("PT")?;
    let mut total_ms: i64 = 0;
    let mut number = String::new();
    for ch in body.chars() {
        match ch {
            '0'..='9' | '.' => number.push(ch),
            'H' => {
                let hours: f64 = number.parse().ok()?;
                total_ms += (hours * 3_600_000.0) as i64;
                number.clear();
            }
            'M' => {
                let minutes: f64 = number.parse().ok()?;
                total_ms += (minutes * 60_000.0) as i64;
                number.clear();
            }
            'S' => {
                let seconds: f64 = number.parse().ok()?;
                total_ms += (seconds * 1_000.0) as i64;
                number.clear();
            }
            _ => return None,
        }
    }
    if !number.is_empty() {
        return None;
    }
    Some(Duration::milliseconds(total_ms))
}
