//! Rank eligibility rules
//!
//! A match is valid when it was played after the cutoff, with teams enabled,
//! under a known gamemode, with a full lobby present at completion, and it ran
//! to its natural end (time limit or score limit) instead of being ended by
//! the host. The gamemode table is static domain configuration.

use crate::models::{ResolvedMatch, Validity};
use chrono::{DateTime, Duration, Utc};

/// Lobby size required at match completion.
const REQUIRED_PLAYERS: usize = 8;

/// Win conditions per gamemode: score to win, rounds to win, time limit in
/// minutes. Strongholds has no effective time limit, so the table carries a
/// sentinel large enough to never pass the duration check.
const GAMEMODE_RULES: &[(&str, GamemodeRules)] = &[
    ("Ranked:King of the Hill", GamemodeRules::new(4, 1, 5)),
    ("Ranked:Strongholds", GamemodeRules::new(250, 1, 9000)),
    ("Ranked:Oddball", GamemodeRules::new(200, 2, 10)),
    ("Ranked:CTF 3 Captures", GamemodeRules::new(3, 1, 12)),
    ("Ranked:CTF 5 Captures", GamemodeRules::new(5, 1, 12)),
    ("Ranked:Slayer", GamemodeRules::new(50, 1, 12)),
    ("Ranked:Extraction", GamemodeRules::new(4, 1, 12)),
    ("Ranked:CTF", GamemodeRules::new(5, 1, 12)),
    ("Assault:Neutral Bomb Ranked", GamemodeRules::new(1, 1, 12)),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GamemodeRules {
    pub score_to_win: i64,
    pub rounds_to_win: u32,
    time_limit_minutes: i64,
}

impl GamemodeRules {
    const fn new(score_to_win: i64, rounds_to_win: u32, time_limit_minutes: i64) -> Self {
        Self {
            score_to_win,
            rounds_to_win,
            time_limit_minutes,
        }
    }

    pub fn time_limit(&self) -> Duration {
        Duration::minutes(self.time_limit_minutes)
    }
}

/// Look up the win conditions for a gamemode display name.
pub fn rules_for(gamemode_name: &str) -> Option<&'static GamemodeRules> {
    GAMEMODE_RULES
        .iter()
        .find(|(name, _)| *name == gamemode_name)
        .map(|(_, rules)| rules)
}

/// Names of all gamemodes with win conditions, for fixtures and display.
pub fn known_gamemodes() -> impl Iterator<Item = &'static str> {
    GAMEMODE_RULES.iter().map(|(name, _)| *name)
}

/// Classify a fully resolved match. Each rule is a hard veto; an unknown
/// gamemode classifies the match invalid rather than erroring.
pub fn classify(resolved: &ResolvedMatch, cutoff: DateTime<Utc>) -> Validity {
    let info = &resolved.stats.match_info;

    if info.start_time < cutoff {
        return Validity::Invalid;
    }
    if !info.teams_enabled {
        // Free-for-all is never rank-eligible.
        return Validity::Invalid;
    }

    let Some(rules) = resolved
        .gamemode
        .as_ref()
        .and_then(|asset| rules_for(&asset.public_name))
    else {
        return Validity::Invalid;
    };

    let present = resolved
        .stats
        .players
        .iter()
        .filter(|p| p.participation_info.present_at_completion)
        .count();
    if present != REQUIRED_PLAYERS {
        return Validity::Invalid;
    }

    let ran_out_of_time = info.playable_duration >= rules.time_limit()
        && resolved
            .stats
            .teams
            .iter()
            .any(|team| team.stats.core_stats.rounds_won == rules.rounds_to_win);

    let score_reached = resolved.stats.teams.iter().any(|team| {
        team.stats.core_stats.score >= rules.score_to_win
            && team.stats.core_stats.rounds_won == rules.rounds_to_win
    });

    if ran_out_of_time || score_reached {
        Validity::Valid
    } else {
        Validity::Invalid
    }
}
