//! Auth session for the stats API
//!
//! Token acquisition and refresh belong to the external identity collaborator;
//! this type only carries the issued token pair and knows when it has gone
//! stale. The client checks expiry before each call and surfaces
//! [`ApiError::SessionExpired`](crate::error::ApiError::SessionExpired) so the
//! owner can install a fresh session.

use chrono::{DateTime, Duration, Utc};

/// Upstream issues spartan tokens valid for four hours.
const TOKEN_LIFETIME_HOURS: i64 = 4;

#[derive(Debug, Clone)]
pub struct ApiSession {
    pub spartan_token: String,
    pub clearance_token: String,
    expires_at: DateTime<Utc>,
}

impl ApiSession {
    pub fn new(spartan_token: String, clearance_token: String) -> Self {
        Self {
            spartan_token,
            clearance_token,
            expires_at: Utc::now() + Duration::hours(TOKEN_LIFETIME_HOURS),
        }
    }

    pub fn with_expiry(
        spartan_token: String,
        clearance_token: String,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            spartan_token,
            clearance_token,
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}
