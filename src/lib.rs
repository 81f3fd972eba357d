pub mod error;
pub mod ingestion_service;
pub mod match_fetcher;
pub mod match_validity;
pub mod models;
pub mod profile_resolver;
pub mod rate_limiter;
pub mod session;
pub mod stats_client;
pub mod store;
pub mod trust_workflow;

#[cfg(test)]
mod tests;

pub use error::{ApiError, IngestError, UpsertOutcome};
pub use ingestion_service::{IngestionConfig, IngestionService};
pub use match_fetcher::MatchFetcher;
pub use models::{
    IngestionSummary, MatchKind, Participant, Profile, ResolvedMatch, TrustState, Validity,
};
pub use profile_resolver::ProfileResolver;
pub use rate_limiter::ApiRateLimiter;
pub use session::ApiSession;
pub use stats_client::{StatsApi, StatsClient, StatsClientConfig};
pub use store::{MatchStore, MemoryStore, StoredPlayer};
pub use trust_workflow::{ReviewRequest, TrustWorkflow};
