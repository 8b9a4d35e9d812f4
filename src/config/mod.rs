pub mod schema;

pub use schema::{
    AdvisorConfig, Config, QuotaConfig, SuggestionsConfig, TranscriptConfig,
};
