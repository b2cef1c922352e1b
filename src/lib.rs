// ---------------------------------------------------------------------------
// evrec-engine — event recommendation over JSON-RPC 2.0 / NDJSON stdio
// ---------------------------------------------------------------------------
//
// Recommends events to profiles by comparing tag embeddings, and adapts
// per-profile tag weights when a user registers for an event. Embeddings
// come from outside: clients register per-tag vectors, the engine only
// computes similarities over them.
// ---------------------------------------------------------------------------

pub mod adapter;
pub mod error;
pub mod oracle;
pub mod persistence;
pub mod protocol;
pub mod scorer;
pub mod server;
pub mod store;
pub mod transport;
pub mod types;

pub use adapter::{adapt_weights, AdapterConfig};
pub use error::RecError;
pub use oracle::{cosine_similarity, EmbeddingOracle, TagSimilarity};
pub use scorer::{recommend, ScorerConfig};
pub use store::{StoreConfig, TagStore};
pub use types::{Event, ProfileTag, Recommendation, Recommended, RegistrationResult, RegistrationStatus};
