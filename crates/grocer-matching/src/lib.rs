//! Cross-store product matching and basket optimization.
//!
//! Products are encoded via TEI, looked up in a Qdrant hybrid collection,
//! scored for identity against the original listing, and assembled into
//! per-store baskets. Free-text search reuses the same retrieval path and
//! ranks results with keyword and semantic signals combined.

use grocer_core::{AppConfig, ProductCatalog, Tuning};

pub mod basket;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod identity;
pub mod ranker;
pub mod retriever;
pub mod selector;
pub mod types;
pub mod vector_store;

pub use basket::BasketComparator;
pub use embeddings::{EncodedText, Encoder, SparseTerms, TeiEncoder};
pub use engine::{MatchEngine, ProductPage, SearchOutcome, SearchRequest};
pub use error::MatchError;
pub use identity::IdentityScorer;
pub use ranker::{sort_by_price, PriceSort, RelevanceRanker};
pub use retriever::CandidateRetriever;
pub use selector::MatchSelector;
pub use types::{
    ApprovalTier, BasketComparison, BasketLine, BestDealBasket, BestDealItem, Candidate,
    CartLine, FallbackKind, IdentityScore, Match, StoreBasket, StoreCombination,
};
pub use vector_store::{
    IndexFilter, IndexHit, ProductPayload, QdrantIndex, StoreFilter, VectorIndex,
};

/// The engine as wired in production: TEI for encoding, Qdrant for lookup.
pub type HybridEngine<C> = MatchEngine<TeiEncoder, QdrantIndex, C>;

/// Builds a [`HybridEngine`] from the collaborator endpoints in `config`.
///
/// # Errors
///
/// Returns [`MatchError::Http`] if an HTTP client cannot be constructed.
pub fn hybrid_engine<C: ProductCatalog>(
    config: &AppConfig,
    tuning: &Tuning,
    catalog: C,
) -> Result<HybridEngine<C>, MatchError> {
    let encoder = TeiEncoder::new(
        &config.tei_url,
        config.collab_timeout_secs,
        config.tei_sparse,
    )?;
    let index = QdrantIndex::new(
        &config.qdrant_url,
        &config.qdrant_collection,
        config.qdrant_api_key.clone(),
        config.collab_timeout_secs,
    )?;
    Ok(MatchEngine::new(tuning, encoder, index, catalog))
}
