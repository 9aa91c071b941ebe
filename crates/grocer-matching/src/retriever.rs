//! Candidate lookup against the vector index.

use grocer_core::{Product, Store};

use crate::embeddings::Encoder;
use crate::error::MatchError;
use crate::types::Candidate;
use crate::vector_store::{IndexFilter, IndexHit, ProductPayload, VectorIndex};

pub struct CandidateRetriever<E, I> {
    encoder: E,
    index: I,
    retrieval_floor: f32,
    search_floor: f32,
}

impl<E: Encoder, I: VectorIndex> CandidateRetriever<E, I> {
    pub fn new(encoder: E, index: I, retrieval_floor: f32, search_floor: f32) -> Self {
        Self {
            encoder,
            index,
            retrieval_floor,
            search_floor,
        }
    }

    /// Cross-store candidates for `product`, at most `limit` of them.
    ///
    /// Hits below the retrieval floor never become candidates. Encoder or
    /// index failures are logged and yield an empty pool: an empty result
    /// means "nothing found", not "nothing exists".
    pub async fn retrieve(
        &self,
        product: &Product,
        exclude: Store,
        limit: usize,
    ) -> Vec<Candidate> {
        let filter = IndexFilter::excluding_store(exclude);
        match self
            .lookup(&product.search_text(), &filter, limit, self.retrieval_floor)
            .await
        {
            Ok(candidates) => {
                tracing::debug!(
                    product_id = product.id,
                    candidates = candidates.len(),
                    "retrieved candidates"
                );
                candidates
            }
            Err(e) => {
                tracing::warn!(
                    product_id = product.id,
                    error = %e,
                    "candidate retrieval unavailable; treating as no candidates"
                );
                Vec::new()
            }
        }
    }

    /// Free-text search. Blank queries return nothing without touching the
    /// collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError`] when the encoder or index fails, so the caller
    /// can fall back to a plain catalog search.
    pub async fn search(
        &self,
        query: &str,
        filter: &IndexFilter,
        top_k: usize,
    ) -> Result<Vec<Candidate>, MatchError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.lookup(query, filter, top_k, self.search_floor).await
    }

    async fn lookup(
        &self,
        text: &str,
        filter: &IndexFilter,
        top_k: usize,
        floor: f32,
    ) -> Result<Vec<Candidate>, MatchError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let encoded = self.encoder.encode(text).await?;
        let hits = self.index.query(&encoded, filter, top_k).await?;

        Ok(hits
            .into_iter()
            .filter(|hit| hit.score >= floor)
            .filter_map(into_candidate)
            .take(top_k)
            .collect())
    }
}

fn into_candidate(hit: IndexHit) -> Option<Candidate> {
    let IndexHit { score, payload } = hit;
    let ProductPayload {
        product_id,
        name,
        brand,
        size,
        category,
        store,
        price,
        product_url,
        image_url,
    } = payload;

    let store = match store.parse::<Store>() {
        Ok(store) => store,
        Err(e) => {
            tracing::warn!(product_id, error = %e, "skipping index hit with unknown store");
            return None;
        }
    };
    if name.trim().is_empty() {
        tracing::warn!(product_id, "skipping index hit without a name");
        return None;
    }

    let product = Product {
        id: product_id,
        name,
        brand: brand.filter(|b| !b.trim().is_empty()),
        size: size.filter(|s| !s.trim().is_empty()),
        category,
        store,
        price,
        price_numeric: None,
        product_url,
        image_url,
        last_scraped: None,
    }
    .repriced();

    Some(Candidate {
        product,
        similarity: score,
    })
}
