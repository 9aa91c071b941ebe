//! The matching facade shared by the server and CLI.

use std::collections::{HashMap, HashSet};

use futures::future::join_all;
use grocer_core::{Product, ProductCatalog, Store, Tuning};
use serde::Serialize;

use crate::basket::BasketComparator;
use crate::embeddings::Encoder;
use crate::error::MatchError;
use crate::identity::IdentityScorer;
use crate::ranker::{sort_by_price, PriceSort, RelevanceRanker};
use crate::retriever::CandidateRetriever;
use crate::selector::MatchSelector;
use crate::types::{BasketComparison, CartLine, Match};
use crate::vector_store::{IndexFilter, StoreFilter, VectorIndex};

/// Extra index hits fetched beyond the requested page, to survive filtering.
const SEARCH_HEADROOM: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub store: Option<Store>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub sort: PriceSort,
    /// 1-based.
    pub page: u32,
    pub limit: u32,
}

impl SearchRequest {
    fn admits(&self, product: &Product) -> bool {
        self.store.is_none_or(|s| product.store == s)
            && self
                .category
                .as_deref()
                .is_none_or(|c| product.category == c)
            && self
                .brand
                .as_deref()
                .is_none_or(|b| product.brand.as_deref() == Some(b))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: usize,
    pub page: u32,
    pub pages: usize,
    pub limit: u32,
}

impl ProductPage {
    /// Slices one page out of the full ordered result set.
    #[must_use]
    pub fn paginate(all: Vec<Product>, page: u32, limit: u32) -> Self {
        let total = all.len();
        let per_page = limit.max(1) as usize;
        let offset = (page.max(1) as usize - 1).saturating_mul(per_page);
        Self {
            products: all.into_iter().skip(offset).take(per_page).collect(),
            total,
            page,
            pages: total.div_ceil(per_page),
            limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Ranked(ProductPage),
    /// The encoder or index could not serve the query; fall back to the catalog.
    IndexUnavailable,
}

pub struct MatchEngine<E, I, C> {
    retriever: CandidateRetriever<E, I>,
    catalog: C,
    ranker: RelevanceRanker,
    selector: MatchSelector,
    comparator: BasketComparator,
    pool_size: usize,
}

impl<E, I, C> MatchEngine<E, I, C>
where
    E: Encoder,
    I: VectorIndex,
    C: ProductCatalog,
{
    pub fn new(tuning: &Tuning, encoder: E, index: I, catalog: C) -> Self {
        let matching = tuning.matching;
        Self {
            retriever: CandidateRetriever::new(
                encoder,
                index,
                matching.retrieval_floor,
                matching.search_floor,
            ),
            catalog,
            ranker: RelevanceRanker::new(tuning.ranking),
            selector: MatchSelector::new(IdentityScorer::new(matching)),
            comparator: BasketComparator,
            pool_size: matching.candidate_pool_size,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Semantic product search, ranked and paginated.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::Catalog`] if hydrating hits from the catalog
    /// fails. Index failures are not errors; they yield
    /// [`SearchOutcome::IndexUnavailable`].
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome, MatchError> {
        let top_k = (request.limit as usize)
            .saturating_mul(request.page.max(1) as usize)
            .saturating_add(SEARCH_HEADROOM);
        let filter = IndexFilter {
            store: request.store.map(StoreFilter::Only),
            category: request.category.clone(),
            brand: request.brand.clone(),
        };

        let hits = match self.retriever.search(&request.query, &filter, top_k).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(error = %e, query = %request.query, "semantic search unavailable");
                return Ok(SearchOutcome::IndexUnavailable);
            }
        };

        let mut seen = HashSet::new();
        let ids: Vec<i64> = hits
            .iter()
            .map(|c| c.product.id)
            .filter(|id| seen.insert(*id))
            .collect();
        let vector_scores: HashMap<i64, f32> = hits
            .iter()
            .map(|c| (c.product.id, c.similarity))
            .collect();

        let hydrated = if ids.is_empty() {
            Vec::new()
        } else {
            self.catalog
                .list_by_ids(&ids)
                .await
                .map_err(MatchError::catalog)?
        };
        let products: Vec<Product> = hydrated
            .into_iter()
            .filter(|p| request.admits(p))
            .collect();

        let mut ranked = self.ranker.rank(&request.query, products, &vector_scores);
        sort_by_price(&mut ranked, request.sort);

        let page = ProductPage::paginate(ranked, request.page, request.limit);
        tracing::info!(
            query = %request.query,
            hits = hits.len(),
            total = page.total,
            page = page.page,
            "semantic search completed"
        );
        Ok(SearchOutcome::Ranked(page))
    }

    /// Cross-store matches for a catalog product.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::UnknownProduct`] if the id is not in the
    /// catalog, or [`MatchError::Catalog`] if the lookup itself fails.
    pub async fn alternatives(&self, product_id: i64) -> Result<Vec<Match>, MatchError> {
        let product = self
            .catalog
            .get_by_id(product_id)
            .await
            .map_err(MatchError::catalog)?
            .ok_or(MatchError::UnknownProduct(product_id))?;
        Ok(self.alternatives_for(&product).await)
    }

    /// Cross-store matches for an already-loaded product. Never fails:
    /// collaborator errors degrade to fewer or no matches.
    pub async fn alternatives_for(&self, product: &Product) -> Vec<Match> {
        let candidates = self
            .retriever
            .retrieve(product, product.store, self.pool_size)
            .await;
        let matches = self.selector.select(product, candidates);
        self.hydrate(matches).await
    }

    /// [`Self::alternatives_for`] for several products, run concurrently.
    /// Output order follows `products`.
    pub async fn alternatives_for_many(&self, products: &[Product]) -> Vec<Vec<Match>> {
        join_all(products.iter().map(|p| self.alternatives_for(p))).await
    }

    /// Matches every cart line across stores and compares the baskets.
    pub async fn compare_cart(&self, lines: &[CartLine]) -> BasketComparison {
        let products: Vec<Product> = lines.iter().map(|l| l.product.clone()).collect();
        let per_line = self.alternatives_for_many(&products).await;

        let matches: HashMap<i64, Vec<Match>> = lines
            .iter()
            .zip(per_line)
            .map(|(line, found)| (line.product.id, found))
            .collect();

        let comparison = self.comparator.compare(lines, &matches);
        tracing::info!(
            lines = lines.len(),
            best_total = %comparison.best_deal.total,
            savings = %comparison.best_deal.savings,
            "cart comparison completed"
        );
        comparison
    }

    /// Swaps index projections for catalog records.
    ///
    /// Matches whose product has left the catalog are dropped. If the
    /// catalog cannot be reached the projections are kept as-is.
    async fn hydrate(&self, matches: Vec<Match>) -> Vec<Match> {
        let ids: Vec<i64> = matches.iter().filter_map(Match::product_id).collect();
        if ids.is_empty() {
            return matches;
        }

        let fresh: HashMap<i64, Product> = match self.catalog.list_by_ids(&ids).await {
            Ok(products) => products.into_iter().map(|p| (p.id, p)).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "catalog hydration failed; keeping index metadata");
                return matches;
            }
        };

        matches
            .into_iter()
            .filter_map(|mut m| {
                let id = m.product_id()?;
                m.product = Some(fresh.get(&id)?.clone());
                Some(m)
            })
            .collect()
    }
}
