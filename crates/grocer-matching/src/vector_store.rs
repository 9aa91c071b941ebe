//! Nearest-neighbour lookup: the [`VectorIndex`] seam and its Qdrant client.

use std::future::Future;
use std::time::Duration;

use grocer_core::Store;
use serde::{Deserialize, Serialize};

use crate::embeddings::{EncodedText, SparseTerms};
use crate::error::MatchError;

/// Named vector holding the dense product-name embedding.
const DENSE_VECTOR: &str = "dense";
/// Named vector holding the keyword terms.
const SPARSE_VECTOR: &str = "sparse";
/// Each prefetch branch recalls this many times `top_k` before dense rescoring.
const PREFETCH_FACTOR: usize = 4;

/// Restricts a query on the `store` payload field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFilter {
    Only(Store),
    Exclude(Store),
}

/// Metadata filter applied by the index before ranking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexFilter {
    pub store: Option<StoreFilter>,
    pub category: Option<String>,
    pub brand: Option<String>,
}

impl IndexFilter {
    #[must_use]
    pub fn excluding_store(store: Store) -> Self {
        Self {
            store: Some(StoreFilter::Exclude(store)),
            ..Self::default()
        }
    }
}

/// Product metadata stored alongside each vector.
///
/// Field names follow the payload written by the indexing job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPayload {
    pub product_id: i64,
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub category: String,
    pub store: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub product_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// One ranked result from the index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    /// Similarity in `[0, 1]`.
    pub score: f32,
    pub payload: ProductPayload,
}

/// Searches stored product vectors.
pub trait VectorIndex: Send + Sync {
    fn query(
        &self,
        query: &EncodedText,
        filter: &IndexFilter,
        top_k: usize,
    ) -> impl Future<Output = Result<Vec<IndexHit>, MatchError>> + Send;
}

/// Qdrant HTTP client using the Query API.
///
/// With keyword terms present, both the sparse and dense vectors prefetch
/// candidates and the union is rescored by dense cosine similarity, so
/// returned scores stay on the `[0, 1]` similarity scale.
pub struct QdrantIndex {
    client: reqwest::Client,
    query_url: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum QueryVector<'a> {
    Dense(&'a [f32]),
    Sparse(&'a SparseTerms),
}

#[derive(Serialize)]
struct Prefetch<'a> {
    query: QueryVector<'a>,
    using: &'static str,
    limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a QdrantFilter>,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    prefetch: Vec<Prefetch<'a>>,
    query: QueryVector<'a>,
    using: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a QdrantFilter>,
    limit: usize,
    with_payload: bool,
}

#[derive(Debug, Default, Serialize)]
struct QdrantFilter {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    must: Vec<FieldCondition>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    must_not: Vec<FieldCondition>,
}

#[derive(Debug, Serialize)]
struct FieldCondition {
    key: &'static str,
    #[serde(rename = "match")]
    matches: MatchValue,
}

#[derive(Debug, Serialize)]
struct MatchValue {
    value: String,
}

#[derive(Deserialize)]
struct QueryResponse {
    result: QueryResult,
}

#[derive(Deserialize)]
struct QueryResult {
    points: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
struct ScoredPoint {
    score: f32,
    #[serde(default)]
    payload: Option<serde_json::Value>,
}

impl QdrantFilter {
    fn from_index_filter(filter: &IndexFilter) -> Option<Self> {
        let mut out = Self::default();
        let condition = |key, value: &str| FieldCondition {
            key,
            matches: MatchValue {
                value: value.to_string(),
            },
        };

        match filter.store {
            Some(StoreFilter::Only(store)) => out.must.push(condition("store", store.as_str())),
            Some(StoreFilter::Exclude(store)) => {
                out.must_not.push(condition("store", store.as_str()));
            }
            None => {}
        }
        if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
            out.must.push(condition("category", category));
        }
        if let Some(brand) = filter.brand.as_deref().filter(|b| !b.is_empty()) {
            out.must.push(condition("brand", brand));
        }

        if out.must.is_empty() && out.must_not.is_empty() {
            None
        } else {
            Some(out)
        }
    }
}

impl QdrantIndex {
    /// Create a new `QdrantIndex` for `collection` on the server at `qdrant_url`.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        qdrant_url: &str,
        collection: &str,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, MatchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            query_url: format!(
                "{}/collections/{collection}/points/query",
                qdrant_url.trim_end_matches('/')
            ),
            api_key,
        })
    }
}

impl VectorIndex for QdrantIndex {
    async fn query(
        &self,
        query: &EncodedText,
        filter: &IndexFilter,
        top_k: usize,
    ) -> Result<Vec<IndexHit>, MatchError> {
        let qdrant_filter = QdrantFilter::from_index_filter(filter);
        let prefetch_limit = top_k.saturating_mul(PREFETCH_FACTOR);

        let prefetch = if query.sparse.is_empty() {
            Vec::new()
        } else {
            vec![
                Prefetch {
                    query: QueryVector::Sparse(&query.sparse),
                    using: SPARSE_VECTOR,
                    limit: prefetch_limit,
                    filter: qdrant_filter.as_ref(),
                },
                Prefetch {
                    query: QueryVector::Dense(&query.dense),
                    using: DENSE_VECTOR,
                    limit: prefetch_limit,
                    filter: qdrant_filter.as_ref(),
                },
            ]
        };

        let body = QueryRequest {
            prefetch,
            query: QueryVector::Dense(&query.dense),
            using: DENSE_VECTOR,
            filter: qdrant_filter.as_ref(),
            limit: top_k,
            with_payload: true,
        };

        let mut request = self.client.post(&self.query_url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("api-key", key);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| MatchError::Index(format!("query request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(MatchError::Index(format!(
                "query returned status {}",
                resp.status()
            )));
        }

        let parsed: QueryResponse = resp
            .json()
            .await
            .map_err(|e| MatchError::Index(format!("query response parse error: {e}")))?;

        let returned = parsed.result.points.len();
        let hits: Vec<IndexHit> = parsed
            .result
            .points
            .into_iter()
            .filter_map(|point| {
                let payload = point.payload?;
                match serde_json::from_value::<ProductPayload>(payload) {
                    Ok(payload) => Some(IndexHit {
                        score: point.score.clamp(0.0, 1.0),
                        payload,
                    }),
                    Err(e) => {
                        tracing::warn!(error = %e, "skipping Qdrant point with malformed payload");
                        None
                    }
                }
            })
            .collect();

        tracing::debug!(returned, kept = hits.len(), top_k, "Qdrant query completed");

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_serializes_to_nothing() {
        assert!(QdrantFilter::from_index_filter(&IndexFilter::default()).is_none());
    }

    #[test]
    fn store_exclusion_becomes_must_not() {
        let filter = QdrantFilter::from_index_filter(&IndexFilter::excluding_store(Store::Iga))
            .expect("filter");
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "must_not": [{ "key": "store", "match": { "value": "IGA" } }]
            })
        );
    }

    #[test]
    fn equality_filters_become_must() {
        let filter = QdrantFilter::from_index_filter(&IndexFilter {
            store: Some(StoreFilter::Only(Store::Coles)),
            category: Some("Dairy".to_string()),
            brand: Some(String::new()),
        })
        .expect("filter");
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(json["must"].as_array().map(Vec::len), Some(2));
        assert_eq!(json["must"][0]["match"]["value"], "Coles");
        assert_eq!(json["must"][1]["key"], "category");
        assert!(json.get("must_not").is_none());
    }

    #[test]
    fn sparse_query_vector_serializes_as_object() {
        let sparse = SparseTerms {
            indices: vec![3, 9],
            values: vec![0.5, 0.25],
        };
        let json = serde_json::to_value(QueryVector::Sparse(&sparse)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "indices": [3, 9], "values": [0.5, 0.25] })
        );
    }
}
