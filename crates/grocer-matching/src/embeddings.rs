//! Text encoding: the [`Encoder`] seam and its TEI (Text Embeddings Inference) client.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::MatchError;

/// Weighted keyword terms, in the `indices`/`values` layout sparse indexes expect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseTerms {
    pub indices: Vec<u32>,
    pub values: Vec<f32>,
}

impl SparseTerms {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Dense embedding plus keyword terms for one piece of text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodedText {
    pub dense: Vec<f32>,
    pub sparse: SparseTerms,
}

/// Turns text into vectors. Implementations must be deterministic for
/// identical input and free of side effects.
pub trait Encoder: Send + Sync {
    fn encode(&self, text: &str) -> impl Future<Output = Result<EncodedText, MatchError>> + Send;
}

/// TEI HTTP client.
///
/// Dense vectors come from `POST /embed`; keyword terms from
/// `POST /embed_sparse` when the server hosts a sparse model.
pub struct TeiEncoder {
    client: reqwest::Client,
    embed_url: String,
    sparse_url: Option<String>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a [&'a str],
}

#[derive(Deserialize)]
struct SparseValue {
    index: u32,
    value: f32,
}

impl TeiEncoder {
    /// Create a new `TeiEncoder` against `tei_url`.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(tei_url: &str, timeout_secs: u64, sparse: bool) -> Result<Self, MatchError> {
        let base = tei_url.trim_end_matches('/');
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            embed_url: format!("{base}/embed"),
            sparse_url: sparse.then(|| format!("{base}/embed_sparse")),
        })
    }

    async fn post_single<T: DeserializeOwned>(
        &self,
        url: &str,
        text: &str,
    ) -> Result<T, MatchError> {
        let inputs = [text];
        let response = self
            .client
            .post(url)
            .json(&EmbedRequest { inputs: &inputs })
            .send()
            .await
            .map_err(|e| MatchError::Encoder(format!("TEI request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(MatchError::Encoder(format!(
                "TEI returned status {} for {url}",
                response.status()
            )));
        }

        let mut batch: Vec<T> = response
            .json()
            .await
            .map_err(|e| MatchError::Encoder(format!("TEI response parse error: {e}")))?;

        if batch.len() != 1 {
            return Err(MatchError::Encoder(format!(
                "TEI returned {} results for 1 input",
                batch.len()
            )));
        }

        Ok(batch.swap_remove(0))
    }
}

impl Encoder for TeiEncoder {
    async fn encode(&self, text: &str) -> Result<EncodedText, MatchError> {
        let dense: Vec<f32> = self.post_single(&self.embed_url, text).await?;
        if dense.is_empty() {
            return Err(MatchError::Encoder("TEI returned an empty embedding".to_string()));
        }

        let sparse = match &self.sparse_url {
            Some(url) => {
                let mut values: Vec<SparseValue> = self.post_single(url, text).await?;
                values.sort_by_key(|v| v.index);
                SparseTerms {
                    indices: values.iter().map(|v| v.index).collect(),
                    values: values.iter().map(|v| v.value).collect(),
                }
            }
            None => SparseTerms::default(),
        };

        tracing::debug!(
            dense_dim = dense.len(),
            sparse_terms = sparse.indices.len(),
            "encoded text"
        );

        Ok(EncodedText { dense, sparse })
    }
}
