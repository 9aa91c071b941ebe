use grocer_core::{Product, Store};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product returned by retrieval, with its raw similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub product: Product,
    /// Raw index similarity in `[0, 1]`.
    pub similarity: f32,
}

/// How confidently a candidate may stand in for the original product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalTier {
    AutoApproved,
    NeedsApproval,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IdentityScore {
    /// Bounded confidence in `[0, 1]`.
    pub score: f64,
    pub size_matched: bool,
    pub brand_matched: bool,
    pub tier: ApprovalTier,
}

/// Why a lower-confidence substitute was offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackKind {
    SameSizeDiffBrand,
    SameBrandDiffSize,
}

/// One store's answer for one original product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub original_id: i64,
    pub store: Store,
    /// `None` only for unavailable placeholders.
    pub product: Option<Product>,
    pub is_available: bool,
    pub identical_score: f64,
    pub size_matched: bool,
    pub brand_matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval: Option<ApprovalTier>,
    pub needs_approval: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_type: Option<FallbackKind>,
    pub is_fallback: bool,
}

impl Match {
    pub(crate) fn primary(original_id: i64, candidate: Candidate, identity: IdentityScore) -> Self {
        Self {
            original_id,
            store: candidate.product.store,
            product: Some(candidate.product),
            is_available: true,
            identical_score: identity.score,
            size_matched: identity.size_matched,
            brand_matched: identity.brand_matched,
            approval: Some(identity.tier),
            needs_approval: identity.tier != ApprovalTier::AutoApproved,
            fallback_type: None,
            is_fallback: false,
        }
    }

    pub(crate) fn fallback(original_id: i64, candidate: Candidate, kind: FallbackKind) -> Self {
        let same_size = kind == FallbackKind::SameSizeDiffBrand;
        Self {
            original_id,
            store: candidate.product.store,
            product: Some(candidate.product),
            is_available: true,
            identical_score: f64::from(candidate.similarity),
            size_matched: same_size,
            brand_matched: !same_size,
            approval: Some(ApprovalTier::NeedsApproval),
            needs_approval: true,
            fallback_type: Some(kind),
            is_fallback: true,
        }
    }

    /// The original product standing in for its own store.
    pub(crate) fn original(product: &Product) -> Self {
        Self {
            original_id: product.id,
            store: product.store,
            product: Some(product.clone()),
            is_available: true,
            identical_score: 1.0,
            size_matched: true,
            brand_matched: true,
            approval: None,
            needs_approval: false,
            fallback_type: None,
            is_fallback: false,
        }
    }

    pub(crate) fn unavailable(original_id: i64, store: Store) -> Self {
        Self {
            original_id,
            store,
            product: None,
            is_available: false,
            identical_score: 0.0,
            size_matched: false,
            brand_matched: false,
            approval: None,
            needs_approval: false,
            fallback_type: None,
            is_fallback: false,
        }
    }

    pub(crate) fn product_id(&self) -> Option<i64> {
        self.product.as_ref().map(|p| p.id)
    }
}

/// A cart product with its quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
}

impl CartLine {
    #[must_use]
    pub fn new(product: Product, quantity: u32) -> Self {
        Self {
            product,
            quantity: quantity.max(1),
        }
    }
}

/// One cart line as bought at a particular store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasketLine {
    pub quantity: u32,
    /// `None` when the store has no priced match for this line.
    pub line_total: Option<Decimal>,
    #[serde(flatten)]
    pub entry: Match,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreBasket {
    pub store: Store,
    pub items: Vec<BasketLine>,
    pub total: Decimal,
    pub available_count: usize,
    pub missing_count: usize,
}

/// The cheapest option for one cart line across every store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestDealItem {
    pub original_id: i64,
    pub quantity: u32,
    pub store: Store,
    pub product: Product,
    pub original_price: Decimal,
    pub best_price: Decimal,
    pub savings: Decimal,
    pub is_fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestDealBasket {
    pub items: Vec<BestDealItem>,
    pub original_total: Decimal,
    pub total: Decimal,
    pub savings: Decimal,
}

/// Buying the cart at one or two stores, each line at the cheaper of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreCombination {
    pub stores: Vec<Store>,
    pub total: Decimal,
    pub covered_count: usize,
    pub missing_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasketComparison {
    pub stores: Vec<StoreBasket>,
    pub best_deal: BestDealBasket,
    pub best_single_store: Option<StoreCombination>,
    pub best_two_store: Option<StoreCombination>,
}
