//! Picks one primary match per store and offers disclosed fallbacks where
//! no confident match exists.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use grocer_core::{Product, Store};

use crate::identity::IdentityScorer;
use crate::types::{ApprovalTier, Candidate, FallbackKind, IdentityScore, Match};

#[derive(Debug, Clone, Copy)]
pub struct MatchSelector {
    scorer: IdentityScorer,
}

impl MatchSelector {
    #[must_use]
    pub fn new(scorer: IdentityScorer) -> Self {
        Self { scorer }
    }

    /// Builds the matches for `original` from its retrieved `candidates`.
    ///
    /// Each other store yields zero to three entries: an optional primary
    /// plus up to two fallbacks when the primary is absent or needs approval.
    /// The result is ordered by `identical_score` descending, then store
    /// priority, then product id.
    #[must_use]
    pub fn select(&self, original: &Product, candidates: Vec<Candidate>) -> Vec<Match> {
        let mut pools: BTreeMap<Store, Vec<Candidate>> = BTreeMap::new();
        for candidate in candidates {
            if candidate.product.store != original.store {
                pools.entry(candidate.product.store).or_default().push(candidate);
            }
        }

        let mut matches = Vec::new();
        for (store, pool) in pools {
            let primary = self.best_primary(original, &pool);
            let needs_fallbacks = primary
                .as_ref()
                .is_none_or(|(_, identity)| identity.tier != ApprovalTier::AutoApproved);
            let primary_id = primary.as_ref().map(|(candidate, _)| candidate.product.id);

            if needs_fallbacks {
                matches.extend(fallbacks(original, &pool, primary_id));
            }
            if let Some((candidate, identity)) = primary {
                matches.push(Match::primary(original.id, candidate.clone(), identity));
            }
            tracing::debug!(
                original_id = original.id,
                %store,
                pool = pool.len(),
                ?primary_id,
                "selected store matches"
            );
        }

        matches.sort_by(|a, b| {
            b.identical_score
                .total_cmp(&a.identical_score)
                .then(a.store.cmp(&b.store))
                .then(a.product_id().cmp(&b.product_id()))
        });
        matches
    }

    fn best_primary<'a>(
        &self,
        original: &Product,
        pool: &'a [Candidate],
    ) -> Option<(&'a Candidate, IdentityScore)> {
        pool.iter()
            .map(|candidate| {
                let identity = self
                    .scorer
                    .score(original, &candidate.product, candidate.similarity);
                (candidate, identity)
            })
            .filter(|(_, identity)| identity.tier != ApprovalTier::Rejected)
            .min_by(|(a, sa), (b, sb)| {
                sb.score
                    .total_cmp(&sa.score)
                    .then(b.similarity.total_cmp(&a.similarity))
                    .then(a.product.id.cmp(&b.product.id))
            })
    }
}

/// Up to two unscored substitutes from one store's pool.
fn fallbacks(original: &Product, pool: &[Candidate], primary_id: Option<i64>) -> Vec<Match> {
    let size = original.normalized_size();
    let brand = original.normalized_brand();
    let eligible = || {
        pool.iter()
            .filter(move |c| Some(c.product.id) != primary_id)
    };

    let mut out = Vec::with_capacity(2);

    if let Some(size) = size.as_ref() {
        let pick = most_similar(eligible().filter(|c| {
            c.product.normalized_size().as_ref() == Some(size)
                && c.product.normalized_brand() != brand
        }));
        if let Some(candidate) = pick {
            out.push(Match::fallback(
                original.id,
                candidate.clone(),
                FallbackKind::SameSizeDiffBrand,
            ));
        }
    }

    if let Some(brand) = brand.as_ref() {
        let pick = most_similar(eligible().filter(|c| {
            c.product.normalized_brand().as_ref() == Some(brand)
                && c.product.normalized_size() != size
        }));
        if let Some(candidate) = pick {
            out.push(Match::fallback(
                original.id,
                candidate.clone(),
                FallbackKind::SameBrandDiffSize,
            ));
        }
    }

    out
}

fn most_similar<'a>(candidates: impl Iterator<Item = &'a Candidate>) -> Option<&'a Candidate> {
    candidates.min_by(|a, b| match b.similarity.total_cmp(&a.similarity) {
        Ordering::Equal => a.product.id.cmp(&b.product.id),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use grocer_core::MatchingTuning;

    use super::*;

    fn product(id: i64, store: Store, brand: Option<&str>, size: Option<&str>) -> Product {
        Product {
            id,
            name: format!("Product {id}"),
            brand: brand.map(str::to_string),
            size: size.map(str::to_string),
            category: "Pantry".to_string(),
            store,
            price: "$3.00".to_string(),
            price_numeric: None,
            product_url: None,
            image_url: None,
            last_scraped: None,
        }
    }

    fn candidate(
        id: i64,
        store: Store,
        brand: Option<&str>,
        size: Option<&str>,
        similarity: f32,
    ) -> Candidate {
        Candidate {
            product: product(id, store, brand, size),
            similarity,
        }
    }

    fn selector() -> MatchSelector {
        MatchSelector::new(IdentityScorer::new(MatchingTuning::default()))
    }

    fn original() -> Product {
        product(1, Store::Iga, Some("Acme"), Some("500g"))
    }

    #[test]
    fn auto_approved_primary_gets_no_fallbacks() {
        let matches = selector().select(
            &original(),
            vec![
                candidate(10, Store::Coles, Some("Acme"), Some("500g"), 0.9),
                candidate(11, Store::Coles, Some("Other"), Some("500g"), 0.8),
                candidate(12, Store::Coles, Some("Acme"), Some("1kg"), 0.8),
            ],
        );
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].product_id(), Some(10));
        assert_eq!(matches[0].approval, Some(ApprovalTier::AutoApproved));
        assert!(!matches[0].needs_approval);
        assert!(!matches[0].is_fallback);
    }

    #[test]
    fn needs_approval_primary_gets_both_fallbacks() {
        // Brand mismatch keeps the best candidate below auto-approval.
        let matches = selector().select(
            &original(),
            vec![
                candidate(20, Store::Woolworths, Some("Other"), Some("500g"), 0.9),
                candidate(21, Store::Woolworths, Some("Budget"), Some("500g"), 0.7),
                candidate(22, Store::Woolworths, Some("Acme"), Some("1kg"), 0.6),
            ],
        );

        let primary: Vec<_> = matches.iter().filter(|m| !m.is_fallback).collect();
        assert_eq!(primary.len(), 1);
        assert_eq!(primary[0].product_id(), Some(20));
        assert_eq!(primary[0].approval, Some(ApprovalTier::NeedsApproval));

        let same_size = matches
            .iter()
            .find(|m| m.fallback_type == Some(FallbackKind::SameSizeDiffBrand))
            .expect("same-size fallback");
        assert_eq!(same_size.product_id(), Some(21));
        assert!(same_size.size_matched && !same_size.brand_matched);
        assert!(same_size.needs_approval);
        assert!((same_size.identical_score - f64::from(0.7f32)).abs() < 1e-9);

        let same_brand = matches
            .iter()
            .find(|m| m.fallback_type == Some(FallbackKind::SameBrandDiffSize))
            .expect("same-brand fallback");
        assert_eq!(same_brand.product_id(), Some(22));
        assert!(!same_brand.size_matched && same_brand.brand_matched);
    }

    #[test]
    fn store_without_primary_still_gets_fallbacks() {
        // Size mismatch plus low similarity is rejected as a primary.
        let matches = selector().select(
            &original(),
            vec![candidate(30, Store::Coles, Some("Acme"), Some("2kg"), 0.45)],
        );
        assert_eq!(matches.len(), 1);
        assert!(matches[0].is_fallback);
        assert_eq!(matches[0].fallback_type, Some(FallbackKind::SameBrandDiffSize));
    }

    #[test]
    fn missing_original_size_disables_same_size_fallback() {
        let original = product(1, Store::Iga, Some("Acme"), None);
        let matches = selector().select(
            &original,
            vec![
                candidate(40, Store::Coles, Some("Other"), Some("500g"), 0.45),
                candidate(41, Store::Coles, Some("Acme"), Some("500g"), 0.44),
            ],
        );
        assert!(matches
            .iter()
            .all(|m| m.fallback_type != Some(FallbackKind::SameSizeDiffBrand)));
    }

    #[test]
    fn own_store_candidates_are_ignored() {
        let matches = selector().select(
            &original(),
            vec![candidate(50, Store::Iga, Some("Acme"), Some("500g"), 0.99)],
        );
        assert!(matches.is_empty());
    }

    #[test]
    fn primary_ties_prefer_similarity_then_lower_id() {
        let original = product(1, Store::Iga, None, None);
        let matches = selector().select(
            &original,
            vec![
                candidate(61, Store::Coles, None, None, 0.9),
                candidate(60, Store::Coles, None, None, 0.9),
            ],
        );
        let primary = matches.iter().find(|m| !m.is_fallback).expect("primary");
        assert_eq!(primary.product_id(), Some(60));
    }

    #[test]
    fn at_most_one_auto_approved_per_store() {
        let matches = selector().select(
            &original(),
            vec![
                candidate(70, Store::Coles, Some("Acme"), Some("500g"), 0.95),
                candidate(71, Store::Coles, Some("Acme"), Some("500g"), 0.9),
                candidate(72, Store::Woolworths, Some("Acme"), Some("500g"), 0.85),
            ],
        );
        for store in [Store::Coles, Store::Woolworths] {
            let auto = matches
                .iter()
                .filter(|m| m.store == store && m.approval == Some(ApprovalTier::AutoApproved))
                .count();
            assert_eq!(auto, 1, "store {store}");
        }
    }

    #[test]
    fn result_is_ordered_by_score_then_store() {
        let original = product(1, Store::Coles, None, None);
        let matches = selector().select(
            &original,
            vec![
                candidate(80, Store::Woolworths, None, None, 0.8),
                candidate(81, Store::Iga, None, None, 0.8),
                candidate(82, Store::Iga, None, None, 0.5),
            ],
        );
        let order: Vec<_> = matches.iter().map(|m| (m.store, m.product_id())).collect();
        assert_eq!(
            order,
            vec![(Store::Iga, Some(81)), (Store::Woolworths, Some(80))]
        );
    }
}
