//! Per-store basket totals and the cheapest cross-store combination.

use std::collections::HashMap;

use grocer_core::Store;
use rust_decimal::Decimal;

use crate::types::{
    BasketComparison, BasketLine, BestDealBasket, BestDealItem, CartLine, Match, StoreBasket,
    StoreCombination,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct BasketComparator;

impl BasketComparator {
    /// Prices `lines` at every store and derives the best deal.
    ///
    /// `matches` is keyed by the original product id; a line with no entry
    /// is treated as having no cross-store matches.
    #[must_use]
    pub fn compare(
        &self,
        lines: &[CartLine],
        matches: &HashMap<i64, Vec<Match>>,
    ) -> BasketComparison {
        let stores: Vec<StoreBasket> = Store::ALL
            .into_iter()
            .map(|store| store_basket(store, lines, matches))
            .collect();

        let best_deal = best_deal(lines, &stores);
        let best_single_store = best_combination(
            Store::ALL.into_iter().map(|s| vec![s]),
            lines.len(),
            &stores,
        );
        let best_two_store = best_combination(store_pairs(), lines.len(), &stores);

        tracing::debug!(
            lines = lines.len(),
            best_total = %best_deal.total,
            savings = %best_deal.savings,
            "compared basket"
        );

        BasketComparison {
            stores,
            best_deal,
            best_single_store,
            best_two_store,
        }
    }
}

fn store_basket(
    store: Store,
    lines: &[CartLine],
    matches: &HashMap<i64, Vec<Match>>,
) -> StoreBasket {
    let mut items: Vec<BasketLine> = lines
        .iter()
        .map(|line| basket_line(store, line, matches.get(&line.product.id)))
        .collect();

    let mut total = Decimal::ZERO;
    for item in &mut items {
        let Some(price) = item.line_total else {
            continue;
        };
        if let Some(sum) = total.checked_add(price) {
            total = sum;
        } else {
            tracing::warn!(
                store = store.as_str(),
                original_id = item.entry.original_id,
                "basket total overflows; treating line as unpriced"
            );
            item.line_total = None;
            item.entry = Match::unavailable(item.entry.original_id, store);
        }
    }
    let total = total.round_dp(2);
    let available_count = items.iter().filter(|item| item.entry.is_available).count();

    StoreBasket {
        store,
        missing_count: items.len() - available_count,
        items,
        total,
        available_count,
    }
}

fn basket_line(store: Store, line: &CartLine, matches: Option<&Vec<Match>>) -> BasketLine {
    let original = &line.product;
    if original.store == store {
        return BasketLine {
            quantity: line.quantity,
            line_total: Some(original.line_price(line.quantity).unwrap_or(Decimal::ZERO)),
            entry: Match::original(original),
        };
    }

    let chosen = matches.and_then(|found| pick_for_store(store, found));
    let priced = chosen.and_then(|m| {
        let price = m.product.as_ref()?.line_price(line.quantity)?;
        Some((m.clone(), price))
    });

    match priced {
        Some((entry, price)) => BasketLine {
            quantity: line.quantity,
            line_total: Some(price),
            entry,
        },
        None => BasketLine {
            quantity: line.quantity,
            line_total: None,
            entry: Match::unavailable(original.id, store),
        },
    }
}

/// The primary match for `store`, else its highest-scoring fallback.
fn pick_for_store(store: Store, matches: &[Match]) -> Option<&Match> {
    let in_store = || matches.iter().filter(move |m| m.store == store && m.is_available);
    in_store().find(|m| !m.is_fallback).or_else(|| {
        in_store().filter(|m| m.is_fallback).min_by(|a, b| {
            b.identical_score
                .total_cmp(&a.identical_score)
                .then(a.product_id().cmp(&b.product_id()))
        })
    })
}

fn best_deal(lines: &[CartLine], stores: &[StoreBasket]) -> BestDealBasket {
    let mut items = Vec::with_capacity(lines.len());
    let mut original_total = Decimal::ZERO;
    let mut total = Decimal::ZERO;

    for (idx, line) in lines.iter().enumerate() {
        let original_price = line
            .product
            .line_price(line.quantity)
            .unwrap_or(Decimal::ZERO);
        let Some(next_original) = original_total.checked_add(original_price) else {
            tracing::warn!(
                original_id = line.product.id,
                "best-deal total overflows; skipping line"
            );
            continue;
        };

        // The original's own store always offers a priced line, so this is
        // never empty for a well-formed basket.
        let (best, best_price) = match cheapest(stores.iter(), idx) {
            Some((best, price)) => (Some(best), price),
            None => (None, original_price),
        };
        let Some(next_total) = total.checked_add(best_price) else {
            tracing::warn!(
                original_id = line.product.id,
                "best-deal total overflows; skipping line"
            );
            continue;
        };
        original_total = next_original;
        total = next_total;
        let Some(best) = best else {
            continue;
        };

        if let Some(product) = best.entry.product.clone() {
            items.push(BestDealItem {
                original_id: line.product.id,
                quantity: line.quantity,
                store: best.entry.store,
                product,
                original_price,
                best_price,
                savings: (original_price - best_price).max(Decimal::ZERO),
                is_fallback: best.entry.is_fallback,
            });
        }
    }

    let original_total = original_total.round_dp(2);
    let total = total.round_dp(2);
    BestDealBasket {
        items,
        original_total,
        total,
        savings: (original_total - total).max(Decimal::ZERO),
    }
}

/// Cheapest priced line `idx` among `stores`; ties go to store priority,
/// then product id.
fn cheapest<'a>(
    stores: impl Iterator<Item = &'a StoreBasket>,
    idx: usize,
) -> Option<(&'a BasketLine, Decimal)> {
    stores
        .filter_map(|basket| {
            let line = basket.items.get(idx)?;
            let price = line.line_total?;
            line.entry.is_available.then_some((line, price))
        })
        .min_by(|(a, pa), (b, pb)| {
            pa.cmp(pb)
                .then(a.entry.store.cmp(&b.entry.store))
                .then(a.entry.product_id().cmp(&b.entry.product_id()))
        })
}

fn store_pairs() -> impl Iterator<Item = Vec<Store>> {
    Store::ALL.into_iter().enumerate().flat_map(|(i, first)| {
        Store::ALL
            .into_iter()
            .skip(i + 1)
            .map(move |second| vec![first, second])
    })
}

/// Best subset among `subsets`: most lines covered, then lowest total.
/// Earlier subsets win remaining ties.
fn best_combination(
    subsets: impl Iterator<Item = Vec<Store>>,
    line_count: usize,
    baskets: &[StoreBasket],
) -> Option<StoreCombination> {
    if line_count == 0 {
        return None;
    }

    let mut best: Option<StoreCombination> = None;
    for stores in subsets {
        let chosen: Vec<&StoreBasket> = baskets
            .iter()
            .filter(|b| stores.contains(&b.store))
            .collect();

        let mut covered_count = 0;
        let mut total = Decimal::ZERO;
        for idx in 0..line_count {
            let sum = cheapest(chosen.iter().copied(), idx)
                .and_then(|(_, price)| total.checked_add(price));
            if let Some(sum) = sum {
                covered_count += 1;
                total = sum;
            }
        }

        let candidate = StoreCombination {
            stores,
            total: total.round_dp(2),
            covered_count,
            missing_count: line_count - covered_count,
        };
        let better = best.as_ref().is_none_or(|current| {
            candidate.covered_count > current.covered_count
                || (candidate.covered_count == current.covered_count
                    && candidate.total < current.total)
        });
        if better {
            best = Some(candidate);
        }
    }
    best
}

#[cfg(test)]
#[path = "basket_test.rs"]
mod tests;
