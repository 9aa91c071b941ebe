//! Relevance ordering for free-text product search.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::LazyLock;

use grocer_core::{Product, RankingWeights};
use regex::Regex;

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("valid regex"));

/// Extra share of the exact-match bonus when the name starts with the query.
const PREFIX_SHARE: f64 = 0.5;
/// Extra share of the overlap weight when every query word is present.
const FULL_OVERLAP_SHARE: f64 = 0.3;
const PROXIMITY_WEIGHT: f64 = 10.0;
/// Character span at which the proximity bonus reaches zero.
const PROXIMITY_SPAN: f64 = 100.0;

/// Optional post-ranking order requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PriceSort {
    #[default]
    Relevance,
    PriceLow,
    PriceHigh,
}

impl FromStr for PriceSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "name" | "relevance" => Ok(Self::Relevance),
            "price_low" => Ok(Self::PriceLow),
            "price_high" => Ok(Self::PriceHigh),
            other => Err(format!(
                "unknown sort '{other}' (expected name, price_low or price_high)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RelevanceRanker {
    weights: RankingWeights,
}

impl RelevanceRanker {
    #[must_use]
    pub fn new(weights: RankingWeights) -> Self {
        Self { weights }
    }

    /// Additive relevance of `product` for `query`.
    #[must_use]
    pub fn relevance(&self, query: &str, product: &Product, vector_score: f32) -> f64 {
        let w = &self.weights;
        let query = query.trim().to_lowercase();
        let name = product.name.to_lowercase();
        let mut score = 0.0;

        if !query.is_empty() && name.contains(&query) {
            score += w.exact_match_bonus;
            if name.starts_with(&query) {
                score += w.exact_match_bonus * PREFIX_SHARE;
            }
        }

        let query_words = words(&query);
        if !query_words.is_empty() {
            let name_words = words(&name);
            let overlap = query_words.intersection(&name_words).count();
            #[allow(clippy::cast_precision_loss)]
            let share = overlap as f64 / query_words.len() as f64;
            score += share * w.word_overlap_weight;
            if overlap == query_words.len() {
                score += w.word_overlap_weight * FULL_OVERLAP_SHARE;
            }
        }

        if let Some(brand) = product.brand.as_deref().map(str::to_lowercase) {
            if !brand.is_empty() && query.contains(&brand) {
                score += w.brand_match_weight;
            }
        }

        score += f64::from(vector_score) * w.vector_weight;

        if query_words.len() > 1 {
            score += proximity(&name, &query_words) * PROXIMITY_WEIGHT;
        }

        score
    }

    /// Orders `products` by descending relevance.
    ///
    /// Ties fall back to store priority, then ascending product id, so the
    /// order is reproducible regardless of input order.
    #[must_use]
    pub fn rank(
        &self,
        query: &str,
        products: Vec<Product>,
        vector_scores: &HashMap<i64, f32>,
    ) -> Vec<Product> {
        let mut scored: Vec<(f64, Product)> = products
            .into_iter()
            .map(|product| {
                let vector_score = vector_scores.get(&product.id).copied().unwrap_or(0.0);
                (self.relevance(query, &product, vector_score), product)
            })
            .collect();

        scored.sort_by(|(sa, a), (sb, b)| {
            sb.total_cmp(sa)
                .then(a.store.cmp(&b.store))
                .then(a.id.cmp(&b.id))
        });

        scored.into_iter().map(|(_, product)| product).collect()
    }
}

/// Stable re-sort by numeric price.
///
/// `PriceLow` puts unpriced products last; `PriceHigh` treats them as zero.
pub fn sort_by_price(products: &mut [Product], sort: PriceSort) {
    match sort {
        PriceSort::Relevance => {}
        PriceSort::PriceLow => products.sort_by(|a, b| match (a.price_numeric, b.price_numeric) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }),
        PriceSort::PriceHigh => products.sort_by(|a, b| {
            let zero = rust_decimal::Decimal::ZERO;
            b.price_numeric
                .unwrap_or(zero)
                .cmp(&a.price_numeric.unwrap_or(zero))
        }),
    }
}

fn words(text: &str) -> HashSet<&str> {
    WORD_RE.find_iter(text).map(|m| m.as_str()).collect()
}

/// Closeness of the query words in `name`, in `[0, 1]`.
///
/// Each occurrence of each word anchors a window built from the nearest
/// occurrence of every query word; the narrowest window wins. Positions are
/// character offsets.
fn proximity(name: &str, query_words: &HashSet<&str>) -> f64 {
    let mut positions: Vec<Vec<usize>> = Vec::with_capacity(query_words.len());
    for word in query_words {
        let found = word_positions(name, word);
        if found.is_empty() {
            return 0.0;
        }
        positions.push(found);
    }

    let mut min_span = usize::MAX;
    for anchor in positions.iter().flatten().copied() {
        let (mut lo, mut hi) = (anchor, anchor);
        for occurrences in &positions {
            let closest = occurrences
                .iter()
                .copied()
                .min_by_key(|p| p.abs_diff(anchor))
                .unwrap_or(anchor);
            lo = lo.min(closest);
            hi = hi.max(closest);
        }
        min_span = min_span.min(hi - lo);
    }

    #[allow(clippy::cast_precision_loss)]
    let span = min_span as f64;
    (1.0 - span / PROXIMITY_SPAN).max(0.0)
}

/// Character offsets of whole-word occurrences of `word` in `text`.
fn word_positions(text: &str, word: &str) -> Vec<usize> {
    let Ok(re) = Regex::new(&format!(r"\b{}\b", regex::escape(word))) else {
        return Vec::new();
    };
    re.find_iter(text)
        .map(|m| text[..m.start()].chars().count())
        .collect()
}

#[cfg(test)]
mod tests {
    use grocer_core::Store;
    use rust_decimal::Decimal;

    use super::*;

    fn product(id: i64, name: &str, brand: Option<&str>, price: &str) -> Product {
        Product {
            id,
            name: name.to_string(),
            brand: brand.map(str::to_string),
            size: None,
            category: "Dairy".to_string(),
            store: Store::Woolworths,
            price: price.to_string(),
            price_numeric: None,
            product_url: None,
            image_url: None,
            last_scraped: None,
        }
        .repriced()
    }

    fn ranker() -> RelevanceRanker {
        RelevanceRanker::new(RankingWeights::default())
    }

    #[test]
    fn prefix_match_outscores_infix_match() {
        let ranker = ranker();
        let prefix = product(1, "milk chocolate block", None, "$4");
        let infix = product(2, "dark milk chocolate", None, "$4");
        let query = "milk chocolate";
        assert!(
            ranker.relevance(query, &prefix, 0.5) > ranker.relevance(query, &infix, 0.5),
            "prefix should win"
        );
    }

    #[test]
    fn single_word_exact_prefix_score() {
        // exact 100 + prefix 50 + overlap 50 + full overlap 15 + vector 0
        let score = ranker().relevance("Milk", &product(1, "Milk 2L", None, "$3"), 0.0);
        assert!((score - 215.0).abs() < 1e-9);
    }

    #[test]
    fn brand_in_query_adds_bonus() {
        let ranker = ranker();
        let branded = product(1, "Greek Yoghurt", Some("Chobani"), "$6");
        let plain = product(2, "Greek Yoghurt", None, "$6");
        let diff = ranker.relevance("chobani greek yoghurt", &branded, 0.0)
            - ranker.relevance("chobani greek yoghurt", &plain, 0.0);
        assert!((diff - 30.0).abs() < 1e-9);
    }

    #[test]
    fn vector_score_is_weighted() {
        let ranker = ranker();
        let p = product(1, "Bread", None, "$3");
        let diff = ranker.relevance("rice", &p, 1.0) - ranker.relevance("rice", &p, 0.0);
        assert!((diff - 20.0).abs() < 1e-9);
    }

    #[test]
    fn proximity_rewards_adjacent_words() {
        let words: HashSet<&str> = ["peanut", "butter"].into_iter().collect();
        let adjacent = proximity("peanut butter smooth", &words);
        let apart = proximity("peanut cookies with real butter", &words);
        // "butter" starts 7 chars after "peanut"
        assert!((adjacent - 0.93).abs() < 1e-9);
        assert!(adjacent > apart);
        assert!(proximity("peanut cookies", &words).abs() < f64::EPSILON);
    }

    #[test]
    fn proximity_uses_whole_words() {
        let words: HashSet<&str> = ["oat", "milk"].into_iter().collect();
        assert!(proximity("goat milk", &words).abs() < f64::EPSILON);
    }

    #[test]
    fn ties_break_by_store_then_id() {
        let mut a = product(9, "Eggs", None, "$5");
        a.store = Store::Coles;
        let b = product(7, "Eggs", None, "$5");
        let c = product(3, "Eggs", None, "$5");
        let ranked = ranker().rank("eggs", vec![a, b, c], &HashMap::new());
        let ids: Vec<i64> = ranked.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 7, 9]);
    }

    #[test]
    fn rank_uses_vector_scores_by_id() {
        let first = product(1, "Cheddar", None, "$5");
        let second = product(2, "Cheddar", None, "$5");
        let scores = HashMap::from([(2, 0.9f32), (1, 0.1f32)]);
        let ranked = ranker().rank("tasty cheese", vec![first, second], &scores);
        assert_eq!(ranked[0].id, 2);
    }

    #[test]
    fn price_low_puts_unpriced_last() {
        let mut products = vec![
            product(1, "A", None, "N/A"),
            product(2, "B", None, "$5.00"),
            product(3, "C", None, "$2.50"),
        ];
        sort_by_price(&mut products, PriceSort::PriceLow);
        let ids: Vec<i64> = products.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn price_high_treats_unpriced_as_zero() {
        let mut products = vec![
            product(1, "A", None, "N/A"),
            product(2, "B", None, "$5.00"),
            product(3, "C", None, "$0.00"),
        ];
        sort_by_price(&mut products, PriceSort::PriceHigh);
        let ids: Vec<i64> = products.iter().map(|p| p.id).collect();
        // stable: the unpriced item keeps its place ahead of the zero-priced one
        assert_eq!(ids, vec![2, 1, 3]);
        assert_eq!(products[0].price_numeric, Some(Decimal::from(5)));
    }

    #[test]
    fn parses_sort_names() {
        assert_eq!("name".parse::<PriceSort>().unwrap(), PriceSort::Relevance);
        assert_eq!("PRICE_LOW".parse::<PriceSort>().unwrap(), PriceSort::PriceLow);
        assert_eq!("price_high".parse::<PriceSort>().unwrap(), PriceSort::PriceHigh);
        assert!("cheapest".parse::<PriceSort>().is_err());
    }
}
