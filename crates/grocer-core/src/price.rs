//! Numeric price derivation from scraped price strings.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

static FIRST_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+\.?\d*)").expect("valid price regex"));

/// Extracts the numeric value from a raw price string such as `"$12.99"`,
/// `"$2.50 each"` or `"$1,299.00"`.
///
/// Currency symbols and thousands separators are stripped, then the first
/// number in the remaining text is taken. Returns `None` when no number is
/// present, so callers never mistake an unparseable price for a free item.
#[must_use]
pub fn parse_price(raw: &str) -> Option<Decimal> {
    let cleaned = raw.replace(['$', ','], "");
    let cleaned = cleaned.trim();
    let captured = FIRST_NUMBER.captures(cleaned)?.get(1)?.as_str();
    // "12." is accepted by the pattern but not by Decimal.
    Decimal::from_str(captured.trim_end_matches('.')).ok()
}
