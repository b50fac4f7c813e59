//! Conversions from the supplier's free-text feed columns.

use crate::error::{Result, SyncError};

/// Quantity text the supplier uses for "more than ten in stock".
const PLENTY_SENTINEL: &str = ">10";
/// Stock reported for [`PLENTY_SENTINEL`].
const PLENTY_COUNT: u64 = 100;
/// A single unit is held back as a display sample and never sold.
const SAMPLE_ONLY: &str = "1";

/// Parse a free-text price into whole currency units.
///
/// Everything from the first `.` on is dropped (kopecks are truncated, never
/// rounded), then every non-digit character is stripped.
///
/// ```
/// use core_sync::parse::parse_price_text;
///
/// assert_eq!(parse_price_text("5'990.00 руб.").unwrap(), 5990);
/// assert_eq!(parse_price_text("1200 руб.").unwrap(), 1200);
/// ```
///
/// # Errors
///
/// [`SyncError::InvalidPriceFormat`] when no digit precedes the first `.`, or
/// the value does not fit in `u64`.
pub fn parse_price_text(text: &str) -> Result<u64> {
    let whole = text.split('.').next().unwrap_or_default();
    let digits: String = whole.chars().filter(char::is_ascii_digit).collect();

    if digits.is_empty() {
        return Err(SyncError::InvalidPriceFormat {
            text: text.to_string(),
        });
    }

    digits.parse::<u64>().map_err(|_| SyncError::InvalidPriceFormat {
        text: text.to_string(),
    })
}

/// Map the supplier's quantity text to the stock count sent to marketplaces.
///
/// | Text | Count |
/// |------|-------|
/// | `">10"` | 100 |
/// | `"1"` | 0 |
/// | any other non-negative integer | itself |
///
/// Surrounding whitespace is ignored.
///
/// # Errors
///
/// [`SyncError::InvalidQuantityFormat`] for anything else.
pub fn normalize_stock_count(text: &str) -> Result<u64> {
    match text.trim() {
        PLENTY_SENTINEL => Ok(PLENTY_COUNT),
        SAMPLE_ONLY => Ok(0),
        other => other
            .parse::<u64>()
            .map_err(|_| SyncError::InvalidQuantityFormat {
                text: text.to_string(),
            }),
    }
}
