//! Canonicalization of OCR'd date strings.
//!
//! OCR often drops one of the two slashes of a `DD/MM/YYYY` date. The three
//! damaged layouts below are repaired; anything else is passed through
//! untouched for manual review downstream.

use once_cell::sync::Lazy;
use regex::Regex;

/// Accepted raw layouts: `DDMM/YYYY`, `DDMMYYYY` and `DD/MMYYYY`.
static DAMAGED_DATE_LAYOUTS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        r"^(?P<day>[0-9]{2})(?P<month>[0-9]{2})/(?P<year>[0-9]{4})$",
        r"^(?P<day>[0-9]{2})(?P<month>[0-9]{2})(?P<year>[0-9]{4})$",
        r"^(?P<day>[0-9]{2})/(?P<month>[0-9]{2})(?P<year>[0-9]{4})$",
    ]
    .map(|pattern| {
        Regex::new(pattern).unwrap_or_else(|e| panic!("Failed to compile regex pattern: {e}"))
    })
});

static CANONICAL_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{2}/[0-9]{2}/[0-9]{4}$")
        .unwrap_or_else(|e| panic!("Failed to compile regex pattern: {e}"))
});

/// Rewrites a damaged date into `DD/MM/YYYY`.
///
/// Surrounding whitespace is ignored when matching. Inputs that match none
/// of the accepted layouts, including already canonical dates, are returned
/// unchanged. Day and month values are not range-checked.
pub fn normalize_date(raw: &str) -> String {
    let trimmed = raw.trim();

    for layout in DAMAGED_DATE_LAYOUTS.iter() {
        if let Some(caps) = layout.captures(trimmed) {
            return format!("{}/{}/{}", &caps["day"], &caps["month"], &caps["year"]);
        }
    }

    raw.to_string()
}

/// Returns true when `value` is already in `DD/MM/YYYY` form.
pub fn is_canonical_date(value: &str) -> bool {
    CANONICAL_DATE.is_match(value.trim())
}
