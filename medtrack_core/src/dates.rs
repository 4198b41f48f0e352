//! Calendar date helpers.
//!
//! Stored dates are plain calendar days with no time component. Older
//! inventories used a compact `MMDDYYYY` stamp, and the table prints
//! `DD-MM-YYYY`, so parsing accepts all three forms.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

/// Accepted input formats, tried in order
const FORMATS: [&str; 3] = ["%Y-%m-%d", "%d-%m-%Y", "%m%d%Y"];

/// Format used when rendering dates for people
pub const DISPLAY_FORMAT: &str = "%d-%m-%Y";

/// Parse a calendar date in any accepted format
///
/// Returns `None` for anything unparseable rather than an error; callers
/// treat an unknown date as "observed today".
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

/// Whole days from `last` to `today`, clamped at zero
///
/// A `today` earlier than `last` (clock skew, hand-edited file) yields 0 so
/// that negative elapsed time can never inflate stock.
pub fn days_elapsed(last: Option<NaiveDate>, today: NaiveDate) -> u32 {
    let Some(last) = last else {
        return 0;
    };
    let days = today.signed_duration_since(last).num_days();
    if days < 0 {
        tracing::warn!(
            "Current date {} is before last update {}; treating as no elapsed time",
            today,
            last
        );
        return 0;
    }
    u32::try_from(days).unwrap_or(u32::MAX)
}

/// Serde helper for `last_updated` that maps malformed text to `None`
pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|text| {
        let parsed = parse_date(&text);
        if parsed.is_none() {
            tracing::warn!("Ignoring malformed last_updated value {:?}", text);
        }
        parsed
    }))
}
