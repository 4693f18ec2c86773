//! Release-date handling.
//!
//! Feeds carry dates in the long US style with no time component
//! (`March 19, 2024`). Parsing never fails the run: anything that does not
//! match yields `None`.

use chrono::NaiveDate;

/// Long US date style, e.g. `January 5, 2024`.
pub const LONG_US_FORMAT: &str = "%B %d, %Y";

/// Medium display style, e.g. `Jan 5, 2024`.
pub const MEDIUM_US_FORMAT: &str = "%b %-d, %Y";

/// Parse a release date written in the long US style.
///
/// Surrounding whitespace is ignored. Returns `None` for anything else.
pub fn parse_release_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(text, LONG_US_FORMAT) {
        Ok(date) => Some(date),
        Err(e) => {
            log::debug!("Unparseable release date '{}': {}", text, e);
            None
        }
    }
}

/// Format a date in the medium display style.
pub fn format_medium(date: NaiveDate) -> String {
    date.format(MEDIUM_US_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_long_format() {
        assert_eq!(
            parse_release_date("January 5, 2024"),
            NaiveDate::from_ymd_opt(2024, 1, 5)
        );
        assert_eq!(
            parse_release_date("March 19, 2024"),
            NaiveDate::from_ymd_opt(2024, 3, 19)
        );
    }

    #[test]
    fn test_parse_tolerates_whitespace() {
        assert_eq!(
            parse_release_date("\n    December 31, 1999  "),
            NaiveDate::from_ymd_opt(1999, 12, 31)
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_release_date("not a date"), None);
        assert_eq!(parse_release_date(""), None);
        assert_eq!(parse_release_date("2024-01-05"), None);
        assert_eq!(parse_release_date("February 30, 2024"), None);
    }

    #[test]
    fn test_format_medium() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(format_medium(date), "Jan 5, 2024");
    }
}
