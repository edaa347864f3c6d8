//! Best-effort numeric interpretation of raw answer values.

/// Maps a raw answer value to its numeric form, if it has one.
///
/// A decimal comma is accepted in place of a decimal point ("3,5" reads as
/// 3.5). Empty, whitespace-only, unparseable and non-finite inputs map to
/// `None`. This classifies, it never fails; the raw text is kept
/// unconditionally by the caller either way.
pub fn coerce_numeric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_integer() {
        assert_eq!(coerce_numeric("4"), Some(4.0));
    }

    #[test]
    fn test_decimal_point() {
        assert_eq!(coerce_numeric("2.5"), Some(2.5));
    }

    #[test]
    fn test_decimal_comma() {
        assert_eq!(coerce_numeric("3,5"), Some(3.5));
    }

    #[test]
    fn test_negative_comma() {
        assert_eq!(coerce_numeric("-1,5"), Some(-1.5));
    }

    #[test]
    fn test_surrounding_whitespace() {
        assert_eq!(coerce_numeric("  7 "), Some(7.0));
    }

    #[test]
    fn test_empty() {
        assert_eq!(coerce_numeric(""), None);
    }

    #[test]
    fn test_whitespace_only() {
        assert_eq!(coerce_numeric("   "), None);
    }

    #[test]
    fn test_not_a_number() {
        assert_eq!(coerce_numeric("abc"), None);
    }

    #[test]
    fn test_multiple_commas() {
        // A comma-joined multi-choice value is not a number.
        assert_eq!(coerce_numeric("1,2,3"), None);
    }

    #[test]
    fn test_non_finite_rejected() {
        assert_eq!(coerce_numeric("inf"), None);
        assert_eq!(coerce_numeric("NaN"), None);
    }
}
