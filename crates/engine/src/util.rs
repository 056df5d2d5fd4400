//! Internal helpers for input normalization.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation so every operation trims and rejects input the same way.

use crate::{EngineError, ResultEngine};

/// Trim `value` and reject it when nothing is left.
pub(crate) fn normalize_required_text(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!("{label} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Trim `value`, mapping blank strings to `None`.
pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Validate a page request and turn it into `(limit, offset)` for queries.
pub(crate) fn page(limit: u64, offset: u64) -> ResultEngine<(u64, u64)> {
    if limit == 0 || limit > 200 {
        return Err(EngineError::Validation(
            "limit must be between 1 and 200".to_string(),
        ));
    }
    Ok((limit, offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_is_trimmed() {
        assert_eq!(
            normalize_required_text("  Dishes ", "title").unwrap(),
            "Dishes"
        );
        assert_eq!(
            normalize_required_text("   ", "title").unwrap_err(),
            EngineError::Validation("title must not be empty".to_string())
        );
    }

    #[test]
    fn blank_optional_text_becomes_none() {
        assert_eq!(normalize_optional_text(Some("  ")), None);
        assert_eq!(normalize_optional_text(None), None);
        assert_eq!(
            normalize_optional_text(Some(" ok ")),
            Some("ok".to_string())
        );
    }

    #[test]
    fn page_bounds() {
        assert!(page(0, 0).is_err());
        assert!(page(201, 0).is_err());
        assert_eq!(page(20, 40).unwrap(), (20, 40));
    }
}
