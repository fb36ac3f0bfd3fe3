//! Placeholder text for multi-row statements.

use crate::error::{DatabaseError, Result};

/// Build one parenthesized group of `columns` placeholders, e.g. `(?,?)`.
pub fn build_placeholder(columns: usize) -> Result<String> {
    build_placeholders(columns, 1)
}

/// Build `rows` comma separated groups of `columns` placeholders each.
///
/// `(2, 3)` yields `(?,?),(?,?),(?,?)`. An empty shape has no valid SQL
/// rendering, so callers must short-circuit before asking for one.
pub fn build_placeholders(columns: usize, rows: usize) -> Result<String> {
    debug_assert!(columns > 0 && rows > 0, "placeholder shape must be non-empty");
    if columns == 0 || rows == 0 {
        return Err(DatabaseError::EmptyPlaceholders { columns, rows });
    }

    let group = format!("({})", vec!["?"; columns].join(","));
    Ok(vec![group; rows].join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_group() {
        assert_eq!(build_placeholder(1).unwrap(), "(?)");
        assert_eq!(build_placeholder(3).unwrap(), "(?,?,?)");
    }

    #[test]
    fn two_columns_three_rows() {
        assert_eq!(build_placeholders(2, 3).unwrap(), "(?,?),(?,?),(?,?)");
    }

    #[test]
    fn placeholder_count_matches_shape() {
        for columns in 1..5 {
            for rows in 1..6 {
                let text = build_placeholders(columns, rows).unwrap();
                assert_eq!(text.matches('?').count(), columns * rows);
                assert_eq!(text.matches('(').count(), rows);
            }
        }
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn empty_shape_is_rejected() {
        assert!(matches!(
            build_placeholders(2, 0),
            Err(DatabaseError::EmptyPlaceholders { columns: 2, rows: 0 })
        ));
        assert!(build_placeholders(0, 1).is_err());
    }

    #[test]
    #[should_panic(expected = "placeholder shape must be non-empty")]
    #[cfg(debug_assertions)]
    fn empty_shape_is_fatal_in_debug_builds() {
        let _ = build_placeholders(2, 0);
    }
}
