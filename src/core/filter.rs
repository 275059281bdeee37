use std::sync::Arc;

use crate::{core::options::CsvOptions, error::CsvError};

/// User predicate over a raw line and its 0-based ordinal; `true` skips the line.
pub type SkipRowPredicate = Arc<dyn Fn(&str, usize) -> bool + Send + Sync>;

/// Why a line was left out of decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    LeadingRow,
    Empty,
    Comment,
    Predicate,
}

/// Decides whether the line at `ordinal` must be skipped.
///
/// Checks run in a fixed order: leading rows to skip, blank lines, comment
/// lines, then the user predicate. A comment line under a no-comment policy
/// is an error, never a skip, so the predicate cannot hide it.
///
/// # Examples
///
/// ```
/// use tinyline_csv::core::{filter::{should_skip, SkipReason}, options::CsvOptions};
///
/// let options = CsvOptions { rows_to_skip: 1, ..CsvOptions::default() };
/// assert_eq!(should_skip("banner", 0, &options, None).unwrap(), Some(SkipReason::LeadingRow));
/// assert_eq!(should_skip("   ", 1, &options, None).unwrap(), Some(SkipReason::Empty));
/// assert_eq!(should_skip("#note", 2, &options, None).unwrap(), Some(SkipReason::Comment));
/// assert_eq!(should_skip("a;b", 3, &options, None).unwrap(), None);
/// ```
pub fn should_skip(
    line: &str,
    ordinal: usize,
    options: &CsvOptions,
    predicate: Option<&SkipRowPredicate>,
) -> Result<Option<SkipReason>, CsvError> {
    if ordinal < options.rows_to_skip {
        return Ok(Some(SkipReason::LeadingRow));
    }

    if options.skip_empty_rows && line.trim().is_empty() {
        return Ok(Some(SkipReason::Empty));
    }

    if line.starts_with(options.comment) {
        if options.allow_comment {
            return Ok(Some(SkipReason::Comment));
        }
        return Err(CsvError::CommentNotAllowed { line: ordinal });
    }

    match predicate {
        Some(predicate) if predicate(line, ordinal) => Ok(Some(SkipReason::Predicate)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn leading_rows_should_win_over_everything() -> Result<(), Box<dyn Error>> {
        let options = CsvOptions {
            rows_to_skip: 2,
            allow_comment: false,
            ..CsvOptions::default()
        };
        assert_eq!(should_skip("#x", 1, &options, None)?, Some(SkipReason::LeadingRow));
        assert!(should_skip("#x", 2, &options, None).is_err());
        Ok(())
    }

    #[test]
    fn empty_lines_should_be_kept_when_not_skipping() -> Result<(), Box<dyn Error>> {
        let options = CsvOptions {
            skip_empty_rows: false,
            ..CsvOptions::default()
        };
        assert_eq!(should_skip("", 0, &options, None)?, None);
        Ok(())
    }

    #[test]
    fn comment_policy_should_run_before_predicate() {
        let options = CsvOptions {
            allow_comment: false,
            ..CsvOptions::default()
        };
        let skip_everything: SkipRowPredicate = Arc::new(|_: &str, _: usize| true);

        let result = should_skip("#note", 4, &options, Some(&skip_everything));
        assert!(matches!(result, Err(CsvError::CommentNotAllowed { line: 4 })));
    }

    #[test]
    fn predicate_should_see_line_and_ordinal() -> Result<(), Box<dyn Error>> {
        let options = CsvOptions::default();
        let odd_rows: SkipRowPredicate = Arc::new(|line: &str, ordinal: usize| ordinal % 2 == 1 || line == "drop");

        assert_eq!(should_skip("a", 0, &options, Some(&odd_rows))?, None);
        assert_eq!(should_skip("a", 1, &options, Some(&odd_rows))?, Some(SkipReason::Predicate));
        assert_eq!(should_skip("drop", 2, &options, Some(&odd_rows))?, Some(SkipReason::Predicate));
        Ok(())
    }
}
