//! Page range parsing for the split operation
//!
//! A page range expression is a comma-separated list of tokens. Each token is
//! either a single page (`"5"`) or an inclusive span (`"2-4"`). Resolving an
//! expression against a document yields the selected pages in ascending
//! document order, with duplicates collapsed.
//!
//! ```
//! use docsuite::range::resolve;
//!
//! let pages = resolve("7, 1-3, 2", 10).unwrap();
//! assert_eq!(pages.to_vec(), vec![1, 2, 3, 7]);
//! ```

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

/// 1-based page number within a source document
pub type PageIndex = u32;

/// Errors produced while parsing or resolving a page range
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    /// A token is not an integer or an `A-B` pair of integers
    #[error("Invalid page format {token:?}. Example: 1-3 or 1,3,5")]
    MalformedRange { token: String },

    /// A selected page lies outside `[1, total_pages]`
    #[error("Page {page} out of bounds (document has {total_pages} pages)")]
    OutOfBounds { page: PageIndex, total_pages: u32 },

    /// The expression selected no pages at all
    #[error("Page selection is empty")]
    EmptySelection,
}

/// One token of a range expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeToken {
    /// A single page, e.g. `5`
    Single(PageIndex),
    /// An inclusive span, e.g. `2-4`. Empty when `start > end`.
    Span { start: PageIndex, end: PageIndex },
}

impl RangeToken {
    /// Parse one already-trimmed token
    fn parse(token: &str) -> Result<Self, RangeError> {
        let malformed = || RangeError::MalformedRange {
            token: token.to_string(),
        };

        if token.contains('-') {
            let halves: Vec<&str> = token.split('-').collect();
            if halves.len() != 2 {
                return Err(malformed());
            }
            let start = parse_page_number(halves[0]).ok_or_else(malformed)?;
            let end = parse_page_number(halves[1]).ok_or_else(malformed)?;
            Ok(RangeToken::Span { start, end })
        } else {
            let page = parse_page_number(token).ok_or_else(malformed)?;
            Ok(RangeToken::Single(page))
        }
    }
}

impl fmt::Display for RangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeToken::Single(page) => write!(f, "{}", page),
            RangeToken::Span { start, end } => write!(f, "{}-{}", start, end),
        }
    }
}

fn parse_page_number(text: &str) -> Option<PageIndex> {
    text.trim().parse::<PageIndex>().ok()
}

/// A parsed range expression, tokens kept in input order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSpec {
    pub tokens: Vec<RangeToken>,
}

impl RangeSpec {
    /// Parse a comma-separated range expression
    ///
    /// Fails with [`RangeError::MalformedRange`] on the first token that is
    /// empty or not a number / number pair.
    pub fn parse(expression: &str) -> Result<Self, RangeError> {
        let tokens = expression
            .split(',')
            .map(str::trim)
            .map(RangeToken::parse)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { tokens })
    }

    /// Resolve the tokens against a document of `total_pages` pages
    ///
    /// Bounds are strict: any selected page outside `[1, total_pages]`
    /// rejects the whole selection. A reversed span selects nothing and is
    /// never checked against the bounds.
    pub fn resolve(&self, total_pages: u32) -> Result<SelectedPageSet, RangeError> {
        let mut pages = BTreeSet::new();

        for token in &self.tokens {
            match *token {
                RangeToken::Single(page) => {
                    check_bounds(page, total_pages)?;
                    pages.insert(page);
                }
                RangeToken::Span { start, end } => {
                    if start > end {
                        continue;
                    }
                    check_bounds(start, total_pages)?;
                    check_bounds(end, total_pages)?;
                    pages.extend(start..=end);
                }
            }
        }

        Ok(SelectedPageSet { pages })
    }
}

fn check_bounds(page: PageIndex, total_pages: u32) -> Result<(), RangeError> {
    if page < 1 || page > total_pages {
        return Err(RangeError::OutOfBounds { page, total_pages });
    }
    Ok(())
}

/// Pages chosen by a range expression, always iterated in ascending order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectedPageSet {
    pages: BTreeSet<PageIndex>,
}

impl SelectedPageSet {
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn contains(&self, page: PageIndex) -> bool {
        self.pages.contains(&page)
    }

    /// Selected pages in document order
    pub fn iter(&self) -> impl Iterator<Item = PageIndex> + '_ {
        self.pages.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<PageIndex> {
        self.iter().collect()
    }

    /// Reject an empty selection
    pub fn ensure_non_empty(self) -> Result<Self, RangeError> {
        if self.is_empty() {
            return Err(RangeError::EmptySelection);
        }
        Ok(self)
    }
}

/// Parse `expression` and resolve it against a document of `total_pages` pages
///
/// The result may be empty (for example `"5-2"`); callers decide whether that
/// is acceptable via [`SelectedPageSet::ensure_non_empty`].
pub fn resolve(expression: &str, total_pages: u32) -> Result<SelectedPageSet, RangeError> {
    RangeSpec::parse(expression)?.resolve(total_pages)
}
