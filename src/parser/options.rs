//! Document loading options.

use std::ops::RangeInclusive;

use crate::error::{Error, Result};
use crate::resolve::{FallbackMode, ResolveOptions};

/// Default bound on nested Form XObject expansion.
pub const DEFAULT_MAX_FORM_DEPTH: usize = 12;

/// Options for loading a PDF and resolving its pages.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Error handling mode for per-page failures
    pub error_mode: ErrorMode,

    /// Resolve pages in parallel
    pub parallel: bool,

    /// Which pages to resolve
    pub pages: PageSelection,

    /// How deep Form XObjects are expanded when lowering a page
    pub max_form_depth: usize,

    /// Options handed to the attribution engine
    pub resolve: ResolveOptions,
}

impl ParseOptions {
    /// Create new parse options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Treat pages that fail to load as untagged.
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Fail the whole run on the first page that cannot be loaded.
    pub fn strict(mut self) -> Self {
        self.error_mode = ErrorMode::Strict;
        self
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }

    /// Set the Form XObject nesting bound.
    pub fn with_max_form_depth(mut self, depth: usize) -> Self {
        self.max_form_depth = depth;
        self
    }

    /// Set the positional fallback ordering.
    pub fn with_fallback_mode(mut self, mode: FallbackMode) -> Self {
        self.resolve.fallback_mode = mode;
        self
    }

    /// Replace the engine options wholesale.
    pub fn with_resolve_options(mut self, resolve: ResolveOptions) -> Self {
        self.resolve = resolve;
        self
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Lenient,
            parallel: true,
            pages: PageSelection::All,
            max_form_depth: DEFAULT_MAX_FORM_DEPTH,
            resolve: ResolveOptions::default(),
        }
    }
}

/// Error handling mode for per-page failures.
///
/// Only page data is affected: a file that cannot be opened as a PDF is an
/// error in either mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail on the first page whose structure or content cannot be read
    Strict,
    /// Log the failure and treat the page as untagged
    #[default]
    Lenient,
}

/// Page selection (1-indexed).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageSelection {
    /// Every page
    #[default]
    All,
    /// An inclusive range of pages
    Range(RangeInclusive<u32>),
    /// An explicit sorted list of pages
    Pages(Vec<u32>),
}

impl PageSelection {
    /// Check if a page number should be included.
    pub fn includes(&self, page: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Range(range) => range.contains(&page),
            PageSelection::Pages(pages) => pages.binary_search(&page).is_ok(),
        }
    }

    /// Parse a selection such as `"all"`, `"2-5"` or `"1,3,7-9"`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(PageSelection::All);
        }

        if !s.contains(',') {
            if let Some((start, end)) = s.split_once('-') {
                return Ok(PageSelection::Range(parse_range(start, end, s)?));
            }
        }

        let mut pages = Vec::new();
        for part in s.split(',').map(str::trim) {
            match part.split_once('-') {
                Some((start, end)) => pages.extend(parse_range(start, end, s)?),
                None => pages.push(parse_page(part, s)?),
            }
        }
        pages.sort_unstable();
        pages.dedup();
        Ok(PageSelection::Pages(pages))
    }
}

fn parse_page(value: &str, whole: &str) -> Result<u32> {
    match value.trim().parse::<u32>() {
        Ok(page) if page > 0 => Ok(page),
        _ => Err(Error::InvalidPageRange(whole.to_string())),
    }
}

fn parse_range(start: &str, end: &str, whole: &str) -> Result<RangeInclusive<u32>> {
    let start = parse_page(start, whole)?;
    let end = parse_page(end, whole)?;
    if start > end {
        return Err(Error::InvalidPageRange(whole.to_string()));
    }
    Ok(start..=end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options_builder() {
        let options = ParseOptions::new()
            .strict()
            .sequential()
            .with_max_form_depth(3)
            .with_fallback_mode(FallbackMode::Draw);

        assert_eq!(options.error_mode, ErrorMode::Strict);
        assert!(!options.parallel);
        assert_eq!(options.max_form_depth, 3);
        assert_eq!(options.resolve.fallback_mode, FallbackMode::Draw);
    }

    #[test]
    fn test_default_options() {
        let options = ParseOptions::default();
        assert_eq!(options.error_mode, ErrorMode::Lenient);
        assert_eq!(options.error_mode, ErrorMode::default());
        assert!(options.parallel);
        assert_eq!(options.max_form_depth, DEFAULT_MAX_FORM_DEPTH);
        assert_eq!(options.pages, PageSelection::All);
    }

    #[test]
    fn test_page_selection_includes() {
        let range = PageSelection::Range(5..=10);
        assert!(!range.includes(4));
        assert!(range.includes(10));

        let pages = PageSelection::Pages(vec![1, 3, 5]);
        assert!(pages.includes(3));
        assert!(!pages.includes(2));
        assert!(PageSelection::All.includes(99));
    }

    #[test]
    fn test_page_selection_parse() {
        assert_eq!(PageSelection::parse("all").unwrap(), PageSelection::All);
        assert_eq!(PageSelection::parse("").unwrap(), PageSelection::All);
        assert_eq!(
            PageSelection::parse("2-4").unwrap(),
            PageSelection::Range(2..=4)
        );
        assert_eq!(
            PageSelection::parse("7, 1,3-4,3").unwrap(),
            PageSelection::Pages(vec![1, 3, 4, 7])
        );
    }

    #[test]
    fn test_page_selection_rejects_garbage() {
        assert!(matches!(
            PageSelection::parse("0"),
            Err(Error::InvalidPageRange(_))
        ));
        assert!(PageSelection::parse("5-2").is_err());
        assert!(PageSelection::parse("a,b").is_err());
    }
}
