//! Plain text listing of resolved pages.

use std::fmt::Write;

use crate::error::Result;
use crate::model::PageAltText;

/// One block per page, one line per attributed image.
pub fn to_text(pages: &[PageAltText]) -> Result<String> {
    let mut output = String::new();

    for page in pages {
        if page.is_empty() {
            let _ = writeln!(output, "Page {}: no alt text", page.page);
            continue;
        }
        let _ = writeln!(output, "Page {}:", page.page);
        for result in &page.results {
            let r = &result.rect;
            let _ = writeln!(
                output,
                "  {} [{:.1}, {:.1}, {:.1}, {:.1}] ({}) {}",
                result.id,
                r.left,
                r.bottom,
                r.right,
                r.top,
                result.tier.as_str(),
                result.alt.trim()
            );
        }
    }

    Ok(output.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImageAltResult, MatchTier, Rect};

    #[test]
    fn test_to_text() {
        let pages = vec![
            PageAltText::new(
                1,
                vec![ImageAltResult::new(
                    "figure-0",
                    Rect::new(10.0, 20.0, 110.0, 70.0),
                    "Company logo",
                    MatchTier::Direct,
                )],
            ),
            PageAltText::new(2, Vec::new()),
        ];

        let text = to_text(&pages).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Page 1:");
        assert_eq!(
            lines[1],
            "  figure-0 [10.0, 20.0, 110.0, 70.0] (direct) Company logo"
        );
        assert_eq!(lines[2], "Page 2: no alt text");
    }
}
