//! Marked-content scope tracking (`BMC` / `BDC` ... `EMC`).

/// One open marked-content scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedContentScope {
    pub tag: String,
    pub id: Option<u32>,
    pub is_artifact: bool,
}

/// Stack of open marked-content scopes, innermost last.
#[derive(Debug, Clone, Default)]
pub struct MarkedContentTracker {
    scopes: Vec<MarkedContentScope>,
}

impl MarkedContentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_scope(&mut self, tag: impl Into<String>, id: Option<u32>, is_artifact: bool) {
        self.scopes.push(MarkedContentScope {
            tag: tag.into(),
            id,
            is_artifact,
        });
    }

    /// Close the innermost scope. Returns `None` on an unbalanced `EMC`.
    pub fn end_scope(&mut self) -> Option<MarkedContentScope> {
        self.scopes.pop()
    }

    /// Nearest enclosing scope id, searching from the innermost scope out.
    pub fn current_id(&self) -> Option<u32> {
        self.scopes.iter().rev().find_map(|scope| scope.id)
    }

    /// Artifact-ness is inherited: any artifact ancestor makes content decorative.
    pub fn is_inside_artifact(&self) -> bool {
        self.scopes.iter().any(|scope| scope.is_artifact)
    }

    pub fn is_inside_any_scope(&self) -> bool {
        !self.scopes.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_id_prefers_innermost() {
        let mut tracker = MarkedContentTracker::new();
        tracker.begin_scope("Figure", Some(1), false);
        tracker.begin_scope("Span", Some(7), false);
        assert_eq!(tracker.current_id(), Some(7));
        tracker.end_scope();
        assert_eq!(tracker.current_id(), Some(1));
    }

    #[test]
    fn test_current_id_skips_untagged_scopes() {
        let mut tracker = MarkedContentTracker::new();
        tracker.begin_scope("Figure", Some(4), false);
        tracker.begin_scope("OC", None, false);
        assert_eq!(tracker.current_id(), Some(4));
    }

    #[test]
    fn test_artifact_is_inherited() {
        let mut tracker = MarkedContentTracker::new();
        tracker.begin_scope("Artifact", None, true);
        tracker.begin_scope("Figure", Some(2), false);
        assert!(tracker.is_inside_artifact());
        tracker.end_scope();
        tracker.end_scope();
        assert!(!tracker.is_inside_artifact());
    }

    #[test]
    fn test_end_on_empty_is_noop() {
        let mut tracker = MarkedContentTracker::new();
        assert!(tracker.end_scope().is_none());
        assert!(!tracker.is_inside_any_scope());
        assert_eq!(tracker.current_id(), None);
    }
}
