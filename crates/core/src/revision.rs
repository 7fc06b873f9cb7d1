//! Revision expectations for optimistic concurrency.

/// Optimistic concurrency expectation for a conditional write.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedRevision {
    /// Skip revision checking (last writer wins).
    Any,
    /// Require the stored record to be at an exact revision.
    Exact(u64),
}

impl ExpectedRevision {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedRevision::Any => true,
            ExpectedRevision::Exact(r) => r == actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_matches_every_revision() {
        assert!(ExpectedRevision::Any.matches(0));
        assert!(ExpectedRevision::Any.matches(42));
    }

    #[test]
    fn exact_rejects_stale_revision() {
        assert!(ExpectedRevision::Exact(3).matches(3));
        assert!(!ExpectedRevision::Exact(3).matches(4));
    }
}
