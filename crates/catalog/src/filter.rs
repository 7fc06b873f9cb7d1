//! Typed name predicates shared by product and category filters.

use serde::{Deserialize, Serialize};

/// How a record's name is matched during enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameFilter {
    /// Exact, case-sensitive equality.
    Equals(String),
    /// Case-insensitive substring match.
    Contains(String),
}

impl NameFilter {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NameFilter::Equals(expected) => name == expected,
            NameFilter::Contains(needle) => name.to_lowercase().contains(&needle.to_lowercase()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equals_is_exact() {
        let f = NameFilter::Equals("Widget".to_string());
        assert!(f.matches("Widget"));
        assert!(!f.matches("widget"));
        assert!(!f.matches("Widget Pro"));
    }

    #[test]
    fn contains_ignores_case() {
        let f = NameFilter::Contains("GET".to_string());
        assert!(f.matches("Widget"));
        assert!(!f.matches("Gizmo"));
    }
}
