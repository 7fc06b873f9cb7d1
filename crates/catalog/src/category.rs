use serde::{Deserialize, Serialize};

use stockroom_core::{CategoryId, DomainError, DomainResult, Entity, Identifier, Record, RecordMeta};

use crate::filter::NameFilter;

/// Record: Category (flat, referenced by products).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    /// Unique among active categories.
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub meta: RecordMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryFilter {
    pub name: Option<NameFilter>,
}

impl Category {
    pub fn draft(params: NewCategory) -> DomainResult<Self> {
        let category = Self {
            id: CategoryId::nil(),
            name: params.name.trim().to_string(),
            description: params.description,
            meta: RecordMeta::unsaved(),
        };
        category.validate()?;
        Ok(category)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        Ok(())
    }
}

impl CategoryUpdate {
    pub fn apply(&self, current: &Category) -> DomainResult<Category> {
        let mut next = current.clone();
        if let Some(name) = &self.name {
            next.name = name.trim().to_string();
        }
        if let Some(description) = &self.description {
            next.description = Some(description.clone());
        }
        next.validate()?;
        Ok(next)
    }
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Record for Category {
    type Filter = CategoryFilter;

    const KIND: &'static str = "category";

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn set_id(&mut self, id: Self::Id) {
        self.id = id;
    }

    fn matches(&self, filter: &CategoryFilter) -> bool {
        filter.name.as_ref().is_none_or(|f| f.matches(&self.name))
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_requires_a_name() {
        let err = Category::draft(NewCategory {
            name: "".to_string(),
            description: None,
        })
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn name_is_the_unique_key() {
        let category = Category::draft(NewCategory {
            name: " Tools ".to_string(),
            description: Some("hand tools".to_string()),
        })
        .unwrap();
        assert_eq!(category.unique_key().as_deref(), Some("Tools"));
    }

    #[test]
    fn update_keeps_untouched_fields() {
        let current = Category::draft(NewCategory {
            name: "Tools".to_string(),
            description: Some("hand tools".to_string()),
        })
        .unwrap();
        let next = CategoryUpdate {
            name: Some("Power Tools".to_string()),
            description: None,
        }
        .apply(&current)
        .unwrap();
        assert_eq!(next.name, "Power Tools");
        assert_eq!(next.description.as_deref(), Some("hand tools"));
    }
}
