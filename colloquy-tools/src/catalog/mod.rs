//! Literary works catalog
//!
//! Read-only collection of works, each split into numbered parts. The
//! catalog is loaded once at startup, typically from a JSON file.

mod tools;

pub use tools::{
    GetWorkContentInput, GetWorkContentTool, ListWorksInput, ListWorksTool, WorkContent,
    WorkContentBody, WorksListing,
};

use colloquy_core::{ColloquyError, ColloquyResult, StorageError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkCategory {
    Poem,
    ShortStories,
    Essay,
    NonFiction,
}

impl WorkCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkCategory::Poem => "poem",
            WorkCategory::ShortStories => "short-stories",
            WorkCategory::Essay => "essay",
            WorkCategory::NonFiction => "non-fiction",
        }
    }
}

impl fmt::Display for WorkCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkPart {
    pub part_number: u32,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Work {
    pub id: u64,
    pub title: String,
    pub category: WorkCategory,
    #[serde(default)]
    pub date_created: Option<String>,
    /// Ordered by part number.
    #[serde(default)]
    pub parts: Vec<WorkPart>,
}

impl Work {
    pub fn has_parts(&self) -> bool {
        self.parts.len() > 1
    }

    pub fn summary(&self) -> WorkSummary {
        WorkSummary {
            id: self.id,
            title: self.title.clone(),
            category: self.category,
            has_parts: self.has_parts(),
            date_created: self.date_created.clone(),
        }
    }

    pub fn part(&self, part_number: u32) -> Option<&WorkPart> {
        self.parts.iter().find(|p| p.part_number == part_number)
    }
}

/// Listing view of a work, without its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkSummary {
    pub id: u64,
    pub title: String,
    pub category: WorkCategory,
    pub has_parts: bool,
    pub date_created: Option<String>,
}

/// Read access to a catalog of works.
pub trait Catalog: Send + Sync {
    /// Works in catalog order, optionally restricted to one category.
    fn list(&self, category: Option<WorkCategory>) -> Vec<WorkSummary>;

    /// Case-sensitive exact title match.
    fn find_exact(&self, title: &str) -> Option<Work>;

    /// Case-insensitive substring match, preferring the shortest title.
    fn find_fuzzy(&self, title: &str) -> Option<Work>;

    /// Titles sharing at least one word with `title`, shortest first.
    fn suggest(&self, title: &str, limit: usize) -> Vec<String>;
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CatalogFile {
    works: Vec<Work>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    works: Vec<Work>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_works(works: Vec<Work>) -> Self {
        let mut works = works;
        for work in &mut works {
            work.parts.sort_by_key(|p| p.part_number);
        }
        Self { works }
    }

    /// Load `{"works": [...]}` from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> ColloquyResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ColloquyError::Storage(StorageError::NotFound {
                entity: "catalog".to_string(),
                id: format!("{} ({})", path.display(), e),
            })
        })?;
        let file: CatalogFile = serde_json::from_str(&raw).map_err(ColloquyError::serialization)?;
        tracing::info!(path = %path.display(), works = file.works.len(), "catalog loaded");
        Ok(Self::from_works(file.works))
    }

    pub fn len(&self) -> usize {
        self.works.len()
    }

    pub fn is_empty(&self) -> bool {
        self.works.is_empty()
    }
}

impl Catalog for InMemoryCatalog {
    fn list(&self, category: Option<WorkCategory>) -> Vec<WorkSummary> {
        self.works
            .iter()
            .filter(|w| category.map_or(true, |c| w.category == c))
            .map(Work::summary)
            .collect()
    }

    fn find_exact(&self, title: &str) -> Option<Work> {
        self.works.iter().find(|w| w.title == title).cloned()
    }

    fn find_fuzzy(&self, title: &str) -> Option<Work> {
        let needle = title.to_lowercase();
        self.works
            .iter()
            .filter(|w| w.title.to_lowercase().contains(&needle))
            .min_by_key(|w| w.title.chars().count())
            .cloned()
    }

    fn suggest(&self, title: &str, limit: usize) -> Vec<String> {
        let words: Vec<String> = title
            .split_whitespace()
            .map(str::to_lowercase)
            .filter(|w| w.chars().count() >= 3)
            .collect();
        if words.is_empty() {
            return Vec::new();
        }

        let mut matches: Vec<&Work> = self
            .works
            .iter()
            .filter(|w| {
                let candidate = w.title.to_lowercase();
                words.iter().any(|word| candidate.contains(word.as_str()))
            })
            .collect();
        matches.sort_by_key(|w| w.title.chars().count());
        matches
            .into_iter()
            .take(limit)
            .map(|w| w.title.clone())
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn part(part_number: u32, content: &str) -> WorkPart {
        WorkPart {
            part_number,
            content: content.to_string(),
        }
    }

    pub fn sample_catalog() -> InMemoryCatalog {
        InMemoryCatalog::from_works(vec![
            Work {
                id: 1,
                title: "Gitanjali".to_string(),
                category: WorkCategory::Poem,
                date_created: Some("1910".to_string()),
                parts: vec![
                    part(2, "When thou commandest me to sing"),
                    part(1, "Thou hast made me endless"),
                    part(35, "Where the mind is without fear"),
                ],
            },
            Work {
                id: 2,
                title: "The Postmaster".to_string(),
                category: WorkCategory::ShortStories,
                date_created: None,
                parts: vec![part(1, "The postmaster first took up his duties")],
            },
            Work {
                id: 3,
                title: "The Gardener".to_string(),
                category: WorkCategory::Poem,
                date_created: None,
                parts: vec![],
            },
            Work {
                id: 4,
                title: "Nationalism".to_string(),
                category: WorkCategory::Essay,
                date_created: Some("1917".to_string()),
                parts: vec![part(1, "Our real problem in India is not political")],
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::sample_catalog;
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parts_are_sorted_on_load() {
        let catalog = sample_catalog();
        let work = catalog.find_exact("Gitanjali").expect("work exists");
        let numbers: Vec<u32> = work.parts.iter().map(|p| p.part_number).collect();
        assert_eq!(numbers, vec![1, 2, 35]);
        assert!(work.has_parts());
    }

    #[test]
    fn test_list_filters_by_category() {
        let catalog = sample_catalog();
        assert_eq!(catalog.list(None).len(), 4);
        let poems = catalog.list(Some(WorkCategory::Poem));
        assert_eq!(poems.len(), 2);
        assert!(poems.iter().all(|w| w.category == WorkCategory::Poem));
    }

    #[test]
    fn test_fuzzy_prefers_shortest_title() {
        let catalog = sample_catalog();
        let work = catalog.find_fuzzy("the").expect("fuzzy match");
        assert_eq!(work.title, "The Gardener");
        assert!(catalog.find_exact("the postmaster").is_none());
        assert_eq!(
            catalog.find_fuzzy("POSTMASTER").map(|w| w.id),
            Some(2)
        );
    }

    #[test]
    fn test_suggestions_share_a_word() {
        let catalog = sample_catalog();
        let suggestions = catalog.suggest("the lost gardener", 3);
        assert_eq!(suggestions, vec!["The Gardener", "The Postmaster"]);
        assert!(catalog.suggest("xy", 3).is_empty());
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"works":[{{"id":7,"title":"Kabuliwala","category":"short-stories","parts":[{{"part_number":1,"content":"Mini"}}]}}]}}"#
        )
        .expect("write catalog");

        let catalog = InMemoryCatalog::from_json_file(file.path()).expect("load catalog");
        assert_eq!(catalog.len(), 1);
        assert_eq!(
            catalog.list(Some(WorkCategory::ShortStories))[0].title,
            "Kabuliwala"
        );
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        assert!(InMemoryCatalog::from_json_file(dir.path().join("absent.json")).is_err());
    }
}
