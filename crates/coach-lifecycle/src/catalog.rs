// catalog.rs — The shared movement/food catalog the authority picks from
// while authoring a program. Read-open to everyone, written by the
// authority only (enforced by the sync engine, not here).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    Exercise,
    Food,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_kind")]
    pub kind: CatalogKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

fn default_kind() -> CatalogKind {
    CatalogKind::Exercise
}

impl CatalogEntry {
    pub fn exercise(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            kind: CatalogKind::Exercise,
            video_url: None,
        }
    }

    pub fn food(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            kind: CatalogKind::Food,
            video_url: None,
        }
    }

    /// Entries of `kind` whose name contains `term`. An empty term matches all.
    pub fn search<'a>(
        entries: &'a [CatalogEntry],
        kind: CatalogKind,
        term: &str,
    ) -> Vec<&'a CatalogEntry> {
        let term = term.trim().to_lowercase();
        entries
            .iter()
            .filter(|e| e.kind == kind)
            .filter(|e| term.is_empty() || e.name.to_lowercase().contains(&term))
            .collect()
    }
}
