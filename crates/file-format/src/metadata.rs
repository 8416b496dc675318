use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Project metadata stored alongside the shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Stable identity of the project across saves.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Human-readable project name.
    pub name: String,
    #[serde(default)]
    pub author: Option<String>,
    /// When the project was first created.
    pub created: DateTime<Utc>,
    /// When the project was last modified.
    pub modified: DateTime<Utc>,
}

impl ProjectMetadata {
    /// Create metadata with the given name and current timestamp.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            author: None,
            created: now,
            modified: now,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Mark the project as modified now.
    pub fn touch(&mut self) {
        self.modified = Utc::now();
    }
}
