//! Tag entity and its request contracts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validate::{self, InvalidInput};

/// Color given to tags that are created without one, including tags
/// created implicitly by naming them on a bookmark.
pub const DEFAULT_TAG_COLOR: &str = "#3B82F6";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewTag {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

impl NewTag {
    pub fn validated(self) -> Result<Self, InvalidInput> {
        Ok(Self {
            name: validate::tag_name(&self.name)?,
            color: self.color.as_deref().map(validate::color).transpose()?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TagPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

impl TagPatch {
    pub fn validated(self) -> Result<Self, InvalidInput> {
        Ok(Self {
            name: self.name.as_deref().map(validate::tag_name).transpose()?,
            color: self.color.as_deref().map(validate::color).transpose()?,
        })
    }
}

/// How many bookmarks a tag is applied to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagUsage {
    pub tag_id: i64,
    pub tag_name: String,
    pub bookmark_count: i64,
}
