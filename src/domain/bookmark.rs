//! Bookmark entity and its request contracts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::validate::{self, InvalidInput};
use super::Tag;

/// A persisted bookmark together with the tags currently applied to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bookmark {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tags: Vec<Tag>,
}

#[cfg(test)]
impl Bookmark {
    pub fn tag_names(&self) -> Vec<&str> {
        self.tags.iter().map(|t| t.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewBookmark {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub user_id: i64,
    /// Tag names; unknown names are created, known ones reused.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewBookmark {
    pub fn validated(self) -> Result<Self, InvalidInput> {
        Ok(Self {
            url: validate::url(&self.url)?,
            title: validate::title(&self.title)?,
            description: self.description,
            user_id: self.user_id,
            tags: validate::tag_names(&self.tags)?,
        })
    }
}

/// Partial update of a bookmark.
///
/// `description` distinguishes an absent field (`None`, leave as is) from an
/// explicit `null` (`Some(None)`, clear it). A supplied `tags` list replaces
/// the bookmark's tag set entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BookmarkPatch {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl BookmarkPatch {
    pub fn validated(self) -> Result<Self, InvalidInput> {
        Ok(Self {
            url: self.url.as_deref().map(validate::url).transpose()?,
            title: self.title.as_deref().map(validate::title).transpose()?,
            description: self.description,
            tags: self
                .tags
                .as_deref()
                .map(validate::tag_names)
                .transpose()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.url.is_none() && self.title.is_none() && self.description.is_none() && self.tags.is_none()
    }
}

/// Only called when the key is present, so `null` becomes `Some(None)`.
fn deserialize_present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}
