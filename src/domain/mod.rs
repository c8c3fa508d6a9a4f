//! Domain types for the bookmark manager.
//!
//! This module provides:
//! - Entities: `User`, `Bookmark`, `Tag`
//! - Request contracts for create and partial update of each entity
//! - Offset pagination (`Page`)
//! - Field validation shared by the request contracts

pub mod bookmark;
pub mod page;
pub mod tag;
pub mod user;
pub mod validate;

pub use bookmark::{Bookmark, BookmarkPatch, NewBookmark};
pub use page::Page;
pub use tag::{NewTag, Tag, TagPatch, TagUsage, DEFAULT_TAG_COLOR};
pub use user::{NewUser, User, UserPatch};
pub use validate::InvalidInput;
