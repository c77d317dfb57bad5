use crate::model::{Id, comment::Comment};
use serde::{Deserialize, Serialize};
use time::UtcDateTime;
use uuid::Uuid;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

/// A board post as loaded from the store. `comment_count` rides along so list
/// views never need a second query, and so redaction can keep it visible.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub title: String,
    pub content: String,
    #[serde(rename = "author")]
    pub author_name: String,
    pub owner: Option<Uuid>,
    pub tags: Vec<String>,
    pub resolved: bool,
    pub private: bool,
    pub comment_count: i64,
    pub created_at: UtcDateTime,
    pub updated_at: UtcDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    pub comments: Vec<Comment>,
}

/// Sanitized input for creating a post. Produced exclusively by
/// [`crate::sanitize::sanitize_new_post`].
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub author_name: String,
    pub tags: Vec<String>,
    pub resolved: bool,
    pub private: bool,
}

/// Sanitized partial update. `None` fields are left untouched; the sanitizer
/// also maps fields that arrived empty to `None`, matching create-side
/// emptiness rules.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub author_name: Option<String>,
    pub tags: Option<Vec<String>>,
    pub resolved: Option<bool>,
    pub private: Option<bool>,
}

impl PostPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.author_name.is_none()
            && self.tags.is_none()
            && self.resolved.is_none()
            && self.private.is_none()
    }
}

/// Raw create-post request body. Required fields stay optional here so the
/// sanitizer can report field-specific errors instead of a JSON rejection.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct NewPostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default)]
    pub private: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub tags: Option<Vec<String>>,
    pub resolved: Option<bool>,
    pub private: Option<bool>,
}
