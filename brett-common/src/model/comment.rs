use crate::model::{Id, post::PostMarker};
use serde::{Deserialize, Serialize};
use time::UtcDateTime;
use uuid::Uuid;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub post_id: Id<PostMarker>,
    pub content: String,
    #[serde(rename = "author")]
    pub author_name: String,
    pub owner: Option<Uuid>,
    pub created_at: UtcDateTime,
    pub updated_at: UtcDateTime,
}

/// Sanitized input for creating a comment. Produced exclusively by
/// [`crate::sanitize::sanitize_new_comment`].
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct NewComment {
    pub content: String,
    pub author_name: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct NewCommentRequest {
    pub content: Option<String>,
    pub author: Option<String>,
}
