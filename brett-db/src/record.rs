use brett_common::model::{
    ModelValidationError,
    comment::Comment,
    post::Post,
    session::{Identity, Session},
    tag::Tag,
    user::User,
};
use sqlx::FromRow;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct UpsertedUserRecord {
    pub user_id: Uuid,
    pub display_name: String,
    pub is_admin: bool,
    pub created_at: OffsetDateTime,
    pub inserted: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct SessionRecord {
    pub token_hash: Vec<u8>,
    pub user_id: Uuid,
    pub display_name: String,
    pub is_admin: bool,
    pub created_at: OffsetDateTime,
    pub expires_after_seconds: Option<i64>,
}

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct PostRecord {
    pub post_id: i64,
    pub title: String,
    pub content: String,
    pub author_name: String,
    pub owner_id: Option<Uuid>,
    pub resolved: bool,
    pub private: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub tags: Vec<String>,
    pub comment_count: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct CommentRecord {
    pub comment_id: i64,
    pub post_id: i64,
    pub content: String,
    pub author_name: String,
    pub owner_id: Option<Uuid>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct TagRecord {
    pub tag_id: i64,
    pub name: String,
}

impl From<UpsertedUserRecord> for User {
    fn from(value: UpsertedUserRecord) -> Self {
        Self {
            id: value.user_id,
            display_name: value.display_name,
            is_admin: value.is_admin,
            created_at: value.created_at.to_utc(),
        }
    }
}

impl TryFrom<SessionRecord> for Session {
    type Error = ModelValidationError;

    fn try_from(value: SessionRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            token_hash: value.token_hash.into_boxed_slice().try_into()?,
            identity: Identity {
                user_id: value.user_id,
                display_name: value.display_name,
                is_admin: value.is_admin,
            },
            created_at: value.created_at.to_utc(),
            expires_after: value
                .expires_after_seconds
                .map(|seconds| Duration::seconds(seconds).try_into())
                .transpose()?,
        })
    }
}

impl From<PostRecord> for Post {
    fn from(value: PostRecord) -> Self {
        Self {
            id: value.post_id.into(),
            title: value.title,
            content: value.content,
            author_name: value.author_name,
            owner: value.owner_id,
            tags: value.tags,
            resolved: value.resolved,
            private: value.private,
            comment_count: value.comment_count,
            created_at: value.created_at.to_utc(),
            updated_at: value.updated_at.to_utc(),
        }
    }
}

impl From<CommentRecord> for Comment {
    fn from(value: CommentRecord) -> Self {
        Self {
            id: value.comment_id.into(),
            post_id: value.post_id.into(),
            content: value.content,
            author_name: value.author_name,
            owner: value.owner_id,
            created_at: value.created_at.to_utc(),
            updated_at: value.updated_at.to_utc(),
        }
    }
}

impl From<TagRecord> for Tag {
    fn from(value: TagRecord) -> Self {
        Self {
            id: value.tag_id.into(),
            name: value.name,
        }
    }
}
