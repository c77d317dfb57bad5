use crate::record::{CommentRecord, PostRecord, SessionRecord, TagRecord, UpsertedUserRecord};
use brett_common::model::{
    Id, ModelValidationError,
    comment::{Comment, CommentMarker, NewComment},
    post::{NewPost, Post, PostMarker, PostPatch},
    session::{Session, SessionTokenHash},
    tag::{Tag, TagMarker},
    user::User,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Optional filters for the post listing. Text filters are case-insensitive
/// substring matches; `q` is unioned across title, content, author, and tag
/// names.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct PostFilter {
    pub q: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub tag: Option<String>,
    pub resolved: Option<bool>,
}

const POST_SELECT: &str = "
    SELECT
        p.post_id, p.title, p.content, p.author_name, p.owner_id,
        p.resolved, p.private, p.created_at, p.updated_at,
        COALESCE(
            array_agg(t.name ORDER BY pt.tag_id) FILTER (WHERE t.name IS NOT NULL),
            '{}'
        ) AS tags,
        (SELECT count(*) FROM comments c WHERE c.post_id = p.post_id) AS comment_count
    FROM posts p
    LEFT JOIN post_tags pt ON pt.post_id = p.post_id
    LEFT JOIN tags t ON t.tag_id = pt.tag_id
";

fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[derive(Debug)]
pub struct DbClient {
    pool: PgPool,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Atomic upsert keyed by the external identifier. Display name and
    /// admin flag are overwritten unconditionally; the identity provider is
    /// the source of truth for both. Returns the stored user and whether the
    /// row was newly created.
    pub async fn upsert_user(
        &self,
        user_id: Uuid,
        display_name: &str,
        is_admin: bool,
    ) -> Result<(User, bool)> {
        let record = sqlx::query_as::<_, UpsertedUserRecord>(
            "
            INSERT INTO users (user_id, display_name, is_admin)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
            SET display_name = EXCLUDED.display_name, is_admin = EXCLUDED.is_admin
            RETURNING user_id, display_name, is_admin, created_at, (xmax = 0) AS inserted
            ",
        )
        .bind(user_id)
        .bind(display_name)
        .bind(is_admin)
        .fetch_one(&self.pool)
        .await?;

        let created = record.inserted;
        Ok((record.into(), created))
    }

    pub async fn create_session(&self, session: &Session) -> Result<()> {
        sqlx::query(
            "
            INSERT INTO sessions
                (token_hash, user_id, display_name, is_admin, created_at, expires_after_seconds)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(&session.token_hash.0[..])
        .bind(session.identity.user_id)
        .bind(&session.identity.display_name)
        .bind(session.identity.is_admin)
        .bind(OffsetDateTime::from(session.created_at))
        .bind(
            session
                .expires_after
                .map(|duration| duration.get().whole_seconds()),
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn fetch_session(&self, token_hash: &SessionTokenHash) -> Result<Option<Session>> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "
            SELECT token_hash, user_id, display_name, is_admin, created_at, expires_after_seconds
            FROM sessions
            WHERE token_hash = $1
            ",
        )
        .bind(&token_hash.0[..])
        .fetch_optional(&self.pool)
        .await?;

        let session = record.map(Session::try_from).transpose()?;
        Ok(session)
    }

    pub async fn create_post(&self, post: &NewPost, owner: Option<Uuid>) -> Result<Post> {
        let post_id: i64 = sqlx::query_scalar(
            "
            INSERT INTO posts (title, content, author_name, owner_id, resolved, private)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING post_id
            ",
        )
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.author_name)
        .bind(owner)
        .bind(post.resolved)
        .bind(post.private)
        .fetch_one(&self.pool)
        .await?;

        self.attach_tags(post_id.into(), &post.tags).await?;

        let created = self.fetch_post(post_id.into()).await?;
        created.ok_or(DbError::Sqlx(sqlx::Error::RowNotFound))
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = sqlx::query_as::<_, PostRecord>(&format!(
            "{POST_SELECT} WHERE p.post_id = $1 GROUP BY p.post_id"
        ))
        .bind(post_id.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Post::from))
    }

    pub async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(POST_SELECT);
        builder.push(" WHERE true");

        if let Some(q) = &filter.q {
            let pattern = like_pattern(q);
            builder.push(" AND (p.title ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR p.content ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR p.author_name ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(
                " OR EXISTS (
                    SELECT 1 FROM post_tags qpt
                    JOIN tags qt ON qt.tag_id = qpt.tag_id
                    WHERE qpt.post_id = p.post_id AND qt.name ILIKE ",
            );
            builder.push_bind(pattern);
            builder.push("))");
        }

        if let Some(title) = &filter.title {
            builder.push(" AND p.title ILIKE ");
            builder.push_bind(like_pattern(title));
        }
        if let Some(content) = &filter.content {
            builder.push(" AND p.content ILIKE ");
            builder.push_bind(like_pattern(content));
        }
        if let Some(author) = &filter.author {
            builder.push(" AND p.author_name ILIKE ");
            builder.push_bind(like_pattern(author));
        }
        if let Some(tag) = &filter.tag {
            builder.push(
                " AND EXISTS (
                    SELECT 1 FROM post_tags fpt
                    JOIN tags ft ON ft.tag_id = fpt.tag_id
                    WHERE fpt.post_id = p.post_id AND ft.name ILIKE ",
            );
            builder.push_bind(like_pattern(tag));
            builder.push(")");
        }
        if let Some(resolved) = filter.resolved {
            builder.push(" AND p.resolved = ");
            builder.push_bind(resolved);
        }

        builder.push(" GROUP BY p.post_id ORDER BY p.created_at DESC, p.post_id DESC");

        let records = builder
            .build_query_as::<PostRecord>()
            .fetch_all(&self.pool)
            .await?;

        Ok(records.into_iter().map(Post::from).collect())
    }

    /// Applies the present fields of `patch` and always bumps `updated_at`.
    /// A present tag list replaces the post's tag set. Returns the refreshed
    /// post, or `None` when the post no longer exists.
    pub async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        patch: &PostPatch,
    ) -> Result<Option<Post>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE posts SET updated_at = now()");

        if let Some(title) = &patch.title {
            builder.push(", title = ");
            builder.push_bind(title);
        }
        if let Some(content) = &patch.content {
            builder.push(", content = ");
            builder.push_bind(content);
        }
        if let Some(author_name) = &patch.author_name {
            builder.push(", author_name = ");
            builder.push_bind(author_name);
        }
        if let Some(resolved) = patch.resolved {
            builder.push(", resolved = ");
            builder.push_bind(resolved);
        }
        if let Some(private) = patch.private {
            builder.push(", private = ");
            builder.push_bind(private);
        }

        builder.push(" WHERE post_id = ");
        builder.push_bind(post_id.get());

        let result = builder.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        if let Some(tags) = &patch.tags {
            sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
                .bind(post_id.get())
                .execute(&self.pool)
                .await?;
            self.attach_tags(post_id, tags).await?;
        }

        self.fetch_post(post_id).await
    }

    /// Deletes a post; its comments cascade at the store level. Returns
    /// whether a row was removed.
    pub async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE post_id = $1")
            .bind(post_id.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn create_comment(
        &self,
        post_id: Id<PostMarker>,
        comment: &NewComment,
        owner: Option<Uuid>,
    ) -> Result<Comment> {
        let record = sqlx::query_as::<_, CommentRecord>(
            "
            INSERT INTO comments (post_id, content, author_name, owner_id)
            VALUES ($1, $2, $3, $4)
            RETURNING comment_id, post_id, content, author_name, owner_id, created_at, updated_at
            ",
        )
        .bind(post_id.get())
        .bind(&comment.content)
        .bind(&comment.author_name)
        .bind(owner)
        .fetch_one(&self.pool)
        .await?;

        Ok(record.into())
    }

    pub async fn fetch_comments(&self, post_id: Id<PostMarker>) -> Result<Vec<Comment>> {
        let records = sqlx::query_as::<_, CommentRecord>(
            "
            SELECT comment_id, post_id, content, author_name, owner_id, created_at, updated_at
            FROM comments
            WHERE post_id = $1
            ORDER BY created_at, comment_id
            ",
        )
        .bind(post_id.get())
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Comment::from).collect())
    }

    pub async fn list_tags(&self) -> Result<Vec<Tag>> {
        let records =
            sqlx::query_as::<_, TagRecord>("SELECT tag_id, name FROM tags ORDER BY tag_id")
                .fetch_all(&self.pool)
                .await?;

        Ok(records.into_iter().map(Tag::from).collect())
    }

    /// Get-or-create by unique name. The conflict no-op makes concurrent
    /// creates of the same tag converge on one row.
    async fn get_or_create_tag(&self, name: &str) -> Result<Id<TagMarker>> {
        let inserted: Option<i64> = sqlx::query_scalar(
            "INSERT INTO tags (name) VALUES ($1) ON CONFLICT (name) DO NOTHING RETURNING tag_id",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(tag_id) = inserted {
            return Ok(tag_id.into());
        }

        let tag_id: i64 = sqlx::query_scalar("SELECT tag_id FROM tags WHERE name = $1")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;

        Ok(tag_id.into())
    }

    async fn attach_tags(&self, post_id: Id<PostMarker>, names: &[String]) -> Result<()> {
        for name in names {
            let tag_id = self.get_or_create_tag(name).await?;

            sqlx::query(
                "INSERT INTO post_tags (post_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(post_id.get())
            .bind(tag_id.get())
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }
}
