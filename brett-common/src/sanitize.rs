//! Central input sanitization. Every free-text field passes through here
//! before it reaches the store; the escaping below is the sole XSS defense.
//! Length limits apply to the trimmed input, before escaping.

use crate::model::{
    comment::{NewComment, NewCommentRequest},
    post::{NewPost, NewPostRequest, PostPatch, UpdatePostRequest},
};
use thiserror::Error;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_CONTENT_LEN: usize = 10_000;
pub const MAX_AUTHOR_LEN: usize = 50;
pub const MAX_TAG_LEN: usize = 50;
pub const MAX_TAGS: usize = 10;
pub const MAX_BODY_BYTES: usize = 50 * 1024;

pub const DEFAULT_AUTHOR: &str = "Anonymous";

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: Option<String>,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field: &str, message: String) -> Self {
        Self {
            field: Some(field.to_owned()),
            message,
        }
    }
}

fn required(field: &str) -> ValidationError {
    ValidationError::new(field, format!("{field} is required"))
}

fn too_long(field: &str, max_len: usize) -> ValidationError {
    ValidationError::new(field, format!("{field} must not exceed {max_len} characters"))
}

/// Escapes the HTML-significant characters `&`, `<`, `>`, `"` and `'` to
/// their entities, in that order of significance (`&` first).
#[must_use]
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Trims, checks emptiness and length, then escapes. Absent values are only
/// acceptable with `allow_empty`, in which case they become the empty string.
pub fn sanitize_text(
    value: Option<&str>,
    max_len: usize,
    field: &str,
    allow_empty: bool,
) -> Result<String, ValidationError> {
    let Some(value) = value else {
        return if allow_empty {
            Ok(String::new())
        } else {
            Err(required(field))
        };
    };

    let trimmed = value.trim();

    if trimmed.is_empty() {
        return if allow_empty {
            Ok(String::new())
        } else {
            Err(required(field))
        };
    }

    if trimmed.chars().count() > max_len {
        return Err(too_long(field, max_len));
    }

    Ok(escape_html(trimmed))
}

/// Sanitizes a tag list: at most [`MAX_TAGS`] entries, each trimmed and at
/// most [`MAX_TAG_LEN`] characters. Entries that trim to empty are dropped;
/// order and duplicates are preserved (the store deduplicates by name).
pub fn sanitize_tag_list(tags: &[String]) -> Result<Vec<String>, ValidationError> {
    if tags.len() > MAX_TAGS {
        return Err(ValidationError::new(
            "tags",
            format!("at most {MAX_TAGS} tags are allowed"),
        ));
    }

    let mut sanitized = Vec::with_capacity(tags.len());
    for tag in tags {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.chars().count() > MAX_TAG_LEN {
            return Err(too_long("tags", MAX_TAG_LEN));
        }
        sanitized.push(escape_html(trimmed));
    }

    Ok(sanitized)
}

/// Rejects oversized request bodies before any JSON parsing happens.
pub fn validate_payload_size(body: &[u8]) -> Result<(), ValidationError> {
    if body.len() > MAX_BODY_BYTES {
        return Err(ValidationError {
            field: None,
            message: format!("request body exceeds {} KiB", MAX_BODY_BYTES / 1024),
        });
    }

    Ok(())
}

pub fn sanitize_new_post(request: &NewPostRequest) -> Result<NewPost, ValidationError> {
    let title = sanitize_text(request.title.as_deref(), MAX_TITLE_LEN, "title", false)?;
    let content = sanitize_text(request.content.as_deref(), MAX_CONTENT_LEN, "content", false)?;

    let author_name = sanitize_text(request.author.as_deref(), MAX_AUTHOR_LEN, "author", true)?;
    let author_name = if author_name.is_empty() {
        DEFAULT_AUTHOR.to_owned()
    } else {
        author_name
    };

    let tags = match request.tags.as_deref() {
        Some(tags) => sanitize_tag_list(tags)?,
        None => Vec::new(),
    };

    Ok(NewPost {
        title,
        content,
        author_name,
        tags,
        resolved: request.resolved,
        private: request.private,
    })
}

/// Update requests treat every field as optional; a field that arrives empty
/// is skipped rather than blanked, matching the create-side emptiness rules.
pub fn sanitize_post_patch(request: &UpdatePostRequest) -> Result<PostPatch, ValidationError> {
    let title = request
        .title
        .as_deref()
        .map(|title| sanitize_text(Some(title), MAX_TITLE_LEN, "title", true))
        .transpose()?
        .filter(|title| !title.is_empty());
    let content = request
        .content
        .as_deref()
        .map(|content| sanitize_text(Some(content), MAX_CONTENT_LEN, "content", true))
        .transpose()?
        .filter(|content| !content.is_empty());
    let author_name = request
        .author
        .as_deref()
        .map(|author| sanitize_text(Some(author), MAX_AUTHOR_LEN, "author", true))
        .transpose()?
        .filter(|author| !author.is_empty());

    let tags = request
        .tags
        .as_deref()
        .map(sanitize_tag_list)
        .transpose()?;

    Ok(PostPatch {
        title,
        content,
        author_name,
        tags,
        resolved: request.resolved,
        private: request.private,
    })
}

pub fn sanitize_new_comment(request: &NewCommentRequest) -> Result<NewComment, ValidationError> {
    let content = sanitize_text(request.content.as_deref(), MAX_CONTENT_LEN, "content", false)?;

    let author_name = sanitize_text(request.author.as_deref(), MAX_AUTHOR_LEN, "author", true)?;
    let author_name = if author_name.is_empty() {
        DEFAULT_AUTHOR.to_owned()
    } else {
        author_name
    };

    Ok(NewComment {
        content,
        author_name,
    })
}
