//! Access decisions for private posts. Pure functions over already-loaded
//! values; callers load the post and resolve the subject first.

use crate::model::{post::Post, session::Identity};

/// Title shown in listings for private posts the subject may not read.
pub const PRIVATE_PLACEHOLDER_TITLE: &str = "This post is private.";

/// Whether `subject` may view, edit, delete, or comment on `post`.
///
/// Public posts are open to everyone, including anonymous callers. Private
/// posts are open to their owner and to administrators; a private post
/// without an owner is reachable by administrators only.
#[must_use]
pub fn can_access(post: &Post, subject: Option<&Identity>) -> bool {
    if !post.private {
        return true;
    }

    match subject {
        Some(identity) => identity.is_admin || post.owner == Some(identity.user_id),
        None => false,
    }
}

/// Redacts a private post for listing: placeholder title, blank content, no
/// tags. The privacy flag, resolved flag, and comment count stay visible so
/// listings can show that a private thread exists.
#[must_use]
pub fn redact(mut post: Post) -> Post {
    post.title = PRIVATE_PLACEHOLDER_TITLE.to_owned();
    post.content = String::new();
    post.tags = Vec::new();
    post
}

#[must_use]
pub fn redact_for(post: Post, subject: Option<&Identity>) -> Post {
    if can_access(&post, subject) {
        post
    } else {
        redact(post)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Id;
    use time::UtcDateTime;
    use uuid::Uuid;

    fn post(private: bool, owner: Option<Uuid>) -> Post {
        let now = UtcDateTime::now();
        Post {
            id: Id::new(1),
            title: "help with build".to_owned(),
            content: "it fails".to_owned(),
            author_name: "tester".to_owned(),
            owner,
            tags: vec!["build".to_owned()],
            resolved: false,
            private,
            comment_count: 3,
            created_at: now,
            updated_at: now,
        }
    }

    fn identity(user_id: Uuid, is_admin: bool) -> Identity {
        Identity {
            user_id,
            display_name: "tester".to_owned(),
            is_admin,
        }
    }

    #[test]
    fn public_posts_allow_everyone() {
        let post = post(false, None);

        assert!(can_access(&post, None));
        assert!(can_access(&post, Some(&identity(Uuid::new_v4(), false))));
        assert!(can_access(&post, Some(&identity(Uuid::new_v4(), true))));
    }

    #[test]
    fn private_posts_deny_anonymous() {
        let owner = Uuid::new_v4();
        assert!(!can_access(&post(true, Some(owner)), None));
    }

    #[test]
    fn private_posts_allow_only_owner_and_admins() {
        let owner = Uuid::new_v4();
        let post = post(true, Some(owner));

        assert!(can_access(&post, Some(&identity(owner, false))));
        assert!(!can_access(&post, Some(&identity(Uuid::new_v4(), false))));
        assert!(can_access(&post, Some(&identity(Uuid::new_v4(), true))));
    }

    #[test]
    fn ownerless_private_post_is_admin_only() {
        let post = post(true, None);

        assert!(!can_access(&post, Some(&identity(Uuid::new_v4(), false))));
        assert!(can_access(&post, Some(&identity(Uuid::new_v4(), true))));
    }

    #[test]
    fn decision_is_deterministic() {
        let owner = Uuid::new_v4();
        let post = post(true, Some(owner));
        let subject = identity(owner, false);

        let first = can_access(&post, Some(&subject));
        let second = can_access(&post, Some(&subject));
        assert_eq!(first, second);
    }

    #[test]
    fn redaction_blanks_content_but_keeps_flags_and_count() {
        let redacted = redact(post(true, Some(Uuid::new_v4())));

        assert_eq!(redacted.title, PRIVATE_PLACEHOLDER_TITLE);
        assert_eq!(redacted.content, "");
        assert!(redacted.tags.is_empty());
        assert!(redacted.private);
        assert_eq!(redacted.comment_count, 3);
    }

    #[test]
    fn redact_for_leaves_accessible_posts_untouched() {
        let owner = Uuid::new_v4();
        let original = post(true, Some(owner));

        let seen_by_owner = redact_for(original.clone(), Some(&identity(owner, false)));
        assert_eq!(seen_by_owner, original);

        let seen_by_stranger = redact_for(original, Some(&identity(Uuid::new_v4(), false)));
        assert_eq!(seen_by_stranger.title, PRIVATE_PLACEHOLDER_TITLE);
    }
}
