use crate::model::session::Identity;
use serde::{Deserialize, Serialize};
use time::UtcDateTime;
use uuid::Uuid;

/// Durable user record, keyed by the identifier issued by the external
/// identity provider. Display name and admin flag are overwritten on every
/// reconciliation; the provider is the source of truth for both.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct User {
    pub id: Uuid,
    pub display_name: String,
    pub is_admin: bool,
    pub created_at: UtcDateTime,
}

impl User {
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.id,
            display_name: self.display_name.clone(),
            is_admin: self.is_admin,
        }
    }
}

/// Raw identity payload as delivered by the local helper process. The
/// identifier stays a string here so a malformed UUID surfaces as its own
/// error rather than a generic JSON rejection.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct IdentityPayload {
    pub identifier: String,
    pub display_name: String,
    #[serde(default)]
    pub is_admin: bool,
}
