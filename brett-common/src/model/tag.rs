use crate::model::Id;
use serde::Serialize;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct TagMarker;

/// Tags are get-or-created by name at post creation and update time and never
/// deleted, so unused tags accumulate.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Serialize)]
pub struct Tag {
    pub id: Id<TagMarker>,
    pub name: String,
}
