use crate::{
    model::{Id, ModelValidationError, post::PostMarker},
    vote::VoteSets,
};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub body: String,
    /// Not checked against the post collection.
    pub parent_post: Id<PostMarker>,
    /// Present on replies to another comment.
    pub parent_comment: Option<Id<CommentMarker>>,
    pub votes: VoteSets,
    /// Flips to true on the first successful edit and never back.
    pub edited: bool,
}

impl Comment {
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.body.is_empty() {
            return Err(ModelValidationError::EmptyField("body"));
        }

        Ok(())
    }
}
