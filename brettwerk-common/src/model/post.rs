use crate::{
    model::{Id, ModelValidationError},
    vote::VoteSets,
};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub title: String,
    pub body: Option<String>,
    /// Name of the community the post was made in. Not checked against the
    /// subreddit collection, so it may name a community that does not exist.
    pub subreddit: String,
    pub votes: VoteSets,
}

impl Post {
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.title.is_empty() {
            return Err(ModelValidationError::EmptyField("title"));
        }
        if self.subreddit.is_empty() {
            return Err(ModelValidationError::EmptyField("subreddit"));
        }

        Ok(())
    }
}
