use crate::model::{Id, ModelValidationError};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct SubredditMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Subreddit {
    pub id: Id<SubredditMarker>,
    pub name: String,
    pub description: Option<String>,
}

impl Subreddit {
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.name.is_empty() {
            return Err(ModelValidationError::EmptyField("name"));
        }

        Ok(())
    }
}
