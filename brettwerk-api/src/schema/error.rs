use async_graphql::ErrorExtensions;
use brettwerk_common::model::{
    Id, InvalidIdError, ModelValidationError, comment::CommentMarker, post::PostMarker,
};
use brettwerk_db::StoreError;
use thiserror::Error;

/// Errors a resolver reports to the client. Every variant maps to a stable
/// `code` extension so clients can react without parsing messages.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Post {0} does not exist")]
    PostNotFound(Id<PostMarker>),
    #[error("Comment {0} does not exist")]
    CommentNotFound(Id<CommentMarker>),
    #[error("Subreddit {0} does not exist")]
    SubredditNotFound(String),
    #[error("You must be logged in")]
    Unauthorized,
    #[error("Wrong credentials")]
    InvalidCredentials,
    #[error(transparent)]
    InvalidId(#[from] InvalidIdError),
    #[error(transparent)]
    Validation(#[from] ModelValidationError),
    #[error("Could not issue an auth token")]
    TokenIssue(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::PostNotFound(_) | Self::CommentNotFound(_) | Self::SubredditNotFound(_) => {
                "NOT_FOUND"
            }
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InvalidId(_) | Self::Validation(_) => "VALIDATION_FAILURE",
            Self::TokenIssue(_) => "INTERNAL_SERVER_ERROR",
            Self::Store(error) => match error {
                StoreError::Data(_) | StoreError::Duplicate { .. } => "VALIDATION_FAILURE",
                StoreError::Missing { .. } => "NOT_FOUND",
                StoreError::Mongo(_) => "INTERNAL_SERVER_ERROR",
            },
        }
    }
}

impl ErrorExtensions for ApiError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.to_string()).extend_with(|_, extensions| {
            extensions.set("code", self.code());
            if let Self::Store(StoreError::Duplicate { field, value }) = self {
                extensions.set("field", *field);
                extensions.set("value", value.as_str());
            }
        })
    }
}

/// Converts domain errors into GraphQL errors while keeping the `code`
/// extension. The blanket `From` conversion on [`async_graphql::Error`]
/// would drop it.
pub(crate) trait ApiErrorExt<T> {
    fn api_err(self) -> async_graphql::Result<T>;
}

impl<T, E> ApiErrorExt<T> for Result<T, E>
where
    E: Into<ApiError>,
{
    fn api_err(self) -> async_graphql::Result<T> {
        self.map_err(|error| error.into().extend())
    }
}
