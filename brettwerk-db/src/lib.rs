pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use brettwerk_common::model::{
    Id, ModelValidationError,
    comment::{Comment, CommentMarker},
    post::{Post, PostMarker},
    subreddit::{Subreddit, SubredditMarker},
    user::{User, UserMarker},
};
use thiserror::Error;

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("No {collection} record with this id exists")]
    Missing { collection: &'static str },
    #[error("Unique field {field} already has an entry for {value:?}")]
    Duplicate {
        field: &'static str,
        value: String,
    },
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
}

/// Typed access to the four collections backing the board. Records carry
/// their id; `insert_*` writes a fresh record, `save_*` replaces an
/// existing one and fails with [`StoreError::Missing`] when there is
/// nothing to replace. Both validate the record first.
#[async_trait]
pub trait BoardStore: Send + Sync {
    async fn fetch_user(&self, id: Id<UserMarker>) -> Result<Option<User>>;
    async fn fetch_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn insert_user(&self, user: &User) -> Result<()>;
    async fn save_user(&self, user: &User) -> Result<()>;

    async fn fetch_post(&self, id: Id<PostMarker>) -> Result<Option<Post>>;
    /// Resolves ids in the given order. Ids with no record are skipped.
    async fn fetch_posts(&self, ids: &[Id<PostMarker>]) -> Result<Vec<Post>>;
    async fn list_posts(&self, subreddit: Option<&str>) -> Result<Vec<Post>>;
    async fn insert_post(&self, post: &Post) -> Result<()>;
    async fn save_post(&self, post: &Post) -> Result<()>;

    async fn fetch_comment(&self, id: Id<CommentMarker>) -> Result<Option<Comment>>;
    async fn fetch_post_comments(&self, post: Id<PostMarker>) -> Result<Vec<Comment>>;
    async fn insert_comment(&self, comment: &Comment) -> Result<()>;
    async fn save_comment(&self, comment: &Comment) -> Result<()>;

    async fn fetch_subreddit(&self, id: Id<SubredditMarker>) -> Result<Option<Subreddit>>;
    /// Resolves ids in the given order. Ids with no record are skipped.
    async fn fetch_subreddits(&self, ids: &[Id<SubredditMarker>]) -> Result<Vec<Subreddit>>;
    async fn fetch_subreddit_by_name(&self, name: &str) -> Result<Option<Subreddit>>;
    /// There is no board operation that creates communities; they are
    /// seeded out of band.
    async fn insert_subreddit(&self, subreddit: &Subreddit) -> Result<()>;
}
