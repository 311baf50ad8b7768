use crate::{BoardStore, Result, StoreError};
use async_trait::async_trait;
use brettwerk_common::model::{
    Id,
    comment::{Comment, CommentMarker},
    post::{Post, PostMarker},
    subreddit::{Subreddit, SubredditMarker},
    user::{User, UserMarker},
};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// [`BoardStore`] over plain maps. Backs the tests and local runs that
/// have no mongodb at hand.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<BTreeMap<Id<UserMarker>, User>>,
    posts: RwLock<BTreeMap<Id<PostMarker>, Post>>,
    comments: RwLock<BTreeMap<Id<CommentMarker>, Comment>>,
    subreddits: RwLock<BTreeMap<Id<SubredditMarker>, Subreddit>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BoardStore for MemoryStore {
    async fn fetch_user(&self, id: Id<UserMarker>) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn fetch_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|user| user.username.get() == username)
            .cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;

        if users.contains_key(&user.id) {
            return Err(StoreError::Duplicate {
                field: "_id",
                value: user.id.to_string(),
            });
        }
        if users
            .values()
            .any(|existing| existing.username == user.username)
        {
            return Err(StoreError::Duplicate {
                field: "username",
                value: user.username.get().to_owned(),
            });
        }

        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn save_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;
        match users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(StoreError::Missing {
                collection: "users",
            }),
        }
    }

    async fn fetch_post(&self, id: Id<PostMarker>) -> Result<Option<Post>> {
        Ok(self.posts.read().await.get(&id).cloned())
    }

    async fn fetch_posts(&self, ids: &[Id<PostMarker>]) -> Result<Vec<Post>> {
        let posts = self.posts.read().await;
        Ok(ids.iter().filter_map(|id| posts.get(id).cloned()).collect())
    }

    async fn list_posts(&self, subreddit: Option<&str>) -> Result<Vec<Post>> {
        let posts = self.posts.read().await;
        Ok(posts
            .values()
            .filter(|post| subreddit.is_none_or(|name| post.subreddit == name))
            .cloned()
            .collect())
    }

    async fn insert_post(&self, post: &Post) -> Result<()> {
        post.validate()?;

        let mut posts = self.posts.write().await;
        if posts.contains_key(&post.id) {
            return Err(StoreError::Duplicate {
                field: "_id",
                value: post.id.to_string(),
            });
        }

        posts.insert(post.id, post.clone());
        Ok(())
    }

    async fn save_post(&self, post: &Post) -> Result<()> {
        post.validate()?;

        let mut posts = self.posts.write().await;
        match posts.get_mut(&post.id) {
            Some(existing) => {
                *existing = post.clone();
                Ok(())
            }
            None => Err(StoreError::Missing {
                collection: "posts",
            }),
        }
    }

    async fn fetch_comment(&self, id: Id<CommentMarker>) -> Result<Option<Comment>> {
        Ok(self.comments.read().await.get(&id).cloned())
    }

    async fn fetch_post_comments(&self, post: Id<PostMarker>) -> Result<Vec<Comment>> {
        let comments = self.comments.read().await;
        Ok(comments
            .values()
            .filter(|comment| comment.parent_post == post)
            .cloned()
            .collect())
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<()> {
        comment.validate()?;

        let mut comments = self.comments.write().await;
        if comments.contains_key(&comment.id) {
            return Err(StoreError::Duplicate {
                field: "_id",
                value: comment.id.to_string(),
            });
        }

        comments.insert(comment.id, comment.clone());
        Ok(())
    }

    async fn save_comment(&self, comment: &Comment) -> Result<()> {
        comment.validate()?;

        let mut comments = self.comments.write().await;
        match comments.get_mut(&comment.id) {
            Some(existing) => {
                *existing = comment.clone();
                Ok(())
            }
            None => Err(StoreError::Missing {
                collection: "comments",
            }),
        }
    }

    async fn fetch_subreddit(&self, id: Id<SubredditMarker>) -> Result<Option<Subreddit>> {
        Ok(self.subreddits.read().await.get(&id).cloned())
    }

    async fn fetch_subreddits(&self, ids: &[Id<SubredditMarker>]) -> Result<Vec<Subreddit>> {
        let subreddits = self.subreddits.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| subreddits.get(id).cloned())
            .collect())
    }

    async fn fetch_subreddit_by_name(&self, name: &str) -> Result<Option<Subreddit>> {
        let subreddits = self.subreddits.read().await;
        Ok(subreddits
            .values()
            .find(|subreddit| subreddit.name == name)
            .cloned())
    }

    async fn insert_subreddit(&self, subreddit: &Subreddit) -> Result<()> {
        subreddit.validate()?;

        let mut subreddits = self.subreddits.write().await;
        if subreddits.contains_key(&subreddit.id) {
            return Err(StoreError::Duplicate {
                field: "_id",
                value: subreddit.id.to_string(),
            });
        }

        subreddits.insert(subreddit.id, subreddit.clone());
        Ok(())
    }
}
