use crate::schema::{error::ApiErrorExt, store};
use async_graphql::{Context, ID, Object, Result};
use brettwerk_common::model::{
    Id,
    comment::Comment as CommentModel,
    post::Post as PostModel,
    subreddit::Subreddit as SubredditModel,
    user::{User as UserModel, UserMarker},
};
use std::collections::HashSet;

pub struct User(pub UserModel);

#[Object]
impl User {
    async fn id(&self) -> ID {
        ID(self.0.id.to_string())
    }

    async fn username(&self) -> &str {
        self.0.username.get()
    }

    /// The user's posts, oldest first.
    async fn posts(&self, ctx: &Context<'_>) -> Result<Vec<Post>> {
        let posts = store(ctx)?.fetch_posts(&self.0.posts).await.api_err()?;
        Ok(posts.into_iter().map(Post).collect())
    }

    /// The subreddits the user joined, in join order.
    async fn subreddits(&self, ctx: &Context<'_>) -> Result<Vec<Subreddit>> {
        let subreddits = store(ctx)?
            .fetch_subreddits(&self.0.subreddits)
            .await
            .api_err()?;
        Ok(subreddits.into_iter().map(Subreddit).collect())
    }
}

pub struct Post(pub PostModel);

#[Object]
impl Post {
    async fn id(&self) -> ID {
        ID(self.0.id.to_string())
    }

    async fn title(&self) -> &str {
        &self.0.title
    }

    async fn body(&self) -> Option<&str> {
        self.0.body.as_deref()
    }

    async fn subreddit(&self) -> &str {
        &self.0.subreddit
    }

    async fn up_voted_by(&self) -> Vec<ID> {
        voter_ids(&self.0.votes.up)
    }

    async fn down_voted_by(&self) -> Vec<ID> {
        voter_ids(&self.0.votes.down)
    }

    /// All comments on this post, including replies to other comments.
    async fn comments(&self, ctx: &Context<'_>) -> Result<Vec<Comment>> {
        let comments = store(ctx)?
            .fetch_post_comments(self.0.id)
            .await
            .api_err()?;
        Ok(comments.into_iter().map(Comment).collect())
    }
}

pub struct Comment(pub CommentModel);

#[Object]
impl Comment {
    async fn id(&self) -> ID {
        ID(self.0.id.to_string())
    }

    async fn body(&self) -> &str {
        &self.0.body
    }

    async fn parent_post(&self) -> ID {
        ID(self.0.parent_post.to_string())
    }

    /// The comment this one replies to, if it is not a top-level comment.
    async fn parent_comment(&self) -> Option<ID> {
        self.0.parent_comment.map(|id| ID(id.to_string()))
    }

    async fn up_voted_by(&self) -> Vec<ID> {
        voter_ids(&self.0.votes.up)
    }

    async fn down_voted_by(&self) -> Vec<ID> {
        voter_ids(&self.0.votes.down)
    }

    async fn edited(&self) -> bool {
        self.0.edited
    }
}

pub struct Subreddit(pub SubredditModel);

#[Object]
impl Subreddit {
    async fn id(&self) -> ID {
        ID(self.0.id.to_string())
    }

    async fn name(&self) -> &str {
        &self.0.name
    }

    async fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }
}

/// A signed bearer token for the `Authorization` header.
pub struct Token(pub String);

#[Object]
impl Token {
    async fn value(&self) -> &str {
        &self.0
    }
}

// Voter sets have no inherent order; sorting keeps responses stable.
fn voter_ids(voters: &HashSet<Id<UserMarker>>) -> Vec<ID> {
    let mut voters: Vec<_> = voters.iter().copied().collect();
    voters.sort_unstable();
    voters.into_iter().map(|id| ID(id.to_string())).collect()
}
