use crate::{
    schema::{
        error::ApiErrorExt,
        store,
        types::{Post, Subreddit, User},
    },
    server::auth::RequestIdentity,
};
use async_graphql::{Context, ID, Object, Result};
use brettwerk_common::model::{Id, post::PostMarker, user::UserMarker};

/// Subreddit name that selects posts from every subreddit.
const ALL_SUBREDDITS: &str = "all";

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// The user the request is authenticated as, if any.
    async fn me(&self, ctx: &Context<'_>) -> Result<Option<User>> {
        let identity = ctx.data::<RequestIdentity>()?;
        Ok(identity.user().cloned().map(User))
    }

    /// Looks up a user by id. Called without an id, resolves to nothing.
    async fn user(&self, ctx: &Context<'_>, user_id: Option<ID>) -> Result<Option<User>> {
        let Some(user_id) = user_id else {
            return Ok(None);
        };

        let id: Id<UserMarker> = user_id.parse().api_err()?;
        let user = store(ctx)?.fetch_user(id).await.api_err()?;
        Ok(user.map(User))
    }

    /// Posts in one subreddit, or every post when the filter is absent or
    /// names the wildcard subreddit.
    async fn posts(&self, ctx: &Context<'_>, subreddit: Option<String>) -> Result<Vec<Post>> {
        let filter = subreddit.as_deref().filter(|name| *name != ALL_SUBREDDITS);
        let posts = store(ctx)?.list_posts(filter).await.api_err()?;
        Ok(posts.into_iter().map(Post).collect())
    }

    async fn post(&self, ctx: &Context<'_>, id: ID) -> Result<Option<Post>> {
        let id: Id<PostMarker> = id.parse().api_err()?;
        let post = store(ctx)?.fetch_post(id).await.api_err()?;
        Ok(post.map(Post))
    }

    /// Looks up a subreddit by name. Called without a name, resolves to
    /// nothing.
    async fn subreddit(
        &self,
        ctx: &Context<'_>,
        name: Option<String>,
    ) -> Result<Option<Subreddit>> {
        let Some(name) = name else {
            return Ok(None);
        };

        let subreddit = store(ctx)?.fetch_subreddit_by_name(&name).await.api_err()?;
        Ok(subreddit.map(Subreddit))
    }
}
