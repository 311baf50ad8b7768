use crate::{
    schema::{
        error::{ApiError, ApiErrorExt},
        store,
        types::{Comment, Post, Token, User},
    },
    server::auth::RequestIdentity,
};
use async_graphql::{Context, ErrorExtensions, ID, Object, Result};
use brettwerk_common::{
    model::{
        Id, ModelValidationError,
        auth::{AuthToken, TokenClaims, TokenSecret},
        comment::{Comment as CommentModel, CommentMarker},
        post::{Post as PostModel, PostMarker},
        user::{User as UserModel, Username},
    },
    vote::{VoteDirection, VoteSets},
};

/// The only password that logs anyone in. This deployment has no real
/// credential storage.
const LOGIN_PASSWORD: &str = "secret";

pub struct MutationRoot;

fn identity<'a>(ctx: &'a Context<'_>) -> Result<&'a UserModel> {
    ctx.data::<RequestIdentity>()?
        .user()
        .ok_or_else(|| ApiError::Unauthorized.extend())
}

/// Loads the logged-in user's stored record. The request identity is a
/// snapshot from before execution; mutations that write the user record
/// read it fresh so serial mutations in one request see earlier writes.
async fn current_user(ctx: &Context<'_>) -> Result<UserModel> {
    let id = identity(ctx)?.id;
    store(ctx)?
        .fetch_user(id)
        .await
        .api_err()?
        .ok_or_else(|| ApiError::Unauthorized.extend())
}

async fn toggle_post_vote(ctx: &Context<'_>, id: &ID, direction: VoteDirection) -> Result<Post> {
    let voter = identity(ctx)?.id;
    let store = store(ctx)?;

    let id: Id<PostMarker> = id.parse().api_err()?;
    let mut post = store
        .fetch_post(id)
        .await
        .api_err()?
        .ok_or_else(|| ApiError::PostNotFound(id).extend())?;

    post.votes.toggle(voter, direction);
    store.save_post(&post).await.api_err()?;
    Ok(Post(post))
}

#[Object]
impl MutationRoot {
    /// Creates a post authored by the logged-in user and records its id in
    /// the author's post list.
    async fn create_post(
        &self,
        ctx: &Context<'_>,
        title: String,
        body: Option<String>,
        subreddit: String,
    ) -> Result<Post> {
        let mut author = current_user(ctx).await?;
        let store = store(ctx)?;

        let post = PostModel {
            id: Id::generate(),
            title,
            body,
            subreddit,
            votes: VoteSets::default(),
        };
        store.insert_post(&post).await.api_err()?;

        // The back-reference is a second write. A crash in between leaves
        // the post reachable by id but missing from the author's list.
        author.posts.push(post.id);
        store.save_user(&author).await.api_err()?;

        Ok(Post(post))
    }

    async fn upvote_post(&self, ctx: &Context<'_>, id: ID) -> Result<Post> {
        toggle_post_vote(ctx, &id, VoteDirection::Up).await
    }

    async fn downvote_post(&self, ctx: &Context<'_>, id: ID) -> Result<Post> {
        toggle_post_vote(ctx, &id, VoteDirection::Down).await
    }

    /// Creates a comment on a post, optionally as a reply to another
    /// comment on that post.
    async fn create_comment(
        &self,
        ctx: &Context<'_>,
        body: String,
        parent_post: ID,
        parent_comment: Option<ID>,
    ) -> Result<Comment> {
        identity(ctx)?;

        let parent_post: Id<PostMarker> = parent_post.parse().api_err()?;
        let parent_comment: Option<Id<CommentMarker>> =
            parent_comment.map(|id| id.parse()).transpose().api_err()?;

        let comment = CommentModel {
            id: Id::generate(),
            body,
            parent_post,
            parent_comment,
            votes: VoteSets::default(),
            edited: false,
        };
        store(ctx)?.insert_comment(&comment).await.api_err()?;
        Ok(Comment(comment))
    }

    /// Replaces a comment's body and marks it as edited. Any logged-in user
    /// may edit any comment.
    async fn edit_comment(&self, ctx: &Context<'_>, body: String, id: ID) -> Result<Comment> {
        identity(ctx)?;
        let store = store(ctx)?;

        let id: Id<CommentMarker> = id.parse().api_err()?;
        let mut comment = store
            .fetch_comment(id)
            .await
            .api_err()?
            .ok_or_else(|| ApiError::CommentNotFound(id).extend())?;

        comment.body = body;
        comment.edited = true;
        store.save_comment(&comment).await.api_err()?;
        Ok(Comment(comment))
    }

    async fn create_user(&self, ctx: &Context<'_>, username: String) -> Result<User> {
        let username = Username::new(username)
            .map_err(ModelValidationError::from)
            .api_err()?;

        let user = UserModel {
            id: Id::generate(),
            username,
            subreddits: Vec::new(),
            posts: Vec::new(),
        };
        store(ctx)?.insert_user(&user).await.api_err()?;
        Ok(User(user))
    }

    /// Issues a bearer token when the username exists and the password
    /// matches the deployment password.
    async fn login(&self, ctx: &Context<'_>, username: String, password: String) -> Result<Token> {
        let user = store(ctx)?
            .fetch_user_by_username(&username)
            .await
            .api_err()?
            .filter(|_| password == LOGIN_PASSWORD)
            .ok_or_else(|| ApiError::InvalidCredentials.extend())?;

        let claims = TokenClaims {
            id: user.id,
            username: user.username,
        };
        let secret = ctx.data::<TokenSecret>()?;
        let token = AuthToken::issue(&claims, secret).api_err()?;
        Ok(Token(token.as_token_str()))
    }

    /// Adds the named subreddit to the logged-in user's subreddit list.
    /// Joining a subreddit twice is a no-op.
    async fn join_subreddit(&self, ctx: &Context<'_>, name: String) -> Result<User> {
        let mut user = current_user(ctx).await?;
        let store = store(ctx)?;

        let subreddit = store
            .fetch_subreddit_by_name(&name)
            .await
            .api_err()?
            .ok_or_else(|| ApiError::SubredditNotFound(name).extend())?;

        if !user.subreddits.contains(&subreddit.id) {
            user.subreddits.push(subreddit.id);
        }
        store.save_user(&user).await.api_err()?;
        Ok(User(user))
    }

    /// Removes the named subreddit from the logged-in user's subreddit
    /// list. Leaving a subreddit the user never joined is a no-op.
    async fn leave_subreddit(&self, ctx: &Context<'_>, name: String) -> Result<User> {
        let mut user = current_user(ctx).await?;
        let store = store(ctx)?;

        let subreddit = store
            .fetch_subreddit_by_name(&name)
            .await
            .api_err()?
            .ok_or_else(|| ApiError::SubredditNotFound(name).extend())?;

        user.subreddits.retain(|id| *id != subreddit.id);
        store.save_user(&user).await.api_err()?;
        Ok(User(user))
    }
}
