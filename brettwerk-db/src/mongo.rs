use crate::{BoardStore, Result, StoreError};
use async_trait::async_trait;
use brettwerk_common::{
    model::{
        Id, ModelValidationError,
        comment::{Comment, CommentMarker},
        post::{Post, PostMarker},
        subreddit::{Subreddit, SubredditMarker},
        user::{User, UserMarker, Username},
    },
    vote::VoteSets,
};
use futures::TryStreamExt;
use mongodb::{
    Collection, Database,
    bson::{Bson, Document, doc, oid::ObjectId},
    error::{ErrorKind, WriteFailure},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// [`BoardStore`] on a mongodb database, one collection per record type.
/// Documents keep the field names the collections have always used, so
/// an existing database stays readable.
pub struct MongoStore {
    users: Collection<UserDocument>,
    posts: Collection<PostDocument>,
    comments: Collection<CommentDocument>,
    subreddits: Collection<SubredditDocument>,
    database: Database,
}

impl MongoStore {
    #[must_use]
    pub fn new(database: Database) -> Self {
        Self {
            users: database.collection("users"),
            posts: database.collection("posts"),
            comments: database.collection("comments"),
            subreddits: database.collection("subreddits"),
            database,
        }
    }

    /// Round trip to the server to confirm it is reachable.
    pub async fn ping(&self) -> Result<()> {
        self.database.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }

    /// Creates the unique username index. Safe to repeat on every startup.
    pub async fn ensure_indexes(&self) -> Result<()> {
        self.database
            .run_command(
                doc! {
                    "createIndexes": "users",
                    "indexes": [{
                        "name": "unique_username",
                        "key": {
                            "username": 1
                        },
                        "unique": true
                    }],
                },
                None,
            )
            .await?;

        Ok(())
    }
}

fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    matches!(
        *error.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref write_error)) if write_error.code == 11000
    )
}

fn insert_error(error: mongodb::error::Error, field: &'static str, value: String) -> StoreError {
    if is_duplicate_key(&error) {
        StoreError::Duplicate { field, value }
    } else {
        StoreError::Mongo(error)
    }
}

fn id_values<Marker>(ids: &[Id<Marker>]) -> Vec<Bson> {
    ids.iter()
        .map(|id| Bson::ObjectId(id.object_id()))
        .collect()
}

#[async_trait]
impl BoardStore for MongoStore {
    async fn fetch_user(&self, id: Id<UserMarker>) -> Result<Option<User>> {
        let document = self
            .users
            .find_one(doc! { "_id": ObjectId::from(id) }, None)
            .await?;

        let user = document.map(User::try_from).transpose()?;
        Ok(user)
    }

    async fn fetch_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let document = self
            .users
            .find_one(doc! { "username": username }, None)
            .await?;

        let user = document.map(User::try_from).transpose()?;
        Ok(user)
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        let document = UserDocument::from(user);
        self.users
            .insert_one(&document, None)
            .await
            .map_err(|error| insert_error(error, "username", user.username.get().to_owned()))?;

        Ok(())
    }

    async fn save_user(&self, user: &User) -> Result<()> {
        let document = UserDocument::from(user);
        let outcome = self
            .users
            .replace_one(doc! { "_id": document.id }, &document, None)
            .await?;

        if outcome.matched_count == 0 {
            return Err(StoreError::Missing {
                collection: "users",
            });
        }
        Ok(())
    }

    async fn fetch_post(&self, id: Id<PostMarker>) -> Result<Option<Post>> {
        let document = self
            .posts
            .find_one(doc! { "_id": ObjectId::from(id) }, None)
            .await?;

        let post = document.map(Post::try_from).transpose()?;
        Ok(post)
    }

    async fn fetch_posts(&self, ids: &[Id<PostMarker>]) -> Result<Vec<Post>> {
        let documents: Vec<PostDocument> = self
            .posts
            .find(doc! { "_id": { "$in": id_values(ids) } }, None)
            .await?
            .try_collect()
            .await?;

        // `$in` makes no ordering promise, so the documents are put back
        // into the order the ids were given in.
        let mut by_id: HashMap<ObjectId, PostDocument> = documents
            .into_iter()
            .map(|document| (document.id, document))
            .collect();

        ids.iter()
            .filter_map(|id| by_id.remove(&id.object_id()))
            .map(|document| Post::try_from(document).map_err(StoreError::from))
            .collect()
    }

    async fn list_posts(&self, subreddit: Option<&str>) -> Result<Vec<Post>> {
        let filter = match subreddit {
            Some(name) => doc! { "subreddit": name },
            None => Document::new(),
        };

        let documents: Vec<PostDocument> =
            self.posts.find(filter, None).await?.try_collect().await?;

        documents
            .into_iter()
            .map(|document| Post::try_from(document).map_err(StoreError::from))
            .collect()
    }

    async fn insert_post(&self, post: &Post) -> Result<()> {
        post.validate()?;

        let document = PostDocument::from(post);
        self.posts
            .insert_one(&document, None)
            .await
            .map_err(|error| insert_error(error, "_id", post.id.to_string()))?;

        Ok(())
    }

    async fn save_post(&self, post: &Post) -> Result<()> {
        post.validate()?;

        let document = PostDocument::from(post);
        let outcome = self
            .posts
            .replace_one(doc! { "_id": document.id }, &document, None)
            .await?;

        if outcome.matched_count == 0 {
            return Err(StoreError::Missing {
                collection: "posts",
            });
        }
        Ok(())
    }

    async fn fetch_comment(&self, id: Id<CommentMarker>) -> Result<Option<Comment>> {
        let document = self
            .comments
            .find_one(doc! { "_id": ObjectId::from(id) }, None)
            .await?;

        let comment = document.map(Comment::try_from).transpose()?;
        Ok(comment)
    }

    async fn fetch_post_comments(&self, post: Id<PostMarker>) -> Result<Vec<Comment>> {
        let documents: Vec<CommentDocument> = self
            .comments
            .find(doc! { "parentPost": ObjectId::from(post) }, None)
            .await?
            .try_collect()
            .await?;

        documents
            .into_iter()
            .map(|document| Comment::try_from(document).map_err(StoreError::from))
            .collect()
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<()> {
        comment.validate()?;

        let document = CommentDocument::from(comment);
        self.comments
            .insert_one(&document, None)
            .await
            .map_err(|error| insert_error(error, "_id", comment.id.to_string()))?;

        Ok(())
    }

    async fn save_comment(&self, comment: &Comment) -> Result<()> {
        comment.validate()?;

        let document = CommentDocument::from(comment);
        let outcome = self
            .comments
            .replace_one(doc! { "_id": document.id }, &document, None)
            .await?;

        if outcome.matched_count == 0 {
            return Err(StoreError::Missing {
                collection: "comments",
            });
        }
        Ok(())
    }

    async fn fetch_subreddit(&self, id: Id<SubredditMarker>) -> Result<Option<Subreddit>> {
        let document = self
            .subreddits
            .find_one(doc! { "_id": ObjectId::from(id) }, None)
            .await?;

        let subreddit = document.map(Subreddit::try_from).transpose()?;
        Ok(subreddit)
    }

    async fn fetch_subreddits(&self, ids: &[Id<SubredditMarker>]) -> Result<Vec<Subreddit>> {
        let documents: Vec<SubredditDocument> = self
            .subreddits
            .find(doc! { "_id": { "$in": id_values(ids) } }, None)
            .await?
            .try_collect()
            .await?;

        let mut by_id: HashMap<ObjectId, SubredditDocument> = documents
            .into_iter()
            .map(|document| (document.id, document))
            .collect();

        ids.iter()
            .filter_map(|id| by_id.remove(&id.object_id()))
            .map(|document| Subreddit::try_from(document).map_err(StoreError::from))
            .collect()
    }

    async fn fetch_subreddit_by_name(&self, name: &str) -> Result<Option<Subreddit>> {
        let document = self
            .subreddits
            .find_one(doc! { "name": name }, None)
            .await?;

        let subreddit = document.map(Subreddit::try_from).transpose()?;
        Ok(subreddit)
    }

    async fn insert_subreddit(&self, subreddit: &Subreddit) -> Result<()> {
        subreddit.validate()?;

        let document = SubredditDocument::from(subreddit);
        self.subreddits
            .insert_one(&document, None)
            .await
            .map_err(|error| insert_error(error, "_id", subreddit.id.to_string()))?;

        Ok(())
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserDocument {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub username: String,
    #[serde(default)]
    pub subreddits: Vec<ObjectId>,
    #[serde(default)]
    pub posts: Vec<ObjectId>,
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PostDocument {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub subreddit: String,
    #[serde(default)]
    pub up_voted_by: Vec<ObjectId>,
    #[serde(default)]
    pub down_voted_by: Vec<ObjectId>,
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CommentDocument {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub body: String,
    pub parent_post: ObjectId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_comment: Option<ObjectId>,
    #[serde(default)]
    pub up_voted_by: Vec<ObjectId>,
    #[serde(default)]
    pub down_voted_by: Vec<ObjectId>,
    #[serde(default)]
    pub edited: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubredditDocument {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TryFrom<UserDocument> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id.into(),
            username: Username::new(value.username)?,
            subreddits: value.subreddits.into_iter().map(Id::from).collect(),
            posts: value.posts.into_iter().map(Id::from).collect(),
        })
    }
}

impl From<&User> for UserDocument {
    fn from(value: &User) -> Self {
        Self {
            id: value.id.into(),
            username: value.username.get().to_owned(),
            subreddits: value
                .subreddits
                .iter()
                .copied()
                .map(ObjectId::from)
                .collect(),
            posts: value.posts.iter().copied().map(ObjectId::from).collect(),
        }
    }
}

impl TryFrom<PostDocument> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostDocument) -> Result<Self, Self::Error> {
        let post = Self {
            id: value.id.into(),
            title: value.title,
            body: value.body,
            subreddit: value.subreddit,
            votes: VoteSets {
                up: value.up_voted_by.into_iter().map(Id::from).collect(),
                down: value.down_voted_by.into_iter().map(Id::from).collect(),
            },
        };
        post.validate()?;

        Ok(post)
    }
}

impl From<&Post> for PostDocument {
    fn from(value: &Post) -> Self {
        Self {
            id: value.id.into(),
            title: value.title.clone(),
            body: value.body.clone(),
            subreddit: value.subreddit.clone(),
            up_voted_by: value.votes.up.iter().copied().map(ObjectId::from).collect(),
            down_voted_by: value
                .votes
                .down
                .iter()
                .copied()
                .map(ObjectId::from)
                .collect(),
        }
    }
}

impl TryFrom<CommentDocument> for Comment {
    type Error = ModelValidationError;

    fn try_from(value: CommentDocument) -> Result<Self, Self::Error> {
        let comment = Self {
            id: value.id.into(),
            body: value.body,
            parent_post: value.parent_post.into(),
            parent_comment: value.parent_comment.map(Id::from),
            votes: VoteSets {
                up: value.up_voted_by.into_iter().map(Id::from).collect(),
                down: value.down_voted_by.into_iter().map(Id::from).collect(),
            },
            edited: value.edited,
        };
        comment.validate()?;

        Ok(comment)
    }
}

impl From<&Comment> for CommentDocument {
    fn from(value: &Comment) -> Self {
        Self {
            id: value.id.into(),
            body: value.body.clone(),
            parent_post: value.parent_post.into(),
            parent_comment: value.parent_comment.map(ObjectId::from),
            up_voted_by: value.votes.up.iter().copied().map(ObjectId::from).collect(),
            down_voted_by: value
                .votes
                .down
                .iter()
                .copied()
                .map(ObjectId::from)
                .collect(),
            edited: value.edited,
        }
    }
}

impl TryFrom<SubredditDocument> for Subreddit {
    type Error = ModelValidationError;

    fn try_from(value: SubredditDocument) -> Result<Self, Self::Error> {
        let subreddit = Self {
            id: value.id.into(),
            name: value.name,
            description: value.description,
        };
        subreddit.validate()?;

        Ok(subreddit)
    }
}

impl From<&Subreddit> for SubredditDocument {
    fn from(value: &Subreddit) -> Self {
        Self {
            id: value.id.into(),
            name: value.name.clone(),
            description: value.description.clone(),
        }
    }
}
