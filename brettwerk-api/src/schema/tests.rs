use crate::{
    schema::{BoardSchema, build_schema},
    server::auth::{RequestIdentity, resolve_identity},
};
use async_graphql::{Request, Response};
use brettwerk_common::{
    model::{
        Id,
        auth::{AuthToken, TokenSecret},
        comment::{Comment, CommentMarker},
        post::{Post, PostMarker},
        subreddit::Subreddit,
        user::{User, UserMarker, Username},
    },
    vote::VoteSets,
};
use brettwerk_db::{BoardStore, memory::MemoryStore};
use serde_json::{Value, json};
use std::sync::Arc;

fn token_secret() -> TokenSecret {
    TokenSecret::new(*b"test secret")
}

fn test_schema() -> (BoardSchema, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    // `store.clone()` unsize-coerces at the argument; the `Arc::clone` path
    // form would demand `&Arc<dyn BoardStore>` here.
    let schema = build_schema(store.clone(), token_secret());
    (schema, store)
}

async fn execute(schema: &BoardSchema, identity: RequestIdentity, source: &str) -> Response {
    schema.execute(Request::new(source).data(identity)).await
}

/// Unwraps a response that is expected to have succeeded.
fn data(response: Response) -> Value {
    assert!(
        response.errors.is_empty(),
        "unexpected errors: {:?}",
        response.errors
    );
    response.data.into_json().unwrap()
}

/// The `code` extension of the first error, as a client would see it.
fn first_error_code(response: Response) -> String {
    let response = serde_json::to_value(&response).unwrap();
    response["errors"][0]["extensions"]["code"]
        .as_str()
        .expect("response carries no error code")
        .to_owned()
}

async fn seeded_user(store: &MemoryStore, username: &str) -> User {
    let user = User {
        id: Id::generate(),
        username: Username::new(username.to_owned()).unwrap(),
        subreddits: Vec::new(),
        posts: Vec::new(),
    };
    store.insert_user(&user).await.unwrap();
    user
}

async fn seeded_post(store: &MemoryStore, title: &str, subreddit: &str) -> Post {
    let post = Post {
        id: Id::generate(),
        title: title.to_owned(),
        body: None,
        subreddit: subreddit.to_owned(),
        votes: VoteSets::default(),
    };
    store.insert_post(&post).await.unwrap();
    post
}

async fn seeded_comment(store: &MemoryStore, parent_post: Id<PostMarker>, body: &str) -> Comment {
    let comment = Comment {
        id: Id::generate(),
        body: body.to_owned(),
        parent_post,
        parent_comment: None,
        votes: VoteSets::default(),
        edited: false,
    };
    store.insert_comment(&comment).await.unwrap();
    comment
}

async fn seeded_subreddit(store: &MemoryStore, name: &str) -> Subreddit {
    let subreddit = Subreddit {
        id: Id::generate(),
        name: name.to_owned(),
        description: None,
    };
    store.insert_subreddit(&subreddit).await.unwrap();
    subreddit
}

/// Re-reads the user so the identity matches what a fresh request would
/// resolve.
async fn fresh_identity(store: &MemoryStore, id: Id<UserMarker>) -> RequestIdentity {
    RequestIdentity(store.fetch_user(id).await.unwrap())
}

fn sorted_field(value: &Value, object: &str, field: &str) -> Vec<String> {
    let mut values: Vec<String> = value[object]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry[field].as_str().unwrap().to_owned())
        .collect();
    values.sort();
    values
}

#[tokio::test]
async fn created_user_can_log_in_and_identify_itself() {
    let (schema, store) = test_schema();

    let response = execute(
        &schema,
        RequestIdentity::default(),
        r#"mutation { createUser(username: "alice") { username } }"#,
    )
    .await;
    assert_eq!(data(response), json!({ "createUser": { "username": "alice" } }));

    let response = execute(
        &schema,
        RequestIdentity::default(),
        r#"mutation { login(username: "alice", password: "secret") { value } }"#,
    )
    .await;
    let value = data(response);
    let token = value["login"]["value"].as_str().unwrap().to_owned();

    let header = format!("bearer {token}");
    let identity = resolve_identity(Some(&header), store.as_ref(), &token_secret())
        .await
        .unwrap();
    let response = execute(&schema, identity, "{ me { username } }").await;
    assert_eq!(data(response), json!({ "me": { "username": "alice" } }));
}

#[tokio::test]
async fn login_tokens_name_their_user() {
    let (schema, store) = test_schema();
    let user = seeded_user(&store, "alice").await;

    let response = execute(
        &schema,
        RequestIdentity::default(),
        r#"mutation { login(username: "alice", password: "secret") { value } }"#,
    )
    .await;
    let value = data(response);

    let token: AuthToken = value["login"]["value"].as_str().unwrap().parse().unwrap();
    let claims = token.verify(&token_secret()).unwrap();
    assert_eq!(claims.id, user.id);
    assert_eq!(claims.username.get(), "alice");
}

#[tokio::test]
async fn login_rejects_wrong_credentials() {
    let (schema, store) = test_schema();
    seeded_user(&store, "alice").await;

    let response = execute(
        &schema,
        RequestIdentity::default(),
        r#"mutation { login(username: "alice", password: "wrong") { value } }"#,
    )
    .await;
    assert_eq!(first_error_code(response), "INVALID_CREDENTIALS");

    let response = execute(
        &schema,
        RequestIdentity::default(),
        r#"mutation { login(username: "nobody", password: "secret") { value } }"#,
    )
    .await;
    assert_eq!(first_error_code(response), "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn duplicate_usernames_are_rejected() {
    let (schema, store) = test_schema();
    seeded_user(&store, "alice").await;

    let response = execute(
        &schema,
        RequestIdentity::default(),
        r#"mutation { createUser(username: "alice") { id } }"#,
    )
    .await;

    let response = serde_json::to_value(&response).unwrap();
    assert_eq!(
        response["errors"][0]["extensions"],
        json!({ "code": "VALIDATION_FAILURE", "field": "username", "value": "alice" })
    );
}

#[tokio::test]
async fn invalid_usernames_are_rejected() {
    let (schema, _store) = test_schema();

    let response = execute(
        &schema,
        RequestIdentity::default(),
        r#"mutation { createUser(username: "") { id } }"#,
    )
    .await;
    assert_eq!(first_error_code(response), "VALIDATION_FAILURE");
}

#[tokio::test]
async fn attributed_mutations_require_a_login() {
    let (schema, _store) = test_schema();

    let mutations = [
        r#"mutation { createPost(title: "T", subreddit: "s") { id } }"#,
        r#"mutation { upvotePost(id: "ffffffffffffffffffffffff") { id } }"#,
        r#"mutation { downvotePost(id: "ffffffffffffffffffffffff") { id } }"#,
        r#"mutation { createComment(body: "B", parentPost: "ffffffffffffffffffffffff") { id } }"#,
        r#"mutation { editComment(id: "ffffffffffffffffffffffff", body: "B") { id } }"#,
        r#"mutation { joinSubreddit(name: "rust") { id } }"#,
        r#"mutation { leaveSubreddit(name: "rust") { id } }"#,
    ];

    for mutation in mutations {
        let response = execute(&schema, RequestIdentity::default(), mutation).await;
        assert_eq!(first_error_code(response), "UNAUTHORIZED", "{mutation}");
    }
}

#[tokio::test]
async fn a_new_post_is_recorded_on_its_author() {
    let (schema, store) = test_schema();
    let author = seeded_user(&store, "alice").await;

    let response = execute(
        &schema,
        RequestIdentity(Some(author.clone())),
        r#"mutation {
            createPost(title: "Hello", subreddit: "rust") {
                id title body subreddit upVotedBy downVotedBy
            }
        }"#,
    )
    .await;
    let value = data(response);
    assert_eq!(value["createPost"]["title"], "Hello");
    assert_eq!(value["createPost"]["body"], Value::Null);
    assert_eq!(value["createPost"]["subreddit"], "rust");
    assert_eq!(value["createPost"]["upVotedBy"], json!([]));
    assert_eq!(value["createPost"]["downVotedBy"], json!([]));

    let post_id: Id<PostMarker> = value["createPost"]["id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    let author = store.fetch_user(author.id).await.unwrap().unwrap();
    assert_eq!(author.posts, vec![post_id]);
}

#[tokio::test]
async fn posts_created_in_one_request_are_all_recorded() {
    let (schema, store) = test_schema();
    let author = seeded_user(&store, "alice").await;

    let mutation = r#"mutation {
        a: createPost(title: "First", subreddit: "rust") { id }
        b: createPost(title: "Second", subreddit: "rust") { id }
    }"#;
    let value = data(execute(&schema, RequestIdentity(Some(author.clone())), mutation).await);
    let first: Id<PostMarker> = value["a"]["id"].as_str().unwrap().parse().unwrap();
    let second: Id<PostMarker> = value["b"]["id"].as_str().unwrap().parse().unwrap();

    let stored = store.fetch_user(author.id).await.unwrap().unwrap();
    assert_eq!(stored.posts, vec![first, second]);
}

#[tokio::test]
async fn empty_titles_are_rejected() {
    let (schema, store) = test_schema();
    let author = seeded_user(&store, "alice").await;

    let response = execute(
        &schema,
        RequestIdentity(Some(author)),
        r#"mutation { createPost(title: "", subreddit: "rust") { id } }"#,
    )
    .await;
    assert_eq!(first_error_code(response), "VALIDATION_FAILURE");
}

#[tokio::test]
async fn malformed_ids_are_rejected() {
    let (schema, _store) = test_schema();

    let response = execute(
        &schema,
        RequestIdentity::default(),
        r#"{ post(id: "not-an-id") { title } }"#,
    )
    .await;
    assert_eq!(first_error_code(response), "VALIDATION_FAILURE");
}

#[tokio::test]
async fn voting_twice_retracts_the_vote() {
    let (schema, store) = test_schema();
    let voter = seeded_user(&store, "alice").await;
    let post = seeded_post(&store, "Hello", "rust").await;

    let mutation = format!(r#"mutation {{ upvotePost(id: "{}") {{ upVotedBy }} }}"#, post.id);

    let response = execute(&schema, RequestIdentity(Some(voter.clone())), &mutation).await;
    assert_eq!(
        data(response)["upvotePost"]["upVotedBy"],
        json!([voter.id.to_string()])
    );

    let response = execute(&schema, RequestIdentity(Some(voter)), &mutation).await;
    assert_eq!(data(response)["upvotePost"]["upVotedBy"], json!([]));
}

#[tokio::test]
async fn opposite_vote_replaces_the_first() {
    let (schema, store) = test_schema();
    let voter = seeded_user(&store, "alice").await;
    let post = seeded_post(&store, "Hello", "rust").await;

    let upvote = format!(r#"mutation {{ upvotePost(id: "{}") {{ id }} }}"#, post.id);
    data(execute(&schema, RequestIdentity(Some(voter.clone())), &upvote).await);

    let downvote = format!(
        r#"mutation {{ downvotePost(id: "{}") {{ upVotedBy downVotedBy }} }}"#,
        post.id
    );
    let value = data(execute(&schema, RequestIdentity(Some(voter.clone())), &downvote).await);
    assert_eq!(value["downvotePost"]["upVotedBy"], json!([]));
    assert_eq!(
        value["downvotePost"]["downVotedBy"],
        json!([voter.id.to_string()])
    );
}

#[tokio::test]
async fn votes_from_different_users_accumulate() {
    let (schema, store) = test_schema();
    let first = seeded_user(&store, "alice").await;
    let second = seeded_user(&store, "bob").await;
    let post = seeded_post(&store, "Hello", "rust").await;

    let mutation = format!(r#"mutation {{ upvotePost(id: "{}") {{ upVotedBy }} }}"#, post.id);
    data(execute(&schema, RequestIdentity(Some(first.clone())), &mutation).await);
    let value = data(execute(&schema, RequestIdentity(Some(second.clone())), &mutation).await);

    let mut expected = vec![first.id.to_string(), second.id.to_string()];
    expected.sort();
    assert_eq!(value["upvotePost"]["upVotedBy"], json!(expected));
}

#[tokio::test]
async fn voting_on_a_missing_post_is_reported() {
    let (schema, store) = test_schema();
    let voter = seeded_user(&store, "alice").await;

    let mutation = format!(
        r#"mutation {{ upvotePost(id: "{}") {{ id }} }}"#,
        Id::<PostMarker>::generate()
    );
    let response = execute(&schema, RequestIdentity(Some(voter)), &mutation).await;
    assert_eq!(first_error_code(response), "NOT_FOUND");
}

#[tokio::test]
async fn replies_carry_their_parent_comment() {
    let (schema, store) = test_schema();
    let user = seeded_user(&store, "alice").await;
    let post = seeded_post(&store, "Hello", "rust").await;
    let parent = seeded_comment(&store, post.id, "First").await;

    let mutation = format!(
        r#"mutation {{
            createComment(body: "I agree", parentPost: "{}", parentComment: "{}") {{
                body parentPost parentComment edited
            }}
        }}"#,
        post.id, parent.id
    );
    let value = data(execute(&schema, RequestIdentity(Some(user)), &mutation).await);
    assert_eq!(value["createComment"]["body"], "I agree");
    assert_eq!(value["createComment"]["parentPost"], post.id.to_string());
    assert_eq!(value["createComment"]["parentComment"], parent.id.to_string());
    assert_eq!(value["createComment"]["edited"], json!(false));
}

#[tokio::test]
async fn editing_overwrites_the_body_and_marks_the_comment() {
    let (schema, store) = test_schema();
    let user = seeded_user(&store, "alice").await;
    let post = seeded_post(&store, "Hello", "rust").await;
    let comment = seeded_comment(&store, post.id, "Frist").await;

    let mutation = format!(
        r#"mutation {{ editComment(id: "{}", body: "First") {{ body edited }} }}"#,
        comment.id
    );
    let value = data(execute(&schema, RequestIdentity(Some(user.clone())), &mutation).await);
    assert_eq!(value["editComment"]["body"], "First");
    assert_eq!(value["editComment"]["edited"], json!(true));

    // A second edit keeps the marker set.
    let value = data(execute(&schema, RequestIdentity(Some(user)), &mutation).await);
    assert_eq!(value["editComment"]["edited"], json!(true));
}

#[tokio::test]
async fn editing_a_missing_comment_is_reported() {
    let (schema, store) = test_schema();
    let user = seeded_user(&store, "alice").await;

    let mutation = format!(
        r#"mutation {{ editComment(id: "{}", body: "B") {{ id }} }}"#,
        Id::<CommentMarker>::generate()
    );
    let response = execute(&schema, RequestIdentity(Some(user)), &mutation).await;
    assert_eq!(first_error_code(response), "NOT_FOUND");
}

#[tokio::test]
async fn joining_twice_keeps_one_membership() {
    let (schema, store) = test_schema();
    let user = seeded_user(&store, "alice").await;
    let subreddit = seeded_subreddit(&store, "rust").await;

    let mutation = r#"mutation { joinSubreddit(name: "rust") { id } }"#;
    data(execute(&schema, RequestIdentity(Some(user.clone())), mutation).await);
    data(execute(&schema, fresh_identity(&store, user.id).await, mutation).await);

    let user = store.fetch_user(user.id).await.unwrap().unwrap();
    assert_eq!(user.subreddits, vec![subreddit.id]);
}

#[tokio::test]
async fn joining_an_unknown_subreddit_is_reported() {
    let (schema, store) = test_schema();
    let user = seeded_user(&store, "alice").await;

    let response = execute(
        &schema,
        RequestIdentity(Some(user)),
        r#"mutation { joinSubreddit(name: "nowhere") { id } }"#,
    )
    .await;
    assert_eq!(first_error_code(response), "NOT_FOUND");
}

#[tokio::test]
async fn leaving_removes_the_membership() {
    let (schema, store) = test_schema();
    let user = seeded_user(&store, "alice").await;
    seeded_subreddit(&store, "rust").await;

    let join = r#"mutation { joinSubreddit(name: "rust") { id } }"#;
    let leave = r#"mutation { leaveSubreddit(name: "rust") { id } }"#;

    data(execute(&schema, RequestIdentity(Some(user.clone())), join).await);
    data(execute(&schema, fresh_identity(&store, user.id).await, leave).await);
    let stored = store.fetch_user(user.id).await.unwrap().unwrap();
    assert!(stored.subreddits.is_empty());

    // Leaving without a membership is a no-op.
    data(execute(&schema, fresh_identity(&store, user.id).await, leave).await);
    let stored = store.fetch_user(user.id).await.unwrap().unwrap();
    assert!(stored.subreddits.is_empty());
}

#[tokio::test]
async fn subreddit_memberships_keep_join_order() {
    let (schema, store) = test_schema();
    let user = seeded_user(&store, "alice").await;
    seeded_subreddit(&store, "rust").await;
    seeded_subreddit(&store, "news").await;

    let join_rust = r#"mutation { joinSubreddit(name: "rust") { id } }"#;
    data(execute(&schema, RequestIdentity(Some(user.clone())), join_rust).await);

    let join_news = r#"mutation { joinSubreddit(name: "news") { subreddits { name } } }"#;
    let value = data(execute(&schema, fresh_identity(&store, user.id).await, join_news).await);
    assert_eq!(
        value["joinSubreddit"]["subreddits"],
        json!([{ "name": "rust" }, { "name": "news" }])
    );
}

#[tokio::test]
async fn memberships_changed_in_one_request_build_on_each_other() {
    let (schema, store) = test_schema();
    let user = seeded_user(&store, "alice").await;
    seeded_subreddit(&store, "rust").await;
    let news = seeded_subreddit(&store, "news").await;

    // Root mutation fields run serially; each must see the writes of the
    // fields before it.
    let mutation = r#"mutation {
        a: joinSubreddit(name: "rust") { id }
        b: joinSubreddit(name: "news") { id }
        c: leaveSubreddit(name: "rust") { subreddits { name } }
    }"#;
    let value = data(execute(&schema, RequestIdentity(Some(user.clone())), mutation).await);
    assert_eq!(value["c"]["subreddits"], json!([{ "name": "news" }]));

    let stored = store.fetch_user(user.id).await.unwrap().unwrap();
    assert_eq!(stored.subreddits, vec![news.id]);
}

#[tokio::test]
async fn posts_can_be_filtered_by_subreddit() {
    let (schema, store) = test_schema();
    seeded_post(&store, "Borrow checker", "rust").await;
    seeded_post(&store, "Election", "news").await;

    let value = data(
        execute(
            &schema,
            RequestIdentity::default(),
            r#"{ posts(subreddit: "rust") { title } }"#,
        )
        .await,
    );
    assert_eq!(sorted_field(&value, "posts", "title"), ["Borrow checker"]);

    let value = data(
        execute(
            &schema,
            RequestIdentity::default(),
            r#"{ posts(subreddit: "all") { title } }"#,
        )
        .await,
    );
    assert_eq!(
        sorted_field(&value, "posts", "title"),
        ["Borrow checker", "Election"]
    );

    let value = data(execute(&schema, RequestIdentity::default(), "{ posts { title } }").await);
    assert_eq!(
        sorted_field(&value, "posts", "title"),
        ["Borrow checker", "Election"]
    );
}

#[tokio::test]
async fn lookups_without_arguments_resolve_to_nothing() {
    let (schema, store) = test_schema();
    seeded_user(&store, "alice").await;
    seeded_subreddit(&store, "rust").await;

    let value = data(
        execute(
            &schema,
            RequestIdentity::default(),
            "{ user { id } subreddit { id } }",
        )
        .await,
    );
    assert_eq!(value, json!({ "user": null, "subreddit": null }));
}

#[tokio::test]
async fn missing_records_resolve_to_nothing() {
    let (schema, _store) = test_schema();

    let query = format!(
        r#"{{
            post(id: "{}") {{ id }}
            user(userId: "{}") {{ id }}
            subreddit(name: "nowhere") {{ id }}
        }}"#,
        Id::<PostMarker>::generate(),
        Id::<UserMarker>::generate()
    );
    let value = data(execute(&schema, RequestIdentity::default(), &query).await);
    assert_eq!(value, json!({ "post": null, "user": null, "subreddit": null }));
}

#[tokio::test]
async fn comments_resolve_on_their_post() {
    let (schema, store) = test_schema();
    let post = seeded_post(&store, "Hello", "rust").await;
    let other = seeded_post(&store, "Other", "rust").await;
    seeded_comment(&store, post.id, "On the post").await;
    seeded_comment(&store, other.id, "Elsewhere").await;

    let query = format!(r#"{{ post(id: "{}") {{ comments {{ body }} }} }}"#, post.id);
    let value = data(execute(&schema, RequestIdentity::default(), &query).await);
    assert_eq!(
        value["post"],
        json!({ "comments": [{ "body": "On the post" }] })
    );
}

#[tokio::test]
async fn dangling_post_references_are_skipped() {
    let (schema, store) = test_schema();
    let mut user = seeded_user(&store, "alice").await;
    let post = seeded_post(&store, "Hello", "rust").await;
    user.posts = vec![Id::generate(), post.id];
    store.save_user(&user).await.unwrap();

    let query = format!(r#"{{ user(userId: "{}") {{ posts {{ title }} }} }}"#, user.id);
    let value = data(execute(&schema, RequestIdentity::default(), &query).await);
    assert_eq!(value["user"], json!({ "posts": [{ "title": "Hello" }] }));
}

#[tokio::test]
async fn anonymous_requests_have_no_identity() {
    let (schema, _store) = test_schema();

    let value = data(execute(&schema, RequestIdentity::default(), "{ me { username } }").await);
    assert_eq!(value, json!({ "me": null }));
}
