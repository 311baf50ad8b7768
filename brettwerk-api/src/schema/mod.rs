pub mod error;

mod mutation;
mod query;
mod types;

#[cfg(test)]
mod tests;

pub use mutation::MutationRoot;
pub use query::QueryRoot;

use async_graphql::{Context, EmptySubscription, Schema};
use brettwerk_common::model::auth::TokenSecret;
use brettwerk_db::BoardStore;
use std::sync::Arc;

pub type BoardSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Builds the executable schema. The store and the token secret live in the
/// schema data so every resolver can reach them.
pub fn build_schema(store: Arc<dyn BoardStore>, token_secret: TokenSecret) -> BoardSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(store)
        .data(token_secret)
        .finish()
}

pub(crate) fn store<'a>(ctx: &'a Context<'_>) -> async_graphql::Result<&'a Arc<dyn BoardStore>> {
    ctx.data()
}
