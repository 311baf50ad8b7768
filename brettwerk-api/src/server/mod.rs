use crate::schema::{BoardSchema, build_schema};
use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use auth::RequestIdentity;
use axum::{
    Json, Router,
    extract::{FromRef, Request, State},
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use brettwerk_common::model::auth::{AuthTokenDecodeError, AuthTokenVerifyError, TokenSecret};
use brettwerk_db::{BoardStore, StoreError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

pub mod auth;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub schema: BoardSchema,
    pub store: Arc<dyn BoardStore>,
    pub token_secret: TokenSecret,
}

impl ServerState {
    #[must_use]
    pub fn new(store: Arc<dyn BoardStore>, token_secret: TokenSecret) -> Self {
        let schema = build_schema(Arc::clone(&store), token_secret.clone());

        Self {
            schema,
            store,
            token_secret,
        }
    }
}

pub fn routes() -> ServerRouter {
    Router::new()
        .route("/graphql", get(graphiql).post(graphql_handler))
        .fallback(fallback)
}

async fn graphiql() -> Html<String> {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

/// The identity is resolved before execution starts; resolvers read it
/// from the request data and never touch the transport.
async fn graphql_handler(
    State(schema): State<BoardSchema>,
    identity: RequestIdentity,
    request: GraphQLRequest,
) -> GraphQLResponse {
    let request = request.into_inner().data(identity);
    schema.execute(request).await.into()
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("The provided auth token could not be decoded: {0}")]
    InvalidAuthToken(#[from] AuthTokenDecodeError),
    #[error("The provided auth token was rejected: {0}")]
    TokenRejected(#[from] AuthTokenVerifyError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_) => StatusCode::NOT_FOUND,
            ServerError::TokenRejected(_) => StatusCode::UNAUTHORIZED,
            ServerError::InvalidAuthToken(_) => StatusCode::BAD_REQUEST,
            ServerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let error_response = ErrorResponse {
            status: status.as_u16(),
        };
        (status, Json(error_response)).into_response()
    }
}
