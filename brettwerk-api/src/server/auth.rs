use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use brettwerk_common::model::{
    auth::{AuthToken, TokenSecret},
    user::User,
};
use brettwerk_db::BoardStore;
use std::sync::Arc;

pub const BEARER_PREFIX: &str = "bearer ";

/// Who the request is from, if anyone. Requests without a bearer
/// authorization header are served anonymously; a bearer header that does
/// not hold a valid token fails the whole request.
#[derive(Clone, Debug, Default)]
pub struct RequestIdentity(pub Option<User>);

impl RequestIdentity {
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let (prefix, token) = header.split_at_checked(BEARER_PREFIX.len())?;
    prefix.eq_ignore_ascii_case(BEARER_PREFIX).then_some(token)
}

pub async fn resolve_identity(
    header: Option<&str>,
    store: &dyn BoardStore,
    secret: &TokenSecret,
) -> Result<RequestIdentity, ServerError> {
    let Some(token) = header.and_then(bearer_token) else {
        return Ok(RequestIdentity(None));
    };

    let token: AuthToken = token.parse()?;
    let claims = token.verify(secret)?;

    // The claims name a user, but only the database decides whether that
    // user still exists.
    let user = store.fetch_user(claims.id).await?;
    Ok(RequestIdentity(user))
}

impl<S> FromRequestParts<S> for RequestIdentity
where
    Arc<dyn BoardStore>: FromRef<S>,
    TokenSecret: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        let store = Arc::<dyn BoardStore>::from_ref(state);
        let secret = TokenSecret::from_ref(state);

        resolve_identity(header, store.as_ref(), &secret).await
    }
}
