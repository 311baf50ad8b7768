use crate::model::{
    Id,
    user::{UserMarker, Username},
};
use base64::{DecodeError, Engine, display::Base64Display, prelude::BASE64_STANDARD};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::{
    fmt::{Debug, Formatter},
    str::FromStr,
};
use thiserror::Error;

pub const AUTH_TOKEN_SIGNATURE_LEN: usize = 32;

/// What a token attests to. Carried verbatim inside the token, so it is
/// only trustworthy after [`AuthToken::verify`].
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct TokenClaims {
    pub id: Id<UserMarker>,
    pub username: Username,
}

// No `Eq`: `hex::FromHexError` only implements `PartialEq`.
#[derive(Clone, PartialEq, Debug, Error)]
pub enum AuthTokenDecodeError {
    #[error("Not enough parts separated by ':'")]
    NotEnoughParts,
    #[error("Decoding base64 failed: {0}")]
    DecodeBase64(#[from] DecodeError),
    #[error("Decoding hex failed: {0}")]
    DecodeHex(#[from] hex::FromHexError),
    #[error("The length of the signature part is incorrect")]
    InvalidSignatureLength,
}

#[derive(Debug, Error)]
pub enum AuthTokenVerifyError {
    #[error("The token signature does not match")]
    BadSignature,
    #[error("The token claims could not be parsed: {0}")]
    Claims(#[from] serde_json::Error),
}

/// A signed bearer token: the JSON claims payload plus an HMAC-SHA256
/// signature over it. The wire form is `base64(payload):hex(signature)`.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct AuthToken {
    pub payload: Vec<u8>,
    pub signature: [u8; AUTH_TOKEN_SIGNATURE_LEN],
}

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct TokenSecret(Vec<u8>);

impl AuthToken {
    pub fn issue(claims: &TokenClaims, secret: &TokenSecret) -> Result<Self, serde_json::Error> {
        let payload = serde_json::to_vec(claims)?;
        let signature = hmac_signature(&payload, secret);

        Ok(Self { payload, signature })
    }

    pub fn verify(&self, secret: &TokenSecret) -> Result<TokenClaims, AuthTokenVerifyError> {
        let expected = hmac_signature(&self.payload, secret);

        // Bitwise accumulation so the comparison takes the same time on
        // every input.
        let mismatch = self
            .signature
            .iter()
            .zip(expected.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b));
        if mismatch != 0 {
            return Err(AuthTokenVerifyError::BadSignature);
        }

        let claims = serde_json::from_slice(&self.payload)?;
        Ok(claims)
    }

    #[must_use]
    pub fn as_token_str(&self) -> String {
        let encoded_payload = Base64Display::new(&self.payload, &BASE64_STANDARD);
        let encoded_signature = hex::encode(self.signature);

        format!("{encoded_payload}:{encoded_signature}")
    }
}

fn hmac_signature(payload: &[u8], secret: &TokenSecret) -> [u8; AUTH_TOKEN_SIGNATURE_LEN] {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.get()).expect("HMAC accepts any key size");
    mac.update(payload);
    mac.finalize().into_bytes().into()
}

impl FromStr for AuthToken {
    type Err = AuthTokenDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(2, ':');

        let payload_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;
        let signature_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;

        let payload = BASE64_STANDARD.decode(payload_part)?;
        let signature = hex::decode(signature_part)?
            .try_into()
            .map_err(|_| Self::Err::InvalidSignatureLength)?;

        Ok(Self { payload, signature })
    }
}

impl Debug for AuthToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("payload", &"[redacted]")
            .field("signature", &"[redacted]")
            .finish()
    }
}

impl TokenSecret {
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self(secret.into())
    }

    #[must_use]
    pub fn get(&self) -> &[u8] {
        &self.0
    }
}

impl From<String> for TokenSecret {
    fn from(value: String) -> Self {
        Self::new(value.into_bytes())
    }
}

impl Debug for TokenSecret {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TokenSecret").field(&"[redacted]").finish()
    }
}
