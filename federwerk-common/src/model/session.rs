use crate::model::Id;
use crate::model::user::{UserMarker, Username};
use base64::{DecodeError, Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt::{Debug, Formatter};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// The identity carried by a session token. Exists only inside the token;
/// the server keeps no session table.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub id: Id<UserMarker>,
    pub username: Username,
}

#[derive(Debug, Error)]
pub enum SessionDecodeError {
    #[error("The token has no signature part")]
    MissingSignature,
    #[error("Decoding base64 failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("The signature does not match")]
    BadSignature,
    #[error("The payload is malformed: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Symmetric signer turning a [`SessionIdentity`] into an opaque, cookie-safe
/// token and back. Tokens are signed, not encrypted; the payload is readable
/// by the client but any modification breaks the signature.
///
/// The key is fixed for the lifetime of the codec. There is no rotation.
#[derive(Clone)]
pub struct SessionCodec {
    mac: HmacSha256,
}

impl SessionCodec {
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        let mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
        Self { mac }
    }

    /// Deterministic signed serialization: `base64url(payload).base64url(tag)`
    /// where the tag covers the encoded payload.
    pub fn encode(&self, identity: &SessionIdentity) -> Result<String, serde_json::Error> {
        let payload = BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_vec(identity)?);
        let tag = self.sign(payload.as_bytes());
        let encoded_tag = BASE64_URL_SAFE_NO_PAD.encode(tag);

        Ok(format!("{payload}.{encoded_tag}"))
    }

    /// Verifies the signature in constant time before touching the payload.
    /// Callers must treat any error as "not authenticated", never as fatal.
    pub fn decode(&self, token: &str) -> Result<SessionIdentity, SessionDecodeError> {
        let (payload, encoded_tag) = token
            .split_once('.')
            .ok_or(SessionDecodeError::MissingSignature)?;

        let tag = BASE64_URL_SAFE_NO_PAD.decode(encoded_tag)?;
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.verify_slice(&tag)
            .map_err(|_| SessionDecodeError::BadSignature)?;

        let payload = BASE64_URL_SAFE_NO_PAD.decode(payload)?;
        Ok(serde_json::from_slice(&payload)?)
    }

    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

impl Debug for SessionCodec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec")
            .field("mac", &"[redacted]")
            .finish()
    }
}
