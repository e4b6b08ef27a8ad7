use crate::core::errors::ExchangeError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::HashMap;
use url::form_urlencoded;

/// Everything a signer contributes to an outgoing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignedParts {
    pub headers: HashMap<String, String>,
    /// Complete query to send, replacing the unsigned one
    pub query: Vec<(String, String)>,
    /// Replacement body, when the signature lives in the body
    pub body: Option<Vec<u8>>,
}

pub type SignatureResult = Result<SignedParts, ExchangeError>;

/// Signer trait for request authentication
///
/// This trait provides a unified interface for different authentication methods
/// used by various exchanges. Implementations handle the specific signing logic
/// for each exchange's requirements.
pub trait Signer: Send + Sync {
    /// Sign a request
    ///
    /// # Arguments
    /// * `method` - HTTP method (GET, POST, etc.)
    /// * `endpoint` - API endpoint path
    /// * `query_string` - Query string (without leading '?')
    /// * `body` - Raw request body bytes
    /// * `nonce` - Fresh anti-replay value for this request
    fn sign_request(
        &self,
        method: &str,
        endpoint: &str,
        query_string: &str,
        body: &[u8],
        nonce: u64,
    ) -> SignatureResult;
}

/// Hex-encoded HMAC-SHA256, the scheme most exchanges use for query signing.
pub fn hmac_sha256_hex(secret: &[u8], payload: &[u8]) -> Result<String, ExchangeError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret)
        .map_err(|e| ExchangeError::AuthError(format!("Invalid secret key: {}", e)))?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Decode an `application/x-www-form-urlencoded` string back into pairs.
pub fn parse_query(query_string: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(query_string.as_bytes())
        .into_owned()
        .collect()
}

/// Form-urlencode `params` in order. This exact string is both what gets
/// signed and what goes on the wire.
pub fn build_query_string<K: AsRef<str>, V: AsRef<str>>(params: &[(K, V)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (k, v) in params {
        serializer.append_pair(k.as_ref(), v.as_ref());
    }
    serializer.finish()
}
