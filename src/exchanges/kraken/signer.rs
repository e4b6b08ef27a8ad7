use crate::core::errors::ExchangeError;
use crate::core::kernel::signer::{SignatureResult, SignedParts};
use crate::core::kernel::Signer;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};
use std::collections::HashMap;
use zeroize::Zeroizing;

type HmacSha512 = Hmac<Sha512>;

/// `API-Sign = base64(HMAC-SHA512(path + SHA256(nonce + postdata), base64_decode(secret)))`.
///
/// Parameters travel as a form body that starts with `nonce=`.
pub struct KrakenSigner {
    api_key: String,
    secret: Zeroizing<Vec<u8>>,
}

impl KrakenSigner {
    pub fn new(api_key: String, secret_key: &str) -> Result<Self, ExchangeError> {
        let secret = STANDARD.decode(secret_key.trim()).map_err(|e| {
            ExchangeError::AuthError(format!("Kraken secret is not valid base64: {}", e))
        })?;
        Ok(Self {
            api_key,
            secret: Zeroizing::new(secret),
        })
    }

    fn signature(&self, path: &str, nonce: u64, post_data: &str) -> Result<String, ExchangeError> {
        let digest = Sha256::digest(format!("{}{}", nonce, post_data).as_bytes());

        let mut mac = HmacSha512::new_from_slice(&self.secret)
            .map_err(|e| ExchangeError::AuthError(format!("Failed to create HMAC: {}", e)))?;
        mac.update(path.as_bytes());
        mac.update(&digest);
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

impl Signer for KrakenSigner {
    fn sign_request(
        &self,
        _method: &str,
        endpoint: &str,
        query_string: &str,
        _body: &[u8],
        nonce: u64,
    ) -> SignatureResult {
        let post_data = if query_string.is_empty() {
            format!("nonce={}", nonce)
        } else {
            format!("nonce={}&{}", nonce, query_string)
        };
        let signature = self.signature(endpoint, nonce, &post_data)?;

        let headers = HashMap::from([
            ("API-Key".to_string(), self.api_key.clone()),
            ("API-Sign".to_string(), signature),
            (
                "Content-Type".to_string(),
                "application/x-www-form-urlencoded".to_string(),
            ),
        ]);

        Ok(SignedParts {
            headers,
            query: Vec::new(),
            body: Some(post_data.into_bytes()),
        })
    }
}
