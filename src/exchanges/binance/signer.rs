use crate::core::kernel::signer::{hmac_sha256_hex, parse_query, SignatureResult, SignedParts};
use crate::core::kernel::Signer;
use secrecy::{ExposeSecret, Secret};
use std::collections::HashMap;

pub const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// HMAC-SHA256 over the full query string, with the nonce sent as `timestamp`.
pub struct BinanceSigner {
    api_key: String,
    secret_key: Secret<String>,
}

impl BinanceSigner {
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            api_key,
            secret_key: Secret::new(secret_key),
        }
    }
}

impl Signer for BinanceSigner {
    fn sign_request(
        &self,
        _method: &str,
        _endpoint: &str,
        query_string: &str,
        _body: &[u8],
        nonce: u64,
    ) -> SignatureResult {
        let full_query = if query_string.is_empty() {
            format!("timestamp={}", nonce)
        } else {
            format!("{}&timestamp={}", query_string, nonce)
        };

        let signature = hmac_sha256_hex(
            self.secret_key.expose_secret().as_bytes(),
            full_query.as_bytes(),
        )?;

        let mut query = parse_query(&full_query);
        query.push(("signature".to_string(), signature));

        let mut headers = HashMap::new();
        headers.insert(API_KEY_HEADER.to_string(), self.api_key.clone());

        Ok(SignedParts {
            headers,
            query,
            body: None,
        })
    }
}
