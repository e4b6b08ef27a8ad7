use crate::core::errors::ExchangeError;
use crate::core::kernel::signer::{build_query_string, Signer};
use crate::core::nonce::NonceFactory;
use reqwest::Method;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// A request after parameter binding and before it hits the wire.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub endpoint: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub authenticated: bool,
}

impl PreparedRequest {
    pub fn new(method: Method, endpoint: &str, query: &[(&str, &str)], body: &[u8]) -> Self {
        Self {
            method,
            endpoint: endpoint.to_string(),
            query: query
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            headers: Vec::new(),
            body: body.to_vec(),
            authenticated: false,
        }
    }

    pub fn query_string(&self) -> String {
        build_query_string(&self.query)
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers
            .iter()
            .any(|(key, _)| key.eq_ignore_ascii_case(name))
    }
}

/// Hook run around every request a built client sends, in chain order.
pub trait Interceptor: Send + Sync {
    fn name(&self) -> &str;

    fn before_request(&self, _request: &mut PreparedRequest) -> Result<(), ExchangeError> {
        Ok(())
    }

    fn after_response(&self, _request: &PreparedRequest, _status: u16, _elapsed: Duration) {}

    /// Called instead of `after_response` when the request never produced a
    /// response (connect, DNS or timeout failures).
    fn on_error(&self, _request: &PreparedRequest, _error: &ExchangeError, _elapsed: Duration) {}

    /// Whether this interceptor authenticates requests.
    fn signs_requests(&self) -> bool {
        false
    }
}

/// Logs every request and its outcome.
#[derive(Debug, Clone)]
pub struct TracingInterceptor {
    exchange_name: String,
}

impl TracingInterceptor {
    pub fn new(exchange_name: impl Into<String>) -> Self {
        Self {
            exchange_name: exchange_name.into(),
        }
    }
}

impl Interceptor for TracingInterceptor {
    fn name(&self) -> &str {
        "tracing"
    }

    fn before_request(&self, request: &mut PreparedRequest) -> Result<(), ExchangeError> {
        trace!(
            exchange = %self.exchange_name,
            method = %request.method,
            endpoint = %request.endpoint,
            authenticated = request.authenticated,
            "Sending request"
        );
        Ok(())
    }

    fn after_response(&self, request: &PreparedRequest, status: u16, elapsed: Duration) {
        debug!(
            exchange = %self.exchange_name,
            method = %request.method,
            endpoint = %request.endpoint,
            status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Request completed"
        );
    }

    fn on_error(&self, request: &PreparedRequest, error: &ExchangeError, elapsed: Duration) {
        warn!(
            exchange = %self.exchange_name,
            method = %request.method,
            endpoint = %request.endpoint,
            kind = %error.kind(),
            elapsed_ms = elapsed.as_millis() as u64,
            error = %error,
            "Request failed before a response"
        );
    }
}

/// Signs authenticated requests with a fresh nonce per request.
pub struct SigningInterceptor {
    signer: Arc<dyn Signer>,
    nonce_factory: Arc<dyn NonceFactory>,
}

impl SigningInterceptor {
    pub fn new(signer: Arc<dyn Signer>, nonce_factory: Arc<dyn NonceFactory>) -> Self {
        Self {
            signer,
            nonce_factory,
        }
    }
}

impl Interceptor for SigningInterceptor {
    fn name(&self) -> &str {
        "signing"
    }

    fn before_request(&self, request: &mut PreparedRequest) -> Result<(), ExchangeError> {
        if !request.authenticated {
            return Ok(());
        }

        let nonce = self.nonce_factory.create_value();
        let signed = self.signer.sign_request(
            request.method.as_str(),
            &request.endpoint,
            &request.query_string(),
            &request.body,
            nonce,
        )?;

        request.query = signed.query;
        request.headers.extend(signed.headers);
        if let Some(body) = signed.body {
            request.body = body;
        }
        Ok(())
    }

    fn signs_requests(&self) -> bool {
        true
    }
}

impl fmt::Debug for SigningInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningInterceptor").finish_non_exhaustive()
    }
}

/// The chain every client starts with.
pub fn default_interceptors(exchange_name: &str) -> Vec<Arc<dyn Interceptor>> {
    vec![Arc::new(TracingInterceptor::new(exchange_name))]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kernel::signer::{SignatureResult, SignedParts};
    use crate::core::nonce::TimeAnchoredNonceFactory;
    use std::collections::HashMap;

    struct EchoNonceSigner;

    impl Signer for EchoNonceSigner {
        fn sign_request(
            &self,
            _method: &str,
            _endpoint: &str,
            query_string: &str,
            _body: &[u8],
            nonce: u64,
        ) -> SignatureResult {
            let mut query = crate::core::kernel::signer::parse_query(query_string);
            query.push(("nonce".to_string(), nonce.to_string()));
            Ok(SignedParts {
                headers: HashMap::from([("X-Sig".to_string(), "ok".to_string())]),
                query,
                body: None,
            })
        }
    }

    #[test]
    fn test_signing_interceptor_skips_public_requests() {
        let interceptor = SigningInterceptor::new(
            Arc::new(EchoNonceSigner),
            Arc::new(TimeAnchoredNonceFactory::new()),
        );
        let mut request = PreparedRequest::new(Method::GET, "/ticker", &[("pair", "XBTUSD")], &[]);
        interceptor.before_request(&mut request).unwrap();
        assert_eq!(request.query_string(), "pair=XBTUSD");
        assert!(request.headers.is_empty());
    }

    #[test]
    fn test_signing_interceptor_uses_fresh_nonces() {
        let interceptor = SigningInterceptor::new(
            Arc::new(EchoNonceSigner),
            Arc::new(TimeAnchoredNonceFactory::new()),
        );

        let mut nonces = Vec::new();
        for _ in 0..3 {
            let mut request = PreparedRequest::new(Method::POST, "/order", &[("qty", "1")], &[]);
            request.authenticated = true;
            interceptor.before_request(&mut request).unwrap();
            assert!(request.has_header("x-sig"));
            let (_, nonce) = request.query.last().unwrap().clone();
            nonces.push(nonce.parse::<u64>().unwrap());
        }
        assert!(nonces.windows(2).all(|w| w[0] < w[1]));
    }
}
