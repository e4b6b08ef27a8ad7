use crate::core::config::ExchangeConfig;
use crate::core::errors::ExchangeError;
use crate::core::kernel::interceptor::{
    default_interceptors, Interceptor, PreparedRequest, SigningInterceptor,
};
use crate::core::kernel::signer::Signer;
use crate::core::nonce::NonceFactory;
use async_trait::async_trait;
use reqwest::{Client, Method, Request, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{instrument, trace};

pub const DEFAULT_USER_AGENT: &str = concat!("tradewire/", env!("CARGO_PKG_VERSION"));

/// REST client trait for making HTTP requests
///
/// This trait provides a unified interface for HTTP operations across different exchanges.
/// Authentication and request formatting live in the interceptor chain of the
/// implementation, not in the callers.
#[async_trait]
pub trait RestClient: Send + Sync {
    /// Make a GET request
    ///
    /// # Arguments
    /// * `endpoint` - The API endpoint path
    /// * `query_params` - Query parameters as key-value pairs
    /// * `authenticated` - Whether to sign the request
    async fn get(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<Value, ExchangeError>;

    /// Make a GET request with strongly-typed response
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<T, ExchangeError>;

    /// Make a POST request with a JSON body
    async fn post_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &Value,
        authenticated: bool,
    ) -> Result<T, ExchangeError>;

    /// Make a DELETE request with strongly-typed response
    async fn delete_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<T, ExchangeError>;

    /// Make a signed request with custom method and strongly-typed response
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `endpoint` - The API endpoint path
    /// * `query_params` - Query parameters as key-value pairs
    /// * `body` - Request body as raw bytes
    async fn signed_request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        query_params: &[(&str, &str)],
        body: &[u8],
    ) -> Result<T, ExchangeError>;
}

/// Transport settings a client is built from.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    pub base_url: String,
    pub connect_timeout: Option<Duration>,
    /// reqwest 0.11 has no separate read timeout, so this bounds the whole
    /// request once connected.
    pub read_timeout: Option<Duration>,
    pub proxy_host: Option<String>,
    pub proxy_port: Option<u16>,
    pub user_agent: String,
}

impl TransportConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            connect_timeout: None,
            read_timeout: None,
            proxy_host: None,
            proxy_port: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Seed transport settings from an exchange configuration. Zero timeouts
    /// and unset proxy fields keep the transport defaults.
    pub fn from_exchange(config: &ExchangeConfig) -> Self {
        let positive = |millis: u64| (millis > 0).then(|| Duration::from_millis(millis));
        Self {
            base_url: config.preferred_uri().unwrap_or_default().to_string(),
            connect_timeout: positive(config.http_conn_timeout_ms),
            read_timeout: positive(config.http_read_timeout_ms),
            proxy_host: config.proxy_host.clone().filter(|host| !host.is_empty()),
            proxy_port: config.proxy_port,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn proxy_url(&self) -> Option<String> {
        let host = self.proxy_host.as_deref()?;
        Some(match self.proxy_port {
            Some(port) => format!("http://{}:{}", host, port),
            None => format!("http://{}", host),
        })
    }
}

/// A typed endpoint surface that can sit on top of a built transport.
pub trait RestEndpoints: Sized {
    fn bind(rest: ReqwestRest) -> Self;
}

impl RestEndpoints for ReqwestRest {
    fn bind(rest: ReqwestRest) -> Self {
        rest
    }
}

type TransportCustomizer = Box<dyn FnOnce(&mut TransportConfig) + Send>;

/// Builds a client for the endpoint surface `E` from an exchange
/// configuration.
///
/// Every client starts with the default interceptor chain; custom
/// interceptors run after it, in the order they were added. Configuration
/// errors such as a missing base URL surface from [`build`](Self::build),
/// never from a later request.
pub struct RestClientBuilder<E = ReqwestRest> {
    exchange_name: String,
    transport: TransportConfig,
    interceptors: Vec<Arc<dyn Interceptor>>,
    customizers: Vec<TransportCustomizer>,
    _endpoints: PhantomData<fn() -> E>,
}

impl<E: RestEndpoints> RestClientBuilder<E> {
    pub fn for_interface(config: &ExchangeConfig) -> Self {
        Self {
            exchange_name: config.exchange_name.clone(),
            transport: TransportConfig::from_exchange(config),
            interceptors: default_interceptors(&config.exchange_name),
            customizers: Vec::new(),
            _endpoints: PhantomData,
        }
    }

    /// Override the base URL taken from the exchange configuration.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.transport.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn custom_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    #[must_use]
    pub fn custom_interceptors<I>(mut self, interceptors: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Interceptor>>,
    {
        self.interceptors.extend(interceptors);
        self
    }

    /// Sign authenticated requests with `signer`, drawing one nonce per request.
    #[must_use]
    pub fn with_signer(
        self,
        signer: Arc<dyn Signer>,
        nonce_factory: Arc<dyn NonceFactory>,
    ) -> Self {
        self.custom_interceptor(Arc::new(SigningInterceptor::new(signer, nonce_factory)))
    }

    /// Adjust the transport settings just before the client is built.
    #[must_use]
    pub fn client_config_customizer<F>(mut self, customizer: F) -> Self
    where
        F: FnOnce(&mut TransportConfig) + Send + 'static,
    {
        self.customizers.push(Box::new(customizer));
        self
    }

    pub fn build(self) -> Result<E, ExchangeError> {
        let mut transport = self.transport;
        for customizer in self.customizers {
            customizer(&mut transport);
        }

        transport.base_url = transport.base_url.trim_end_matches('/').to_string();
        validate_base_url(&self.exchange_name, &transport.base_url)?;

        let mut builder = Client::builder().user_agent(&transport.user_agent);
        if let Some(timeout) = transport.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = transport.read_timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(proxy_url) = transport.proxy_url() {
            let proxy = reqwest::Proxy::all(&proxy_url).map_err(|e| {
                ExchangeError::ConfigurationError(format!("Invalid proxy {}: {}", proxy_url, e))
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(|e| {
            ExchangeError::ConfigurationError(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(E::bind(ReqwestRest {
            client,
            exchange_name: self.exchange_name,
            transport,
            interceptors: self.interceptors.into(),
        }))
    }
}

fn validate_base_url(exchange_name: &str, base_url: &str) -> Result<(), ExchangeError> {
    if base_url.is_empty() {
        return Err(ExchangeError::ConfigurationError(format!(
            "No base URL configured for exchange '{}'",
            exchange_name
        )));
    }
    let url = Url::parse(base_url).map_err(|e| {
        ExchangeError::ConfigurationError(format!("Invalid base URL '{}': {}", base_url, e))
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ExchangeError::ConfigurationError(format!(
            "Unsupported URL scheme '{}' in '{}'",
            other, base_url
        ))),
    }
}

/// Implementation of `RestClient` using reqwest
#[derive(Clone)]
pub struct ReqwestRest {
    client: Client,
    exchange_name: String,
    transport: TransportConfig,
    interceptors: Arc<[Arc<dyn Interceptor>]>,
}

impl std::fmt::Debug for ReqwestRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestRest")
            .field("exchange_name", &self.exchange_name)
            .field("transport", &self.transport)
            .field("interceptors", &self.interceptor_names())
            .finish_non_exhaustive()
    }
}

impl ReqwestRest {
    pub fn exchange_name(&self) -> &str {
        &self.exchange_name
    }

    pub fn transport(&self) -> &TransportConfig {
        &self.transport
    }

    pub fn interceptor_names(&self) -> Vec<&str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    fn can_sign(&self) -> bool {
        self.interceptors.iter().any(|i| i.signs_requests())
    }

    fn build_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.transport.base_url, endpoint)
    }

    #[instrument(skip(self, response), fields(exchange = %self.exchange_name, status = %response.status()))]
    async fn handle_response(&self, response: Response) -> Result<Value, ExchangeError> {
        let status = response.status();
        let response_text = response.text().await?;

        trace!("Response body: {}", response_text);

        if status.is_success() {
            serde_json::from_str(&response_text).map_err(|e| {
                ExchangeError::DeserializationError(format!("Failed to parse JSON response: {}", e))
            })
        } else {
            Err(ExchangeError::from_status(status.as_u16(), response_text))
        }
    }

    /// Run the interceptor chain over a request and turn it into the exact
    /// `reqwest::Request` that will be sent.
    ///
    /// The query is appended to the URL already encoded, so the bytes on the
    /// wire are the bytes a signer saw.
    pub fn prepare(
        &self,
        method: Method,
        endpoint: &str,
        query_params: &[(&str, &str)],
        body: &[u8],
        authenticated: bool,
    ) -> Result<(PreparedRequest, Request), ExchangeError> {
        if authenticated && !self.can_sign() {
            return Err(ExchangeError::AuthError(
                "Authentication required but no signer provided".to_string(),
            ));
        }

        let mut prepared = PreparedRequest::new(method, endpoint, query_params, body);
        prepared.authenticated = authenticated;
        for interceptor in self.interceptors.iter() {
            interceptor.before_request(&mut prepared)?;
        }

        let mut url = self.build_url(&prepared.endpoint);
        if !prepared.query.is_empty() {
            url.push('?');
            url.push_str(&prepared.query_string());
        }
        let url = Url::parse(&url).map_err(|e| {
            ExchangeError::InvalidParameters(format!("Invalid request URL '{}': {}", url, e))
        })?;

        let mut request = self.client.request(prepared.method.clone(), url);
        for (key, value) in &prepared.headers {
            request = request.header(key.as_str(), value.as_str());
        }
        if !prepared.body.is_empty() {
            if !prepared.has_header("Content-Type") {
                request = request.header("Content-Type", "application/json");
            }
            request = request.body(prepared.body.clone());
        }

        let request = request.build()?;
        Ok((prepared, request))
    }

    #[instrument(skip(self, query_params, body), fields(exchange = %self.exchange_name, method = %method, endpoint = %endpoint))]
    async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        query_params: &[(&str, &str)],
        body: &[u8],
        authenticated: bool,
    ) -> Result<Value, ExchangeError> {
        let (prepared, request) =
            self.prepare(method, endpoint, query_params, body, authenticated)?;

        let started = Instant::now();
        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                let error = ExchangeError::from(e);
                for interceptor in self.interceptors.iter() {
                    interceptor.on_error(&prepared, &error, started.elapsed());
                }
                return Err(error);
            }
        };
        let status = response.status().as_u16();
        for interceptor in self.interceptors.iter() {
            interceptor.after_response(&prepared, status, started.elapsed());
        }

        self.handle_response(response).await
    }
}

fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, ExchangeError> {
    serde_json::from_value(value).map_err(|e| {
        ExchangeError::DeserializationError(format!("Failed to deserialize JSON: {}", e))
    })
}

#[async_trait]
impl RestClient for ReqwestRest {
    async fn get(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<Value, ExchangeError> {
        self.make_request(Method::GET, endpoint, query_params, &[], authenticated)
            .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<T, ExchangeError> {
        self.make_request(Method::GET, endpoint, query_params, &[], authenticated)
            .await
            .and_then(from_value)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &Value,
        authenticated: bool,
    ) -> Result<T, ExchangeError> {
        let body_bytes = serde_json::to_vec(body).map_err(|e| {
            ExchangeError::SerializationError(format!("Failed to serialize request body: {}", e))
        })?;

        self.make_request(Method::POST, endpoint, &[], &body_bytes, authenticated)
            .await
            .and_then(from_value)
    }

    async fn delete_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<T, ExchangeError> {
        self.make_request(Method::DELETE, endpoint, query_params, &[], authenticated)
            .await
            .and_then(from_value)
    }

    async fn signed_request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        query_params: &[(&str, &str)],
        body: &[u8],
    ) -> Result<T, ExchangeError> {
        self.make_request(method, endpoint, query_params, body, true)
            .await
            .and_then(from_value)
    }
}
