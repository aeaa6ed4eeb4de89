#[cfg(feature = "rate_limiting")]
use std::cell::RefCell;
use std::time::Duration;
#[cfg(feature = "rate_limiting")]
use std::time::SystemTime;
use anyhow::Context;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, ClientBuilder};
use reqwest::header::{HeaderMap, HeaderValue};
use url::Url;
use crate::config::ApiConfig;
use crate::endpoints::Endpoints;
use crate::error::ApiError;
use crate::transport::{Api, ApiRequest, ApiResponse, Method, MultipartForm, PartValue, RequestBody};

#[cfg(feature = "rate_limiting")]
const REQUEST_MAX_SPEED: Duration = Duration::from_millis(150);

/// A wrapped reqwest [`Client`], that sends [`ApiRequest`]s to the configured backend
#[derive(Debug)]
pub struct SocialClient {
    client: Client,
    endpoints: Endpoints,
    #[cfg(feature = "rate_limiting")]
    last_request_time: RefCell<SystemTime>,
}

impl SocialClient {

    fn make_client(config: &ApiConfig) -> anyhow::Result<Client> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert("User-Agent", HeaderValue::from_static(concat!("social_client/", env!("CARGO_PKG_VERSION"))));
        default_headers.insert("Accept", HeaderValue::from_static("application/json"));
        ClientBuilder::new()
            // Local development servers only speak plain http
            .https_only(config.base_url.scheme() == "https")
            .timeout(config.timeout)
            .default_headers(default_headers)
            .gzip(true)
            .build()
            .context("Could not build reqwest client")
    }

    /// Creates a client for the backend described by `config`
    pub fn new(config: &ApiConfig) -> anyhow::Result<Self> {
        log::info!("Using {:?} api at {}", config.environment, config.base_url);
        Ok(Self {
            client: Self::make_client(config)?,
            endpoints: config.endpoints(),
            #[cfg(feature = "rate_limiting")]
            last_request_time: RefCell::new(SystemTime::UNIX_EPOCH),
        })
    }

    /// Creates a client for the process wide [`ApiConfig::global()`]
    pub fn from_env() -> anyhow::Result<Self> {
        Self::new(ApiConfig::global()?)
    }

    #[cfg(feature = "rate_limiting")]
    fn before_request(&self) {
        // Rate limits on request creation
        let mut last_request_time = self.last_request_time.borrow_mut();
        let elapsed = last_request_time.elapsed().unwrap_or(Duration::from_secs(0));
        if elapsed > REQUEST_MAX_SPEED {
            *last_request_time = SystemTime::now();
            return;
        }
        let wait_time = REQUEST_MAX_SPEED - elapsed;
        std::thread::sleep(wait_time);
        *last_request_time = SystemTime::now();
    }

    #[cfg(not(feature = "rate_limiting"))]
    fn before_request(&self) {}

    fn to_reqwest_form(form: MultipartForm) -> Result<Form, ApiError> {
        let mut reqwest_form = Form::new();
        for part in form.parts {
            reqwest_form = match part.value {
                PartValue::Text(text) => reqwest_form.text(part.name, text),
                PartValue::File { file_name, mime, bytes } => {
                    let file_part = Part::bytes(bytes)
                        .file_name(file_name)
                        .mime_str(&mime)?;
                    reqwest_form.part(part.name, file_part)
                }
            };
        }
        Ok(reqwest_form)
    }
}

macro_rules! impl_client_wrap {
    ($($method:ident),+) => {
        impl SocialClient {
            $(
                pub fn $method(&self, url: Url) -> reqwest::blocking::RequestBuilder {
                    self.before_request();
                    #[cfg(feature = "verbose")]
                    {
                        log::debug!("{}: {}", stringify!($method), url.as_str());
                    }
                    self.client.$method(url)
                }
            )+
        }
    };
}

impl_client_wrap!(get, post, patch);

impl Api for SocialClient {
    fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut builder = match request.method {
            Method::Get => self.get(request.url),
            Method::Post => self.post(request.url),
            Method::Patch => self.patch(request.url),
        };
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(form) => builder.multipart(Self::to_reqwest_form(form)?),
        };
        let response = builder.send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        log::debug!("Response status: {}", status);
        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use crate::endpoints::Endpoint;

    #[test]
    fn test_client_uses_configured_endpoints() {
        let client = SocialClient::new(&ApiConfig::for_environment(Environment::Development)).unwrap();
        assert_eq!(client.endpoints().url(Endpoint::Search).as_str(), "http://localhost:8001/api/users/search/");
    }

    #[test]
    fn test_unreachable_server_is_a_transport_error() {
        let mut config = ApiConfig::for_environment(Environment::Development);
        // Port 9 (discard) is essentially never served on loopback
        config.base_url = Url::parse("http://127.0.0.1:9/api").unwrap();
        config.timeout = Duration::from_secs(2);
        let client = SocialClient::new(&config).unwrap();
        let request = ApiRequest::get(client.endpoints().url(Endpoint::Profile)).bearer("t");
        assert!(matches!(client.execute(request), Err(ApiError::Transport(_))));
    }
}
