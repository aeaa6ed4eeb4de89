use std::fmt::{Debug, Formatter};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;
use crate::endpoints::Endpoints;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
}

/// One value of a multipart form
#[derive(Clone, PartialEq)]
pub enum PartValue {
    Text(String),
    File {
        file_name: String,
        mime: String,
        bytes: Vec<u8>,
    },
}

impl Debug for PartValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PartValue::Text(text) => f.debug_tuple("Text").field(text).finish(),
            // File contents are left out, they can be megabytes
            PartValue::File { file_name, mime, bytes } => f.debug_struct("File")
                .field("file_name", file_name)
                .field("mime", mime)
                .field("len", &bytes.len())
                .finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormPart {
    pub name: String,
    pub value: PartValue,
}

/// An ordered multipart form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipartForm {
    pub parts: Vec<FormPart>,
}

impl MultipartForm {

    pub fn text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.parts.push(FormPart { name: name.to_string(), value: PartValue::Text(value.into()) });
        self
    }

    pub fn file(mut self, name: &str, file_name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.parts.push(FormPart {
            name: name.to_string(),
            value: PartValue::File { file_name: file_name.into(), mime: mime.into(), bytes },
        });
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parts.iter().any(|part| part.name == name)
    }

    /// The value of the text part called `name`
    pub fn text_value(&self, name: &str) -> Option<&str> {
        self.parts.iter().find_map(|part| match &part.value {
            PartValue::Text(text) if part.name == name => Some(text.as_str()),
            _ => None,
        })
    }

}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(MultipartForm),
}

/// A request, independent of the http library that ends up sending it
#[derive(Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub bearer: Option<String>,
    pub body: RequestBody,
}

impl ApiRequest {

    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, bearer: None, body: RequestBody::Empty }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: Url) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn patch(url: Url) -> Self {
        Self::new(Method::Patch, url)
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.bearer = Some(token.to_string());
        self
    }

    pub fn json(mut self, value: Value) -> Self {
        self.body = RequestBody::Json(value);
        self
    }

    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

}

impl Debug for ApiRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("authenticated", &self.bearer.is_some())
            .field("body", &self.body)
            .finish()
    }
}

/// Status and raw body of a response
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {

    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turns non-success statuses into the matching [`ApiError`]
    pub fn into_result(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::from_status(self.status, &self.body))
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        Ok(serde_json::from_str(&self.body)?)
    }

}

/// Something that can send [`ApiRequest`]s to the backend. \
/// Implementations only fail with [`ApiError::Transport`]. Interpreting the status is up to the caller.
pub trait Api {

    /// The registry requests should be addressed with
    fn endpoints(&self) -> &Endpoints;

    fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;

    /// Executes `request` and classifies the status of the response
    fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.execute(request)?.into_result()
    }

}

impl<A: Api + ?Sized> Api for &A {
    fn endpoints(&self) -> &Endpoints {
        (**self).endpoints()
    }

    fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        (**self).execute(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_lookup() {
        let form = MultipartForm::default()
            .text("email", "ana@x.com")
            .file("avatar", "me.png", "image/png", vec![1, 2, 3]);
        assert!(form.contains("avatar"));
        assert!(!form.contains("password"));
        assert_eq!(form.text_value("email"), Some("ana@x.com"));
        // Files are not text
        assert_eq!(form.text_value("avatar"), None);
    }

    #[test]
    fn test_request_debug_hides_token() {
        let request = ApiRequest::get(Url::parse("http://localhost/api/users/profile/").unwrap())
            .bearer("secret-token");
        let debug = format!("{:?}", request);
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("authenticated: true"));
    }

    #[test]
    fn test_response_classification() {
        assert!(ApiResponse::new(204, "").into_result().is_ok());
        assert!(matches!(ApiResponse::new(404, r#"{"detail":"x"}"#).into_result(), Err(ApiError::Rejected { status: 404, .. })));
    }
}
