//! A scripted [`Api`] for tests: replays queued outcomes in order and records every request.

use std::cell::RefCell;
use std::collections::VecDeque;
use url::Url;
use crate::endpoints::Endpoints;
use crate::error::ApiError;
use crate::transport::{Api, ApiRequest, ApiResponse};

pub(crate) struct MockApi {
    endpoints: Endpoints,
    outcomes: RefCell<VecDeque<Result<ApiResponse, ApiError>>>,
    pub requests: RefCell<Vec<ApiRequest>>,
}

impl MockApi {

    pub fn new() -> Self {
        Self {
            endpoints: Endpoints::new(Url::parse("http://localhost:8001/api").unwrap()),
            outcomes: Default::default(),
            requests: Default::default(),
        }
    }

    pub fn respond(&self, status: u16, body: &str) -> &Self {
        self.outcomes.borrow_mut().push_back(Ok(ApiResponse::new(status, body)));
        self
    }

    pub fn fail(&self, message: &str) -> &Self {
        self.outcomes.borrow_mut().push_back(Err(ApiError::Transport(message.to_string())));
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn last_request(&self) -> ApiRequest {
        self.requests.borrow().last().cloned().expect("No request was sent")
    }

}

impl Api for MockApi {
    fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.requests.borrow_mut().push(request);
        self.outcomes.borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Transport("No response scripted".to_string())))
    }
}
