use core::cell::{Ref, RefCell};

use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::telemetry::{HttpClient, HttpResponse};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockTransportError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body_str(&self) -> &str {
        core::str::from_utf8(&self.body).unwrap_or_default()
    }
}

#[derive(Debug, Default)]
pub struct MockHttpState {
    pub requests: Vec<RecordedRequest>,
    /// Statuses answered in order; 204 once exhausted
    pub statuses: VecDeque<u16>,
    /// Requests that fail before any response is produced
    pub failing_requests: VecDeque<bool>,
    pub open_responses: usize,
    pub released_responses: usize,
}

/// HTTP client answering from a scripted list of statuses. Clones share the
/// same state.
#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    state: Rc<RefCell<MockHttpState>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_statuses(statuses: &[u16]) -> Self {
        let client = Self::default();
        client.state.borrow_mut().statuses.extend(statuses.iter().copied());
        client
    }

    /// Scripts transport failures per request, in order.
    pub fn with_failures(self, failures: &[bool]) -> Self {
        self.state
            .borrow_mut()
            .failing_requests
            .extend(failures.iter().copied());
        self
    }

    pub fn state(&self) -> Ref<'_, MockHttpState> {
        self.state.borrow()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.borrow().requests.clone()
    }
}

pub struct MockResponse {
    status: u16,
    state: Rc<RefCell<MockHttpState>>,
}

impl HttpResponse for MockResponse {
    fn status(&self) -> u16 {
        self.status
    }
}

impl Drop for MockResponse {
    fn drop(&mut self) {
        let mut state = self.state.borrow_mut();
        state.open_responses -= 1;
        state.released_responses += 1;
    }
}

impl HttpClient for MockHttpClient {
    type Error = MockTransportError;
    type Response<'a> = MockResponse;

    fn post<'a>(
        &'a mut self,
        url: &str,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Result<Self::Response<'a>, Self::Error> {
        let mut state = self.state.borrow_mut();
        state.requests.push(RecordedRequest {
            url: url.to_string(),
            headers: headers
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
            body: body.to_vec(),
        });

        if state.failing_requests.pop_front().unwrap_or(false) {
            return Err(MockTransportError);
        }

        let status = state.statuses.pop_front().unwrap_or(204);
        state.open_responses += 1;

        Ok(MockResponse {
            status,
            state: self.state.clone(),
        })
    }
}
