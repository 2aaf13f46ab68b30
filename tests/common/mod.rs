//! In-process mock of the archive.org and Wayback endpoints
//!
//! One axum server answers both backend families. Every request is recorded,
//! and capture status responses are served from a script so tests can walk a
//! job through its states.

#![allow(dead_code)]

use axum::Router;
use axum::extract::State;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wayback::ArchiveClient;
use wayback::client::{ClientSettings, PollPolicy};

/// A canned response
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: StatusCode,
    pub body: String,
    /// Hold the response back this long before answering
    pub delay: Option<Duration>,
}

impl MockResponse {
    pub fn json(body: &str) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap(),
            body: String::new(),
            delay: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = StatusCode::from_u16(status).unwrap();
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    /// Decoded `application/x-www-form-urlencoded` body
    pub fn form(&self) -> HashMap<String, String> {
        decode_pairs(&self.body)
    }

    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let query = self.query.clone().unwrap_or_default();
        let url = reqwest::Url::parse(&format!("http://mock/?{}", query)).unwrap();
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }
}

fn decode_pairs(encoded: &str) -> HashMap<String, String> {
    let url = reqwest::Url::parse(&format!("http://mock/?{}", encoded)).unwrap();
    url.query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

#[derive(Debug)]
struct Inner {
    requests: Vec<RecordedRequest>,
    login: MockResponse,
    login_cookies: Vec<String>,
    keys: MockResponse,
    availability: MockResponse,
    cdx: MockResponse,
    submit: MockResponse,
    status_script: VecDeque<MockResponse>,
    status_fallback: MockResponse,
}

/// Shared, scriptable state of the mock server
#[derive(Debug, Clone)]
pub struct MockArchive {
    inner: Arc<Mutex<Inner>>,
}

impl Default for MockArchive {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                requests: Vec::new(),
                login: MockResponse::json("<html>ok</html>"),
                login_cookies: vec![
                    "logged-in-user=U; Path=/".to_string(),
                    "logged-in-sig=S; Path=/".to_string(),
                ],
                keys: MockResponse::json(
                    r#"{"success":1,"key":{"s3accesskey":"A","s3secretkey":"B"}}"#,
                ),
                availability: MockResponse::json(r#"{"results":[]}"#),
                cdx: MockResponse::json("[]"),
                submit: MockResponse::json(r#"{"url":"http://x.com","job_id":"spn2-job"}"#),
                status_script: VecDeque::new(),
                status_fallback: MockResponse::json(r#"{"status":"pending","resources":[]}"#),
            })),
        }
    }
}

impl MockArchive {
    pub fn set_login(&self, response: MockResponse, cookies: &[&str]) {
        let mut inner = self.inner.lock().unwrap();
        inner.login = response;
        inner.login_cookies = cookies.iter().map(|c| c.to_string()).collect();
    }

    pub fn set_keys(&self, response: MockResponse) {
        self.inner.lock().unwrap().keys = response;
    }

    pub fn set_availability(&self, response: MockResponse) {
        self.inner.lock().unwrap().availability = response;
    }

    pub fn set_cdx(&self, response: MockResponse) {
        self.inner.lock().unwrap().cdx = response;
    }

    pub fn set_submit(&self, response: MockResponse) {
        self.inner.lock().unwrap().submit = response;
    }

    /// Status responses served in order; the fallback answers once the script runs out
    pub fn script_status(&self, responses: Vec<MockResponse>) {
        self.inner.lock().unwrap().status_script = responses.into();
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.lock().unwrap().requests.clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    fn respond(&self, request: RecordedRequest) -> (Response, Option<Duration>) {
        let mut inner = self.inner.lock().unwrap();
        let method = request.method.clone();
        let path = request.path.clone();
        let primed = request
            .header(COOKIE.as_str())
            .is_some_and(|c| c.contains("test-cookie=1"));
        inner.requests.push(request);

        match (method, path.as_str()) {
            (Method::POST, "/account/login") => {
                let response = inner.login.clone();
                // Without the priming cookie the real endpoint silently skips the session cookies
                let cookies = if primed {
                    inner.login_cookies.clone()
                } else {
                    Vec::new()
                };
                let mut headers = HeaderMap::new();
                for cookie in cookies {
                    headers.append(SET_COOKIE, cookie.parse().unwrap());
                }
                let delay = response.delay;
                ((response.status, headers, response.body).into_response(), delay)
            }
            (Method::GET, "/account/s3.php") => json_response(inner.keys.clone()),
            (Method::POST, "/wayback/available") => json_response(inner.availability.clone()),
            (Method::GET, "/cdx/search/cdx") => json_response(inner.cdx.clone()),
            (Method::POST, "/save/") => json_response(inner.submit.clone()),
            (Method::POST, "/save/status/") => {
                let response = inner
                    .status_script
                    .pop_front()
                    .unwrap_or_else(|| inner.status_fallback.clone());
                json_response(response)
            }
            _ => (StatusCode::NOT_FOUND.into_response(), None),
        }
    }
}

fn json_response(response: MockResponse) -> (Response, Option<Duration>) {
    let delay = response.delay;
    let response = (
        response.status,
        [(CONTENT_TYPE, "application/json")],
        response.body,
    )
        .into_response();
    (response, delay)
}

async fn handle(
    State(mock): State<MockArchive>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let request = RecordedRequest {
        method,
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body,
    };
    let (response, delay) = mock.respond(request);
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    response
}

/// Start the mock on a random local port and return its base URL
pub async fn start_mock_server(mock: MockArchive) -> String {
    let app = Router::new().fallback(handle).with_state(mock);

    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let bound_addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", bound_addr)
}

/// Client pointed at the mock for both backend families
pub fn client_for(base_url: &str, poll_policy: PollPolicy) -> ArchiveClient {
    client_with_timeout(base_url, poll_policy, Duration::from_secs(5))
}

pub fn client_with_timeout(
    base_url: &str,
    poll_policy: PollPolicy,
    request_timeout: Duration,
) -> ArchiveClient {
    let settings = ClientSettings {
        wayback_base_url: base_url.to_string(),
        web_base_url: base_url.to_string(),
        request_timeout,
        poll_policy,
        ..ClientSettings::default()
    };
    ArchiveClient::with_settings(settings).unwrap()
}

/// Mock server plus a client with a fast fixed poll interval
pub async fn setup() -> (MockArchive, ArchiveClient) {
    setup_with_policy(PollPolicy::fixed(Duration::from_millis(10))).await
}

pub async fn setup_with_policy(policy: PollPolicy) -> (MockArchive, ArchiveClient) {
    let mock = MockArchive::default();
    let base_url = start_mock_server(mock.clone()).await;
    (mock, client_for(&base_url, policy))
}

/// Fast fixed poll interval and a short per-request timeout
pub async fn setup_with_timeout(request_timeout: Duration) -> (MockArchive, ArchiveClient) {
    let mock = MockArchive::default();
    let base_url = start_mock_server(mock.clone()).await;
    let policy = PollPolicy::fixed(Duration::from_millis(10));
    (mock, client_with_timeout(&base_url, policy, request_timeout))
}
