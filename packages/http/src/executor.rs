//! Blocking request execution.
//!
//! The broker runs an [`HttpExecutor`] on a worker thread. Production code
//! uses [`ReqwestExecutor`]; tests swap in [`mock::MockExecutor`].

use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::types::{HttpRequest, HttpResponse, RequestBody};
use crate::Error;

/// Executes one request to completion, blocking the calling thread.
pub trait HttpExecutor: Send + Sync {
    /// Any response the server sends back is `Ok`, whatever its status.
    /// `Err` means no response arrived.
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, Error>;
}

pub struct ReqwestExecutor {
    client: Client,
}

impl ReqwestExecutor {
    /// `timeout` bounds the whole request, body included.
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { client })
    }

    pub fn with_default_timeout() -> Result<Self, Error> {
        Self::new(Duration::from_secs(30))
    }
}

impl HttpExecutor for ReqwestExecutor {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        let method: http::Method = request.method.into();
        let url = url::Url::parse(&request.url)?;

        let mut headers = HeaderMap::with_capacity(request.headers.len());
        for (name, value) in &request.headers {
            headers.insert(
                HeaderName::try_from(name.as_str())?,
                HeaderValue::try_from(value.as_str())?,
            );
        }

        let mut req_builder = self.client.request(method, url).headers(headers);

        req_builder = match &request.body {
            RequestBody::Empty => req_builder,
            RequestBody::Json(body) => req_builder.json(body),
            RequestBody::Bytes(bytes) => req_builder.body(bytes.to_vec()),
        };

        let response = req_builder.send()?;

        let code = response.status();
        let status = code.as_u16();
        let status_text = code.canonical_reason().unwrap_or("Unknown").to_string();

        // Headers that are not visible ASCII are dropped.
        let resp_headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
            .collect();

        let body = response.bytes()?;
        log::debug!(
            "{:?} {} -> {} ({} bytes)",
            request.method,
            request.url,
            status,
            body.len()
        );

        Ok(HttpResponse {
            status,
            status_text,
            headers: resp_headers,
            body,
        })
    }
}

/// Canned responses for tests, without a network.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use std::sync::{Mutex, MutexGuard};

    use super::*;
    use crate::types::Method;

    #[derive(Default)]
    struct Routes {
        table: Vec<(Method, String, HttpResponse)>,
        fallback: Option<HttpResponse>,
        outage: Option<String>,
        seen: Vec<HttpRequest>,
    }

    /// Answers by method and URL path. Unrouted requests get the fallback,
    /// or a JSON 404.
    #[derive(Default)]
    pub struct MockExecutor {
        routes: Mutex<Routes>,
    }

    impl MockExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Answer `method` requests for `path` (e.g. `/api/settings`).
        pub fn route(self, method: Method, path: impl Into<String>, response: HttpResponse) -> Self {
            self.lock().table.push((method, path.into(), response));
            self
        }

        pub fn fallback(self, response: HttpResponse) -> Self {
            self.lock().fallback = Some(response);
            self
        }

        /// Make every request fail as if the server were unreachable.
        pub fn unreachable(self, message: impl Into<String>) -> Self {
            self.lock().outage = Some(message.into());
            self
        }

        /// Requests seen so far, oldest first.
        pub fn requests(&self) -> Vec<HttpRequest> {
            self.lock().seen.clone()
        }

        fn lock(&self) -> MutexGuard<'_, Routes> {
            self.routes.lock().unwrap()
        }
    }

    impl HttpExecutor for MockExecutor {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
            let mut routes = self.lock();
            routes.seen.push(request.clone());

            if let Some(message) = &routes.outage {
                return Err(Error::Network {
                    message: message.clone(),
                });
            }

            let path = url::Url::parse(&request.url)?.path().to_string();
            let routed = routes
                .table
                .iter()
                .find(|(method, route, _)| *method == request.method && *route == path)
                .map(|(_, _, response)| response.clone());

            Ok(routed
                .or_else(|| routes.fallback.clone())
                .unwrap_or_else(|| HttpResponse::json(404, &serde_json::json!({"error": "Not Found"}))))
        }
    }
}
