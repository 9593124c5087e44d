//! Blocking HTTP client abstraction.
//!
//! The routing and Overpass clients talk to the network only through
//! [`HttpClient`], so tests can substitute a recording mock.

use std::time::Duration;

use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body of a 2xx response; anything else becomes [`Error::Upstream`].
    pub fn into_success(self) -> Result<String> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(Error::Upstream {
                status: self.status,
                body: self.body,
            })
        }
    }
}

pub trait HttpClient {
    /// Performs a GET request. Repeated query keys are sent as repeated parameters.
    fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
    ) -> Result<HttpResponse>;
}

impl<T: HttpClient + ?Sized> HttpClient for &T {
    fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
    ) -> Result<HttpResponse> {
        (**self).get(url, query, headers)
    }
}

const USER_AGENT: &str = concat!("isopoi/", env!("CARGO_PKG_VERSION"));

/// [`HttpClient`] backed by `reqwest::blocking`.
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(180)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
    ) -> Result<HttpResponse> {
        let target = Url::parse_with_params(url, query)?;
        let mut request = self.client.get(target);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().map_err(|e| {
            warn!(url = url, error = %e, "HTTP request failed");
            e
        })?;
        let status = response.status().as_u16();
        debug!(url = url, status = status, "HTTP response received");

        let body = response.text()?;
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::cell::RefCell;

    use super::*;

    /// A request as seen by [`MockHttp`].
    #[derive(Debug, Clone)]
    pub struct Recorded {
        pub url: String,
        pub query: Vec<(String, String)>,
        pub headers: Vec<(String, String)>,
    }

    impl Recorded {
        pub fn params(&self, key: &str) -> Vec<&str> {
            self.query
                .iter()
                .filter(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
                .collect()
        }
    }

    /// Answers requests from canned responses keyed by URL suffix.
    #[derive(Default)]
    pub struct MockHttp {
        routes: Vec<(String, HttpResponse)>,
        pub requests: RefCell<Vec<Recorded>>,
    }

    impl MockHttp {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn route(mut self, suffix: &str, status: u16, body: &str) -> Self {
            self.routes.push((
                suffix.to_string(),
                HttpResponse {
                    status,
                    body: body.to_string(),
                },
            ));
            self
        }

        pub fn request_count(&self) -> usize {
            self.requests.borrow().len()
        }
    }

    impl HttpClient for MockHttp {
        fn get(
            &self,
            url: &str,
            query: &[(String, String)],
            headers: &[(String, String)],
        ) -> Result<HttpResponse> {
            self.requests.borrow_mut().push(Recorded {
                url: url.to_string(),
                query: query.to_vec(),
                headers: headers.to_vec(),
            });
            Ok(self
                .routes
                .iter()
                .find(|(suffix, _)| url.ends_with(suffix.as_str()))
                .map(|(_, response)| response.clone())
                .unwrap_or(HttpResponse {
                    status: 404,
                    body: "not found".to_string(),
                }))
        }
    }
}
