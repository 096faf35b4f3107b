//! Shared HTTP client for Supabase services.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_RANGE};
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use zeroize::Zeroizing;

const API_KEY_HEADER: &str = "apikey";

/// Connection pool plus credentials for one Supabase project.
///
/// Cloning is cheap; clones share the pool and the key.
#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    base_url: Url,
    service_key: Arc<Zeroizing<String>>,
}

/// Status, headers of interest and body of a completed request.
pub(super) struct Reply {
    pub(super) status: StatusCode,
    pub(super) content_range: Option<String>,
    pub(super) body: Vec<u8>,
}

impl SupabaseClient {
    /// Build a client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        base_url: Url,
        service_key: Zeroizing<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url,
            service_key: Arc::new(service_key),
        })
    }

    /// Resolve `segments` below the project base URL.
    ///
    /// Segments are percent-encoded individually, so a segment may not
    /// smuggle extra path components.
    pub(super) fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Start a request authorised with the service key.
    pub(super) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.request_as(method, url, self.service_key.as_str())
    }

    /// Start a request on behalf of the holder of `bearer`.
    ///
    /// The service key still travels as `apikey` so the gateway routes it.
    pub(super) fn request_as(&self, method: Method, url: Url, bearer: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(API_KEY_HEADER, self.service_key.as_str())
            .header(AUTHORIZATION, format!("Bearer {bearer}"))
    }
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

/// Send `builder` and buffer the whole response.
pub(super) async fn execute(builder: RequestBuilder) -> Result<Reply, reqwest::Error> {
    let response = builder.send().await?;
    let status = response.status();
    let content_range = response
        .headers()
        .get(CONTENT_RANGE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let body = response.bytes().await?.to_vec();
    Ok(Reply {
        status,
        content_range,
        body,
    })
}
