//! Storage-API-backed photo store.

use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};

use super::client::{SupabaseClient, execute};
use super::errors::{TransportFailure, classify_transport, is_timeout_status, status_message};
use crate::domain::PhotoPath;
use crate::domain::ports::{PhotoStore, PhotoStoreError};

const UPSERT_HEADER: &str = "x-upsert";
const PHOTO_CACHE_CONTROL: &str = "max-age=3600";

/// Photos kept in one public storage bucket.
#[derive(Debug, Clone)]
pub struct SupabasePhotoStore {
    client: SupabaseClient,
    bucket: String,
}

impl SupabasePhotoStore {
    /// Bind the store to `bucket`, which must allow public reads.
    pub fn new(client: SupabaseClient, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    fn object_url(&self, path: &PhotoPath) -> Url {
        self.client.endpoint(
            ["storage", "v1", "object", self.bucket.as_str()]
                .into_iter()
                .chain(path.as_ref().split('/')),
        )
    }

    fn public_url(&self, path: &PhotoPath) -> Url {
        self.client.endpoint(
            ["storage", "v1", "object", "public", self.bucket.as_str()]
                .into_iter()
                .chain(path.as_ref().split('/')),
        )
    }

    fn public_prefix(&self) -> Url {
        self.client
            .endpoint(["storage", "v1", "object", "public", self.bucket.as_str(), ""])
    }
}

#[async_trait]
impl PhotoStore for SupabasePhotoStore {
    async fn upload(
        &self,
        path: &PhotoPath,
        bytes: Vec<u8>,
        content_type: &'static str,
    ) -> Result<String, PhotoStoreError> {
        let request = self
            .client
            .request(Method::POST, self.object_url(path))
            .header(CONTENT_TYPE, content_type)
            .header(CACHE_CONTROL, PHOTO_CACHE_CONTROL)
            .header(UPSERT_HEADER, "true")
            .body(bytes);
        let reply = execute(request)
            .await
            .map_err(|error| map_transport_error(&error))?;
        if !reply.status.is_success() {
            return Err(map_status_error(reply.status, &reply.body));
        }
        Ok(self.public_url(path).into())
    }

    async fn delete(&self, path: &PhotoPath) -> Result<(), PhotoStoreError> {
        let request = self.client.request(Method::DELETE, self.object_url(path));
        let reply = execute(request)
            .await
            .map_err(|error| map_transport_error(&error))?;
        if reply.status.is_success() {
            Ok(())
        } else {
            Err(map_status_error(reply.status, &reply.body))
        }
    }

    fn path_for_url(&self, url: &str) -> Option<PhotoPath> {
        let prefix = self.public_prefix();
        let mut url = Url::parse(url.trim()).ok()?;
        url.set_query(None);
        url.set_fragment(None);
        let path = url.as_str().strip_prefix(prefix.as_str())?;
        if path.is_empty() || path.split('/').any(str::is_empty) {
            return None;
        }
        Some(PhotoPath::new(path))
    }
}

fn map_transport_error(error: &reqwest::Error) -> PhotoStoreError {
    match classify_transport(error) {
        (TransportFailure::Timeout, message) => PhotoStoreError::timeout(message),
        (TransportFailure::Connection, message) => PhotoStoreError::connection(message),
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> PhotoStoreError {
    if is_timeout_status(status) {
        PhotoStoreError::timeout(status_message(status, body))
    } else {
        PhotoStoreError::rejected(status.as_u16(), status_message(status, body))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::TreeId;
    use crate::domain::validation::PhotoExtension;
    use rstest::{fixture, rstest};
    use zeroize::Zeroizing;

    #[fixture]
    fn store() -> SupabasePhotoStore {
        let client = SupabaseClient::new(
            Url::parse("https://demo.supabase.co").expect("base url"),
            Zeroizing::new("service-key".to_owned()),
            Duration::from_secs(5),
        )
        .expect("client builds");
        SupabasePhotoStore::new(client, "tree-photos")
    }

    #[rstest]
    fn public_url_points_into_bucket(store: SupabasePhotoStore) {
        let url = store.public_url(&PhotoPath::new("trees/7/a.png"));
        assert_eq!(
            url.as_str(),
            "https://demo.supabase.co/storage/v1/object/public/tree-photos/trees/7/a.png"
        );
    }

    #[rstest]
    fn object_url_omits_public_segment(store: SupabasePhotoStore) {
        let url = store.object_url(&PhotoPath::new("trees/7/a.png"));
        assert_eq!(url.path(), "/storage/v1/object/tree-photos/trees/7/a.png");
    }

    #[rstest]
    fn issued_urls_map_back_to_paths(store: SupabasePhotoStore) {
        let path = PhotoPath::for_tree(TreeId::new(7), PhotoExtension::Jpg);
        let url = store.public_url(&path);
        assert_eq!(store.path_for_url(url.as_str()), Some(path));
    }

    #[rstest]
    #[case::query_ignored(
        "https://demo.supabase.co/storage/v1/object/public/tree-photos/trees/7/a.png?width=200",
        Some("trees/7/a.png")
    )]
    #[case::other_bucket(
        "https://demo.supabase.co/storage/v1/object/public/avatars/trees/7/a.png",
        None
    )]
    #[case::other_host("https://cdn.example.com/tree-photos/trees/7/a.png", None)]
    #[case::bucket_root("https://demo.supabase.co/storage/v1/object/public/tree-photos/", None)]
    #[case::not_a_url("not a url", None)]
    fn foreign_urls_have_no_path(
        store: SupabasePhotoStore,
        #[case] url: &str,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(store.path_for_url(url), expected.map(PhotoPath::new));
    }

    #[rstest]
    #[case::timeout(StatusCode::GATEWAY_TIMEOUT, "Timeout")]
    #[case::too_large(StatusCode::PAYLOAD_TOO_LARGE, "Rejected")]
    #[case::missing_bucket(StatusCode::NOT_FOUND, "Rejected")]
    fn maps_statuses(#[case] status: StatusCode, #[case] expected: &str) {
        let actual = match map_status_error(status, b"{}") {
            PhotoStoreError::Timeout { .. } => "Timeout",
            PhotoStoreError::Connection { .. } => "Connection",
            PhotoStoreError::Rejected { .. } => "Rejected",
        };
        assert_eq!(actual, expected);
    }
}
