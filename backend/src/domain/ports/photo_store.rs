//! Port for the object store hosting tree photos.

use async_trait::async_trait;

use crate::domain::PhotoPath;

use super::define_port_error;

define_port_error! {
    /// Errors raised by photo store adapters.
    pub enum PhotoStoreError {
        /// The store could not be reached.
        Connection { message: String } => "photo store connection failed: {message}",
        /// The store did not answer within the configured timeout.
        Timeout { message: String } => "photo store timed out: {message}",
        /// The store answered with a non-success status.
        Rejected { status: u16, message: String } =>
            "photo store rejected request with status {status}: {message}",
    }
}

/// Port for photo objects.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Store `bytes` at `path` and return its public URL.
    async fn upload(
        &self,
        path: &PhotoPath,
        bytes: Vec<u8>,
        content_type: &'static str,
    ) -> Result<String, PhotoStoreError>;

    /// Remove the object at `path`.
    async fn delete(&self, path: &PhotoPath) -> Result<(), PhotoStoreError>;

    /// Recover the object path from a public URL issued by this store.
    ///
    /// Returns `None` for URLs pointing elsewhere.
    fn path_for_url(&self, url: &str) -> Option<PhotoPath>;
}
