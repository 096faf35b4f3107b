//! Port for the external table holding planted tree records.
//!
//! The store assigns identifiers and owns persistence; adapters translate
//! these calls into its query API.

use async_trait::async_trait;

use crate::domain::stats::TreeObservation;
use crate::domain::{NewTreeRecord, PlantedTree, TreeChanges, TreeId, TreeListQuery};

use super::define_port_error;

define_port_error! {
    /// Errors raised by tree repository adapters.
    pub enum TreeRepositoryError {
        /// The store could not be reached.
        Connection { message: String } =>
            "tree repository connection failed: {message}",
        /// The store did not answer within the configured timeout.
        Timeout { message: String } =>
            "tree repository timed out: {message}",
        /// The store rejected or failed the query.
        Query { message: String } =>
            "tree repository query failed: {message}",
        /// No record carries the requested identifier.
        NotFound { id: i64 } =>
            "tree {id} not found",
    }
}

/// Port for tree record storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TreeRepository: Send + Sync {
    /// List records matching the filter, in the requested order.
    async fn list(&self, query: &TreeListQuery) -> Result<Vec<PlantedTree>, TreeRepositoryError>;

    /// Fetch one record, or `None` when it does not exist.
    async fn find(&self, id: TreeId) -> Result<Option<PlantedTree>, TreeRepositoryError>;

    /// Insert a record and return it as stored.
    async fn insert(&self, record: &NewTreeRecord) -> Result<PlantedTree, TreeRepositoryError>;

    /// Apply a partial update.
    ///
    /// Fails with [`TreeRepositoryError::NotFound`] when no row matched.
    async fn update(
        &self,
        id: TreeId,
        changes: &TreeChanges,
    ) -> Result<PlantedTree, TreeRepositoryError>;

    /// Delete a record and return the deleted row.
    ///
    /// Fails with [`TreeRepositoryError::NotFound`] when no row matched.
    async fn delete(&self, id: TreeId) -> Result<PlantedTree, TreeRepositoryError>;

    /// Exact number of stored records; `None` when the store omits it.
    async fn count(&self) -> Result<Option<u64>, TreeRepositoryError>;

    /// Species and planting time of every record, for statistics.
    async fn observations(&self) -> Result<Vec<TreeObservation>, TreeRepositoryError>;
}
