//! Driving port for tree mutations.

use async_trait::async_trait;

use crate::domain::{AuthUser, Error, PhotoUpload, PlantedTree, TreeChanges, TreeDraft, TreeId};

/// Domain use-case port for planting and maintaining trees.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TreeCommand: Send + Sync {
    /// Record a tree planted by `author`.
    async fn plant(&self, author: &AuthUser, draft: TreeDraft) -> Result<PlantedTree, Error>;

    /// Change species and/or photo URL.
    async fn update(&self, id: TreeId, changes: TreeChanges) -> Result<PlantedTree, Error>;

    /// Delete a record, then clean up its photo on a best-effort basis.
    async fn delete(&self, id: TreeId) -> Result<TreeId, Error>;

    /// Upload a photo and point the record at it.
    async fn attach_photo(&self, id: TreeId, upload: PhotoUpload) -> Result<PlantedTree, Error>;
}
