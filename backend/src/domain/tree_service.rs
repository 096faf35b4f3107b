//! Tree use-cases backed by the record store and the photo store.
//!
//! The record store is the source of truth. Photo objects are advisory: when
//! a record and its photo must change together, the record goes first and
//! photo cleanup failures are logged rather than returned.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{info, warn};

use crate::domain::ports::{
    PhotoStore, PhotoStoreError, TreeCommand, TreeQuery, TreeRepository, TreeRepositoryError,
};
use crate::domain::stats::{self, HoursEstimate, TreeStatistics};
use crate::domain::trees::COORDINATE_PRECISION;
use crate::domain::{
    AuthUser, Error, NewTreeRecord, PhotoPath, PhotoUpload, PhotoUrlChange, PlantedTree,
    TreeChanges, TreeDraft, TreeId, TreeListQuery,
};

/// Tree service implementing the tree driving ports.
#[derive(Clone)]
pub struct TreeService<R, P> {
    trees: Arc<R>,
    photos: Arc<P>,
    clock: Arc<dyn Clock>,
}

impl<R, P> TreeService<R, P> {
    /// Create a service over the given adapters.
    pub fn new(trees: Arc<R>, photos: Arc<P>, clock: Arc<dyn Clock>) -> Self {
        Self {
            trees,
            photos,
            clock,
        }
    }
}

fn map_repository_error(error: TreeRepositoryError) -> Error {
    match error {
        TreeRepositoryError::NotFound { id } => Error::not_found(format!("tree {id} not found")),
        TreeRepositoryError::Connection { message } | TreeRepositoryError::Timeout { message } => {
            Error::internal(format!("tree repository unavailable: {message}"))
        }
        TreeRepositoryError::Query { message } => {
            Error::internal(format!("tree repository error: {message}"))
        }
    }
}

fn map_photo_error(error: PhotoStoreError) -> Error {
    Error::internal(format!("photo upload failed: {error}"))
}

impl<R, P> TreeService<R, P>
where
    R: TreeRepository,
    P: PhotoStore,
{
    async fn require_tree(&self, id: TreeId) -> Result<PlantedTree, Error> {
        self.trees
            .find(id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found(format!("tree {id} not found")))
    }

    /// Delete the object behind `url`, logging instead of failing.
    async fn discard_photo_url(&self, tree: TreeId, url: &str) {
        match self.photos.path_for_url(url) {
            Some(path) => self.discard_photo(tree, &path).await,
            None => warn!(tree_id = %tree, "photo url is not managed by the photo store"),
        }
    }

    async fn discard_photo(&self, tree: TreeId, path: &PhotoPath) {
        if let Err(error) = self.photos.delete(path).await {
            warn!(tree_id = %tree, photo_path = %path, %error, "failed to delete tree photo");
        }
    }
}

#[async_trait]
impl<R, P> TreeQuery for TreeService<R, P>
where
    R: TreeRepository,
    P: PhotoStore,
{
    async fn list(&self, query: &TreeListQuery) -> Result<Vec<PlantedTree>, Error> {
        self.trees.list(query).await.map_err(map_repository_error)
    }

    async fn statistics(&self) -> Result<TreeStatistics, Error> {
        let observations = self
            .trees
            .observations()
            .await
            .map_err(map_repository_error)?;
        let statistics = stats::summarize(&observations);
        if statistics.skipped_timestamps > 0 {
            warn!(
                skipped = statistics.skipped_timestamps,
                "ignored tree records without a usable planting time"
            );
        }
        Ok(statistics)
    }

    async fn estimate_hours(&self) -> Result<HoursEstimate, Error> {
        let total = self.trees.count().await.map_err(map_repository_error)?;
        Ok(HoursEstimate::for_total(total))
    }
}

#[async_trait]
impl<R, P> TreeCommand for TreeService<R, P>
where
    R: TreeRepository,
    P: PhotoStore,
{
    async fn plant(&self, author: &AuthUser, draft: TreeDraft) -> Result<PlantedTree, Error> {
        let coordinates = draft.coordinates().rounded(COORDINATE_PRECISION);
        let record = NewTreeRecord {
            species: draft.species().to_owned(),
            latitude: coordinates.latitude(),
            longitude: coordinates.longitude(),
            planted_at: self.clock.utc(),
            planted_by_email: author.email.to_string(),
        };
        let tree = self
            .trees
            .insert(&record)
            .await
            .map_err(map_repository_error)?;
        info!(tree_id = %tree.id, user_id = %author.id, "tree planted");
        Ok(tree)
    }

    async fn update(&self, id: TreeId, changes: TreeChanges) -> Result<PlantedTree, Error> {
        if *changes.photo_url() == PhotoUrlChange::Keep {
            return self
                .trees
                .update(id, &changes)
                .await
                .map_err(map_repository_error);
        }

        let existing = self.require_tree(id).await?;
        let updated = self
            .trees
            .update(id, &changes)
            .await
            .map_err(map_repository_error)?;
        // Only objects this service uploaded are removed; external URLs stay.
        let replaced = existing
            .photo_url
            .filter(|previous| updated.photo_url.as_ref() != Some(previous))
            .and_then(|previous| self.photos.path_for_url(&previous));
        if let Some(path) = replaced {
            self.discard_photo(id, &path).await;
        }
        Ok(updated)
    }

    async fn delete(&self, id: TreeId) -> Result<TreeId, Error> {
        let deleted = self.trees.delete(id).await.map_err(map_repository_error)?;
        info!(tree_id = %id, "tree deleted");
        if let Some(url) = deleted.photo_url.as_deref() {
            self.discard_photo_url(id, url).await;
        }
        Ok(id)
    }

    async fn attach_photo(&self, id: TreeId, upload: PhotoUpload) -> Result<PlantedTree, Error> {
        let existing = self.require_tree(id).await?;
        let extension = upload.extension();
        let path = PhotoPath::for_tree(id, extension);
        let url = self
            .photos
            .upload(&path, upload.into_bytes(), extension.content_type())
            .await
            .map_err(map_photo_error)?;

        let updated = match self.trees.update(id, &TreeChanges::photo(url)).await {
            Ok(tree) => tree,
            Err(error) => {
                self.discard_photo(id, &path).await;
                return Err(map_repository_error(error));
            }
        };
        info!(tree_id = %id, photo_path = %path, "tree photo attached");

        let replaced = existing
            .photo_url
            .filter(|previous| updated.photo_url.as_ref() != Some(previous));
        if let Some(previous) = replaced {
            self.discard_photo_url(id, &previous).await;
        }
        Ok(updated)
    }
}

#[cfg(test)]
#[path = "tree_service_tests.rs"]
mod tests;
