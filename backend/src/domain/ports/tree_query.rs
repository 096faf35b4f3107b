//! Driving port for read-only tree use-cases.
//!
//! Handlers call this port for listings and chart data without knowing which
//! store backs them.

use async_trait::async_trait;

use crate::domain::stats::{HoursEstimate, TreeStatistics};
use crate::domain::{Error, PlantedTree, TreeListQuery};

/// Domain use-case port for reading trees.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TreeQuery: Send + Sync {
    /// List trees matching the validated query.
    async fn list(&self, query: &TreeListQuery) -> Result<Vec<PlantedTree>, Error>;

    /// Monthly counts and the species ranking.
    async fn statistics(&self) -> Result<TreeStatistics, Error>;

    /// Planting hours implied by the current record count.
    async fn estimate_hours(&self) -> Result<HoursEstimate, Error>;
}
