//! Tree API handlers.
//!
//! ```text
//! GET    /api/v1/trees?limit=20&order=oldest&species=Oak
//! POST   /api/v1/trees {"species":"Oak","latitude":6.25,"longitude":"-75.56"}
//! PATCH  /api/v1/trees/{id} {"photoUrl":null}
//! DELETE /api/v1/trees/{id}
//! GET    /api/v1/trees/stats
//! GET    /api/v1/trees/estimate
//! ```
//!
//! Reads are public. Mutations require a session; the author email recorded
//! on a planted tree always comes from the session, never from the body.

use std::collections::BTreeMap;

use actix_web::{HttpResponse, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::stats::{HoursEstimate, TreeStatistics};
use crate::domain::validation::NumericInput;
use crate::domain::{Error, PlantedTree, TreeChanges, TreeDraft, TreeId, TreeListQuery};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Tree record returned by every tree endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TreeResponse {
    /// Record identifier.
    #[schema(example = 42)]
    pub id: i64,
    /// Species name.
    #[schema(example = "Guayacán")]
    pub species: String,
    /// Latitude in degrees.
    #[schema(example = 6.251_84)]
    pub latitude: f64,
    /// Longitude in degrees.
    #[schema(example = -75.563_59)]
    pub longitude: f64,
    /// Creation time (UTC).
    pub planted_at: DateTime<Utc>,
    /// Public photo URL, if one was uploaded.
    pub photo_url: Option<String>,
    /// Who recorded the tree.
    #[schema(example = "ana@example.com")]
    pub planted_by_email: String,
}

impl From<PlantedTree> for TreeResponse {
    fn from(tree: PlantedTree) -> Self {
        Self {
            id: tree.id.get(),
            species: tree.species,
            latitude: tree.latitude,
            longitude: tree.longitude,
            planted_at: tree.planted_at,
            photo_url: tree.photo_url,
            planted_by_email: tree.planted_by_email,
        }
    }
}

/// Query parameters for `GET /api/v1/trees`.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListTreesParams {
    /// Page size, 1 to 500. Defaults to 100.
    pub limit: Option<u32>,
    /// Records to skip. Defaults to 0.
    pub offset: Option<u32>,
    /// `newest` (default) or `oldest`.
    pub order: Option<String>,
    /// Only return this species.
    pub species: Option<String>,
}

/// Request body for `POST /api/v1/trees`.
///
/// Coordinates may be JSON numbers or numeric strings.
#[derive(Debug, Clone, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlantTreeRequest {
    /// 2 to 100 characters once trimmed.
    #[serde(default)]
    pub species: Option<String>,
    /// -90 to 90.
    #[serde(default)]
    #[schema(value_type = Option<f64>, example = 6.25)]
    pub latitude: Option<NumericInput>,
    /// -180 to 180.
    #[serde(default)]
    #[schema(value_type = Option<f64>, example = -75.56)]
    pub longitude: Option<NumericInput>,
}

/// Request body for `PATCH /api/v1/trees/{id}`.
///
/// An absent `photoUrl` keeps the current photo; `null` clears it.
#[derive(Debug, Clone, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTreeRequest {
    /// New species name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    /// Absolute `http(s)` URL, or `null` to clear.
    #[serde(
        default,
        deserialize_with = "present_field",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>, nullable)]
    pub photo_url: Option<Option<String>>,
}

/// Distinguish an explicit `null` from an absent field.
fn present_field<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Response body for `DELETE /api/v1/trees/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DeletedTreeResponse {
    /// Identifier of the removed record.
    pub id: i64,
    /// Always `true`.
    pub deleted: bool,
}

/// One entry of the species ranking.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SpeciesCountResponse {
    /// Species name.
    pub species: String,
    /// Trees of this species.
    pub count: u64,
}

/// Chart data for `GET /api/v1/trees/stats`.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TreeStatisticsResponse {
    /// Trees planted per `YYYY-MM` (UTC), ascending.
    #[schema(example = json!({"2024-01": 2, "2024-02": 1}))]
    pub monthly: BTreeMap<String, u64>,
    /// Up to ten species, most planted first.
    pub top_species: Vec<SpeciesCountResponse>,
    /// Records considered.
    pub total_records: u64,
    /// Records left out of the monthly view for lack of a usable timestamp.
    pub skipped_timestamps: u64,
}

impl From<TreeStatistics> for TreeStatisticsResponse {
    fn from(stats: TreeStatistics) -> Self {
        Self {
            monthly: stats.monthly,
            top_species: stats
                .top_species
                .into_iter()
                .map(|entry| SpeciesCountResponse {
                    species: entry.species,
                    count: entry.count,
                })
                .collect(),
            total_records: stats.total_records,
            skipped_timestamps: stats.skipped_timestamps,
        }
    }
}

/// Response body for `GET /api/v1/trees/estimate`.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HoursEstimateResponse {
    /// Trees recorded so far.
    #[schema(example = 10)]
    pub total_trees: u64,
    /// `totalTrees × 1.5`, one decimal.
    #[schema(example = 15.0)]
    pub estimated_hours: f64,
    /// How the estimate was derived.
    #[schema(example = "Estimate based on 1.5 hours per tree.")]
    pub message: String,
}

impl From<HoursEstimate> for HoursEstimateResponse {
    fn from(estimate: HoursEstimate) -> Self {
        Self {
            total_trees: estimate.total_trees,
            estimated_hours: estimate.estimated_hours,
            message: estimate.message,
        }
    }
}

/// List planted trees.
#[utoipa::path(
    get,
    path = "/api/v1/trees",
    params(ListTreesParams),
    responses(
        (status = 200, description = "Planted trees", body = [TreeResponse]),
        (status = 400, description = "Invalid query", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["trees"],
    operation_id = "listTrees",
    security([])
)]
pub async fn list_trees(
    state: web::Data<HttpState>,
    params: web::Query<ListTreesParams>,
) -> ApiResult<web::Json<Vec<TreeResponse>>> {
    let params = params.into_inner();
    let query = TreeListQuery::try_from_parts(
        params.limit,
        params.offset,
        params.order.as_deref(),
        params.species.as_deref(),
    )?;
    let trees = state.trees.list(&query).await?;
    Ok(web::Json(trees.into_iter().map(TreeResponse::from).collect()))
}

/// Record a planted tree for the signed-in user.
#[utoipa::path(
    post,
    path = "/api/v1/trees",
    request_body = PlantTreeRequest,
    responses(
        (status = 201, description = "Tree recorded", body = TreeResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Login required", body = Error),
        (status = 413, description = "Body too large", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["trees"],
    operation_id = "plantTree"
)]
pub async fn plant_tree(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<PlantTreeRequest>,
) -> ApiResult<HttpResponse> {
    let author = session.require_user()?;
    let request = payload.into_inner();
    let draft = TreeDraft::try_from_parts(
        request.species.as_deref(),
        request.latitude.as_ref(),
        request.longitude.as_ref(),
    )?;
    let tree = state.tree_commands.plant(&author, draft).await?;
    Ok(HttpResponse::Created().json(TreeResponse::from(tree)))
}

/// Change the species or photo URL of a tree.
#[utoipa::path(
    patch,
    path = "/api/v1/trees/{id}",
    params(("id" = i64, Path, description = "Tree identifier")),
    request_body = UpdateTreeRequest,
    responses(
        (status = 200, description = "Updated tree", body = TreeResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Login required", body = Error),
        (status = 404, description = "Unknown tree", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["trees"],
    operation_id = "updateTree"
)]
pub async fn update_tree(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i64>,
    payload: web::Json<UpdateTreeRequest>,
) -> ApiResult<web::Json<TreeResponse>> {
    session.require_user()?;
    let request = payload.into_inner();
    let changes = TreeChanges::try_from_parts(
        request.species.as_deref(),
        request.photo_url.as_ref().map(Option::as_deref),
    )?;
    let tree = state
        .tree_commands
        .update(TreeId::new(path.into_inner()), changes)
        .await?;
    Ok(web::Json(tree.into()))
}

/// Delete a tree and, best-effort, its photo.
#[utoipa::path(
    delete,
    path = "/api/v1/trees/{id}",
    params(("id" = i64, Path, description = "Tree identifier")),
    responses(
        (status = 200, description = "Tree deleted", body = DeletedTreeResponse),
        (status = 401, description = "Login required", body = Error),
        (status = 404, description = "Unknown tree", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["trees"],
    operation_id = "deleteTree"
)]
pub async fn delete_tree(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i64>,
) -> ApiResult<web::Json<DeletedTreeResponse>> {
    session.require_user()?;
    let id = state
        .tree_commands
        .delete(TreeId::new(path.into_inner()))
        .await?;
    Ok(web::Json(DeletedTreeResponse {
        id: id.get(),
        deleted: true,
    }))
}

/// Monthly planting counts and the species ranking.
#[utoipa::path(
    get,
    path = "/api/v1/trees/stats",
    responses(
        (status = 200, description = "Chart data", body = TreeStatisticsResponse),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["trees"],
    operation_id = "treeStatistics",
    security([])
)]
pub async fn tree_statistics(
    state: web::Data<HttpState>,
) -> ApiResult<web::Json<TreeStatisticsResponse>> {
    let stats = state.trees.statistics().await?;
    Ok(web::Json(stats.into()))
}

/// Volunteer hours represented by the stored trees.
#[utoipa::path(
    get,
    path = "/api/v1/trees/estimate",
    responses(
        (status = 200, description = "Hours estimate", body = HoursEstimateResponse),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["trees"],
    operation_id = "estimateHours",
    security([])
)]
pub async fn estimate_hours(
    state: web::Data<HttpState>,
) -> ApiResult<web::Json<HoursEstimateResponse>> {
    let estimate = state.trees.estimate_hours().await?;
    Ok(web::Json(estimate.into()))
}

#[cfg(test)]
#[path = "trees_tests.rs"]
mod tests;
