//! PostgREST-backed tree repository.

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use tracing::debug;

use super::client::{Reply, SupabaseClient, execute};
use super::dto::{
    NewTreeRowDto, ObservationRowDto, TREE_COLUMNS, TreeRowDto, parse_content_range_end,
    parse_content_range_total, tree_patch,
};
use super::errors::{TransportFailure, classify_transport, is_timeout_status, status_message};
use crate::domain::ports::{TreeRepository, TreeRepositoryError};
use crate::domain::stats::TreeObservation;
use crate::domain::{NewTreeRecord, PlantedTree, TreeChanges, TreeId, TreeListQuery, TreeOrder};

const PREFER: &str = "Prefer";
const RETURN_REPRESENTATION: &str = "return=representation";
const COUNT_EXACT: &str = "count=exact";
/// Rows requested per statistics page. PostgREST may cap pages lower
/// (`max-rows`); paging follows the returned `Content-Range` either way.
const OBSERVATION_PAGE_SIZE: u64 = 1000;

/// Tree records stored in one PostgREST table.
#[derive(Debug, Clone)]
pub struct SupabaseTreeRepository {
    client: SupabaseClient,
    table: String,
}

impl SupabaseTreeRepository {
    /// Bind the repository to `table`.
    pub fn new(client: SupabaseClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    fn table_url(&self) -> Url {
        self.client.endpoint(["rest", "v1", self.table.as_str()])
    }

    async fn send(
        &self,
        method: Method,
        query: &[(&str, String)],
        configure: impl FnOnce(reqwest::RequestBuilder) -> reqwest::RequestBuilder,
    ) -> Result<Reply, TreeRepositoryError> {
        let request = self
            .client
            .request(method, self.table_url())
            .query(query);
        let reply = execute(configure(request))
            .await
            .map_err(|error| map_transport_error(&error))?;
        if !reply.status.is_success() {
            return Err(map_status_error(reply.status, &reply.body));
        }
        Ok(reply)
    }

    async fn fetch_rows(
        &self,
        method: Method,
        query: &[(&str, String)],
        configure: impl FnOnce(reqwest::RequestBuilder) -> reqwest::RequestBuilder,
    ) -> Result<Vec<PlantedTree>, TreeRepositoryError> {
        let reply = self.send(method, query, configure).await?;
        decode_trees(&reply.body)
    }
}

#[async_trait]
impl TreeRepository for SupabaseTreeRepository {
    async fn list(&self, query: &TreeListQuery) -> Result<Vec<PlantedTree>, TreeRepositoryError> {
        self.fetch_rows(Method::GET, &list_params(query), |request| request)
            .await
    }

    async fn find(&self, id: TreeId) -> Result<Option<PlantedTree>, TreeRepositoryError> {
        let params = [
            ("select", TREE_COLUMNS.to_owned()),
            ("id", id_filter(id)),
            ("limit", "1".to_owned()),
        ];
        let rows = self.fetch_rows(Method::GET, &params, |request| request).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, record: &NewTreeRecord) -> Result<PlantedTree, TreeRepositoryError> {
        let params = [("select", TREE_COLUMNS.to_owned())];
        let body = NewTreeRowDto::from(record);
        let rows = self
            .fetch_rows(Method::POST, &params, |request| {
                request.header(PREFER, RETURN_REPRESENTATION).json(&body)
            })
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| TreeRepositoryError::query("insert returned no rows"))
    }

    async fn update(
        &self,
        id: TreeId,
        changes: &TreeChanges,
    ) -> Result<PlantedTree, TreeRepositoryError> {
        let params = [("select", TREE_COLUMNS.to_owned()), ("id", id_filter(id))];
        let body = tree_patch(changes);
        let rows = self
            .fetch_rows(Method::PATCH, &params, |request| {
                request.header(PREFER, RETURN_REPRESENTATION).json(&body)
            })
            .await?;
        first_or_not_found(rows, id)
    }

    async fn delete(&self, id: TreeId) -> Result<PlantedTree, TreeRepositoryError> {
        let params = [("select", TREE_COLUMNS.to_owned()), ("id", id_filter(id))];
        let rows = self
            .fetch_rows(Method::DELETE, &params, |request| {
                request.header(PREFER, RETURN_REPRESENTATION)
            })
            .await?;
        first_or_not_found(rows, id)
    }

    async fn count(&self) -> Result<Option<u64>, TreeRepositoryError> {
        let params = [("select", "id".to_owned()), ("limit", "1".to_owned())];
        let reply = self
            .send(Method::GET, &params, |request| {
                request.header(PREFER, COUNT_EXACT)
            })
            .await?;
        let total = reply
            .content_range
            .as_deref()
            .and_then(parse_content_range_total);
        if total.is_none() {
            debug!(
                content_range = ?reply.content_range,
                "tree table did not report an exact count"
            );
        }
        Ok(total)
    }

    async fn observations(&self) -> Result<Vec<TreeObservation>, TreeRepositoryError> {
        let mut observations = Vec::new();
        let mut offset = 0;
        loop {
            let params = observation_params(offset);
            let reply = self
                .send(Method::GET, &params, |request| {
                    request.header(PREFER, COUNT_EXACT)
                })
                .await?;
            let rows: Vec<ObservationRowDto> =
                serde_json::from_slice(&reply.body).map_err(|error| {
                    TreeRepositoryError::query(format!("invalid observation payload: {error}"))
                })?;
            let received = rows.len();
            observations.extend(rows.into_iter().map(TreeObservation::from));
            match next_page_offset(offset, received, reply.content_range.as_deref()) {
                Some(next) => offset = next,
                None => break,
            }
        }
        debug!(rows = observations.len(), "loaded tree observations");
        Ok(observations)
    }
}

fn observation_params(offset: u64) -> [(&'static str, String); 4] {
    [
        ("select", "species,planted_at".to_owned()),
        ("order", "id.asc".to_owned()),
        ("limit", OBSERVATION_PAGE_SIZE.to_string()),
        ("offset", offset.to_string()),
    ]
}

/// Offset of the next page, or `None` once every row has been read.
///
/// Trusts `Content-Range` when it reports both the last row and the total;
/// otherwise keeps going while pages come back full.
fn next_page_offset(offset: u64, received: usize, content_range: Option<&str>) -> Option<u64> {
    if received == 0 {
        return None;
    }
    let header = content_range.unwrap_or_default();
    if let (Some(last), Some(total)) = (
        parse_content_range_end(header),
        parse_content_range_total(header),
    ) {
        let next = last.saturating_add(1);
        return (next < total).then_some(next);
    }
    let received = u64::try_from(received).unwrap_or(u64::MAX);
    (received >= OBSERVATION_PAGE_SIZE).then(|| offset.saturating_add(received))
}

fn list_params(query: &TreeListQuery) -> Vec<(&'static str, String)> {
    let direction = match query.order {
        TreeOrder::Newest => "desc",
        TreeOrder::Oldest => "asc",
    };
    let mut params = vec![
        ("select", TREE_COLUMNS.to_owned()),
        ("order", format!("planted_at.{direction},id.{direction}")),
        ("limit", query.limit.to_string()),
        ("offset", query.offset.to_string()),
    ];
    if let Some(species) = &query.species {
        params.push(("species", format!("eq.{species}")));
    }
    params
}

fn id_filter(id: TreeId) -> String {
    format!("eq.{id}")
}

fn first_or_not_found(
    rows: Vec<PlantedTree>,
    id: TreeId,
) -> Result<PlantedTree, TreeRepositoryError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| TreeRepositoryError::not_found(id.get()))
}

fn decode_trees(body: &[u8]) -> Result<Vec<PlantedTree>, TreeRepositoryError> {
    let rows: Vec<TreeRowDto> = serde_json::from_slice(body).map_err(|error| {
        TreeRepositoryError::query(format!("invalid tree payload: {error}"))
    })?;
    Ok(rows.into_iter().map(PlantedTree::from).collect())
}

fn map_transport_error(error: &reqwest::Error) -> TreeRepositoryError {
    match classify_transport(error) {
        (TransportFailure::Timeout, message) => TreeRepositoryError::timeout(message),
        (TransportFailure::Connection, message) => TreeRepositoryError::connection(message),
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> TreeRepositoryError {
    let message = status_message(status, body);
    if is_timeout_status(status) {
        TreeRepositoryError::timeout(message)
    } else if matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE
    ) {
        TreeRepositoryError::connection(message)
    } else {
        TreeRepositoryError::query(message)
    }
}

#[cfg(test)]
mod tests {
    //! Coverage for the non-network PostgREST helpers.

    use super::*;
    use rstest::rstest;

    fn param<'a>(params: &'a [(&str, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.as_str())
    }

    #[rstest]
    #[case::newest(TreeOrder::Newest, "planted_at.desc,id.desc")]
    #[case::oldest(TreeOrder::Oldest, "planted_at.asc,id.asc")]
    fn list_params_encode_order(#[case] order: TreeOrder, #[case] expected: &str) {
        let query = TreeListQuery {
            order,
            ..TreeListQuery::default()
        };
        let params = list_params(&query);
        assert_eq!(param(&params, "order"), Some(expected));
        assert_eq!(param(&params, "limit"), Some("100"));
        assert_eq!(param(&params, "offset"), Some("0"));
        assert_eq!(param(&params, "species"), None);
    }

    #[test]
    fn list_params_filter_species() {
        let query = TreeListQuery {
            species: Some("Quercus robur".to_owned()),
            limit: 5,
            offset: 10,
            ..TreeListQuery::default()
        };
        let params = list_params(&query);
        assert_eq!(param(&params, "species"), Some("eq.Quercus robur"));
        assert_eq!(param(&params, "limit"), Some("5"));
        assert_eq!(param(&params, "offset"), Some("10"));
    }

    #[rstest]
    #[case::first_of_three(0, 1000, Some("0-999/2500"), Some(1000))]
    #[case::capped_below_page_size(0, 500, Some("0-499/1200"), Some(500))]
    #[case::last_page(2000, 500, Some("2000-2499/2500"), None)]
    #[case::single_page(0, 3, Some("0-2/3"), None)]
    #[case::empty_table(0, 0, Some("*/0"), None)]
    #[case::no_header_full_page(1000, 1000, None, Some(2000))]
    #[case::no_header_short_page(1000, 10, None, None)]
    fn observation_paging_follows_content_range(
        #[case] offset: u64,
        #[case] received: usize,
        #[case] content_range: Option<&str>,
        #[case] expected: Option<u64>,
    ) {
        assert_eq!(next_page_offset(offset, received, content_range), expected);
    }

    #[test]
    fn observation_pages_are_ordered_by_id() {
        let params = observation_params(2000);
        assert_eq!(param(&params, "order"), Some("id.asc"));
        assert_eq!(param(&params, "limit"), Some("1000"));
        assert_eq!(param(&params, "offset"), Some("2000"));
    }

    #[test]
    fn empty_result_maps_to_not_found() {
        let error = first_or_not_found(Vec::new(), TreeId::new(9)).expect_err("no rows");
        assert_eq!(error, TreeRepositoryError::not_found(9));
    }

    #[test]
    fn decodes_rows_into_trees() {
        let body = br#"[{
            "id": 1,
            "species": "Ceiba",
            "latitude": 4.65,
            "longitude": -74.05,
            "planted_at": "2024-03-02T08:30:00Z",
            "photo_url": "https://cdn.example.com/1.png",
            "planted_by_email": "ana@example.com"
        }]"#;
        let trees = decode_trees(body).expect("rows decode");
        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].species, "Ceiba");
        assert_eq!(trees[0].planted_by_email, "ana@example.com");
    }

    #[test]
    fn malformed_rows_map_to_query_error() {
        let error = decode_trees(br#"{"message":"oops"}"#).expect_err("not an array");
        assert!(matches!(error, TreeRepositoryError::Query { .. }));
    }

    #[rstest]
    #[case::gateway_timeout(StatusCode::GATEWAY_TIMEOUT, "Timeout")]
    #[case::bad_gateway(StatusCode::BAD_GATEWAY, "Connection")]
    #[case::unavailable(StatusCode::SERVICE_UNAVAILABLE, "Connection")]
    #[case::missing_table(StatusCode::NOT_FOUND, "Query")]
    #[case::bad_filter(StatusCode::BAD_REQUEST, "Query")]
    fn maps_statuses_to_repository_errors(#[case] status: StatusCode, #[case] expected: &str) {
        let error = map_status_error(status, br#"{"message":"relation does not exist"}"#);
        let actual = match error {
            TreeRepositoryError::Timeout { .. } => "Timeout",
            TreeRepositoryError::Connection { .. } => "Connection",
            TreeRepositoryError::Query { .. } => "Query",
            TreeRepositoryError::NotFound { .. } => "NotFound",
        };
        assert_eq!(actual, expected);
    }

    #[test]
    fn status_errors_carry_body_preview() {
        let error = map_status_error(StatusCode::BAD_REQUEST, b"column \"x\" does not exist");
        assert!(error.to_string().contains("status 400: column \"x\" does not exist"));
    }
}
