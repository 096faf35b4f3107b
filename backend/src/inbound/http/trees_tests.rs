//! Tests for tree HTTP handlers.

use super::*;
use crate::domain::ports::{MockAccountCommand, MockTreeCommand, MockTreeQuery};
use crate::domain::stats::{SpeciesCount, TreeObservation, summarize};
use crate::domain::trees::MAX_PHOTO_BYTES;
use crate::domain::validation::PhotoExtension;
use crate::domain::{PhotoUrlChange, TreeOrder};
use crate::inbound::http::test_utils::{mock_state, signed_in_cookie, test_app};
use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use chrono::TimeZone;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

const BOUNDARY: &str = "canopy-test-boundary";

#[fixture]
fn oak() -> PlantedTree {
    PlantedTree {
        id: TreeId::new(7),
        species: "Oak".to_owned(),
        latitude: 6.251_84,
        longitude: -75.563_59,
        planted_at: Utc
            .with_ymd_and_hms(2024, 1, 15, 10, 30, 0)
            .single()
            .expect("valid timestamp"),
        photo_url: None,
        planted_by_email: "ana@example.com".to_owned(),
    }
}

async fn send(state: HttpState, request: actix_test::TestRequest, signed_in: bool) -> (StatusCode, Value) {
    let app = actix_test::init_service(test_app(state)).await;
    let request = if signed_in {
        request.cookie(signed_in_cookie(&app).await)
    } else {
        request
    };
    let res = actix_test::call_service(&app, request.to_request()).await;
    let status = res.status();
    let body = actix_test::read_body(res).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn field_of(body: &Value) -> Option<&str> {
    body.get("details")
        .and_then(|details| details.get("field"))
        .and_then(Value::as_str)
}

fn multipart(field: &str, filename: &str, content: &[u8]) -> actix_test::TestRequest {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    actix_test::TestRequest::post()
        .uri("/api/v1/trees/7/photo")
        .insert_header((
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(body)
}

#[rstest]
#[actix_web::test]
async fn list_forwards_parsed_query(oak: PlantedTree) {
    let mut trees = MockTreeQuery::new();
    trees
        .expect_list()
        .withf(|query| {
            query.limit == 20
                && query.offset == 40
                && query.order == TreeOrder::Oldest
                && query.species.as_deref() == Some("Oak")
        })
        .times(1)
        .return_once(move |_| Ok(vec![oak]));
    let state = mock_state(trees, MockTreeCommand::new(), MockAccountCommand::new());

    let (status, body) = send(
        state,
        actix_test::TestRequest::get().uri("/api/v1/trees?limit=20&offset=40&order=oldest&species=%20Oak%20"),
        false,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let first = body.get(0).expect("one tree");
    assert_eq!(first.get("id").and_then(Value::as_i64), Some(7));
    assert_eq!(
        first.get("plantedByEmail").and_then(Value::as_str),
        Some("ana@example.com")
    );
    assert_eq!(
        first.get("plantedAt").and_then(Value::as_str),
        Some("2024-01-15T10:30:00Z")
    );
    assert!(first.get("photoUrl").is_some_and(Value::is_null));
}

#[rstest]
#[case("/api/v1/trees?limit=0", "limit")]
#[case("/api/v1/trees?limit=501", "limit")]
#[case("/api/v1/trees?order=sideways", "order")]
#[case("/api/v1/trees?species=x", "species")]
#[actix_web::test]
async fn list_rejects_invalid_query(#[case] uri: &str, #[case] field: &str) {
    let state = mock_state(
        MockTreeQuery::new(),
        MockTreeCommand::new(),
        MockAccountCommand::new(),
    );
    let (status, body) = send(state, actix_test::TestRequest::get().uri(uri), false).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(field_of(&body), Some(field));
}

#[rstest]
#[case(actix_test::TestRequest::post().uri("/api/v1/trees").set_json(json!({"species": "Oak", "latitude": 1, "longitude": 2})))]
#[case(actix_test::TestRequest::patch().uri("/api/v1/trees/7").set_json(json!({"species": "Oak"})))]
#[case(actix_test::TestRequest::delete().uri("/api/v1/trees/7"))]
#[actix_web::test]
async fn mutations_require_a_session(#[case] request: actix_test::TestRequest) {
    let state = mock_state(
        MockTreeQuery::new(),
        MockTreeCommand::new(),
        MockAccountCommand::new(),
    );
    let (status, body) = send(state, request, false).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body.get("code").and_then(Value::as_str), Some("unauthorized"));
}

#[rstest]
#[actix_web::test]
async fn plant_uses_session_author(oak: PlantedTree) {
    let mut commands = MockTreeCommand::new();
    commands
        .expect_plant()
        .withf(|author, draft| {
            author.email.as_ref() == "ana@example.com"
                && draft.species() == "Oak"
                && draft.coordinates().longitude() == -75.563_59
        })
        .times(1)
        .return_once(move |_, _| Ok(oak));
    let state = mock_state(MockTreeQuery::new(), commands, MockAccountCommand::new());

    let (status, body) = send(
        state,
        actix_test::TestRequest::post().uri("/api/v1/trees").set_json(json!({
            "species": "  Oak ",
            "latitude": 6.251_84,
            "longitude": "-75.56359",
            "plantedByEmail": "mallory@example.com"
        })),
        true,
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body.get("plantedByEmail").and_then(Value::as_str),
        Some("ana@example.com")
    );
}

#[rstest]
#[case(json!({"species": "Oak", "latitude": 91, "longitude": 0}), "latitude")]
#[case(json!({"species": "Oak", "latitude": 0, "longitude": -180.5}), "longitude")]
#[case(json!({"species": "Oak", "latitude": "north", "longitude": 0}), "latitude")]
#[case(json!({"species": "O", "latitude": 0, "longitude": 0}), "species")]
#[case(json!({"latitude": 0, "longitude": 0}), "species")]
#[case(json!({"species": "Oak", "latitude": 0}), "longitude")]
#[actix_web::test]
async fn plant_rejects_invalid_fields(#[case] payload: Value, #[case] field: &str) {
    let state = mock_state(
        MockTreeQuery::new(),
        MockTreeCommand::new(),
        MockAccountCommand::new(),
    );
    let (status, body) = send(
        state,
        actix_test::TestRequest::post().uri("/api/v1/trees").set_json(payload),
        true,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(field_of(&body), Some(field));
}

#[rstest]
#[actix_web::test]
async fn update_with_null_photo_clears_it(oak: PlantedTree) {
    let mut commands = MockTreeCommand::new();
    commands
        .expect_update()
        .withf(|id, changes| {
            *id == TreeId::new(7)
                && changes.species().is_none()
                && *changes.photo_url() == PhotoUrlChange::Clear
        })
        .times(1)
        .return_once(move |_, _| Ok(oak));
    let state = mock_state(MockTreeQuery::new(), commands, MockAccountCommand::new());

    let (status, _) = send(
        state,
        actix_test::TestRequest::patch()
            .uri("/api/v1/trees/7")
            .set_json(json!({"photoUrl": null})),
        true,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[rstest]
#[case(json!({}))]
#[case(json!({"photoUrl": "ftp://example.com/oak.png"}))]
#[case(json!({"species": " "}))]
#[actix_web::test]
async fn update_rejects_invalid_changes(#[case] payload: Value) {
    let state = mock_state(
        MockTreeQuery::new(),
        MockTreeCommand::new(),
        MockAccountCommand::new(),
    );
    let (status, _) = send(
        state,
        actix_test::TestRequest::patch()
            .uri("/api/v1/trees/7")
            .set_json(payload),
        true,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[rstest]
#[actix_web::test]
async fn update_of_unknown_tree_is_not_found() {
    let mut commands = MockTreeCommand::new();
    commands
        .expect_update()
        .times(1)
        .return_once(|_, _| Err(Error::not_found("tree 7 not found")));
    let state = mock_state(MockTreeQuery::new(), commands, MockAccountCommand::new());

    let (status, body) = send(
        state,
        actix_test::TestRequest::patch()
            .uri("/api/v1/trees/7")
            .set_json(json!({"species": "Pine"})),
        true,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body.get("message").and_then(Value::as_str),
        Some("tree 7 not found")
    );
}

#[rstest]
#[actix_web::test]
async fn delete_reports_identifier() {
    let mut commands = MockTreeCommand::new();
    commands
        .expect_delete()
        .withf(|id| *id == TreeId::new(7))
        .times(1)
        .return_once(Ok);
    let state = mock_state(MockTreeQuery::new(), commands, MockAccountCommand::new());

    let (status, body) = send(
        state,
        actix_test::TestRequest::delete().uri("/api/v1/trees/7"),
        true,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": 7, "deleted": true}));
}

#[rstest]
#[actix_web::test]
async fn statistics_keep_ranking_order() {
    let stats = summarize(&[
        TreeObservation::new("Pine", "2024-02-01T00:00:00Z"),
        TreeObservation::new("Oak", "2024-01-15T00:00:00Z"),
        TreeObservation::new("Oak", "2024-01-20T00:00:00Z"),
        TreeObservation::new("Ceiba", "not a date"),
    ]);
    let mut trees = MockTreeQuery::new();
    trees.expect_statistics().times(1).return_once(move || Ok(stats));
    let state = mock_state(trees, MockTreeCommand::new(), MockAccountCommand::new());

    let (status, body) = send(
        state,
        actix_test::TestRequest::get().uri("/api/v1/trees/stats"),
        false,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "monthly": {"2024-01": 2, "2024-02": 1},
            "topSpecies": [
                {"species": "Oak", "count": 2},
                {"species": "Pine", "count": 1},
                {"species": "Ceiba", "count": 1}
            ],
            "totalRecords": 4,
            "skippedTimestamps": 1
        })
    );
}

#[test]
fn statistics_response_maps_every_entry() {
    let response = TreeStatisticsResponse::from(TreeStatistics {
        top_species: vec![SpeciesCount {
            species: "Oak".to_owned(),
            count: 3,
        }],
        ..TreeStatistics::default()
    });
    assert_eq!(response.top_species.len(), 1);
    assert!(response.monthly.is_empty());
}

#[rstest]
#[actix_web::test]
async fn estimate_returns_hours_and_message() {
    let mut trees = MockTreeQuery::new();
    trees
        .expect_estimate_hours()
        .times(1)
        .return_once(|| Ok(HoursEstimate::for_total(Some(10))));
    let state = mock_state(trees, MockTreeCommand::new(), MockAccountCommand::new());

    let (status, body) = send(
        state,
        actix_test::TestRequest::get().uri("/api/v1/trees/estimate"),
        false,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "totalTrees": 10,
            "estimatedHours": 15.0,
            "message": "Estimate based on 1.5 hours per tree."
        })
    );
}

#[rstest]
#[actix_web::test]
async fn dependency_failures_are_redacted() {
    let mut trees = MockTreeQuery::new();
    trees
        .expect_statistics()
        .times(1)
        .return_once(|| Err(Error::internal("tree repository unavailable: refused")));
    let state = mock_state(trees, MockTreeCommand::new(), MockAccountCommand::new());

    let (status, body) = send(
        state,
        actix_test::TestRequest::get().uri("/api/v1/trees/stats"),
        false,
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body.get("message").and_then(Value::as_str),
        Some("Internal server error")
    );
    assert!(body.get("traceId").and_then(Value::as_str).is_some());
}

#[rstest]
#[actix_web::test]
async fn photo_upload_forwards_validated_file(mut oak: PlantedTree) {
    oak.photo_url = Some("https://cdn.example.com/trees/7/a.png".to_owned());
    let mut commands = MockTreeCommand::new();
    commands
        .expect_attach_photo()
        .withf(|id, upload| {
            *id == TreeId::new(7)
                && upload.extension() == PhotoExtension::Png
                && upload.clone().into_bytes() == b"png-bytes"
        })
        .times(1)
        .return_once(move |_, _| Ok(oak));
    let state = mock_state(MockTreeQuery::new(), commands, MockAccountCommand::new());

    let (status, body) = send(state, multipart("photo", "Oak.PNG", b"png-bytes"), true).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body.get("photoUrl").and_then(Value::as_str),
        Some("https://cdn.example.com/trees/7/a.png")
    );
}

#[rstest]
#[case(multipart("photo", "oak.gif", b"gif-bytes"), StatusCode::BAD_REQUEST)]
#[case(multipart("picture", "oak.png", b"png-bytes"), StatusCode::BAD_REQUEST)]
#[case(multipart("photo", "oak.png", b""), StatusCode::BAD_REQUEST)]
#[case(multipart("photo", "oak.png", &vec![0_u8; MAX_PHOTO_BYTES + 1]), StatusCode::PAYLOAD_TOO_LARGE)]
#[actix_web::test]
async fn photo_upload_rejects_bad_files(
    #[case] request: actix_test::TestRequest,
    #[case] expected: StatusCode,
) {
    let state = mock_state(
        MockTreeQuery::new(),
        MockTreeCommand::new(),
        MockAccountCommand::new(),
    );
    let (status, body) = send(state, request, true).await;
    assert_eq!(status, expected);
    assert!(body.get("code").and_then(Value::as_str).is_some());
}

#[rstest]
#[actix_web::test]
async fn photo_upload_requires_a_session() {
    let state = mock_state(
        MockTreeQuery::new(),
        MockTreeCommand::new(),
        MockAccountCommand::new(),
    );
    let (status, _) = send(state, multipart("photo", "oak.png", b"png"), false).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[test]
fn update_request_distinguishes_null_from_absent() {
    let absent: UpdateTreeRequest =
        serde_json::from_value(json!({"species": "Oak"})).expect("valid body");
    let cleared: UpdateTreeRequest =
        serde_json::from_value(json!({"photoUrl": null})).expect("valid body");
    assert_eq!(absent.photo_url, None);
    assert_eq!(cleared.photo_url, Some(None));
}
