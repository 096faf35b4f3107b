//! Tests for server bootstrap: readiness signalling and app wiring.

use std::sync::Arc;
use std::time::Duration;

use actix_web::cookie::{Key, SameSite};
use actix_web::http::StatusCode;
use actix_web::{test, web};
use canopy::domain::{AccountService, TreeService};
use canopy::outbound::supabase::{
    SupabaseAuthGateway, SupabaseClient, SupabasePhotoStore, SupabaseTreeRepository,
};
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use serde_json::Value;
use url::Url;
use zeroize::Zeroizing;

use super::*;

#[fixture]
fn health_state() -> web::Data<HealthState> {
    web::Data::new(HealthState::new())
}

/// State wired to adapters that are never called by these tests.
#[fixture]
fn http_state() -> web::Data<HttpState> {
    let client = SupabaseClient::new(
        Url::parse("http://127.0.0.1:9").expect("base url"),
        Zeroizing::new("unused".to_owned()),
        Duration::from_millis(50),
    )
    .expect("client builds");
    let trees = Arc::new(TreeService::new(
        Arc::new(SupabaseTreeRepository::new(client.clone(), "planted_trees")),
        Arc::new(SupabasePhotoStore::new(client.clone(), "tree-photos")),
        Arc::new(DefaultClock),
    ));
    let accounts = Arc::new(AccountService::new(Arc::new(SupabaseAuthGateway::new(
        client, None,
    ))));
    web::Data::new(HttpState::new(trees.clone(), trees, accounts))
}

fn dependencies(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) -> AppDependencies {
    AppDependencies {
        health_state,
        http_state,
        key: Key::generate(),
        cookie_secure: false,
        same_site: SameSite::Lax,
    }
}

#[rstest]
#[actix_rt::test]
async fn create_server_marks_ready(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) {
    let config = ServerConfig::new(
        Key::generate(),
        false,
        SameSite::Lax,
        "127.0.0.1:0".parse().expect("addr"),
    );
    let _server = create_server(health_state.clone(), http_state, config).expect("server binds");
    assert!(health_state.is_ready());
}

#[rstest]
#[actix_web::test]
async fn probes_are_served(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) {
    health_state.mark_ready();
    let app = test::init_service(build_app(dependencies(health_state, http_state))).await;
    for uri in ["/health/ready", "/health/live"] {
        let res = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(res.status(), StatusCode::OK, "{uri}");
    }
}

#[rstest]
#[actix_web::test]
async fn unknown_routes_answer_json_404_with_trace_id(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) {
    let app = test::init_service(build_app(dependencies(health_state, http_state))).await;
    let res = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/v1/forests").to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(res.headers().contains_key("trace-id"));
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body.get("code").and_then(Value::as_str), Some("not_found"));
}

#[rstest]
#[actix_web::test]
async fn protected_routes_require_session(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) {
    let app = test::init_service(build_app(dependencies(health_state, http_state))).await;
    let res = test::call_service(&app, test::TestRequest::get().uri("/api/v1/me").to_request())
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[cfg(debug_assertions)]
#[rstest]
#[actix_web::test]
async fn openapi_document_is_served_in_debug_builds(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) {
    let app = test::init_service(build_app(dependencies(health_state, http_state))).await;
    let res = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api-docs/openapi.json")
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let doc: Value = test::read_body_json(res).await;
    assert!(doc.pointer("/paths/~1api~1v1~1trees").is_some());
}
