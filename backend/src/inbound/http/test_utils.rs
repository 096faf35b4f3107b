//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpResponse, test, web};
use uuid::Uuid;

use crate::domain::ports::{MockAccountCommand, MockTreeCommand, MockTreeQuery};
use crate::domain::validation::validate_email;
use crate::domain::{AuthUser, Error, UserId};
use crate::inbound::http::routes::{configure, not_found};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::middleware::Trace;

/// Path of the helper route that signs in [`sample_user`].
pub const TEST_SIGN_IN_PATH: &str = "/test/sign-in";

/// Build a session middleware configured for tests.
///
/// - Generates a fresh signing/encryption key per invocation.
/// - Sets the cookie name to `session` and disables the `Secure` flag for
///   local HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Extract the `session` cookie set by a response.
pub fn session_cookie<B>(response: &ServiceResponse<B>) -> Cookie<'static> {
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .map(Cookie::into_owned)
        .expect("session cookie set")
}

/// Signed-in user used across handler tests.
pub fn sample_user() -> AuthUser {
    AuthUser {
        id: UserId::from_uuid(Uuid::from_u128(0x3fa8_5f64_5717_4562_b3fc_2c96_3f66_afa6)),
        email: validate_email("ana@example.com").expect("fixture email"),
        display_name: Some("Ana".to_owned()),
    }
}

/// State wired to the given mocks.
pub fn mock_state(
    trees: MockTreeQuery,
    tree_commands: MockTreeCommand,
    accounts: MockAccountCommand,
) -> HttpState {
    HttpState::new(Arc::new(trees), Arc::new(tree_commands), Arc::new(accounts))
}

async fn sign_in(session: SessionContext) -> Result<HttpResponse, Error> {
    session.persist_user(&sample_user())?;
    Ok(HttpResponse::Ok().finish())
}

/// Full route table plus a sign-in shortcut, backed by `state`.
pub fn test_app(
    state: HttpState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .wrap(test_session_middleware())
        .wrap(Trace)
        .route(TEST_SIGN_IN_PATH, web::post().to(sign_in))
        .configure(configure)
        .default_service(web::to(not_found))
}

/// Sign in [`sample_user`] and return the session cookie.
pub async fn signed_in_cookie(
    app: &impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
) -> Cookie<'static> {
    let res = test::call_service(
        app,
        test::TestRequest::post().uri(TEST_SIGN_IN_PATH).to_request(),
    )
    .await;
    assert!(res.status().is_success());
    session_cookie(&res)
}
