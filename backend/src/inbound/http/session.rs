//! Session helpers to keep HTTP handlers free of framework-specific logic.
//!
//! Provides a thin wrapper around Actix sessions so handlers only deal with
//! domain-friendly operations such as persisting or retrieving the signed-in
//! user. Auth-service tokens never enter the cookie.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;

use crate::domain::{AuthUser, Error};

pub(crate) const USER_KEY: &str = "user";

/// Newtype wrapper that exposes higher-level session operations.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    /// Construct a new wrapper from the underlying Actix session.
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Persist the authenticated user in the session cookie.
    pub fn persist_user(&self, user: &AuthUser) -> Result<(), Error> {
        self.0.renew();
        self.0
            .insert(USER_KEY, user)
            .map_err(|error| Error::internal(format!("failed to persist session: {error}")))
    }

    /// Fetch the current user from the session, if present.
    ///
    /// A cookie whose payload no longer decodes is treated as signed out.
    pub fn user(&self) -> Result<Option<AuthUser>, Error> {
        match self.0.get::<AuthUser>(USER_KEY) {
            Ok(user) => Ok(user),
            Err(error) => {
                tracing::warn!("invalid user in session cookie: {error}");
                Ok(None)
            }
        }
    }

    /// Require an authenticated user or return `401 Unauthorized`.
    pub fn require_user(&self) -> Result<AuthUser, Error> {
        self.user()?
            .ok_or_else(|| Error::unauthorized("login required"))
    }

    /// Drop every session entry and expire the cookie.
    pub fn clear(&self) {
        self.0.purge();
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}
