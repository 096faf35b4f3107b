//! Route table for the HTTP adapter.
//!
//! Every path is registered as one resource per URL so a known path hit with
//! the wrong method answers 405 instead of falling through to 404.

use actix_web::{HttpRequest, HttpResponse, Resource, web};

use crate::domain::Error;
use crate::inbound::http::ApiResult;
use crate::inbound::http::accounts::{
    current_user, forgot_password, login, logout, register, update_password,
};
use crate::inbound::http::extractors::{json_config, path_config, query_config};
use crate::inbound::http::health::{live, ready};
use crate::inbound::http::photos::upload_photo;
use crate::inbound::http::trees::{
    delete_tree, estimate_hours, list_trees, plant_tree, tree_statistics, update_tree,
};

/// Prefix shared by every API route.
pub const API_PREFIX: &str = "/api/v1";

/// Fallback for unknown routes.
pub async fn not_found(req: HttpRequest) -> ApiResult<HttpResponse> {
    Err(Error::not_found(format!("no route for {}", req.path())))
}

async fn method_not_allowed(req: HttpRequest) -> ApiResult<HttpResponse> {
    Err(Error::method_not_allowed(format!(
        "{} is not allowed on {}",
        req.method(),
        req.path()
    )))
}

fn resource(path: &str) -> Resource {
    web::resource(path).default_service(web::to(method_not_allowed))
}

/// Register probes, API routes and extractor configuration.
///
/// The `/trees/stats` and `/trees/estimate` resources are registered before
/// `/trees/{id}` so they are not captured as identifiers.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .service(resource("/health/ready").route(web::get().to(ready)))
        .service(resource("/health/live").route(web::get().to(live)))
        .service(
            web::scope(API_PREFIX)
                .service(
                    resource("/trees")
                        .route(web::get().to(list_trees))
                        .route(web::post().to(plant_tree)),
                )
                .service(resource("/trees/stats").route(web::get().to(tree_statistics)))
                .service(resource("/trees/estimate").route(web::get().to(estimate_hours)))
                .service(
                    resource("/trees/{id}")
                        .route(web::patch().to(update_tree))
                        .route(web::delete().to(delete_tree)),
                )
                .service(resource("/trees/{id}/photo").route(web::post().to(upload_photo)))
                .service(resource("/register").route(web::post().to(register)))
                .service(resource("/login").route(web::post().to(login)))
                .service(resource("/logout").route(web::post().to(logout)))
                .service(resource("/me").route(web::get().to(current_user)))
                .service(resource("/password/forgot").route(web::post().to(forgot_password)))
                .service(resource("/password/update").route(web::post().to(update_password))),
        );
}
