//! OpenAPI documentation configuration.
//!
//! This module defines the [`ApiDoc`] struct which generates the OpenAPI
//! specification for the REST API. It registers:
//!
//! - **Paths**: every tree, account and health endpoint of the inbound layer
//! - **Schemas**: domain error wrappers ([`ErrorSchema`], [`ErrorCodeSchema`])
//!   plus the request and response DTOs
//! - **Security**: session cookie authentication scheme
//!
//! The generated specification is used by Swagger UI (debug builds) and
//! exported via `cargo run --bin openapi-dump` for external tooling.

use crate::inbound::http::accounts::{
    AccountResponse, ForgotPasswordRequest, LoginRequest, MessageResponse, RegisterRequest,
    UpdatePasswordRequest, UserResponse,
};
use crate::inbound::http::photos::PhotoUploadForm;
use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};
use crate::inbound::http::trees::{
    DeletedTreeResponse, HoursEstimateResponse, PlantTreeRequest, SpeciesCountResponse,
    TreeResponse, TreeStatisticsResponse, UpdateTreeRequest,
};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/v1/login.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
/// Swagger UI is enabled in debug builds only and used by tooling.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Canopy backend API",
        description = "Record planted trees, chart them and manage volunteer accounts.",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::trees::list_trees,
        crate::inbound::http::trees::plant_tree,
        crate::inbound::http::trees::update_tree,
        crate::inbound::http::trees::delete_tree,
        crate::inbound::http::trees::tree_statistics,
        crate::inbound::http::trees::estimate_hours,
        crate::inbound::http::photos::upload_photo,
        crate::inbound::http::accounts::register,
        crate::inbound::http::accounts::login,
        crate::inbound::http::accounts::logout,
        crate::inbound::http::accounts::current_user,
        crate::inbound::http::accounts::forgot_password,
        crate::inbound::http::accounts::update_password,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        TreeResponse,
        PlantTreeRequest,
        UpdateTreeRequest,
        DeletedTreeResponse,
        SpeciesCountResponse,
        TreeStatisticsResponse,
        HoursEstimateResponse,
        PhotoUploadForm,
        RegisterRequest,
        LoginRequest,
        ForgotPasswordRequest,
        UpdatePasswordRequest,
        AccountResponse,
        UserResponse,
        MessageResponse,
    )),
    tags(
        (name = "trees", description = "Planted tree records and chart data"),
        (name = "accounts", description = "Registration, sessions and password recovery"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    //! Tests verifying OpenAPI schema field structure.

    use super::*;
    use rstest::rstest;
    use utoipa::OpenApi;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    // Note: utoipa replaces :: with . in schema names
    const ERROR_SCHEMA_NAME: &str = "crate.domain.Error";

    /// Assert that an Object schema contains a field with the given name.
    fn assert_object_schema_has_field(schema: &RefOr<Schema>, field: &str) {
        match schema {
            RefOr::T(Schema::Object(obj)) => {
                assert!(
                    obj.properties.contains_key(field),
                    "schema should have field '{field}'"
                );
            }
            _ => panic!("expected Object schema"),
        }
    }

    #[test]
    fn openapi_error_schema_has_required_fields() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let error_schema = schemas.get(ERROR_SCHEMA_NAME).expect("Error schema");

        assert_object_schema_has_field(error_schema, "code");
        assert_object_schema_has_field(error_schema, "message");
        assert_object_schema_has_field(error_schema, "traceId");
    }

    #[test]
    fn tree_schema_uses_camel_case() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let tree = schemas.get("TreeResponse").expect("TreeResponse schema");

        assert_object_schema_has_field(tree, "plantedAt");
        assert_object_schema_has_field(tree, "plantedByEmail");
    }

    #[rstest]
    #[case("/api/v1/trees")]
    #[case("/api/v1/trees/{id}")]
    #[case("/api/v1/trees/{id}/photo")]
    #[case("/api/v1/trees/stats")]
    #[case("/api/v1/trees/estimate")]
    #[case("/api/v1/register")]
    #[case("/api/v1/login")]
    #[case("/api/v1/logout")]
    #[case("/api/v1/me")]
    #[case("/api/v1/password/forgot")]
    #[case("/api/v1/password/update")]
    #[case("/health/ready")]
    #[case("/health/live")]
    fn every_route_is_documented(#[case] path: &str) {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key(path), "missing {path}");
    }
}
