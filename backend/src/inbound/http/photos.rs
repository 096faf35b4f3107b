//! Tree photo upload.
//!
//! ```text
//! POST /api/v1/trees/{id}/photo   multipart/form-data, file field `photo`
//! ```
//!
//! The body is streamed and abandoned as soon as it exceeds the photo limit,
//! so an oversized upload never sits in memory in full.

use actix_multipart::{Field, Multipart, MultipartError};
use actix_web::web;
use futures_util::TryStreamExt;

use crate::domain::trees::MAX_PHOTO_BYTES;
use crate::domain::validation::validate_photo_filename;
use crate::domain::{Error, InvalidInput, InvalidReason, PhotoUpload, TreeId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::trees::TreeResponse;

/// Multipart field carrying the image.
pub const PHOTO_FIELD: &str = "photo";

/// OpenAPI description of the upload form.
#[derive(utoipa::ToSchema)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct PhotoUploadForm {
    /// PNG, JPEG or WebP image of at most 5 MB.
    #[schema(value_type = String, format = Binary)]
    photo: Vec<u8>,
}

fn multipart_error(error: MultipartError) -> Error {
    Error::invalid_request(format!("invalid multipart body: {error}"))
}

async fn read_limited(field: &mut Field) -> Result<Vec<u8>, Error> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(multipart_error)? {
        if bytes.len() + chunk.len() > MAX_PHOTO_BYTES {
            return Err(Error::payload_too_large("photo must be at most 5 MB"));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

async fn skip(field: &mut Field) -> Result<(), Error> {
    while field.try_next().await.map_err(multipart_error)?.is_some() {}
    Ok(())
}

/// Pull the `photo` field out of a multipart body.
async fn read_photo(mut payload: Multipart) -> Result<PhotoUpload, Error> {
    while let Some(mut field) = payload.try_next().await.map_err(multipart_error)? {
        if field.name() != Some(PHOTO_FIELD) {
            skip(&mut field).await?;
            continue;
        }
        let filename = field
            .content_disposition()
            .and_then(|disposition| disposition.get_filename())
            .map(str::to_owned);
        let extension = validate_photo_filename(filename.as_deref())?;
        let bytes = read_limited(&mut field).await?;
        return Ok(PhotoUpload::try_new(extension, bytes)?);
    }
    Err(InvalidInput::new(PHOTO_FIELD, InvalidReason::Missing, "photo is required").into())
}

/// Upload a photo for a tree and store its public URL on the record.
#[utoipa::path(
    post,
    path = "/api/v1/trees/{id}/photo",
    params(("id" = i64, Path, description = "Tree identifier")),
    request_body(content = PhotoUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Tree with the new photo", body = TreeResponse),
        (status = 400, description = "Missing or unsupported photo", body = Error),
        (status = 401, description = "Login required", body = Error),
        (status = 404, description = "Unknown tree", body = Error),
        (status = 413, description = "Photo larger than 5 MB", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["trees"],
    operation_id = "uploadTreePhoto"
)]
pub async fn upload_photo(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i64>,
    payload: Multipart,
) -> ApiResult<web::Json<TreeResponse>> {
    session.require_user()?;
    let upload = read_photo(payload).await?;
    let tree = state
        .tree_commands
        .attach_photo(TreeId::new(path.into_inner()), upload)
        .await?;
    Ok(web::Json(tree.into()))
}
