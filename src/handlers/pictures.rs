// handlers/pictures.rs - /pictures and /pictures/:id

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::api::views::PictureView;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::FieldErrors;
use crate::services::possession::{self, Upload};
use crate::state::AppState;

/// Multipart form field carrying the image.
const UPLOAD_FIELD: &str = "picture";

fn multipart_error(err: MultipartError) -> ApiError {
    tracing::debug!("Rejected multipart body: {}", err);
    ApiError::bad_request(format!("malformed multipart body: {}", err.body_text()))
}

pub async fn pictures_get(State(state): State<AppState>) -> ApiResult<Vec<PictureView>> {
    Ok(ApiResponse::ok(possession::list_pictures(state.store.as_ref()).await?))
}

pub async fn pictures_post(
    State(state): State<AppState>,
    caller: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<PictureView> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_default();
        let content = field.bytes().await.map_err(multipart_error)?;

        upload = Some(Upload {
            filename,
            content_type,
            content: content.to_vec(),
        });
        break;
    }

    let Some(upload) = upload else {
        let mut errors = FieldErrors::new("Picture");
        errors.required::<()>(UPLOAD_FIELD, None);
        return Err(errors.into_error());
    };

    let picture = possession::add_picture(state.store.as_ref(), caller.id, upload).await?;
    Ok(ApiResponse::ok(picture))
}

/// Serves the stored bytes under their own content type.
pub async fn picture_get(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let Ok(id) = Uuid::parse_str(&id) else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    match possession::get_picture(state.store.as_ref(), id).await? {
        Some(picture) => Ok(([(header::CONTENT_TYPE, picture.content_type)], picture.content).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}
