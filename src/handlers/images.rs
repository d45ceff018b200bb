use crate::schemas::{service_error_response, AppState, ErrorResponse};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        HeaderName, HeaderValue, StatusCode,
    },
    response::{Json, Response},
};
use tracing::{debug, instrument, trace};

/// Serve a stored image
///
/// Responds with the raw payload, the stored content type and a `fileName`
/// header carrying the original upload name.
#[utoipa::path(
    get,
    path = "/images/{image_id}",
    tag = "images",
    params(
        ("image_id" = i32, Path, description = "Image ID")
    ),
    responses(
        (status = 200, description = "Image payload"),
        (status = 404, description = "Image not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_image(
    State(state): State<AppState>,
    Path(image_id): Path<i32>,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering get_image function for image_id: {}", image_id);

    let image = state
        .products
        .image_by_id(image_id)
        .await
        .map_err(service_error_response)?;
    debug!(
        "Serving image {} ({}, {} bytes)",
        image.id, image.content_type, image.size
    );

    let mut response = Response::new(Body::from(image.bytes));
    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static("filename"),
        HeaderValue::from_str(&image.original_file_name)
            .unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_str(&image.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(CONTENT_LENGTH, HeaderValue::from(image.size));
    Ok(response)
}
