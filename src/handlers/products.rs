use crate::handlers::users::{principal_of, UserResponse};
use crate::schemas::{
    authentication_required, bad_request, service_error_response, ApiResponse, AppState,
    ErrorResponse,
};
use axum::{
    extract::{multipart::Field, Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use model::entities::{image, product};
use serde::{Deserialize, Serialize};
use service::{ImageUpload, NewProduct};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::{IntoParams, ToSchema};

/// Query parameters for the listings overview
#[derive(Debug, Deserialize, ToSchema, IntoParams)]
pub struct ProductListQuery {
    /// Substring to match against listing titles, case-insensitively
    #[serde(rename = "searchWord")]
    pub search_word: Option<String>,
}

/// Listing response model
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: i32,
    pub title: String,
    pub description: String,
    /// Whole currency units
    pub price: i32,
    pub city: String,
    /// The publishing user
    pub user_id: i32,
    /// Image to show on overview pages, fetchable via /images/{id}
    pub preview_image_id: Option<i32>,
    pub created_at: chrono::NaiveDateTime,
}

impl From<product::Model> for ProductResponse {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            price: model.price,
            city: model.city,
            user_id: model.user_id,
            preview_image_id: model.preview_image_id,
            created_at: model.created_at,
        }
    }
}

/// Image metadata; the payload itself is served by /images/{id}
#[derive(Debug, Serialize, ToSchema)]
pub struct ImageMetaResponse {
    pub id: i32,
    pub name: String,
    pub original_file_name: String,
    pub size: i64,
    pub content_type: String,
    pub is_preview: bool,
    pub product_id: i32,
}

impl From<image::Model> for ImageMetaResponse {
    fn from(model: image::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            original_file_name: model.original_file_name,
            size: model.size,
            content_type: model.content_type,
            is_preview: model.is_preview,
            product_id: model.product_id,
        }
    }
}

/// The listings overview: matching products, the search term, the viewer
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductListResponse {
    pub products: Vec<ProductResponse>,
    pub search_word: Option<String>,
    pub user: Option<UserResponse>,
}

/// A single listing with its images
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductDetailResponse {
    pub product: ProductResponse,
    pub images: Vec<ImageMetaResponse>,
    /// True when the viewer owns this listing
    pub author_product: bool,
}

/// Browse or search listings
#[utoipa::path(
    get,
    path = "/",
    tag = "products",
    params(ProductListQuery),
    responses(
        (status = 200, description = "Products retrieved successfully", body = ApiResponse<ProductListResponse>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<ProductListResponse>>, (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering list_products function");
    debug!("Listing products with filter: {:?}", query.search_word);

    let products = state
        .products
        .list_products(query.search_word.as_deref())
        .await
        .map_err(service_error_response)?;
    let principal = principal_of(&state, &headers).await?;

    info!("Retrieved {} product(s)", products.len());
    Ok(Json(ApiResponse {
        data: ProductListResponse {
            products: products.into_iter().map(ProductResponse::from).collect(),
            search_word: query.search_word,
            user: principal.map(UserResponse::from),
        },
        message: "Products retrieved successfully".to_string(),
        success: true,
    }))
}

/// A single listing with its images
#[utoipa::path(
    get,
    path = "/product/{product_id}",
    tag = "products",
    params(
        ("product_id" = i32, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product retrieved successfully", body = ApiResponse<ProductDetailResponse>),
        (status = 404, description = "Product not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn product_detail(
    State(state): State<AppState>,
    Path(product_id): Path<i32>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<ProductDetailResponse>>, (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering product_detail function for product_id: {}", product_id);

    let product_model = state
        .products
        .product_by_id(product_id)
        .await
        .map_err(service_error_response)?;
    let images = state
        .products
        .images_of(product_model.id)
        .await
        .map_err(service_error_response)?;
    let principal = principal_of(&state, &headers).await?;
    let author_product = principal
        .map(|viewer| viewer.id == product_model.user_id)
        .unwrap_or(false);

    Ok(Json(ApiResponse {
        data: ProductDetailResponse {
            product: ProductResponse::from(product_model),
            images: images.into_iter().map(ImageMetaResponse::from).collect(),
            author_product,
        },
        message: "Product retrieved successfully".to_string(),
        success: true,
    }))
}

/// Read one multipart text field, mapping read failures to a 400.
async fn read_text_field(
    name: &str,
    field: Field<'_>,
) -> Result<String, (StatusCode, Json<ErrorResponse>)> {
    field.text().await.map_err(|multipart_error| {
        warn!("Failed to read form field {}: {}", name, multipart_error);
        bad_request(
            "INVALID_MULTIPART",
            format!("Failed to read form field {}", name),
        )
    })
}

/// Publish a listing with up to three images
///
/// Multipart fields: `title`, `description`, `price`, `city` plus the image
/// parts `file1`, `file2`, `file3`. Empty file parts are skipped, but at
/// least one non-empty image is required.
#[utoipa::path(
    post,
    path = "/product/create",
    tag = "products",
    responses(
        (status = 201, description = "Product created successfully", body = ApiResponse<ProductResponse>),
        (status = 400, description = "Invalid form data or no usable image", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, multipart))]
pub async fn create_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<ProductResponse>>), (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering create_product function");

    let Some(principal) = principal_of(&state, &headers).await? else {
        warn!("Anonymous attempt to publish a listing");
        return Err(authentication_required());
    };

    let mut title = None;
    let mut description = String::new();
    let mut price_raw = None;
    let mut city = String::new();
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|multipart_error| {
        warn!("Unreadable multipart payload: {}", multipart_error);
        bad_request(
            "INVALID_MULTIPART",
            "Unreadable multipart payload".to_string(),
        )
    })? {
        let Some(name) = field.name().map(|name| name.to_string()) else {
            continue;
        };
        match name.as_str() {
            "title" => title = Some(read_text_field(&name, field).await?),
            "description" => description = read_text_field(&name, field).await?,
            "price" => price_raw = Some(read_text_field(&name, field).await?),
            "city" => city = read_text_field(&name, field).await?,
            "file1" | "file2" | "file3" => {
                let original_file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(|multipart_error| {
                    warn!("Failed to read upload {}: {}", name, multipart_error);
                    bad_request("INVALID_MULTIPART", format!("Failed to read upload {}", name))
                })?;
                debug!("Received upload {} ({} bytes)", name, bytes.len());
                uploads.push(ImageUpload {
                    name,
                    original_file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {
                trace!("Ignoring unknown multipart field {}", name);
            }
        }
    }

    let Some(title) = title else {
        return Err(bad_request(
            "MISSING_FIELD",
            "A listing needs a title".to_string(),
        ));
    };
    let price = match price_raw {
        None => {
            return Err(bad_request(
                "MISSING_FIELD",
                "A listing needs a price".to_string(),
            ));
        }
        Some(raw) => raw.trim().parse::<i32>().map_err(|_| {
            bad_request(
                "INVALID_PRICE",
                format!("Not a whole-number price: {}", raw),
            )
        })?,
    };

    let new_product = NewProduct {
        title,
        description,
        price,
        city,
    };

    match state
        .products
        .create_product(&principal, new_product, uploads)
        .await
    {
        Ok(product_model) => {
            info!(
                "User {} published product {}",
                principal.id, product_model.id
            );
            Ok((
                StatusCode::CREATED,
                Json(ApiResponse {
                    data: ProductResponse::from(product_model),
                    message: "Product created successfully".to_string(),
                    success: true,
                }),
            ))
        }
        Err(service_error) => {
            warn!("Publishing failed: {}", service_error);
            Err(service_error_response(service_error))
        }
    }
}

/// Delete one of the caller's own listings
#[utoipa::path(
    post,
    path = "/product/delete/{product_id}",
    tag = "products",
    params(
        ("product_id" = i32, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product deleted successfully", body = ApiResponse<String>),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Caller does not own this product", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(product_id): Path<i32>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<String>>, (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering delete_product function for product_id: {}", product_id);

    let Some(principal) = principal_of(&state, &headers).await? else {
        return Err(authentication_required());
    };

    state
        .products
        .delete_product(&principal, product_id)
        .await
        .map_err(service_error_response)?;

    info!("Product {} deleted by user {}", product_id, principal.id);
    Ok(Json(ApiResponse {
        data: format!("Product {} deleted", product_id),
        message: "Product deleted successfully".to_string(),
        success: true,
    }))
}

/// The caller's own listings
#[utoipa::path(
    get,
    path = "/my/products",
    tag = "products",
    responses(
        (status = 200, description = "Products retrieved successfully", body = ApiResponse<Vec<ProductResponse>>),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn my_products(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<ProductResponse>>>, (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering my_products function");

    let Some(principal) = principal_of(&state, &headers).await? else {
        return Err(authentication_required());
    };

    let products = state
        .products
        .products_of_user(principal.id)
        .await
        .map_err(service_error_response)?;
    debug!("User {} has {} listing(s)", principal.id, products.len());

    Ok(Json(ApiResponse {
        data: products.into_iter().map(ProductResponse::from).collect(),
        message: "Products retrieved successfully".to_string(),
        success: true,
    }))
}
