use axum::http::StatusCode;
use axum::response::Json;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use service::{ProductService, ServiceError, UserService};
use tracing::error;
use utoipa::{OpenApi, ToSchema};

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection, kept for liveness checks
    pub db: DatabaseConnection,
    /// User accounts, sessions, roles
    pub users: UserService,
    /// Listings and their images
    pub products: ProductService,
}

impl AppState {
    /// Build the shared state and its services from one connection.
    pub fn new(db: DatabaseConnection) -> Self {
        let users = UserService::new(db.clone());
        let products = ProductService::new(db.clone());
        Self { db, users, products }
    }
}

/// API response wrapper
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

/// Error response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// Translate a service failure into the wire error shape.
///
/// Database and digest failures are logged here and surfaced as an opaque
/// 500; every other variant carries a message safe to show the caller.
pub fn service_error_response(err: ServiceError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, code, message) = match &err {
        ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
        ServiceError::EmailTaken(_) => {
            (StatusCode::CONFLICT, "EMAIL_ALREADY_EXISTS", err.to_string())
        }
        ServiceError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            "INVALID_CREDENTIALS",
            err.to_string(),
        ),
        ServiceError::UserBanned => (StatusCode::FORBIDDEN, "USER_BANNED", err.to_string()),
        ServiceError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN", err.to_string()),
        ServiceError::InvalidUpload(_) => {
            (StatusCode::BAD_REQUEST, "INVALID_UPLOAD", err.to_string())
        }
        ServiceError::Database(db_error) => {
            error!("Database error while handling request: {}", db_error);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "Internal server error".to_string(),
            )
        }
        ServiceError::PasswordDigest(digest_error) => {
            error!("Password digest failure: {}", digest_error);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            )
        }
    };

    (
        status,
        Json(ErrorResponse {
            error: message,
            code: code.to_string(),
            success: false,
        }),
    )
}

/// 401 for requests that need a logged-in caller but have none.
pub fn authentication_required() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: "Authentication required".to_string(),
            code: "AUTHENTICATION_REQUIRED".to_string(),
            success: false,
        }),
    )
}

/// 400 with a caller-visible reason.
pub fn bad_request(code: &str, message: String) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message,
            code: code.to_string(),
            success: false,
        }),
    )
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::users::registration_page,
        crate::handlers::users::register,
        crate::handlers::users::login_page,
        crate::handlers::users::login,
        crate::handlers::users::logout,
        crate::handlers::users::profile,
        crate::handlers::users::user_page,
        crate::handlers::products::list_products,
        crate::handlers::products::product_detail,
        crate::handlers::products::create_product,
        crate::handlers::products::delete_product,
        crate::handlers::products::my_products,
        crate::handlers::images::get_image,
        crate::handlers::admin::admin_page,
        crate::handlers::admin::ban_user,
        crate::handlers::admin::unban_user,
        crate::handlers::admin::user_edit_page,
        crate::handlers::admin::user_edit,
    ),
    components(
        schemas(
            ApiResponse<crate::handlers::users::UserResponse>,
            ApiResponse<crate::handlers::users::LoginResponse>,
            ApiResponse<crate::handlers::users::PageContextResponse>,
            ApiResponse<crate::handlers::users::ProfileResponse>,
            ApiResponse<crate::handlers::users::PublicProfileResponse>,
            ApiResponse<crate::handlers::products::ProductResponse>,
            ApiResponse<crate::handlers::products::ProductListResponse>,
            ApiResponse<crate::handlers::products::ProductDetailResponse>,
            ApiResponse<Vec<crate::handlers::products::ProductResponse>>,
            ApiResponse<crate::handlers::admin::AdminPageResponse>,
            ApiResponse<crate::handlers::admin::UserEditPageResponse>,
            ApiResponse<Vec<String>>,
            ApiResponse<String>,
            ErrorResponse,
            HealthResponse,
            crate::handlers::users::RegisterRequest,
            crate::handlers::users::LoginRequest,
            crate::handlers::users::UserResponse,
            crate::handlers::users::LoginResponse,
            crate::handlers::users::PageContextResponse,
            crate::handlers::users::ProfileResponse,
            crate::handlers::users::PublicProfileResponse,
            crate::handlers::products::ProductResponse,
            crate::handlers::products::ProductListResponse,
            crate::handlers::products::ProductDetailResponse,
            crate::handlers::products::ImageMetaResponse,
            crate::handlers::admin::AdminPageResponse,
            crate::handlers::admin::UserEditPageResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "users", description = "Registration, login and profile endpoints"),
        (name = "products", description = "Listing browse, search, publish and delete endpoints"),
        (name = "images", description = "Raw listing image endpoints"),
        (name = "admin", description = "User administration endpoints"),
    ),
    info(
        title = "Bazaar API",
        description = "Marketplace API - users publish product listings with images, browse and search them, and administrators manage accounts",
        version = "0.1.0",
        contact(
            name = "Bazaar Team",
            email = "contact@bazaar.example"
        ),
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
