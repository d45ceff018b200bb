use crate::handlers::bearer_token;
use crate::handlers::products::ProductResponse;
use crate::schemas::{
    authentication_required, service_error_response, ApiResponse, AppState, ErrorResponse,
};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use axum_valid::Valid;
use model::entities::user;
use serde::{Deserialize, Serialize};
use service::NewUser;
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for registering a new user
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct RegisterRequest {
    /// Login email (must be unique)
    #[validate(email)]
    pub email: String,
    /// Display name
    #[validate(length(min = 1))]
    pub name: String,
    /// Password, stored only as a bcrypt digest
    #[validate(length(min = 6))]
    pub password: String,
}

/// Request body for logging in
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// User response model. Never carries the password digest.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    pub name: String,
    /// False once an administrator has banned the account
    pub active: bool,
    pub created_at: chrono::NaiveDateTime,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            name: model.name,
            active: model.active,
            created_at: model.created_at,
        }
    }
}

/// Successful login: the bearer token plus the account it belongs to
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Context for pages any visitor can open: who is looking, if anyone
#[derive(Debug, Serialize, ToSchema)]
pub struct PageContextResponse {
    pub user: Option<UserResponse>,
}

/// The caller's own profile
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub user: UserResponse,
    /// Role tags, e.g. "ROLE_USER"
    pub roles: Vec<String>,
}

/// A user's public page: the user, their listings, and the viewer
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicProfileResponse {
    pub user: UserResponse,
    /// The currently logged-in viewer, if any
    pub user_by_principal: Option<UserResponse>,
    pub products: Vec<ProductResponse>,
}

/// Resolve the caller into a user. Missing, malformed and dead tokens all
/// mean anonymity, never an error.
pub(crate) async fn principal_of(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<user::Model>, (StatusCode, Json<ErrorResponse>)> {
    let token = bearer_token(headers);
    state
        .users
        .user_by_token(token.as_deref())
        .await
        .map_err(service_error_response)
}

/// Registration page context
#[utoipa::path(
    get,
    path = "/registration",
    tag = "users",
    responses(
        (status = 200, description = "Page context retrieved successfully", body = ApiResponse<PageContextResponse>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn registration_page(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<PageContextResponse>>, (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering registration_page function");
    let principal = principal_of(&state, &headers).await?;

    Ok(Json(ApiResponse {
        data: PageContextResponse {
            user: principal.map(UserResponse::from),
        },
        message: "Page context retrieved successfully".to_string(),
        success: true,
    }))
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/registration",
    tag = "users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Email already taken", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn register(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<RegisterRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering register function");
    debug!("Registering user with email: {}", request.email);

    let new_user = NewUser {
        email: request.email,
        name: request.name,
        password: request.password,
    };

    match state.users.create_user(new_user).await {
        Ok(user_model) => {
            info!("User registered successfully with ID: {}", user_model.id);
            Ok((
                StatusCode::CREATED,
                Json(ApiResponse {
                    data: UserResponse::from(user_model),
                    message: "User registered successfully".to_string(),
                    success: true,
                }),
            ))
        }
        Err(service_error) => {
            warn!("Registration failed: {}", service_error);
            Err(service_error_response(service_error))
        }
    }
}

/// Login page context
#[utoipa::path(
    get,
    path = "/login",
    tag = "users",
    responses(
        (status = 200, description = "Page context retrieved successfully", body = ApiResponse<PageContextResponse>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn login_page(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<PageContextResponse>>, (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering login_page function");
    let principal = principal_of(&state, &headers).await?;

    Ok(Json(ApiResponse {
        data: PageContextResponse {
            user: principal.map(UserResponse::from),
        },
        message: "Page context retrieved successfully".to_string(),
        success: true,
    }))
}

/// Log in and receive a bearer token
#[utoipa::path(
    post,
    path = "/login",
    tag = "users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 403, description = "Account is banned", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering login function");
    debug!("Login attempt for email: {}", request.email);

    match state.users.login(&request.email, &request.password).await {
        Ok((user_model, session)) => {
            info!("User {} logged in", user_model.id);
            Ok(Json(ApiResponse {
                data: LoginResponse {
                    token: session.token,
                    user: UserResponse::from(user_model),
                },
                message: "Login successful".to_string(),
                success: true,
            }))
        }
        Err(service_error) => {
            warn!("Login failed: {}", service_error);
            Err(service_error_response(service_error))
        }
    }
}

/// Revoke the caller's bearer token
#[utoipa::path(
    post,
    path = "/logout",
    tag = "users",
    responses(
        (status = 200, description = "Logged out successfully", body = ApiResponse<String>),
        (status = 401, description = "No token presented", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<String>>, (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering logout function");

    let Some(token) = bearer_token(&headers) else {
        return Err(authentication_required());
    };

    // Unknown tokens are a no-op, so logout is idempotent
    state
        .users
        .logout(&token)
        .await
        .map_err(service_error_response)?;

    Ok(Json(ApiResponse {
        data: "Session revoked".to_string(),
        message: "Logged out successfully".to_string(),
        success: true,
    }))
}

/// The caller's own profile with their role tags
#[utoipa::path(
    get,
    path = "/profile",
    tag = "users",
    responses(
        (status = 200, description = "Profile retrieved successfully", body = ApiResponse<ProfileResponse>),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<ProfileResponse>>, (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering profile function");

    let Some(principal) = principal_of(&state, &headers).await? else {
        return Err(authentication_required());
    };

    let roles = state
        .users
        .roles_of(principal.id)
        .await
        .map_err(service_error_response)?;
    debug!("User {} holds {} role(s)", principal.id, roles.len());

    Ok(Json(ApiResponse {
        data: ProfileResponse {
            user: UserResponse::from(principal),
            roles: roles.iter().map(|role| role.tag().to_string()).collect(),
        },
        message: "Profile retrieved successfully".to_string(),
        success: true,
    }))
}

/// A user's public page with their listings
#[utoipa::path(
    get,
    path = "/user/{user_id}",
    tag = "users",
    params(
        ("user_id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User retrieved successfully", body = ApiResponse<PublicProfileResponse>),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn user_page(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<PublicProfileResponse>>, (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering user_page function for user_id: {}", user_id);

    let user_model = state
        .users
        .get_user(user_id)
        .await
        .map_err(service_error_response)?;
    let principal = principal_of(&state, &headers).await?;
    let products = state
        .products
        .products_of_user(user_model.id)
        .await
        .map_err(service_error_response)?;
    debug!("User {} has {} listing(s)", user_model.id, products.len());

    Ok(Json(ApiResponse {
        data: PublicProfileResponse {
            user: UserResponse::from(user_model),
            user_by_principal: principal.map(UserResponse::from),
            products: products.into_iter().map(ProductResponse::from).collect(),
        },
        message: "User retrieved successfully".to_string(),
        success: true,
    }))
}
