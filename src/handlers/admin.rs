use crate::handlers::users::{principal_of, UserResponse};
use crate::schemas::{
    authentication_required, bad_request, service_error_response, ApiResponse, AppState,
    ErrorResponse,
};
use axum::{
    extract::{Form, Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use model::entities::user;
use model::entities::user_role::Role;
use sea_orm::Iterable;
use serde::Serialize;
use service::require_role;
use std::collections::HashMap;
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;

/// The administration overview: every account plus the viewing admin
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminPageResponse {
    pub users: Vec<UserResponse>,
    pub user: UserResponse,
}

/// Everything the role editing form needs
#[derive(Debug, Serialize, ToSchema)]
pub struct UserEditPageResponse {
    pub user: UserResponse,
    /// Roles currently held by the user
    pub user_roles: Vec<String>,
    /// Every assignable role
    pub roles: Vec<String>,
}

/// Resolve the caller and reject anyone without the admin role.
async fn require_admin(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<user::Model, (StatusCode, Json<ErrorResponse>)> {
    let Some(principal) = principal_of(state, headers).await? else {
        warn!("Anonymous call to an admin endpoint");
        return Err(authentication_required());
    };
    let roles = state
        .users
        .roles_of(principal.id)
        .await
        .map_err(service_error_response)?;
    if let Err(service_error) = require_role(&roles, Role::Admin) {
        warn!("User {} called an admin endpoint without the role", principal.id);
        return Err(service_error_response(service_error));
    }
    Ok(principal)
}

/// The administration overview
#[utoipa::path(
    get,
    path = "/admin",
    tag = "admin",
    responses(
        (status = 200, description = "Users retrieved successfully", body = ApiResponse<AdminPageResponse>),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn admin_page(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<AdminPageResponse>>, (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering admin_page function");

    let principal = require_admin(&state, &headers).await?;
    let users = state.users.list().await.map_err(service_error_response)?;
    debug!("Admin {} sees {} account(s)", principal.id, users.len());

    Ok(Json(ApiResponse {
        data: AdminPageResponse {
            users: users.into_iter().map(UserResponse::from).collect(),
            user: UserResponse::from(principal),
        },
        message: "Users retrieved successfully".to_string(),
        success: true,
    }))
}

/// Ban an account
///
/// A banned account cannot log in and its live sessions stop resolving.
/// Banning an already banned account changes nothing.
#[utoipa::path(
    post,
    path = "/admin/user/ban/{user_id}",
    tag = "admin",
    params(
        ("user_id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User banned successfully", body = ApiResponse<UserResponse>),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn ban_user(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<UserResponse>>, (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering ban_user function for user_id: {}", user_id);

    let principal = require_admin(&state, &headers).await?;
    match state.users.ban_user(user_id).await {
        Ok(banned) => {
            info!("Admin {} banned user {}", principal.id, banned.id);
            Ok(Json(ApiResponse {
                data: UserResponse::from(banned),
                message: "User banned successfully".to_string(),
                success: true,
            }))
        }
        Err(service_error) => {
            warn!("Ban of user {} failed: {}", user_id, service_error);
            Err(service_error_response(service_error))
        }
    }
}

/// Lift a ban
#[utoipa::path(
    post,
    path = "/admin/user/unban/{user_id}",
    tag = "admin",
    params(
        ("user_id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User unbanned successfully", body = ApiResponse<UserResponse>),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn unban_user(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<UserResponse>>, (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering unban_user function for user_id: {}", user_id);

    let principal = require_admin(&state, &headers).await?;
    match state.users.unban_user(user_id).await {
        Ok(restored) => {
            info!("Admin {} unbanned user {}", principal.id, restored.id);
            Ok(Json(ApiResponse {
                data: UserResponse::from(restored),
                message: "User unbanned successfully".to_string(),
                success: true,
            }))
        }
        Err(service_error) => {
            warn!("Unban of user {} failed: {}", user_id, service_error);
            Err(service_error_response(service_error))
        }
    }
}

/// Data for the role editing form of one account
#[utoipa::path(
    get,
    path = "/admin/user/edit/{user_id}",
    tag = "admin",
    params(
        ("user_id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User retrieved successfully", body = ApiResponse<UserEditPageResponse>),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn user_edit_page(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<UserEditPageResponse>>, (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering user_edit_page function for user_id: {}", user_id);

    require_admin(&state, &headers).await?;
    let edited = state
        .users
        .get_user(user_id)
        .await
        .map_err(service_error_response)?;
    let user_roles = state
        .users
        .roles_of(edited.id)
        .await
        .map_err(service_error_response)?;

    Ok(Json(ApiResponse {
        data: UserEditPageResponse {
            user: UserResponse::from(edited),
            user_roles: user_roles.iter().map(|role| role.tag().to_string()).collect(),
            roles: Role::iter().map(|role| role.tag().to_string()).collect(),
        },
        message: "User retrieved successfully".to_string(),
        success: true,
    }))
}

/// Replace an account's role set
///
/// Checkbox form semantics: a role is granted when its tag is present as a
/// form key. A submission with no role keys leaves the base role.
#[utoipa::path(
    post,
    path = "/admin/user/edit",
    tag = "admin",
    responses(
        (status = 200, description = "Roles updated successfully", body = ApiResponse<Vec<String>>),
        (status = 400, description = "Missing or malformed userId field", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn user_edit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Json<ApiResponse<Vec<String>>>, (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering user_edit function");

    let principal = require_admin(&state, &headers).await?;
    let user_id = form
        .get("userId")
        .and_then(|raw| raw.trim().parse::<i32>().ok())
        .ok_or_else(|| {
            warn!("Role edit without a usable userId field");
            bad_request("MISSING_USER_ID", "The form must carry a numeric userId".to_string())
        })?;

    match state.users.change_user_roles(user_id, &form).await {
        Ok(roles) => {
            info!("Admin {} set roles of user {} to {:?}", principal.id, user_id, roles);
            Ok(Json(ApiResponse {
                data: roles.iter().map(|role| role.tag().to_string()).collect(),
                message: "Roles updated successfully".to_string(),
                success: true,
            }))
        }
        Err(service_error) => {
            warn!("Role edit for user {} failed: {}", user_id, service_error);
            Err(service_error_response(service_error))
        }
    }
}
