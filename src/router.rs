use crate::handlers::{
    admin::{admin_page, ban_user, unban_user, user_edit, user_edit_page},
    health::health_check,
    images::get_image,
    products::{create_product, delete_product, list_products, my_products, product_detail},
    users::{
        login, login_page, logout, profile, register, registration_page, user_page,
    },
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Listing routes
        .route("/", get(list_products))
        .route("/product/:product_id", get(product_detail))
        .route("/product/create", post(create_product))
        .route("/product/delete/:product_id", post(delete_product))
        .route("/my/products", get(my_products))
        // Image payloads
        .route("/images/:image_id", get(get_image))
        // Account routes
        .route("/registration", get(registration_page))
        .route("/registration", post(register))
        .route("/login", get(login_page))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/profile", get(profile))
        .route("/user/:user_id", get(user_page))
        // Administration routes
        .route("/admin", get(admin_page))
        .route("/admin/user/ban/:user_id", post(ban_user))
        .route("/admin/user/unban/:user_id", post(unban_user))
        .route("/admin/user/edit/:user_id", get(user_edit_page))
        .route("/admin/user/edit", post(user_edit))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
