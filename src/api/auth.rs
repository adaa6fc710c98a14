use actix_web::{web, HttpResponse, ResponseError};

use crate::config::AppConfig;
use crate::database::UserStore;
use crate::services::auth_service::{
    self, Claims, LoginRequest, LoginResponse, ProfileResponse, SignupRequest, SignupResponse,
};
use crate::utils::AppError;

#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful, streak and coins updated", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 404, description = "User not found")
    )
)]
pub async fn login(
    store: web::Data<dyn UserStore>,
    config: web::Data<AppConfig>,
    request: web::Json<LoginRequest>,
) -> HttpResponse {
    log::info!("🔐 POST /login - email: {}", request.email);

    match auth_service::login(store.get_ref(), &config, &request).await {
        Ok(response) => {
            log::info!(
                "✅ Login successful: {} ({:?}, +{} coins)",
                request.email,
                response.login_reward.outcome,
                response.login_reward.coins_awarded
            );
            HttpResponse::Ok().json(response)
        }
        Err(e) => {
            match &e {
                AppError::Database(_) | AppError::Internal(_) => log::error!("❌ Login error: {} - {}", request.email, e),
                _ => log::warn!("❌ Login failed: {} - {}", request.email, e),
            }
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/signup",
    tag = "Auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = SignupResponse),
        (status = 400, description = "Missing fields"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn signup(
    store: web::Data<dyn UserStore>,
    config: web::Data<AppConfig>,
    request: web::Json<SignupRequest>,
) -> HttpResponse {
    let email_str = request.email.as_deref().unwrap_or("N/A");
    log::info!("📝 POST /signup - email: {}", email_str);

    match auth_service::signup(store.get_ref(), &config, &request).await {
        Ok(response) => HttpResponse::Created().json(response),
        Err(e) => {
            log::warn!("❌ Signup failed: {} - {}", email_str, e);
            e.error_response()
        }
    }
}

/// Tokens are stateless; the client drops its session on logout
#[utoipa::path(
    post,
    path = "/logout",
    tag = "Auth",
    responses((status = 200, description = "Logged out"))
)]
pub async fn logout() -> HttpResponse {
    log::info!("👋 POST /logout");
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Logged out successfully"
    }))
}

#[utoipa::path(
    get,
    path = "/protected",
    tag = "Auth",
    responses(
        (status = 200, description = "Token is valid"),
        (status = 401, description = "Invalid or expired token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn protected(user: web::ReqData<Claims>) -> HttpResponse {
    log::info!("✓ GET /protected - user: {}", user.sub);
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "User Verified"
    }))
}

#[utoipa::path(
    get,
    path = "/profile",
    tag = "Profile",
    responses(
        (status = 200, description = "Profile of the authenticated user", body = ProfileResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn profile(store: web::Data<dyn UserStore>, user: web::ReqData<Claims>) -> HttpResponse {
    log::info!("👤 GET /profile - user: {}", user.sub);

    let user_id = match user.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };

    match auth_service::get_profile(store.get_ref(), &user_id).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            log::error!("❌ Profile retrieval failed for {}: {}", user.sub, e);
            e.error_response()
        }
    }
}
