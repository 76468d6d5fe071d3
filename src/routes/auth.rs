/// Authentication Routes
///
/// Thin JSON mapping over `AuthService`: register, login, refresh, logout,
/// logout-all and the current identity's profile.

use actix_web::{http::header, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthService, Claims};
use crate::domain::{ClientMetadata, Identity, NewAccount, TokenPair};
use crate::error::AppError;

/// User registration request
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of refresh and logout requests
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Authentication response with access and refresh tokens
#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

impl From<TokenPair> for AuthResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: pair.token_type.to_string(),
            expires_in: pair.expires_in,
            user: UserResponse::from(pair.identity),
        }
    }
}

/// Public view of an identity; never includes the password hash
#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Identity> for UserResponse {
    fn from(identity: Identity) -> Self {
        Self {
            id: identity.id.to_string(),
            email: identity.email,
            first_name: identity.first_name,
            last_name: identity.last_name,
            is_active: identity.is_active,
            created_at: identity.created_at.to_rfc3339(),
            updated_at: identity.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct LogoutAllResponse {
    pub message: String,
    pub revoked: u64,
}

fn client_metadata(req: &HttpRequest) -> ClientMetadata {
    ClientMetadata {
        ip_address: req.connection_info().realip_remote_addr().map(str::to_string),
        user_agent: req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string),
    }
}

/// POST /auth/register
///
/// # Errors
/// - 400: Validation errors (invalid email, names, password length)
/// - 409: Email already registered
pub async fn register(
    req: HttpRequest,
    form: web::Json<RegisterRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    let account = NewAccount {
        email: form.email,
        password: form.password,
        first_name: form.first_name,
        last_name: form.last_name,
    };

    let pair = auth.register(account, client_metadata(&req)).await?;
    Ok(HttpResponse::Created().json(AuthResponse::from(pair)))
}

/// POST /auth/login
///
/// # Errors
/// - 401: Invalid credentials (same response for unknown email and wrong password)
pub async fn login(
    req: HttpRequest,
    form: web::Json<LoginRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let pair = auth
        .login(&form.email, &form.password, client_metadata(&req))
        .await?;
    Ok(HttpResponse::Ok().json(AuthResponse::from(pair)))
}

/// POST /auth/refresh
///
/// Exchanges a refresh token for a new pair; the presented token is consumed.
///
/// # Errors
/// - 401: Invalid, expired, revoked or already used refresh token
pub async fn refresh(
    req: HttpRequest,
    form: web::Json<RefreshRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let pair = auth
        .refresh(&form.refresh_token, client_metadata(&req))
        .await?;
    Ok(HttpResponse::Ok().json(AuthResponse::from(pair)))
}

/// POST /auth/logout
///
/// Always 200 for any token, known or not.
pub async fn logout(
    form: web::Json<RefreshRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    auth.logout(&form.refresh_token).await?;
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}

/// POST /auth/logout-all
///
/// **Requires valid JWT access token.** Revokes every refresh token of the
/// caller.
pub async fn logout_all(
    claims: web::ReqData<Claims>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;
    let revoked = auth.logout_all(user_id).await?;
    Ok(HttpResponse::Ok().json(LogoutAllResponse {
        message: "Logged out from all sessions".to_string(),
        revoked,
    }))
}

/// GET /auth/profile
///
/// **Requires valid JWT access token.**
///
/// # Errors
/// - 404: Identity no longer exists
pub async fn profile(
    claims: web::ReqData<Claims>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;
    let identity = auth.profile(user_id).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(identity)))
}
