use axum::body::Bytes;
use axum::extract::State;
use serde::Deserialize;
use validator::Validate;

use crate::database::models::PublicUser;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::LoginData;
use crate::state::AppState;
use crate::validation::{parse_json_body, Sanitize};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(
        min = 3,
        max = 10,
        message = "Name must be between 3 and 10 characters"
    ))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

impl Sanitize for RegisterRequest {
    fn sanitize(&mut self) {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_lowercase();
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl Sanitize for LoginRequest {
    fn sanitize(&mut self) {
        self.email = self.email.trim().to_lowercase();
    }
}

/// POST /users - Register a new account
pub async fn register(State(state): State<AppState>, body: Bytes) -> ApiResult<PublicUser> {
    let request: RegisterRequest = parse_json_body(&body)?;

    let user = state
        .users
        .register(request.name, request.email, request.password)
        .await?;

    Ok(ApiResponse::created(user, "User created successfully"))
}

/// POST /users/login - Exchange credentials for a session token
pub async fn login(State(state): State<AppState>, body: Bytes) -> ApiResult<LoginData> {
    let request: LoginRequest = parse_json_body(&body)?;

    let data = state.users.login(&request.email, &request.password).await?;

    Ok(ApiResponse::with_message(data, "Login successful"))
}
