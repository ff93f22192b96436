use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::{self, Claims};
use crate::config::SecurityConfig;
use crate::database::models::{PublicUser, Role, UserRow};
use crate::database::StoreError;
use crate::error::ApiError;

/// Payload returned by a successful login.
#[derive(Debug, Serialize)]
pub struct LoginData {
    pub token: String,
    pub name: String,
    pub email: String,
}

/// Account registration, login and bearer-token resolution.
#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
    security: SecurityConfig,
}

impl UserService {
    pub fn new(pool: PgPool, security: SecurityConfig) -> Self {
        Self { pool, security }
    }

    /// Create an account. The account id doubles as its tenant id, so each
    /// registration opens a fresh tenant.
    pub async fn register(
        &self,
        name: String,
        email: String,
        password: String,
    ) -> Result<PublicUser, ApiError> {
        if self.find_by_email(&email).await?.is_some() {
            return Err(ApiError::conflict("User already exists with this email"));
        }

        let password_hash = bcrypt::hash(&password, self.security.bcrypt_cost).map_err(|err| {
            tracing::error!(error = %err, "password hashing failed");
            ApiError::internal(err.to_string())
        })?;

        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, name, email, password_hash, role, organization) \
             VALUES ($1, $2, $3, $4, $5, $1) \
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&name)
        .bind(&email)
        .bind(&password_hash)
        .bind(Role::Standard.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            // Unique-violation backstop for registrations racing the
            // existence check above.
            if let sqlx::Error::Database(db_err) = &err {
                if db_err.code().as_deref() == Some("23505") {
                    return ApiError::conflict("User already exists with this email");
                }
            }
            ApiError::from(StoreError::from(err))
        })?;

        info!(user_id = %row.id, "account registered");
        Ok(PublicUser::from(row))
    }

    /// Exchange credentials for a signed session token. Unknown email and
    /// wrong password fail identically.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginData, ApiError> {
        let user = match self.find_by_email(email).await? {
            Some(user) => user,
            None => return Err(ApiError::unauthenticated("Invalid email or password")),
        };

        let password_matches =
            bcrypt::verify(password, &user.password_hash).map_err(|err| {
                tracing::error!(error = %err, "password verification failed");
                ApiError::internal(err.to_string())
            })?;
        if !password_matches {
            return Err(ApiError::unauthenticated("Invalid email or password"));
        }

        let claims = Claims::new(
            user.id,
            user.organization,
            &user.role,
            self.security.token_ttl_hours,
        );
        let token = auth::sign_token(&claims, &self.security.jwt_secret)?;

        info!(user_id = %user.id, "login succeeded");
        Ok(LoginData {
            token,
            name: user.name,
            email: user.email,
        })
    }

    /// Resolve a bearer token to a live account row. A valid token whose
    /// account no longer exists is rejected.
    pub async fn resolve_token(&self, token: &str) -> Result<UserRow, ApiError> {
        let claims = auth::verify_token(token, &self.security.jwt_secret)?;

        self.find_by_id(claims.sub)
            .await?
            .ok_or_else(|| ApiError::unauthenticated("Unauthorized"))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRow>, ApiError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;

        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRow>, ApiError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;

        Ok(row)
    }
}
