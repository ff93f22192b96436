pub mod auth;
pub mod response;

pub use auth::{require_auth, AuthContext};
pub use response::{ApiResponse, ApiResult, PageInfo};
