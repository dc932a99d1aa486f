use serde::Serialize;

use crate::db::types::UserRole;
use crate::schemas::user::UserResponse;

#[derive(Debug, Serialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    pub(crate) token_type: String,
    pub(crate) user: UserResponse,
    pub(crate) role: UserRole,
}

#[derive(Debug, Serialize)]
pub(crate) struct MeResponse {
    pub(crate) user: UserResponse,
    pub(crate) role: UserRole,
}
