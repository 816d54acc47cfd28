use crate::domain::token::DeviceToken;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct RegisterTokenRequest {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTokenResponse {
    pub success: bool,
    pub message: String,
    pub total_tokens: usize,
}

#[derive(Debug, Serialize)]
pub struct TokensCountResponse {
    pub count: usize,
    pub tokens: Vec<DeviceToken>,
}

#[derive(Debug, Serialize)]
pub struct ClearTokensResponse {
    pub success: bool,
    pub message: String,
    pub count: usize,
}
