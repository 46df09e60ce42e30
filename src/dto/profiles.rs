use serde::Deserialize;
use utoipa::ToSchema;

/// Only the display name is editable; id, email and role are fixed.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
}
