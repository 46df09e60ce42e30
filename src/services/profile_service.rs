use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

use crate::{
    audit,
    authz::{self, Operation},
    dto::{optional, profiles::UpdateProfileRequest},
    entity::profiles::{ActiveModel, Entity as Profiles},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Profile,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn get_my_profile(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Profile>> {
    let profile = Profiles::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    authz::require(
        authz::check_profile(Some(user), Operation::Select, profile.id),
        Operation::Select,
    )?;

    Ok(ApiResponse::success(
        "Profile",
        Profile::from_entity(profile)?,
        Some(Meta::empty()),
    ))
}

pub async fn update_my_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<Profile>> {
    let existing = Profiles::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    authz::require(
        authz::check_profile(Some(user), Operation::Update, existing.id),
        Operation::Update,
    )?;

    let mut active: ActiveModel = existing.into();
    active.full_name = Set(optional(payload.full_name));
    active.updated_at = Set(Utc::now().into());
    let profile = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "profile_update",
        "profiles",
        serde_json::json!({ "profile_id": profile.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        Profile::from_entity(profile)?,
        Some(Meta::empty()),
    ))
}
