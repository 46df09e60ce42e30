use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
    ActiveValue::NotSet,
};
use uuid::Uuid;

use crate::{
    audit,
    authz::{self, Operation},
    domain::Role,
    dto::{
        auth::{Claims, LoginRequest, LoginResponse, RegisterRequest},
        optional,
    },
    entity::{
        profiles::ActiveModel as ProfileActive,
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Profile,
    response::{ApiResponse, Meta},
    state::AppState,
};

const EMAIL_TAKEN: &str = "Email is already taken";

/// Creates the login identity and its profile together; a profile never exists without one.
pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<Profile>> {
    payload.validate()?;
    let email = payload.email.trim().to_lowercase();

    let exist = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;
    if exist.is_some() {
        return Err(AppError::bad_request(EMAIL_TAKEN));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(payload.password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();

    let id = Uuid::new_v4();
    let identity = AuthUser {
        user_id: id,
        role: payload.role,
    };
    authz::require(
        authz::check_profile(Some(&identity), Operation::Insert, id),
        Operation::Insert,
    )?;

    let txn = state.orm.begin().await?;
    UserActive {
        id: Set(id),
        email: Set(email.clone()),
        password_hash: Set(password_hash),
        created_at: NotSet,
    }
    .insert(&txn)
    .await
    .map_err(|err| AppError::on_conflict(err, EMAIL_TAKEN))?;

    let profile = ProfileActive {
        id: Set(id),
        email: Set(email),
        full_name: Set(optional(payload.full_name)),
        role: Set(payload.role.as_str().to_string()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await
    .map_err(|err| AppError::on_conflict(err, EMAIL_TAKEN))?;
    txn.commit().await?;

    tracing::info!(user_id = %id, role = %payload.role, "user registered");
    audit::record(
        &state.pool,
        id,
        "user_register",
        "profiles",
        serde_json::json!({ "user_id": id, "role": payload.role }),
    )
    .await;

    Ok(ApiResponse::success(
        "User created",
        Profile::from_entity(profile)?,
        None,
    ))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { email, password } = payload;
    let email = email.trim().to_lowercase();

    let row: Option<(Uuid, String, String)> = sqlx::query_as(
        r#"
        SELECT u.id, u.password_hash, p.role
        FROM users u
        JOIN profiles p ON p.id = u.id
        WHERE u.email = $1
        "#,
    )
    .bind(email.as_str())
    .fetch_optional(&state.pool)
    .await?;

    let (user_id, stored_hash, role) = match row {
        Some(r) => r,
        None => return Err(AppError::BadRequest("Invalid email or password".into())),
    };

    let parsed_hash = PasswordHash::new(&stored_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::BadRequest("Invalid email or password".into()));
    }

    let role: Role = role.parse()?;
    let token = issue_token(
        user_id,
        role,
        &state.config.jwt_secret,
        state.config.token_ttl_hours,
    )?;

    audit::record(
        &state.pool,
        user_id,
        "user_login",
        "users",
        serde_json::json!({ "user_id": user_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse {
            token: format!("Bearer {}", token),
            user_id,
            role,
        },
        Some(Meta::empty()),
    ))
}

pub fn issue_token(user_id: Uuid, role: Role, secret: &str, ttl_hours: i64) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role: role.as_str().to_string(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}
