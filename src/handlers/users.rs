use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, Result},
    models::{
        CreateUserRequest, MessageResponse, NewUser, RoleResponse, UpdateRoleRequest, User,
        UserFilter, normalize_email,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

/// create_user
///
/// [Public Route] Registers the account on first sign-in. The role is always
/// `student`; a second call with the same email inserts nothing and answers
/// `{"message": "user exists"}`.
#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = User),
        (status = 200, description = "Already registered", body = MessageResponse),
        (status = 400, description = "Missing email")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Response> {
    let email = normalize_email(&payload.email);
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest("a valid email is required".to_string()));
    }

    let new_user = NewUser {
        email,
        name: payload.name,
        photo_url: payload.photo_url,
    };

    match state.repo.create_user(new_user).await? {
        Some(user) => {
            tracing::info!(email = %user.email, "user registered");
            Ok((StatusCode::CREATED, Json(user)).into_response())
        }
        None => Ok(Json(MessageResponse::new("user exists")).into_response()),
    }
}

/// get_users
///
/// [Admin Route] Lists every user, optionally filtered by role or by an email/name
/// substring.
#[utoipa::path(
    get,
    path = "/users",
    params(UserFilter),
    responses((status = 200, description = "Users", body = [User]))
)]
pub async fn get_users(
    State(state): State<AppState>,
    Query(filter): Query<UserFilter>,
) -> Result<Json<Vec<User>>> {
    Ok(Json(state.repo.list_users(&filter).await?))
}

/// get_user_role
///
/// [Authenticated Route] Resolves the stored role for an email. The client uses it to
/// pick a dashboard.
#[utoipa::path(
    get,
    path = "/users/{email}/role",
    params(("email" = String, Path, description = "User email")),
    responses(
        (status = 200, description = "Role", body = RoleResponse),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn get_user_role(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<RoleResponse>> {
    let user = state
        .repo
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;
    Ok(Json(RoleResponse { role: user.role }))
}

/// update_user_role
///
/// [Admin Route] Promotes or demotes a user. An admin cannot change their own role.
#[utoipa::path(
    patch,
    path = "/users/{id}/role",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_user_role(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Json<User>> {
    let target = state
        .repo
        .find_user(id)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;
    if target.email == auth.email {
        return Err(AppError::BadRequest(
            "admins cannot change their own role".to_string(),
        ));
    }

    let user = state
        .repo
        .set_user_role(id, payload.role)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;
    tracing::info!(email = %user.email, role = ?user.role, by = %auth.email, "role changed");
    Ok(Json(user))
}

/// delete_user
///
/// [Admin Route] Hard-deletes a user record. Their applications and reviews stay.
#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if state.repo.delete_user(id).await? {
        tracing::info!(user_id = %id, by = %auth.email, "user deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("user not found".to_string()))
    }
}
