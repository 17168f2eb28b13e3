use axum::{
    extract::{rejection::JsonRejection, Path},
    http::StatusCode,
    response::Json,
    Extension,
};
use modkit::{Problem, ProblemResponse};
use std::sync::Arc;
use tracing::info;

use crate::api::rest::dto::{
    CreateUserReq, FruitDto, FruitReq, LoginReq, LoginResp, UserDto,
};
use crate::api::rest::error::ProblemCtx;
use crate::auth::AuthContext;
use crate::module::StoreState;

type ApiResult<T> = Result<T, ProblemResponse>;

/// Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Token issued", body = LoginResp),
        (status = 400, description = "Bad Request", body = Problem),
        (status = 401, description = "Invalid credentials", body = Problem),
    )
)]
pub async fn login(
    Extension(state): Extension<Arc<StoreState>>,
    ctx: ProblemCtx,
    body: Result<Json<LoginReq>, JsonRejection>,
) -> ApiResult<Json<LoginResp>> {
    let Json(req) = body.map_err(|r| ctx.json_rejection(r))?;
    if req.username.is_empty() || req.password.is_empty() {
        return Err(ctx.bad_request("INVALID_BODY", "username and password are required"));
    }

    let user = state
        .users
        .authenticate(&req.username, &req.password)
        .await
        .map_err(|e| ctx.domain(e))?;
    let token = state.keys.issue(&user).map_err(|e| ctx.auth(e))?;
    info!(user_id = %user.id, "login succeeded");
    Ok(Json(LoginResp { token }))
}

/// List all fruits
#[utoipa::path(
    get,
    path = "/fruits",
    tag = "fruits",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All fruits", body = [FruitDto]),
        (status = 401, description = "Unauthorized", body = Problem),
        (status = 500, description = "Internal Server Error", body = Problem),
    )
)]
pub async fn list_fruits(
    Extension(state): Extension<Arc<StoreState>>,
    ctx: ProblemCtx,
) -> ApiResult<Json<Vec<FruitDto>>> {
    let fruits = state.fruits.list_fruits().await.map_err(|e| ctx.domain(e))?;
    Ok(Json(fruits.into_iter().map(FruitDto::from).collect()))
}

/// Get a fruit by id
#[utoipa::path(
    get,
    path = "/fruits/{id}",
    tag = "fruits",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Fruit UUID")),
    responses(
        (status = 200, description = "Fruit found", body = FruitDto),
        (status = 400, description = "Malformed id", body = Problem),
        (status = 404, description = "Not Found", body = Problem),
    )
)]
pub async fn get_fruit(
    Extension(state): Extension<Arc<StoreState>>,
    ctx: ProblemCtx,
    Path(id): Path<String>,
) -> ApiResult<Json<FruitDto>> {
    let id = ctx.parse_id(&id)?;
    let fruit = state.fruits.get_fruit(id).await.map_err(|e| ctx.domain(e))?;
    Ok(Json(fruit.into()))
}

/// Create a fruit
#[utoipa::path(
    post,
    path = "/fruits",
    tag = "fruits",
    security(("bearer" = [])),
    request_body = FruitReq,
    responses(
        (status = 201, description = "Created fruit", body = FruitDto),
        (status = 400, description = "Bad Request", body = Problem),
        (status = 403, description = "Forbidden", body = Problem),
    )
)]
pub async fn create_fruit(
    Extension(state): Extension<Arc<StoreState>>,
    ctx: ProblemCtx,
    body: Result<Json<FruitReq>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<FruitDto>)> {
    let Json(req) = body.map_err(|r| ctx.json_rejection(r))?;
    let fruit = state
        .fruits
        .create_fruit(req.into())
        .await
        .map_err(|e| ctx.domain(e))?;
    Ok((StatusCode::CREATED, Json(fruit.into())))
}

/// Replace the mutable fields of a fruit
#[utoipa::path(
    put,
    path = "/fruits/{id}",
    tag = "fruits",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Fruit UUID")),
    request_body = FruitReq,
    responses(
        (status = 200, description = "Updated fruit", body = FruitDto),
        (status = 400, description = "Bad Request", body = Problem),
        (status = 403, description = "Forbidden", body = Problem),
        (status = 404, description = "Not Found", body = Problem),
    )
)]
pub async fn update_fruit(
    Extension(state): Extension<Arc<StoreState>>,
    ctx: ProblemCtx,
    Path(id): Path<String>,
    body: Result<Json<FruitReq>, JsonRejection>,
) -> ApiResult<Json<FruitDto>> {
    let id = ctx.parse_id(&id)?;
    let Json(req) = body.map_err(|r| ctx.json_rejection(r))?;
    let fruit = state
        .fruits
        .update_fruit(id, req.into())
        .await
        .map_err(|e| ctx.domain(e))?;
    Ok(Json(fruit.into()))
}

/// Delete a fruit (idempotent)
#[utoipa::path(
    delete,
    path = "/fruits/{id}",
    tag = "fruits",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Fruit UUID")),
    responses(
        (status = 204, description = "Fruit deleted"),
        (status = 400, description = "Malformed id", body = Problem),
        (status = 403, description = "Forbidden", body = Problem),
    )
)]
pub async fn delete_fruit(
    Extension(state): Extension<Arc<StoreState>>,
    ctx: ProblemCtx,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = ctx.parse_id(&id)?;
    state
        .fruits
        .delete_fruit(id)
        .await
        .map_err(|e| ctx.domain(e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// List user accounts
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All users", body = [UserDto]),
        (status = 403, description = "Forbidden", body = Problem),
    )
)]
pub async fn list_users(
    Extension(state): Extension<Arc<StoreState>>,
    ctx: ProblemCtx,
) -> ApiResult<Json<Vec<UserDto>>> {
    let users = state.users.list_users().await.map_err(|e| ctx.domain(e))?;
    Ok(Json(users.into_iter().map(UserDto::from).collect()))
}

/// Create a user account; its event is published asynchronously
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    security(("bearer" = [])),
    request_body = CreateUserReq,
    responses(
        (status = 202, description = "User stored, event queued", body = UserDto),
        (status = 400, description = "Bad Request", body = Problem),
        (status = 403, description = "Forbidden", body = Problem),
        (status = 409, description = "Username taken", body = Problem),
    )
)]
pub async fn create_user(
    Extension(state): Extension<Arc<StoreState>>,
    Extension(caller): Extension<AuthContext>,
    ctx: ProblemCtx,
    body: Result<Json<CreateUserReq>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<UserDto>)> {
    let Json(req) = body.map_err(|r| ctx.json_rejection(r))?;
    let user = state
        .users
        .create_user(req.into())
        .await
        .map_err(|e| ctx.domain(e))?;
    info!(created_by = %caller.subject, username = %user.username, "user accepted");
    Ok((StatusCode::ACCEPTED, Json(user.into())))
}
