use axum::response::Json;
use modkit::{Problem, ValidationError};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::rest::{dto, handlers};

#[derive(OpenApi)]
#[openapi(
    info(title = "Fruit Store API", description = "Inventory and user accounts"),
    paths(
        handlers::login,
        handlers::list_fruits,
        handlers::get_fruit,
        handlers::create_fruit,
        handlers::update_fruit,
        handlers::delete_fruit,
        handlers::list_users,
        handlers::create_user,
    ),
    components(schemas(
        dto::FruitDto,
        dto::FruitReq,
        dto::UserDto,
        dto::CreateUserReq,
        dto::LoginReq,
        dto::LoginResp,
        Problem,
        ValidationError,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Token issuance"),
        (name = "fruits", description = "Inventory"),
        (name = "users", description = "User accounts (admin only)"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
