use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::contract::model::{Fruit, FruitDraft, NewUser, User};

/// REST DTO for fruit representation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FruitDto {
    pub id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// REST DTO for creating or replacing a fruit
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FruitReq {
    pub name: String,
    pub quantity: i32,
    pub price: f64,
}

/// REST DTO for user representation; the password hash is never exposed
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserDto {
    pub id: Uuid,
    pub username: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateUserReq {
    pub username: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginReq {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResp {
    pub token: String,
}

impl From<Fruit> for FruitDto {
    fn from(f: Fruit) -> Self {
        Self {
            id: f.id,
            name: f.name,
            quantity: f.quantity,
            price: f.price,
            created_at: f.created_at,
            updated_at: f.updated_at,
        }
    }
}

impl From<FruitReq> for FruitDraft {
    fn from(req: FruitReq) -> Self {
        Self {
            name: req.name,
            quantity: req.quantity,
            price: req.price,
        }
    }
}

impl From<User> for UserDto {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            role: u.role.as_str().to_string(),
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

impl From<CreateUserReq> for NewUser {
    fn from(req: CreateUserReq) -> Self {
        Self {
            username: req.username,
            password: req.password,
            role: req.role,
        }
    }
}
