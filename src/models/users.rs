use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

/// Rôles reconnus par le système.
/// Toute autre valeur est refusée à l'inscription (pas de rôle par défaut).
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_TECHNICIAN: &str = "technician";
pub const ROLE_CUSTOMER: &str = "customer";
pub const ROLE_DRIVER: &str = "driver";

pub fn is_known_role(role: &str) -> bool {
    matches!(role, ROLE_ADMIN | ROLE_TECHNICIAN | ROLE_CUSTOMER | ROLE_DRIVER)
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub email: String,
    // Jamais renvoyé tel quel par l'API: les routes construisent des DTO
    // explicites sans le hash ni le token d'activation
    pub password_hash: Option<String>, // Format: pbkdf2:sha256:iterations$salt$hash, absent avant activation
    pub role: String,
    pub is_active: bool,
    pub is_deleted: bool,
    pub activation_token: Option<String>, // UUID v4, consommé par setup-password
    pub activation_token_expires_at: Option<DateTime>,
    pub created_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::technicians::Entity")]
    Technicians,

    #[sea_orm(has_many = "super::drivers::Entity")]
    Drivers,
}

impl Related<super::technicians::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Technicians.def()
    }
}

impl Related<super::drivers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Drivers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
