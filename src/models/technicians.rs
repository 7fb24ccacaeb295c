// ============================================================================
// MODÈLE : TECHNICIANS
// ============================================================================
//
// Description:
//   Profil métier d'un technicien, lié à deux comptes de la table users:
//   - user_id : le compte avec lequel le technicien se connecte
//   - master_user_id : le compte "maître" (l'atelier/le donneur d'ordre)
//     au nom duquel le technicien agit sur certains endpoints
//
// Colonnes de la table technicians:
//   - id (INTEGER, PRIMARY KEY, SERIAL)
//   - user_id (INTEGER, NOT NULL, FK vers users, UNIQUE)
//   - master_user_id (INTEGER, NOT NULL, FK vers users)
//   - is_verified (BOOLEAN, DEFAULT FALSE) - validé par un admin
//   - is_active (BOOLEAN, DEFAULT TRUE)
//   - is_deleted (BOOLEAN, DEFAULT FALSE)
//
// Points d'attention:
//   - is_verified conditionne le login et la récupération de mot de passe
//   - Le guard "master" refuse un profil inactif/supprimé même si le
//     token du technicien est encore valide
//
// ============================================================================

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "technicians")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub user_id: i32,

    pub master_user_id: i32,

    pub is_verified: bool,

    pub is_active: bool,

    pub is_deleted: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,

    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::MasterUserId",
        to = "super::users::Column::Id"
    )]
    MasterUser,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
