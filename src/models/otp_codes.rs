// ============================================================================
// MODÈLE : OTP CODES
// ============================================================================
//
// Description:
//   Code à usage unique pour la récupération de mot de passe.
//   Au plus UN enregistrement par email: la colonne email est UNIQUE et
//   request_code fait un upsert atomique (pas de delete puis create).
//
// Colonnes de la table otp_codes:
//   - id (INTEGER, PRIMARY KEY, SERIAL)
//   - email (VARCHAR, UNIQUE, NOT NULL)
//   - code (VARCHAR, NOT NULL) - 6 chiffres
//   - expires_at (TIMESTAMP, NOT NULL) - created_at + 5 minutes
//   - attempts (INTEGER, DEFAULT 0, NOT NULL)
//   - is_verified (BOOLEAN, DEFAULT FALSE, NOT NULL)
//   - created_at (TIMESTAMP, DEFAULT CURRENT_TIMESTAMP)
//
// Cycle de vie:
//   1. POST /api/otp/send-otp : upsert (code neuf, attempts = 0)
//   2. POST /api/otp/verify-otp : incrémente attempts ou passe is_verified
//      à true; supprime l'enregistrement si expiré ou si la tentative
//      dépasserait le maximum (5)
//   3. POST /api/otp/update-password : consomme l'enregistrement vérifié
//      (suppression) après avoir changé le mot de passe
//
// Points d'attention:
//   - L'incrément de attempts est un update conditionnel (WHERE attempts = n)
//     pour ne jamais sous-compter sous concurrence
//   - Un code déjà vérifié ne peut pas être re-vérifié: il faut en
//     redemander un
//
// ============================================================================

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "otp_codes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub email: String,

    pub code: String,

    pub expires_at: DateTime,

    pub attempts: i32,

    pub is_verified: bool,

    pub created_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
