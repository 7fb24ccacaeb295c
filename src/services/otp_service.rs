use chrono::{Duration, NaiveDateTime, Utc};
use rand::distributions::Uniform;
use rand::Rng;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::*;
use std::env;

use crate::models::{drivers, otp_codes, technicians, users};
use crate::services::mailer::{self, Mailer};
use crate::utils::password;

/// Durée de vie d'un code OTP (secondes), OTP_TTL_SECONDS dans .env
const DEFAULT_OTP_TTL_SECONDS: i64 = 300;

/// Nombre maximum de tentatives de vérification, OTP_MAX_ATTEMPTS dans .env
const DEFAULT_OTP_MAX_ATTEMPTS: i32 = 5;

pub fn otp_ttl_seconds() -> i64 {
    env::var("OTP_TTL_SECONDS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_OTP_TTL_SECONDS)
}

pub fn otp_max_attempts() -> i32 {
    env::var("OTP_MAX_ATTEMPTS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_OTP_MAX_ATTEMPTS)
}

/// Échecs du cycle OTP, différenciés côté client
/// (contrairement aux échecs de token, volontairement uniformes)
#[derive(Debug, PartialEq)]
pub enum OtpError {
    UserNotFound,
    AccountNotActive,
    AccountDeleted,
    ProfileNotFound(&'static str),  // "driver" ou "technician"
    ProfileNotVerified(&'static str),
    NoCode,
    AlreadyUsed,
    Expired,
    InvalidCode,
    LockedOut,
    PasswordMismatch,
    PasswordTooShort,
    NotVerified,
    Db(String),
    Mail(String),
    Hash(String),
}

impl From<DbErr> for OtpError {
    fn from(e: DbErr) -> Self {
        OtpError::Db(e.to_string())
    }
}

/// Résultat de la comparaison d'un code soumis avec l'enregistrement stocké
#[derive(Debug, PartialEq)]
pub enum CodeOutcome {
    Verified,
    AlreadyUsed,
    Expired,
    Invalid,
    LockedOut,
}

/// Décide du sort d'une tentative de vérification.
/// Fonction pure: l'horloge est passée en paramètre, les effets en base
/// (incrément, suppression, passage à vérifié) sont appliqués par l'appelant.
pub fn evaluate_code(
    record: &otp_codes::Model,
    submitted: &str,
    now: NaiveDateTime,
    max_attempts: i32,
) -> CodeOutcome {
    // Un code déjà consommé côté vérification ne se rejoue pas
    if record.is_verified {
        return CodeOutcome::AlreadyUsed;
    }

    if record.expires_at <= now {
        return CodeOutcome::Expired;
    }

    if record.code != submitted {
        // Cette tentative est la n° attempts + 1
        if record.attempts >= max_attempts - 1 {
            return CodeOutcome::LockedOut;
        }
        return CodeOutcome::Invalid;
    }

    CodeOutcome::Verified
}

/// Génère un code OTP numérique à 6 chiffres
pub fn generate_code() -> String {
    rand::thread_rng()
        .sample_iter(&Uniform::new(0, 10))
        .take(6)
        .map(|d| d.to_string())
        .collect()
}

pub struct OtpService;

impl OtpService {
    /// Vérifie qu'un compte est éligible à la récupération de mot de passe:
    /// existant, actif, non supprimé, et profil vérifié pour les rôles
    /// chauffeur et technicien
    pub async fn eligible_account(
        db: &DatabaseConnection,
        email: &str,
    ) -> Result<users::Model, OtpError> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(db)
            .await?
            .ok_or(OtpError::UserNotFound)?;

        if user.is_deleted {
            return Err(OtpError::AccountDeleted);
        }
        if !user.is_active {
            return Err(OtpError::AccountNotActive);
        }

        match user.role.as_str() {
            users::ROLE_DRIVER => {
                let profile = drivers::Entity::find()
                    .filter(drivers::Column::UserId.eq(user.id))
                    .one(db)
                    .await?
                    .ok_or(OtpError::ProfileNotFound("driver"))?;
                if !profile.is_verified {
                    return Err(OtpError::ProfileNotVerified("driver"));
                }
            }
            users::ROLE_TECHNICIAN => {
                let profile = technicians::Entity::find()
                    .filter(technicians::Column::UserId.eq(user.id))
                    .one(db)
                    .await?
                    .ok_or(OtpError::ProfileNotFound("technician"))?;
                if !profile.is_verified {
                    return Err(OtpError::ProfileNotVerified("technician"));
                }
            }
            _ => {}
        }

        Ok(user)
    }

    /// Génère et envoie un nouveau code pour cet email.
    /// Upsert atomique sur la colonne email (UNIQUE): un éventuel code
    /// précédent est écrasé, jamais de doublon même sous concurrence.
    pub async fn request_code(
        db: &DatabaseConnection,
        mailer: &dyn Mailer,
        email: &str,
    ) -> Result<(), OtpError> {
        Self::eligible_account(db, email).await?;

        let code = generate_code();
        let ttl = otp_ttl_seconds();
        let now = Utc::now().naive_utc();

        let record = otp_codes::ActiveModel {
            email: Set(email.to_string()),
            code: Set(code.clone()),
            expires_at: Set(now + Duration::seconds(ttl)),
            attempts: Set(0),
            is_verified: Set(false),
            created_at: Set(Some(now)),
            ..Default::default()
        };

        otp_codes::Entity::insert(record)
            .on_conflict(
                OnConflict::column(otp_codes::Column::Email)
                    .update_columns([
                        otp_codes::Column::Code,
                        otp_codes::Column::ExpiresAt,
                        otp_codes::Column::Attempts,
                        otp_codes::Column::IsVerified,
                        otp_codes::Column::CreatedAt,
                    ])
                    .to_owned(),
            )
            .exec(db)
            .await?;

        mailer
            .send(
                email,
                "FieldServe - Your password reset code",
                &mailer::otp_email_body(&code, ttl / 60),
            )
            .map_err(OtpError::Mail)
    }

    /// Vérifie un code soumis pour cet email
    pub async fn verify_code(
        db: &DatabaseConnection,
        email: &str,
        submitted: &str,
    ) -> Result<(), OtpError> {
        let record = otp_codes::Entity::find()
            .filter(otp_codes::Column::Email.eq(email))
            .one(db)
            .await?
            .ok_or(OtpError::NoCode)?;

        let now = Utc::now().naive_utc();
        let max_attempts = otp_max_attempts();

        match evaluate_code(&record, submitted, now, max_attempts) {
            CodeOutcome::Verified => {
                let mut active: otp_codes::ActiveModel = record.into();
                active.is_verified = Set(true);
                active.update(db).await?;
                Ok(())
            }
            CodeOutcome::AlreadyUsed => Err(OtpError::AlreadyUsed),
            CodeOutcome::Expired => {
                otp_codes::Entity::delete_many()
                    .filter(otp_codes::Column::Email.eq(email))
                    .exec(db)
                    .await?;
                Err(OtpError::Expired)
            }
            CodeOutcome::LockedOut => {
                otp_codes::Entity::delete_many()
                    .filter(otp_codes::Column::Email.eq(email))
                    .exec(db)
                    .await?;
                Err(OtpError::LockedOut)
            }
            CodeOutcome::Invalid => {
                // Incrément conditionnel (WHERE attempts = n): deux requêtes
                // concurrentes ne comptent jamais la même tentative deux fois
                otp_codes::Entity::update_many()
                    .col_expr(
                        otp_codes::Column::Attempts,
                        Expr::col(otp_codes::Column::Attempts).add(1),
                    )
                    .filter(otp_codes::Column::Email.eq(email))
                    .filter(otp_codes::Column::Attempts.eq(record.attempts))
                    .filter(otp_codes::Column::Attempts.lt(max_attempts))
                    .exec(db)
                    .await?;

                Err(OtpError::InvalidCode)
            }
        }
    }

    /// Change le mot de passe après vérification du code, puis consomme
    /// l'enregistrement OTP (suppression)
    pub async fn reset_password(
        db: &DatabaseConnection,
        email: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<(), OtpError> {
        let user = Self::eligible_account(db, email).await?;

        if new_password != confirm_password {
            return Err(OtpError::PasswordMismatch);
        }
        if new_password.len() < password::MIN_PASSWORD_LENGTH {
            return Err(OtpError::PasswordTooShort);
        }

        let record = otp_codes::Entity::find()
            .filter(otp_codes::Column::Email.eq(email))
            .one(db)
            .await?
            .ok_or(OtpError::NoCode)?;

        if !record.is_verified {
            return Err(OtpError::NotVerified);
        }

        let new_hash = password::hash_password(new_password).map_err(OtpError::Hash)?;

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(Some(new_hash));
        active.update(db).await?;

        otp_codes::Entity::delete_many()
            .filter(otp_codes::Column::Email.eq(email))
            .exec(db)
            .await?;

        Ok(())
    }
}
