use chrono::{Duration, Utc};
use sea_orm::*;
use std::env;
use uuid::Uuid;

use crate::models::users;
use crate::services::mailer::{self, Mailer};
use crate::utils::password;

/// Durée de vie du token d'activation (heures)
const ACTIVATION_TTL_HOURS: i64 = 24;

#[derive(Debug, PartialEq)]
pub enum ActivationError {
    /// Token inconnu OU expiré: volontairement indistinguables
    InvalidOrExpired,
    PasswordTooShort,
    Db(String),
    Mail(String),
    Hash(String),
}

impl From<DbErr> for ActivationError {
    fn from(e: DbErr) -> Self {
        ActivationError::Db(e.to_string())
    }
}

pub struct ActivationService;

impl ActivationService {
    /// Pose un token d'activation (UUID v4, 24h) sur le compte et envoie
    /// le lien par email
    pub async fn issue_activation(
        db: &DatabaseConnection,
        mailer: &dyn Mailer,
        user: users::Model,
    ) -> Result<(), ActivationError> {
        let token = Uuid::new_v4().to_string();
        let expires_at = Utc::now().naive_utc() + Duration::hours(ACTIVATION_TTL_HOURS);
        let email = user.email.clone();

        let mut active: users::ActiveModel = user.into();
        active.activation_token = Set(Some(token.clone()));
        active.activation_token_expires_at = Set(Some(expires_at));
        active.update(db).await?;

        let app_url = env::var("APP_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
        let link = format!("{}/setup-password?token={}", app_url, token);

        mailer
            .send(
                &email,
                "FieldServe - Activate your account",
                &mailer::activation_email_body(&link),
            )
            .map_err(ActivationError::Mail)
    }

    /// Consomme un token d'activation: pose le mot de passe initial,
    /// active le compte et efface le token
    pub async fn setup_password(
        db: &DatabaseConnection,
        token: &str,
        new_password: &str,
    ) -> Result<users::Model, ActivationError> {
        if new_password.len() < password::MIN_PASSWORD_LENGTH {
            return Err(ActivationError::PasswordTooShort);
        }

        // Le filtre sur l'expiration fait partie de la requête: un token
        // expiré est introuvable, même réponse qu'un token forgé
        let user = users::Entity::find()
            .filter(users::Column::ActivationToken.eq(token))
            .filter(users::Column::ActivationTokenExpiresAt.gt(Utc::now().naive_utc()))
            .filter(users::Column::IsDeleted.eq(false))
            .one(db)
            .await?
            .ok_or(ActivationError::InvalidOrExpired)?;

        let new_hash = password::hash_password(new_password).map_err(ActivationError::Hash)?;

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(Some(new_hash));
        active.is_active = Set(true);
        active.activation_token = Set(None);
        active.activation_token_expires_at = Set(None);

        Ok(active.update(db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::mailer::test_support::RecordingMailer;

    fn pending_user() -> users::Model {
        users::Model {
            id: 3,
            email: "new@x.com".to_string(),
            password_hash: None,
            role: "customer".to_string(),
            is_active: false,
            is_deleted: false,
            activation_token: None,
            activation_token_expires_at: None,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_issue_activation_sends_link() {
        let user = pending_user();
        let updated = users::Model {
            activation_token: Some("stub".to_string()),
            activation_token_expires_at: Some(Utc::now().naive_utc()),
            ..user.clone()
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![updated]])
            .into_connection();
        let mailer = RecordingMailer::default();

        ActivationService::issue_activation(&db, &mailer, user)
            .await
            .unwrap();

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "new@x.com");
        assert!(sent[0].2.contains("/setup-password?token="));
    }

    #[tokio::test]
    async fn test_setup_password_rejects_short_password() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let err = ActivationService::setup_password(&db, "some-token", "short")
            .await
            .unwrap_err();
        assert_eq!(err, ActivationError::PasswordTooShort);
    }

    #[tokio::test]
    async fn test_setup_password_unknown_token() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<users::Model>::new()])
            .into_connection();
        let err = ActivationService::setup_password(&db, "forged", "long-enough-pass")
            .await
            .unwrap_err();
        assert_eq!(err, ActivationError::InvalidOrExpired);
    }
}
