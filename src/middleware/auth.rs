use actix_web::{dev::Payload, web, Error, FromRequest, HttpRequest, HttpResponse};
use futures::future::{ready, LocalBoxFuture, Ready};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};

use crate::models::{technicians, users};
use crate::utils::jwt;

/// Header porté par la surface mobile admin (pas de token Bearer)
pub const ADMIN_ID_HEADER: &str = "X-Admin-Id";

fn unauthorized(message: &str) -> Error {
    let response = HttpResponse::Unauthorized().json(serde_json::json!({
        "error": message
    }));
    actix_web::error::InternalError::from_response("", response).into()
}

fn forbidden(message: &str) -> Error {
    let response = HttpResponse::Forbidden().json(serde_json::json!({
        "error": message
    }));
    actix_web::error::InternalError::from_response("", response).into()
}

fn server_error(message: &str) -> Error {
    let response = HttpResponse::InternalServerError().json(serde_json::json!({
        "error": message
    }));
    actix_web::error::InternalError::from_response("", response).into()
}

/// Extrait et vérifie le token Bearer d'une requête
/// Toutes les causes d'échec (header absent, format invalide, signature,
/// expiration) donnent un 401 - jamais de distinction côté client
fn bearer_claims(req: &HttpRequest) -> Result<jwt::Claims, Error> {
    // 1. Extraire le header Authorization
    let auth_header = req
        .headers()
        .get("Authorization")
        .ok_or_else(|| unauthorized("Missing Authorization header"))?;

    // 2. Convertir le header en string
    let auth_str = auth_header
        .to_str()
        .map_err(|_| unauthorized("Invalid Authorization header"))?;

    // 3. Extraire le token (format: "Bearer <token>")
    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| unauthorized("Invalid Authorization format (expected: Bearer <token>)"))?;

    // 4. Vérifier le token JWT
    jwt::verify_token(token).map_err(|_| unauthorized("Invalid token"))
}

fn db_from_request(req: &HttpRequest) -> Result<web::Data<DatabaseConnection>, Error> {
    // Clone du handle Data (Arc), pas de la connexion
    req.app_data::<web::Data<DatabaseConnection>>()
        .cloned()
        .ok_or_else(|| server_error("Database not configured"))
}

// ============================================================================
// GUARD GÉNÉRAL - identité authentifiée, sans restriction de rôle
// ============================================================================

/// Identité authentifiée attachée aux routes protégées
/// (valeur explicite extraite par Actix, pas de mutation ambiante)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: i32,
    pub email: String,
    pub role: String,
}

impl FromRequest for AuthUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(bearer_claims(req).map(|claims| AuthUser {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
        }))
    }
}

// ============================================================================
// GUARDS PAR RÔLE - customer / driver / technician
// ============================================================================

/// Guard client: token Bearer avec rôle customer exactement
#[derive(Debug, Clone)]
pub struct CustomerUser {
    pub user_id: i32,
    pub email: String,
}

impl FromRequest for CustomerUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(bearer_claims(req).and_then(|claims| {
            if claims.role != users::ROLE_CUSTOMER {
                return Err(forbidden("Customer role required"));
            }
            Ok(CustomerUser {
                user_id: claims.sub,
                email: claims.email,
            })
        }))
    }
}

/// Guard chauffeur: token Bearer avec rôle driver exactement
#[derive(Debug, Clone)]
pub struct DriverUser {
    pub user_id: i32,
    pub email: String,
}

impl FromRequest for DriverUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(bearer_claims(req).and_then(|claims| {
            if claims.role != users::ROLE_DRIVER {
                return Err(forbidden("Driver role required"));
            }
            Ok(DriverUser {
                user_id: claims.sub,
                email: claims.email,
            })
        }))
    }
}

/// Guard technicien: rôle technician, ou admin (accès élevé)
#[derive(Debug, Clone)]
pub struct TechnicianUser {
    pub user_id: i32,
    pub email: String,
    pub role: String,
    pub technician_id: Option<i32>,
}

impl FromRequest for TechnicianUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(bearer_claims(req).and_then(|claims| {
            if claims.role != users::ROLE_TECHNICIAN && claims.role != users::ROLE_ADMIN {
                return Err(forbidden("Technician role required"));
            }
            Ok(TechnicianUser {
                user_id: claims.sub,
                email: claims.email,
                role: claims.role,
                technician_id: claims.technician_id,
            })
        }))
    }
}

// ============================================================================
// GUARD ADMIN - double chemin (header mobile OU token Bearer)
// ============================================================================

/// Guard admin à double résolution, dans cet ordre:
///   1. Chemin délégué/mobile: header X-Admin-Id résolu en base
///      (rejeté si compte introuvable ou supprimé)
///   2. Chemin token: Bearer classique
/// Aucun des deux -> 401. Identité résolue mais rôle != admin -> 403.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user_id: i32,
    pub email: String,
}

impl FromRequest for AdminUser {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            // 1. Chemin délégué: header admin présent
            if let Some(raw_id) = req.headers().get(ADMIN_ID_HEADER) {
                let admin_id = raw_id
                    .to_str()
                    .ok()
                    .and_then(|s| s.parse::<i32>().ok())
                    .ok_or_else(|| unauthorized("Invalid admin identifier"))?;

                let db = db_from_request(&req)?;
                let user = users::Entity::find_by_id(admin_id)
                    .one(db.get_ref())
                    .await
                    .map_err(|_| server_error("Database error"))?
                    .ok_or_else(|| unauthorized("Admin account not found"))?;

                if user.is_deleted {
                    return Err(forbidden("Admin account deleted"));
                }
                if user.role != users::ROLE_ADMIN {
                    return Err(forbidden("Admin role required"));
                }

                return Ok(AdminUser {
                    user_id: user.id,
                    email: user.email,
                });
            }

            // 2. Chemin token: Bearer classique
            let claims = bearer_claims(&req)?;
            if claims.role != users::ROLE_ADMIN {
                return Err(forbidden("Admin role required"));
            }

            Ok(AdminUser {
                user_id: claims.sub,
                email: claims.email,
            })
        })
    }
}

// ============================================================================
// GUARD TECHNICIEN-MAÎTRE - le technicien agit au nom du compte maître
// ============================================================================

/// Guard de délégation: token technicien, mais l'identité attachée est
/// celle du COMPTE MAÎTRE référencé par le profil technicien.
/// Chaque lookup échoue fermé (403): profil absent/inactif/supprimé,
/// puis compte maître absent/inactif/supprimé.
#[derive(Debug, Clone)]
pub struct MasterTechnician {
    pub master_user_id: i32,
    pub master_email: String,
    pub technician_id: i32,
    pub technician_user_id: i32,
}

impl FromRequest for MasterTechnician {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            // 1. Token Bearer, rôle technicien strict (pas d'override admin:
            //    un admin n'a pas de profil technicien à résoudre)
            let claims = bearer_claims(&req)?;
            if claims.role != users::ROLE_TECHNICIAN {
                return Err(forbidden("Technician role required"));
            }

            let db = db_from_request(&req)?;

            // 2. Profil technicien du sujet du token
            let profile = technicians::Entity::find()
                .filter(technicians::Column::UserId.eq(claims.sub))
                .one(db.get_ref())
                .await
                .map_err(|_| server_error("Database error"))?
                .ok_or_else(|| forbidden("Technician profile not found"))?;

            if profile.is_deleted || !profile.is_active {
                return Err(forbidden("Technician profile is not active"));
            }

            // 3. Compte maître référencé par le profil
            let master = users::Entity::find_by_id(profile.master_user_id)
                .one(db.get_ref())
                .await
                .map_err(|_| server_error("Database error"))?
                .ok_or_else(|| forbidden("Master account not found"))?;

            if master.is_deleted || !master.is_active {
                return Err(forbidden("Master account is not active"));
            }

            Ok(MasterTechnician {
                master_user_id: master.id,
                master_email: master.email,
                technician_id: profile.id,
                technician_user_id: claims.sub,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test::TestRequest;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn status_of(err: Error) -> StatusCode {
        err.error_response().status()
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {}", token)
    }

    #[actix_web::test]
    async fn test_auth_user_with_valid_token() {
        let token = jwt::generate_token(42, "u@x.com", "customer", None).unwrap();
        let req = TestRequest::default()
            .insert_header(("Authorization", bearer(&token)))
            .to_http_request();

        let user = AuthUser::from_request(&req, &mut Payload::None)
            .await
            .unwrap();
        assert_eq!(user.user_id, 42);
        assert_eq!(user.role, "customer");
    }

    #[actix_web::test]
    async fn test_auth_user_without_header_is_401() {
        let req = TestRequest::default().to_http_request();
        let err = AuthUser::from_request(&req, &mut Payload::None)
            .await
            .unwrap_err();
        assert_eq!(status_of(err), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_customer_guard_rejects_driver_token() {
        let token = jwt::generate_token(7, "d@x.com", "driver", None).unwrap();
        let req = TestRequest::default()
            .insert_header(("Authorization", bearer(&token)))
            .to_http_request();

        let err = CustomerUser::from_request(&req, &mut Payload::None)
            .await
            .unwrap_err();
        assert_eq!(status_of(err), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_technician_guard_accepts_admin_override() {
        let token = jwt::generate_token(1, "a@x.com", "admin", None).unwrap();
        let req = TestRequest::default()
            .insert_header(("Authorization", bearer(&token)))
            .to_http_request();

        let user = TechnicianUser::from_request(&req, &mut Payload::None)
            .await
            .unwrap();
        assert_eq!(user.role, "admin");
    }

    #[actix_web::test]
    async fn test_admin_guard_token_path_rejects_customer() {
        let token = jwt::generate_token(9, "c@x.com", "customer", None).unwrap();
        let req = TestRequest::default()
            .insert_header(("Authorization", bearer(&token)))
            .to_http_request();

        let err = AdminUser::from_request(&req, &mut Payload::None)
            .await
            .unwrap_err();
        assert_eq!(status_of(err), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_admin_guard_without_any_identity_is_401() {
        let req = TestRequest::default().to_http_request();
        let err = AdminUser::from_request(&req, &mut Payload::None)
            .await
            .unwrap_err();
        assert_eq!(status_of(err), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_admin_guard_delegated_path_resolves_header() {
        let admin = users::Model {
            id: 11,
            email: "admin@x.com".to_string(),
            password_hash: Some("pbkdf2:sha256:1$aa$bb".to_string()),
            role: "admin".to_string(),
            is_active: true,
            is_deleted: false,
            activation_token: None,
            activation_token_expires_at: None,
            created_at: None,
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![admin]])
            .into_connection();

        let req = TestRequest::default()
            .app_data(web::Data::new(db))
            .insert_header((ADMIN_ID_HEADER, "11"))
            .to_http_request();

        let user = AdminUser::from_request(&req, &mut Payload::None)
            .await
            .unwrap();
        assert_eq!(user.user_id, 11);
        assert_eq!(user.email, "admin@x.com");
    }

    #[actix_web::test]
    async fn test_admin_guard_delegated_path_rejects_deleted_account() {
        let admin = users::Model {
            id: 12,
            email: "gone@x.com".to_string(),
            password_hash: None,
            role: "admin".to_string(),
            is_active: true,
            is_deleted: true,
            activation_token: None,
            activation_token_expires_at: None,
            created_at: None,
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![admin]])
            .into_connection();

        let req = TestRequest::default()
            .app_data(web::Data::new(db))
            .insert_header((ADMIN_ID_HEADER, "12"))
            .to_http_request();

        let err = AdminUser::from_request(&req, &mut Payload::None)
            .await
            .unwrap_err();
        assert_eq!(status_of(err), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_master_guard_attaches_master_identity() {
        // Le technicien 21 (compte user 20) agit au nom du compte maître 30
        let profile = technicians::Model {
            id: 21,
            user_id: 20,
            master_user_id: 30,
            is_verified: true,
            is_active: true,
            is_deleted: false,
        };
        let master = users::Model {
            id: 30,
            email: "master@x.com".to_string(),
            password_hash: Some("pbkdf2:sha256:1$aa$bb".to_string()),
            role: "admin".to_string(),
            is_active: true,
            is_deleted: false,
            activation_token: None,
            activation_token_expires_at: None,
            created_at: None,
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![profile]])
            .append_query_results([vec![master]])
            .into_connection();

        let token = jwt::generate_token(20, "tech@x.com", "technician", Some(21)).unwrap();
        let req = TestRequest::default()
            .app_data(web::Data::new(db))
            .insert_header(("Authorization", bearer(&token)))
            .to_http_request();

        let identity = MasterTechnician::from_request(&req, &mut Payload::None)
            .await
            .unwrap();

        // L'identité attachée est celle du maître, pas celle du technicien
        assert_eq!(identity.master_user_id, 30);
        assert_eq!(identity.master_email, "master@x.com");
        assert_eq!(identity.technician_id, 21);
        assert_eq!(identity.technician_user_id, 20);
    }

    #[actix_web::test]
    async fn test_master_guard_fails_closed_on_missing_profile() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<technicians::Model>::new()])
            .into_connection();

        let token = jwt::generate_token(20, "tech@x.com", "technician", None).unwrap();
        let req = TestRequest::default()
            .app_data(web::Data::new(db))
            .insert_header(("Authorization", bearer(&token)))
            .to_http_request();

        let err = MasterTechnician::from_request(&req, &mut Payload::None)
            .await
            .unwrap_err();
        assert_eq!(status_of(err), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_master_guard_rejects_inactive_master() {
        let profile = technicians::Model {
            id: 21,
            user_id: 20,
            master_user_id: 30,
            is_verified: true,
            is_active: true,
            is_deleted: false,
        };
        let master = users::Model {
            id: 30,
            email: "master@x.com".to_string(),
            password_hash: None,
            role: "admin".to_string(),
            is_active: false,
            is_deleted: false,
            activation_token: None,
            activation_token_expires_at: None,
            created_at: None,
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![profile]])
            .append_query_results([vec![master]])
            .into_connection();

        let token = jwt::generate_token(20, "tech@x.com", "technician", Some(21)).unwrap();
        let req = TestRequest::default()
            .app_data(web::Data::new(db))
            .insert_header(("Authorization", bearer(&token)))
            .to_http_request();

        let err = MasterTechnician::from_request(&req, &mut Payload::None)
            .await
            .unwrap_err();
        assert_eq!(status_of(err), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_master_guard_rejects_non_technician_token() {
        let token = jwt::generate_token(1, "a@x.com", "admin", None).unwrap();
        let req = TestRequest::default()
            .insert_header(("Authorization", bearer(&token)))
            .to_http_request();

        let err = MasterTechnician::from_request(&req, &mut Payload::None)
            .await
            .unwrap_err();
        assert_eq!(status_of(err), StatusCode::FORBIDDEN);
    }
}
