use actix_web::{get, post, put, web, HttpResponse};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::middleware::{AdminUser, AuthUser};
use crate::models::users::{self, Entity as Users, Column as UserColumn, ActiveModel as UserActiveModel};
use crate::models::{drivers, technicians};
use crate::services::activation_service::{ActivationError, ActivationService};
use crate::services::mailer::SharedMailer;
use crate::utils::{jwt, password};

// DTO pour la connexion
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

// DTO pour la création de compte (guard admin)
#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    pub role: Option<String>,
}

// DTO pour l'activation du compte
#[derive(Deserialize)]
pub struct SetupPasswordRequest {
    pub token: String,
    pub password: String,
}

// DTO pour changer son mot de passe
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_approved: Option<bool>,
}

// Réponse après login
#[derive(Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

/// POST /auth/login - Se connecter (PUBLIC)
#[post("/login")]
pub async fn login(
    body: web::Json<LoginRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    // 1. Trouver le compte
    let user = Users::find()
        .filter(UserColumn::Email.eq(&body.email))
        .one(db.get_ref())
        .await;

    let user = match user {
        Ok(Some(user)) => user,
        Ok(None) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Invalid email or password"
            }));
        }
        Err(e) => {
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("Database error: {}", e)
            }));
        }
    };

    // 2. Refuser les comptes supprimés ou inactifs, quel que soit le
    // mot de passe
    if user.is_deleted {
        return HttpResponse::Forbidden().json(serde_json::json!({
            "error": "Account is deleted"
        }));
    }
    if !user.is_active {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Account is not active"
        }));
    }

    // 3. Un compte sans mot de passe n'a pas fini son activation
    let password_hash = match user.password_hash {
        Some(ref hash) => hash,
        None => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Account not activated. Please set up your password first."
            }));
        }
    };

    // 4. Vérifier le mot de passe
    let is_valid = match password::verify_password(&body.password, password_hash) {
        Ok(valid) => valid,
        Err(e) => {
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("Password verification error: {}", e)
            }));
        }
    };

    if !is_valid {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Invalid email or password"
        }));
    }

    // 5. Contrôles propres au rôle
    let mut driver_id = None;
    let mut is_approved = None;
    let mut technician_id = None;

    match user.role.as_str() {
        users::ROLE_DRIVER => {
            let profile = match drivers::Entity::find()
                .filter(drivers::Column::UserId.eq(user.id))
                .one(db.get_ref())
                .await
            {
                Ok(Some(profile)) => profile,
                Ok(None) => {
                    return HttpResponse::NotFound().json(serde_json::json!({
                        "error": "Driver profile not found"
                    }));
                }
                Err(e) => {
                    return HttpResponse::InternalServerError().json(serde_json::json!({
                        "error": format!("Database error: {}", e)
                    }));
                }
            };

            if !profile.is_verified {
                return HttpResponse::Forbidden().json(serde_json::json!({
                    "error": "Driver is not verified"
                }));
            }

            driver_id = Some(profile.id);
            is_approved = Some(profile.is_verified);
        }
        users::ROLE_TECHNICIAN => {
            // Le profil est embarqué dans les claims s'il existe
            match technicians::Entity::find()
                .filter(technicians::Column::UserId.eq(user.id))
                .one(db.get_ref())
                .await
            {
                Ok(profile) => technician_id = profile.map(|p| p.id),
                Err(e) => {
                    return HttpResponse::InternalServerError().json(serde_json::json!({
                        "error": format!("Database error: {}", e)
                    }));
                }
            }
        }
        _ => {}
    }

    // 6. Générer le JWT
    let token = match jwt::generate_token(user.id, &user.email, &user.role, technician_id) {
        Ok(token) => token,
        Err(e) => {
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("Failed to generate token: {}", e)
            }));
        }
    };

    HttpResponse::Ok().json(AuthResponse {
        user: UserResponse {
            id: user.id,
            email: user.email,
            role: user.role,
            driver_id,
            is_approved,
        },
        token,
    })
}

/// POST /auth/register - Créer un compte inactif et envoyer le lien
/// d'activation (GUARD ADMIN, double chemin header/token)
#[post("/register")]
pub async fn register(
    _admin: AdminUser,
    body: web::Json<RegisterRequest>,
    db: web::Data<DatabaseConnection>,
    mailer: web::Data<SharedMailer>,
) -> HttpResponse {
    if let Err(errors) = body.validate() {
        return HttpResponse::BadRequest().json(errors);
    }

    // 1. Le rôle doit être explicite et connu: pas de rôle par défaut
    let role = match body.role.as_deref() {
        Some(role) if users::is_known_role(role) => role.to_string(),
        Some(role) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": format!("Unknown role: {}", role)
            }));
        }
        None => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Role is required"
            }));
        }
    };

    // 2. Vérifier si l'email existe déjà
    let existing_user = Users::find()
        .filter(UserColumn::Email.eq(&body.email))
        .one(db.get_ref())
        .await;

    match existing_user {
        Ok(Some(_)) => {
            return HttpResponse::Conflict().json(serde_json::json!({
                "error": "Email already exists"
            }));
        }
        Err(e) => {
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("Database error: {}", e)
            }));
        }
        _ => {}
    }

    // 3. Créer le compte inactif, sans mot de passe: il sera posé par
    // setup-password
    let new_user = UserActiveModel {
        email: Set(body.email.clone()),
        password_hash: Set(None),
        role: Set(role),
        is_active: Set(false),
        is_deleted: Set(false),
        created_at: Set(Some(chrono::Utc::now().naive_utc())),
        ..Default::default()
    };

    let user = match new_user.insert(db.get_ref()).await {
        Ok(user) => user,
        Err(e) => {
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("Failed to create user: {}", e)
            }));
        }
    };

    let user_id = user.id;
    let email = user.email.clone();
    let role = user.role.clone();

    // 4. Poser le token d'activation et envoyer le lien
    if let Err(e) = ActivationService::issue_activation(db.get_ref(), mailer.get_ref().as_ref(), user).await
    {
        return HttpResponse::InternalServerError().json(serde_json::json!({
            "error": format!("Failed to issue activation: {:?}", e)
        }));
    }

    HttpResponse::Created().json(serde_json::json!({
        "id": user_id,
        "email": email,
        "role": role,
        "message": "Activation email sent"
    }))
}

/// PUT /auth/setup-password - Activer son compte avec le token reçu par
/// email (PUBLIC)
#[put("/setup-password")]
pub async fn setup_password(
    body: web::Json<SetupPasswordRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    match ActivationService::setup_password(db.get_ref(), &body.token, &body.password).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Password set, account activated"
        })),
        Err(ActivationError::PasswordTooShort) => {
            HttpResponse::BadRequest().json(serde_json::json!({
                "error": format!(
                    "Password must be at least {} characters",
                    password::MIN_PASSWORD_LENGTH
                )
            }))
        }
        Err(ActivationError::InvalidOrExpired) => {
            HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Invalid or expired token"
            }))
        }
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({
            "error": format!("Failed to set password: {:?}", e)
        })),
    }
}

/// PUT /auth/change-password - Changer son mot de passe (GUARD GÉNÉRAL:
/// l'identité qui agit compte, pas son rôle)
#[put("/change-password")]
pub async fn change_password(
    auth_user: AuthUser,
    body: web::Json<ChangePasswordRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    // 1. Récupérer le compte
    let user = match Users::find_by_id(auth_user.user_id).one(db.get_ref()).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return HttpResponse::NotFound().json(serde_json::json!({
                "error": "User not found"
            }));
        }
        Err(e) => {
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("Database error: {}", e)
            }));
        }
    };

    if user.is_deleted || !user.is_active {
        return HttpResponse::Forbidden().json(serde_json::json!({
            "error": "Account is not active"
        }));
    }

    // 2. Vérifier l'ancien mot de passe
    let current_password_hash = match user.password_hash {
        Some(ref hash) => hash,
        None => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Account has no password yet"
            }));
        }
    };

    let is_valid = match password::verify_password(&body.current_password, current_password_hash) {
        Ok(valid) => valid,
        Err(e) => {
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("Password verification error: {}", e)
            }));
        }
    };

    if !is_valid {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Current password is incorrect"
        }));
    }

    // 3. Refuser la réutilisation et les mots de passe trop courts
    if body.new_password == body.current_password {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "New password must be different from the current one"
        }));
    }
    if body.new_password.len() < password::MIN_PASSWORD_LENGTH {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": format!(
                "Password must be at least {} characters",
                password::MIN_PASSWORD_LENGTH
            )
        }));
    }

    // 4. Hasher et mettre à jour
    let new_password_hash = match password::hash_password(&body.new_password) {
        Ok(hash) => hash,
        Err(e) => {
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("Failed to hash password: {}", e)
            }));
        }
    };

    let mut active_model: UserActiveModel = user.into();
    active_model.password_hash = Set(Some(new_password_hash));

    match active_model.update(db.get_ref()).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Password changed successfully"
        })),
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({
            "error": format!("Failed to update password: {}", e)
        })),
    }
}

/// GET /auth/me - Vérifier le token (PROTÉGÉE)
#[get("/me")]
pub async fn me(auth_user: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(auth_user)
}

pub fn auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(login)
            .service(register)
            .service(setup_password)
            .service(change_password)
            .service(me),
    );
}
