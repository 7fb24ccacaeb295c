use actix_web::{post, web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use validator::Validate;

use crate::services::mailer::SharedMailer;
use crate::services::otp_service::{OtpError, OtpService};
use crate::utils::password;

// DTO pour demander un code
#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpRequest {
    #[validate(email)]
    pub email_id: String,
}

// DTO pour vérifier un code
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    pub email_id: String,
    pub otp: String,
}

// DTO pour réinitialiser le mot de passe après vérification
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub email_id: String,
    pub password: String,
    pub confirm_password: String,
}

/// Traduit les échecs OTP en réponses HTTP.
/// Contrairement aux échecs de token (toujours "Invalid token"), les états
/// du cycle OTP sont volontairement différenciés côté client.
fn otp_error_response(err: OtpError) -> HttpResponse {
    match err {
        OtpError::UserNotFound => HttpResponse::NotFound().json(serde_json::json!({
            "error": "User not found"
        })),
        OtpError::AccountNotActive => HttpResponse::Forbidden().json(serde_json::json!({
            "error": "Account is not active"
        })),
        OtpError::AccountDeleted => HttpResponse::Forbidden().json(serde_json::json!({
            "error": "Account is deleted"
        })),
        OtpError::ProfileNotFound(role) => HttpResponse::NotFound().json(serde_json::json!({
            "error": format!("No {} profile found for this account", role)
        })),
        OtpError::ProfileNotVerified(role) => HttpResponse::Forbidden().json(serde_json::json!({
            "error": format!("This {} is not verified", role)
        })),
        OtpError::NoCode => HttpResponse::NotFound().json(serde_json::json!({
            "error": "No OTP requested for this email"
        })),
        OtpError::AlreadyUsed => HttpResponse::BadRequest().json(serde_json::json!({
            "error": "OTP already used. Please request a new one"
        })),
        OtpError::Expired => HttpResponse::BadRequest().json(serde_json::json!({
            "error": "OTP expired. Please request a new one"
        })),
        OtpError::InvalidCode => HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Invalid OTP"
        })),
        OtpError::LockedOut => HttpResponse::TooManyRequests().json(serde_json::json!({
            "error": "Too many attempts. Please request a new OTP"
        })),
        OtpError::PasswordMismatch => HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Passwords do not match"
        })),
        OtpError::PasswordTooShort => HttpResponse::BadRequest().json(serde_json::json!({
            "error": format!(
                "Password must be at least {} characters",
                password::MIN_PASSWORD_LENGTH
            )
        })),
        OtpError::NotVerified => HttpResponse::BadRequest().json(serde_json::json!({
            "error": "OTP not verified"
        })),
        OtpError::Db(e) => HttpResponse::InternalServerError().json(serde_json::json!({
            "error": format!("Database error: {}", e)
        })),
        OtpError::Mail(e) => HttpResponse::InternalServerError().json(serde_json::json!({
            "error": format!("Failed to send email: {}", e)
        })),
        OtpError::Hash(e) => HttpResponse::InternalServerError().json(serde_json::json!({
            "error": format!("Failed to hash password: {}", e)
        })),
    }
}

/// POST /otp/send-otp - Générer et envoyer un code de récupération (PUBLIC)
#[post("/send-otp")]
pub async fn send_otp(
    body: web::Json<SendOtpRequest>,
    db: web::Data<DatabaseConnection>,
    mailer: web::Data<SharedMailer>,
) -> HttpResponse {
    if let Err(errors) = body.validate() {
        return HttpResponse::BadRequest().json(errors);
    }

    match OtpService::request_code(db.get_ref(), mailer.get_ref().as_ref(), &body.email_id).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "OTP sent"
        })),
        Err(e) => otp_error_response(e),
    }
}

/// POST /otp/verify-otp - Vérifier le code reçu (PUBLIC)
#[post("/verify-otp")]
pub async fn verify_otp(
    body: web::Json<VerifyOtpRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    match OtpService::verify_code(db.get_ref(), &body.email_id, &body.otp).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "OTP verified"
        })),
        Err(e) => otp_error_response(e),
    }
}

/// POST /otp/update-password - Changer le mot de passe une fois le code
/// vérifié; consomme l'enregistrement OTP (PUBLIC)
#[post("/update-password")]
pub async fn update_password(
    body: web::Json<UpdatePasswordRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    match OtpService::reset_password(
        db.get_ref(),
        &body.email_id,
        &body.password,
        &body.confirm_password,
    )
    .await
    {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Password updated successfully"
        })),
        Err(e) => otp_error_response(e),
    }
}

pub fn otp_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/otp")
            .service(send_otp)
            .service(verify_otp)
            .service(update_password),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_error_statuses() {
        assert_eq!(
            otp_error_response(OtpError::UserNotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            otp_error_response(OtpError::AccountDeleted).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            otp_error_response(OtpError::InvalidCode).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            otp_error_response(OtpError::Expired).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            otp_error_response(OtpError::LockedOut).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            otp_error_response(OtpError::NoCode).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            otp_error_response(OtpError::NotVerified).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
