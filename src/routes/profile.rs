use actix_web::{get, web, HttpResponse};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::middleware::{CustomerUser, DriverUser, MasterTechnician, TechnicianUser};
use crate::models::drivers;

/// GET /customer/me - Identité du client connecté (GUARD CUSTOMER)
#[get("/customer/me")]
pub async fn customer_me(customer: CustomerUser) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "userId": customer.user_id,
        "email": customer.email,
        "role": "customer"
    }))
}

/// GET /driver/me - Identité du chauffeur + état de vérification de son
/// profil (GUARD DRIVER)
#[get("/driver/me")]
pub async fn driver_me(driver: DriverUser, db: web::Data<DatabaseConnection>) -> HttpResponse {
    let profile = match drivers::Entity::find()
        .filter(drivers::Column::UserId.eq(driver.user_id))
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

    HttpResponse::Ok().json(serde_json::json!({
        "userId": driver.user_id,
        "email": driver.email,
        "role": "driver",
        "driverId": profile.id,
        "isApproved": profile.is_verified
    }))
}

/// GET /technician/me - Identité du technicien (ou d'un admin en accès
/// élevé) (GUARD TECHNICIAN)
#[get("/technician/me")]
pub async fn technician_me(technician: TechnicianUser) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "userId": technician.user_id,
        "email": technician.email,
        "role": technician.role,
        "technicianId": technician.technician_id
    }))
}

/// GET /technician/account - Le compte MAÎTRE au nom duquel le technicien
/// agit (GUARD TECHNICIEN-MAÎTRE)
#[get("/technician/account")]
pub async fn technician_account(identity: MasterTechnician) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "userId": identity.master_user_id,
        "email": identity.master_email,
        "technicianId": identity.technician_id
    }))
}

pub fn profile_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(customer_me)
        .service(driver_me)
        .service(technician_me)
        .service(technician_account);
}
