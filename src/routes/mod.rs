pub mod health;
pub mod auth;
pub mod otp;
pub mod profile;

use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(health::health_check)
            .configure(auth::auth_routes)
            .configure(otp::otp_routes)
            .configure(profile::profile_routes),
    );
}
