mod models;
mod routes;
mod db;
mod services;
mod utils;
mod middleware;

use actix_web::{App, HttpServer, web};
use std::sync::Arc;

use crate::services::mailer::{SharedMailer, SmtpMailer};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    println!("🔌 Connecting to database...");
    let db = db::establish_connection()
        .await
        .expect("Failed to connect to database");
    println!("✅ Database connected!");

    // Partagée entre workers via le handle Data (Arc), la connexion
    // elle-même n'est pas clonée
    let db_data = web::Data::new(db);

    let mailer: SharedMailer = Arc::new(
        SmtpMailer::from_env().expect("SMTP configuration missing or invalid in .env"),
    );

    println!("🚀 Starting server on http://127.0.0.1:8080");

    HttpServer::new(move || {
        App::new()
            .app_data(db_data.clone())
            .app_data(web::Data::new(mailer.clone()))
            .configure(routes::configure_routes)
    })
        .bind(("127.0.0.1", 8080))?
        .run()
        .await
}
