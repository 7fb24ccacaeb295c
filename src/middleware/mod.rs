pub mod auth;

pub use auth::{AdminUser, AuthUser, CustomerUser, DriverUser, MasterTechnician, TechnicianUser};
