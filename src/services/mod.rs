pub mod mailer;
pub mod otp_service;
pub mod activation_service;
