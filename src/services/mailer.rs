use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::env;
use std::sync::Arc;

/// Interface d'envoi d'emails (codes OTP, liens d'activation)
/// Les services reçoivent un `&dyn Mailer` pour rester testables sans SMTP
pub trait Mailer: Send + Sync {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), String>;
}

pub type SharedMailer = Arc<dyn Mailer>;

/// Implémentation SMTP (credentials lus depuis les variables d'environnement)
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: String,
}

impl SmtpMailer {
    /// Construit le transport depuis SMTP_HOST, SMTP_PORT, SMTP_USERNAME,
    /// SMTP_PASSWORD et SMTP_FROM
    pub fn from_env() -> Result<Self, String> {
        let host = env::var("SMTP_HOST").map_err(|_| "SMTP_HOST must be set".to_string())?;
        let port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse::<u16>()
            .map_err(|_| "Invalid SMTP_PORT".to_string())?;
        let username =
            env::var("SMTP_USERNAME").map_err(|_| "SMTP_USERNAME must be set".to_string())?;
        let password =
            env::var("SMTP_PASSWORD").map_err(|_| "SMTP_PASSWORD must be set".to_string())?;
        let from = env::var("SMTP_FROM").unwrap_or_else(|_| username.clone());

        let transport = SmtpTransport::starttls_relay(&host)
            .map_err(|e| format!("Failed to create SMTP transport: {}", e))?
            .credentials(Credentials::new(username, password))
            .port(port)
            .timeout(Some(std::time::Duration::from_secs(10)))
            .build();

        Ok(SmtpMailer { transport, from })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), String> {
        let email = Message::builder()
            .from(
                format!("FieldServe <{}>", self.from)
                    .parse()
                    .map_err(|e| format!("Invalid from address: {}", e))?,
            )
            .to(to
                .parse()
                .map_err(|e| format!("Invalid to address: {}", e))?)
            .subject(subject)
            .header(lettre::message::header::ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| format!("Failed to create email: {}", e))?;

        self.transport
            .send(&email)
            .map(|_| ())
            .map_err(|e| format!("Failed to send email: {}", e))
    }
}

/// Corps de l'email contenant le code OTP
pub fn otp_email_body(code: &str, ttl_minutes: i64) -> String {
    format!(
        "Hello,\n\n\
        A password reset was requested for your FieldServe account.\n\n\
        Your one-time code is:\n\n\
        {}\n\n\
        This code will expire in {} minutes. You have 5 attempts to enter it.\n\n\
        If you did not request this reset, please ignore this email.\n\n\
        Best regards,\n\
        The FieldServe Team",
        code, ttl_minutes
    )
}

/// Corps de l'email contenant le lien d'activation du compte
pub fn activation_email_body(link: &str) -> String {
    format!(
        "Welcome to FieldServe!\n\n\
        An account has been created for you. Click the link below to set \
        your password and activate it:\n\n\
        {}\n\n\
        This link will expire in 24 hours.\n\n\
        Best regards,\n\
        The FieldServe Team",
        link
    )
}
