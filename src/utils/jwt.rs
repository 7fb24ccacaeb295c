use jsonwebtoken::{encode, decode, Header, Validation, EncodingKey, DecodingKey, Algorithm};
use serde::{Deserialize, Serialize};
use chrono::Utc;
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,        // user_id
    pub email: String,
    pub role: String,    // figé à l'émission, pas re-vérifié en base à chaque requête
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub technician_id: Option<i32>,
    pub exp: i64,        // expiration timestamp
}

/// Récupère la clé secrète JWT depuis les variables d'environnement
fn get_jwt_secret() -> String {
    env::var("JWT_SECRET").unwrap_or_else(|_| {
        eprintln!("⚠️  WARNING: JWT_SECRET not found in .env, using default (INSECURE)");
        "default-insecure-key-change-this".to_string()
    })
}

/// Durée de vie du token, chaîne de durée lue depuis JWT_EXPIRES_IN ("1d" par défaut)
fn get_token_ttl_seconds() -> Result<i64, String> {
    let raw = env::var("JWT_EXPIRES_IN").unwrap_or_else(|_| "1d".to_string());
    parse_duration(&raw)
}

/// Convertit une chaîne de durée ("90s", "15m", "12h", "1d" ou un nombre
/// de secondes) en secondes
pub fn parse_duration(raw: &str) -> Result<i64, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("Empty duration".to_string());
    }

    let (value, multiplier) = match raw.chars().last() {
        Some('s') => (&raw[..raw.len() - 1], 1),
        Some('m') => (&raw[..raw.len() - 1], 60),
        Some('h') => (&raw[..raw.len() - 1], 3600),
        Some('d') => (&raw[..raw.len() - 1], 86400),
        _ => (raw, 1),
    };

    let value = value
        .parse::<i64>()
        .map_err(|_| format!("Invalid duration: {}", raw))?;

    if value <= 0 {
        return Err(format!("Duration must be positive: {}", raw));
    }

    Ok(value * multiplier)
}

/// Génère un JWT token pour un compte authentifié
/// technician_id n'est présent que pour les comptes techniciens
pub fn generate_token(
    user_id: i32,
    email: &str,
    role: &str,
    technician_id: Option<i32>,
) -> Result<String, String> {
    let ttl = get_token_ttl_seconds()?;
    let expiration = Utc::now().timestamp() + ttl;

    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        role: role.to_string(),
        technician_id,
        exp: expiration,
    };

    let secret = get_jwt_secret();

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
        .map_err(|e| format!("Failed to generate token: {}", e))
}

/// Vérifie et décode un JWT token
/// Signature invalide, token malformé et token expiré renvoient tous la
/// même erreur générique: le client ne doit pas pouvoir les distinguer
pub fn verify_token(token: &str) -> Result<Claims, String> {
    let secret = get_jwt_secret();

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    )
        .map(|data| data.claims)
        .map_err(|_| "Invalid token".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_and_verify_token() {
        let token = generate_token(123, "tech@example.com", "technician", Some(7)).unwrap();
        let claims = verify_token(&token).unwrap();

        assert_eq!(claims.sub, 123);
        assert_eq!(claims.email, "tech@example.com");
        assert_eq!(claims.role, "technician");
        assert_eq!(claims.technician_id, Some(7));
    }

    #[test]
    fn test_token_without_technician_id() {
        let token = generate_token(5, "client@example.com", "customer", None).unwrap();
        let claims = verify_token(&token).unwrap();

        assert_eq!(claims.technician_id, None);
    }

    #[test]
    fn test_invalid_token() {
        let result = verify_token("invalid.token.here");
        assert_eq!(result.unwrap_err(), "Invalid token");
    }

    #[test]
    fn test_expired_token() {
        // Token forgé à la main avec une expiration largement dépassée
        // (au-delà du leeway par défaut de jsonwebtoken)
        let claims = Claims {
            sub: 1,
            email: "old@example.com".to_string(),
            role: "customer".to_string(),
            technician_id: None,
            exp: Utc::now().timestamp() - 7200,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(get_jwt_secret().as_ref()),
        )
        .unwrap();

        // Même message que pour une signature invalide
        assert_eq!(verify_token(&token).unwrap_err(), "Invalid token");
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("90s").unwrap(), 90);
        assert_eq!(parse_duration("15m").unwrap(), 900);
        assert_eq!(parse_duration("12h").unwrap(), 43200);
        assert_eq!(parse_duration("1d").unwrap(), 86400);
        assert_eq!(parse_duration("3600").unwrap(), 3600);
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("-5m").is_err());
    }
}
