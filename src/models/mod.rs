// ============================================================================
// MODELS - MODULE PRINCIPAL
// ============================================================================
//
// Description:
//   Point d'entrée pour tous les modèles de données.
//   Chaque modèle correspond à une table PostgreSQL avec SeaORM.
//
// Liste des modules:
//   - health : Health check API
//   - users : Comptes (admin, technicien, client, chauffeur)
//   - technicians : Profils techniciens (vérification + compte maître)
//   - drivers : Profils chauffeurs (vérification)
//   - otp_codes : Codes OTP de récupération de mot de passe (expire 5 min)
//
// Points d'attention:
//   - Tous les modèles utilisent SeaORM (pas de SQL brut)
//   - Les relations entre tables sont définies dans chaque modèle
//
// ============================================================================

pub mod health;
pub mod users;
pub mod technicians;
pub mod drivers;
pub mod otp_codes;
