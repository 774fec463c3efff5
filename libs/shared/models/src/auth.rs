use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// The closed set of account roles. Stored and serialized as the upper-case
/// name (`MEDICO`), parsed leniently so legacy spellings such as `Médico` or
/// `Recepcionista` still map onto a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Medico,
    Paciente,
    Secretaria,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Medico, Role::Paciente, Role::Secretaria];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Medico => "MEDICO",
            Role::Paciente => "PACIENTE",
            Role::Secretaria => "SECRETARIA",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Role::Admin => "Administrador do sistema",
            Role::Medico => "Médico",
            Role::Paciente => "Paciente",
            Role::Secretaria => "Secretária",
        }
    }

    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Paciente)
    }
}

/// Everyone working at the clinic.
pub const STAFF_ROLES: &[Role] = &[Role::Admin, Role::Medico, Role::Secretaria];
/// Roles allowed to write clinical data.
pub const CLINICAL_ROLES: &[Role] = &[Role::Admin, Role::Medico];
pub const ADMIN_ROLES: &[Role] = &[Role::Admin];

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                'á' | 'à' | 'â' | 'ã' | 'Á' | 'À' | 'Â' | 'Ã' => 'a',
                'é' | 'ê' | 'É' | 'Ê' => 'e',
                'í' | 'Í' => 'i',
                'ó' | 'ô' | 'õ' | 'Ó' | 'Ô' | 'Õ' => 'o',
                'ú' | 'Ú' => 'u',
                other => other.to_ascii_lowercase(),
            })
            .collect();

        match normalized.as_str() {
            "admin" | "administrador" => Ok(Role::Admin),
            "medico" | "doctor" => Ok(Role::Medico),
            "paciente" | "patient" => Ok(Role::Paciente),
            "secretaria" | "recepcionista" | "receptionist" => Ok(Role::Secretaria),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub iat: u64,
    pub exp: u64,
}

/// The caller resolved from a validated bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Staff see everything; patients only their own data.
    pub fn can_access_user_data(&self, user_id: Uuid) -> bool {
        self.role.is_staff() || self.id == user_id
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub valid: bool,
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}
