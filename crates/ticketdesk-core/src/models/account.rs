use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Agent,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Customer => write!(f, "customer"),
            Role::Agent => write!(f, "agent"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "agent" => Ok(Role::Agent),
            other => Err(format!("unknown role '{}' (expected customer or agent)", other)),
        }
    }
}

/// Body of a registration request
#[derive(Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("Agent".parse::<Role>(), Ok(Role::Agent));
        assert_eq!(" customer ".parse::<Role>(), Ok(Role::Customer));
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_registration_body() {
        let registration = Registration {
            username: "casey".into(),
            email: "casey@example.com".into(),
            password: "hunter2".into(),
            role: Role::Agent,
        };
        let body = serde_json::to_value(&registration).unwrap();
        assert_eq!(body["role"], "agent");
        assert_eq!(body["password"], "hunter2");
        assert!(!format!("{:?}", registration).contains("hunter2"));
    }
}
