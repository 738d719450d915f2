//! User records and request/response bodies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Phone number attached to a user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Phone {
    #[serde(alias = "phoneNumber")]
    pub number: String,
    #[serde(alias = "citycode")]
    pub city_code: String,
    #[serde(alias = "contrycode")]
    pub country_code: String,
}

/// Stored user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string
    pub password_hash: String,
    pub phones: Vec<Phone>,
    /// Last token issued to this user
    pub token: String,
    pub is_active: bool,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

/// Registration request body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    #[serde(alias = "fullName")]
    pub name: String,
    #[serde(alias = "userEmail")]
    pub email: String,
    #[serde(alias = "userPassword")]
    pub password: String,
    pub phones: Vec<Phone>,
}

impl RegisterRequest {
    /// Check required fields. The password itself is judged by the policy.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is required".to_string());
        }
        if self.email.trim().is_empty() {
            return Err("email is required".to_string());
        }
        if !is_valid_email(self.email.trim()) {
            return Err("email must be a valid address".to_string());
        }
        if self.password.is_empty() {
            return Err("password is required".to_string());
        }
        if self.phones.is_empty() {
            return Err("at least one phone is required".to_string());
        }
        for phone in &self.phones {
            if phone.number.trim().is_empty()
                || phone.city_code.trim().is_empty()
                || phone.country_code.trim().is_empty()
            {
                return Err("phone number, city code and country code are required".to_string());
            }
        }
        Ok(())
    }
}

/// Login request body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err("email and password are required".to_string());
        }
        Ok(())
    }
}

/// User as returned by registration and login
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phones: Vec<Phone>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
    pub token: String,
    pub is_active: bool,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            phones: user.phones.clone(),
            created: user.created,
            modified: user.modified,
            last_login: user.last_login,
            token: user.token.clone(),
            is_active: user.is_active,
        }
    }
}

/// Normalized form used for lookups and uniqueness.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegisterRequest {
        RegisterRequest {
            name: "Juan Rodriguez".into(),
            email: "juan@rodriguez.org".into(),
            password: "Password1#".into(),
            phones: vec![Phone {
                number: "1234567".into(),
                city_code: "1".into(),
                country_code: "57".into(),
            }],
        }
    }

    #[test]
    fn test_valid_request() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_required_fields() {
        let mut missing_name = request();
        missing_name.name = "  ".into();
        assert!(missing_name.validate().is_err());

        let mut no_phones = request();
        no_phones.phones.clear();
        assert!(no_phones.validate().is_err());

        let mut blank_city = request();
        blank_city.phones[0].city_code.clear();
        assert!(blank_city.validate().is_err());
    }

    #[test]
    fn test_email_syntax() {
        for good in ["a@b.co", "first.last@example.org"] {
            assert!(is_valid_email(good), "{}", good);
        }
        for bad in ["", "plain", "@example.org", "a@b", "a@.org", "a@b.", "a b@c.org", "a@b@c.org"] {
            assert!(!is_valid_email(bad), "{}", bad);
        }
    }

    #[test]
    fn test_legacy_field_names_are_accepted() {
        let json = serde_json::json!({
            "fullName": "Juan Rodriguez",
            "userEmail": "juan@rodriguez.org",
            "userPassword": "Password1#",
            "phones": [{ "phoneNumber": "1234567", "citycode": "1", "contrycode": "57" }]
        });
        let parsed: RegisterRequest = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.email, "juan@rodriguez.org");
        assert_eq!(parsed.phones[0].country_code, "57");
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_view_uses_camel_case() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: "Juan".into(),
            email: "juan@rodriguez.org".into(),
            password_hash: "$argon2id$...".into(),
            phones: vec![],
            token: "t".into(),
            is_active: true,
            created: now,
            modified: now,
            last_login: now,
        };
        let json = serde_json::to_value(UserView::from(&user)).unwrap();
        assert_eq!(json["isActive"], true);
        assert!(json.get("lastLogin").is_some());
        assert!(json.get("passwordHash").is_none());
    }
}
