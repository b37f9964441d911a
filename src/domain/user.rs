use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;
use super::order::ShippingDetails;

/// Role attribute consulted by the dashboards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Role {
    #[default]
    Client,
    Seller,
    Staff,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Seller => "vendeur",
            Self::Staff => "staff",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Self::Client),
            "vendeur" => Ok(Self::Seller),
            "staff" => Ok(Self::Staff),
            other => Err(DomainError::InvalidInput(format!("unknown role '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub phone: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub company_name: String,
    pub newsletter: bool,
}

impl Profile {
    /// Postal address as a single line, e.g. `"12 rue X, 75001 Paris, France"`.
    /// Blank parts are left out; a profile without any gives an empty string.
    pub fn shipping_address(&self) -> String {
        let locality = [self.postal_code.trim(), self.city.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        [self.address.trim(), locality.as_str(), self.country.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn shipping_details(&self) -> ShippingDetails {
        ShippingDetails {
            address: self.shipping_address(),
            phone: self.phone.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub role: Role,
    pub profile: Profile,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.username.trim().is_empty() {
            return Err(DomainError::InvalidInput("username is required".to_string()));
        }
        if !self.email.contains('@') {
            return Err(DomainError::InvalidInput(format!(
                "'{}' is not a valid email",
                self.email
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub profile: Profile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipping_address_joins_non_blank_parts() {
        let profile = Profile {
            address: "12 rue des Jardins".to_string(),
            city: "Abidjan".to_string(),
            country: "CI".to_string(),
            ..Profile::default()
        };

        assert_eq!(profile.shipping_address(), "12 rue des Jardins, Abidjan, CI");
    }

    #[test]
    fn missing_profile_fields_give_empty_snapshot() {
        let details = Profile::default().shipping_details();

        assert_eq!(details, ShippingDetails::default());
    }

    #[test]
    fn role_uses_storage_labels() {
        assert_eq!(Role::Seller.as_str(), "vendeur");
        assert_eq!("staff".parse::<Role>().expect("parse"), Role::Staff);
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn new_user_requires_username_and_email() {
        let mut user = NewUser {
            username: "client1".to_string(),
            email: "c1@example.com".to_string(),
            role: Role::Client,
            profile: Profile::default(),
        };
        assert!(user.validate().is_ok());

        user.email = "nope".to_string();
        assert!(matches!(user.validate(), Err(DomainError::InvalidInput(_))));

        user.email = "c1@example.com".to_string();
        user.username = "  ".to_string();
        assert!(matches!(user.validate(), Err(DomainError::InvalidInput(_))));
    }
}
