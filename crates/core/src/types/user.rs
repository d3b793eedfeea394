//! User profile as returned by `GET /users/me`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::UserId;
use super::money::lenient_decimal;

/// Authenticated user's profile.
///
/// A cached copy is persisted next to the bearer token and may be stale
/// relative to the server until the next profile refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    /// Free-form role string (`user`, `admin`, `driver`, ...).
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub discount_rate: Option<Decimal>,
}

fn default_role() -> String {
    Role::Customer.as_str().to_string()
}

const fn default_active() -> bool {
    true
}

impl UserProfile {
    /// Parsed role of this user.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or(Role::Customer)
    }

    /// Whether this user may enter the admin back office.
    ///
    /// Any of the three backend flags grants it.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.is_admin || self.is_superuser || self.role() == Role::Admin
    }

    /// Name to greet the user with: username, else the email's local part.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self.username.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => self.email.split('@').next().unwrap_or(&self.email),
        }
    }
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Ordinary B2B customer account.
    Customer,
    /// Back-office administrator.
    Admin,
    /// Delivery driver with access to the driver dashboard.
    Driver,
}

impl Role {
    /// Wire representation of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "user",
            Self::Admin => "admin",
            Self::Driver => "driver",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" | "customer" => Ok(Self::Customer),
            "admin" => Ok(Self::Admin),
            "driver" => Ok(Self::Driver),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}
