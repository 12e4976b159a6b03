use serde::{Deserialize, Serialize};

use merx_shared::models::order::Order;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Customer,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CUSTOMER" => Some(Role::Customer),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Caller identity, already authenticated upstream. The core trusts this.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub customer_id: String,
    pub role: Role,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins see every order; customers only their own.
    pub fn can_access_order(&self, order: &Order) -> bool {
        self.is_admin() || order.customer_id == self.customer_id
    }
}
