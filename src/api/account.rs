//! Model catalog and account balance records.

use serde::{Deserialize, Serialize};

/// Response of the model listing endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    #[serde(default)]
    pub object: Option<String>,

    #[serde(default)]
    pub data: Vec<Model>,
}

/// Catalog entry for one model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub id: String,

    #[serde(default)]
    pub object: Option<String>,

    #[serde(default)]
    pub owned_by: Option<String>,
}

/// Response of the balance endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    /// Whether the balance is sufficient for API calls
    pub is_available: bool,

    #[serde(default)]
    pub balance_infos: Vec<UserBalance>,
}

impl UserResponse {
    /// Balance in the given currency ("CNY" or "USD")
    pub fn balance(&self, currency: &str) -> Option<&UserBalance> {
        self.balance_infos
            .iter()
            .find(|b| b.currency.eq_ignore_ascii_case(currency))
    }
}

/// Balance snapshot for one currency. Amounts are decimal strings as sent by
/// the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBalance {
    pub currency: String,

    pub total_balance: String,

    #[serde(default)]
    pub granted_balance: String,

    #[serde(default)]
    pub topped_up_balance: String,
}
