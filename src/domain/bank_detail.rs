use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seller payout destination. Full account numbers are only ever returned
/// to the admin API; `Debug` and the display helpers mask them.
#[derive(Clone, Serialize, Deserialize)]
pub struct BankDetail {
    pub seller_id: Uuid,
    pub account_holder_name: String,
    pub bank_name: String,
    pub account_number: String,
    pub routing_code: String,
    pub alias_id: Option<String>,
    pub payout_method: PayoutMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PayoutMethod {
    BankTransfer,
    AliasTransfer,
}

impl PayoutMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutMethod::BankTransfer => "bank_transfer",
            PayoutMethod::AliasTransfer => "alias_transfer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bank_transfer" => Some(PayoutMethod::BankTransfer),
            "alias_transfer" => Some(PayoutMethod::AliasTransfer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpsertBankDetail {
    pub seller_id: Uuid,
    pub account_holder_name: String,
    pub bank_name: String,
    pub account_number: String,
    pub routing_code: String,
    pub alias_id: Option<String>,
    pub payout_method: PayoutMethod,
}

impl BankDetail {
    /// Human-readable destination safe for logs and notifications.
    pub fn masked_destination(&self) -> String {
        match (self.payout_method, self.alias_id.as_deref()) {
            (PayoutMethod::AliasTransfer, Some(alias)) => format!("UPI {}", mask_alias(alias)),
            _ => format!(
                "Bank transfer to {} {}",
                self.bank_name,
                mask_account_number(&self.account_number)
            ),
        }
    }
}

impl std::fmt::Debug for BankDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BankDetail")
            .field("seller_id", &self.seller_id)
            .field("bank_name", &self.bank_name)
            .field("account_number", &mask_account_number(&self.account_number))
            .field("payout_method", &self.payout_method)
            .finish_non_exhaustive()
    }
}

pub fn mask_account_number(account_number: &str) -> String {
    let digits: Vec<char> = account_number.chars().filter(|c| !c.is_whitespace()).collect();
    let tail: String = digits.iter().skip(digits.len().saturating_sub(4)).collect();
    format!("••••{}", tail)
}

pub fn mask_alias(alias: &str) -> String {
    match alias.split_once('@') {
        Some((handle, provider)) => {
            let first: String = handle.chars().take(1).collect();
            format!("{}•••@{}", first, provider)
        }
        None => "•••".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(method: PayoutMethod, alias: Option<&str>) -> BankDetail {
        BankDetail {
            seller_id: Uuid::new_v4(),
            account_holder_name: "Asha Rao".to_string(),
            bank_name: "HDFC".to_string(),
            account_number: "001234567890".to_string(),
            routing_code: "HDFC0000123".to_string(),
            alias_id: alias.map(str::to_string),
            payout_method: method,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn debug_never_prints_full_account_number() {
        let rendered = format!("{:?}", detail(PayoutMethod::BankTransfer, None));
        assert!(!rendered.contains("001234567890"));
        assert!(rendered.contains("••••7890"));
    }

    #[test]
    fn masked_destination_per_method() {
        assert_eq!(
            detail(PayoutMethod::BankTransfer, None).masked_destination(),
            "Bank transfer to HDFC ••••7890"
        );
        assert_eq!(
            detail(PayoutMethod::AliasTransfer, Some("asha@okbank")).masked_destination(),
            "UPI a•••@okbank"
        );
        // alias transfer without an alias falls back to the bank account
        assert!(detail(PayoutMethod::AliasTransfer, None)
            .masked_destination()
            .starts_with("Bank transfer"));
    }

    #[test]
    fn short_account_numbers_are_still_masked() {
        assert_eq!(mask_account_number("12"), "••••12");
    }
}
