use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::account::{validate_identifier, AccountId};
use crate::error::TypeError;

/// Length of the renewal window granted by a subscription purchase.
pub const SUBSCRIPTION_PERIOD_DAYS: i64 = 30;

/// Store-issued identifier of the underlying platform transaction.
///
/// Restricted to `[A-Za-z0-9._:-]`. The id is the idempotency key and is
/// also sent to the platform verifier, so two distinct ids must never name
/// the same platform transaction.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(value: impl Into<String>) -> Result<Self, TypeError> {
        let value = value.into();
        validate_identifier(&value)?;
        if let Some(c) = value.chars().find(|c| !is_transaction_char(*c)) {
            return Err(TypeError::InvalidIdentifier(format!(
                "transaction id contains disallowed character {c:?}"
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_transaction_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '-')
}

impl TryFrom<String> for TransactionId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TransactionId> for String {
    fn from(id: TransactionId) -> Self {
        id.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", self.0)
    }
}

/// Whether a purchase grants a recurring or a one-time benefit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntitlementType {
    Subscription,
    Consumable,
}

impl EntitlementType {
    /// Expiry of an entitlement accepted at `accepted_at`.
    ///
    /// Subscriptions run for [`SUBSCRIPTION_PERIOD_DAYS`]; consumables never expire.
    pub fn expiry_from(&self, accepted_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Subscription => Some(accepted_at + Duration::days(SUBSCRIPTION_PERIOD_DAYS)),
            Self::Consumable => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subscription => "subscription",
            Self::Consumable => "consumable",
        }
    }
}

impl fmt::Display for EntitlementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntitlementType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subscription" => Ok(Self::Subscription),
            "consumable" => Ok(Self::Consumable),
            other => Err(TypeError::invalid(
                "entitlementType",
                format!("expected 'subscription' or 'consumable', got '{other}'"),
            )),
        }
    }
}

/// Store the purchase was made through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    Web,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
            Self::Web => "web",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ios" => Ok(Self::Ios),
            "android" => Ok(Self::Android),
            "web" => Ok(Self::Web),
            other => Err(TypeError::invalid("platform", format!("unknown platform '{other}'"))),
        }
    }
}

/// A purchase claim exactly as the client sent it.
///
/// Every field is optional so that shape problems surface as a typed
/// [`TypeError`] from [`PurchaseSubmission::parse`] rather than as a
/// deserializer failure.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseSubmission {
    pub account_id: Option<String>,
    pub product_id: Option<String>,
    pub transaction_id: Option<String>,
    pub purchase_date: Option<String>,
    pub entitlement_type: Option<String>,
    pub credit_amount: Option<serde_json::Value>,
    pub platform: Option<String>,
}

impl PurchaseSubmission {
    /// Check presence and shape of every field.
    ///
    /// A missing `purchaseDate` defaults to `received_at`.
    pub fn parse(self, received_at: DateTime<Utc>) -> Result<PurchaseAssertion, TypeError> {
        let account_id = AccountId::new(self.account_id.ok_or(TypeError::MissingField("accountId"))?)
            .map_err(|e| TypeError::invalid("accountId", e.to_string()))?;

        let product_id = self.product_id.ok_or(TypeError::MissingField("productId"))?;
        if product_id.trim().is_empty() {
            return Err(TypeError::invalid("productId", "must not be empty"));
        }

        let transaction_id =
            TransactionId::new(self.transaction_id.ok_or(TypeError::MissingField("transactionId"))?)
                .map_err(|e| TypeError::invalid("transactionId", e.to_string()))?;

        let entitlement_type: EntitlementType = self
            .entitlement_type
            .ok_or(TypeError::MissingField("entitlementType"))?
            .parse()?;

        let credit_amount = match self.credit_amount {
            None | Some(serde_json::Value::Null) => {
                return Err(TypeError::MissingField("creditAmount"))
            }
            Some(value) => value
                .as_u64()
                .ok_or_else(|| TypeError::invalid("creditAmount", "must be a non-negative integer"))?,
        };

        let platform: Platform = self
            .platform
            .ok_or(TypeError::MissingField("platform"))?
            .parse()?;

        let purchase_date = match self.purchase_date {
            None => received_at,
            Some(raw) => DateTime::parse_from_rfc3339(&raw)
                .map_err(|e| TypeError::invalid("purchaseDate", e.to_string()))?
                .with_timezone(&Utc),
        };

        Ok(PurchaseAssertion {
            account_id,
            product_id,
            transaction_id,
            purchase_date,
            entitlement_type,
            credit_amount,
            platform,
        })
    }
}

/// A structurally valid purchase claim. Not yet trusted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseAssertion {
    pub account_id: AccountId,
    pub product_id: String,
    pub transaction_id: TransactionId,
    pub purchase_date: DateTime<Utc>,
    pub entitlement_type: EntitlementType,
    pub credit_amount: u64,
    pub platform: Platform,
}

/// Outcome of accepting a purchase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantResult {
    pub accepted: bool,
    pub account_id: AccountId,
    pub transaction_id: TransactionId,
    pub entitlement_type: EntitlementType,
    pub credit_amount: u64,
    pub expiry: Option<DateTime<Utc>>,
    pub new_balance: u64,
    pub accepted_at: DateTime<Utc>,
}
