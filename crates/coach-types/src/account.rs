use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::purchase::Platform;

/// Longest identifier accepted for accounts and transactions.
pub(crate) const MAX_IDENTIFIER_LEN: usize = 256;

pub(crate) fn validate_identifier(value: &str) -> Result<(), TypeError> {
    if value.trim().is_empty() {
        return Err(TypeError::InvalidIdentifier("identifier must not be empty".into()));
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(TypeError::InvalidIdentifier(format!(
            "identifier longer than {MAX_IDENTIFIER_LEN} bytes"
        )));
    }
    if value.chars().any(|c| c.is_control() || c == '/') {
        return Err(TypeError::InvalidIdentifier(
            "identifier contains a control character or '/'".into(),
        ));
    }
    Ok(())
}

/// Opaque account identifier.
///
/// Identifiers are issued by the external auth provider; the only rules
/// enforced here are the ones the document store needs (non-empty, bounded,
/// no path separators).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    pub fn new(value: impl Into<String>) -> Result<Self, TypeError> {
        let value = value.into();
        validate_identifier(&value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AccountId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

impl FromStr for AccountId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.0)
    }
}

/// One of the two independent balances held per account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreditPool {
    /// Promotional credits granted by the service.
    Free,
    /// Credits bought through a store purchase.
    Paid,
}

impl CreditPool {
    pub const ALL: [CreditPool; 2] = [CreditPool::Free, CreditPool::Paid];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Paid => "paid",
        }
    }
}

impl fmt::Display for CreditPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CreditPool {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Self::Free),
            "paid" => Ok(Self::Paid),
            other => Err(TypeError::invalid("pool", format!("unknown credit pool '{other}'"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Expired,
}

/// Subscription entitlement recorded when a subscription purchase is accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub product_id: String,
    pub platform: Platform,
    pub status: SubscriptionStatus,
    pub expires_at: DateTime<Utc>,
}

impl Subscription {
    /// Active and not yet past its expiry at `now`.
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active && now < self.expires_at
    }
}

/// Persisted per-account credit state.
///
/// Absent balance fields deserialize as zero; every write persists both
/// fields explicitly.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(default)]
    pub free_credits: u64,
    #[serde(default)]
    pub paid_credits: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<Subscription>,
}

impl Account {
    /// A fresh account holding only promotional credits.
    pub fn with_free_credits(free_credits: u64) -> Self {
        Self {
            free_credits,
            ..Self::default()
        }
    }

    pub fn balance(&self, pool: CreditPool) -> u64 {
        match pool {
            CreditPool::Free => self.free_credits,
            CreditPool::Paid => self.paid_credits,
        }
    }

    pub fn set_balance(&mut self, pool: CreditPool, value: u64) {
        match pool {
            CreditPool::Free => self.free_credits = value,
            CreditPool::Paid => self.paid_credits = value,
        }
    }

    /// Combined balance across both pools.
    pub fn total(&self) -> u64 {
        self.free_credits.saturating_add(self.paid_credits)
    }

    pub fn is_premium(&self, now: DateTime<Utc>) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(|sub| sub.is_current(now))
    }
}
