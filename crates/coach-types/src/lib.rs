//! Foundation types for the coaching credit service.
//!
//! Every other crate in the workspace depends on `coach-types`. Nothing in
//! here performs I/O; the types describe accounts, purchases and the error
//! taxonomy shared by the ledger, the purchase gateway and the HTTP surface.
//!
//! # Key Types
//!
//! - [`AccountId`] / [`TransactionId`]: validated opaque identifiers
//! - [`Account`]: per-account balances split into [`CreditPool`]s
//! - [`PurchaseSubmission`]: loosely typed client claim, parsed into a [`PurchaseAssertion`]
//! - [`GrantResult`]: the outcome of accepting a purchase
//! - [`ErrorKind`]: the failure taxonomy every layer reports through
//! - [`Clock`]: injectable wall clock

pub mod account;
pub mod error;
pub mod kind;
pub mod purchase;
pub mod temporal;

pub use account::{Account, AccountId, CreditPool, Subscription, SubscriptionStatus};
pub use error::TypeError;
pub use kind::ErrorKind;
pub use purchase::{
    EntitlementType, GrantResult, Platform, PurchaseAssertion, PurchaseSubmission, TransactionId,
    SUBSCRIPTION_PERIOD_DAYS,
};
pub use temporal::{Clock, ManualClock, SharedClock, SystemClock};
