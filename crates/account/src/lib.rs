//! `cardbank-account` — the card account entity.
//!
//! An [`Account`] owns its balance/pin state behind a mutex and publishes an
//! [`AccountEvent`] through its observer registry after every successful
//! mutating operation. Observers subscribe per event kind (or to all kinds)
//! and are notified synchronously, outside the account lock.

pub mod account;
pub mod card;
pub mod error;
pub mod event;

pub use account::Account;
pub use card::{CardExpiry, CardNumber, Pin};
pub use error::AccountError;
pub use event::{AccountEvent, EventKind};
