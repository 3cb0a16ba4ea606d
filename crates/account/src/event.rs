use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cardbank_core::AccountId;
use cardbank_events::Event;

/// What happened to an account.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    AccountReplenished,
    MoneySpent,
    CreditStarted,
    // TODO: emit MoneyLimitReached once spends are checked against the
    // credit limit; the kind is reserved but nothing triggers it yet.
    MoneyLimitReached,
    PinChanged,
}

/// Immutable record of one account state change.
///
/// `amount` is meaningful for `AccountReplenished`/`MoneySpent` and zero for
/// the other kinds. Constructed fresh on every publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountEvent {
    pub account_id: AccountId,
    pub kind: EventKind,
    pub amount: i64,
    pub occurred_at: DateTime<Utc>,
}

impl AccountEvent {
    fn new(account_id: AccountId, kind: EventKind, amount: i64) -> Self {
        Self {
            account_id,
            kind,
            amount,
            occurred_at: Utc::now(),
        }
    }

    pub fn replenished(account_id: AccountId, amount: i64) -> Self {
        Self::new(account_id, EventKind::AccountReplenished, amount)
    }

    pub fn spent(account_id: AccountId, amount: i64) -> Self {
        Self::new(account_id, EventKind::MoneySpent, amount)
    }

    pub fn credit_started(account_id: AccountId) -> Self {
        Self::new(account_id, EventKind::CreditStarted, 0)
    }

    pub fn pin_changed(account_id: AccountId) -> Self {
        Self::new(account_id, EventKind::PinChanged, 0)
    }
}

impl Event for AccountEvent {
    type Kind = EventKind;

    fn kind(&self) -> EventKind {
        self.kind
    }

    fn event_type(&self) -> &'static str {
        match self.kind {
            EventKind::AccountReplenished => "account.replenished",
            EventKind::MoneySpent => "account.money_spent",
            EventKind::CreditStarted => "account.credit_started",
            EventKind::MoneyLimitReached => "account.money_limit_reached",
            EventKind::PinChanged => "account.pin_changed",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
