//! The account entity: mutex-guarded state + event publication.

use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use cardbank_core::{AccountId, DomainError, Entity};
use cardbank_events::{DispatchSnapshot, ObserverRegistry, SubscriptionToken};

use crate::card::{CardExpiry, CardNumber, Pin};
use crate::error::AccountError;
use crate::event::{AccountEvent, EventKind};

/// Mutable state, guarded as one unit so check-then-mutate is atomic.
#[derive(Debug)]
struct AccountState {
    balance: i64,
    pin: Pin,
}

/// A card account mutated concurrently through its operations.
///
/// Every successful mutating operation publishes exactly one [`AccountEvent`]
/// of the matching kind. The locking discipline is:
///
/// 1. validate input (outside any lock)
/// 2. lock state, mutate, build the event
/// 3. snapshot the observer registry (its own lock, nested inside the state
///    lock, never the reverse)
/// 4. release the state lock
/// 5. deliver to the snapshot, in registration order
///
/// Delivery runs outside the state lock so an observer that re-enters this
/// account cannot deadlock. The trade-off: an observer may run concurrently
/// with the next mutation on the same account. Balance and pin integrity are
/// unaffected; only notification timing interleaves.
pub struct Account {
    id: AccountId,
    card_number: CardNumber,
    holder: String,
    expiry: CardExpiry,
    credit_limit: i64,
    state: Mutex<AccountState>,
    registry: ObserverRegistry<AccountEvent>,
}

impl Account {
    /// Open an account with a zero balance.
    ///
    /// Fails with a validation error if the card number is empty, the pin is
    /// not a 4-digit number, or the credit limit is negative.
    pub fn open(
        card_number: impl Into<String>,
        holder: impl Into<String>,
        expiry: CardExpiry,
        pin: u16,
        credit_limit: i64,
    ) -> Result<Self, AccountError> {
        let card_number = CardNumber::new(card_number)?;
        let pin = Pin::new(pin)?;
        if credit_limit < 0 {
            return Err(DomainError::validation(format!(
                "credit limit must be >= 0, got {credit_limit}"
            ))
            .into());
        }

        Ok(Self {
            id: AccountId::new(),
            card_number,
            holder: holder.into(),
            expiry,
            credit_limit,
            state: Mutex::new(AccountState { balance: 0, pin }),
            registry: ObserverRegistry::new(),
        })
    }

    pub fn card_number(&self) -> &CardNumber {
        &self.card_number
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    pub fn expiry(&self) -> CardExpiry {
        self.expiry
    }

    pub fn credit_limit(&self) -> i64 {
        self.credit_limit
    }

    /// Current balance. Never negative.
    pub fn balance(&self) -> i64 {
        self.lock_state().balance
    }

    /// Current pin.
    pub fn pin(&self) -> Pin {
        self.lock_state().pin
    }

    /// Increase the balance by `amount` (> 0) and publish
    /// [`EventKind::AccountReplenished`]. Returns the new balance.
    pub fn replenish(&self, amount: i64) -> Result<i64, AccountError> {
        ensure_positive("replenish", amount)?;

        let (balance, event, snapshot) = {
            let mut state = self.lock_state();
            let balance = state
                .balance
                .checked_add(amount)
                .ok_or_else(|| DomainError::invariant("balance overflow"))?;
            state.balance = balance;
            let event = AccountEvent::replenished(self.id, amount);
            let snapshot = self.registry.snapshot(event.kind);
            (balance, event, snapshot)
        };

        debug!(account = %self.id, amount, balance, "account replenished");
        self.deliver(&event, snapshot);
        Ok(balance)
    }

    /// Decrease the balance by `amount` (> 0) and publish
    /// [`EventKind::MoneySpent`]. Returns the new balance.
    ///
    /// Fails with [`AccountError::InsufficientFunds`] if the spend would make
    /// the balance negative: no mutation, no event.
    pub fn spend(&self, amount: i64) -> Result<i64, AccountError> {
        ensure_positive("spend", amount)?;

        let (balance, event, snapshot) = {
            let mut state = self.lock_state();
            if state.balance - amount < 0 {
                return Err(AccountError::InsufficientFunds {
                    balance: state.balance,
                    requested: amount,
                });
            }
            state.balance -= amount;
            let event = AccountEvent::spent(self.id, amount);
            let snapshot = self.registry.snapshot(event.kind);
            (state.balance, event, snapshot)
        };

        debug!(account = %self.id, amount, balance, "money spent");
        self.deliver(&event, snapshot);
        Ok(balance)
    }

    /// Publish [`EventKind::CreditStarted`] with no state mutation.
    ///
    /// Hook for future credit-line logic; still goes through the state lock
    /// so its event takes a fixed place in the publication order.
    pub fn start_credit(&self) {
        let (event, snapshot) = {
            let _state = self.lock_state();
            let event = AccountEvent::credit_started(self.id);
            let snapshot = self.registry.snapshot(event.kind);
            (event, snapshot)
        };

        debug!(account = %self.id, "credit started");
        self.deliver(&event, snapshot);
    }

    /// Set a new 4-digit pin and publish [`EventKind::PinChanged`].
    ///
    /// Fails with [`AccountError::InvalidPin`] if `new_pin` is out of range;
    /// the old pin is kept and no event is published.
    pub fn change_pin(&self, new_pin: u16) -> Result<(), AccountError> {
        let new_pin = Pin::new(new_pin)?;

        let (event, snapshot) = {
            let mut state = self.lock_state();
            state.pin = new_pin;
            let event = AccountEvent::pin_changed(self.id);
            let snapshot = self.registry.snapshot(event.kind);
            (event, snapshot)
        };

        debug!(account = %self.id, "pin changed");
        self.deliver(&event, snapshot);
        Ok(())
    }

    /// Register an observer for one event kind (`Some(kind)`) or all kinds
    /// (`None`). The handler runs synchronously on the publishing thread.
    pub fn subscribe(
        &self,
        filter: Option<EventKind>,
        handler: impl Fn(&AccountEvent) + Send + Sync + 'static,
    ) -> SubscriptionToken {
        self.registry.subscribe(filter, handler)
    }

    /// Remove an observer. Idempotent. An unsubscribe racing a publish may
    /// still see at most one more notification (snapshot semantics).
    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        self.registry.unsubscribe(token)
    }

    fn lock_state(&self) -> MutexGuard<'_, AccountState> {
        // State transitions are complete before any point that can panic;
        // a poisoned guard still holds a consistent balance/pin pair.
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn deliver(&self, event: &AccountEvent, snapshot: DispatchSnapshot<AccountEvent>) {
        if snapshot.is_empty() {
            return;
        }
        let outcome = snapshot.deliver(event);
        if outcome.failed > 0 {
            debug!(
                account = %self.id,
                delivered = outcome.delivered,
                failed = outcome.failed,
                "event delivery finished with observer failures"
            );
        }
    }
}

impl Entity for Account {
    type Id = AccountId;

    fn id(&self) -> &AccountId {
        &self.id
    }
}

impl core::fmt::Debug for Account {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("card_number", &self.card_number)
            .field("holder", &self.holder)
            .field("expiry", &self.expiry)
            .field("credit_limit", &self.credit_limit)
            .field("balance", &self.balance())
            .finish()
    }
}

fn ensure_positive(op: &str, amount: i64) -> Result<(), AccountError> {
    if amount <= 0 {
        return Err(DomainError::validation(format!(
            "{op} amount must be > 0, got {amount}"
        ))
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::sync::Mutex as StdMutex;

    fn test_account(credit_limit: i64) -> Account {
        Account::open(
            "4000-1234-5678-9010",
            "Ada Lovelace",
            CardExpiry::new(2028, 4).unwrap(),
            4321,
            credit_limit,
        )
        .unwrap()
    }

    /// Observer capturing every event it sees.
    fn recording_observer(
        account: &Account,
        filter: Option<EventKind>,
    ) -> (SubscriptionToken, Arc<StdMutex<Vec<AccountEvent>>>) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let token = account.subscribe(filter, move |event| {
            sink.lock().unwrap().push(event.clone());
        });
        (token, seen)
    }

    #[test]
    fn open_validates_pin_and_credit_limit() {
        let expiry = CardExpiry::new(2028, 4).unwrap();

        assert!(matches!(
            Account::open("4000", "Ada", expiry, 42, 1000),
            Err(AccountError::InvalidPin { pin: 42 })
        ));
        assert!(matches!(
            Account::open("4000", "Ada", expiry, 4321, -1),
            Err(AccountError::Domain(DomainError::Validation(_)))
        ));
        assert!(Account::open("", "Ada", expiry, 4321, 1000).is_err());

        let account = Account::open("4000", "Ada", expiry, 4321, 1000).unwrap();
        assert_eq!(account.balance(), 0);
        assert_eq!(account.pin().value(), 4321);
        assert_eq!(account.credit_limit(), 1000);
    }

    #[test]
    fn replenish_then_spend_publishes_one_event_each() {
        let account = test_account(1000);
        let (_, seen) = recording_observer(&account, None);

        assert_eq!(account.replenish(1000).unwrap(), 1000);
        assert_eq!(account.balance(), 1000);

        assert_eq!(account.spend(300).unwrap(), 700);
        assert_eq!(account.balance(), 700);

        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::AccountReplenished);
        assert_eq!(events[0].amount, 1000);
        assert_eq!(events[1].kind, EventKind::MoneySpent);
        assert_eq!(events[1].amount, 300);
        assert!(events.iter().all(|e| e.account_id == *account.id()));
    }

    #[test]
    fn overdraft_spend_leaves_no_trace() {
        let account = test_account(1000);
        account.replenish(700).unwrap();
        let (_, seen) = recording_observer(&account, Some(EventKind::MoneySpent));

        let err = account.spend(800).unwrap_err();
        assert_eq!(
            err,
            AccountError::InsufficientFunds {
                balance: 700,
                requested: 800
            }
        );
        assert_eq!(account.balance(), 700);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn unsubscribed_observer_gets_no_callback() {
        let account = test_account(0);
        account.replenish(500).unwrap();

        let (token, seen) = recording_observer(&account, Some(EventKind::MoneySpent));
        assert!(account.unsubscribe(token));
        assert!(!account.unsubscribe(token));

        account.spend(100).unwrap();
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        let account = test_account(0);
        account.replenish(100).unwrap();
        let (_, seen) = recording_observer(&account, None);

        assert!(account.replenish(0).is_err());
        assert!(account.replenish(-5).is_err());
        assert!(account.spend(0).is_err());
        assert!(account.spend(-5).is_err());

        assert_eq!(account.balance(), 100);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn pin_round_trip_and_rejection() {
        let account = test_account(0);
        let (_, seen) = recording_observer(&account, Some(EventKind::PinChanged));

        account.change_pin(5678).unwrap();
        assert_eq!(account.pin().value(), 5678);

        assert!(matches!(
            account.change_pin(42),
            Err(AccountError::InvalidPin { pin: 42 })
        ));
        assert_eq!(account.pin().value(), 5678);

        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn start_credit_publishes_without_mutation() {
        let account = test_account(1000);
        account.replenish(250).unwrap();
        let (_, seen) = recording_observer(&account, Some(EventKind::CreditStarted));

        account.start_credit();

        assert_eq!(account.balance(), 250);
        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::CreditStarted);
        assert_eq!(events[0].amount, 0);
    }

    #[test]
    fn panicking_observer_does_not_unwind_into_operations() {
        let account = test_account(0);
        account.subscribe(Some(EventKind::AccountReplenished), |_| {
            panic!("observer bug")
        });
        let (_, seen) = recording_observer(&account, None);

        // The mutation has committed before delivery begins.
        assert_eq!(account.replenish(100).unwrap(), 100);
        assert_eq!(account.balance(), 100);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Replenish(i64),
        Spend(i64),
        ChangePin(u16),
        StartCredit,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1i64..10_000).prop_map(Op::Replenish),
            (1i64..10_000).prop_map(Op::Spend),
            (0u16..12_000).prop_map(Op::ChangePin),
            Just(Op::StartCredit),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: over any op sequence the balance never goes negative,
        /// tracks the successful ops exactly, and every successful op
        /// publishes exactly one event of the matching kind.
        #[test]
        fn balance_and_event_stream_track_successful_ops(
            ops in prop::collection::vec(op_strategy(), 1..40)
        ) {
            let account = test_account(10_000);
            let (_, seen) = recording_observer(&account, None);

            let mut expected_balance: i64 = 0;
            let mut expected_kinds: Vec<EventKind> = Vec::new();

            for op in ops {
                match op {
                    Op::Replenish(amount) => {
                        account.replenish(amount).unwrap();
                        expected_balance += amount;
                        expected_kinds.push(EventKind::AccountReplenished);
                    }
                    Op::Spend(amount) => match account.spend(amount) {
                        Ok(balance) => {
                            expected_balance -= amount;
                            prop_assert_eq!(balance, expected_balance);
                            expected_kinds.push(EventKind::MoneySpent);
                        }
                        Err(AccountError::InsufficientFunds { balance, requested }) => {
                            prop_assert_eq!(balance, expected_balance);
                            prop_assert!(requested > balance);
                        }
                        Err(other) => prop_assert!(false, "unexpected spend error: {}", other),
                    },
                    Op::ChangePin(pin) => {
                        let changed = account.change_pin(pin);
                        if (1000..=9999).contains(&pin) {
                            prop_assert!(changed.is_ok());
                            prop_assert_eq!(account.pin().value(), pin);
                            expected_kinds.push(EventKind::PinChanged);
                        } else {
                            prop_assert!(changed.is_err());
                        }
                    }
                    Op::StartCredit => {
                        account.start_credit();
                        expected_kinds.push(EventKind::CreditStarted);
                    }
                }

                prop_assert!(account.balance() >= 0);
                prop_assert_eq!(account.balance(), expected_balance);
            }

            let kinds: Vec<EventKind> =
                seen.lock().unwrap().iter().map(|e| e.kind).collect();
            prop_assert_eq!(kinds, expected_kinds);
        }
    }
}
