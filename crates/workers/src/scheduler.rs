//! Scripted account workers: named threads + explicit joins.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use cardbank_account::{Account, AccountError};

/// One step of a worker script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountOp {
    Replenish(i64),
    Spend(i64),
    StartCredit,
    ChangePin(u16),
    /// Relative delay before the next step.
    Pause(Duration),
}

/// What a worker's script actually did.
///
/// Recoverable rejections (insufficient funds, invalid pin) are counted, not
/// fatal; the script keeps running. `Pause` steps count toward neither.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    /// Operations that mutated/published successfully.
    pub committed: usize,
    /// Operations the account rejected.
    pub rejected: usize,
}

impl WorkerReport {
    fn absorb(&mut self, other: WorkerReport) {
        self.committed += other.committed;
        self.rejected += other.rejected;
    }
}

/// Handle to join a running worker and collect its report.
#[derive(Debug)]
pub struct WorkerHandle {
    name: String,
    join: Option<thread::JoinHandle<WorkerReport>>,
}

impl WorkerHandle {
    /// Wait for the worker to finish its script.
    ///
    /// A worker that panicked yields an empty report; the panic is logged,
    /// not propagated.
    pub fn join(mut self) -> WorkerReport {
        match self.join.take() {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                warn!(worker = %self.name, "worker thread panicked");
                WorkerReport::default()
            }),
            None => WorkerReport::default(),
        }
    }
}

/// Spawns scripted account workers.
#[derive(Debug)]
pub struct OpWorker;

impl OpWorker {
    /// Spawn a named thread running `ops` against `account`.
    pub fn spawn(
        name: impl Into<String>,
        account: Arc<Account>,
        ops: Vec<AccountOp>,
    ) -> WorkerHandle {
        Self::spawn_inner(name.into(), account, None, ops)
    }

    /// Like [`OpWorker::spawn`], but the script only starts once every
    /// participant has reached `start`. Use this to line workers up on the
    /// same starting instant and maximize interleaving.
    pub fn spawn_synced(
        name: impl Into<String>,
        account: Arc<Account>,
        start: Arc<Barrier>,
        ops: Vec<AccountOp>,
    ) -> WorkerHandle {
        Self::spawn_inner(name.into(), account, Some(start), ops)
    }

    fn spawn_inner(
        name: String,
        account: Arc<Account>,
        start: Option<Arc<Barrier>>,
        ops: Vec<AccountOp>,
    ) -> WorkerHandle {
        let thread_name = name.clone();
        let join = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || worker_loop(&thread_name, &account, start, &ops))
            .expect("failed to spawn account worker thread");

        WorkerHandle {
            name,
            join: Some(join),
        }
    }
}

/// Join every handle and sum the reports.
pub fn join_all(handles: impl IntoIterator<Item = WorkerHandle>) -> WorkerReport {
    let mut total = WorkerReport::default();
    for handle in handles {
        total.absorb(handle.join());
    }
    total
}

fn worker_loop(
    name: &str,
    account: &Account,
    start: Option<Arc<Barrier>>,
    ops: &[AccountOp],
) -> WorkerReport {
    if let Some(barrier) = start {
        barrier.wait();
    }
    info!(worker = name, steps = ops.len(), "worker script started");

    let mut report = WorkerReport::default();
    for op in ops {
        match op {
            AccountOp::Pause(delay) => thread::sleep(*delay),
            AccountOp::Replenish(amount) => {
                record(name, &mut report, account.replenish(*amount).map(|_| ()));
            }
            AccountOp::Spend(amount) => {
                record(name, &mut report, account.spend(*amount).map(|_| ()));
            }
            AccountOp::StartCredit => {
                account.start_credit();
                report.committed += 1;
            }
            AccountOp::ChangePin(pin) => {
                record(name, &mut report, account.change_pin(*pin));
            }
        }
    }

    info!(
        worker = name,
        committed = report.committed,
        rejected = report.rejected,
        "worker script finished"
    );
    report
}

fn record(name: &str, report: &mut WorkerReport, result: Result<(), AccountError>) {
    match result {
        Ok(()) => report.committed += 1,
        Err(err @ (AccountError::InsufficientFunds { .. } | AccountError::InvalidPin { .. })) => {
            debug!(worker = name, error = %err, "operation rejected");
            report.rejected += 1;
        }
        Err(err) => {
            // Script bug (e.g. non-positive amount), not an account race.
            warn!(worker = name, error = %err, "operation invalid");
            report.rejected += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardbank_account::CardExpiry;

    fn shared_account() -> Arc<Account> {
        Arc::new(
            Account::open(
                "4000-0000-0000-0000",
                "Worker Test",
                CardExpiry::new(2029, 12).unwrap(),
                1234,
                10_000,
            )
            .unwrap(),
        )
    }

    #[test]
    fn script_report_counts_commits_and_rejections() {
        let account = shared_account();
        let handle = OpWorker::spawn(
            "script",
            Arc::clone(&account),
            vec![
                AccountOp::Replenish(500),
                AccountOp::Spend(200),
                AccountOp::Spend(10_000), // rejected: insufficient funds
                AccountOp::ChangePin(17), // rejected: invalid pin
                AccountOp::Pause(Duration::from_millis(1)),
                AccountOp::StartCredit,
            ],
        );

        let report = handle.join();
        assert_eq!(report.committed, 3);
        assert_eq!(report.rejected, 2);
        assert_eq!(account.balance(), 300);
    }

    #[test]
    fn join_all_sums_reports() {
        let account = shared_account();
        let handles = vec![
            OpWorker::spawn("a", Arc::clone(&account), vec![AccountOp::Replenish(100)]),
            OpWorker::spawn("b", Arc::clone(&account), vec![AccountOp::Replenish(100)]),
        ];

        let total = join_all(handles);
        assert_eq!(total.committed, 2);
        assert_eq!(total.rejected, 0);
        assert_eq!(account.balance(), 200);
    }
}
