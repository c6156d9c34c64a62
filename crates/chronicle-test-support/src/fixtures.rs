//! Fixture aggregate — a small ledger account used across the test suites.

use serde::{Deserialize, Serialize};

use chronicle_core::aggregate::EventSourced;
use chronicle_core::dispatch::HandlerRegistry;
use chronicle_core::event::{EventType, StreamId};

/// Emitted when an account is opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountOpened {
    /// Account holder name.
    pub holder: String,
}

impl EventType for AccountOpened {
    const EVENT_TYPE: &'static str = "ledger.account_opened";
}

/// Emitted when an amount is credited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credited {
    /// Amount credited, in cents.
    pub amount: i64,
}

impl EventType for Credited {
    const EVENT_TYPE: &'static str = "ledger.credited";
}

/// Emitted when an amount is debited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debited {
    /// Amount debited, in cents.
    pub amount: i64,
}

impl EventType for Debited {
    const EVENT_TYPE: &'static str = "ledger.debited";
}

/// The fixture entity: an account balance reconstructed from its history.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerAccount {
    /// Account holder name, set by `AccountOpened`.
    pub holder: String,
    /// Current balance in cents.
    pub balance: i64,
    /// Number of events applied (any kind).
    pub entries: u64,
}

impl EventSourced for LedgerAccount {
    const KIND: &'static str = "ledger_account";

    fn initialize(_stream_id: &StreamId) -> Self {
        Self::default()
    }

    fn register_handlers(registry: &mut HandlerRegistry<Self>) {
        registry.on::<AccountOpened>(|account, event| {
            account.holder = event.holder;
            account.entries += 1;
        });
        registry.on::<Credited>(|account, event| {
            account.balance += event.amount;
            account.entries += 1;
        });
        registry.on::<Debited>(|account, event| {
            account.balance -= event.amount;
            account.entries += 1;
        });
    }
}
