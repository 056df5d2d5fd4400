use std::{sync::Arc, time::Duration};

use sea_orm::DatabaseConnection;
use tokio::sync::Mutex;

use crate::{
    LogSink, Notification, NotificationSink, ResultEngine,
    locks::{DEFAULT_LOCK_TIMEOUT, WalletLocks},
};

mod access;
mod directory;
mod gamification;
mod ledger;
mod notifications;
mod redemptions;
mod scheduler;
mod tasks;

pub use gamification::GamificationSummary;
pub use scheduler::RecurringRun;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: $crate::ResultEngine<_> = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    locks: WalletLocks,
    notifier: Arc<dyn NotificationSink>,
    scheduler_lock: Mutex<()>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Hand notifications to the sink. Only called after a commit; failures
    /// are logged and dropped.
    fn dispatch(&self, outbox: Vec<Notification>) {
        for notification in outbox {
            let user_id = notification.user_id;
            let kind = notification.kind;
            if let Err(err) = self.notifier.create(notification) {
                tracing::warn!(%user_id, kind = kind.as_str(), "{err}");
            }
        }
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    notifier: Option<Arc<dyn NotificationSink>>,
    lock_timeout: Option<Duration>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Where notifications go after a commit. Defaults to [`LogSink`].
    pub fn notification_sink(mut self, sink: Arc<dyn NotificationSink>) -> EngineBuilder {
        self.notifier = Some(sink);
        self
    }

    /// How long a wallet operation waits for the child's lock before giving
    /// up with a retryable error.
    pub fn lock_timeout(mut self, timeout: Duration) -> EngineBuilder {
        self.lock_timeout = Some(timeout);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            locks: WalletLocks::new(self.lock_timeout.unwrap_or(DEFAULT_LOCK_TIMEOUT)),
            notifier: self.notifier.unwrap_or_else(|| Arc::new(LogSink)),
            scheduler_lock: Mutex::new(()),
        })
    }
}
