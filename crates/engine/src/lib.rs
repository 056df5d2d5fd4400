//! Family chore economy engine.
//!
//! Parents define tasks, children complete them, and every approval pays
//! coins into the child's wallet and XP into their level track. Coins are
//! spent on family rewards. All state lives in the database; [`Engine`] is a
//! handle over a `DatabaseConnection` plus the in-process locks that keep
//! wallet mutations serialized per child.

pub use assignments::{AssignmentStatus, TaskAssignment};
pub use badges::{Badge, BadgeCondition, Progress};
pub use calendar::DayWindow;
pub use commands::{NewRewardCmd, NewTaskCmd};
pub use error::EngineError;
pub use families::Family;
pub use notifications::{
    ChannelSink, LogSink, Notification, NotificationKind, NotificationSink, NotifyError,
    StoredNotification,
};
pub use ops::{Engine, EngineBuilder, GamificationSummary, RecurringRun};
pub use redemptions::{Redemption, RedemptionStatus};
pub use rewards::Reward;
pub use tasks::{Recurrence, RecurrenceKind, Task, TaskCategory, TaskStatus};
pub use user_badges::UnlockedBadge;
pub use user_xp::{LEVEL_THRESHOLDS, MAX_LEVEL, UserXp, threshold_for};
pub use users::{Role, User};
pub use wallet_transactions::{EntryKind, LedgerEntry, Reference, ReferenceKind};
pub use wallets::Wallet;

mod assignments;
mod badges;
mod calendar;
mod commands;
mod error;
mod families;
mod locks;
mod notifications;
mod ops;
mod redemptions;
mod rewards;
mod tasks;
mod user_badges;
mod user_xp;
mod users;
mod util;
mod wallet_transactions;
mod wallets;

type ResultEngine<T> = Result<T, EngineError>;
