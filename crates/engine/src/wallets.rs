//! The module contains `Wallet` struct and its implementation.

use chrono::{DateTime, Utc};

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, EntryKind, ResultEngine};

/// A child's coin wallet.
///
/// The balance is a cached projection of the ledger
/// ([`LedgerEntry`](crate::LedgerEntry)); it is only ever changed together
/// with the append of a ledger entry, inside one DB transaction and under the
/// child's wallet lock.
///
/// Invariant: `balance == total_earned - total_spent` and `balance >= 0`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub child_id: Uuid,
    pub balance: i64,
    pub total_earned: i64,
    pub total_spent: i64,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(child_id: Uuid) -> Self {
        Self {
            child_id,
            balance: 0,
            total_earned: 0,
            total_spent: 0,
            updated_at: Utc::now(),
        }
    }

    /// Apply a movement, enforcing a positive amount and a non-negative
    /// balance. On error the wallet is left untouched.
    pub fn apply(&mut self, kind: EntryKind, amount: i64) -> ResultEngine<()> {
        if amount <= 0 {
            return Err(EngineError::Validation("amount must be > 0".to_string()));
        }
        let overflow = || EngineError::Validation("amount overflows wallet totals".to_string());
        match kind {
            EntryKind::Credit => {
                let balance = self.balance.checked_add(amount).ok_or_else(overflow)?;
                let total_earned = self.total_earned.checked_add(amount).ok_or_else(overflow)?;
                self.balance = balance;
                self.total_earned = total_earned;
            }
            EntryKind::Debit => {
                if self.balance < amount {
                    return Err(EngineError::InsufficientFunds(format!(
                        "balance is {}, need {amount}",
                        self.balance
                    )));
                }
                let total_spent = self.total_spent.checked_add(amount).ok_or_else(overflow)?;
                self.balance -= amount;
                self.total_spent = total_spent;
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub child_id: Uuid,
    pub balance: i64,
    pub total_earned: i64,
    pub total_spent: i64,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::wallet_transactions::Entity")]
    Entries,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::ChildId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::wallet_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entries.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Wallet> for ActiveModel {
    fn from(value: &Wallet) -> Self {
        Self {
            child_id: ActiveValue::Set(value.child_id),
            balance: ActiveValue::Set(value.balance),
            total_earned: ActiveValue::Set(value.total_earned),
            total_spent: ActiveValue::Set(value.total_spent),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}

impl From<Model> for Wallet {
    fn from(model: Model) -> Self {
        Self {
            child_id: model.child_id,
            balance: model.balance,
            total_earned: model.total_earned,
            total_spent: model.total_spent,
            updated_at: model.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet() -> Wallet {
        Wallet::new(Uuid::new_v4())
    }

    #[test]
    fn credit_then_debit() {
        let mut wallet = wallet();
        wallet.apply(EntryKind::Credit, 120).unwrap();
        wallet.apply(EntryKind::Debit, 20).unwrap();

        assert_eq!(wallet.balance, 100);
        assert_eq!(wallet.total_earned, 120);
        assert_eq!(wallet.total_spent, 20);
        assert_eq!(wallet.balance, wallet.total_earned - wallet.total_spent);
    }

    #[test]
    fn debit_over_balance_leaves_wallet_untouched() {
        let mut wallet = wallet();
        wallet.apply(EntryKind::Credit, 10).unwrap();
        let before = wallet.clone();

        let err = wallet.apply(EntryKind::Debit, 11).unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientFunds("balance is 10, need 11".to_string())
        );
        assert_eq!(wallet, before);
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        let mut wallet = wallet();
        assert!(matches!(
            wallet.apply(EntryKind::Credit, 0),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            wallet.apply(EntryKind::Debit, -5),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn overflow_is_a_validation_error() {
        let mut wallet = wallet();
        wallet.apply(EntryKind::Credit, i64::MAX).unwrap();
        assert!(matches!(
            wallet.apply(EntryKind::Credit, 1),
            Err(EngineError::Validation(_))
        ));
        assert_eq!(wallet.balance, i64::MAX);
    }
}
