use chrono::{DateTime, Utc};
use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, EntryKind, LedgerEntry, Reference, ResultEngine, Wallet,
    locks::WalletGuard,
    util::{normalize_required_text, page},
    wallet_transactions, wallets,
};

use super::{Engine, with_tx};

const DEFAULT_PAGE_SIZE: u64 = 20;

/// Apply one movement to the guarded wallet and append its ledger entry.
///
/// Must run inside the caller's DB transaction while `guard` is held: the
/// read, the balance update and the append are one unit.
pub(super) async fn post_entry(
    db: &DatabaseTransaction,
    guard: &WalletGuard,
    kind: EntryKind,
    amount: i64,
    reason: &str,
    reference: Option<Reference>,
    now: DateTime<Utc>,
) -> ResultEngine<LedgerEntry> {
    let child_id = guard.child_id();
    let model = wallets::Entity::find_by_id(child_id)
        .lock_exclusive()
        .one(db)
        .await?
        .ok_or_else(|| EngineError::NotFound("wallet".to_string()))?;

    let mut wallet = Wallet::from(model);
    wallet.apply(kind, amount)?;
    wallet.updated_at = now;
    wallets::ActiveModel::from(&wallet).update(db).await?;

    let entry = LedgerEntry {
        id: Uuid::new_v4(),
        child_id,
        kind,
        amount,
        balance_after: wallet.balance,
        reason: reason.to_string(),
        reference,
        created_at: now,
    };
    wallet_transactions::ActiveModel::from(&entry)
        .insert(db)
        .await?;

    tracing::debug!(
        %child_id,
        kind = kind.as_str(),
        amount,
        balance = wallet.balance,
        "ledger entry posted"
    );
    Ok(entry)
}

impl Engine {
    /// Add coins to a child's wallet.
    pub async fn credit(
        &self,
        child_id: Uuid,
        amount: i64,
        reason: &str,
        reference: Option<Reference>,
    ) -> ResultEngine<LedgerEntry> {
        self.post(child_id, EntryKind::Credit, amount, reason, reference)
            .await
    }

    /// Take coins from a child's wallet. Fails without touching anything
    /// when the balance does not cover `amount`.
    pub async fn debit(
        &self,
        child_id: Uuid,
        amount: i64,
        reason: &str,
        reference: Option<Reference>,
    ) -> ResultEngine<LedgerEntry> {
        self.post(child_id, EntryKind::Debit, amount, reason, reference)
            .await
    }

    async fn post(
        &self,
        child_id: Uuid,
        kind: EntryKind,
        amount: i64,
        reason: &str,
        reference: Option<Reference>,
    ) -> ResultEngine<LedgerEntry> {
        let reason = normalize_required_text(reason, "reason")?;
        let guard = self.locks.acquire(child_id).await?;
        with_tx!(self, |db_tx| {
            post_entry(&db_tx, &guard, kind, amount, &reason, reference, Utc::now()).await
        })
    }

    /// Wallet snapshot.
    ///
    /// Authorization: the child itself or a parent of its family.
    pub async fn wallet(&self, child_id: Uuid, viewer_id: Uuid) -> ResultEngine<Wallet> {
        with_tx!(self, |db_tx| {
            self.require_viewer_of_child(&db_tx, child_id, viewer_id)
                .await?;
            let model = wallets::Entity::find_by_id(child_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("wallet".to_string()))?;
            Ok(Wallet::from(model))
        })
    }

    /// Ledger of a child, newest first.
    ///
    /// `limit` defaults to 20 entries.
    pub async fn wallet_transactions(
        &self,
        child_id: Uuid,
        viewer_id: Uuid,
        limit: Option<u64>,
        offset: u64,
    ) -> ResultEngine<Vec<LedgerEntry>> {
        let (limit, offset) = page(limit.unwrap_or(DEFAULT_PAGE_SIZE), offset)?;
        with_tx!(self, |db_tx| {
            self.require_viewer_of_child(&db_tx, child_id, viewer_id)
                .await?;
            wallet_transactions::Entity::find()
                .filter(wallet_transactions::Column::ChildId.eq(child_id))
                .order_by_desc(wallet_transactions::Column::CreatedAt)
                .limit(limit)
                .offset(offset)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(LedgerEntry::try_from)
                .collect()
        })
    }
}
