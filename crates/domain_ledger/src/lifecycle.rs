//! Voucher lifecycle state machine
//!
//! Active -> SoftDeleted -> (Restored -> Active) | (Purged -> gone)
//!
//! Each transition is one transaction keeping the voucher document, its
//! entry projections, the deleted-records mirror, and the aggregate deltas
//! mutually consistent.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use core_kernel::{ActorId, VoucherId};
use infra_store::Store;

use crate::error::LedgerError;
use crate::events::VoucherEventSink;
use crate::poster::with_retries;
use crate::repo::{self, collections, AuditAction, DeletedVoucherDoc};

/// Soft-delete / restore / purge transitions for posted vouchers
pub struct VoucherLifecycleManager {
    store: Store,
    sinks: Vec<Arc<dyn VoucherEventSink>>,
}

impl VoucherLifecycleManager {
    /// Creates a lifecycle manager over the given store
    pub fn new(store: Store) -> Self {
        Self {
            store,
            sinks: Vec::new(),
        }
    }

    /// Registers an event sink invoked inside every transition transaction
    pub fn with_sink(mut self, sink: Arc<dyn VoucherEventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Soft-deletes a voucher
    ///
    /// Marks the voucher deleted, mirrors the full payload into the
    /// deleted-records log, excludes its entries from balance computation,
    /// and reverses its aggregate contribution, all in one transaction.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the voucher does not exist
    /// - `InvalidTransition` if the voucher is already soft-deleted
    pub async fn soft_delete(
        &self,
        voucher_id: VoucherId,
        actor: ActorId,
        reason: impl Into<String>,
    ) -> Result<(), LedgerError> {
        let reason = reason.into();
        with_retries(&self.store, "soft_delete", || {
            self.try_soft_delete(voucher_id, actor, reason.clone())
        })
        .await
    }

    async fn try_soft_delete(
        &self,
        voucher_id: VoucherId,
        actor: ActorId,
        reason: String,
    ) -> Result<(), LedgerError> {
        let mut tx = self.store.begin();

        let before = repo::load_voucher(&mut tx, voucher_id)
            .await?
            .ok_or(LedgerError::NotFound(voucher_id))?;
        if before.is_deleted {
            return Err(LedgerError::InvalidTransition(format!(
                "voucher {} is already soft-deleted",
                voucher_id
            )));
        }

        let now = Utc::now();
        let mut after = before.clone();
        after.is_deleted = true;
        after.deleted_at = Some(now);
        after.deleted_by = Some(actor);

        repo::stage_voucher(&mut tx, &after)?;
        tx.put(
            collections::DELETED_VOUCHERS,
            &voucher_id.as_uuid().to_string(),
            &DeletedVoucherDoc {
                voucher: after.clone(),
                reason: reason.clone(),
                deleted_at: now,
                deleted_by: actor,
            },
        )?;
        repo::stage_audit(
            &mut tx,
            actor,
            AuditAction::VoucherSoftDeleted,
            voucher_id,
            reason,
        )?;

        for sink in &self.sinks {
            sink.on_voucher_deleted(&mut tx, &before).await?;
        }

        tx.commit().await?;

        info!(voucher_id = %voucher_id, "Voucher soft-deleted");
        Ok(())
    }

    /// Restores a soft-deleted voucher
    ///
    /// Clears the deletion metadata (reconstructing the voucher from the
    /// deleted-records log if the active document itself was removed),
    /// drops the log entry, re-includes the entries, and re-applies the
    /// aggregate contribution.
    ///
    /// # Errors
    ///
    /// - `NotFound` if neither the active voucher nor its deleted-log copy
    ///   exists
    /// - `InvalidTransition` if the voucher is active
    pub async fn restore(&self, voucher_id: VoucherId, actor: ActorId) -> Result<(), LedgerError> {
        with_retries(&self.store, "restore", || self.try_restore(voucher_id, actor)).await
    }

    async fn try_restore(&self, voucher_id: VoucherId, actor: ActorId) -> Result<(), LedgerError> {
        let mut tx = self.store.begin();

        let base = match repo::load_voucher(&mut tx, voucher_id).await? {
            Some(v) if !v.is_deleted => {
                return Err(LedgerError::InvalidTransition(format!(
                    "voucher {} is not soft-deleted",
                    voucher_id
                )));
            }
            Some(v) => v,
            None => {
                repo::load_deleted(&mut tx, voucher_id)
                    .await?
                    .ok_or(LedgerError::NotFound(voucher_id))?
                    .voucher
            }
        };

        let mut restored = base;
        restored.is_deleted = false;
        restored.deleted_at = None;
        restored.deleted_by = None;

        repo::stage_voucher(&mut tx, &restored)?;
        tx.delete(
            collections::DELETED_VOUCHERS,
            &voucher_id.as_uuid().to_string(),
        );
        repo::stage_audit(
            &mut tx,
            actor,
            AuditAction::VoucherRestored,
            voucher_id,
            "restored from deleted records",
        )?;

        for sink in &self.sinks {
            sink.on_voucher_created(&mut tx, &restored).await?;
        }

        tx.commit().await?;

        info!(voucher_id = %voucher_id, "Voucher restored");
        Ok(())
    }

    /// Permanently removes a soft-deleted voucher
    ///
    /// Deletes the voucher document, its entry projections, its idempotency
    /// index row, and its deleted-log copy. Irreversible; the audit log is
    /// the only remaining trace.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no trace of the voucher exists
    /// - `InvalidTransition` when called on an active voucher
    pub async fn purge(&self, voucher_id: VoucherId, actor: ActorId) -> Result<(), LedgerError> {
        with_retries(&self.store, "purge", || self.try_purge(voucher_id, actor)).await
    }

    async fn try_purge(&self, voucher_id: VoucherId, actor: ActorId) -> Result<(), LedgerError> {
        let mut tx = self.store.begin();

        let active = repo::load_voucher(&mut tx, voucher_id).await?;
        let deleted = repo::load_deleted(&mut tx, voucher_id).await?;

        let copy = match (active, deleted) {
            (Some(v), _) if !v.is_deleted => {
                return Err(LedgerError::InvalidTransition(format!(
                    "cannot purge active voucher {}",
                    voucher_id
                )));
            }
            (Some(v), _) => v,
            (None, Some(d)) => d.voucher,
            (None, None) => return Err(LedgerError::NotFound(voucher_id)),
        };

        tx.delete(collections::VOUCHERS, &voucher_id.as_uuid().to_string());
        repo::stage_entry_removal(&mut tx, &copy);
        tx.delete(
            collections::DELETED_VOUCHERS,
            &voucher_id.as_uuid().to_string(),
        );
        tx.delete(
            collections::VOUCHER_SOURCES,
            &repo::source_key(copy.source_type, &copy.source_id),
        );
        repo::stage_audit(
            &mut tx,
            actor,
            AuditAction::VoucherPurged,
            voucher_id,
            format!("purged {}:{}", copy.source_type, copy.source_id),
        )?;

        tx.commit().await?;

        info!(voucher_id = %voucher_id, "Voucher purged");
        Ok(())
    }
}

impl std::fmt::Debug for VoucherLifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoucherLifecycleManager")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    use crate::account::AccountRef;
    use crate::registry::AccountRegistry;
    use crate::poster::JournalPoster;
    use crate::voucher::{SourceType, Voucher};

    async fn posted_voucher(store: &Store) -> VoucherId {
        let poster = JournalPoster::new(store.clone(), Arc::new(AccountRegistry::standard()));
        poster
            .post_simple(
                SourceType::Remittance,
                "rm-1",
                Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap(),
                Currency::USD,
                dec!(100),
                &AccountRef::CashBox("main".into()),
                &AccountRef::Clearing("remittances".into()),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_soft_delete_marks_and_mirrors() {
        let store = Store::in_memory();
        let id = posted_voucher(&store).await;
        let lifecycle = VoucherLifecycleManager::new(store.clone());
        let actor = ActorId::new();

        lifecycle.soft_delete(id, actor, "entered twice").await.unwrap();

        let voucher: Voucher = store
            .get(collections::VOUCHERS, &id.as_uuid().to_string())
            .await
            .unwrap()
            .unwrap();
        assert!(voucher.is_deleted);
        assert_eq!(voucher.deleted_by, Some(actor));

        let mirror: DeletedVoucherDoc = store
            .get(collections::DELETED_VOUCHERS, &id.as_uuid().to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mirror.reason, "entered twice");
    }

    #[tokio::test]
    async fn test_double_soft_delete_is_invalid() {
        let store = Store::in_memory();
        let id = posted_voucher(&store).await;
        let lifecycle = VoucherLifecycleManager::new(store.clone());

        lifecycle.soft_delete(id, ActorId::new(), "first").await.unwrap();
        let second = lifecycle.soft_delete(id, ActorId::new(), "second").await;

        assert!(matches!(second, Err(LedgerError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn test_restore_clears_deletion_metadata() {
        let store = Store::in_memory();
        let id = posted_voucher(&store).await;
        let lifecycle = VoucherLifecycleManager::new(store.clone());

        lifecycle.soft_delete(id, ActorId::new(), "oops").await.unwrap();
        lifecycle.restore(id, ActorId::new()).await.unwrap();

        let voucher: Voucher = store
            .get(collections::VOUCHERS, &id.as_uuid().to_string())
            .await
            .unwrap()
            .unwrap();
        assert!(!voucher.is_deleted);
        assert!(voucher.deleted_at.is_none());

        let mirror: Option<DeletedVoucherDoc> = store
            .get(collections::DELETED_VOUCHERS, &id.as_uuid().to_string())
            .await
            .unwrap();
        assert!(mirror.is_none());
    }

    #[tokio::test]
    async fn test_restore_reconstructs_from_deleted_log() {
        let store = Store::in_memory();
        let id = posted_voucher(&store).await;
        let lifecycle = VoucherLifecycleManager::new(store.clone());

        lifecycle.soft_delete(id, ActorId::new(), "gone").await.unwrap();
        // The active document itself disappears
        store
            .delete(collections::VOUCHERS, &id.as_uuid().to_string())
            .await
            .unwrap();

        lifecycle.restore(id, ActorId::new()).await.unwrap();

        let voucher: Voucher = store
            .get(collections::VOUCHERS, &id.as_uuid().to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(voucher.id, id);
        assert!(!voucher.is_deleted);
    }

    #[tokio::test]
    async fn test_restore_of_active_voucher_is_invalid() {
        let store = Store::in_memory();
        let id = posted_voucher(&store).await;
        let lifecycle = VoucherLifecycleManager::new(store.clone());

        assert!(matches!(
            lifecycle.restore(id, ActorId::new()).await,
            Err(LedgerError::InvalidTransition(_))
        ));
    }

    #[tokio::test]
    async fn test_purge_requires_soft_deleted_state() {
        let store = Store::in_memory();
        let id = posted_voucher(&store).await;
        let lifecycle = VoucherLifecycleManager::new(store.clone());

        assert!(matches!(
            lifecycle.purge(id, ActorId::new()).await,
            Err(LedgerError::InvalidTransition(_))
        ));

        lifecycle.soft_delete(id, ActorId::new(), "cleanup").await.unwrap();
        lifecycle.purge(id, ActorId::new()).await.unwrap();

        let voucher: Option<Voucher> = store
            .get(collections::VOUCHERS, &id.as_uuid().to_string())
            .await
            .unwrap();
        assert!(voucher.is_none());

        assert!(matches!(
            lifecycle.purge(id, ActorId::new()).await,
            Err(LedgerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_lifecycle_on_missing_voucher_is_not_found() {
        let store = Store::in_memory();
        let lifecycle = VoucherLifecycleManager::new(store);

        assert!(matches!(
            lifecycle
                .soft_delete(VoucherId::new(), ActorId::new(), "x")
                .await,
            Err(LedgerError::NotFound(_))
        ));
    }
}
