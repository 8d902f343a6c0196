//! Three-way conflict engine.
//!
//! Divergence is recorded, surfaced, and resolved — never auto-merged.
//! Silent content loss is unacceptable in a messaging context, so every
//! resolution requires an explicit choice, regardless of who authored
//! which side. (A same-author last-write-wins shortcut is a deliberate
//! non-feature pending a product decision.)

use lk_proto::{ConflictChoice, ConflictEntity, ConflictInfo, ConflictStatus, EntityVersion};
use lk_store::Store;
use tracing::{debug, info};

use crate::error::SyncError;

#[derive(Clone)]
pub struct ConflictResolutionEngine {
    store: Store,
}

impl ConflictResolutionEngine {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Compare an entity's two descendants against their common ancestor.
    /// Records and returns a conflict only on genuine divergence: both
    /// sides changed, and not to the same content.
    pub async fn detect(
        &self,
        entity_type: ConflictEntity,
        entity_id: &str,
        base: EntityVersion,
        local: EntityVersion,
        remote: EntityVersion,
    ) -> Result<Option<ConflictInfo>, SyncError> {
        let local_changed = local.content != base.content;
        let remote_changed = remote.content != base.content;
        if !local_changed || !remote_changed || local.content == remote.content {
            return Ok(None);
        }

        let conflict = ConflictInfo::new(entity_type, entity_id, base, local, remote);
        self.store.insert_conflict(&conflict).await?;
        info!(
            "[conflict] divergence on {} {} recorded as {}",
            entity_type.as_str(),
            entity_id,
            conflict.id
        );
        Ok(Some(conflict))
    }

    /// Everything awaiting a decision, oldest first — the surface a UI
    /// presents both versions from.
    pub async fn pending_conflicts(&self) -> Result<Vec<ConflictInfo>, SyncError> {
        Ok(self.store.pending_conflicts().await?)
    }

    /// Apply an explicit choice. Resolution is one-shot; a second call for
    /// the same conflict fails rather than silently re-applying.
    ///
    /// When the local version of a message wins, the corresponding queue
    /// row is reset to pending/unsynced so the surviving edit goes back on
    /// the wire.
    pub async fn resolve(
        &self,
        conflict_id: &str,
        choice: ConflictChoice,
    ) -> Result<EntityVersion, SyncError> {
        let conflict = self
            .store
            .get_conflict(conflict_id)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("conflict {conflict_id}")))?;
        if conflict.status == ConflictStatus::Resolved {
            return Err(SyncError::ConflictAlreadyResolved(conflict_id.to_string()));
        }
        // The guarded UPDATE settles a race between two resolvers.
        if !self.store.resolve_conflict(conflict_id).await? {
            return Err(SyncError::ConflictAlreadyResolved(conflict_id.to_string()));
        }

        let winning = conflict.chosen(choice).clone();
        if conflict.entity_type == ConflictEntity::Message && choice == ConflictChoice::KeepLocal {
            if self.store.requeue(&conflict.entity_id).await? {
                info!(
                    "[conflict] re-queued message {} after local version won",
                    conflict.entity_id
                );
            } else {
                debug!(
                    "[conflict] no queue row for message {} — nothing to re-queue",
                    conflict.entity_id
                );
            }
        }
        info!("[conflict] resolved {conflict_id} with {choice:?}");
        Ok(winning)
    }
}
