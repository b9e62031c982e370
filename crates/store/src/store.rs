use async_trait::async_trait;
use uuid::Uuid;

use crate::{Change, EntityKind, ForeignKey, Record, Result, UnitOfWork};

/// Core trait for storage backends.
///
/// Reads always observe committed state. Writes arrive as a batch of
/// [`Change`]s through [`Store::commit`] and are applied atomically: either
/// every change lands or none do.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Store: Send + Sync {
    /// Retrieves one row by primary key.
    async fn fetch(&self, kind: EntityKind, id: Uuid) -> Result<Option<Record>>;

    /// Retrieves the rows with the given primary keys, ordered by id.
    /// Unknown ids are skipped.
    async fn fetch_many(&self, kind: EntityKind, ids: &[Uuid]) -> Result<Vec<Record>>;

    /// Retrieves every row of a kind, ordered by id.
    async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<Record>>;

    /// Retrieves the rows whose `foreign_key` column references any of `ids`,
    /// ordered by id.
    async fn fetch_by_foreign_key(
        &self,
        foreign_key: ForeignKey,
        ids: &[Uuid],
    ) -> Result<Vec<Record>>;

    /// Applies a batch of changes atomically.
    ///
    /// Deleting an order removes its cargo. Deleting a driver or vehicle
    /// clears the reference on orders pointing at it.
    async fn commit(&self, changes: Vec<Change>) -> Result<()>;
}

/// Extension trait providing convenience methods for stores.
pub trait StoreExt: Store + Clone + Sized {
    /// Opens a unit of work over this store.
    fn begin(&self) -> UnitOfWork<Self> {
        UnitOfWork::new(self.clone())
    }
}

// Blanket implementation for all cloneable stores
impl<T: Store + Clone> StoreExt for T {}
