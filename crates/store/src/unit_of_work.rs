//! Request-scoped write buffering and typed repositories.

use std::marker::PhantomData;
use std::sync::{Mutex, PoisonError};

use crate::{Change, Entity, Result, StoreError, store::Store};

/// Buffers writes for one request and applies them with a single commit.
///
/// Dropping a unit of work without calling [`UnitOfWork::complete`] discards
/// every buffered change, so a cancelled request never writes anything.
pub struct UnitOfWork<S: Store> {
    store: S,
    pending: Mutex<Vec<Change>>,
}

impl<S: Store> UnitOfWork<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Returns a typed repository over this unit of work.
    pub fn repository<E: Entity>(&self) -> Repository<'_, S, E> {
        Repository {
            uow: self,
            _entity: PhantomData,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Number of buffered changes.
    pub fn pending_changes(&self) -> usize {
        self.lock().len()
    }

    /// Commits every buffered change atomically.
    ///
    /// Returns the number of changes applied.
    #[tracing::instrument(skip(self))]
    pub async fn complete(self) -> Result<usize> {
        let changes = self
            .pending
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        let count = changes.len();
        if count == 0 {
            return Ok(0);
        }

        self.store.commit(changes).await?;
        metrics::counter!("store_commits_total").increment(1);
        tracing::debug!(changes = count, "Unit of work committed");
        Ok(count)
    }

    fn push(&self, change: Change) {
        self.lock().push(change);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Change>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: Store> std::fmt::Debug for UnitOfWork<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("pending", &self.pending_changes())
            .finish()
    }
}

/// Typed access to one entity kind.
///
/// Reads go straight to the store and see committed state only. Writes are
/// buffered in the owning [`UnitOfWork`].
pub struct Repository<'u, S: Store, E: Entity> {
    uow: &'u UnitOfWork<S>,
    _entity: PhantomData<fn() -> E>,
}

impl<S: Store, E: Entity> Repository<'_, S, E> {
    /// Loads one entity and the requested relations.
    pub async fn get_by_id(&self, id: E::Id, include: E::Include) -> Result<Option<E::Loaded>> {
        let Some(record) = self.uow.store.fetch(E::KIND, id.into()).await? else {
            return Ok(None);
        };
        let entity = E::from_record(record)?;
        let mut loaded = E::load_many(vec![entity], &self.uow.store, include).await?;
        Ok(loaded.pop())
    }

    /// Returns true if a row with this id exists.
    pub async fn exists(&self, id: E::Id) -> Result<bool> {
        Ok(self.uow.store.fetch(E::KIND, id.into()).await?.is_some())
    }

    /// Loads every entity of this kind.
    pub async fn get_all(&self, include: E::Include) -> Result<Vec<E::Loaded>> {
        let entities = self.all().await?;
        E::load_many(entities, &self.uow.store, include).await
    }

    /// Returns the entities matching `predicate`, without relations.
    pub async fn find<P>(&self, predicate: P) -> Result<Vec<E>>
    where
        P: Fn(&E) -> bool + Send,
    {
        Ok(self.all().await?.into_iter().filter(|e| predicate(e)).collect())
    }

    /// Returns the only entity matching `predicate`, or `None`.
    ///
    /// Fails with [`StoreError::MultipleRecords`] if more than one matches.
    pub async fn get_single_or_default<P>(
        &self,
        predicate: P,
        include: E::Include,
    ) -> Result<Option<E::Loaded>>
    where
        P: Fn(&E) -> bool + Send,
    {
        let mut matches = self.find(predicate).await?;
        if matches.len() > 1 {
            return Err(StoreError::MultipleRecords(E::KIND));
        }
        let Some(entity) = matches.pop() else {
            return Ok(None);
        };
        let mut loaded = E::load_many(vec![entity], &self.uow.store, include).await?;
        Ok(loaded.pop())
    }

    /// Loads the entities matching `predicate` with the requested relations.
    pub async fn get_many<P>(&self, predicate: P, include: E::Include) -> Result<Vec<E::Loaded>>
    where
        P: Fn(&E) -> bool + Send,
    {
        let matches = self.find(predicate).await?;
        E::load_many(matches, &self.uow.store, include).await
    }

    /// Materialises the loaded base set for the in-process query engine.
    pub async fn queryable(&self, include: E::Include) -> Result<Vec<E::Loaded>> {
        self.get_all(include).await
    }

    pub fn add(&self, entity: E) {
        self.uow.push(Change::Insert(entity.into_record()));
    }

    pub fn update(&self, entity: E) {
        self.uow.push(Change::Update(entity.into_record()));
    }

    pub fn delete(&self, id: E::Id) {
        self.uow.push(Change::Delete {
            kind: E::KIND,
            id: id.into(),
        });
    }

    async fn all(&self) -> Result<Vec<E>> {
        self.uow
            .store
            .fetch_all(E::KIND)
            .await?
            .into_iter()
            .map(E::from_record)
            .collect()
    }
}
