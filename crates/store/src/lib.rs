//! Persistence for the logistics back office.
//!
//! Services talk to storage through a [`UnitOfWork`]: typed
//! [`Repository`] handles read committed state and buffer writes, and
//! [`UnitOfWork::complete`] applies the buffer atomically through a
//! [`Store`] backend.

pub mod entity;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;
pub mod unit_of_work;

pub use entity::{DriverInclude, Entity, NoInclude, OrderInclude};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use record::{Change, EntityKind, ForeignKey, Record};
pub use store::{Store, StoreExt};
pub use unit_of_work::{Repository, UnitOfWork};
