//! Driver use cases.

use std::collections::HashMap;
use std::time::Instant;

use common::{DriverId, Page, UserId};
use domain::{Driver, DriverFilter, DriverRecord, LinkedUser, QueryDescriptor};
use store::{DriverInclude, Store, StoreExt, UnitOfWork};

use crate::error::{Result, ServiceError};
use crate::identity::{IdentityError, IdentityProvider, User};
use crate::requests::{CreateDriverRequest, UpdateDriverRequest};
use crate::views::DriverView;

const STEP_DELETE_USER: &str = "delete_user";
const STEP_DELETE_DRIVER: &str = "delete_driver";

/// Service for managing drivers and their link to user accounts.
#[derive(Debug, Clone)]
pub struct DriverService<S, I>
where
    S: Store + Clone,
    I: IdentityProvider,
{
    store: S,
    identity: I,
}

impl<S, I> DriverService<S, I>
where
    S: Store + Clone,
    I: IdentityProvider,
{
    /// Creates a new driver service.
    pub fn new(store: S, identity: I) -> Self {
        Self { store, identity }
    }

    /// Returns one page of drivers joined with their user accounts.
    #[tracing::instrument(skip(self))]
    pub async fn list_drivers(
        &self,
        query: &QueryDescriptor<DriverFilter>,
    ) -> Result<Page<DriverView>> {
        let started = Instant::now();
        let uow = self.store.begin();
        let drivers = uow
            .repository::<Driver>()
            .queryable(DriverInclude::NONE)
            .await?
            .into_iter()
            .map(|graph| graph.driver)
            .collect();
        let records = self.link_users(drivers).await?;

        let page = query.execute(records).map(DriverView::from);
        metrics::histogram!("query_duration_seconds", "entity" => "driver")
            .record(started.elapsed().as_secs_f64());
        Ok(page)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_driver(&self, id: DriverId) -> Result<DriverView> {
        let uow = self.store.begin();
        self.load_view(&uow, id).await
    }

    /// Creates an available driver linked to an existing user account.
    #[tracing::instrument(skip(self, request))]
    pub async fn create_driver(&self, request: CreateDriverRequest) -> Result<DriverView> {
        request.validate()?;
        self.ensure_user_exists(request.user_id).await?;

        let uow = self.store.begin();
        ensure_license_free(&uow, &request.license_number, None).await?;
        ensure_user_unlinked(&uow, request.user_id, None).await?;

        let driver = Driver {
            id: DriverId::new(),
            first_name: request.first_name,
            last_name: request.last_name,
            license_number: request.license_number,
            date_of_birth: request.date_of_birth,
            is_available: true,
            user_id: request.user_id,
        };
        let driver_id = driver.id;

        uow.repository::<Driver>().add(driver);
        uow.complete().await?;

        metrics::counter!("drivers_created_total").increment(1);
        tracing::info!(%driver_id, "Driver created");

        self.load_view(&self.store.begin(), driver_id).await
    }

    /// Overwrites every field of a driver.
    #[tracing::instrument(skip(self, request))]
    pub async fn update_driver(&self, id: DriverId, request: UpdateDriverRequest) -> Result<DriverView> {
        if request.id != id {
            return Err(ServiceError::BadRequest(format!(
                "Driver ID in the path ({id}) does not match the ID in the body ({}).",
                request.id
            )));
        }
        request.validate()?;

        let uow = self.store.begin();
        let existing = uow
            .repository::<Driver>()
            .get_by_id(id, DriverInclude::NONE)
            .await?
            .ok_or_else(|| ServiceError::not_found("Driver", id))?
            .driver;

        if existing.user_id != request.user_id {
            self.ensure_user_exists(request.user_id).await?;
            ensure_user_unlinked(&uow, request.user_id, Some(id)).await?;
        }
        if existing.license_number != request.license_number {
            ensure_license_free(&uow, &request.license_number, Some(id)).await?;
        }

        uow.repository::<Driver>().update(Driver {
            id,
            first_name: request.first_name,
            last_name: request.last_name,
            license_number: request.license_number,
            date_of_birth: request.date_of_birth,
            is_available: request.is_available,
            user_id: request.user_id,
        });
        uow.complete().await?;

        tracing::info!(driver_id = %id, "Driver updated");
        self.load_view(&self.store.begin(), id).await
    }

    /// Deletes a driver and the user account linked to it.
    ///
    /// Runs as two steps. The user account is removed first; if that fails
    /// the driver is left untouched. If the driver delete then fails, the
    /// removed account is restored before the error is returned.
    #[tracing::instrument(skip(self))]
    pub async fn delete_driver(&self, id: DriverId) -> Result<()> {
        let uow = self.store.begin();
        let drivers = uow.repository::<Driver>();
        let graph = drivers
            .get_by_id(id, DriverInclude::ALL)
            .await?
            .ok_or_else(|| ServiceError::not_found("Driver", id))?;

        if graph.has_active_orders() {
            return Err(ServiceError::Conflict(format!(
                "Driver {id} has active orders and cannot be deleted."
            )));
        }

        let user_id = graph.driver.user_id;
        tracing::info!(step = STEP_DELETE_USER, %user_id, "saga step started");
        let removed_user = match self.identity.delete_user(user_id).await {
            Ok(user) => Some(user),
            Err(IdentityError::UserNotFound(_)) => {
                tracing::warn!(%user_id, "Linked user already gone");
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, "Linked user could not be deleted");
                return Err(ServiceError::BadRequest(format!(
                    "Failed to delete the user account linked to driver {id}: {err}"
                )));
            }
        };

        tracing::info!(step = STEP_DELETE_DRIVER, "saga step started");
        drivers.delete(id);
        if let Err(err) = uow.complete().await {
            if let Some(user) = removed_user {
                self.compensate_user_delete(user).await;
            }
            return Err(err.into());
        }

        metrics::counter!("drivers_deleted_total").increment(1);
        tracing::info!(driver_id = %id, "Driver deleted");
        Ok(())
    }

    async fn compensate_user_delete(&self, user: User) {
        let user_id = user.id;
        tracing::info!(step = STEP_DELETE_USER, %user_id, "saga compensation started");
        match self.identity.restore_user(user).await {
            Ok(()) => metrics::counter!("saga_compensations_total").increment(1),
            Err(err) => {
                tracing::error!(%user_id, error = %err, "Failed to restore deleted user");
            }
        }
    }

    async fn ensure_user_exists(&self, user_id: UserId) -> Result<()> {
        match self.identity.find_user_by_id(user_id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::not_found("User", user_id)),
        }
    }

    async fn load_view(&self, uow: &UnitOfWork<S>, id: DriverId) -> Result<DriverView> {
        let driver = uow
            .repository::<Driver>()
            .get_by_id(id, DriverInclude::NONE)
            .await?
            .ok_or_else(|| ServiceError::not_found("Driver", id))?
            .driver;
        let mut records = self.link_users(vec![driver]).await?;
        records
            .pop()
            .map(DriverView::from)
            .ok_or_else(|| ServiceError::not_found("Driver", id))
    }

    /// Attaches the user name and email of each driver's account.
    async fn link_users(&self, drivers: Vec<Driver>) -> Result<Vec<DriverRecord>> {
        let mut users: HashMap<UserId, Option<LinkedUser>> = HashMap::new();
        for driver in &drivers {
            if users.contains_key(&driver.user_id) {
                continue;
            }
            let user = self
                .identity
                .find_user_by_id(driver.user_id)
                .await?
                .map(|u| LinkedUser {
                    id: u.id,
                    user_name: u.user_name,
                    email: u.email,
                });
            users.insert(driver.user_id, user);
        }

        Ok(drivers
            .into_iter()
            .map(|driver| DriverRecord {
                user: users.get(&driver.user_id).cloned().flatten(),
                driver,
            })
            .collect())
    }
}

async fn ensure_license_free<S: Store + Clone>(
    uow: &UnitOfWork<S>,
    license_number: &str,
    except: Option<DriverId>,
) -> Result<()> {
    let taken = uow
        .repository::<Driver>()
        .find(|d| d.license_number == license_number && Some(d.id) != except)
        .await?;
    if taken.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::Conflict(format!(
            "A driver with license number {license_number} already exists."
        )))
    }
}

async fn ensure_user_unlinked<S: Store + Clone>(
    uow: &UnitOfWork<S>,
    user_id: UserId,
    except: Option<DriverId>,
) -> Result<()> {
    let linked = uow
        .repository::<Driver>()
        .find(|d| d.user_id == user_id && Some(d.id) != except)
        .await?;
    if linked.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::Conflict(format!(
            "User {user_id} is already linked to another driver."
        )))
    }
}
