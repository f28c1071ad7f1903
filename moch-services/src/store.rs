//! Store engine: the single entry point for mutating persisted state.
//!
//! All writers go through one mutex, and every mutation (cascades included)
//! runs in one SQLite transaction. After the commit, while the writer lock is
//! still held, the store publishes the resulting change events so subscribers
//! see them in commit order and before the mutating call returns.
//!
//! Reads take a pooled connection and never wait for the writer.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::{debug, error, info, warn};

use moch_core::config::DatabaseConfig;
use moch_core::error::{MochError, MochResult};
use moch_models::queries::{self, ReminderFilter, SortDirection};
use moch_models::{
    AppConfiguration, Database, Entity, EntityKind, Id, Pet, Reminder, Removal, WeightEntry,
};

use crate::assets::AssetLoader;
use crate::event_bus::{ChangeBus, ChangeEvent, Operation};
use crate::progress::{self, WeightSummary};
use crate::service::{Service, ServiceState};

/// Transactional store over the SQLite database, publishing to a
/// [`ChangeBus`].
pub struct Store {
    state: ServiceState,
    database: Database,
    bus: ChangeBus,
    writer: Mutex<()>,
}

impl Store {
    /// Wrap an initialized database.
    pub fn new(database: Database, bus: ChangeBus) -> Self {
        Self {
            state: ServiceState::Created,
            database,
            bus,
            writer: Mutex::new(()),
        }
    }

    /// Open (or create) the database at `path` and wrap it.
    pub fn open(path: &Path, config: &DatabaseConfig, bus: ChangeBus) -> MochResult<Self> {
        let database = Database::init(path, config)?;
        Ok(Self::new(database, bus))
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    /// Run `f` in a transaction under the writer lock, then publish the events
    /// it produced.
    fn write<T, F>(&self, f: F) -> MochResult<T>
    where
        F: FnOnce(&Connection) -> MochResult<(T, Vec<ChangeEvent>)>,
    {
        if self.bus.is_dispatching() {
            warn!("store: rejected mutation from inside a change handler");
            return Err(MochError::Reentrant);
        }

        // Guards no data; a panicking mutator or handler leaves nothing to repair.
        let _writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let (value, events) = match self.database.transaction(f) {
            Ok(result) => result,
            Err(MochError::Integrity(msg)) => {
                error!("store: integrity violation, transaction rolled back: {msg}");
                return Err(MochError::Integrity(msg));
            }
            Err(e) => return Err(e),
        };

        for event in events {
            self.bus.publish(event);
        }
        Ok(value)
    }

    // ─── Generic operations ────────────────────────────────────────────────

    /// Persist a new entity and publish `created`.
    ///
    /// The entity is normalized (names trimmed) and validated first; a
    /// Reminder or WeightEntry must reference an existing pet.
    pub fn insert<E: Entity>(&self, mut entity: E) -> MochResult<Id> {
        entity.normalize();
        entity.validate()?;
        let id = entity.id();

        self.write(|conn| {
            if E::load(conn, id)?.is_some() {
                return Err(MochError::Validation(format!(
                    "{} {id} already exists",
                    E::KIND
                )));
            }
            entity.check_references(conn)?;
            entity.insert_row(conn)?;
            entity.verify_persisted(conn)?;
            Ok((id, vec![ChangeEvent::new(entity.entity_ref(), Operation::Created)]))
        })?;

        info!("store: inserted {} {id}", E::KIND);
        Ok(id)
    }

    /// Apply `mutator` to the stored entity, persist it and publish `updated`.
    ///
    /// Returns the entity as persisted. Unknown ids are `NotFound`; a mutation
    /// that breaks an invariant is `Validation` and leaves the row untouched.
    pub fn update<E, F>(&self, id: Id, mutator: F) -> MochResult<E>
    where
        E: Entity,
        F: FnOnce(&mut E),
    {
        let updated = self.write(|conn| {
            let original =
                E::load(conn, id)?.ok_or_else(|| MochError::not_found(E::KIND.as_str(), id))?;

            let mut updated = original.clone();
            mutator(&mut updated);
            updated.normalize();
            updated.validate()?;
            updated.check_references(conn)?;
            updated.touch();
            updated.update_row(conn)?;
            updated.verify_persisted(conn)?;

            let mut events = vec![ChangeEvent::new(updated.entity_ref(), Operation::Updated)];
            // A reassigned record also leaves its previous pet's scope.
            let previous = original.entity_ref();
            if previous.related_pet_id.is_some()
                && previous.related_pet_id != updated.related_pet_id()
            {
                events.push(ChangeEvent::new(previous, Operation::Updated));
            }
            Ok((updated, events))
        })?;

        info!("store: updated {} {id}", E::KIND);
        Ok(updated)
    }

    /// Delete an entity and apply its relationship rules.
    ///
    /// Deleting a pet also deletes its weight entries and clears the pet of
    /// its reminders. Events go out as `deleted` per weight entry, `updated`
    /// per detached reminder, then `deleted` for the target. Returns `false`
    /// (publishing nothing) when no such entity exists.
    pub fn delete<E: Entity>(&self, id: Id) -> MochResult<bool> {
        let removal = self.write(|conn| match E::remove(conn, id)? {
            Some(removal) => {
                let events = removal_events(&removal);
                Ok((Some(removal), events))
            }
            None => Ok((None, Vec::new())),
        })?;

        match removal {
            Some(removal) => {
                info!(
                    "store: deleted {} {id} ({} cascaded, {} detached)",
                    E::KIND,
                    removal.deleted.len(),
                    removal.detached.len()
                );
                Ok(true)
            }
            None => {
                debug!("store: delete of absent {} {id} ignored", E::KIND);
                Ok(false)
            }
        }
    }

    /// Point lookup; a missing id is `Ok(None)`.
    pub fn get<E: Entity>(&self, id: Id) -> MochResult<Option<E>> {
        let conn = self.database.conn()?;
        E::load(&conn, id)
    }

    // ─── App configuration ─────────────────────────────────────────────────

    /// The stored configuration, if one has been created.
    pub fn configuration(&self) -> MochResult<Option<AppConfiguration>> {
        let conn = self.database.conn()?;
        AppConfiguration::load_singleton(&conn)
    }

    /// Return the configuration, creating the default one if none exists.
    /// Concurrent callers all receive the same row.
    pub fn ensure_configuration(&self) -> MochResult<AppConfiguration> {
        if let Some(existing) = self.configuration()? {
            return Ok(existing);
        }

        self.write(|conn| {
            let candidate = AppConfiguration::default();
            let created = candidate.insert_if_absent(conn)?;
            let config = AppConfiguration::load_singleton(conn)?.ok_or_else(|| {
                MochError::Integrity("app configuration missing after ensure".to_string())
            })?;

            let events = if created {
                info!("store: created default app configuration {}", config.id());
                vec![ChangeEvent::new(config.entity_ref(), Operation::Created)]
            } else {
                Vec::new()
            };
            Ok((config, events))
        })
    }

    /// Mutate the configuration, creating it first if needed.
    pub fn update_configuration<F>(&self, mutator: F) -> MochResult<AppConfiguration>
    where
        F: FnOnce(&mut AppConfiguration),
    {
        let current = self.ensure_configuration()?;
        self.update::<AppConfiguration, _>(current.id(), mutator)
    }

    /// Restore every preference to its default.
    pub fn reset_configuration(&self) -> MochResult<AppConfiguration> {
        self.update_configuration(AppConfiguration::reset)
    }

    // ─── Convenience mutations ─────────────────────────────────────────────

    /// Flip a reminder between upcoming and completed.
    pub fn toggle_reminder(&self, id: Id) -> MochResult<Reminder> {
        self.update::<Reminder, _>(id, |r| r.is_completed = !r.is_completed)
    }

    /// Replace (or with `None`, remove) a pet's photo.
    pub fn set_photo(&self, pet_id: Id, photo: Option<Vec<u8>>) -> MochResult<Pet> {
        self.update::<Pet, _>(pet_id, move |pet| pet.photo = photo)
    }

    /// Load photo bytes from `source` and attach them to a pet.
    ///
    /// The load runs before the writer lock is taken. If it fails, or the
    /// future is dropped, the pet is unchanged.
    pub async fn attach_photo(
        &self,
        pet_id: Id,
        loader: &dyn AssetLoader,
        source: &str,
    ) -> MochResult<Pet> {
        if self.get::<Pet>(pet_id)?.is_none() {
            return Err(MochError::not_found(EntityKind::Pet.as_str(), pet_id));
        }

        let bytes = loader.load(source).await?;
        debug!("store: attaching {} byte photo to pet {pet_id}", bytes.len());
        self.set_photo(pet_id, Some(bytes))
    }

    // ─── Queries ───────────────────────────────────────────────────────────

    pub fn list_pets(&self) -> MochResult<Vec<Pet>> {
        let conn = self.database.conn()?;
        queries::list_pets(&conn)
    }

    pub fn list_reminders(&self, filter: &ReminderFilter) -> MochResult<Vec<Reminder>> {
        let conn = self.database.conn()?;
        queries::list_reminders(&conn, filter)
    }

    pub fn list_weight_entries(
        &self,
        pet_id: Id,
        direction: SortDirection,
    ) -> MochResult<Vec<WeightEntry>> {
        let conn = self.database.conn()?;
        queries::list_weight_entries(&conn, pet_id, direction)
    }

    /// A pet's reminders and weight history read from one snapshot, so a
    /// concurrent cascade is seen either not at all or in full.
    pub fn pet_records(&self, pet_id: Id) -> MochResult<(Vec<Reminder>, Vec<WeightEntry>)> {
        self.database.snapshot(|conn| {
            let reminders =
                queries::list_reminders(conn, &ReminderFilter::all().for_pet(pet_id))?;
            let weights = queries::list_weight_entries(conn, pet_id, SortDirection::Desc)?;
            Ok((reminders, weights))
        })
    }

    /// Start, end and change of a pet's weight history, from a fresh query.
    pub fn weight_summary(&self, pet_id: Id) -> MochResult<Option<WeightSummary>> {
        let entries = self.list_weight_entries(pet_id, SortDirection::Asc)?;
        Ok(progress::summarize(&entries))
    }
}

/// Events for a removal, in the order they are published.
fn removal_events(removal: &Removal) -> Vec<ChangeEvent> {
    removal
        .deleted
        .iter()
        .map(|r| ChangeEvent::new(*r, Operation::Deleted))
        .chain(
            removal
                .detached
                .iter()
                .map(|r| ChangeEvent::new(*r, Operation::Updated)),
        )
        .chain(std::iter::once(ChangeEvent::new(
            removal.target,
            Operation::Deleted,
        )))
        .collect()
}

impl Service for Store {
    fn name(&self) -> &str {
        "store"
    }

    fn state(&self) -> ServiceState {
        self.state
    }

    fn init(&mut self) -> MochResult<()> {
        match self.ensure_configuration() {
            Ok(_) => {
                self.state = ServiceState::Running;
                info!("store initialized");
                Ok(())
            }
            Err(e) => {
                self.state = ServiceState::Failed;
                error!("store initialization failed: {e}");
                Err(e)
            }
        }
    }

    fn shutdown(&mut self) -> MochResult<()> {
        self.state = ServiceState::Stopped;
        info!(
            "store shut down ({} subscriber(s) still registered)",
            self.bus.subscriber_count()
        );
        Ok(())
    }
}
