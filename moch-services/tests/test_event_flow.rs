//! End-to-end change notification tests.
//!
//! Tests the pipeline from store mutation to subscriber: scoped delivery,
//! event ordering for cascades, subscription release, re-entrant mutation
//! rejection, and deferring follow-up work through a channel subscription.

mod common;

use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use moch_core::error::MochError;
use moch_models::{EntityKind, Pet, PetType, Reminder, ReminderType, WeightEntry};
use moch_services::{Operation, Scope};

// ---- Scoped delivery ----

#[test]
fn pet_scoped_subscriber_sees_only_its_pet() {
    let (store, _dir) = common::create_test_store();
    let mochi = common::seed_pet(&store, "Mochi", PetType::Cat);
    let tofu = common::seed_pet(&store, "Tofu", PetType::Dog);
    let (_sub, seen) = common::record(store.bus(), Scope::pet(mochi.id()));

    store.insert(WeightEntry::new(&tofu, 20.0, common::date(2024, 1, 1))).unwrap();
    let mine = store.insert(WeightEntry::new(&mochi, 4.0, common::date(2024, 1, 1))).unwrap();
    store
        .insert(Reminder::new("Unassigned", Utc::now(), ReminderType::Other))
        .unwrap();
    store.update::<Pet, _>(mochi.id(), |p| p.name = "Mochi II".into()).unwrap();
    store.update::<Pet, _>(tofu.id(), |p| p.name = "Tofu II".into()).unwrap();

    let events = seen.lock().unwrap();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.related_pet_id == Some(mochi.id())));
    assert_eq!(events[0].id, mine);
    assert_eq!(events[0].kind, EntityKind::WeightEntry);
    assert_eq!(events[1].kind, EntityKind::Pet);
    assert_eq!(events[1].operation, Operation::Updated);
}

#[test]
fn kind_scoped_subscriber_filters_by_kind() {
    let (store, _dir) = common::create_test_store();
    let (_sub, seen) = common::record(store.bus(), Scope::kind(EntityKind::Reminder));

    let pet = common::seed_pet(&store, "Mochi", PetType::Cat);
    let id = store
        .insert(Reminder::new("Vet", Utc::now(), ReminderType::VetVisit).for_pet(pet.id()))
        .unwrap();
    store.toggle_reminder(id).unwrap();

    let ops: Vec<_> = seen.lock().unwrap().iter().map(|e| e.operation).collect();
    assert_eq!(ops, vec![Operation::Created, Operation::Updated]);
}

#[test]
fn events_arrive_before_mutation_returns() {
    let (store, _dir) = common::create_test_store();
    let (_sub, seen) = common::record(store.bus(), Scope::all());

    let pet = common::seed_pet(&store, "Mochi", PetType::Cat);
    assert_eq!(seen.lock().unwrap().len(), 1);

    store.insert(WeightEntry::new(&pet, 4.0, common::date(2024, 2, 1))).unwrap();
    assert_eq!(seen.lock().unwrap().len(), 2);
}

// ---- Cascade ordering ----

#[test]
fn pet_delete_publishes_dependents_before_pet() {
    let (store, _dir) = common::create_test_store();
    let pet = common::seed_pet(&store, "Mochi", PetType::Cat);
    let w1 = store.insert(WeightEntry::new(&pet, 4.0, common::date(2024, 1, 1))).unwrap();
    let w2 = store.insert(WeightEntry::new(&pet, 4.2, common::date(2024, 2, 1))).unwrap();
    let at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
    let r = store
        .insert(Reminder::new("Vet", at, ReminderType::VetVisit).for_pet(pet.id()))
        .unwrap();

    let (_sub, seen) = common::record(store.bus(), Scope::pet(pet.id()));
    store.delete::<Pet>(pet.id()).unwrap();

    let events = seen.lock().unwrap().clone();
    assert_eq!(events.len(), 4);

    let mut deleted_weights: Vec<_> = events[..2].iter().map(|e| e.id).collect();
    deleted_weights.sort();
    let mut expected = vec![w1, w2];
    expected.sort();
    assert_eq!(deleted_weights, expected);
    assert!(events[..2]
        .iter()
        .all(|e| e.kind == EntityKind::WeightEntry && e.operation == Operation::Deleted));

    assert_eq!(events[2].id, r);
    assert_eq!(events[2].operation, Operation::Updated);
    assert_eq!(events[2].related_pet_id, Some(pet.id()));

    assert_eq!(events[3].kind, EntityKind::Pet);
    assert_eq!(events[3].operation, Operation::Deleted);
}

#[test]
fn failed_mutation_publishes_nothing() {
    let (store, _dir) = common::create_test_store();
    let (_sub, seen) = common::record(store.bus(), Scope::all());

    let pet = common::seed_pet(&store, "Mochi", PetType::Cat);
    let _ = store.insert(WeightEntry::new(&pet, 0.0, common::date(2024, 1, 1)));
    let _ = store.delete::<Pet>(uuid::Uuid::new_v4());

    assert_eq!(seen.lock().unwrap().len(), 1);
}

// ---- Subscription lifecycle ----

#[test]
fn released_subscription_stops_receiving() {
    let (store, _dir) = common::create_test_store();
    let (sub, seen) = common::record(store.bus(), Scope::all());

    common::seed_pet(&store, "Mochi", PetType::Cat);
    sub.release();
    common::seed_pet(&store, "Tofu", PetType::Dog);

    assert_eq!(seen.lock().unwrap().len(), 1);
    assert_eq!(store.bus().subscriber_count(), 0);
}

// ---- Re-entrancy and deferred work ----

#[test]
fn mutation_from_handler_is_rejected() {
    let (store, _dir) = common::create_test_store();
    let store = Arc::new(store);
    let outcomes: Arc<Mutex<Vec<bool>>> = Arc::new(Mutex::new(Vec::new()));

    let weak = Arc::downgrade(&store);
    let sink = Arc::clone(&outcomes);
    let _sub = store.bus().subscribe(Scope::kind(EntityKind::Pet), move |event| {
        if let Some(store) = weak.upgrade() {
            // Reads are fine from a handler
            assert!(store.get::<Pet>(event.id).unwrap().is_some());
            let result = store.insert(Pet::new("Echo", common::date(2022, 1, 1), PetType::Dog));
            sink.lock().unwrap().push(matches!(result, Err(MochError::Reentrant)));
        }
    });

    common::seed_pet(&store, "Mochi", PetType::Cat);

    assert_eq!(*outcomes.lock().unwrap(), vec![true]);
    assert_eq!(store.list_pets().unwrap().len(), 1);
}

#[tokio::test]
async fn channel_subscription_defers_follow_up_mutation() {
    let (store, _dir) = common::create_test_store();
    let (_sub, mut rx) = store.bus().subscribe_channel(Scope::kind(EntityKind::Pet));

    let pet = common::seed_pet(&store, "Mochi", PetType::Cat);

    let event = rx.recv().await.unwrap();
    assert_eq!(event.id, pet.id());
    assert_eq!(event.operation, Operation::Created);

    // Outside the handler, the follow-up write goes through
    store
        .insert(WeightEntry::for_pet_id(event.id, 3.9, common::date(2024, 4, 1)))
        .unwrap();
    assert_eq!(store.weight_summary(pet.id()).unwrap().unwrap().change, 0.0);
}
