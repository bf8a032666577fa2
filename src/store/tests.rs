use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use super::{DataStore, StoreError};
use crate::data::DataType;
use crate::type_registry::TypeRegistry;
use crate::types::{DataKind, GroupKind};

const MOTION: GroupKind = GroupKind::new("motion");

#[derive(Clone, Default, Serialize, PartialEq, Debug)]
struct JointCommand {
    angles: Vec<f32>,
}
impl DataType for JointCommand {
    const KIND: DataKind = DataKind::new("JointCommand");
}

#[derive(Clone, Default, Serialize, PartialEq, Debug)]
struct FallState {
    fallen: bool,
}
impl DataType for FallState {
    const KIND: DataKind = DataKind::new("FallState");
}

fn store() -> DataStore {
    let types = TypeRegistry::builder()
        .with::<JointCommand>()
        .with::<FallState>()
        .build()
        .unwrap();
    DataStore::new(MOTION, Arc::new(types))
}

#[test]
fn get_returns_default_before_any_write() {
    let mut store = store();
    store.declare_dependency::<JointCommand>().unwrap();
    assert_eq!(*store.get::<JointCommand>().unwrap(), JointCommand::default());
}

#[test]
fn get_returns_the_most_recent_value() {
    let mut store = store();
    let production = store.produce::<JointCommand>("JointCommandProvider").unwrap();

    production.set(JointCommand {
        angles: vec![0.1, 0.2],
    });
    assert_eq!(store.get::<JointCommand>().unwrap().angles, vec![0.1, 0.2]);

    production.update(|command| command.angles.push(0.3));
    assert_eq!(
        store.get::<JointCommand>().unwrap().angles,
        vec![0.1, 0.2, 0.3]
    );
}

#[test]
fn duplicate_production_fails() {
    let mut store = store();
    store.produce::<JointCommand>("MotionDispatcher").unwrap();
    let err = store.produce::<JointCommand>("KickProvider").unwrap_err();
    match err {
        StoreError::DuplicateProduction { kind, first, second } => {
            assert_eq!(kind, JointCommand::KIND);
            assert_eq!(first, "MotionDispatcher");
            assert_eq!(second, "KickProvider");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn get_without_a_slot_is_an_error() {
    let store = store();
    assert!(matches!(
        store.get::<FallState>(),
        Err(StoreError::MissingSlot { .. })
    ));
}

#[test]
fn unregistered_kind_is_rejected() {
    #[derive(Clone, Default, Serialize)]
    struct Unlisted;
    impl DataType for Unlisted {
        const KIND: DataKind = DataKind::new("Unlisted");
    }

    let mut store = store();
    assert!(matches!(
        store.produce::<Unlisted>("Whatever"),
        Err(StoreError::UnregisteredKind { kind }) if kind == Unlisted::KIND
    ));
}

#[test]
fn request_is_idempotent_and_allocates_the_slot() {
    let mut store = store();
    store.request(FallState::KIND).unwrap();
    store.request(FallState::KIND).unwrap();

    assert_eq!(store.requested_kinds().count(), 1);
    assert!(store.slot(FallState::KIND).is_some());
    assert!(!store.produces(FallState::KIND));
}

#[test]
fn dependency_freshness_tracks_publications() {
    let mut store = store();
    let dependency = store.declare_dependency::<FallState>().unwrap();
    let production = store.produce::<FallState>("BodyPoseEstimation").unwrap();

    assert!(!dependency.fresh());

    production.set(FallState { fallen: true });
    assert!(dependency.fresh());
    assert!(!dependency.fresh());
    assert!(dependency.read().fallen);

    production.set(FallState { fallen: false });
    assert!(dependency.fresh());
}

#[test]
fn debug_values_serialize_all_slots() {
    let mut store = store();
    let production = store.produce::<FallState>("BodyPoseEstimation").unwrap();
    production.set(FallState { fallen: true });

    let values = store.debug_values();
    assert_eq!(values.get("FallState"), Some(&json!({ "fallen": true })));
}
