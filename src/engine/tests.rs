use super::*;
use super::stats::ParticipantStats;
use crate::store::models::{ParticipationStatus, RideStatus, RIDE, USER};
use crate::store::store_utils::from_record;
use crate::store::EntityStore;

use rand::{Rng, SeedableRng, rngs::StdRng};
use std::collections::HashSet;

const DEPARTURE: &str = "2024-07-20T08:00:00";

fn engine_with_riders() -> RideEngine {
    let mut engine = RideEngine::new(EntityStore::in_memory());
    engine.create_user("d1", "Dana", Some("ABC-123".to_string())).unwrap();
    for alias in ["r1", "r2", "r3"] {
        engine.create_user(alias, "Rider", None).unwrap();
    }
    engine
}

fn present(aliases: &[&str]) -> HashSet<String> {
    aliases.iter().map(|a| a.to_string()).collect()
}

fn stored_ride(engine: &RideEngine, id: u64) -> crate::store::models::Ride {
    let record = engine
        .store()
        .get(RIDE)
        .unwrap()
        .iter()
        .find(|r| r.get("id").and_then(|v| v.as_u64()) == Some(id))
        .cloned()
        .unwrap();
    from_record(&record).unwrap()
}

#[test]
fn full_ride_scenario() {
    let mut engine = engine_with_riders();
    let ride = engine.create_ride(DEPARTURE, "Downtown Office", 2, "d1").unwrap();
    assert_eq!(ride.id, 1);
    assert_eq!(ride.status, RideStatus::Ready);

    let waiting = engine.request_to_join("d1", 1, "r1", "Main St", 1).unwrap();
    assert_eq!(waiting.status, ParticipationStatus::Waiting);
    assert!(waiting.confirmation.is_none());

    let confirmed = engine.accept_participant("d1", 1, "r1").unwrap();
    assert_eq!(confirmed.status, ParticipationStatus::Confirmed);
    assert!(confirmed.confirmation.is_some());

    let refused = engine.request_to_join("d1", 1, "r2", "Elm St", 2);
    assert!(matches!(refused, Err(RideError::BusinessRuleViolation(_))));

    let started = engine.start_ride("d1", 1, &present(&["r1"])).unwrap();
    assert_eq!(started.status, RideStatus::InProgress);
    assert_eq!(started.participation("r1").unwrap().status, ParticipationStatus::InProgress);

    let unloaded = engine.unload_participant("d1", 1, "r1").unwrap();
    assert_eq!(unloaded.status, ParticipationStatus::Completed);

    let ended = engine.end_ride("d1", 1).unwrap();
    assert_eq!(ended.status, RideStatus::Completed);
    assert!(ended.participants.iter().all(|p| p.status != ParticipationStatus::InProgress));
    assert_eq!(ended.participation("r1").unwrap().status, ParticipationStatus::Completed);

    // the store holds what the engine returned
    assert_eq!(stored_ride(&engine, 1), ended);
}

#[test]
fn create_ride_validates_input() {
    let mut engine = engine_with_riders();

    let missing_driver = engine.create_ride(DEPARTURE, "Downtown", 2, "ghost");
    assert!(matches!(missing_driver, Err(RideError::NotFound(_))));

    let no_space = engine.create_ride(DEPARTURE, "Downtown", 0, "d1");
    assert!(matches!(no_space, Err(RideError::InvalidInput(_))));

    let bad_date = engine.create_ride("next tuesday", "Downtown", 2, "d1");
    assert!(matches!(bad_date, Err(RideError::InvalidInput(_))));

    let no_address = engine.create_ride(DEPARTURE, "  ", 2, "d1");
    assert!(matches!(no_address, Err(RideError::InvalidInput(_))));

    assert_eq!(engine.store().get(RIDE).unwrap().len(), 0);
}

#[test]
fn ride_ids_are_sequential() {
    let mut engine = engine_with_riders();
    let first = engine.create_ride(DEPARTURE, "A", 1, "d1").unwrap();
    let second = engine.create_ride("2024-07-21T09:30:00+02:00", "B", 3, "r1").unwrap();
    assert_eq!((first.id, second.id), (1, 2));
    assert_eq!(engine.list_rides_for_driver("d1").unwrap().len(), 1);
    assert_eq!(engine.list_rides_for_driver("r1").unwrap()[0].final_address, "B");
    assert!(engine.list_rides_for_driver("r3").unwrap().is_empty());
}

#[test]
fn join_requires_positive_spaces() {
    let mut engine = engine_with_riders();
    engine.create_ride(DEPARTURE, "Downtown", 2, "d1").unwrap();

    for spaces in [0, -1] {
        let result = engine.request_to_join("d1", 1, "r1", "Main St", spaces);
        assert!(matches!(result, Err(RideError::InvalidInput(_))));
    }
    let no_destination = engine.request_to_join("d1", 1, "r1", "", 1);
    assert!(matches!(no_destination, Err(RideError::InvalidInput(_))));
}

#[test]
fn join_needs_existing_ride_and_participant() {
    let mut engine = engine_with_riders();
    engine.create_ride(DEPARTURE, "Downtown", 2, "d1").unwrap();

    let wrong_ride = engine.request_to_join("d1", 9, "r1", "Main St", 1);
    assert!(matches!(wrong_ride, Err(RideError::NotFound(_))));

    let wrong_driver = engine.request_to_join("r2", 1, "r1", "Main St", 1);
    assert!(matches!(wrong_driver, Err(RideError::NotFound(_))));

    let ghost = engine.request_to_join("d1", 1, "ghost", "Main St", 1);
    assert!(matches!(ghost, Err(RideError::NotFound(_))));
}

#[test]
fn one_participation_per_alias() {
    let mut engine = engine_with_riders();
    engine.create_ride(DEPARTURE, "Downtown", 4, "d1").unwrap();
    engine.request_to_join("d1", 1, "r1", "Main St", 1).unwrap();
    engine.reject_participant("d1", 1, "r1").unwrap();

    // even after a rejection
    let again = engine.request_to_join("d1", 1, "r1", "Main St", 1);
    assert!(matches!(again, Err(RideError::BusinessRuleViolation(_))));
    assert_eq!(stored_ride(&engine, 1).participants.len(), 1);
}

#[test]
fn join_counts_every_request() {
    let mut engine = engine_with_riders();
    engine.create_ride(DEPARTURE, "Downtown", 2, "d1").unwrap();
    engine.request_to_join("d1", 1, "r1", "Main St", 1).unwrap();
    engine.reject_participant("d1", 1, "r1").unwrap();
    engine.request_to_join("d1", 1, "r2", "Main St", 1).unwrap();

    let full = engine.request_to_join("d1", 1, "r3", "Main St", 1);
    assert!(matches!(full, Err(RideError::BusinessRuleViolation(_))));
}

#[test]
fn join_on_started_ride_fails() {
    let mut engine = engine_with_riders();
    engine.create_ride(DEPARTURE, "Downtown", 3, "d1").unwrap();
    engine.start_ride("d1", 1, &present(&[])).unwrap();

    let late = engine.request_to_join("d1", 1, "r1", "Main St", 1);
    assert!(matches!(late, Err(RideError::BusinessRuleViolation(_))));

    engine.end_ride("d1", 1).unwrap();
    let later = engine.request_to_join("d1", 1, "r1", "Main St", 1);
    assert!(matches!(later, Err(RideError::BusinessRuleViolation(_))));
}

#[test]
fn accept_twice_fails() {
    let mut engine = engine_with_riders();
    engine.create_ride(DEPARTURE, "Downtown", 2, "d1").unwrap();
    engine.request_to_join("d1", 1, "r1", "Main St", 1).unwrap();
    engine.accept_participant("d1", 1, "r1").unwrap();

    let twice = engine.accept_participant("d1", 1, "r1");
    assert!(matches!(twice, Err(RideError::BusinessRuleViolation(_))));

    let reject_confirmed = engine.reject_participant("d1", 1, "r1");
    assert!(matches!(reject_confirmed, Err(RideError::BusinessRuleViolation(_))));
}

#[test]
fn accept_unknown_participant_is_not_found() {
    let mut engine = engine_with_riders();
    engine.create_ride(DEPARTURE, "Downtown", 2, "d1").unwrap();

    let result = engine.accept_participant("d1", 1, "nobody");
    assert!(matches!(result, Err(RideError::NotFound(_))));
    let result = engine.reject_participant("d1", 1, "r2");
    assert!(matches!(result, Err(RideError::NotFound(_))));
}

#[test]
fn start_with_waiting_request_fails() {
    let mut engine = engine_with_riders();
    engine.create_ride(DEPARTURE, "Downtown", 2, "d1").unwrap();
    engine.request_to_join("d1", 1, "r1", "Main St", 1).unwrap();

    let result = engine.start_ride("d1", 1, &present(&["r1"]));
    assert!(matches!(result, Err(RideError::BusinessRuleViolation(_))));
    assert_eq!(stored_ride(&engine, 1).status, RideStatus::Ready);
}

#[test]
fn start_records_no_shows() {
    let mut engine = engine_with_riders();
    engine.create_ride(DEPARTURE, "Downtown", 3, "d1").unwrap();
    for alias in ["r1", "r2", "r3"] {
        engine.request_to_join("d1", 1, alias, "Main St", 1).unwrap();
    }
    engine.accept_participant("d1", 1, "r1").unwrap();
    engine.accept_participant("d1", 1, "r2").unwrap();
    engine.reject_participant("d1", 1, "r3").unwrap();

    // r3 showing up does not put a rejected rider aboard
    let ride = engine.start_ride("d1", 1, &present(&["r1", "r3"])).unwrap();
    assert_eq!(ride.participation("r1").unwrap().status, ParticipationStatus::InProgress);
    assert_eq!(ride.participation("r2").unwrap().status, ParticipationStatus::Missing);
    assert_eq!(ride.participation("r3").unwrap().status, ParticipationStatus::Rejected);

    let twice = engine.start_ride("d1", 1, &present(&[]));
    assert!(matches!(twice, Err(RideError::BusinessRuleViolation(_))));
}

#[test]
fn end_marks_riders_still_aboard() {
    let mut engine = engine_with_riders();
    engine.create_ride(DEPARTURE, "Downtown", 3, "d1").unwrap();
    for alias in ["r1", "r2"] {
        engine.request_to_join("d1", 1, alias, "Main St", 1).unwrap();
        engine.accept_participant("d1", 1, alias).unwrap();
    }

    let too_early = engine.end_ride("d1", 1);
    assert!(matches!(too_early, Err(RideError::BusinessRuleViolation(_))));
    let unload_early = engine.unload_participant("d1", 1, "r1");
    assert!(matches!(unload_early, Err(RideError::BusinessRuleViolation(_))));

    engine.start_ride("d1", 1, &present(&["r1", "r2"])).unwrap();
    engine.unload_participant("d1", 1, "r1").unwrap();

    let unload_again = engine.unload_participant("d1", 1, "r1");
    assert!(matches!(unload_again, Err(RideError::BusinessRuleViolation(_))));

    let ride = engine.end_ride("d1", 1).unwrap();
    assert_eq!(ride.participation("r1").unwrap().status, ParticipationStatus::Completed);
    assert_eq!(ride.participation("r2").unwrap().status, ParticipationStatus::NotMarked);

    let end_twice = engine.end_ride("d1", 1);
    assert!(matches!(end_twice, Err(RideError::BusinessRuleViolation(_))));
}

#[test]
fn stats_for_unknown_alias_are_zero() {
    let engine = engine_with_riders();
    assert_eq!(engine.compute_participant_stats("nobody").unwrap(), ParticipantStats::default());
}

#[test]
fn stats_span_every_ride() {
    let mut engine = engine_with_riders();

    // ride 1: r1 completes, r2 stays aboard
    engine.create_ride(DEPARTURE, "A", 2, "d1").unwrap();
    for alias in ["r1", "r2"] {
        engine.request_to_join("d1", 1, alias, "Main St", 1).unwrap();
        engine.accept_participant("d1", 1, alias).unwrap();
    }
    engine.start_ride("d1", 1, &present(&["r1", "r2"])).unwrap();
    engine.unload_participant("d1", 1, "r1").unwrap();
    engine.end_ride("d1", 1).unwrap();

    // ride 2: r1 missing, r2 rejected
    engine.create_ride(DEPARTURE, "B", 2, "d1").unwrap();
    for alias in ["r1", "r2"] {
        engine.request_to_join("d1", 2, alias, "Main St", 1).unwrap();
    }
    engine.accept_participant("d1", 2, "r1").unwrap();
    engine.reject_participant("d1", 2, "r2").unwrap();
    engine.start_ride("d1", 2, &present(&[])).unwrap();

    let r1 = engine.compute_participant_stats("r1").unwrap();
    assert_eq!(r1, ParticipantStats { total: 2, completed: 1, missing: 1, notmarked: 0, rejected: 0 });

    let r2 = engine.compute_participant_stats("r2").unwrap();
    assert_eq!(r2, ParticipantStats { total: 2, completed: 0, missing: 0, notmarked: 1, rejected: 1 });

    let detail = engine.get_ride_detail("d1", 2).unwrap();
    assert_eq!(detail.driver, "d1");
    assert_eq!(detail.participants[0].participant.previous_rides_total, 2);
    assert_eq!(detail.participants[1].participant.previous_rides_rejected, 1);
}

#[test]
fn users_are_unique_and_complete() {
    let mut engine = engine_with_riders();

    let duplicate = engine.create_user("r1", "Someone", None);
    assert!(matches!(duplicate, Err(RideError::BusinessRuleViolation(_))));

    let nameless = engine.create_user("r9", " ", None);
    assert!(matches!(nameless, Err(RideError::InvalidInput(_))));

    assert_eq!(engine.list_users().unwrap().len(), 4);
    assert_eq!(engine.get_user("d1").unwrap().car_plate.as_deref(), Some("ABC-123"));
    assert!(matches!(engine.get_user("r9"), Err(RideError::NotFound(_))));
    assert_eq!(engine.store().get(USER).unwrap().len(), 4);
}

#[test]
fn failed_persist_rolls_back() {
    let dir = std::env::temp_dir().join(format!("ridepool-engine-{}", rand::random::<u64>()));
    std::fs::create_dir_all(&dir).unwrap();

    let mut engine = RideEngine::new(EntityStore::open(dir.join("data.json")).unwrap());
    engine.create_user("d1", "Dana", None).unwrap();
    engine.create_user("r1", "Rui", None).unwrap();
    engine.create_ride(DEPARTURE, "Downtown", 2, "d1").unwrap();

    std::fs::remove_dir_all(&dir).unwrap();

    let join = engine.request_to_join("d1", 1, "r1", "Main St", 1);
    assert!(matches!(join, Err(RideError::Storage(_))));
    assert!(stored_ride(&engine, 1).participants.is_empty());

    let user = engine.create_user("r2", "Rex", None);
    assert!(matches!(user, Err(RideError::Storage(_))));
    assert!(matches!(engine.get_user("r2"), Err(RideError::NotFound(_))));

    let ride = engine.create_ride(DEPARTURE, "Uptown", 2, "d1");
    assert!(matches!(ride, Err(RideError::Storage(_))));
    assert_eq!(engine.store().get(RIDE).unwrap().len(), 1);
}

#[test]
fn accept_rechecks_confirmed_seats() {
    // a ride loaded with more waiting seats than it can hold
    let mut engine = engine_with_riders();
    let mut ride = engine.create_ride(DEPARTURE, "Downtown", 2, "d1").unwrap();
    for alias in ["r1", "r2"] {
        ride.request_seat(engine.get_user(alias).unwrap(), "Main St".to_string(), 1).unwrap();
    }
    ride.allowed_spaces = 1;

    let now = chrono::Local::now().naive_local();
    ride.accept("r1", now).unwrap();
    let second = ride.accept("r2", now);
    assert!(matches!(second, Err(RideError::BusinessRuleViolation(_))));
    assert_eq!(ride.participation("r2").unwrap().status, ParticipationStatus::Waiting);
    assert!(ride.held_spaces() <= ride.allowed_spaces);
}

#[test]
fn capacity_holds_under_random_operations() {
    let mut rng = StdRng::seed_from_u64(7);
    let riders: Vec<String> = (0..8).map(|i| format!("p{}", i)).collect();

    for round in 0..20 {
        let mut engine = RideEngine::new(EntityStore::in_memory());
        engine.create_user("d1", "Dana", None).unwrap();
        for alias in &riders {
            engine.create_user(alias, "Rider", None).unwrap();
        }
        let capacity = rng.gen_range(1..5);
        engine.create_ride(DEPARTURE, "Downtown", capacity, "d1").unwrap();

        for _ in 0..30 {
            let alias = &riders[rng.gen_range(0..riders.len())];
            let _ = match rng.gen_range(0..3) {
                0 => engine.request_to_join("d1", 1, alias, "Main St", rng.gen_range(-1..3)).map(|_| ()),
                1 => engine.accept_participant("d1", 1, alias).map(|_| ()),
                _ => engine.reject_participant("d1", 1, alias).map(|_| ()),
            };

            let ride = stored_ride(&engine, 1);
            assert!(ride.held_spaces() <= ride.allowed_spaces, "round {}", round);
            let aliases: HashSet<&str> = ride.participants.iter().map(|p| p.participant.alias.as_str()).collect();
            assert_eq!(aliases.len(), ride.participants.len());
        }
    }
}

#[test]
fn finished_states_can_no_longer_change() {
    let mut engine = engine_with_riders();
    engine.create_ride(DEPARTURE, "Downtown", 3, "d1").unwrap();
    engine.request_to_join("d1", 1, "r1", "Main St", 1).unwrap();
    engine.reject_participant("d1", 1, "r1").unwrap();

    match engine.accept_participant("d1", 1, "r1") {
        Err(RideError::BusinessRuleViolation(reason)) => assert!(reason.contains("can no longer change")),
        other => panic!("unexpected {:?}", other.map(|p| p.status)),
    }

    engine.start_ride("d1", 1, &present(&[])).unwrap();
    engine.end_ride("d1", 1).unwrap();
    match engine.end_ride("d1", 1) {
        Err(RideError::BusinessRuleViolation(reason)) => assert!(reason.contains("completed and can no longer change")),
        other => panic!("unexpected {:?}", other.map(|r| r.status)),
    }
    assert!(RideStatus::Completed.is_terminal());
    assert!(!ParticipationStatus::Confirmed.is_terminal());
}

#[test]
fn offset_timestamps_do_not_break_reads() {
    let path = std::env::temp_dir().join(format!("ridepool-engine-{}.json", rand::random::<u64>()));
    let document = serde_json::json!({
        "User": [{"alias": "d1", "name": "Dana", "car_plate": "ABC-123"}],
        "Ride": [{
            "id": 1,
            "rideDateAndTime": "2024-07-20T08:00:00+02:00",
            "finalAddress": "Downtown",
            "allowedSpaces": 2,
            "rideDriver": {"alias": "d1", "name": "Dana", "car_plate": "ABC-123"},
            "status": "ready",
            "participants": []
        }]
    });
    std::fs::write(&path, document.to_string()).unwrap();

    let engine = RideEngine::new(EntityStore::open(&path).unwrap());
    assert_eq!(engine.compute_participant_stats("nobody").unwrap(), ParticipantStats::default());
    let rides = engine.list_rides_for_driver("d1").unwrap();
    assert_eq!(rides.len(), 1);
    assert_eq!(rides[0].ride_date_and_time.to_string(), "2024-07-20 08:00:00");

    let _ = std::fs::remove_file(&path);
}
