//! End-to-end runs through the service: trigger, background transfer,
//! publishing and the live event stream.

mod common;

use std::time::Duration;

use dtecflex::broadcast::{JobState, LiveFeed, ProgressChannel};
use dtecflex::db::{aux_repo, record_repo};
use dtecflex::lifecycle::RecordStatus;
use dtecflex::RunKey;

use common::harness::drain;
use common::{EntityBuilder, RecordBuilder, TestHarness};

fn crime_key() -> RunKey {
    RunKey::from_input(Some("20250904"), Some("CR")).unwrap()
}

#[test]
fn test_single_record_is_moved_and_published() {
    let h = TestHarness::new();
    let id = RecordBuilder::new("C20250904001").insert(&h.db);
    EntityBuilder::new("Fulano de Tal").cpf("12345678900").insert(&h.db, id);
    EntityBuilder::new("Beltrano").age(41).insert(&h.db, id);
    h.add_media_file("CR", "C20250904", "C20250904001.html");
    h.add_media_file("CR", "C20250904", "C20250904001_1.jpg");
    h.add_media_file("CR", "C20250904", "C20250904002.html");

    let (service, _channel) = h.service(&h.config().build());
    let response = service.trigger(Some("20250904"), Some("CR")).unwrap();
    service.wait_idle();

    let status = service.status(&response.job_id);
    assert_eq!(status.status, JobState::Success);
    let result = status.result.unwrap();
    assert_eq!(result["moved"], 1);
    assert_eq!(result["failed"], 0);
    assert_eq!(result["insertion"]["mode"], "inline");
    assert_eq!(result["insertion"]["inserted"], 2);

    let record = record_repo::find_by_id(&h.db, id).unwrap().unwrap();
    assert_eq!(record.status, RecordStatus::Published);
    assert!(record.transferred_at.is_some());
    assert_eq!(aux_repo::count_for_registration(&h.db, "C20250904001").unwrap(), 2);

    assert!(h.remote_file("CR", "C20250904", "C20250904001.html").exists());
    assert!(h.remote_file("CR", "C20250904", "C20250904001_1.jpg").exists());
    assert!(!h.remote_file("CR", "C20250904", "C20250904002.html").exists());
}

#[test]
fn test_progress_is_strictly_increasing_and_ends_at_summary() {
    let h = TestHarness::new();
    let id = RecordBuilder::new("C20250904001").insert(&h.db);
    EntityBuilder::new("Fulano").insert(&h.db, id);
    h.add_media_file("CR", "C20250904", "C20250904001.html");

    let (service, channel) = h.service(&h.config().build());
    let mut feed = LiveFeed::open(channel.clone(), &crime_key()).unwrap();
    service.trigger(Some("20250904"), Some("CR")).unwrap();
    service.wait_idle();

    let events = drain(&mut feed);
    let progress: Vec<&serde_json::Value> =
        events.iter().filter(|e| e["event"] == "PROGRESS").collect();
    let steps: Vec<u64> = progress.iter().map(|e| e["step"].as_u64().unwrap()).collect();
    assert_eq!(steps, vec![0, 1, 2, 3]);
    assert!(steps.windows(2).all(|w| w[0] < w[1]));

    let last = progress.last().unwrap();
    assert_eq!(last["state"], "SUMMARY");
    assert_eq!(last["step"], last["total"]);
    assert_eq!(last["progress"], 100);

    assert_eq!(events.first().unwrap()["event"], "STARTED");
    let done = events.last().unwrap();
    assert_eq!(done["event"], "DONE");
    assert_eq!(done["result"]["moved"], 1);
}

#[test]
fn test_record_without_files_fails_and_stays_approved() {
    let h = TestHarness::new();
    let id = RecordBuilder::new("C20250904001").insert(&h.db);
    EntityBuilder::new("Fulano").insert(&h.db, id);

    let (service, _channel) = h.service(&h.config().build());
    let response = service.trigger(Some("20250904"), Some("Crime")).unwrap();
    service.wait_idle();

    let result = service.status(&response.job_id).result.unwrap();
    assert_eq!(result["moved"], 0);
    assert_eq!(result["failed"], 1);
    assert_eq!(result["failed_records"][0]["record_id"], id);

    let record = record_repo::find_by_id(&h.db, id).unwrap().unwrap();
    assert_eq!(record.status, RecordStatus::Approved);
    assert_eq!(aux_repo::count_for_registration(&h.db, "C20250904001").unwrap(), 0);
}

#[test]
fn test_concurrent_trigger_for_same_key_is_rejected() {
    let h = TestHarness::new();
    let (service, channel) = h.service(&h.config().build());
    assert!(channel
        .acquire_lock(&crime_key().lock_name(), Duration::from_secs(60))
        .unwrap());

    let response = service.trigger(Some("20250904"), Some("CR")).unwrap();
    service.wait_idle();

    let status = service.status(&response.job_id);
    assert_eq!(status.status, JobState::Failure);
    assert!(status.error.unwrap().contains("already in progress"));

    channel.release_lock(&crime_key().lock_name()).unwrap();
    let response = service.trigger(Some("20250904"), Some("CR")).unwrap();
    service.wait_idle();
    assert_eq!(service.status(&response.job_id).status, JobState::Success);
}

#[test]
fn test_late_subscriber_receives_snapshot() {
    let h = TestHarness::new();
    let (service, _channel) = h.service(&h.config().build());
    service.trigger(Some("20250904"), Some("CR")).unwrap();
    service.wait_idle();

    let mut feed = service.subscribe(Some("20250904"), Some("CR")).unwrap();
    let snapshot: serde_json::Value = serde_json::from_str(&feed.try_next().unwrap()).unwrap();
    assert_eq!(snapshot["event"], "SNAPSHOT");
    assert_eq!(snapshot["state"], "DONE");
    assert_eq!(snapshot["progress"], 100);
    assert!(feed.try_next().is_none());
}

#[test]
fn test_queued_mode_publishes_through_workers() {
    let h = TestHarness::new();
    let id = RecordBuilder::new("C20250904001").insert(&h.db);
    EntityBuilder::new("Fulano").insert(&h.db, id);
    EntityBuilder::new("Beltrano").insert(&h.db, id);
    h.add_media_file("CR", "C20250904", "C20250904001.html");

    let (service, _channel) = h.service(&h.config().queued().build());
    let response = service.trigger(Some("20250904"), Some("CR")).unwrap();
    service.wait_idle();

    let result = service.status(&response.job_id).result.unwrap();
    assert_eq!(result["insertion"]["mode"], "queued");
    let unit_id = result["insertion"]["dispatched"][0]["unit_id"]
        .as_str()
        .unwrap()
        .to_string();

    let unit = service
        .jobs()
        .wait_for(&unit_id, Duration::from_secs(5))
        .unwrap();
    assert_eq!(unit.status, JobState::Success);
    assert_eq!(unit.result.unwrap()["inserted"], 2);

    service.shutdown();
    let record = record_repo::find_by_id(&h.db, id).unwrap().unwrap();
    assert_eq!(record.status, RecordStatus::Published);
    assert_eq!(aux_repo::count_for_registration(&h.db, "C20250904001").unwrap(), 2);
}

#[test]
fn test_other_category_records_are_not_selected() {
    let h = TestHarness::new();
    let crime = RecordBuilder::new("C20250904001").insert(&h.db);
    let env = RecordBuilder::new("A20250904001").category("Ambiental").insert(&h.db);
    h.add_media_file("CR", "C20250904", "C20250904001.html");
    h.add_media_file("SA", "A20250904", "A20250904001.html");

    let (service, _channel) = h.service(&h.config().build());
    service.trigger(Some("20250904"), Some("CR")).unwrap();
    service.wait_idle();

    let crime = record_repo::find_by_id(&h.db, crime).unwrap().unwrap();
    let env = record_repo::find_by_id(&h.db, env).unwrap().unwrap();
    assert_ne!(crime.status, RecordStatus::Approved);
    assert_eq!(env.status, RecordStatus::Approved);
}

#[test]
fn test_finished_runs_leave_no_topics_behind() {
    let h = TestHarness::new();
    let (service, channel) = h.service(&h.config().build());

    for day in 1..=20 {
        let date = format!("202509{:02}", day);
        let feed = service.subscribe(Some(date.as_str()), Some("CR")).unwrap();
        drop(feed);
        service.trigger(Some(date.as_str()), Some("CR")).unwrap();
    }
    service.wait_idle();
    assert_eq!(channel.topic_count(), 0);

    let mut feed = service.subscribe(Some("20250904"), Some("CR")).unwrap();
    assert_eq!(channel.topic_count(), 1);
    assert!(feed.try_next().is_some());
    drop(feed);
    assert_eq!(channel.topic_count(), 0);
}
