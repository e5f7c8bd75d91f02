//! End-to-end sweeps against mock provider servers.
//!
//! Real HTTP strategies, real local store, in-memory notifier.

use std::time::Duration;

use serde_json::json;
use slot_monitor::engine::{Engine, ProviderOutcome};
use slot_monitor::models::{Availability, Config, ProviderEntry};
use slot_monitor::notify::MemoryNotifier;
use slot_monitor::pipeline::{Scheduler, StopReason};
use slot_monitor::registry::Registry;
use slot_monitor::services::{PhraseMatcher, Strategies, VendorApi};
use slot_monitor::storage::{LocalStore, StatusStore};
use slot_monitor::utils::http::create_async_client;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.http.timeout_secs = 2;
    config.vendors.cvs_url_template = format!("{}/cvs/{{state}}.json", server.uri());
    config.vendors.heb_url = format!("{}/heb/locations.json", server.uri());
    config
}

fn engine(
    config: Config,
    entries: serde_json::Value,
    tmp: &TempDir,
    notifier: &MemoryNotifier,
) -> Engine {
    let entries: Vec<ProviderEntry> = serde_json::from_value(entries).unwrap();
    let registry = Registry::from_entries(&entries, "websites.json").unwrap();
    let client = create_async_client(&config.http).unwrap();
    let strategies = Strategies::new()
        .with(PhraseMatcher::new(client.clone()))
        .with(VendorApi::new(client, config.vendors.clone()));
    Engine::new(
        config,
        &registry,
        strategies,
        Box::new(notifier.clone()),
        Box::new(LocalStore::new(tmp.path())),
    )
}

/// Empty positive phrase, negative phrase present: no change, no message.
#[tokio::test]
async fn test_sold_out_page_stays_probably_not() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clinic"))
        .respond_with(ResponseTemplate::new(200).set_body_string("everything is sold out today"))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let notifier = MemoryNotifier::new();
    let mut engine = engine(
        config_for(&server),
        json!([{
            "name": "Clinic",
            "website": format!("{}/clinic", server.uri()),
            "pos_phrase": "",
            "neg_phrase": "sold out"
        }]),
        &tmp,
        &notifier,
    );

    let report = engine.sweep().await.unwrap();
    assert_eq!(
        report.outcomes[0].1,
        ProviderOutcome::Classified {
            status: Availability::ProbablyNot,
            transition: slot_monitor::pipeline::TransitionOutcome::Unchanged,
        }
    );
    assert!(notifier.messages().is_empty());

    let stored = LocalStore::new(tmp.path()).load_current().await.unwrap().unwrap();
    assert_eq!(stored[0].status, Availability::ProbablyNot);
    assert_eq!(stored[0].update_time, "");
}

#[tokio::test]
async fn test_mixed_providers_in_one_sweep() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clinic"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<!-- you confirm your understanding --><p>Slots open: you confirm your understanding</p>",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cvs/TX.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "responsePayloadData": {
                "data": {
                    "TX": [{"city": "SAN ANTONIO", "status": "Fully Booked"}]
                }
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/heb/locations.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "locations": [
                {"city": "SAN ANTONIO", "openTimeslots": 0},
                {"city": "SAN ANTONIO", "openTimeslots": 3}
            ]
        })))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let notifier = MemoryNotifier::new();
    let mut engine = engine(
        config_for(&server),
        json!([
            {
                "name": "UT Health",
                "website": format!("{}/clinic", server.uri()),
                "pos_phrase": "you confirm your understanding",
                "neg_phrase": "are full"
            },
            {"name": "CVS San Antonio", "state": "tx", "city": "SAN ANTONIO"},
            {"name": "HEB San Antonio", "city": "SAN ANTONIO"},
            {"name": "CVS Waco", "state": "TX", "city": "WACO"}
        ]),
        &tmp,
        &notifier,
    );

    let report = engine.sweep().await.unwrap();
    assert_eq!(report.changed(), 2);
    assert_eq!(
        notifier.messages(),
        vec![
            "UT Health changed to probably",
            "HEB San Antonio changed to maybe"
        ]
    );
    assert_eq!(
        engine.state().get("CVS Waco").unwrap().status,
        Availability::ProbablyNot
    );

    // Only the page provider has evidence to keep.
    let evidence: Vec<_> = std::fs::read_dir(tmp.path().join("archive"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with("UT_Health.html."))
        .collect();
    assert_eq!(evidence.len(), 1);

    // A second identical sweep is silent.
    engine.sweep().await.unwrap();
    assert_eq!(notifier.messages().len(), 2);
}

#[tokio::test]
async fn test_server_error_keeps_state_and_bad_json_is_probably_not() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clinic"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/heb/locations.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let notifier = MemoryNotifier::new();
    let mut engine = engine(
        config_for(&server),
        json!([
            {
                "name": "Clinic",
                "website": format!("{}/clinic", server.uri()),
                "neg_phrase": "are full",
                "status": "probably"
            },
            {"name": "HEB", "city": "SAN ANTONIO", "status": "maybe"}
        ]),
        &tmp,
        &notifier,
    );

    let report = engine.sweep().await.unwrap();
    assert_eq!(report.skipped(), 1);
    assert_eq!(
        engine.state().get("Clinic").unwrap().status,
        Availability::Probably
    );
    assert_eq!(
        engine.state().get("HEB").unwrap().status,
        Availability::ProbablyNot
    );
    assert_eq!(notifier.messages(), vec!["HEB changed to probably not"]);
}

#[tokio::test]
async fn test_scheduler_stops_after_max_sweeps_without_sleeping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clinic"))
        .respond_with(ResponseTemplate::new(200).set_body_string("are full"))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let notifier = MemoryNotifier::new();
    let mut config = config_for(&server);
    config.schedule.max_sweeps = 1;
    let mut engine = engine(
        config,
        json!([{"name": "Clinic", "website": format!("{}/clinic", server.uri()), "neg_phrase": "are full"}]),
        &tmp,
        &notifier,
    );

    let mut scheduler = Scheduler::new(&engine.config().schedule).with_seed(1);
    let started = std::time::Instant::now();
    let reason = scheduler
        .run(&mut engine, std::future::pending::<()>())
        .await
        .unwrap();

    assert_eq!(reason, StopReason::Completed { sweeps: 1 });
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_scheduler_interrupts_during_sleep() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clinic"))
        .respond_with(ResponseTemplate::new(200).set_body_string("are full"))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let notifier = MemoryNotifier::new();
    let mut engine = engine(
        config_for(&server),
        json!([{"name": "Clinic", "website": format!("{}/clinic", server.uri()), "neg_phrase": "are full"}]),
        &tmp,
        &notifier,
    );

    let mut scheduler = Scheduler::new(&engine.config().schedule).with_seed(1);
    let reason = scheduler
        .run(&mut engine, tokio::time::sleep(Duration::from_millis(300)))
        .await
        .unwrap();

    assert_eq!(reason, StopReason::Interrupted);
    assert_eq!(engine.sweep_count(), 1);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_scheduler_honors_pending_interrupt_before_first_sweep() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();
    let notifier = MemoryNotifier::new();
    let mut engine = engine(
        config_for(&server),
        json!([{"name": "Clinic", "website": format!("{}/clinic", server.uri()), "neg_phrase": "are full"}]),
        &tmp,
        &notifier,
    );

    let mut scheduler = Scheduler::new(&engine.config().schedule);
    let reason = scheduler
        .run(&mut engine, std::future::ready(()))
        .await
        .unwrap();

    assert_eq!(reason, StopReason::Interrupted);
    assert_eq!(engine.sweep_count(), 0);
    assert!(!tmp.path().join("status.json").exists());
}

#[tokio::test]
async fn test_unreachable_browser_driver_only_skips_browser_providers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clinic"))
        .respond_with(ResponseTemplate::new(200).set_body_string("slots are open"))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let mut config = config_for(&server);
    config.output.dir = tmp.path().display().to_string();
    config.browser.webdriver_url = "http://127.0.0.1:9".into();

    let entries: Vec<ProviderEntry> = serde_json::from_value(json!([
        {"name": "Walgreens", "query": "78229"},
        {
            "name": "Clinic",
            "website": format!("{}/clinic", server.uri()),
            "pos_phrase": "are open",
            "neg_phrase": "are full"
        }
    ]))
    .unwrap();
    let registry = Registry::from_entries(&entries, "websites.json").unwrap();
    let notifier = MemoryNotifier::new();

    let mut engine = Engine::build(config, &registry, Box::new(notifier.clone()))
        .await
        .unwrap();
    let report = engine.sweep().await.unwrap();

    assert!(matches!(report.outcomes[0].1, ProviderOutcome::Skipped { .. }));
    assert_eq!(
        engine.state().get("Clinic").unwrap().status,
        Availability::Probably
    );
    assert_eq!(notifier.messages(), vec!["Clinic changed to probably"]);
    engine.shutdown().await;
}
