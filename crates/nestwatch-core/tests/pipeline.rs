//! End-to-end tests of the trend pipeline against the SQLite store.

use std::sync::Arc;

use nestwatch_core::mock::{MemoryStore, MockActuator, MockNotifier};
use nestwatch_core::{
    DeviceStatus, DispatchOptions, HistoryStore, PipelineContext, PollCycle, Severity,
    SqliteHistory, TrendKind,
};
use nestwatch_store::Store;
use nestwatch_types::{HvacState, Reading};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("nestwatch=debug")
        .with_test_writer()
        .try_init();
}

struct Pipeline {
    notifier: Arc<MockNotifier>,
    actuator: Arc<MockActuator>,
    cycle: PollCycle,
}

fn pipeline(store: Arc<dyn HistoryStore>) -> Pipeline {
    let notifier = Arc::new(MockNotifier::new());
    let actuator = Arc::new(MockActuator::new());
    let ctx = PipelineContext::new(store, notifier.clone(), actuator.clone());
    Pipeline {
        notifier,
        actuator,
        cycle: PollCycle::new(&ctx),
    }
}

fn sqlite_in_memory() -> Arc<dyn HistoryStore> {
    Arc::new(SqliteHistory::new(Store::open_in_memory().unwrap()))
}

#[tokio::test]
async fn cooling_trend_over_sqlite() {
    init_tracing();
    let p = pipeline(sqlite_in_memory());

    for ambient in [20.0, 21.0, 22.0] {
        p.cycle
            .run(&[Reading::new("hall", ambient, HvacState::Cooling).with_setpoints(18.0, 19.0)])
            .await;
    }

    let sent = p.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].device_id, "hall");
    assert_eq!(sent[0].severity, Severity::Elevated);
    assert_eq!(
        sent[0].message,
        "ambient consistently rising while cooling (20.0 → 21.0 → 22.0)"
    );
    assert_eq!(p.actuator.call_count(), 0);
}

#[tokio::test]
async fn malformed_setpoint_does_not_block_later_readings() {
    init_tracing();
    let p = pipeline(sqlite_in_memory());

    let bad = Reading::new("hall", 19.0, HvacState::Cooling).with_setpoints(f64::NAN, 24.0);
    let report = p.cycle.run(&[bad]).await;
    assert!(matches!(report.device("hall"), Some(DeviceStatus::Skipped { .. })));

    let mut last = None;
    for ambient in [20.0, 21.0, 22.0] {
        let report = p
            .cycle
            .run(&[Reading::new("hall", ambient, HvacState::Cooling).with_setpoints(18.0, 19.0)])
            .await;
        assert_eq!(report.evaluated(), 1);
        last = Some(report);
    }

    let last = last.unwrap();
    assert!(matches!(
        last.device("hall"),
        Some(DeviceStatus::Evaluated {
            verdict: TrendKind::CoolingRising,
            history_len: 3,
            ..
        })
    ));

    // One skip notice for the bad reading, then the trend alert
    let sent = p.notifier.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].severity, Severity::Informational);
    assert_eq!(sent[1].severity, Severity::Elevated);
}

#[tokio::test]
async fn heating_trend_notifies_and_disables() {
    init_tracing();
    let p = pipeline(sqlite_in_memory());

    for ambient in [70.0, 68.0, 65.0] {
        p.cycle
            .run(&[Reading::new("den", ambient, HvacState::Heating).with_setpoints(72.0, 80.0)])
            .await;
    }

    assert_eq!(p.notifier.sent().len(), 1);
    assert_eq!(p.actuator.disabled(), vec!["den".to_string()]);
}

#[tokio::test]
async fn disable_failure_gives_two_notifications() {
    let p = pipeline(sqlite_in_memory());
    p.actuator.set_should_fail(true, Some("HTTP 500"));

    for ambient in [70.0, 68.0, 65.0] {
        p.cycle
            .run(&[Reading::new("den", ambient, HvacState::Heating)])
            .await;
    }

    let sent = p.notifier.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].severity, Severity::Elevated);
    assert_eq!(sent[1].severity, Severity::Informational);
    assert_eq!(p.actuator.call_count(), 1);
}

#[tokio::test]
async fn history_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.db");

    // Two cycles in the first process
    {
        let p = pipeline(Arc::new(SqliteHistory::new(Store::open(&path).unwrap())));
        for ambient in [20.0, 21.0] {
            p.cycle
                .run(&[Reading::new("hall", ambient, HvacState::Cooling)])
                .await;
        }
        assert!(p.notifier.sent().is_empty());
    }

    // Third sample after a restart completes the window
    let p = pipeline(Arc::new(SqliteHistory::new(Store::open(&path).unwrap())));
    let report = p
        .cycle
        .run(&[Reading::new("hall", 22.0, HvacState::Cooling)])
        .await;

    assert!(matches!(
        report.device("hall"),
        Some(DeviceStatus::Evaluated {
            verdict: TrendKind::CoolingRising,
            history_len: 3,
            ..
        })
    ));
    assert_eq!(p.notifier.sent().len(), 1);
}

#[tokio::test]
async fn store_failure_does_not_block_other_devices() {
    let store = Arc::new(MemoryStore::new());
    let p = pipeline(store.clone());

    // Warm up both devices
    for ambient in [70.0, 68.0] {
        p.cycle
            .run(&[
                Reading::new("a", ambient, HvacState::Heating),
                Reading::new("b", ambient, HvacState::Heating),
            ])
            .await;
    }

    store.fail_device("a");
    let report = p
        .cycle
        .run(&[
            Reading::new("a", 65.0, HvacState::Heating),
            Reading::new("b", 65.0, HvacState::Heating),
        ])
        .await;

    assert!(matches!(report.device("a"), Some(DeviceStatus::Skipped { .. })));
    assert!(matches!(
        report.device("b"),
        Some(DeviceStatus::Evaluated {
            verdict: TrendKind::HeatingFalling,
            ..
        })
    ));
    assert_eq!(p.actuator.disabled(), vec!["b".to_string()]);
}

#[tokio::test]
async fn interrupted_state_resets_trend() {
    let p = pipeline(sqlite_in_memory());

    let states = [
        (20.0, HvacState::Cooling),
        (21.0, HvacState::Off),
        (22.0, HvacState::Cooling),
        (23.0, HvacState::Cooling),
    ];
    for (ambient, state) in states {
        p.cycle.run(&[Reading::new("hall", ambient, state)]).await;
    }
    assert!(p.notifier.sent().is_empty());

    // The OFF sample has now left the window
    p.cycle
        .run(&[Reading::new("hall", 24.0, HvacState::Cooling)])
        .await;
    assert_eq!(p.notifier.sent().len(), 1);
}

#[tokio::test]
async fn confirmation_when_enabled() {
    let notifier = Arc::new(MockNotifier::new());
    let ctx = PipelineContext::new(
        sqlite_in_memory(),
        notifier.clone(),
        Arc::new(MockActuator::new()),
    );
    let cycle =
        PollCycle::new(&ctx).with_options(DispatchOptions::default().confirm_actuation(true));

    for ambient in [70.0, 68.0, 65.0] {
        cycle
            .run(&[Reading::new("den", ambient, HvacState::Heating)])
            .await;
    }

    let messages: Vec<String> = notifier.sent().into_iter().map(|n| n.message).collect();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1], "HVAC disabled after heating alert");
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn state() -> impl Strategy<Value = HvacState> {
        prop_oneof![Just(HvacState::Heating), Just(HvacState::Cooling)]
    }

    /// Expected number of elevated alerts for a chronological sequence.
    fn expected_alerts(samples: &[(i32, HvacState)]) -> usize {
        samples
            .windows(3)
            .filter(|w| {
                let [(a, s0), (b, s1), (c, s2)] = [w[0], w[1], w[2]];
                s0 == s1
                    && s1 == s2
                    && match s0 {
                        HvacState::Cooling => a < b && b < c,
                        HvacState::Heating => a > b && b > c,
                        _ => false,
                    }
            })
            .count()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn alerts_match_sliding_window_model(
            samples in proptest::collection::vec((0i32..5, state()), 0..10)
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            let p = pipeline(sqlite_in_memory());
            runtime.block_on(async {
                for (ambient, state) in &samples {
                    p.cycle
                        .run(&[Reading::new("dev", f64::from(*ambient), *state)])
                        .await;
                }
            });

            let alerts = p
                .notifier
                .sent()
                .iter()
                .filter(|n| n.severity == Severity::Elevated)
                .count();
            prop_assert_eq!(alerts, expected_alerts(&samples));
        }
    }
}
