mod common;

use std::sync::Arc;

use common::{config, manual_config, record, selection, session};
use update_feed_lib::config::FeedConfig;
use update_feed_lib::filters::KeyValueStore;
use update_feed_lib::metrics::CycleOutcome;
use update_feed_lib::models::UnknownCategoryPolicy;
use update_feed_lib::pipeline::{Diagnostic, EmptySelectionPolicy};
use update_feed_lib::render::{MemoryTarget, Notice, RenderUnit};
use update_feed_lib::scheduler::{SignalIdle, YieldNow};
use update_feed_lib::session::{present_load_failure, RenderStart};
use update_feed_lib::source::parse_records;

fn titles(unit: &RenderUnit) -> Vec<&str> {
    match unit {
        RenderUnit::Entries { entries, .. } => entries.iter().map(|e| e.title.as_str()).collect(),
        other => panic!("expected entries, got {other:?}"),
    }
}

#[tokio::test]
async fn three_records_render_as_two_date_buckets() {
    let records = vec![
        record("2024-05-02", "A", "recA"),
        record("2024-05-01", "B", "recB1"),
        record("2024-05-02", "B", "recB2"),
    ];
    let (mut session, _) = session(records, &["A", "B"], &config(25), Arc::new(YieldNow));

    assert_eq!(session.filters().selected(), &selection(&["A", "B"]));
    let start = session.refresh().await.unwrap();
    assert!(matches!(start, RenderStart::Started(_)));

    let report = session.wait_idle().await.unwrap().unwrap();
    assert_eq!(report.outcome, CycleOutcome::Completed);
    assert_eq!(report.buckets, 2);

    let target = session.target();
    let target = target.lock().await;
    let units = target.units();
    assert_eq!(units.len(), 4);
    assert_eq!(
        units[0],
        RenderUnit::DateHeader {
            date: "2024-05-02".into()
        }
    );
    assert_eq!(titles(&units[1]), vec!["recA", "recB2"]);
    assert_eq!(
        units[2],
        RenderUnit::DateHeader {
            date: "2024-05-01".into()
        }
    );
    assert_eq!(titles(&units[3]), vec!["recB1"]);
    assert_eq!(target.clear_count(), 1);
}

#[tokio::test]
async fn empty_selection_shows_notice_by_default() {
    let records = vec![record("2024-05-02", "A", "a"), record("2024-05-01", "B", "b")];
    let (mut session, backend) = session(records, &["A", "B"], &config(25), Arc::new(YieldNow));

    session.select_none().unwrap();
    assert_eq!(session.render_now(&selection(&[])).await.unwrap(), RenderStart::NothingToShow);
    assert!(session.wait_idle().await.unwrap().is_none());

    let target = session.target();
    let target = target.lock().await;
    assert_eq!(target.units(), &[RenderUnit::notice(Notice::NoUpdates)]);
    assert_eq!(backend.get(common::FILTER_KEY).unwrap().as_deref(), Some(""));
}

#[tokio::test]
async fn empty_selection_can_show_everything() {
    let records = vec![
        record("2024-05-02", "A", "a"),
        record("2024-05-01", "B", "b"),
        record("2024-05-01", "Unlisted", "u"),
    ];
    let config = FeedConfig {
        empty_selection: EmptySelectionPolicy::ShowEverything,
        ..config(25)
    };
    let (mut session, _) = session(records, &["A", "B"], &config, Arc::new(YieldNow));

    session.select_none().unwrap();
    assert!(matches!(
        session.refresh().await.unwrap(),
        RenderStart::Started(_)
    ));
    let report = session.wait_idle().await.unwrap().unwrap();
    assert_eq!(report.records_emitted, 3);
}

#[tokio::test]
async fn unlisted_company_is_shown_as_its_own_category() {
    let records = vec![
        record("2024-05-02", "A", "listed"),
        record("2024-05-01", "Indie Studio", "unlisted"),
    ];
    let (mut session, backend) = session(records, &["A"], &config(25), Arc::new(YieldNow));

    assert!(session.filters().is_selected("Indie Studio"));
    session.refresh().await.unwrap();
    let report = session.wait_idle().await.unwrap().unwrap();
    assert_eq!(report.records_emitted, 2);

    assert!(!session.toggle("Indie Studio").unwrap());
    session.refresh().await.unwrap();
    assert_eq!(session.wait_idle().await.unwrap().unwrap().records_emitted, 1);

    session.select_all().unwrap();
    assert_eq!(
        backend.get(common::FILTER_KEY).unwrap().as_deref(),
        Some("A,Indie Studio")
    );
    session.refresh().await.unwrap();
    assert_eq!(session.wait_idle().await.unwrap().unwrap().records_emitted, 2);

    let target = session.target();
    let target = target.lock().await;
    let classes: Vec<&str> = target.entries().map(|e| e.company_class.as_str()).collect();
    assert_eq!(classes, vec!["company-a", "company-indie-studio"]);
}

#[tokio::test]
async fn folded_unknown_companies_stay_out_of_the_catalog() {
    let records = vec![
        record("2024-05-02", "A", "listed"),
        record("2024-05-01", "Indie Studio", "unlisted"),
    ];
    let config = FeedConfig {
        unknown_category: UnknownCategoryPolicy::Fold { into: "A".into() },
        ..config(25)
    };
    let (mut session, _) = session(records, &["A"], &config, Arc::new(YieldNow));

    assert!(session.toggle("Indie Studio").is_err());
    assert_eq!(session.filters().store().catalog().len(), 1);
    session.refresh().await.unwrap();
    assert_eq!(session.wait_idle().await.unwrap().unwrap().records_emitted, 2);
}

#[tokio::test]
async fn malformed_dates_are_reported_and_skipped() {
    let records = vec![
        record("2024-05-02", "A", "good"),
        record("someday", "A", "bad"),
    ];
    let (mut session, _) = session(records, &["A"], &config(25), Arc::new(YieldNow));

    session.refresh().await.unwrap();
    let report = session.wait_idle().await.unwrap().unwrap();
    assert_eq!(report.records_emitted, 1);
    assert_eq!(
        session.diagnostics(),
        &[Diagnostic::MalformedDateKey {
            index: 1,
            raw: "someday".into(),
            company: "A".into(),
        }]
    );
}

#[tokio::test]
async fn vanished_target_aborts_and_next_render_starts_fresh() {
    let records: Vec<_> = (0..60)
        .map(|i| record("2024-05-02", "A", &format!("a{i}")))
        .collect();
    let idle = SignalIdle::new();
    let (mut session, _) = session(records, &["A"], &manual_config(20), Arc::new(idle.clone()));

    session.refresh().await.unwrap();
    let mut progress = session.active_handle().unwrap().progress();
    progress.wait_for(|p| p.steps >= 1).await.unwrap();

    session.target().lock().await.detach();
    idle.release();
    let report = session.wait_idle().await.unwrap().unwrap();
    assert!(matches!(report.outcome, CycleOutcome::Aborted { .. }));
    assert_eq!(report.records_emitted, 20);

    session.target().lock().await.attach();
    idle.open();
    session.refresh().await.unwrap();
    let report = session.wait_idle().await.unwrap().unwrap();
    assert_eq!(report.outcome, CycleOutcome::Completed);

    let target = session.target();
    let target = target.lock().await;
    assert_eq!(target.entries().count(), 60);
    assert_eq!(target.headers(), vec!["2024-05-02"]);
}

#[test]
fn load_failure_shows_failure_state() {
    let err = parse_records("{ broken").unwrap_err();
    let mut target = MemoryTarget::new();
    present_load_failure(&mut target, &err);

    assert_eq!(target.units().len(), 1);
    assert!(matches!(
        &target.units()[0],
        RenderUnit::Notice {
            notice: Notice::LoadFailed { .. }
        }
    ));
}
