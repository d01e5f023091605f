use catalog_core::app::Model;
use catalog_core::capabilities::{ImageCacheOperation, PacingOperation};
use catalog_core::platform::{Platform, PlatformInfo};
use catalog_core::source::{Generation, QueryError, SnapshotFacts};
use catalog_core::{
    CatalogConfig, Effect, EmptyState, Event, FilterQuery, MountContext, RawRecord, Route,
    SourceError, Strategy,
};
use crux_core::testing::AppTester;

fn cars(n: usize) -> Vec<RawRecord> {
    (0..n)
        .map(|i| RawRecord {
            name: Some(format!("Car {i:02}")),
            image: Some(format!("https://img.example.com/{i}.webp")),
            ..Default::default()
        })
        .collect()
}

fn mount(platform: PlatformInfo, snapshot: SnapshotFacts) -> Event {
    Event::Mounted(Box::new(MountContext {
        route: Route::new("models"),
        platform,
        snapshot,
        config: CatalogConfig::default(),
    }))
}

fn renders(effects: &[Effect]) -> bool {
    effects.iter().any(|e| matches!(e, Effect::Render(_)))
}

fn http_requests(effects: &[Effect]) -> usize {
    effects.iter().filter(|e| matches!(e, Effect::Http(_))).count()
}

#[test]
fn native_mount_queries_and_pages() {
    let app = AppTester::<catalog_core::App, Effect>::default();
    let mut model = Model::default();

    let update = app.update(mount(PlatformInfo::native(Platform::Ios), SnapshotFacts::default()), &mut model);
    assert!(renders(&update.effects));
    assert_eq!(http_requests(&update.effects), 1);

    let view = app.view(&model);
    assert_eq!(view.strategy, Some(Strategy::MobileApi));
    assert!(view.is_loading);
    assert_eq!(view.empty_state, None);

    let update = app.update(
        Event::RecordsFetched {
            mount: 1,
            generation: Generation::new(1),
            result: Ok(cars(45)),
        },
        &mut model,
    );
    assert!(renders(&update.effects));
    let preloads: Vec<_> = update
        .effects
        .iter()
        .filter_map(|e| match e {
            Effect::ImageCache(request) => Some(request.operation.clone()),
            _ => None,
        })
        .collect();
    assert!(matches!(
        preloads.first(),
        Some(ImageCacheOperation::Preload { urls, .. }) if urls.len() == 4
    ));

    let view = app.view(&model);
    assert!(!view.is_loading);
    assert!(view.is_paged);
    assert_eq!((view.visible_count, view.total), (20, 45));

    let mut update = app.update(Event::LoadMoreRequested, &mut model);
    assert!(app.view(&model).is_advancing);
    let mut pacing = update
        .effects
        .drain(..)
        .find_map(|e| match e {
            Effect::Pacing(request) => Some(request),
            _ => None,
        })
        .expect("advance is paced by the shell");
    assert_eq!(pacing.operation, PacingOperation { millis: 300 });

    // A second request while advancing is dropped.
    let update = app.update(Event::LoadMoreRequested, &mut model);
    assert!(!update.effects.iter().any(|e| matches!(e, Effect::Pacing(_))));

    let settled = app.resolve(&mut pacing, ()).expect("pacing resolves");
    for event in settled.events {
        app.update(event, &mut model);
    }
    let view = app.view(&model);
    assert!(!view.is_advancing);
    assert_eq!(view.visible_count, 40);
}

#[test]
fn reset_during_advance_discards_the_settled_page() {
    let app = AppTester::<catalog_core::App, Effect>::default();
    let mut model = Model::default();
    app.update(mount(PlatformInfo::native(Platform::Android), SnapshotFacts::default()), &mut model);
    app.update(
        Event::RecordsFetched {
            mount: 1,
            generation: Generation::new(1),
            result: Ok(cars(45)),
        },
        &mut model,
    );

    let mut update = app.update(Event::LoadMoreRequested, &mut model);
    let mut pacing = update
        .effects
        .drain(..)
        .find_map(|e| match e {
            Effect::Pacing(request) => Some(request),
            _ => None,
        })
        .expect("paced");

    app.update(Event::QueryChanged(FilterQuery::text("car 1")), &mut model);
    let settled = app.resolve(&mut pacing, ()).expect("pacing resolves");
    for event in settled.events {
        app.update(event, &mut model);
    }

    let view = app.view(&model);
    assert_eq!(view.visible_page, 1);
    assert_eq!(view.total, 10);
    assert_eq!(view.visible_count, 10);
}

#[test]
fn stale_response_is_ignored() {
    let app = AppTester::<catalog_core::App, Effect>::default();
    let mut model = Model::default();
    app.update(mount(PlatformInfo::native(Platform::Ios), SnapshotFacts::default()), &mut model);
    let update = app.update(Event::RefetchRequested, &mut model);
    assert_eq!(http_requests(&update.effects), 1);

    app.update(
        Event::RecordsFetched {
            mount: 1,
            generation: Generation::new(2),
            result: Ok(cars(3)),
        },
        &mut model,
    );
    app.update(
        Event::RecordsFetched {
            mount: 1,
            generation: Generation::new(1),
            result: Ok(cars(30)),
        },
        &mut model,
    );

    assert_eq!(app.view(&model).total, 3);
}

#[test]
fn authoritative_snapshot_renders_without_network() {
    let app = AppTester::<catalog_core::App, Effect>::default();
    let mut model = Model::default();

    let snapshot = SnapshotFacts {
        authoritative: true,
        payload: Some(r#"[{"brandName": "Audi"}, {"brandName": "Alfa Romeo"}, {"brandName": "BMW"}]"#.into()),
    };
    let update = app.update(mount(PlatformInfo::DESKTOP_WEB, snapshot), &mut model);
    assert_eq!(http_requests(&update.effects), 0);

    let view = app.view(&model);
    assert_eq!(view.strategy, Some(Strategy::SsgOnly));
    assert!(!view.is_paged);
    let sections: Vec<(&str, Vec<&str>)> = view
        .groups
        .iter()
        .map(|g| (g.label.as_str(), g.items.iter().map(|i| i.title.as_str()).collect()))
        .collect();
    assert_eq!(
        sections,
        [("A", vec!["Alfa Romeo", "Audi"]), ("B", vec!["BMW"])]
    );

    let update = app.update(Event::RefetchRequested, &mut model);
    assert_eq!(http_requests(&update.effects), 0);
}

#[test]
fn missing_authoritative_snapshot_is_an_error_state() {
    let app = AppTester::<catalog_core::App, Effect>::default();
    let mut model = Model::default();

    let snapshot = SnapshotFacts {
        authoritative: true,
        payload: Some("[]".into()),
    };
    app.update(mount(PlatformInfo::DESKTOP_WEB, snapshot), &mut model);

    let view = app.view(&model);
    assert!(!view.is_loading);
    assert!(matches!(view.error, Some(SourceError::SnapshotUnavailable { .. })));
}

#[test]
fn authoritative_route_without_payload_needs_regeneration() {
    let app = AppTester::<catalog_core::App, Effect>::default();
    let mut model = Model::default();

    let snapshot = SnapshotFacts {
        authoritative: true,
        payload: None,
    };
    let update = app.update(mount(PlatformInfo::DESKTOP_WEB, snapshot), &mut model);
    assert_eq!(http_requests(&update.effects), 0);

    let view = app.view(&model);
    assert_eq!(view.strategy, Some(Strategy::SsgOnly));
    assert!(!view.is_loading);
    assert!(matches!(view.error, Some(SourceError::SnapshotUnavailable { .. })));
}

#[test]
fn failed_query_keeps_view_and_reports_error() {
    let app = AppTester::<catalog_core::App, Effect>::default();
    let mut model = Model::default();
    app.update(mount(PlatformInfo::DESKTOP_WEB, SnapshotFacts::default()), &mut model);
    assert_eq!(app.view(&model).strategy, Some(Strategy::ApiOnly));

    app.update(
        Event::RecordsFetched {
            mount: 1,
            generation: Generation::new(1),
            result: Err(QueryError::Timeout),
        },
        &mut model,
    );
    let view = app.view(&model);
    assert!(view.error.is_some_and(|e| e.is_retryable()));
    assert_eq!(view.empty_state, None);

    let update = app.update(Event::RefetchRequested, &mut model);
    assert_eq!(http_requests(&update.effects), 1);
    app.update(
        Event::RecordsFetched {
            mount: 1,
            generation: Generation::new(2),
            result: Ok(Vec::new()),
        },
        &mut model,
    );
    assert_eq!(app.view(&model).empty_state, Some(EmptyState::NoData));
}

#[test]
fn unfocused_view_waits_for_focus() {
    let app = AppTester::<catalog_core::App, Effect>::default();
    let mut model = Model::default();
    app.update(mount(PlatformInfo::native(Platform::Ios), SnapshotFacts::default()), &mut model);
    app.update(
        Event::RecordsFetched {
            mount: 1,
            generation: Generation::new(1),
            result: Ok(cars(2)),
        },
        &mut model,
    );

    app.update(Event::FocusChanged { focused: false }, &mut model);
    let update = app.update(Event::RefetchRequested, &mut model);
    assert_eq!(http_requests(&update.effects), 0);

    app.update(Event::FocusChanged { focused: true }, &mut model);
    let update = app.update(Event::RefetchRequested, &mut model);
    assert_eq!(http_requests(&update.effects), 1);
}

#[test]
fn teardown_clears_shell_image_cache() {
    let app = AppTester::<catalog_core::App, Effect>::default();
    let mut model = Model::default();
    app.update(mount(PlatformInfo::native(Platform::Ios), SnapshotFacts::default()), &mut model);

    let update = app.update(Event::TornDown, &mut model);
    assert!(update.effects.iter().any(|e| matches!(
        e,
        Effect::ImageCache(request) if request.operation == ImageCacheOperation::Clear
    )));
    assert!(!model.is_mounted());
    assert_eq!(app.view(&model).strategy, None);
}

#[test]
fn response_from_earlier_mount_is_discarded() {
    let app = AppTester::<catalog_core::App, Effect>::default();
    let mut model = Model::default();
    let native = || mount(PlatformInfo::native(Platform::Ios), SnapshotFacts::default());

    app.update(native(), &mut model);
    app.update(Event::TornDown, &mut model);
    let update = app.update(native(), &mut model);
    assert_eq!(http_requests(&update.effects), 1);

    // Both mounts issued generation 1; only the mount tag tells them apart.
    app.update(
        Event::RecordsFetched {
            mount: 1,
            generation: Generation::new(1),
            result: Ok(cars(7)),
        },
        &mut model,
    );
    let view = app.view(&model);
    assert!(view.is_loading);
    assert_eq!(view.total, 0);

    app.update(
        Event::RecordsFetched {
            mount: 2,
            generation: Generation::new(1),
            result: Ok(cars(3)),
        },
        &mut model,
    );
    let view = app.view(&model);
    assert!(!view.is_loading);
    assert_eq!(view.total, 3);
}
