//! Tests for the calendar pipeline against a fixture upstream.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::*;
use crate::adapters::{ChsConfig, NoaaConfig};
use crate::cache::ArtifactCacheConfig;
use crate::domain::Source;
use crate::render::RenderError;
use crate::resolve::ResolveError;
use crate::stations::{DirectorySnapshot, DirectorySources};
use crate::testing::fixtures::{CHS_JUNE, NOAA_JUNE};
use crate::testing::{FakeUpstream, Reply};

const VANCOUVER_KEY: &str = "5cebf1de3d0f4a073c4bbd8f";
const NOAA_PATH: &str = "/api/prod/datagetter";

/// Renderer that records its input instead of running `pcal`.
#[derive(Clone, Default)]
struct RecordingRenderer {
    calls: Arc<AtomicUsize>,
    day_files: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl RecordingRenderer {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_day_file(&self) -> String {
        self.day_files.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

impl Renderer for RecordingRenderer {
    async fn render(&self, day_file: &str, period: MonthRef) -> Result<Vec<u8>, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.day_files.lock().unwrap().push(day_file.to_string());
        if self.fail {
            return Err(RenderError::Exit {
                stage: "pcal",
                code: Some(1),
                stderr: "boom".into(),
            });
        }
        Ok(format!("%PDF-1.4 {period}\n{day_file}").into_bytes())
    }
}

struct Harness {
    upstream: FakeUpstream,
    renderer: RecordingRenderer,
    service: TideCalendarService<RecordingRenderer>,
    _cache_dir: tempfile::TempDir,
}

impl Harness {
    async fn new(renderer: RecordingRenderer, retry: RetryPolicy) -> Self {
        Self::with_directory(renderer, retry, directory()).await
    }

    async fn with_directory(
        renderer: RecordingRenderer,
        retry: RetryPolicy,
        snapshot: DirectorySnapshot,
    ) -> Self {
        let upstream = FakeUpstream::start().await;
        let adapters = AdapterSet::from_configs(
            NoaaConfig::new().with_base_url(upstream.base_url()),
            ChsConfig::new().with_base_url(upstream.base_url()),
        )
        .unwrap();

        let cache_dir = tempfile::tempdir().unwrap();
        let cache = ArtifactCache::new(ArtifactCacheConfig::new(cache_dir.path()));
        let directory = StationDirectory::from_snapshot(
            snapshot,
            DirectorySources::bundled("missing-primary.csv", "missing-fallback.csv"),
        );

        Self {
            service: TideCalendarService::new(directory, adapters, retry, cache, renderer.clone()),
            upstream,
            renderer,
            _cache_dir: cache_dir,
        }
    }

    fn cached_files(&self) -> usize {
        std::fs::read_dir(self.service.cache().dir())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

fn directory() -> DirectorySnapshot {
    DirectorySnapshot::from_parts(
        vec![
            Station::new("9449639", "Point Roberts, WA", Source::Noaa),
            Station::new("9447130", "Seattle, WA", Source::Noaa),
        ],
        vec![
            Station::new("07735", "Vancouver, BC", Source::Chs)
                .with_upstream_key(VANCOUVER_KEY)
                .with_time_zone(chrono_tz::America::Vancouver),
        ],
    )
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::exponential(3).with_initial_delay(Duration::from_millis(40))
}

#[tokio::test]
async fn point_roberts_june() {
    let h = Harness::new(RecordingRenderer::default(), fast_retry()).await;
    h.upstream.route(NOAA_PATH, [Reply::ok(NOAA_JUNE)]);

    let calendar = h.service.generate("9449639", 2024, 6).await.unwrap();

    assert!(!calendar.from_cache);
    assert!(!calendar.artifact.bytes.is_empty());
    assert_eq!(calendar.station.name, "Point Roberts, WA");
    assert_eq!(
        calendar.download_name,
        "tide_calendar_Point_Roberts_WA_2024_06.pdf"
    );

    let day_file = h.renderer.last_day_file();
    let mut lines = day_file.lines();
    assert_eq!(lines.next(), Some("6/1  00:17 High 3.2 m"));
    assert!(day_file.contains("6/2*  08:11 Low -0.1 m"));
    assert!(day_file.contains("6/1  07:02 Low 0.9 m"));
    assert!(day_file.ends_with("\nnote/1 all Tide Station: Point Roberts, WA\n"));

    let request = &h.upstream.requests()[0];
    assert!(request.contains("station=9449639"));
    assert!(request.contains("begin_date=20240601"));
}

#[tokio::test]
async fn second_call_is_served_from_cache() {
    let h = Harness::new(RecordingRenderer::default(), fast_retry()).await;
    h.upstream.route(NOAA_PATH, [Reply::ok(NOAA_JUNE)]);

    let first = h.service.generate("9449639", 2024, 6).await.unwrap();
    let second = h.service.generate("Point Roberts", 2024, 6).await.unwrap();

    assert!(second.from_cache);
    assert_eq!(first.artifact.bytes, second.artifact.bytes);
    assert_eq!(h.upstream.hits(NOAA_PATH), 1);
    assert_eq!(h.renderer.calls(), 1);
}

#[tokio::test]
async fn unknown_place_touches_nothing() {
    let h = Harness::new(RecordingRenderer::default(), fast_retry()).await;

    let err = h
        .service
        .generate("Nonexistent Place 123", 2024, 6)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CalendarError::Unresolvable(ResolveError::NoMatch { .. })
    ));
    assert!(h.upstream.requests().is_empty());
    assert_eq!(h.renderer.calls(), 0);
    assert_eq!(h.cached_files(), 0);
}

#[tokio::test]
async fn invalid_period_is_rejected_first() {
    let h = Harness::new(RecordingRenderer::default(), fast_retry()).await;

    let err = h.service.generate("9449639", 2031, 1).await.unwrap_err();
    assert!(matches!(err, CalendarError::InvalidPeriod(_)));

    let err = h.service.generate("9449639", 2024, 13).await.unwrap_err();
    assert!(matches!(err, CalendarError::InvalidPeriod(_)));
    assert!(h.upstream.requests().is_empty());
}

#[tokio::test]
async fn empty_directory() {
    let h = Harness::with_directory(
        RecordingRenderer::default(),
        fast_retry(),
        DirectorySnapshot::empty(),
    )
    .await;

    let err = h.service.generate("9449639", 2024, 6).await.unwrap_err();
    assert!(matches!(err, CalendarError::DirectoryEmpty));
}

#[tokio::test]
async fn chs_outage_retries_with_growing_delay() {
    let h = Harness::new(RecordingRenderer::default(), fast_retry()).await;
    let data_path = format!("/stations/{VANCOUVER_KEY}/data");
    h.upstream.route(&data_path, [Reply::status(503)]);

    let err = h.service.generate("07735", 2024, 6).await.unwrap_err();

    assert!(matches!(
        err,
        CalendarError::UpstreamTransient { attempts: 3, .. }
    ));
    let arrivals = h.upstream.arrivals(&data_path);
    assert_eq!(arrivals.len(), 3);
    let first_gap = arrivals[1] - arrivals[0];
    let second_gap = arrivals[2] - arrivals[1];
    assert!(first_gap >= Duration::from_millis(40));
    assert!(second_gap >= Duration::from_millis(80));
    assert_eq!(h.renderer.calls(), 0);
    assert_eq!(h.cached_files(), 0);
}

#[tokio::test]
async fn chs_recovers_after_transient_failures() {
    let h = Harness::new(RecordingRenderer::default(), fast_retry()).await;
    let data_path = format!("/stations/{VANCOUVER_KEY}/data");
    h.upstream.route(
        &data_path,
        [Reply::status(503), Reply::status(429), Reply::ok(CHS_JUNE)],
    );

    let calendar = h.service.generate("Vancouver", 2024, 6).await.unwrap();

    assert_eq!(h.upstream.hits(&data_path), 3);
    assert_eq!(calendar.station.id, "07735");
    // Looked up by UUID, so no code lookup
    assert_eq!(h.upstream.hits("/stations"), 0);

    // Times are Pacific daylight time, not UTC
    let day_file = h.renderer.last_day_file();
    assert!(day_file.starts_with("6/1  05:23 High 4.1 m\n"));
    assert!(day_file.contains("6/1  18:02 High 4.0 m"));
    assert!(day_file.contains("6/2*  00:31 Low 0.2 m"));
    assert!(!day_file.contains("5/31"));
    assert!(day_file.contains("Tide Station: Vancouver, BC"));
}

#[tokio::test]
async fn terminal_failure_is_not_retried_or_cached() {
    let h = Harness::new(RecordingRenderer::default(), fast_retry()).await;
    h.upstream.route(NOAA_PATH, [Reply::status(400)]);

    let err = h.service.generate("9449639", 2024, 6).await.unwrap_err();

    assert!(matches!(err, CalendarError::UpstreamTerminal(_)));
    assert_eq!(h.upstream.hits(NOAA_PATH), 1);
    assert_eq!(h.cached_files(), 0);
}

#[tokio::test]
async fn no_data_is_terminal() {
    let h = Harness::new(RecordingRenderer::default(), fast_retry()).await;
    h.upstream.route(
        NOAA_PATH,
        [Reply::ok(
            "Error: No Predictions data was found. Please make sure the Datum input is valid.",
        )],
    );

    let err = h.service.generate("9449639", 2024, 6).await.unwrap_err();
    assert_eq!(err.kind(), "upstream_error");
    assert_eq!(h.upstream.hits(NOAA_PATH), 1);
}

#[tokio::test]
async fn render_failure_is_not_cached() {
    let h = Harness::new(RecordingRenderer::failing(), fast_retry()).await;
    h.upstream.route(NOAA_PATH, [Reply::ok(NOAA_JUNE)]);

    let err = h.service.generate("9449639", 2024, 6).await.unwrap_err();
    assert!(matches!(err, CalendarError::RenderFailure(_)));
    assert_eq!(h.cached_files(), 0);

    // A retry goes back upstream
    let _ = h.service.generate("9449639", 2024, 6).await;
    assert_eq!(h.upstream.hits(NOAA_PATH), 2);
    assert_eq!(h.renderer.calls(), 2);
}

#[tokio::test]
async fn shape_resolution_reaches_upstream() {
    let h = Harness::new(RecordingRenderer::default(), fast_retry()).await;
    h.upstream.route(NOAA_PATH, [Reply::ok(NOAA_JUNE)]);

    let calendar = h.service.generate("8454000", 2024, 6).await.unwrap();
    assert_eq!(calendar.station.id, "8454000");
    assert!(h.upstream.requests()[0].contains("station=8454000"));
    assert!(h.renderer.last_day_file().contains("Tide Station: 8454000"));
}

#[tokio::test]
async fn search_and_info() {
    let h = Harness::new(RecordingRenderer::default(), fast_retry()).await;

    let found = h.service.search_stations("seat", None, 10).await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "9447130");

    let canada = h
        .service
        .search_stations("v", Some(Country::Canada), 10)
        .await;
    assert_eq!(canada.len(), 1);
    assert_eq!(canada[0].id, "07735");
    assert!(h.service.search_stations("v", Some(Country::UnitedStates), 10).await.is_empty());

    let info = h.service.station_info("07735").await.unwrap();
    assert_eq!(info.name, "Vancouver, BC");
    assert!(h.service.station_info("00000").await.is_none());
}

#[tokio::test]
async fn sweep_keeps_fresh_artifacts() {
    let h = Harness::new(RecordingRenderer::default(), fast_retry()).await;
    h.upstream.route(NOAA_PATH, [Reply::ok(NOAA_JUNE)]);

    h.service.generate("9449639", 2024, 6).await.unwrap();
    assert_eq!(h.service.sweep_cache().await.unwrap(), 0);
    assert_eq!(h.cached_files(), 1);
}
