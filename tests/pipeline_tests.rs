//! End-to-end runs against a fake Street View provider:
//! - marker selection, image download and GPX export
//! - run counter handling on success and failure

use bytes::Bytes;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use streetview_route::{
    decode_fixed_point, App, Config, Error, ImageAvailability, ImageFetcher, Result, Settings,
};

const POINTS: usize = 42;

fn lat_text(i: usize) -> String {
    format!("50{:06}", i * 100)
}

fn lat(i: usize) -> f64 {
    decode_fixed_point(&lat_text(i)).unwrap()
}

/// Straight route north with a start header row, one short feature at
/// point 5 and a long one at point 40.
fn route_geojson() -> Value {
    let coordinates: Vec<Value> = (0..POINTS)
        .map(|i| json!([19.0, lat(i), 200.0 + i as f64]))
        .collect();

    json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {
                "creator": "BRouter-1.6.3",
                "messages": [
                    ["Longitude", "Latitude", "Elevation", "Distance",
                     "CostPerKm", "ElevCost", "TurnCost", "NodeCost",
                     "InitialCost", "WayTags", "NodeTags", "Time", "Energy"],
                    ["19000000", lat_text(5), "205", "10", "1150", "0", "0",
                     "0", "0", "highway=residential", "", "12", "0"],
                    ["19000000", lat_text(40), "240", "1000", "1000", "0",
                     "0", "0", "0", "highway=track", "barrier=gate", "300",
                     "0"],
                ]
            },
            "geometry": {
                "type": "LineString",
                "coordinates": coordinates
            }
        }]
    })
}

struct FakeStreetView {
    missing: Vec<f64>,
    fail_fetch: bool,
    fetched: RefCell<Vec<(f64, u16)>>,
}

impl FakeStreetView {
    fn new(missing: &[usize]) -> Self {
        Self {
            missing: missing.iter().map(|i| lat(*i)).collect(),
            fail_fetch: false,
            fetched: RefCell::new(vec![]),
        }
    }
}

impl ImageAvailability for FakeStreetView {
    fn exists(&self, _lon: f64, lat: f64) -> Result<bool> {
        Ok(!self.missing.contains(&lat))
    }
}

impl ImageFetcher for FakeStreetView {
    fn fetch(&self, _lon: f64, lat: f64, heading: u16) -> Result<Bytes> {
        if self.fail_fetch {
            return Err(Error::Provider("HTTP 500".to_string()));
        }

        self.fetched.borrow_mut().push((lat, heading));
        Ok(Bytes::from_static(b"\xff\xd8\xff\xe0jpeg"))
    }
}

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn new(route: &Value, settings: &Value) -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ride.geojson"), route.to_string()).unwrap();
        fs::write(dir.path().join("config.json"), settings.to_string()).unwrap();

        Self { dir: dir }
    }

    fn with_defaults() -> Self {
        Workspace::new(&route_geojson(), &json!({
            "api_key": "test-key",
            "size": "600x400",
            "fov": 90,
            "pitch": 0,
            "min_distance": 50,
            "marker_gap": 300,
            "min_marker_gap": 100,
            "file_counter": 3
        }))
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn config(&self, extra: &[&str]) -> Config {
        let input = self.path("ride.geojson");
        let settings = self.path("config.json");
        let output = self.path("routes");

        let mut args = vec![
            "streetview-route".to_string(),
            input.display().to_string(),
            settings.display().to_string(),
            "--output-dir".to_string(),
            output.display().to_string(),
        ];
        args.extend(extra.iter().map(|s| s.to_string()));

        Config::try_from_args(args).unwrap()
    }

    fn counter(&self) -> u64 {
        Settings::from_file(&self.path("config.json")).unwrap().file_counter
    }
}

fn exists(path: &Path) -> bool {
    path.exists()
}

#[test]
fn run_writes_track_and_images() {
    let ws = Workspace::with_defaults();
    let provider = FakeStreetView::new(&[]);

    let mut app = App::with_provider(ws.config(&[]), &provider).unwrap();
    let summary = app.run().unwrap();

    // Start, three intermediates, feature at point 40. Nothing for the
    // 10m feature.
    assert_eq!(summary.markers, 5);
    assert_eq!(summary.featured, 2);
    assert_eq!(summary.missing, 0);
    assert_eq!(summary.downloaded, 5);

    let fetched: Vec<f64> = provider.fetched.borrow().iter()
        .map(|(lat, _)| *lat)
        .collect();
    assert_eq!(fetched, vec![lat(0), lat(10), lat(20), lat(30), lat(40)]);
    assert!(provider.fetched.borrow().iter().all(|(_, h)| *h == 0));

    for i in 0..5 {
        assert!(exists(&ws.path(&format!("routes/images_3/image_{}.jpg", i))));
    }

    let track_file = ws.path("routes/ride_3.xml");
    assert_eq!(summary.track_file.as_deref(), Some(track_file.as_path()));

    let xml = fs::read_to_string(&track_file).unwrap();
    assert_eq!(xml.matches("<wpt ").count(), 5);
    assert_eq!(xml.matches("<trkpt ").count(), POINTS);
    assert_eq!(xml.matches("<feature/>").count(), 2);
    assert!(xml.contains("<name>ride_3.xml</name>"));
    assert!(xml.contains("images_3/image_4.jpg\"|]]>"));
    assert!(xml.contains(
        "images_3/image_0.jpg\"|Distance=10m; CostPerKm=1150; Tags: highway=residential ]]>"));

    assert_eq!(ws.counter(), 4);
}

#[test]
fn missing_imagery_keeps_names_sequential() {
    let ws = Workspace::with_defaults();
    let provider = FakeStreetView::new(&[20]);

    let mut app = App::with_provider(ws.config(&[]), &provider).unwrap();
    let summary = app.run().unwrap();

    // The walk stops at the first gap in coverage
    assert_eq!(summary.markers, 4);
    assert_eq!(summary.missing, 1);
    assert_eq!(summary.downloaded, 3);

    assert!(exists(&ws.path("routes/images_3/image_0.jpg")));
    assert!(exists(&ws.path("routes/images_3/image_1.jpg")));
    assert!(!exists(&ws.path("routes/images_3/image_2.jpg")));
    assert!(exists(&ws.path("routes/images_3/image_3.jpg")));

    let xml = fs::read_to_string(ws.path("routes/ride_3.xml")).unwrap();
    assert_eq!(xml.matches("Missing Google Street View image").count(), 1);
    assert_eq!(xml.matches("<exist/>").count(), 3);
}

#[test]
fn consecutive_runs_use_new_names() {
    let ws = Workspace::with_defaults();
    let provider = FakeStreetView::new(&[]);

    App::with_provider(ws.config(&[]), &provider).unwrap().run().unwrap();
    App::with_provider(ws.config(&[]), &provider).unwrap().run().unwrap();

    assert!(exists(&ws.path("routes/ride_3.xml")));
    assert!(exists(&ws.path("routes/ride_4.xml")));
    assert!(exists(&ws.path("routes/images_4/image_0.jpg")));
    assert_eq!(ws.counter(), 5);
}

#[test]
fn failed_download_leaves_counter() {
    let ws = Workspace::with_defaults();
    let mut provider = FakeStreetView::new(&[]);
    provider.fail_fetch = true;

    let mut app = App::with_provider(ws.config(&[]), &provider).unwrap();
    let err = app.run().unwrap_err();

    assert!(matches!(err, Error::Provider(_)));
    assert!(!exists(&ws.path("routes/ride_3.xml")));
    assert_eq!(ws.counter(), 3);
}

#[test]
fn dry_run_writes_nothing() {
    let ws = Workspace::with_defaults();
    let provider = FakeStreetView::new(&[]);

    let mut app = App::with_provider(ws.config(&["--dry-run"]), &provider)
        .unwrap();
    let summary = app.run().unwrap();

    assert_eq!(summary.markers, 5);
    assert_eq!(summary.track_file, None);
    assert!(provider.fetched.borrow().is_empty());
    assert!(!exists(&ws.path("routes")));
    assert_eq!(ws.counter(), 3);
}

#[test]
fn malformed_route_fails_before_writing() {
    let mut route = route_geojson();
    route["features"][0]["properties"]["messages"] = json!([]);

    let ws = Workspace::new(&route, &json!({"api_key": "k", "file_counter": 1}));
    let provider = FakeStreetView::new(&[]);

    let mut app = App::with_provider(ws.config(&[]), &provider).unwrap();
    let err = app.run().unwrap_err();

    assert!(matches!(err, Error::Route(_)));
    assert!(!exists(&ws.path("routes")));
    assert_eq!(ws.counter(), 1);
}

#[test]
fn missing_api_key_is_fatal() {
    let ws = Workspace::new(&route_geojson(), &json!({"file_counter": 0}));
    let provider = FakeStreetView::new(&[]);

    let res = App::with_provider(ws.config(&[]), &provider);

    match res {
        Err(Error::Settings(msg)) => assert!(msg.contains("API key")),
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("missing API key accepted"),
    }
}

#[test]
fn missing_input_file_is_reported() {
    let ws = Workspace::with_defaults();
    fs::remove_file(ws.path("ride.geojson")).unwrap();
    let provider = FakeStreetView::new(&[]);

    let mut app = App::with_provider(ws.config(&[]), &provider).unwrap();
    let err = app.run().unwrap_err();

    assert!(err.to_string().contains("ride.geojson"));
    assert_eq!(ws.counter(), 3);
}
