//! In-process stand-in for the upstream providers.
//!
//! Serves scripted replies per path on an ephemeral localhost port and
//! records every request it sees.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use tokio::time::Instant;

/// A scripted response.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }
}

#[derive(Default)]
struct Script {
    routes: HashMap<String, VecDeque<Reply>>,
    requests: Vec<(Instant, String)>,
}

/// Fixture HTTP server.
pub struct FakeUpstream {
    base_url: String,
    script: Arc<Mutex<Script>>,
}

impl FakeUpstream {
    pub async fn start() -> Self {
        let script = Arc::new(Mutex::new(Script::default()));
        let app = Router::new().fallback(respond).with_state(script.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            script,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Script the replies for `path`, served in order. The last reply
    /// repeats once the others are used up.
    pub fn route(&self, path: &str, replies: impl IntoIterator<Item = Reply>) {
        let mut script = self.script.lock().unwrap();
        script
            .routes
            .insert(path.to_string(), replies.into_iter().collect());
    }

    /// Every request seen so far, as path plus query.
    pub fn requests(&self) -> Vec<String> {
        let script = self.script.lock().unwrap();
        script.requests.iter().map(|(_, r)| r.clone()).collect()
    }

    /// Arrival times of requests to exactly `path`.
    pub fn arrivals(&self, path: &str) -> Vec<Instant> {
        let script = self.script.lock().unwrap();
        script
            .requests
            .iter()
            .filter(|(_, r)| path_of(r) == path)
            .map(|(at, _)| *at)
            .collect()
    }

    /// Number of requests to exactly `path`.
    pub fn hits(&self, path: &str) -> usize {
        self.arrivals(path).len()
    }
}

fn path_of(request: &str) -> &str {
    request.split('?').next().unwrap_or(request)
}

async fn respond(State(script): State<Arc<Mutex<Script>>>, uri: Uri) -> (StatusCode, String) {
    let mut script = script.lock().unwrap();
    script.requests.push((Instant::now(), uri.to_string()));

    let reply = match script.routes.get_mut(uri.path()) {
        Some(queue) if queue.len() > 1 => queue.pop_front(),
        Some(queue) => queue.front().cloned(),
        None => None,
    };

    match reply {
        Some(reply) => (
            StatusCode::from_u16(reply.status).unwrap(),
            reply.body,
        ),
        None => (StatusCode::NOT_FOUND, "no such route".to_string()),
    }
}

/// Canned upstream payloads shared across test modules.
pub mod fixtures {
    /// Listing with two usable stations and one of each filtered kind.
    pub const CHS_LISTING: &str = r#"[
        {"id": "5cebf1de3d0f4a073c4bbd8f", "code": "07735", "officialName": "Vancouver",
         "timeZoneCode": "America/Vancouver",
         "latitude": 49.29, "longitude": -123.11, "operating": true, "type": "PERMANENT",
         "timeSeries": [{"code": "wlo"}, {"code": "wlp-hilo"}]},
        {"id": "5cebf1df3d0f4a073c4bbfa1", "code": "00490", "officialName": "Halifax, NS",
         "latitude": 44.67, "longitude": -63.58, "operating": true, "type": "PERMANENT",
         "timeSeries": [{"code": "wlp-hilo"}]},
        {"id": "5cebf1e03d0f4a073c4bc0b2", "code": "07795", "officialName": "Point Atkinson",
         "latitude": 49.34, "longitude": -123.25, "operating": false, "type": "PERMANENT",
         "timeSeries": [{"code": "wlp-hilo"}]},
        {"id": "5cebf1e13d0f4a073c4bc1c3", "code": "07120", "officialName": "Victoria Harbour",
         "latitude": 48.42, "longitude": -123.37, "operating": true, "type": "TEMPORARY",
         "timeSeries": [{"code": "wlp-hilo"}]},
        {"id": "5cebf1e23d0f4a073c4bc2d4", "code": "08615", "officialName": "Tofino",
         "latitude": 49.15, "longitude": -125.91, "operating": true, "type": "PERMANENT",
         "timeSeries": [{"code": "wlo"}]}
    ]"#;

    /// NOAA `datagetter` answer for Point Roberts, June 2024 (first days).
    pub const NOAA_JUNE: &str = "Date,Time, Prediction, Type\n\
        2024-06-01,00:17, 3.245, H\n\
        2024-06-01,07:02, 0.912, L\n\
        2024-06-01,13:40, 2.801, H\n\
        2024-06-01,19:05, 1.440, L\n\
        2024-06-02,01:02, 3.198, H\n\
        2024-06-02,08:11, -0.104, L\n";

    /// IWLS `wlp-hilo` answer for Vancouver, June 2024, out of order. UTC
    /// times; the first event is still May 31 in Pacific time.
    pub const CHS_JUNE: &str = r#"[
        {"eventDate": "2024-06-01T18:40:00Z", "value": 0.87},
        {"eventDate": "2024-06-01T05:50:00Z", "value": 1.35},
        {"eventDate": "2024-06-01T12:23:00Z", "value": 4.12},
        {"eventDate": "2024-06-02T01:02:00Z", "value": 3.97},
        {"eventDate": "2024-06-02T07:31:00Z", "value": 0.21}
    ]"#;
}
