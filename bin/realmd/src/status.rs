//! Operator status endpoint: health, metrics and the realm list as JSON

use crate::metrics::RealmMetrics;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Request, Response, StatusCode};
use realm_core::{find_build_info, ProtocolEra, Realm, RealmRegistry};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};

/// State shared by every status connection
pub struct StatusState {
    pub registry: Arc<RealmRegistry>,
    pub metrics: RealmMetrics,
}

impl StatusState {
    pub fn new(registry: Arc<RealmRegistry>, metrics: RealmMetrics) -> Self {
        metrics.record_snapshot(&registry.snapshot());
        Self { registry, metrics }
    }

    /// Refresh the realm list if due and keep the metrics in step.
    pub async fn refresh_if_due(&self) {
        match self.registry.maybe_refresh().await {
            Ok(Some(report)) => {
                self.metrics.record_refresh(&report);
                self.metrics.record_snapshot(&self.registry.snapshot());
                debug!("Realm list refreshed: {} realms", report.loaded);
            }
            Ok(None) => {}
            Err(e) => {
                self.metrics.refresh_failures_total.inc();
                error!("Realm list refresh failed, keeping previous list: {}", e);
            }
        }
    }
}

/// A routed response before it becomes an HTTP body
#[derive(Debug)]
pub struct StatusResponse {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: String,
}

impl StatusResponse {
    fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.into(),
        }
    }

    fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_string_pretty(value) {
            Ok(body) => Self {
                status: StatusCode::OK,
                content_type: "application/json",
                body,
            },
            Err(e) => Self::text(StatusCode::INTERNAL_SERVER_ERROR, format!("{}\n", e)),
        }
    }

    pub fn into_response(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(Bytes::from(self.body)));
        *response.status_mut() = self.status;
        response.headers_mut().insert(
            hyper::header::CONTENT_TYPE,
            hyper::header::HeaderValue::from_static(self.content_type),
        );
        response
    }
}

#[derive(Debug, Serialize)]
pub struct ClientBuildView {
    pub build: u32,
    pub era: ProtocolEra,
    pub known: bool,
    pub version: Option<String>,
    pub exe_hash: Option<String>,
    pub dll_hash: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RealmView {
    pub id: u32,
    pub name: String,
    pub era: ProtocolEra,
    pub listed: bool,
    pub external_address: String,
    pub local_address: String,
    pub icon: u8,
    pub timezone: u8,
    pub flags: u8,
    pub allowed_security_level: u8,
    pub population: f32,
    pub builds: Vec<u32>,
    pub version: String,
}

impl RealmView {
    fn new(realm: &Realm, client_build: Option<u32>) -> Self {
        let flags = match client_build {
            Some(build) => realm.flags_for_client(build),
            None => realm.flags,
        };

        Self {
            id: realm.id,
            name: realm.list_name(),
            era: realm.era(),
            listed: realm.is_listed(),
            external_address: realm.external_address.to_string(),
            local_address: realm.local_address.to_string(),
            icon: realm.icon,
            timezone: realm.timezone,
            flags: flags.bits(),
            allowed_security_level: realm.allowed_security_level.as_u8(),
            population: realm.population,
            builds: realm.supported_builds.iter().copied().collect(),
            version: realm.build_info.version_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RealmListView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientBuildView>,
    pub realms: Vec<RealmView>,
}

fn client_build_view(registry: &RealmRegistry, build: u32) -> ClientBuildView {
    let info = find_build_info(build);
    ClientBuildView {
        build,
        era: registry.build_to_era(build),
        known: info.is_some(),
        version: info.map(|i| i.version_string()),
        exe_hash: info.and_then(|i| i.exe_hash_hex()),
        dll_hash: info.and_then(|i| i.dll_hash_hex()),
    }
}

fn query_param<'a>(query: Option<&'a str>, key: &str) -> Option<&'a str> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

/// Route a request to its response
pub fn route(
    method: &Method,
    path: &str,
    query: Option<&str>,
    state: &StatusState,
) -> StatusResponse {
    if method != Method::GET {
        return StatusResponse::text(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed\n");
    }

    match path {
        "/healthz" => StatusResponse::text(StatusCode::OK, "OK\n"),
        "/metrics" => match state.metrics.gather() {
            Ok(text) => StatusResponse {
                status: StatusCode::OK,
                content_type: "text/plain; version=0.0.4",
                body: text,
            },
            Err(e) => StatusResponse::text(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to gather metrics: {}\n", e),
            ),
        },
        "/realms" => realm_list(query, state),
        _ => StatusResponse::text(StatusCode::NOT_FOUND, "Not Found\n"),
    }
}

fn realm_list(query: Option<&str>, state: &StatusState) -> StatusResponse {
    let build = match query_param(query, "build").map(str::parse::<u32>) {
        Some(Ok(build)) => Some(build),
        Some(Err(_)) => {
            return StatusResponse::text(StatusCode::BAD_REQUEST, "build must be a number\n");
        }
        None => None,
    };

    let snapshot = state.registry.snapshot();
    let view = match build {
        Some(build) => RealmListView {
            client: Some(client_build_view(&state.registry, build)),
            realms: snapshot
                .for_build(build)
                .iter()
                .map(|realm| RealmView::new(realm, Some(build)))
                .collect(),
        },
        None => RealmListView {
            client: None,
            realms: snapshot
                .realms()
                .map(|realm| RealmView::new(realm, None))
                .collect(),
        },
    };

    StatusResponse::json(&view)
}

pub async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<StatusState>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    debug!("{} {}", method, path);

    // listing clients are what drives refreshes in the auth server too
    if path == "/realms" {
        state.refresh_if_due().await;
    }

    Ok(route(&method, &path, req.uri().query(), &state).into_response())
}
