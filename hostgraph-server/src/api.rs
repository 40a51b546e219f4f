//! HTTP API over the hostgraph store.
//!
//! Uses `std::net::TcpListener` with one thread per connection; no external
//! HTTP framework needed. Endpoints:
//!
//! - `GET|POST /api/update/{host}/{graph}/`: push form fields (`_ts`, `_expire` are control keys)
//! - `GET /api/data/{host}/{graph}/{since}/data.json`: samples since a timestamp (JSON)
//! - `GET /api/graph/{host}/{graph}/`: fields, TTL and every sample of a graph (JSON)
//! - `GET /api/dump`: diagnostic text dump of the whole store
//! - `GET /api/health`: liveness check with store counts
//!
//! Host and graph names must match `[0-9a-z.]+`.

use std::collections::{BTreeMap, HashSet};
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use hostgraph::{Sample, Store};
use serde::Serialize;
use url::form_urlencoded;

/// Largest request body accepted, in bytes.
const MAX_BODY_BYTES: usize = 1 << 20;

/// Accepts connections forever, handling each on its own thread.
pub fn serve(listener: &TcpListener, store: &Arc<Store>) {
    for stream in listener.incoming() {
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("accept error: {e}");
                continue;
            }
        };

        let store = Arc::clone(store);
        let spawned = thread::Builder::new()
            .name("hostgraph-http".to_string())
            .spawn(move || {
                // Set a short read timeout so we don't block forever on slow clients
                let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));

                if let Err(e) = handle_connection(&stream, &store) {
                    tracing::debug!("request error: {e}");
                }
            });

        if let Err(e) = spawned {
            tracing::warn!("failed to spawn connection thread: {e}");
        }
    }
}

/// Reads one request, routes it and writes the response.
fn handle_connection(stream: &TcpStream, store: &Store) -> Result<(), Box<dyn std::error::Error>> {
    let mut reader = BufReader::new(stream);
    let response = match Request::read(&mut reader) {
        Ok(request) => route(&request, store),
        Err(e) => Response::text(400, &format!("400 bad request: {e}\n")),
    };
    response.write_to(stream)
}

/// A parsed HTTP request.
#[derive(Debug, Default, PartialEq)]
struct Request {
    method: String,
    path: String,
    query: String,
    content_type: Option<String>,
    body: Vec<u8>,
}

impl Request {
    /// Parses the request line, headers and body.
    fn read(reader: &mut impl BufRead) -> Result<Self, Box<dyn std::error::Error>> {
        let mut request_line = String::new();
        reader.read_line(&mut request_line)?;

        // Parse: "GET /path?query HTTP/1.x"
        let mut parts = request_line.split_whitespace();
        let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
            return Err("malformed request line".into());
        };

        let (path, query) = target.split_once('?').unwrap_or((target, ""));

        let mut content_length = 0usize;
        let mut content_type = None;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line)? == 0 || line.trim().is_empty() {
                break;
            }
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.parse()?;
            } else if name.eq_ignore_ascii_case("content-type") {
                content_type = Some(value.to_string());
            }
        }

        if content_length > MAX_BODY_BYTES {
            return Err(format!("body of {content_length} bytes exceeds {MAX_BODY_BYTES}").into());
        }

        let mut body = vec![0; content_length];
        reader.read_exact(&mut body)?;

        Ok(Self {
            method: method.to_string(),
            path: path.to_string(),
            query: query.to_string(),
            content_type,
            body,
        })
    }

    /// Form values from the body (for urlencoded POSTs) followed by the query string.
    ///
    /// When a key repeats, the first value wins.
    fn form(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();

        let is_form = self
            .content_type
            .as_deref()
            .is_none_or(|ct| ct.starts_with("application/x-www-form-urlencoded"));
        if self.method != "GET" && is_form {
            pairs.extend(form_urlencoded::parse(&self.body).into_owned());
        }
        pairs.extend(form_urlencoded::parse(self.query.as_bytes()).into_owned());

        let mut seen = HashSet::new();
        pairs
            .into_iter()
            .filter(|(k, _)| seen.insert(k.clone()))
            .collect()
    }
}

/// An HTTP response ready to be written.
#[derive(Debug, PartialEq)]
struct Response {
    status: u16,
    content_type: &'static str,
    body: String,
}

impl Response {
    fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.to_string(),
        }
    }

    fn json(value: &impl Serialize) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self {
                status: 200,
                content_type: "application/json",
                body,
            },
            Err(e) => {
                tracing::warn!("failed to encode response: {e}");
                Self::text(500, "500 internal server error\n")
            }
        }
    }

    fn not_found() -> Self {
        Self::text(404, "404 not found\n")
    }

    fn write_to(&self, mut stream: &TcpStream) -> Result<(), Box<dyn std::error::Error>> {
        let status_text = match self.status {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            500 => "Internal Server Error",
            _ => "Unknown",
        };

        write!(
            stream,
            "HTTP/1.1 {} {status_text}\r\n\
             Content-Type: {}\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n\
             {}",
            self.status,
            self.content_type,
            self.body.len(),
            self.body,
        )?;
        stream.flush()?;

        Ok(())
    }
}

/// Dispatches a request to its handler.
fn route(request: &Request, store: &Store) -> Response {
    let segments: Vec<&str> = request
        .path
        .trim_matches('/')
        .split('/')
        .collect();

    match segments.as_slice() {
        ["api", "health"] => handle_health(store),
        ["api", "dump"] => Response::text(200, &store.snapshot()),
        ["api", "update", host, graph] if valid_name(host) && valid_name(graph) => {
            handle_update(store, host, graph, request)
        }
        ["api", "data", host, graph, since, "data.json"]
            if valid_name(host) && valid_name(graph) && is_digits(since) =>
        {
            handle_data(store, host, graph, since)
        }
        ["api", "graph", host, graph] if valid_name(host) && valid_name(graph) => {
            handle_graph(store, host, graph)
        }
        _ => Response::not_found(),
    }
}

/// `GET /api/health`: liveness plus store counts.
fn handle_health(store: &Store) -> Response {
    Response::json(&serde_json::json!({
        "status": "ok",
        "stats": store.stats(),
    }))
}

/// `/api/update/{host}/{graph}/`: pushes every numeric form field.
///
/// `_ts` overrides the timestamp (default: now) and `_expire` sets the
/// graph TTL. The TTL is deliberately applied after the pushes: `set_expire`
/// ignores unknown graphs, so applying it first would drop the TTL on the
/// request that creates the graph.
fn handle_update(store: &Store, host: &str, graph: &str, request: &Request) -> Response {
    let form = request.form();

    let mut timestamp = store.now();
    let mut expire = None;
    for (key, value) in &form {
        match key.as_str() {
            "_ts" => {
                if let Ok(ts) = value.parse() {
                    timestamp = ts;
                }
            }
            "_expire" => expire = value.parse().ok(),
            _ => {}
        }
    }

    for (field, value) in &form {
        if field.is_empty() || field.starts_with('_') {
            continue;
        }
        if let Ok(value) = value.parse::<f64>() {
            store.push(host, graph, field, value, timestamp);
        }
    }

    if let Some(ttl_secs) = expire {
        store.set_expire(host, graph, ttl_secs);
    }

    Response::text(200, "ok\n")
}

/// `GET /api/data/{host}/{graph}/{since}/data.json`: per-field samples since `since`.
///
/// `since` is all digits (checked by the router); one too large for an
/// `i64` means everything.
fn handle_data(store: &Store, host: &str, graph: &str, since: &str) -> Response {
    if store.fields(host, graph).is_empty() {
        return Response::not_found();
    }

    let since = since.parse().unwrap_or(0);
    Response::json(&store.latest_items(host, graph, since))
}

/// Everything a graph page needs in one document.
#[derive(Debug, Serialize)]
struct GraphView<'a> {
    host: &'a str,
    graph: &'a str,
    fields: Vec<String>,
    ttl: i64,
    data: BTreeMap<String, Vec<Sample>>,
}

/// `GET /api/graph/{host}/{graph}/`: fields, TTL and full data of a graph.
fn handle_graph(store: &Store, host: &str, graph: &str) -> Response {
    let fields = store.fields(host, graph);
    if fields.is_empty() {
        return Response::not_found();
    }

    Response::json(&GraphView {
        host,
        graph,
        fields,
        ttl: store.get_expire(host, graph),
        data: store.latest_items(host, graph, 0),
    })
}

/// Timestamp path segments: `[0-9]+`.
fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Host and graph names: non-empty, `[0-9a-z.]` only.
fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase() || b == b'.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostgraph::{ManualClock, StoreConfig};

    fn test_store() -> Store {
        Store::with_clock(StoreConfig::default(), Arc::new(ManualClock::new(1_000))).unwrap()
    }

    fn get(path: &str) -> Request {
        let (path, query) = path.split_once('?').unwrap_or((path, ""));
        Request {
            method: "GET".to_string(),
            path: path.to_string(),
            query: query.to_string(),
            ..Request::default()
        }
    }

    #[test]
    fn test_read_request_with_body() {
        let raw = b"POST /api/update/web1/cpu/?_ts=5 HTTP/1.1\r\n\
                    Host: localhost\r\n\
                    Content-Type: application/x-www-form-urlencoded\r\n\
                    Content-Length: 9\r\n\
                    \r\n\
                    user=12.5";
        let request = Request::read(&mut &raw[..]).unwrap();

        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/api/update/web1/cpu/");
        assert_eq!(request.query, "_ts=5");
        assert_eq!(request.body, b"user=12.5");
    }

    #[test]
    fn test_read_rejects_garbage() {
        assert!(Request::read(&mut &b"\r\n"[..]).is_err());
    }

    #[test]
    fn test_form_body_wins_over_query() {
        let request = Request {
            method: "POST".to_string(),
            query: "a=1&b=2".to_string(),
            body: b"a=9".to_vec(),
            ..Request::default()
        };
        assert_eq!(
            request.form(),
            vec![
                ("a".to_string(), "9".to_string()),
                ("b".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_form_decoding() {
        let request = get("/?a+b%2Ec=100%25&pct=100%&bad=%zz&flag&&");
        assert_eq!(
            request.form(),
            vec![
                ("a b.c".to_string(), "100%".to_string()),
                ("pct".to_string(), "100%".to_string()),
                ("bad".to_string(), "%zz".to_string()),
                ("flag".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_valid_name() {
        assert!(valid_name("web1.example.com"));
        assert!(!valid_name("Web1"));
        assert!(!valid_name("web_1"));
        assert!(!valid_name(""));
    }

    #[test]
    fn test_update_pushes_numeric_fields() {
        let store = test_store();
        let response = route(&get("/api/update/web1/cpu/?user=1.5&system=2&bad=x"), &store);
        assert_eq!(response, Response::text(200, "ok\n"));

        assert_eq!(store.fields("web1", "cpu"), vec!["system", "user"]);
        assert_eq!(
            store.latest_items("web1", "cpu", 0)["user"],
            vec![Sample::new(1_000, 1.5)]
        );
    }

    #[test]
    fn test_update_with_timestamp_and_expire() {
        let store = test_store();
        route(&get("/api/update/web1/cpu/?_ts=42&_expire=300&user=1"), &store);

        assert_eq!(store.get_expire("web1", "cpu"), 300);
        assert_eq!(
            store.latest_items("web1", "cpu", 0)["user"],
            vec![Sample::new(42, 1.0)]
        );
    }

    #[test]
    fn test_update_rejects_bad_names() {
        let store = test_store();
        let response = route(&get("/api/update/Web1/cpu/?user=1"), &store);
        assert_eq!(response.status, 404);
        assert!(store.hosts().is_empty());
    }

    #[test]
    fn test_data_endpoint() {
        let store = test_store();
        store.push("web1", "cpu", "user", 1.0, 10);
        store.push("web1", "cpu", "user", 2.0, 20);

        let response = route(&get("/api/data/web1/cpu/15/data.json"), &store);
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, "application/json");

        let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body, serde_json::json!({"user": [{"timestamp": 20, "value": 2.0}]}));
    }

    #[test]
    fn test_data_unknown_graph_is_404() {
        let store = test_store();
        assert_eq!(route(&get("/api/data/web1/cpu/0/data.json"), &store).status, 404);
        assert_eq!(route(&get("/api/data/Web1/cpu/0/data.json"), &store).status, 404);
    }

    #[test]
    fn test_data_since_must_be_digits() {
        let store = test_store();
        store.push("web1", "cpu", "user", 1.0, 10);
        store.push("web1", "cpu", "user", 2.0, 20);

        for since in ["abc", "-5", "1e3", "%20"] {
            let path = format!("/api/data/web1/cpu/{since}/data.json");
            assert_eq!(route(&get(&path), &store).status, 404, "since={since}");
        }

        // Digits that overflow an i64 mean everything.
        let response = route(&get("/api/data/web1/cpu/99999999999999999999/data.json"), &store);
        let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["user"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_graph_endpoint() {
        let store = test_store();
        store.push("web1", "cpu", "user", 1.0, 10);

        let response = route(&get("/api/graph/web1/cpu/"), &store);
        let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["host"], "web1");
        assert_eq!(body["fields"], serde_json::json!(["user"]));
        assert_eq!(body["ttl"], 60);
        assert_eq!(body["data"]["user"][0]["timestamp"], 10);
    }

    #[test]
    fn test_dump_and_health() {
        let store = test_store();
        store.push("web1", "cpu", "user", 1.0, 10);

        let dump = route(&get("/api/dump"), &store);
        assert!(dump.body.starts_with("web1\n--> cpu ttl=60s\n"));

        let health = route(&get("/api/health"), &store);
        let body: serde_json::Value = serde_json::from_str(&health.body).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["stats"]["samples"], 1);
    }

    #[test]
    fn test_unknown_path_is_404() {
        let store = test_store();
        assert_eq!(route(&get("/"), &store).status, 404);
        assert_eq!(route(&get("/graph/web1/cpu/"), &store).status, 404);
    }
}
