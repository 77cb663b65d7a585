//! Thin HTTP front end for one hosted instance (§4.12), grounded on the
//! teacher's `cli/web.rs` `tiny_http`-based server, generalized from
//! "serve two static HTML pages" to "serve the façade's read operations
//! and gate its one write operation behind a bearer token".
//!
//! Routes:
//! - `GET /view`   -> rendered configuration text (`Bundle::view`)
//! - `GET /json`   -> full tree JSON (`Bundle::json`)
//! - `GET /dump`   -> `{relative_path: text}` map (`Bundle::dump`)
//! - `GET /stats`  -> directive-kind counts (`Bundle::statistics_by_json`)
//! - `GET /query?kw=<selector>`     -> first match's kind
//! - `GET /query_all?kw=<selector>` -> every match's kind, in order
//! - `POST /login` -> `{username, password}` -> `{token}`
//! - `POST /update` -> JSON body replaces the tree (`Bundle::update_from_json_bytes`)
//!
//! `/update` (and every route, when an issuer is configured) requires
//! `Authorization: Bearer <token>` verified against [`TokenIssuer`].

use ngconf_auth::{StaticUserStore, TokenIssuer, UserStore};
use ngconf_engine::facade::Bundle;
use serde_json::json;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tiny_http::{Header, Method, Response, Server, StatusCode};

/// How often `incoming_requests`-equivalent polling checks the stop flag.
const POLL_TIMEOUT: Duration = Duration::from_millis(500);

/// Credentials and signing material for the front end's `/login` route.
/// Omitting this disables `/login` and auth gating entirely, leaving every
/// route open — useful for local or already-firewalled deployments.
pub struct AuthConfig {
    pub issuer: Arc<TokenIssuer>,
    pub store: Arc<dyn UserStore>,
}

impl AuthConfig {
    pub fn single_user(secret: &[u8], username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            issuer: Arc::new(TokenIssuer::new(secret)),
            store: Arc::new(StaticUserStore::new(username, password)),
        }
    }
}

/// Runs the HTTP front end for `bundle` on `addr` until `stop` is set.
/// Mirrors the teacher's `run_web`'s request loop, but polls a stop flag
/// between requests instead of looping forever, so it can be joined from
/// [`crate::service::HostedInstance`]'s `Drop`.
pub fn serve(bundle: Arc<Bundle>, addr: &str, auth: Option<Arc<AuthConfig>>, stop: Arc<AtomicBool>) {
    let server = match Server::http(addr) {
        Ok(server) => server,
        Err(err) => {
            tracing::warn!(%addr, error = %err, "failed to start HTTP front end");
            return;
        }
    };
    tracing::info!(%addr, "HTTP front end listening");

    while !stop.load(Ordering::SeqCst) {
        let request = match server.recv_timeout(POLL_TIMEOUT) {
            Ok(Some(request)) => request,
            Ok(None) => continue,
            Err(err) => {
                tracing::warn!(error = %err, "HTTP front end failed to receive request");
                continue;
            }
        };
        handle(request, &bundle, auth.as_deref());
    }
}

fn handle(mut request: tiny_http::Request, bundle: &Bundle, auth: Option<&AuthConfig>) {
    let method = request.method().clone();
    let url = request.url().to_string();
    let (path, query) = split_query(&url);

    if path == "/login" {
        let mut body = String::new();
        let _ = request.as_reader().read_to_string(&mut body);
        let response = login(auth, &body);
        let _ = request.respond(response);
        return;
    }

    if let Some(auth) = auth
        && let Err(response) = check_bearer(&request, auth)
    {
        let _ = request.respond(response);
        return;
    }

    let response = match (&method, path) {
        (Method::Get, "/view") => text_response(bundle.view()),
        (Method::Get, "/json") => json_response(bundle.json()),
        (Method::Get, "/dump") => json_response(dump_as_json(bundle)),
        (Method::Get, "/stats") => json_response(bundle.statistics_by_json()),
        (Method::Get, "/query") => query_response(bundle, query, false),
        (Method::Get, "/query_all") => query_response(bundle, query, true),
        (Method::Post, "/update") => {
            let mut body = Vec::new();
            let _ = request.as_reader().read_to_end(&mut body);
            update_response(bundle, &body)
        }
        _ => not_found(),
    };
    let _ = request.respond(response);
}

type BoxResponse = Response<std::io::Cursor<Vec<u8>>>;

fn split_query(url: &str) -> (&str, Option<&str>) {
    match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    }
}

fn query_param<'a>(query: Option<&'a str>, key: &str) -> Option<&'a str> {
    query?.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then_some(v)
    })
}

fn text_response(bytes: Vec<u8>) -> BoxResponse {
    Response::from_data(bytes).with_header(
        Header::from_bytes(&b"Content-Type"[..], &b"text/plain; charset=utf-8"[..]).unwrap(),
    )
}

fn json_response(value: serde_json::Value) -> BoxResponse {
    Response::from_data(serde_json::to_vec(&value).unwrap_or_default()).with_header(
        Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap(),
    )
}

fn error_response(status: u16, tag: &str, message: impl std::fmt::Display) -> BoxResponse {
    json_response(json!({ "error": tag, "message": message.to_string() }))
        .with_status_code(StatusCode(status))
}

fn not_found() -> BoxResponse {
    error_response(404, "not-found", "no such route")
}

fn dump_as_json(bundle: &Bundle) -> serde_json::Value {
    let dump = bundle.dump();
    let map: serde_json::Map<String, serde_json::Value> = dump
        .into_iter()
        .map(|(path, bytes)| (path, json!(String::from_utf8_lossy(&bytes))))
        .collect();
    serde_json::Value::Object(map)
}

fn query_response(bundle: &Bundle, query: Option<&str>, all: bool) -> BoxResponse {
    let Some(kw) = query_param(query, "kw") else {
        return error_response(400, "unknown-keyword", "missing 'kw' query parameter");
    };
    let kw = percent_decode(kw);

    if all {
        match bundle.query_all(&kw) {
            Ok(matches) => {
                let kinds: Vec<String> = matches
                    .into_iter()
                    .filter_map(|q| bundle.kind_of(q).ok())
                    .collect();
                json_response(json!({ "matches": kinds }))
            }
            Err(err) => error_response(400, err.tag(), err),
        }
    } else {
        match bundle.query(&kw).and_then(|q| bundle.kind_of(q)) {
            Ok(kind) => json_response(json!({ "kind": kind })),
            Err(err) => error_response(if err.tag() == "not-found" { 404 } else { 400 }, err.tag(), err),
        }
    }
}

fn update_response(bundle: &Bundle, body: &[u8]) -> BoxResponse {
    match bundle.update_from_json_bytes(body) {
        Ok(()) => json_response(json!({ "status": "updated" })),
        Err(err) => {
            let status = match err.tag() {
                "same-fingerprint" => 409,
                "type-mismatch" | "parse-error" => 400,
                _ => 500,
            };
            error_response(status, err.tag(), err)
        }
    }
}

#[derive(serde::Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

fn login(auth: Option<&AuthConfig>, body: &str) -> BoxResponse {
    let Some(auth) = auth else {
        return error_response(404, "not-found", "authentication is not configured for this instance");
    };
    let Ok(req) = serde_json::from_str::<LoginRequest>(body) else {
        return error_response(400, "parse-error", "expected {\"username\", \"password\"}");
    };
    match auth.issuer.login(auth.store.as_ref(), &req.username, &req.password) {
        Ok(token) => json_response(json!({ "token": token })),
        Err(err) => error_response(401, "not-found", err),
    }
}

fn check_bearer(request: &tiny_http::Request, auth: &AuthConfig) -> Result<(), BoxResponse> {
    let header = request
        .headers()
        .iter()
        .find(|h| h.field.equiv("Authorization"));
    let Some(header) = header else {
        return Err(error_response(401, "not-found", "missing Authorization header"));
    };
    let Some(token) = header.value.as_str().strip_prefix("Bearer ") else {
        return Err(error_response(401, "not-found", "expected a Bearer token"));
    };
    auth.issuer
        .verify_token(token)
        .map(|_| ())
        .map_err(|err| error_response(401, "not-found", err))
}

/// Decodes `%XX` escapes in a query-string value; selectors commonly carry
/// spaces and regex metacharacters that a client must percent-encode.
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                if let Ok(byte) = u8::from_str_radix(&input[i + 1..i + 3], 16) {
                    out.push(byte);
                    i += 3;
                } else {
                    out.push(bytes[i]);
                    i += 1;
                }
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_decode_handles_spaces_and_escapes() {
        assert_eq!(percent_decode("key%3Asep%3A%20listen"), "key:sep: listen");
        assert_eq!(percent_decode("a+b"), "a b");
    }

    #[test]
    fn query_param_extracts_value() {
        assert_eq!(query_param(Some("kw=server&x=1"), "kw"), Some("server"));
        assert_eq!(query_param(Some("x=1"), "kw"), None);
        assert_eq!(query_param(None, "kw"), None);
    }

    #[test]
    fn split_query_separates_path_and_query() {
        assert_eq!(split_query("/query?kw=server"), ("/query", Some("kw=server")));
        assert_eq!(split_query("/view"), ("/view", None));
    }
}
