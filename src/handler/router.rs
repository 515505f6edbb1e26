//! Request dispatch module
//!
//! Entry point for HTTP request processing: method validation, static file
//! dispatch, and the header finalization applied to every response.

use crate::config::AppState;
use crate::handler::static_files;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{
    HeaderMap, HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL,
    IF_MODIFIED_SINCE, REFERER, SERVER, USER_AGENT,
};
use hyper::http::request::Parts;
use hyper::{Method, Request, Response, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Request context encapsulating information needed for request processing
#[derive(Debug, Clone)]
pub struct RequestContext<'a> {
    pub method: Method,
    /// Raw URL path, still percent-encoded, without the query string
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub is_head: bool,
    pub if_modified_since: Option<String>,
}

impl<'a> RequestContext<'a> {
    pub fn new(method: Method, path: &'a str) -> Self {
        let is_head = method == Method::HEAD;
        Self {
            method,
            path,
            query: None,
            is_head,
            if_modified_since: None,
        }
    }

    fn from_parts(parts: &'a Parts) -> Self {
        let mut ctx = Self::new(parts.method.clone(), parts.uri.path());
        ctx.query = parts.uri.query();
        ctx.if_modified_since = header_string(&parts.headers, &IF_MODIFIED_SINCE);
        ctx
    }
}

/// Main entry point for HTTP request handling
///
/// The request body is never read; GET and HEAD carry none.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let (parts, _body) = req.into_parts();

    let ctx = RequestContext::from_parts(&parts);
    let response = respond(&ctx, &state).await;

    if state.access_log_enabled() {
        log_access(&parts, &response, peer_addr, started, &state);
    }

    Ok(response)
}

/// Produce the finished response for a request
pub async fn respond(ctx: &RequestContext<'_>, state: &AppState) -> Response<Full<Bytes>> {
    let response = match check_http_method(&ctx.method) {
        Some(resp) => resp,
        None => match static_files::serve(ctx, state.root()).await {
            Ok(resp) => resp,
            Err(err) => err.into_response(),
        },
    };

    finalize_response(response, ctx.is_head, &state.config.http.server_name)
}

/// Check HTTP method and return appropriate response for non-GET/HEAD methods
fn check_http_method(method: &Method) -> Option<Response<Full<Bytes>>> {
    match *method {
        Method::GET | Method::HEAD => None,
        Method::OPTIONS => Some(http::build_options_response()),
        _ => Some(super::ServeError::MethodNotAllowed(method.clone()).into_response()),
    }
}

/// Append the headers every response carries and strip HEAD bodies
///
/// `insert` replaces, so each injected header appears exactly once even if a
/// builder already set it. HEAD keeps the GET headers, `Content-Length`
/// included, with an empty body.
fn finalize_response(
    mut response: Response<Full<Bytes>>,
    is_head: bool,
    server_name: &str,
) -> Response<Full<Bytes>> {
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    if let Ok(server) = HeaderValue::from_str(server_name) {
        headers.insert(SERVER, server);
    }

    if is_head {
        response.map(|_| Full::new(Bytes::new()))
    } else {
        response
    }
}

fn log_access(
    parts: &Parts,
    response: &Response<Full<Bytes>>,
    peer_addr: SocketAddr,
    started: Instant,
    state: &AppState,
) {
    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        parts.method.to_string(),
        parts.uri.path().to_string(),
    );
    entry.query = parts.uri.query().map(ToString::to_string);
    entry.http_version = version_label(parts.version).to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = response
        .body()
        .size_hint()
        .exact()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0);
    entry.referer = header_string(&parts.headers, &REFERER);
    entry.user_agent = header_string(&parts.headers, &USER_AGENT);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

    logger::log_access(&entry, &state.config.logging.access_log_format);
}

fn header_string(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

const fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
