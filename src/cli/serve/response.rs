//! HTTP response handlers.

use anyhow::{Result, anyhow};
use tiny_http::{Header, Method, Request, Response, StatusCode};

use crate::channel::PageSnapshot;

const HTML: &str = "text/html; charset=utf-8";
const PLAIN: &str = "text/plain; charset=utf-8";

/// Respond with the live document, honouring `If-None-Match`.
pub fn respond_snapshot(request: Request, snapshot: &PageSnapshot) -> Result<()> {
    let etag = make_header("ETag", &snapshot.etag)?;
    let no_cache = make_header("Cache-Control", "no-cache")?;

    if if_none_match(&request).is_some_and(|tag| snapshot.matches(&tag)) {
        let response = Response::empty(StatusCode(304))
            .with_header(etag)
            .with_header(no_cache);
        return request.respond(response).map_err(Into::into);
    }

    if is_head_request(&request) {
        let response = Response::empty(StatusCode(200))
            .with_header(make_header("Content-Type", HTML)?)
            .with_header(etag)
            .with_header(no_cache);
        return request.respond(response).map_err(Into::into);
    }

    let response = Response::from_data(snapshot.html.as_bytes().to_vec())
        .with_header(make_header("Content-Type", HTML)?)
        .with_header(etag)
        .with_header(no_cache);
    request.respond(response)?;
    Ok(())
}

/// Respond with 404 Not Found.
pub fn respond_not_found(request: Request) -> Result<()> {
    send_plain(request, 404, "404 Not Found")
}

/// Respond with 405 for anything but GET/HEAD.
pub fn respond_method_not_allowed(request: Request) -> Result<()> {
    send_plain(request, 405, "405 Method Not Allowed")
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> Result<()> {
    send_plain(request, 503, "503 Service Unavailable")
}

pub fn is_read_request(request: &Request) -> bool {
    matches!(request.method(), Method::Get | Method::Head)
}

fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

fn if_none_match(request: &Request) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case("if-none-match"))
        .map(|h| h.value.to_string())
}

fn send_plain(request: Request, status: u16, body: &str) -> Result<()> {
    let response = Response::from_string(body)
        .with_status_code(StatusCode(status))
        .with_header(make_header("Content-Type", PLAIN)?);
    request.respond(response)?;
    Ok(())
}

fn make_header(key: &str, value: &str) -> Result<Header> {
    Header::from_bytes(key, value).map_err(|()| anyhow!("invalid header {key}: {value}"))
}
