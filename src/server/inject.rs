// src/server/inject.rs

//! Middleware adding the live-reload client to HTML responses.

use axum::body::{Body, to_bytes};
use axum::extract::Request;
use axum::http::StatusCode;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use super::CLIENT_PATH;

/// Pages larger than this are passed through untouched.
const MAX_HTML_BYTES: usize = 16 * 1024 * 1024;

pub fn client_tag() -> String {
    format!(r#"<script src="{CLIENT_PATH}"></script>"#)
}

/// Insert the client tag before the last `</body>`, or append it when the
/// page has no body element.
pub fn inject_script(html: &str) -> String {
    let tag = client_tag();
    let lower = html.to_ascii_lowercase();
    match lower.rfind("</body>") {
        Some(idx) => {
            let mut out = String::with_capacity(html.len() + tag.len());
            out.push_str(&html[..idx]);
            out.push_str(&tag);
            out.push_str(&html[idx..]);
            out
        }
        None => format!("{html}{tag}"),
    }
}

fn is_html(response: &Response) -> bool {
    response.status() == StatusCode::OK
        && response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/html"))
}

pub(crate) async fn inject_client(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    if !is_html(&response) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_HTML_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "could not buffer HTML response");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = String::from_utf8_lossy(&bytes);
    parts.headers.remove(CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(inject_script(&html)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injects_before_closing_body() {
        let out = inject_script("<html><BODY><p>x</p></BODY></html>");
        assert_eq!(
            out,
            r#"<html><BODY><p>x</p><script src="/__livereload.js"></script></BODY></html>"#
        );
    }

    #[test]
    fn appends_when_there_is_no_body() {
        let out = inject_script("<p>fragment</p>");
        assert!(out.ends_with(&client_tag()));
    }
}
