//! Request logging middleware

use super::super::state::ServerState;
use crate::server::metrics::record_http_request;
use axum::extract::{MatchedPath, State};
use axum::{
    body::Body,
    http::{header::HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;
use tracing::{error, info};

#[derive(PartialEq, PartialOrd, Clone, Debug, Default, clap::ValueEnum)]
pub enum RequestsLoggingLevel {
    None,
    #[default]
    Path,
    Headers,
    Body,
}

impl std::fmt::Display for RequestsLoggingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

const MAX_LOGGABLE_BODY_LENGTH: usize = 1024;

enum ContentLengthParseResult {
    Ok(usize),
    No(&'static str),
}

fn parse_content_length(headers: &HeaderMap) -> ContentLengthParseResult {
    let value = match headers.get("content-length") {
        Some(x) => x,
        None => return ContentLengthParseResult::No("Content-length not set."),
    };

    let str_value = match value.to_str() {
        Ok(x) => x,
        Err(_) => {
            return ContentLengthParseResult::No("Could not get Content-length string value.")
        }
    };

    match str_value.parse::<usize>() {
        Ok(x) => ContentLengthParseResult::Ok(x),
        Err(_) => ContentLengthParseResult::No("Could not parse Content-length numeric value."),
    }
}

/// Reads a small body fully so it can be logged, then hands it back.
async fn log_body(label: &str, headers: &HeaderMap, body: Body) -> Result<Body, StatusCode> {
    match parse_content_length(headers) {
        ContentLengthParseResult::No(reason) => {
            info!("  {} Body: {}", label, reason);
            Ok(body)
        }
        ContentLengthParseResult::Ok(size) if size < MAX_LOGGABLE_BODY_LENGTH => {
            let bytes = axum::body::to_bytes(body, size).await.map_err(|err| {
                error!("Failed to read {} body: {:?}", label, err);
                StatusCode::INTERNAL_SERVER_ERROR
            })?;
            info!("  {} Body:\n{}", label, String::from_utf8_lossy(&bytes));
            Ok(Body::from(bytes))
        }
        ContentLengthParseResult::Ok(size) => {
            info!(
                "  {} Body: Too big to log ({:#})",
                label,
                byte_unit::Byte::from(size)
            );
            Ok(body)
        }
    }
}

pub async fn log_requests(
    State(state): State<ServerState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let level = state.config.requests_logging_level.clone();
    let start = Instant::now();

    let method = request.method().to_string();
    let uri = request.uri().to_string();
    // Route templates keep the metric label cardinality bounded.
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    if level > RequestsLoggingLevel::None {
        info!(">>> {} {}", method, uri);
    }

    if level >= RequestsLoggingLevel::Headers {
        info!("  Req Headers:");
        for header in request.headers().iter() {
            info!("    {:?}: {:?}", header.0, header.1);
        }
    }

    if level >= RequestsLoggingLevel::Body {
        let (parts, body) = request.into_parts();
        let body = match log_body("Req", &parts.headers, body).await {
            Ok(body) => body,
            Err(status) => return status.into_response(),
        };
        request = Request::from_parts(parts, body);
    }

    let mut response = next.run(request).await;

    if level >= RequestsLoggingLevel::Headers {
        info!("  Resp Headers:");
        for header in response.headers().iter() {
            info!("    {:?}: {:?}", header.0, header.1);
        }
    }

    if level >= RequestsLoggingLevel::Body {
        let (parts, body) = response.into_parts();
        let body = match log_body("Resp", &parts.headers, body).await {
            Ok(body) => body,
            Err(status) => return status.into_response(),
        };
        response = Response::from_parts(parts, body);
    }

    let status = response.status().as_u16();
    let duration = start.elapsed();

    if level > RequestsLoggingLevel::None {
        info!("<<< {} ({}ms)", status, duration.as_millis());
    }

    record_http_request(&method, &route, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_ordering() {
        let none = RequestsLoggingLevel::None;

        assert!(none < RequestsLoggingLevel::Headers);
        assert!(RequestsLoggingLevel::Body > RequestsLoggingLevel::None);
        assert_eq!(RequestsLoggingLevel::default(), RequestsLoggingLevel::Path);
    }

    #[test]
    fn content_length_parsing() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            parse_content_length(&headers),
            ContentLengthParseResult::No(_)
        ));

        headers.insert("content-length", "42".parse().unwrap());
        assert!(matches!(
            parse_content_length(&headers),
            ContentLengthParseResult::Ok(42)
        ));

        headers.insert("content-length", "many".parse().unwrap());
        assert!(matches!(
            parse_content_length(&headers),
            ContentLengthParseResult::No(_)
        ));
    }
}
