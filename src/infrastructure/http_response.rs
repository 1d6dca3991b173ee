// HTTP response utilities for JSON and CSV payloads with optional Brotli encoding
use async_compression::tokio::bufread::BrotliEncoder;
use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Response, StatusCode},
};
use serde::Serialize;
use tokio::io::AsyncReadExt;

/// Whether the client advertised Brotli support
pub fn accepts_brotli(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').any(|enc| enc.trim().starts_with("br")))
        .unwrap_or(false)
}

async fn brotli(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = BrotliEncoder::new(std::io::Cursor::new(bytes));
    let mut compressed = Vec::new();
    encoder.read_to_end(&mut compressed).await?;
    Ok(compressed)
}

/// Build a response from raw bytes, compressing them when requested
pub async fn encoded_response(
    bytes: Vec<u8>,
    content_type: &'static str,
    compress: bool,
    extra_headers: &[(header::HeaderName, String)],
) -> Result<Response<Body>, StatusCode> {
    let (body_bytes, content_encoding) = if compress {
        let compressed = brotli(&bytes).await.map_err(|e| {
            tracing::error!("Brotli compression error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
        tracing::debug!(
            "Compressed: {} → {} bytes ({:.1}% reduction)",
            bytes.len(),
            compressed.len(),
            (1.0 - compressed.len() as f64 / bytes.len().max(1) as f64) * 100.0
        );
        (compressed, Some("br"))
    } else {
        (bytes, None)
    };

    let mut response_builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, body_bytes.len())
        .header(header::VARY, "accept-encoding");

    if let Some(encoding) = content_encoding {
        response_builder = response_builder.header(header::CONTENT_ENCODING, encoding);
    }
    for (name, value) in extra_headers {
        let value = HeaderValue::from_str(value).map_err(|e| {
            tracing::error!("Invalid header value for {}: {}", name, e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
        response_builder = response_builder.header(name, value);
    }

    response_builder.body(Body::from(body_bytes)).map_err(|e| {
        tracing::error!("Response build error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Serialize a value to JSON, optionally Brotli compressed
pub async fn json_response<T: Serialize>(
    data: &T,
    compress: bool,
) -> Result<Response<Body>, StatusCode> {
    let bytes = serde_json::to_vec(data).map_err(|e| {
        tracing::error!("JSON serialization error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    encoded_response(bytes, "application/json", compress, &[]).await
}

/// CSV download with an attachment file name
pub async fn csv_response(
    bytes: Vec<u8>,
    file_name: &str,
    compress: bool,
) -> Result<Response<Body>, StatusCode> {
    let disposition = format!("attachment; filename=\"{}\"", file_name);
    encoded_response(
        bytes,
        "text/csv; charset=utf-8",
        compress,
        &[(header::CONTENT_DISPOSITION, disposition)],
    )
    .await
}
