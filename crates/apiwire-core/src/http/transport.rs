//! Pluggable transport capability
//!
//! The pipeline only needs `send(request) -> response`. `ReqwestTransport`
//! is the default implementation; tests and embedders can supply their own.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;

use crate::config::HttpClientConfiguration;
use crate::http::body::{MultipartPart, PartContent, RequestBody};
use crate::http::error::{TransportError, TransportErrorKind};
use crate::http::headers::Headers;
use crate::http::request::HttpRequest;
use crate::http::response::HttpResponse;
use crate::Result;

/// Executes a request descriptor and returns the buffered response
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one attempt of `request`, bounded by `timeout` when given
    async fn send(
        &self,
        request: &HttpRequest,
        timeout: Option<Duration>,
    ) -> std::result::Result<HttpResponse, TransportError>;
}

/// Transport backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: ReqwestClient,
}

impl ReqwestTransport {
    /// Create a transport honouring the TLS settings of `config`
    pub fn new(config: &HttpClientConfiguration) -> Result<Self> {
        let client = ReqwestClient::builder()
            .danger_accept_invalid_certs(config.skip_ssl_cert_verification)
            .build()
            .map_err(|e| crate::Error::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(e.into()),
            })?;
        Ok(Self { client })
    }

    /// Wrap an existing reqwest client
    pub fn from_client(client: ReqwestClient) -> Self {
        Self { client }
    }

    fn multipart_form(
        parts: &[MultipartPart],
    ) -> std::result::Result<reqwest::multipart::Form, TransportError> {
        let mut form = reqwest::multipart::Form::new();
        for part in parts {
            let mut wire_part = match &part.content {
                PartContent::Text(text) => reqwest::multipart::Part::text(text.clone()),
                PartContent::File(file) => {
                    let mut file_part = reqwest::multipart::Part::bytes(file.data().to_vec());
                    if let Some(name) = file.file_name() {
                        file_part = file_part.file_name(name.to_string());
                    }
                    file_part
                }
            };
            if let Some(content_type) = &part.content_type {
                wire_part = wire_part
                    .mime_str(content_type)
                    .map_err(TransportError::from_reqwest)?;
            }
            form = form.part(part.name.clone(), wire_part);
        }
        Ok(form)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: &HttpRequest,
        timeout: Option<Duration>,
    ) -> std::result::Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method().clone(), request.url());

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        if let RequestBody::Multipart(parts) = request.body() {
            // reqwest writes its own multipart content type with the boundary
            for (name, value) in request.headers().iter() {
                if !name.eq_ignore_ascii_case("content-type") {
                    builder = builder.header(name, value);
                }
            }
            builder = builder.multipart(Self::multipart_form(parts)?);
        } else {
            for (name, value) in request.headers().iter() {
                builder = builder.header(name, value);
            }
            match request.body().to_bytes() {
                Some(bytes) if !bytes.is_empty() => builder = builder.body(bytes),
                _ => {}
            }
        }

        let response = builder.send().await.map_err(TransportError::from_reqwest)?;

        let status = response.status().as_u16();
        let mut headers = Headers::new();
        for (name, value) in response.headers() {
            headers.append(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::new(TransportErrorKind::Body, e.to_string()))?;

        Ok(HttpResponse::new(status, headers, body.to_vec()))
    }
}
