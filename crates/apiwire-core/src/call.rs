//! End-to-end call execution
//!
//! An [`ApiCall`] ties one [`RequestBuilder`] and one [`ResponseHandler`] to
//! the shared configuration: build, log, send with retries and interceptors,
//! log again, then route the response.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::GlobalConfiguration;
use crate::http::request::HttpRequest;
use crate::http::response::HttpResponse;
use crate::http::retry::{execute_with_retry, RetryHandler};
use crate::logging::{create_call_span, generate_call_id};
use crate::request::RequestBuilder;
use crate::response::{ApiResponse, ResponseHandler};
use crate::{Error, Result};

/// One configured API call
pub struct ApiCall<T> {
    config: Arc<GlobalConfiguration>,
    request: Option<RequestBuilder>,
    response: Option<ResponseHandler<T>>,
    cancellation: Option<CancellationToken>,
}

impl<T> ApiCall<T> {
    pub fn new(config: Arc<GlobalConfiguration>) -> Self {
        Self {
            config,
            request: None,
            response: None,
            cancellation: None,
        }
    }

    pub fn request(mut self, request: RequestBuilder) -> Self {
        self.request = Some(request);
        self
    }

    pub fn response(mut self, response: ResponseHandler<T>) -> Self {
        self.response = Some(response);
        self
    }

    /// Abort the call (including retry waits) once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Execute and return only the deserialized value
    pub async fn execute(&self) -> Result<Option<T>> {
        Ok(self.execute_as_api_response().await?.into_data())
    }

    /// Execute and return status, headers and the deserialized value
    pub async fn execute_as_api_response(&self) -> Result<ApiResponse<T>> {
        let builder = self
            .request
            .as_ref()
            .ok_or_else(|| Error::configuration("API call has no request builder"))?;
        let handler = self
            .response
            .as_ref()
            .ok_or_else(|| Error::configuration("API call has no response handler"))?;

        let request = builder.build(&self.config)?;

        let call_id = generate_call_id();
        let span = create_call_span(&call_id, request.method().as_str(), request.url());

        async {
            self.config.logger().log_request(&request);

            let response = self.send(&request).await.inspect_err(|e| {
                tracing::warn!(error = %e, "call failed before a response was routed");
            })?;

            self.config.logger().log_response(&response);

            handler.handle(&request, &response, self.config.error_cases())
        }
        .instrument(span)
        .await
    }

    /// Execute on a private current-thread runtime
    #[cfg(feature = "blocking")]
    pub fn execute_blocking(&self) -> Result<Option<T>> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.execute())
    }

    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let config = self.config.as_ref();
        let transport = config.transport();
        let timeout = config.http_client().timeout();
        let retry = RetryHandler::new(
            config.http_client().retry.clone(),
            request.method(),
            request.retry_option(),
        );

        execute_with_retry(
            |attempt| async move {
                if attempt > 0 {
                    tracing::debug!(attempt, "resending request");
                }
                for interceptor in config.interceptors() {
                    interceptor.before_request(request);
                }
                let outcome = transport.send(request, timeout).await;
                if let Ok(response) = &outcome {
                    for interceptor in config.interceptors() {
                        interceptor.after_response(request, response);
                    }
                }
                outcome
            },
            retry,
            self.cancellation.as_ref(),
        )
        .await
    }
}
