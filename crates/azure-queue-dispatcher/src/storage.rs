//! Azure Storage Queue transport over the REST API.
//!
//! This module talks to the queue service with direct HTTP calls instead of a
//! vendor SDK, which keeps the request/response handling transparent and lets
//! unit tests run against a mock HTTP server.
//!
//! ## Authentication
//!
//! Requests are signed with the storage account Shared Key: an HMAC-SHA256
//! over a canonical description of the request (verb, standard headers,
//! `x-ms-*` headers and the canonicalized resource), sent as
//! `Authorization: SharedKey {account}:{signature}`.
//!
//! ## Request pipeline
//!
//! Every Put Message call runs through a fixed-interval retry pipeline. Each
//! try is bounded by [`RetryOptions::try_timeout`]; transient failures
//! (network errors, timeouts, HTTP 408/429/500/502/503/504) are retried until
//! [`RetryOptions::max_tries`] is reached.
//!
//! ## References
//!
//! - [Put Message](https://learn.microsoft.com/rest/api/storageservices/put-message)
//! - [Authorize with Shared Key](https://learn.microsoft.com/rest/api/storageservices/authorize-with-shared-key)

use crate::error::{ConfigurationError, StorageError};
use crate::message::{EnqueueOptions, EnqueuedMessage};
use crate::retry::RetryOptions;
use crate::task::QueueName;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client as HttpClient;
use sha2::Sha256;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};
use url::Url;
use zeroize::Zeroizing;

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;

/// Queue service REST API version
pub const STORAGE_API_VERSION: &str = "2019-12-12";

const CONTENT_TYPE_XML: &str = "application/xml";

type HmacSha256 = Hmac<Sha256>;

/// Transport that places messages on a queue.
///
/// [`AzureQueueStorage`] is the production implementation; tests and
/// alternative back ends provide their own.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Enqueue one message and return the service receipt
    async fn enqueue(
        &self,
        queue: &QueueName,
        message_text: &str,
        options: &EnqueueOptions,
    ) -> Result<EnqueuedMessage, StorageError>;
}

// ============================================================================
// Shared Key Signing
// ============================================================================

/// Shared Key credential for a storage account
#[derive(Clone)]
pub struct SharedKeyCredential {
    account: String,
    key: Zeroizing<Vec<u8>>,
}

impl fmt::Debug for SharedKeyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedKeyCredential")
            .field("account", &self.account)
            .field("key", &"<redacted>")
            .finish()
    }
}

impl SharedKeyCredential {
    /// Create a credential from the account name and the decoded key bytes
    pub fn new(account: impl Into<String>, key: Vec<u8>) -> Self {
        Self {
            account: account.into(),
            key: Zeroizing::new(key),
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    /// Build the canonical string-to-sign for a request
    ///
    /// `ms_headers` holds every `x-ms-*` header sent with the request. A zero
    /// content length is signed as an empty line.
    pub fn string_to_sign(
        &self,
        method: &str,
        url: &Url,
        content_length: usize,
        content_type: &str,
        ms_headers: &[(&str, &str)],
    ) -> String {
        let content_length = if content_length == 0 {
            String::new()
        } else {
            content_length.to_string()
        };

        format!(
            "{}\n\n\n{}\n\n{}\n\n\n\n\n\n\n{}{}",
            method.to_uppercase(),
            content_length,
            content_type,
            canonicalized_headers(ms_headers),
            self.canonicalized_resource(url)
        )
    }

    /// Sign a request and return the `Authorization` header value
    pub fn authorization(
        &self,
        method: &str,
        url: &Url,
        content_length: usize,
        content_type: &str,
        ms_headers: &[(&str, &str)],
    ) -> String {
        let string_to_sign =
            self.string_to_sign(method, url, content_length, content_type, ms_headers);
        format!("SharedKey {}:{}", self.account, self.sign(&string_to_sign))
    }

    fn sign(&self, string_to_sign: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC can take key of any size");
        mac.update(string_to_sign.as_bytes());
        BASE64.encode(mac.finalize().into_bytes())
    }

    /// `/{account}{path}` followed by one `\nname:value` line per query
    /// parameter, sorted by lowercase name
    fn canonicalized_resource(&self, url: &Url) -> String {
        let mut params: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in url.query_pairs() {
            params
                .entry(name.to_lowercase())
                .or_default()
                .push(value.into_owned());
        }

        let mut names: Vec<_> = params.keys().cloned().collect();
        names.sort();

        let mut resource = format!("/{}{}", self.account, url.path());
        for name in names {
            let mut values = params.remove(&name).unwrap_or_default();
            values.sort();
            resource.push_str(&format!("\n{}:{}", name, values.join(",")));
        }
        resource
    }
}

fn canonicalized_headers(ms_headers: &[(&str, &str)]) -> String {
    let mut headers: Vec<(String, &str)> = ms_headers
        .iter()
        .map(|(name, value)| (name.trim().to_lowercase(), value.trim()))
        .filter(|(name, _)| name.starts_with("x-ms-"))
        .collect();
    headers.sort_by(|a, b| a.0.cmp(&b.0));

    headers
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value))
        .collect()
}

// ============================================================================
// Azure Queue Storage Transport
// ============================================================================

/// Queue transport backed by the Azure Storage Queue REST API
///
/// The transport is cheap to share: clone it or wrap it in an `Arc`. The
/// underlying HTTP client pools connections across all clones.
#[derive(Debug, Clone)]
pub struct AzureQueueStorage {
    http_client: HttpClient,
    credential: SharedKeyCredential,
    service_url: Url,
    retry: RetryOptions,
}

impl AzureQueueStorage {
    /// Create a transport for the given queue service URL
    ///
    /// # Errors
    ///
    /// Returns error if the service URL cannot carry a path or the HTTP
    /// client cannot be built.
    pub fn new(
        service_url: Url,
        credential: SharedKeyCredential,
        retry: RetryOptions,
    ) -> Result<Self, ConfigurationError> {
        if service_url.cannot_be_a_base() {
            return Err(ConfigurationError::Invalid {
                message: format!("queue service URL '{}' cannot be a base URL", service_url),
            });
        }

        let http_client = HttpClient::builder()
            .build()
            .map_err(|e| ConfigurationError::Invalid {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            credential,
            service_url,
            retry,
        })
    }

    pub fn service_url(&self) -> &Url {
        &self.service_url
    }

    pub fn retry_options(&self) -> &RetryOptions {
        &self.retry
    }

    /// Build the Put Message URL for a queue
    fn messages_url(&self, queue: &QueueName, options: &EnqueueOptions) -> Result<Url, StorageError> {
        let mut url = self.service_url.clone();
        url.path_segments_mut()
            .map_err(|_| StorageError::InvalidResponse {
                message: format!("queue service URL '{}' cannot be a base URL", self.service_url),
            })?
            .pop_if_empty()
            .push(queue.as_str())
            .push("messages");

        {
            let mut query = url.query_pairs_mut();
            if let Some(delay) = options.visibility_timeout {
                query.append_pair("visibilitytimeout", &delay.to_string());
            }
            if let Some(ttl) = options.message_ttl {
                query.append_pair("messagettl", &ttl.to_string());
            }
            let server_timeout = self.retry.try_timeout.as_secs().max(1);
            query.append_pair("timeout", &server_timeout.to_string());
        }

        Ok(url)
    }

    /// Run one Put Message request without retries
    async fn try_put_message(
        &self,
        queue: &QueueName,
        message_text: &str,
        options: &EnqueueOptions,
    ) -> Result<EnqueuedMessage, StorageError> {
        let url = self.messages_url(queue, options)?;
        let body = format!(
            "<QueueMessage><MessageText>{}</MessageText></QueueMessage>",
            quick_xml::escape::escape(message_text)
        );

        let date = format_http_date(&Utc::now());
        let mut ms_headers = vec![("x-ms-date", date.as_str()), ("x-ms-version", STORAGE_API_VERSION)];
        if let Some(request_id) = options.request_id.as_deref() {
            ms_headers.push(("x-ms-client-request-id", request_id));
        }

        let authorization =
            self.credential
                .authorization("POST", &url, body.len(), CONTENT_TYPE_XML, &ms_headers);

        let mut request = self
            .http_client
            .post(url)
            .header("Authorization", authorization)
            .header("Content-Type", CONTENT_TYPE_XML);
        for (name, value) in &ms_headers {
            request = request.header(*name, *value);
        }

        let response = request.body(body).send().await.map_err(|e| {
            if e.is_timeout() {
                StorageError::Timeout {
                    duration: self.retry.try_timeout,
                }
            } else if e.is_connect() {
                StorageError::Network {
                    message: format!("Connection failed: {}", e),
                }
            } else {
                StorageError::Network {
                    message: format!("HTTP request failed: {}", e),
                }
            }
        })?;

        let status = response.status();
        let error_code = response
            .headers()
            .get("x-ms-error-code")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let response_body = response.text().await.map_err(|e| StorageError::Network {
            message: format!("Failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            return Err(parse_error_response(
                queue,
                status.as_u16(),
                error_code,
                &response_body,
            ));
        }

        parse_put_message_response(&response_body)
    }
}

#[async_trait]
impl QueueTransport for AzureQueueStorage {
    async fn enqueue(
        &self,
        queue: &QueueName,
        message_text: &str,
        options: &EnqueueOptions,
    ) -> Result<EnqueuedMessage, StorageError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!(queue = %queue, attempt, "Sending Put Message request");

            let result = tokio::time::timeout(
                self.retry.try_timeout,
                self.try_put_message(queue, message_text, options),
            )
            .await
            .unwrap_or(Err(StorageError::Timeout {
                duration: self.retry.try_timeout,
            }));

            match result {
                Ok(message) => return Ok(message),
                Err(error) if error.is_transient() && self.retry.should_retry(attempt) => {
                    warn!(
                        queue = %queue,
                        attempt,
                        max_tries = self.retry.max_tries,
                        delay_ms = self.retry.retry_delay.as_millis() as u64,
                        error = %error,
                        "Put Message failed, retrying"
                    );
                    tokio::time::sleep(self.retry.retry_delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

// ============================================================================
// Response Parsing
// ============================================================================

/// Format a timestamp as an RFC 1123 HTTP date
pub(crate) fn format_http_date(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Collect the text of every leaf element into a name -> text map
fn collect_elements(xml: &str) -> Result<HashMap<String, String>, String> {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml.trim_start_matches('\u{feff}'));
    reader.trim_text(true);

    let mut elements = HashMap::new();
    let mut current: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                current = Some(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Ok(Event::Text(e)) => {
                if let Some(name) = current.take() {
                    let text = e
                        .unescape()
                        .map_err(|e| format!("Failed to parse XML: {}", e))?;
                    elements.insert(name, text.into_owned());
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("XML parsing error: {}", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(elements)
}

/// Parse the `QueueMessagesList` body returned by Put Message
fn parse_put_message_response(xml: &str) -> Result<EnqueuedMessage, StorageError> {
    let mut elements =
        collect_elements(xml).map_err(|message| StorageError::InvalidResponse { message })?;

    let message_id = elements
        .remove("MessageId")
        .ok_or_else(|| StorageError::InvalidResponse {
            message: "MessageId not found in response".to_string(),
        })?;

    let date = |name: &str| elements.get(name).and_then(|v| parse_http_date(v));

    Ok(EnqueuedMessage {
        insertion_time: date("InsertionTime"),
        expiration_time: date("ExpirationTime"),
        time_next_visible: date("TimeNextVisible"),
        pop_receipt: elements.get("PopReceipt").cloned().unwrap_or_default(),
        message_id,
    })
}

/// Map an error response onto a [`StorageError`]
///
/// The error code comes from the `x-ms-error-code` header when present,
/// otherwise from the `<Error><Code>` element of the body.
fn parse_error_response(
    queue: &QueueName,
    status: u16,
    header_code: Option<String>,
    xml: &str,
) -> StorageError {
    let mut elements = collect_elements(xml).unwrap_or_default();

    let code = header_code
        .or_else(|| elements.remove("Code"))
        .unwrap_or_else(|| "Unknown".to_string());
    let message = elements
        .remove("Message")
        .map(|m| m.lines().next().unwrap_or_default().to_string())
        .unwrap_or_else(|| "Unknown error".to_string());

    match code.as_str() {
        "QueueNotFound" => StorageError::QueueNotFound {
            queue: queue.to_string(),
        },
        "AuthenticationFailed"
        | "AuthorizationFailure"
        | "AuthorizationPermissionMismatch"
        | "InvalidAuthenticationInfo" => StorageError::Authentication { code, message },
        _ if status == 401 || status == 403 => StorageError::Authentication { code, message },
        _ if status == 404 => StorageError::QueueNotFound {
            queue: queue.to_string(),
        },
        _ => StorageError::Service {
            status,
            code,
            message,
        },
    }
}
