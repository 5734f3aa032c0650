//! Azure Files REST client.
//!
//! Implements the three calls the upload handler needs (share properties,
//! create file, put range) over `reqwest`, authorized with either the
//! account shared key or a SAS token taken from the connection string.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::{header, Client, Method, Response, StatusCode, Url};
use shared::crypto::hmac_sha256_base64;
use tracing::debug;
use uuid::Uuid;

use super::connection_string::{Credential, StorageAccount};
use super::{
    ByteRange, FileRef, FileShareStore, ShareConnector, ShareRef, StorageError, StorageResult,
};
use crate::config::StorageConfig;

/// REST API version sent with every request.
pub const API_VERSION: &str = "2021-06-08";

/// Builds an [`AzureFilesClient`] from the connection string on every invocation.
pub struct AzureFilesConnector {
    connection_string: Option<String>,
    http: Client,
}

impl AzureFilesConnector {
    pub fn new(config: &StorageConfig) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if let Some(seconds) = config.request_timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }
        let http = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            connection_string: config.connection_string.clone(),
            http,
        })
    }
}

impl ShareConnector for AzureFilesConnector {
    fn connect(&self) -> StorageResult<Arc<dyn FileShareStore>> {
        let raw = self.connection_string.as_deref().ok_or_else(|| {
            StorageError::Configuration("storage connection string is not set".to_string())
        })?;
        let account = StorageAccount::from_connection_string(raw)?;
        Ok(Arc::new(AzureFilesClient::new(account, self.http.clone())))
    }
}

pub struct AzureFilesClient {
    account: StorageAccount,
    http: Client,
}

impl AzureFilesClient {
    pub fn new(account: StorageAccount, http: Client) -> Self {
        Self { account, http }
    }

    fn resource_url(&self, share: &ShareRef, segments: &[&str]) -> StorageResult<Url> {
        let mut url = self.account.file_endpoint.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                StorageError::Configuration(format!(
                    "file endpoint '{}' cannot carry a path",
                    self.account.file_endpoint
                ))
            })?;
            path.pop_if_empty().push(share.name());
            path.extend(segments);
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        mut url: Url,
        query: &[(&str, &str)],
        ms_headers: &[(&str, String)],
        body: Option<Bytes>,
    ) -> StorageResult<Response> {
        let mut headers: BTreeMap<String, String> = ms_headers
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
            .collect();
        headers.insert("x-ms-date".to_string(), http_date());
        headers.insert("x-ms-version".to_string(), API_VERSION.to_string());
        headers.insert("x-ms-client-request-id".to_string(), Uuid::new_v4().to_string());

        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in query {
                pairs.append_pair(name, value);
            }
        }

        let content_length = body.as_ref().map(|b| b.len() as u64).unwrap_or(0);
        let authorization = match &self.account.credential {
            Credential::SharedKey { account, key } => {
                let resource = canonicalized_resource(account, &url, query);
                let to_sign = string_to_sign(&method, content_length, &headers, &resource);
                Some(format!("SharedKey {}:{}", account, sign(key, &to_sign)))
            }
            Credential::SharedAccessSignature(token) => {
                let combined = match url.query() {
                    Some(existing) if !existing.is_empty() => format!("{}&{}", existing, token),
                    _ => token.clone(),
                };
                url.set_query(Some(&combined));
                None
            }
        };

        debug!(method = %method, path = %url.path(), content_length, "Sending file service request");

        let mut request = self.http.request(method, url);
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(authorization) = authorization {
            request = request.header(header::AUTHORIZATION, authorization);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        Ok(request.send().await?)
    }
}

#[async_trait]
impl FileShareStore for AzureFilesClient {
    async fn share_exists(&self, share: &ShareRef) -> StorageResult<bool> {
        let url = self.resource_url(share, &[])?;
        let response = self
            .send(Method::GET, url, &[("restype", "share")], &[], None)
            .await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => {
                debug!(share = share.name(), "Share does not exist");
                Ok(false)
            }
            _ => Err(error_from_response(response, &format!("share '{}'", share.name())).await),
        }
    }

    async fn create_file(&self, file: &FileRef, size: u64) -> StorageResult<()> {
        let url = self.resource_url(file.share(), &file.segments())?;
        let headers = [
            ("x-ms-type", "file".to_string()),
            ("x-ms-content-length", size.to_string()),
            ("x-ms-file-attributes", "None".to_string()),
            ("x-ms-file-creation-time", "now".to_string()),
            ("x-ms-file-last-write-time", "now".to_string()),
            ("x-ms-file-permission", "inherit".to_string()),
        ];
        let response = self
            .send(Method::PUT, url, &[], &headers, Some(Bytes::new()))
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response, &format!("create '{}'", file)).await);
        }
        debug!(file = %file, size, "Created remote file");
        Ok(())
    }

    async fn upload_range(&self, file: &FileRef, range: ByteRange, data: Bytes) -> StorageResult<()> {
        if data.len() as u64 != range.length() {
            return Err(StorageError::Unexpected(format!(
                "range of {} bytes given {} bytes of data",
                range.length(),
                data.len()
            )));
        }
        // The service rejects zero-length ranges; an empty write has nothing to send.
        let Some(range_header) = range.header_value() else {
            debug!(file = %file, "Skipping empty range");
            return Ok(());
        };

        let url = self.resource_url(file.share(), &file.segments())?;
        let headers = [
            ("x-ms-range", range_header),
            ("x-ms-write", "update".to_string()),
        ];
        let response = self
            .send(Method::PUT, url, &[("comp", "range")], &headers, Some(data))
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response, &format!("range write '{}'", file)).await);
        }
        debug!(file = %file, bytes = range.length(), "Uploaded range");
        Ok(())
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
            StorageError::Transient(err.to_string())
        } else {
            StorageError::Unexpected(err.to_string())
        }
    }
}

async fn error_from_response(response: Response, resource: &str) -> StorageError {
    let status = response.status();
    let error_code = response
        .headers()
        .get("x-ms-error-code")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let body = response.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), error_code = ?error_code, body = %body, "File service error response");

    StorageError::from_status(status.as_u16(), error_code.as_deref(), resource)
}

fn http_date() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// `/{account}{path}` followed by one `\nname:value` line per query parameter, sorted by name.
fn canonicalized_resource(account: &str, url: &Url, query: &[(&str, &str)]) -> String {
    let mut resource = format!("/{}{}", account, url.path());
    let params: BTreeMap<String, &str> = query
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), *value))
        .collect();
    for (name, value) in params {
        resource.push('\n');
        resource.push_str(&name);
        resource.push(':');
        resource.push_str(value);
    }
    resource
}

/// Shared key string-to-sign for the file service. Content-Length is empty when zero.
fn string_to_sign(
    method: &Method,
    content_length: u64,
    headers: &BTreeMap<String, String>,
    resource: &str,
) -> String {
    let length = if content_length == 0 {
        String::new()
    } else {
        content_length.to_string()
    };

    // VERB, Content-Encoding, Content-Language, Content-Length, Content-MD5, Content-Type,
    // Date, If-Modified-Since, If-Match, If-None-Match, If-Unmodified-Since, Range
    let standard = [
        method.as_str(), "", "", length.as_str(), "", "", "", "", "", "", "", "",
    ];
    let mut to_sign = standard.join("\n");
    to_sign.push('\n');

    for (name, value) in headers.iter().filter(|(name, _)| name.starts_with("x-ms-")) {
        to_sign.push_str(name);
        to_sign.push(':');
        to_sign.push_str(value.trim());
        to_sign.push('\n');
    }
    to_sign.push_str(resource);
    to_sign
}

fn sign(key: &[u8], to_sign: &str) -> String {
    hmac_sha256_base64(key, to_sign.as_bytes())
}
