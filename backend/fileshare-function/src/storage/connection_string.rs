//! Parsing of storage account connection strings.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Url;

use super::StorageError;

const DEFAULT_PROTOCOL: &str = "https";
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// How requests to the file endpoint are authorized.
#[derive(Clone)]
pub enum Credential {
    SharedKey { account: String, key: Vec<u8> },
    /// SAS token without the leading `?`.
    SharedAccessSignature(String),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::SharedKey { account, .. } => f
                .debug_struct("SharedKey")
                .field("account", account)
                .field("key", &"<redacted>")
                .finish(),
            Credential::SharedAccessSignature(_) => f.write_str("SharedAccessSignature(<redacted>)"),
        }
    }
}

/// File endpoint and credential resolved from a connection string.
#[derive(Debug, Clone)]
pub struct StorageAccount {
    pub file_endpoint: Url,
    pub credential: Credential,
}

impl StorageAccount {
    pub fn from_connection_string(raw: &str) -> Result<Self, StorageError> {
        let mut protocol = None;
        let mut account_name = None;
        let mut account_key = None;
        let mut endpoint_suffix = None;
        let mut file_endpoint = None;
        let mut sas = None;

        for segment in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                StorageError::Configuration(format!(
                    "connection string segment without '=': '{}'",
                    redact_segment(segment)
                ))
            })?;
            let value = value.trim();

            match key.trim().to_ascii_lowercase().as_str() {
                "defaultendpointsprotocol" => protocol = Some(value.to_string()),
                "accountname" => account_name = Some(value.to_string()),
                "accountkey" => account_key = Some(value.to_string()),
                "endpointsuffix" => endpoint_suffix = Some(value.to_string()),
                "fileendpoint" => file_endpoint = Some(value.to_string()),
                "sharedaccesssignature" => sas = Some(value.trim_start_matches('?').to_string()),
                "usedevelopmentstorage" if value.eq_ignore_ascii_case("true") => {
                    return Err(StorageError::Configuration(
                        "development storage does not provide a file service".to_string(),
                    ));
                }
                // Blob/queue/table endpoints and unknown keys are irrelevant here.
                _ => {}
            }
        }

        let credential = match (&account_name, account_key, sas) {
            (Some(account), Some(key), _) => {
                let key = STANDARD.decode(key.as_bytes()).map_err(|e| {
                    StorageError::Configuration(format!("account key is not valid base64: {}", e))
                })?;
                Credential::SharedKey {
                    account: account.clone(),
                    key,
                }
            }
            (_, _, Some(token)) if !token.is_empty() => Credential::SharedAccessSignature(token),
            _ => {
                return Err(StorageError::Configuration(
                    "connection string has neither an account key nor a shared access signature"
                        .to_string(),
                ))
            }
        };

        let endpoint = match (file_endpoint, &account_name) {
            (Some(endpoint), _) => endpoint,
            (None, Some(account)) => format!(
                "{}://{}.file.{}",
                protocol.as_deref().unwrap_or(DEFAULT_PROTOCOL),
                account,
                endpoint_suffix.as_deref().unwrap_or(DEFAULT_ENDPOINT_SUFFIX)
            ),
            (None, None) => {
                return Err(StorageError::Configuration(
                    "connection string names neither an account nor a file endpoint".to_string(),
                ))
            }
        };

        let file_endpoint = Url::parse(&endpoint).map_err(|e| {
            StorageError::Configuration(format!("invalid file endpoint '{}': {}", endpoint, e))
        })?;
        if file_endpoint.cannot_be_a_base() {
            return Err(StorageError::Configuration(format!(
                "file endpoint '{}' cannot carry a path",
                endpoint
            )));
        }

        Ok(Self {
            file_endpoint,
            credential,
        })
    }
}

fn redact_segment(segment: &str) -> &str {
    segment.split_once('=').map(|(key, _)| key).unwrap_or("<segment>")
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "ZmlsZXNoYXJlLXRlc3Qta2V5";

    #[test]
    fn test_shared_key_with_default_endpoint() {
        let raw = format!(
            "DefaultEndpointsProtocol=https;AccountName=contracts;AccountKey={};EndpointSuffix=core.windows.net",
            KEY
        );
        let account = StorageAccount::from_connection_string(&raw).unwrap();

        assert_eq!(account.file_endpoint.as_str(), "https://contracts.file.core.windows.net/");
        match account.credential {
            Credential::SharedKey { account, key } => {
                assert_eq!(account, "contracts");
                assert_eq!(key, b"fileshare-test-key");
            }
            other => panic!("expected shared key, got {:?}", other),
        }
    }

    #[test]
    fn test_keys_are_case_insensitive_and_defaults_apply() {
        let raw = format!("accountname=contracts;ACCOUNTKEY={};", KEY);
        let account = StorageAccount::from_connection_string(&raw).unwrap();
        assert_eq!(account.file_endpoint.as_str(), "https://contracts.file.core.windows.net/");
    }

    #[test]
    fn test_explicit_file_endpoint_wins() {
        let raw = format!(
            "AccountName=contracts;AccountKey={};FileEndpoint=http://127.0.0.1:10004/contracts",
            KEY
        );
        let account = StorageAccount::from_connection_string(&raw).unwrap();
        assert_eq!(account.file_endpoint.as_str(), "http://127.0.0.1:10004/contracts");
    }

    #[test]
    fn test_shared_access_signature() {
        let raw = "FileEndpoint=https://contracts.file.core.windows.net;SharedAccessSignature=?sv=2021-06-08&sig=abc";
        let account = StorageAccount::from_connection_string(raw).unwrap();
        match account.credential {
            Credential::SharedAccessSignature(token) => assert_eq!(token, "sv=2021-06-08&sig=abc"),
            other => panic!("expected SAS, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_credential_is_configuration_error() {
        let err = StorageAccount::from_connection_string("AccountName=contracts").unwrap_err();
        assert!(matches!(err, StorageError::Configuration(_)));

        let err = StorageAccount::from_connection_string("").unwrap_err();
        assert!(matches!(err, StorageError::Configuration(_)));
    }

    #[test]
    fn test_invalid_key_and_segment() {
        let err =
            StorageAccount::from_connection_string("AccountName=a;AccountKey=not base64!").unwrap_err();
        assert!(matches!(err, StorageError::Configuration(_)));

        let err = StorageAccount::from_connection_string("AccountName=a;garbage").unwrap_err();
        assert!(matches!(err, StorageError::Configuration(_)));
    }

    #[test]
    fn test_development_storage_rejected() {
        let err = StorageAccount::from_connection_string("UseDevelopmentStorage=true").unwrap_err();
        assert!(err.to_string().contains("development storage"));
    }

    #[test]
    fn test_debug_output_redacts_key() {
        let raw = format!("AccountName=contracts;AccountKey={}", KEY);
        let account = StorageAccount::from_connection_string(&raw).unwrap();
        let rendered = format!("{:?}", account);
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("fileshare-test-key"));
    }
}
