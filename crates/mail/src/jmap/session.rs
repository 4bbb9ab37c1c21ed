//! JMAP session document

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::AccountId;

pub const CORE_CAPABILITY: &str = "urn:ietf:params:jmap:core";
pub const MAIL_CAPABILITY: &str = "urn:ietf:params:jmap:mail";

/// Server limits advertised under the core capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreCapabilities {
    pub max_size_upload: u64,
    pub max_concurrent_upload: u32,
    pub max_size_request: u64,
    pub max_concurrent_requests: u32,
    pub max_calls_in_request: u32,
    pub max_objects_in_get: u32,
    pub max_objects_in_set: u32,
    /// Advertised only; `Email/query` does not sort
    pub collation_algorithms: Vec<String>,
}

impl Default for CoreCapabilities {
    fn default() -> Self {
        Self {
            max_size_upload: 50_000_000,
            max_concurrent_upload: 4,
            max_size_request: 10_000_000,
            max_concurrent_requests: 4,
            max_calls_in_request: 16,
            max_objects_in_get: 500,
            max_objects_in_set: 500,
            collation_algorithms: vec![
                "i;ascii-numeric".to_string(),
                "i;ascii-casemap".to_string(),
                "i;unicode-casemap".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(rename = "urn:ietf:params:jmap:core")]
    pub core: CoreCapabilities,
    #[serde(rename = "urn:ietf:params:jmap:mail")]
    pub mail: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub name: String,
    pub is_personal: bool,
    pub is_read_only: bool,
    pub account_capabilities: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub capabilities: Capabilities,
    pub accounts: BTreeMap<AccountId, Account>,
    pub primary_accounts: BTreeMap<String, AccountId>,
    pub username: String,
    pub api_url: String,
    pub download_url: String,
    pub upload_url: String,
    pub event_source_url: String,
    pub state: String,
}

impl Session {
    /// Build the session for an authenticated user.
    ///
    /// `addresses` is the account list from the authentication layer; the
    /// first one becomes the primary mail account. `base_url` is the origin
    /// the API is served from, empty for a relative `apiUrl`.
    pub fn new(username: &str, addresses: &[String], base_url: &str) -> Self {
        let accounts: BTreeMap<AccountId, Account> = addresses
            .iter()
            .map(|address| {
                let account = Account {
                    name: address.clone(),
                    is_personal: true,
                    is_read_only: false,
                    account_capabilities: BTreeMap::from([(
                        MAIL_CAPABILITY.to_string(),
                        Value::Object(Map::new()),
                    )]),
                };
                (AccountId::for_email(address), account)
            })
            .collect();

        let primary_accounts = addresses
            .first()
            .map(|address| (MAIL_CAPABILITY.to_string(), AccountId::for_email(address)))
            .into_iter()
            .collect();

        Self {
            capabilities: Capabilities::default(),
            accounts,
            primary_accounts,
            username: username.to_string(),
            api_url: format!("{}/jmap", base_url.trim_end_matches('/')),
            download_url: String::new(),
            upload_url: String::new(),
            event_source_url: String::new(),
            state: "0".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_document() {
        let addresses = vec!["alice@example.com".to_string(), "team@example.com".to_string()];
        let session = Session::new("alice", &addresses, "https://mail.example.com/");

        let json = serde_json::to_value(&session).unwrap();
        let alice = AccountId::for_email("alice@example.com");

        assert_eq!(json["apiUrl"], "https://mail.example.com/jmap");
        assert_eq!(json["primaryAccounts"][MAIL_CAPABILITY], alice.as_str());
        assert_eq!(json["accounts"][alice.as_str()]["name"], "alice@example.com");
        assert_eq!(json["accounts"].as_object().unwrap().len(), 2);
        assert_eq!(json["capabilities"][CORE_CAPABILITY]["maxCallsInRequest"], 16);
        assert!(json["capabilities"][MAIL_CAPABILITY].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_session_without_accounts() {
        let session = Session::new("nobody", &[], "");
        assert!(session.primary_accounts.is_empty());
        assert_eq!(session.api_url, "/jmap");
    }
}
