//! Live adapter for the `TrackerClient` port using the Bugzilla REST API.

use reqwest::Client;
use serde::Deserialize;

use crate::config::TrackerSettings;
use crate::error::PortError;
use crate::issue::{IssueRecord, TrackerKind};
use crate::ports::tracker::{FetchFuture, TrackerClient};

/// Fields requested for every bug. `is_open`, `clones`, and `version`
/// are derived locally and must never be requested.
const BUG_FIELDS: &[&str] = &[
    "id",
    "summary",
    "status",
    "resolution",
    "cf_last_closed",
    "last_change_time",
    "creation_time",
    "flags",
    "keywords",
    "dupe_of",
    "target_milestone",
    "cf_clone_of",
    "clone_ids",
    "depends_on",
];

/// Live Bugzilla client.
pub struct LiveBugzilla {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl LiveBugzilla {
    /// Creates a client for the configured Bugzilla instance.
    #[must_use]
    pub fn new(settings: &TrackerSettings) -> Self {
        Self {
            client: Client::new(),
            url: settings.url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone().filter(|k| !k.is_empty()),
        }
    }
}

/// Response body of `GET /rest/bug`.
#[derive(Deserialize)]
struct BugList {
    #[serde(default)]
    bugs: Vec<IssueRecord>,
}

impl TrackerClient for LiveBugzilla {
    fn kind(&self) -> TrackerKind {
        TrackerKind::Bugzilla
    }

    fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    fn fetch(&self, ids: &[String]) -> FetchFuture<'_> {
        let ids = ids.join(",");
        let fields = BUG_FIELDS.join(",");
        Box::pin(async move {
            let api_key = self
                .api_key
                .as_deref()
                .ok_or_else(|| PortError::from("Bugzilla api_key is not configured"))?;

            let response = self
                .client
                .get(format!("{}/rest/bug", self.url))
                .query(&[("id", ids.as_str()), ("include_fields", fields.as_str())])
                .bearer_auth(api_key)
                .send()
                .await
                .map_err(|e| -> PortError { format!("Bugzilla request failed: {e}").into() })?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(format!("Bugzilla API error ({}): {body}", status.as_u16()).into());
            }

            let list: BugList = response.json().await.map_err(|e| -> PortError {
                format!("Failed to parse Bugzilla response: {e}").into()
            })?;
            Ok(list.bugs)
        })
    }
}
