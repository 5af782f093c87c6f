//! Live adapter for the `TrackerClient` port using the Jira search API.

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::TrackerSettings;
use crate::error::PortError;
use crate::issue::{IssueRecord, TrackerKind};
use crate::ports::tracker::{FetchFuture, TrackerClient};

const ISSUE_FIELDS: &str = "summary,status,resolution,fixVersions,issuelinks,created,updated";

/// Live Jira client.
pub struct LiveJira {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl LiveJira {
    /// Creates a client for the configured Jira instance.
    #[must_use]
    pub fn new(settings: &TrackerSettings) -> Self {
        Self {
            client: Client::new(),
            url: settings.url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone().filter(|k| !k.is_empty()),
        }
    }

    async fn search_page(
        &self,
        api_key: &str,
        jql: &str,
        start_at: usize,
        max_results: usize,
    ) -> Result<SearchResponse, PortError> {
        let start_at = start_at.to_string();
        let max_results = max_results.to_string();
        let response = self
            .client
            .get(format!("{}/rest/api/latest/search", self.url))
            .query(&[
                ("jql", jql),
                ("fields", ISSUE_FIELDS),
                ("startAt", start_at.as_str()),
                ("maxResults", max_results.as_str()),
            ])
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| -> PortError { format!("Jira request failed: {e}").into() })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Jira API error ({}): {body}", status.as_u16()).into());
        }

        response
            .json()
            .await
            .map_err(|e| -> PortError { format!("Failed to parse Jira response: {e}").into() })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    start_at: usize,
    #[serde(default)]
    total: usize,
    #[serde(default)]
    issues: Vec<JiraIssue>,
}

impl SearchResponse {
    /// Offset of the next page, or `None` when every match has been read.
    ///
    /// The server caps the page size below what was asked for, so the
    /// offset advances by what was actually returned.
    fn next_start(&self) -> Option<usize> {
        let next = self.start_at + self.issues.len();
        (!self.issues.is_empty() && next < self.total).then_some(next)
    }
}

#[derive(Deserialize)]
struct JiraIssue {
    key: String,
    fields: JiraFields,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JiraFields {
    status: Option<Named>,
    resolution: Option<Named>,
    #[serde(default)]
    fix_versions: Vec<Named>,
    #[serde(default)]
    issuelinks: Vec<IssueLink>,
    #[serde(flatten)]
    rest: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct Named {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueLink {
    #[serde(rename = "type")]
    link_type: Named,
    inward_issue: Option<LinkedIssue>,
    outward_issue: Option<LinkedIssue>,
}

#[derive(Deserialize)]
struct LinkedIssue {
    key: String,
}

/// Builds the JQL selecting exactly the given keys.
fn key_query(ids: &[String]) -> String {
    format!("key in ({})", ids.join(","))
}

/// Flattens a Jira issue into the tracker-neutral record shape.
///
/// An outward `Duplicate` link names the canonical issue; inward `Cloners`
/// links name the clones.
fn into_record(issue: JiraIssue) -> IssueRecord {
    let fields = issue.fields;
    let dupe_of = fields
        .issuelinks
        .iter()
        .filter(|l| l.link_type.name == "Duplicate")
        .find_map(|l| l.outward_issue.as_ref().map(|i| i.key.clone()));
    let clone_ids = fields
        .issuelinks
        .iter()
        .filter(|l| l.link_type.name == "Cloners")
        .filter_map(|l| l.inward_issue.as_ref().map(|i| i.key.clone()))
        .collect();

    IssueRecord {
        id: issue.key,
        status: fields.status.map(|s| s.name).unwrap_or_default(),
        resolution: fields.resolution.map(|r| r.name).unwrap_or_default(),
        fix_versions: fields.fix_versions.into_iter().map(|v| v.name).collect(),
        dupe_of,
        clone_ids,
        extra: fields.rest,
        ..IssueRecord::default()
    }
}

impl TrackerClient for LiveJira {
    fn kind(&self) -> TrackerKind {
        TrackerKind::Jira
    }

    fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    fn fetch(&self, ids: &[String]) -> FetchFuture<'_> {
        let jql = key_query(ids);
        let wanted = ids.len();
        Box::pin(async move {
            let api_key = self
                .api_key
                .as_deref()
                .ok_or_else(|| PortError::from("Jira api_key is not configured"))?;

            let mut records = Vec::with_capacity(wanted);
            let mut start_at = 0;
            loop {
                let page = self.search_page(api_key, &jql, start_at, wanted).await?;
                let next = page.next_start();
                let total = page.total;
                records.extend(page.issues.into_iter().map(into_record));
                match next {
                    Some(offset) => {
                        debug!(offset, total, "Fetching next Jira result page");
                        start_at = offset;
                    }
                    None => {
                        if total > records.len() {
                            warn!(
                                total,
                                returned = records.len(),
                                "Jira returned fewer issues than it matched"
                            );
                        }
                        break;
                    }
                }
            }
            Ok(records)
        })
    }
}
