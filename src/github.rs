//! Optional GitHub issues and pull requests source.
//!
//! A thin REST reader: list issues and pull requests for one repository and
//! fetch per-PR line counts for the ones the person authored. Requires
//! `GITHUB_TOKEN`; without it, or with placeholder coordinates, the source is
//! skipped rather than failing.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::config::{GitHubOptions, Identity};
use crate::error::DataSourceError;
use crate::git::GitHubSlug;

/// Public API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Owner and repository values shipped in the sample configuration.
const PLACEHOLDER_OWNER: &str = "your-org-or-username";
const PLACEHOLDER_REPO: &str = "your-repo-name";

const MAX_PAGE_SIZE: usize = 100;
const MAX_BODY_CHARS: usize = 4000;

/// Additions above which an authored pull request counts as large.
pub const LARGE_PR_ADDITIONS: u64 = 500;

/// An issue as kept in the evidence bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    /// Issue number.
    pub number: u64,
    /// Title.
    pub title: String,
    /// `open` or `closed`.
    pub state: String,
    /// Author login.
    pub user: Option<String>,
    /// Creation timestamp as returned by the API.
    pub created_at: Option<String>,
    /// Close timestamp as returned by the API.
    pub closed_at: Option<String>,
    /// Comment count.
    pub comments: u64,
    /// Label names.
    pub labels: Vec<String>,
    /// Whether the issue is the issue half of a pull request.
    pub is_pr: bool,
    /// Body, truncated.
    pub body: String,
}

/// A pull request as kept in the evidence bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRecord {
    /// Pull request number.
    pub number: u64,
    /// Title.
    pub title: String,
    /// `open` or `closed`.
    pub state: String,
    /// Author login.
    pub user: Option<String>,
    /// Creation timestamp as returned by the API.
    pub created_at: Option<String>,
    /// Close timestamp as returned by the API.
    pub closed_at: Option<String>,
    /// Whether the pull request was merged.
    pub merged: bool,
    /// Lines added; only known for authored pull requests.
    pub additions: Option<u64>,
    /// Lines removed; only known for authored pull requests.
    pub deletions: Option<u64>,
    /// Files changed; only known for authored pull requests.
    pub changed_files: Option<u64>,
    /// Label names.
    pub labels: Vec<String>,
}

/// Issues and pull requests of one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubActivity {
    /// Issues, pull requests excluded.
    pub issues: Vec<IssueRecord>,
    /// Pull requests.
    pub prs: Vec<PullRecord>,
}

/// Statistics over the pull requests the person authored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrAnalysis {
    /// Authored pull requests.
    pub total_authored: usize,
    /// Of those, merged.
    pub merged_count: usize,
    /// Mean additions, one decimal.
    pub avg_additions: f64,
    /// Mean deletions, one decimal.
    pub avg_deletions: f64,
    /// Numbers of authored pull requests adding more than 500 lines.
    pub large_prs: Vec<u64>,
}

impl PrAnalysis {
    /// Analyses the pull requests authored by `identity`.
    pub fn from_pulls(prs: &[PullRecord], identity: &Identity) -> Self {
        let authored: Vec<&PullRecord> = prs
            .iter()
            .filter(|p| p.user.as_deref().is_some_and(|u| identity.matches_login(u)))
            .collect();
        if authored.is_empty() {
            return Self::default();
        }

        let n = authored.len() as f64;
        let mean = |f: fn(&PullRecord) -> Option<u64>| {
            let total: u64 = authored.iter().filter_map(|p| f(*p)).sum();
            (total as f64 / n * 10.0).round() / 10.0
        };

        Self {
            total_authored: authored.len(),
            merged_count: authored.iter().filter(|p| p.merged).count(),
            avg_additions: mean(|p| p.additions),
            avg_deletions: mean(|p| p.deletions),
            large_prs: authored
                .iter()
                .filter(|p| p.additions.unwrap_or(0) > LARGE_PR_ADDITIONS)
                .map(|p| p.number)
                .collect(),
        }
    }
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ApiUser {
    login: String,
}

#[derive(Deserialize)]
struct ApiLabel {
    name: String,
}

#[derive(Deserialize)]
struct ApiIssue {
    number: u64,
    title: String,
    state: String,
    user: Option<ApiUser>,
    created_at: Option<String>,
    closed_at: Option<String>,
    #[serde(default)]
    comments: u64,
    #[serde(default)]
    labels: Vec<ApiLabel>,
    pull_request: Option<serde_json::Value>,
    body: Option<String>,
}

#[derive(Deserialize)]
struct ApiPull {
    number: u64,
    title: String,
    state: String,
    user: Option<ApiUser>,
    created_at: Option<String>,
    closed_at: Option<String>,
    merged_at: Option<String>,
    #[serde(default)]
    labels: Vec<ApiLabel>,
    additions: Option<u64>,
    deletions: Option<u64>,
    changed_files: Option<u64>,
}

impl From<ApiIssue> for IssueRecord {
    fn from(issue: ApiIssue) -> Self {
        Self {
            number: issue.number,
            title: issue.title,
            state: issue.state,
            user: issue.user.map(|u| u.login),
            created_at: issue.created_at,
            closed_at: issue.closed_at,
            comments: issue.comments,
            labels: issue.labels.into_iter().map(|l| l.name).collect(),
            is_pr: issue.pull_request.is_some(),
            body: issue
                .body
                .unwrap_or_default()
                .chars()
                .take(MAX_BODY_CHARS)
                .collect(),
        }
    }
}

impl From<ApiPull> for PullRecord {
    fn from(pull: ApiPull) -> Self {
        Self {
            number: pull.number,
            title: pull.title,
            state: pull.state,
            user: pull.user.map(|u| u.login),
            created_at: pull.created_at,
            closed_at: pull.closed_at,
            merged: pull.merged_at.is_some(),
            additions: pull.additions,
            deletions: pull.deletions,
            changed_files: pull.changed_files,
            labels: pull.labels.into_iter().map(|l| l.name).collect(),
        }
    }
}

// ── Client ──────────────────────────────────────────────────────────

/// Minimal GitHub REST client.
pub struct GitHubClient {
    client: Client,
    base_url: Url,
    token: String,
    max_items: usize,
}

impl GitHubClient {
    /// Creates a client for `base_url` (defaults to the public API).
    pub fn new(token: String, base_url: Option<&str>, max_items: usize) -> Result<Self> {
        let base = base_url.unwrap_or(DEFAULT_API_URL);
        let base_url = Url::parse(&format!("{}/", base.trim_end_matches('/')))
            .with_context(|| format!("Invalid GitHub API URL: {base}"))?;
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url,
            token,
            max_items,
        })
    }

    /// Fetches issues and pull requests, then line counts for the pull
    /// requests authored by `identity`.
    pub async fn fetch_activity(
        &self,
        slug: &GitHubSlug,
        identity: &Identity,
    ) -> Result<GitHubActivity> {
        let issues: Vec<IssueRecord> = self
            .list::<ApiIssue>(slug, "issues")
            .await?
            .into_iter()
            .map(IssueRecord::from)
            .filter(|i| !i.is_pr)
            .collect();

        let mut prs: Vec<PullRecord> = self
            .list::<ApiPull>(slug, "pulls")
            .await?
            .into_iter()
            .map(PullRecord::from)
            .collect();

        for pr in prs.iter_mut() {
            if pr.user.as_deref().is_some_and(|u| identity.matches_login(u)) {
                *pr = self.pull_details(slug, pr.number).await?;
            }
        }

        info!(
            repo = %slug,
            issues = issues.len(),
            prs = prs.len(),
            "Fetched GitHub activity"
        );
        Ok(GitHubActivity { issues, prs })
    }

    async fn pull_details(&self, slug: &GitHubSlug, number: u64) -> Result<PullRecord> {
        let url = self.endpoint(slug, &format!("pulls/{number}"))?;
        let pull: ApiPull = self.get_json(url).await?;
        Ok(pull.into())
    }

    /// Pages through `state=all` results until `max_items` or a short page.
    async fn list<T: serde::de::DeserializeOwned>(
        &self,
        slug: &GitHubSlug,
        resource: &str,
    ) -> Result<Vec<T>> {
        let per_page = self.max_items.clamp(1, MAX_PAGE_SIZE);
        let mut items = Vec::new();
        let mut page = 1usize;

        while items.len() < self.max_items {
            let mut url = self.endpoint(slug, resource)?;
            url.query_pairs_mut()
                .append_pair("state", "all")
                .append_pair("per_page", &per_page.to_string())
                .append_pair("page", &page.to_string());

            let batch: Vec<T> = self.get_json(url).await?;
            let short = batch.len() < per_page;
            items.extend(batch);
            if short {
                break;
            }
            page += 1;
        }

        items.truncate(self.max_items);
        Ok(items)
    }

    fn endpoint(&self, slug: &GitHubSlug, resource: &str) -> Result<Url> {
        self.base_url
            .join(&format!("repos/{}/{}/{resource}", slug.owner, slug.repo))
            .context("Failed to build GitHub API URL")
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(url = %url, "GitHub API request");
        let response = self
            .client
            .get(url.clone())
            .header("Accept", "application/vnd.github+json")
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("HTTP {status}: {}", body.trim());
        }

        response
            .json()
            .await
            .with_context(|| format!("Unexpected response body from {url}"))
    }
}

/// Why the GitHub source did not run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No `GITHUB_TOKEN`.
    NoToken,
    /// Owner or repository unknown or left at the sample value.
    NoRepository,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoToken => write!(f, "GITHUB_TOKEN not set"),
            Self::NoRepository => write!(f, "no GitHub owner/repo configured or detected"),
        }
    }
}

/// Picks the repository to query: configured values win over the remote.
pub fn resolve_slug(options: &GitHubOptions, detected: Option<GitHubSlug>) -> Option<GitHubSlug> {
    let owner = options
        .owner
        .clone()
        .or_else(|| detected.as_ref().map(|s| s.owner.clone()))?;
    let repo = options
        .repo
        .clone()
        .or_else(|| detected.map(|s| s.repo))?;

    let usable = |v: &str| !v.trim().is_empty();
    if !usable(&owner) || !usable(&repo) || owner == PLACEHOLDER_OWNER || repo == PLACEHOLDER_REPO {
        return None;
    }
    Some(GitHubSlug { owner, repo })
}

/// Loads GitHub activity, or says why it was skipped.
///
/// A skipped source is `Ok(Err(reason))`; a source that ran and failed is a
/// [`DataSourceError`].
pub async fn load_activity(
    options: &GitHubOptions,
    slug: Option<GitHubSlug>,
    token: Option<String>,
    identity: &Identity,
) -> Result<std::result::Result<GitHubActivity, SkipReason>, DataSourceError> {
    let Some(slug) = slug else {
        return Ok(Err(SkipReason::NoRepository));
    };
    let Some(token) = token.filter(|t| !t.trim().is_empty()) else {
        return Ok(Err(SkipReason::NoToken));
    };

    let error = |e: anyhow::Error| DataSourceError::GitHub {
        owner: slug.owner.clone(),
        repo: slug.repo.clone(),
        reason: format!("{e:#}"),
    };

    let client = GitHubClient::new(token, options.api_url.as_deref(), options.max_items)
        .map_err(error)?;
    client
        .fetch_activity(&slug, identity)
        .await
        .map(Ok)
        .map_err(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn identity() -> Identity {
        Identity {
            full_name: "Jane Doe".to_string(),
            role: "Engineer".to_string(),
            aliases: vec!["jdoe".to_string()],
            emails: vec!["jane@example.com".to_string()],
        }
    }

    fn slug() -> GitHubSlug {
        GitHubSlug {
            owner: "acme".to_string(),
            repo: "widgets".to_string(),
        }
    }

    fn options(server: &MockServer) -> GitHubOptions {
        GitHubOptions {
            api_url: Some(server.uri()),
            max_items: 100,
            ..GitHubOptions::default()
        }
    }

    #[test]
    fn test_resolve_slug() {
        let detected = Some(slug());
        assert_eq!(
            resolve_slug(&GitHubOptions::default(), detected.clone()),
            Some(slug())
        );

        let configured = GitHubOptions {
            owner: Some("other".to_string()),
            ..GitHubOptions::default()
        };
        assert_eq!(
            resolve_slug(&configured, detected).map(|s| s.to_string()),
            Some("other/widgets".to_string())
        );

        let placeholder = GitHubOptions {
            owner: Some(PLACEHOLDER_OWNER.to_string()),
            repo: Some(PLACEHOLDER_REPO.to_string()),
            ..GitHubOptions::default()
        };
        assert_eq!(resolve_slug(&placeholder, None), None);
        assert_eq!(resolve_slug(&GitHubOptions::default(), None), None);
    }

    #[tokio::test]
    async fn test_skips_without_token_or_repo() {
        let opts = GitHubOptions::default();
        let skipped = load_activity(&opts, Some(slug()), None, &identity())
            .await
            .unwrap();
        assert_eq!(skipped, Err(SkipReason::NoToken));

        let skipped = load_activity(&opts, None, Some("t".to_string()), &identity())
            .await
            .unwrap();
        assert_eq!(skipped, Err(SkipReason::NoRepository));
    }

    #[tokio::test]
    async fn test_fetch_activity() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/issues"))
            .and(query_param("state", "all"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "number": 1, "title": "Crash on start", "state": "closed",
                    "user": {"login": "someone"}, "comments": 3,
                    "labels": [{"name": "bug"}], "body": "boom"
                },
                {
                    "number": 2, "title": "PR shadow", "state": "open",
                    "user": {"login": "jdoe"}, "pull_request": {}
                }
            ])))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/pulls"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"number": 2, "title": "Add cache", "state": "closed", "user": {"login": "jdoe"}, "merged_at": null},
                {"number": 3, "title": "Docs", "state": "open", "user": {"login": "someone"}}
            ])))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/pulls/2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "number": 2, "title": "Add cache", "state": "closed",
                "user": {"login": "jdoe"}, "merged_at": "2024-01-02T00:00:00Z",
                "additions": 700, "deletions": 20, "changed_files": 6
            })))
            .mount(&server)
            .await;

        let activity = load_activity(
            &options(&server),
            Some(slug()),
            Some("token".to_string()),
            &identity(),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(activity.issues.len(), 1);
        assert_eq!(activity.issues[0].labels, vec!["bug"]);
        assert_eq!(activity.prs.len(), 2);
        assert!(activity.prs[0].merged);
        assert_eq!(activity.prs[0].additions, Some(700));
        assert_eq!(activity.prs[1].additions, None);

        let analysis = PrAnalysis::from_pulls(&activity.prs, &identity());
        assert_eq!(analysis.total_authored, 1);
        assert_eq!(analysis.merged_count, 1);
        assert!((analysis.avg_additions - 700.0).abs() < f64::EPSILON);
        assert_eq!(analysis.large_prs, vec![2]);
    }

    #[tokio::test]
    async fn test_http_error_is_data_source_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Bad credentials"))
            .mount(&server)
            .await;

        let err = load_activity(
            &options(&server),
            Some(slug()),
            Some("token".to_string()),
            &identity(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.source_name(), "GitHub");
        assert!(err.to_string().contains("401"));
    }

    #[test]
    fn test_pr_analysis_without_authored() {
        assert_eq!(PrAnalysis::from_pulls(&[], &identity()), PrAnalysis::default());
    }
}
