//! GitHub repository client
//!
//! Lists and downloads documentation files from a GitHub repository,
//! restricted to a configured subfolder scope and the supported file types.
//! Transient network failures are retried with bounded exponential backoff;
//! a missing repository or exhausted rate limit is surfaced immediately.

use backoff::ExponentialBackoffBuilder;
use chrono::{DateTime, Utc};
use dochub_common::config::GithubConfig;
use dochub_common::db::models::FileType;
use dochub_common::errors::{AppError, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// A candidate file in the remote tree
#[derive(Debug, Clone)]
pub struct RemoteFile {
    /// Path relative to the repository root
    pub path: String,
    /// Blob size as reported by the tree listing
    pub size: Option<u64>,
}

#[derive(Deserialize)]
struct TreeResponse {
    tree: Vec<TreeItem>,
}

#[derive(Deserialize)]
struct TreeItem {
    path: String,
    #[serde(rename = "type")]
    item_type: String,
    size: Option<u64>,
}

#[derive(Deserialize)]
struct CommitItem {
    commit: CommitDetail,
}

#[derive(Deserialize)]
struct CommitDetail {
    committer: CommitSignature,
}

#[derive(Deserialize)]
struct CommitSignature {
    date: DateTime<Utc>,
}

/// GitHub API client
#[derive(Clone)]
pub struct GithubClient {
    client: reqwest::Client,
    api_base: String,
    raw_base: String,
    token: Option<String>,
    max_retries: u32,
    timeout_secs: u64,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        if config.token.is_some() {
            info!("GitHub API: authenticated mode");
        } else {
            info!("GitHub API: unauthenticated mode, rate limits apply");
        }

        Self {
            client,
            api_base: config.api_base.clone(),
            raw_base: config.raw_base.clone(),
            token: config.token.clone(),
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        }
    }

    /// Extract (owner, repo) from a github.com repository URL
    pub fn parse_repo_url(repo_url: &str) -> Result<(String, String)> {
        let url = repo_url.trim_end_matches('/');
        let url = url.strip_suffix(".git").unwrap_or(url);

        let rest = url
            .strip_prefix("https://github.com/")
            .or_else(|| url.strip_prefix("https://www.github.com/"))
            .or_else(|| url.strip_prefix("http://github.com/"))
            .ok_or_else(|| AppError::InvalidFormat {
                message: format!("Invalid GitHub URL: {}. Must be a github.com URL.", repo_url),
            })?;

        let mut parts = rest.split('/');
        match (parts.next(), parts.next()) {
            (Some(owner), Some(repo)) if !owner.is_empty() && !repo.is_empty() => {
                Ok((owner.to_string(), repo.to_string()))
            }
            _ => Err(AppError::InvalidFormat {
                message: format!(
                    "Invalid GitHub URL format: {}. Expected https://github.com/owner/repo",
                    repo_url
                ),
            }),
        }
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.get(url).header("User-Agent", "dochub");
        if let Some(ref token) = self.token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        builder
    }

    fn retry_policy(&self) -> backoff::ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(500))
            .with_multiplier(2.0)
            .with_max_interval(Duration::from_secs(15))
            .with_max_elapsed_time(Some(Duration::from_secs(
                self.timeout_secs * (self.max_retries as u64 + 1),
            )))
            .build()
    }

    /// Issue a GET and map error statuses into the taxonomy.
    ///
    /// 404 and rate-limit responses are permanent for the purposes of the
    /// retry loop; network errors and 5xx responses are transient.
    async fn get_with_retry(&self, url: &str, what: &str) -> Result<reqwest::Response> {
        let policy = self.retry_policy();

        backoff::future::retry(policy, || async {
            let response = self.request(url).send().await.map_err(|e| {
                backoff::Error::transient(AppError::RepositoryFetch {
                    message: format!("Network error fetching {}: {}", what, e),
                })
            })?;

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let err = match status.as_u16() {
                404 => AppError::RepositoryFetch {
                    message: format!("Not found: {}", what),
                },
                403 | 429 => AppError::UpstreamRateLimited {
                    message: format!("GitHub rate limit exceeded fetching {}", what),
                },
                s if status.is_server_error() => AppError::RepositoryFetch {
                    message: format!("GitHub error {} fetching {}", s, what),
                },
                s => AppError::RepositoryFetch {
                    message: format!("Unexpected status {} fetching {}", s, what),
                },
            };

            if status.is_server_error() {
                Err(backoff::Error::transient(err))
            } else {
                Err(backoff::Error::permanent(err))
            }
        })
        .await
    }

    /// Fetch the repository tree, filtered to the folder scope and supported
    /// file types
    pub async fn fetch_tree(
        &self,
        repo_url: &str,
        folder_path: Option<&str>,
    ) -> Result<Vec<RemoteFile>> {
        let (owner, repo) = Self::parse_repo_url(repo_url)?;
        let url = format!(
            "{}/repos/{}/{}/git/trees/main?recursive=1",
            self.api_base, owner, repo
        );

        let response = self
            .get_with_retry(&url, &format!("repository {}/{}", owner, repo))
            .await?;

        let data: TreeResponse = response.json().await.map_err(|e| AppError::RepositoryFetch {
            message: format!("Failed to parse tree response: {}", e),
        })?;

        let prefix = folder_path
            .map(|f| f.trim_matches('/'))
            .filter(|f| !f.is_empty())
            .map(|f| format!("{}/", f));

        let files: Vec<RemoteFile> = data
            .tree
            .into_iter()
            .filter(|item| item.item_type == "blob")
            .filter(|item| match &prefix {
                Some(p) => item.path.starts_with(p),
                None => true,
            })
            .filter(|item| FileType::from_path(&item.path).is_some())
            .map(|item| RemoteFile {
                path: item.path,
                size: item.size,
            })
            .collect();

        info!(
            owner = %owner,
            repo = %repo,
            folder = folder_path.unwrap_or(""),
            files = files.len(),
            "Fetched repository tree"
        );

        Ok(files)
    }

    /// Download a file's content from the raw content host
    pub async fn fetch_content(&self, repo_url: &str, file_path: &str) -> Result<String> {
        let (owner, repo) = Self::parse_repo_url(repo_url)?;
        let url = format!("{}/{}/{}/main/{}", self.raw_base, owner, repo, file_path);

        let response = self.get_with_retry(&url, file_path).await?;

        let content = response.text().await.map_err(|e| AppError::RepositoryFetch {
            message: format!("Failed to read {}: {}", file_path, e),
        })?;

        debug!(path = %file_path, bytes = content.len(), "Downloaded file");

        Ok(content)
    }

    /// Timestamp of the newest commit touching the scope.
    ///
    /// Callers treat a failure here as non-fatal; the sync result does not
    /// depend on it.
    pub async fn last_commit_date(
        &self,
        repo_url: &str,
        folder_path: Option<&str>,
    ) -> Result<DateTime<Utc>> {
        let (owner, repo) = Self::parse_repo_url(repo_url)?;

        let mut url = format!(
            "{}/repos/{}/{}/commits?per_page=1",
            self.api_base, owner, repo
        );
        if let Some(folder) = folder_path.map(|f| f.trim_matches('/')).filter(|f| !f.is_empty()) {
            url.push_str(&format!("&path={}", folder));
        }

        let response = self
            .get_with_retry(&url, &format!("commits for {}/{}", owner, repo))
            .await?;

        let commits: Vec<CommitItem> =
            response.json().await.map_err(|e| AppError::RepositoryFetch {
                message: format!("Failed to parse commit response: {}", e),
            })?;

        commits
            .first()
            .map(|c| c.commit.committer.date)
            .ok_or_else(|| AppError::RepositoryFetch {
                message: format!("No commits found for {}/{}", owner, repo),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repo_url() {
        let (owner, repo) = GithubClient::parse_repo_url("https://github.com/rust-lang/book").unwrap();
        assert_eq!(owner, "rust-lang");
        assert_eq!(repo, "book");
    }

    #[test]
    fn test_parse_repo_url_strips_git_suffix() {
        let (owner, repo) =
            GithubClient::parse_repo_url("https://github.com/rust-lang/book.git").unwrap();
        assert_eq!(owner, "rust-lang");
        assert_eq!(repo, "book");
    }

    #[test]
    fn test_parse_repo_url_trailing_slash() {
        let (_, repo) = GithubClient::parse_repo_url("https://github.com/o/r/").unwrap();
        assert_eq!(repo, "r");
    }

    #[test]
    fn test_parse_repo_url_rejects_other_hosts() {
        assert!(GithubClient::parse_repo_url("https://gitlab.com/o/r").is_err());
        assert!(GithubClient::parse_repo_url("not a url").is_err());
    }

    #[test]
    fn test_parse_repo_url_rejects_missing_repo() {
        assert!(GithubClient::parse_repo_url("https://github.com/owner-only").is_err());
    }
}
