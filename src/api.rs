//! Client for the Memos REST API (`/api/v1`).

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;

/// HTTP request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("the server rejected the API key")]
    Unauthorized,

    #[error("server responded with {status}: {}", .message.as_deref().unwrap_or("no details"))]
    Status {
        status: StatusCode,
        message: Option<String>,
    },

    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Authenticated user as reported by the server.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Resource name, e.g. `users/1`.
    pub name: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memo {
    /// Resource name, e.g. `memos/42`.
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub visibility: String,
    #[serde(default)]
    pub create_time: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewMemo {
    pub content: String,
    pub visibility: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MemoPatch<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    create_time: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TagAmounts {
    #[serde(default)]
    tag_amounts: BTreeMap<String, u64>,
}

#[derive(Deserialize)]
struct MemoList {
    #[serde(default)]
    memos: Vec<Memo>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

pub struct MemosClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl MemosClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<MemosClient, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ApiError::Transport)?;
        Ok(MemosClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<MemosClient, ApiError> {
        MemosClient::new(&config.base_url, &config.api_key)
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/api/v1/{}", self.base_url, path.trim_start_matches('/'));
        tracing::debug!(%method, %url, "memos request");
        self.http.request(method, url).bearer_auth(&self.api_key)
    }

    pub async fn get_user_status(&self) -> Result<User, ApiError> {
        let resp = send(self.request(Method::POST, "auth/status")).await?;
        resp.json().await.map_err(ApiError::Decode)
    }

    pub async fn create_memo(&self, memo: &NewMemo) -> Result<Memo, ApiError> {
        let resp = send(self.request(Method::POST, "memos").json(memo)).await?;
        resp.json().await.map_err(ApiError::Decode)
    }

    /// Patches the creation time and/or content of the memo named `name`.
    pub async fn update_memo(
        &self,
        name: &str,
        create_time: Option<&str>,
        content: Option<&str>,
    ) -> Result<Memo, ApiError> {
        let mut mask = Vec::new();
        if create_time.is_some() {
            mask.push("create_time");
        }
        if content.is_some() {
            mask.push("content");
        }
        let req = self
            .request(Method::PATCH, name)
            .query(&[("updateMask", mask.join(","))])
            .json(&MemoPatch { create_time, content });
        let resp = send(req).await?;
        resp.json().await.map_err(ApiError::Decode)
    }

    /// Tag names used by `user`, sorted case-insensitively.
    pub async fn list_tags(&self, user: &str) -> Result<Vec<String>, ApiError> {
        let filter = format!("creator == '{}'", filter_literal(user));
        let req = self
            .request(Method::GET, "memos/-/tags")
            .query(&[("filter", filter)]);
        let body: TagAmounts = send(req).await?.json().await.map_err(ApiError::Decode)?;
        let mut tags: Vec<String> = body.tag_amounts.into_keys().collect();
        sort_tags(&mut tags);
        Ok(tags)
    }

    /// First memo by `user` whose content mentions `url`, if any.
    pub async fn search_memo_by_url(&self, user: &str, url: &str) -> Result<Option<Memo>, ApiError> {
        let filter = format!(
            "creator == '{}' && content_search == ['{}']",
            filter_literal(user),
            filter_literal(url)
        );
        let req = self
            .request(Method::GET, "memos")
            .query(&[("filter", filter.as_str()), ("pageSize", "1")]);
        let body: MemoList = send(req).await?.json().await.map_err(ApiError::Decode)?;
        Ok(body.memos.into_iter().next())
    }
}

async fn send(req: RequestBuilder) -> Result<Response, ApiError> {
    let resp = req.send().await.map_err(ApiError::Transport)?;
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized);
    }
    let message = resp
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty());
    Err(ApiError::Status { status, message })
}

/// Escapes a value for a single-quoted literal in a Memos filter
/// expression. Backslashes go first so the added ones are not doubled.
fn filter_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn sort_tags(tags: &mut [String]) {
    tags.sort_by(|a, b| {
        a.to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b))
    });
}


#[cfg(test)]
mod tests {
    use super::stub::serve;
    use super::*;

    #[tokio::test]
    async fn user_status_sends_bearer_token() {
        let (base, server) = serve(vec![(200, r#"{"name":"users/1","username":"ada"}"#)]).await;
        let client = MemosClient::new(&format!("{}/", base), "tok").unwrap();

        let user = client.get_user_status().await.unwrap();
        assert_eq!(user.name, "users/1");
        assert_eq!(user.username, "ada");

        let seen = server.await.unwrap();
        assert!(seen[0].request_line().starts_with("POST /api/v1/auth/status "));
        assert_eq!(seen[0].header("authorization"), Some("Bearer tok"));
    }

    #[tokio::test]
    async fn unauthorized_is_distinct() {
        let (base, _server) = serve(vec![(401, r#"{"message":"bad token"}"#)]).await;
        let client = MemosClient::new(&base, "nope").unwrap();
        assert!(matches!(
            client.get_user_status().await,
            Err(ApiError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn other_failures_carry_server_message() {
        let (base, _server) = serve(vec![(500, r#"{"message":"database is locked"}"#)]).await;
        let client = MemosClient::new(&base, "tok").unwrap();
        let memo = NewMemo {
            content: "x".to_string(),
            visibility: "PUBLIC",
        };
        match client.create_memo(&memo).await {
            Err(ApiError::Status { status, message }) => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(message.as_deref(), Some("database is locked"));
            }
            other => panic!("unexpected result: {:?}", other.map(|m| m.name)),
        }
    }

    #[tokio::test]
    async fn create_memo_posts_content_and_visibility() {
        let (base, server) = serve(vec![(200, r#"{"name":"memos/42","content":"hi","visibility":"PRIVATE"}"#)]).await;
        let client = MemosClient::new(&base, "tok").unwrap();
        let memo = client
            .create_memo(&NewMemo {
                content: "hi".to_string(),
                visibility: "PRIVATE",
            })
            .await
            .unwrap();
        assert_eq!(memo.name, "memos/42");

        let seen = server.await.unwrap();
        assert!(seen[0].request_line().starts_with("POST /api/v1/memos "));
        let body: serde_json::Value = serde_json::from_str(&seen[0].body).unwrap();
        assert_eq!(body["content"], "hi");
        assert_eq!(body["visibility"], "PRIVATE");
    }

    #[tokio::test]
    async fn update_memo_patches_only_given_fields() {
        let (base, server) = serve(vec![(200, r#"{"name":"memos/42"}"#)]).await;
        let client = MemosClient::new(&base, "tok").unwrap();
        client
            .update_memo("memos/42", Some("2024-05-01T09:30:00+02:00"), None)
            .await
            .unwrap();

        let seen = server.await.unwrap();
        assert!(seen[0]
            .request_line()
            .starts_with("PATCH /api/v1/memos/42?updateMask=create_time "));
        let body: serde_json::Value = serde_json::from_str(&seen[0].body).unwrap();
        assert_eq!(body["createTime"], "2024-05-01T09:30:00+02:00");
        assert!(body.get("content").is_none());
    }

    #[tokio::test]
    async fn update_memo_patches_content() {
        let (base, server) = serve(vec![
            (200, r#"{"name":"memos/42","content":"new"}"#),
            (200, r#"{"name":"memos/42","content":"both"}"#),
        ])
        .await;
        let client = MemosClient::new(&base, "tok").unwrap();
        let memo = client
            .update_memo("memos/42", None, Some("new"))
            .await
            .unwrap();
        assert_eq!(memo.content, "new");
        client
            .update_memo("memos/42", Some("2024-05-01T00:00:00Z"), Some("both"))
            .await
            .unwrap();

        let seen = server.await.unwrap();
        assert!(seen[0]
            .request_line()
            .starts_with("PATCH /api/v1/memos/42?updateMask=content "));
        let body: serde_json::Value = serde_json::from_str(&seen[0].body).unwrap();
        assert_eq!(body["content"], "new");
        assert!(body.get("createTime").is_none());

        assert!(seen[1]
            .request_line()
            .starts_with("PATCH /api/v1/memos/42?updateMask=create_time%2Ccontent "));
        let body: serde_json::Value = serde_json::from_str(&seen[1].body).unwrap();
        assert_eq!(body["content"], "both");
        assert_eq!(body["createTime"], "2024-05-01T00:00:00Z");
    }

    #[test]
    fn filter_literals_escape_backslash_then_quote() {
        assert_eq!(filter_literal("https://a.com"), "https://a.com");
        assert_eq!(filter_literal("it's"), "it\\'s");
        assert_eq!(filter_literal("a\\'b"), "a\\\\\\'b");
    }

    #[tokio::test]
    async fn search_filter_keeps_url_inside_the_literal() {
        let (base, server) = serve(vec![(200, r#"{"memos":[]}"#)]).await;
        let client = MemosClient::new(&base, "tok").unwrap();
        client
            .search_memo_by_url("users/1", "https://a.com/x\\' || true")
            .await
            .unwrap();

        let seen = server.await.unwrap();
        let target = seen[0].request_line().split(' ').nth(1).unwrap();
        let url = reqwest::Url::parse(&format!("http://stub{}", target)).unwrap();
        let filter = url
            .query_pairs()
            .find(|(k, _)| k == "filter")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert_eq!(
            filter,
            "creator == 'users/1' && content_search == ['https://a.com/x\\\\\\' || true']"
        );
    }

    #[tokio::test]
    async fn tags_are_sorted_case_insensitively() {
        let (base, server) = serve(vec![(200, r#"{"tagAmounts":{"rust":2,"Books":1,"art":4}}"#)]).await;
        let client = MemosClient::new(&base, "tok").unwrap();
        let tags = client.list_tags("users/1").await.unwrap();
        assert_eq!(tags, vec!["art", "Books", "rust"]);

        let seen = server.await.unwrap();
        assert!(seen[0].request_line().starts_with("GET /api/v1/memos/-/tags?filter="));
    }

    #[tokio::test]
    async fn search_by_url_returns_first_match_or_none() {
        let (base, _server) = serve(vec![
            (200, r#"{"memos":[{"name":"memos/3"},{"name":"memos/2"}]}"#),
            (200, r#"{"memos":[]}"#),
        ])
        .await;
        let client = MemosClient::new(&base, "tok").unwrap();
        let hit = client
            .search_memo_by_url("users/1", "https://a.com")
            .await
            .unwrap();
        assert_eq!(hit.map(|m| m.name).as_deref(), Some("memos/3"));
        let miss = client
            .search_memo_by_url("users/1", "https://b.com")
            .await
            .unwrap();
        assert!(miss.is_none());
    }
}
