//! Wayback Machine snapshots of saved pages.
//!
//! Snapshots are best effort: the request runs on its own task, failures are
//! logged and never reach the user.

use std::time::Duration;

use reqwest::Url;
use tokio::task::JoinHandle;

const SAVE_ENDPOINT: &str = "https://web.archive.org/save/";

/// How long the CLI waits for a pending snapshot before exiting.
pub const GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Builds the save URL under `endpoint`, with `page` percent-encoded as a URI
/// component.
pub fn snapshot_url(endpoint: &str, page: &str) -> Option<Url> {
    Url::parse(&format!("{}{}", endpoint, urlencoding::encode(page))).ok()
}

pub fn spawn_snapshot(http: reqwest::Client, page: &str) -> JoinHandle<()> {
    spawn_snapshot_at(http, SAVE_ENDPOINT, page)
}

fn spawn_snapshot_at(http: reqwest::Client, endpoint: &str, page: &str) -> JoinHandle<()> {
    let target = snapshot_url(endpoint, page);
    let page = page.to_string();
    tokio::spawn(async move {
        let Some(target) = target else {
            tracing::warn!(%page, "could not build archive URL");
            return;
        };
        match http.get(target).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!(%page, "archive snapshot requested");
            }
            Ok(resp) => {
                tracing::warn!(%page, status = %resp.status(), "archive snapshot rejected");
            }
            Err(e) => {
                tracing::warn!(%page, error = %e, "archive snapshot failed");
            }
        }
    })
}

/// Gives a pending snapshot up to [`GRACE_PERIOD`] to finish.
pub async fn settle(handle: JoinHandle<()>) {
    if tokio::time::timeout(GRACE_PERIOD, handle).await.is_err() {
        tracing::debug!("archive snapshot still pending at exit");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::stub::serve;

    #[test]
    fn page_is_encoded_as_a_uri_component() {
        let url = snapshot_url(SAVE_ENDPOINT, "https://a.com/x y?q=1&r=2").unwrap();
        assert_eq!(
            url.as_str(),
            "https://web.archive.org/save/https%3A%2F%2Fa.com%2Fx%20y%3Fq%3D1%26r%3D2"
        );
    }

    #[tokio::test]
    async fn rejected_snapshot_settles_quietly() {
        let (base, server) = serve(vec![(503, "{}")]).await;
        let handle = spawn_snapshot_at(
            reqwest::Client::new(),
            &format!("{}/save/", base),
            "https://a.com/p",
        );
        settle(handle).await;

        let seen = server.await.unwrap();
        assert!(seen[0]
            .request_line()
            .starts_with("GET /save/https%3A%2F%2Fa.com%2Fp "));
    }

    #[tokio::test]
    async fn unreachable_archive_finishes_without_panicking() {
        let handle = spawn_snapshot_at(
            reqwest::Client::new(),
            "http://127.0.0.1:9/save/",
            "https://a.com/p",
        );
        tokio::time::timeout(GRACE_PERIOD, handle)
            .await
            .expect("snapshot task finished")
            .expect("snapshot task did not panic");
    }
}
