//! Streaming download of the published embedding archive.

use std::path::{Path, PathBuf};

use embedplot_shared::{Checksum, ChecksumHasher, EmbedplotError, Result};
use reqwest::{Client, StatusCode};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// A downloaded archive on disk together with the hash of its bytes.
#[derive(Debug, Clone)]
pub struct DownloadedArchive {
    pub path: PathBuf,
    pub checksum: Checksum,
    pub size_bytes: u64,
}

/// Download `url` into `dest`, writing the body verbatim chunk by chunk.
///
/// Anything other than `200 OK` is a transport error. On failure no partial
/// file is left at `dest`.
#[instrument(skip_all, fields(url = %url, dest = %dest.display()))]
pub async fn download_archive(client: &Client, url: &Url, dest: &Path) -> Result<DownloadedArchive> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| EmbedplotError::io(parent, e))?;
        }
    }

    info!("downloading embedding archive");

    match stream_to_file(client, url, dest).await {
        Ok(downloaded) => {
            info!(
                size_bytes = downloaded.size_bytes,
                checksum = %downloaded.checksum,
                "archive downloaded"
            );
            Ok(downloaded)
        }
        Err(e) => {
            if tokio::fs::try_exists(dest).await.unwrap_or(false) {
                if let Err(remove_err) = tokio::fs::remove_file(dest).await {
                    warn!(error = %remove_err, "could not remove partial archive");
                }
            }
            Err(e)
        }
    }
}

async fn stream_to_file(client: &Client, url: &Url, dest: &Path) -> Result<DownloadedArchive> {
    let mut response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| EmbedplotError::Transport(format!("{url}: {e}")))?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(EmbedplotError::Transport(format!(
            "error downloading embedding archive from {url}: HTTP {status}"
        )));
    }

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| EmbedplotError::io(dest, e))?;
    let mut hasher = ChecksumHasher::new();
    let mut size_bytes: u64 = 0;

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| EmbedplotError::Transport(format!("{url}: body read failed: {e}")))?
    {
        hasher.update(&chunk);
        file.write_all(&chunk)
            .await
            .map_err(|e| EmbedplotError::io(dest, e))?;
        size_bytes += chunk.len() as u64;
        debug!(size_bytes, "chunk written");
    }

    file.flush().await.map_err(|e| EmbedplotError::io(dest, e))?;

    Ok(DownloadedArchive {
        path: dest.to_path_buf(),
        checksum: hasher.finish(),
        size_bytes,
    })
}

/// Delete a downloaded archive. A file that is already gone is not an error.
pub fn remove_archive(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "archive removed");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(EmbedplotError::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use embedplot_shared::{USER_AGENT, build_client};

    use super::*;

    fn temp_dir(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("embedplot-{label}-{}", uuid::Uuid::now_v7()))
    }

    #[tokio::test]
    async fn download_writes_body_and_checksum() {
        let server = wiremock::MockServer::start().await;
        let body: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/per-protein.h5"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let dir = temp_dir("download-ok");
        let dest = dir.join("embeddings.h5");
        let url = Url::parse(&format!("{}/per-protein.h5", server.uri())).unwrap();
        let client = build_client(None).unwrap();

        let downloaded = download_archive(&client, &url, &dest).await.unwrap();

        assert_eq!(downloaded.path, dest);
        assert_eq!(downloaded.size_bytes, body.len() as u64);
        assert_eq!(downloaded.checksum, Checksum::of_bytes(&body));
        assert_eq!(std::fs::read(&dest).unwrap(), body);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn download_sends_the_embedplot_user_agent() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::header("user-agent", USER_AGENT))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_bytes(b"release".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = temp_dir("download-agent");
        let dest = dir.join("embeddings.h5");
        let url = Url::parse(&format!("{}/per-protein.h5", server.uri())).unwrap();

        download_archive(&build_client(None).unwrap(), &url, &dest).await.unwrap();

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn download_fails_on_server_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = temp_dir("download-500");
        let dest = dir.join("embeddings.h5");
        let url = Url::parse(&format!("{}/per-protein.h5", server.uri())).unwrap();
        let client = build_client(None).unwrap();

        let err = download_archive(&client, &url, &dest).await.unwrap_err();
        assert!(matches!(err, EmbedplotError::Transport(_)));
        assert!(err.to_string().contains("error downloading embedding archive"));
        assert!(!dest.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn download_rejects_non_200_success() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let dir = temp_dir("download-204");
        let dest = dir.join("embeddings.h5");
        let url = Url::parse(&server.uri()).unwrap();
        let client = build_client(Some(5)).unwrap();

        let err = download_archive(&client, &url, &dest).await.unwrap_err();
        assert!(err.to_string().contains("204"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn remove_archive_tolerates_missing_file() {
        let dir = temp_dir("remove-missing");
        assert!(remove_archive(&dir.join("gone.h5")).is_ok());
    }

    #[test]
    fn remove_archive_deletes_file() {
        let dir = temp_dir("remove-present");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("embeddings.h5");
        std::fs::write(&path, b"data").unwrap();

        remove_archive(&path).unwrap();
        assert!(!path.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
