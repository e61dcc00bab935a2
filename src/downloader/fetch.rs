//! Per-file fetch-and-write download action

use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::error::{Error, Result};

/// Download `url` through the shared session client and write it to
/// `dest_path`, creating parent directories as needed.
///
/// The body is streamed to disk chunk by chunk rather than buffered whole,
/// so a large issue never has to fit in memory. On any failure after the
/// file was created, the partial file is removed; the existence filter
/// must not mistake it for a finished download on the next run.
pub(crate) async fn fetch_file(client: Client, url: Url, dest_path: PathBuf) -> Result<PathBuf> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| download_error(&dest_path, format!("request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(download_error(
            &dest_path,
            format!("server returned status {status}"),
        ));
    }

    if let Some(parent) = dest_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| download_error(&dest_path, format!("cannot create directory: {e}")))?;
    }

    match write_body(response, &dest_path).await {
        Ok(()) => {
            tracing::debug!(url = %url, file = %dest_path.display(), "fetched");
            Ok(dest_path)
        }
        Err(reason) => {
            let _ = tokio::fs::remove_file(&dest_path).await;
            Err(download_error(&dest_path, reason))
        }
    }
}

/// Stream the response body into the destination file
async fn write_body(
    response: reqwest::Response,
    dest_path: &Path,
) -> std::result::Result<(), String> {
    let mut file = tokio::fs::File::create(dest_path)
        .await
        .map_err(|e| format!("cannot create file: {e}"))?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| format!("transfer interrupted: {e}"))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| format!("write failed: {e}"))?;
    }

    file.flush().await.map_err(|e| format!("flush failed: {e}"))?;
    Ok(())
}

fn download_error(dest_path: &Path, reason: String) -> Error {
    let file_name = dest_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| dest_path.display().to_string());
    Error::Download { file_name, reason }
}
