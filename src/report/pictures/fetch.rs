//! Concurrent fetch-and-encode of remote picture references.
//!
//! Downloads within one report run are order-independent, so they run
//! concurrently, bounded to avoid overwhelming the source system. A failed
//! download degrades the picture to its original remote URL; it never aborts
//! the report.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::stream::{self, StreamExt};
use tracing::warn;

use super::super::domain::Picture;
use super::super::sources::PictureSource;

/// Outcome counters for one resolution pass, surfaced as a report warning
/// when any download failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOutcome {
    pub resolved: usize,
    pub fallback: usize,
}

/// Resolve `data_url` for every picture that only carries a remote URL.
/// At most `concurrency` downloads are in flight at a time.
pub async fn resolve_data_urls<S: PictureSource + ?Sized>(
    pictures: Vec<Picture>,
    source: &S,
    concurrency: usize,
) -> (Vec<Picture>, FetchOutcome) {
    let concurrency = concurrency.max(1);
    let mut outcome = FetchOutcome::default();

    let resolved: Vec<(Picture, bool)> =
        stream::iter(pictures.into_iter().map(|picture| async move {
            resolve_one(picture, source).await
        }))
        .buffer_unordered(concurrency)
        .collect()
        .await;

    for (_, fetched) in &resolved {
        if *fetched {
            outcome.resolved += 1;
        } else {
            outcome.fallback += 1;
        }
    }

    (
        resolved.into_iter().map(|(picture, _)| picture).collect(),
        outcome,
    )
}

async fn resolve_one<S: PictureSource + ?Sized>(
    mut picture: Picture,
    source: &S,
) -> (Picture, bool) {
    if picture.data_url.is_some() {
        return (picture, true);
    }
    let Some(url) = picture.remote_url.clone() else {
        return (picture, false);
    };

    match source.fetch_image(&url).await {
        Ok(bytes) => {
            picture.data_url = Some(to_data_url(&picture.file_name, &bytes));
            (picture, true)
        }
        Err(err) => {
            warn!(image_id = %picture.image_id, error = %err, "picture download failed, keeping remote reference");
            (picture, false)
        }
    }
}

fn to_data_url(file_name: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_for(file_name), STANDARD.encode(bytes))
}

fn mime_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit('.')
        .next()
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}
