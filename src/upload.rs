//! HTTP front end: a browser form that uploads images and scrambles them.
//!
//! - `GET /`: multipart form posting one or more `file` fields
//! - `POST /upload`: stage allowed files, run the batch, reply with plain text

use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::pipeline::{self, BatchReport};

const UPLOAD_FORM: &str = r#"<!doctype html>
<title>Upload images</title>
<h1>Upload images</h1>
<form method="post" action="/upload" enctype="multipart/form-data">
  <input type="file" name="file" multiple>
  <input type="submit" value="Upload">
</form>
"#;

pub const UPLOAD_OK: &str = "Files uploaded and processed successfully";

type HandlerError = (StatusCode, String);

/// Build the router. The body limit comes from `server.max_upload_bytes`.
pub fn create_router(config: Config) -> Router {
    let limit = config.server.max_upload_bytes;
    Router::new()
        .route("/", get(upload_form))
        .route("/upload", post(upload_files))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(Arc::new(config))
}

async fn upload_form() -> Html<&'static str> {
    Html(UPLOAD_FORM)
}

async fn upload_files(
    State(config): State<Arc<Config>>,
    mut multipart: Multipart,
) -> Result<&'static str, HandlerError> {
    tokio::fs::create_dir_all(&config.server.upload_dir)
        .await
        .map_err(internal)?;

    let mut saw_file_part = false;
    let mut staged: Vec<PathBuf> = Vec::new();
    let mut folders: Vec<PathBuf> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        saw_file_part = true;

        let file_name = field.file_name().unwrap_or_default().to_string();
        if file_name.is_empty() {
            return Err((StatusCode::BAD_REQUEST, "No selected file".to_string()));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, e.body_text()))?;

        let safe_name = secure_filename(&file_name);
        let dest = config.server.upload_dir.join(&safe_name);
        if safe_name.is_empty() || !pipeline::is_allowed(&dest, &config.filter) {
            log::warn!("Rejected upload: {file_name}");
            continue;
        }

        // A name that matches a folder already in the upload directory refers to
        // that folder; its contents are processed and the upload body is dropped.
        if tokio::fs::metadata(&dest).await.is_ok_and(|m| m.is_dir()) {
            log::info!("Upload names staged folder {}", dest.display());
            folders.push(dest);
            continue;
        }

        if let Err(e) = tokio::fs::write(&dest, &data).await {
            log::error!("Failed to stage {}: {e}", dest.display());
            continue;
        }
        log::info!("Staged {} ({} bytes)", dest.display(), data.len());
        staged.push(dest);
    }

    if !saw_file_part {
        return Err((StatusCode::BAD_REQUEST, "No file part".to_string()));
    }

    let batch_config = Arc::clone(&config);
    let report: BatchReport = tokio::task::spawn_blocking(move || {
        let mut rng = match batch_config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let processed_dir = &batch_config.server.processed_dir;
        let mut report = pipeline::process_batch(&staged, processed_dir, &mut rng, &batch_config);
        for folder in &folders {
            match pipeline::process_folder(folder, processed_dir, &mut rng, &batch_config) {
                Ok(folder_report) => report.results.extend(folder_report.results),
                Err(e) => log::error!("{}: {e}", folder.display()),
            }
        }
        report
    })
    .await
    .map_err(internal)?;

    log::debug!(
        "Upload batch: {} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    );
    Ok(UPLOAD_OK)
}

fn internal<E: std::fmt::Display>(err: E) -> HandlerError {
    log::error!("Upload failed: {err}");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
}

/// Reduce a client-supplied file name to a safe base name.
///
/// Directory components are dropped, characters outside `[A-Za-z0-9._-]`
/// become `_`, and leading dots are stripped. May return an empty string.
pub fn secure_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}
