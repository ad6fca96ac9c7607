use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::request::Parts;
use axum::Json;
use bytes::Bytes;
use futures::channel::mpsc;
use futures::SinkExt;
use serde::Serialize;
use std::sync::Arc;

use super::storage_error;
use crate::api::response::{ApiError, JSend};
use crate::file::{FileInfo, FileUpload, StoredFile};
use crate::resolver::DEFAULT_CONTENT_TYPE;
use crate::AppState;

/// Chunks buffered between the multipart reader and the storage engine.
const CHUNK_BUFFER: usize = 4;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub files: Vec<StoredFile>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Stream every file part of a multipart body through the storage engine.
/// If any part fails, files already stored by this request are removed.
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<JSend<UploadResponse>>, ApiError> {
    let (parts, body) = request.into_parts();
    let ctx = request_context(&parts);

    let mut multipart = Multipart::from_request(Request::from_parts(parts, body), &state)
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart request: {e}")))?;

    let mut stored: Vec<StoredFile> = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                cleanup(&state, &ctx, &stored).await;
                return Err(ApiError::bad_request(format!("Invalid multipart data: {e}")));
            }
        };

        // Text fields are skipped; the parser discards their bodies.
        let Some(original_name) = field.file_name().map(str::to_string) else {
            continue;
        };

        let info = FileInfo {
            field_name: field.name().unwrap_or_default().to_string(),
            original_name,
            encoding: "7bit".to_string(),
            mime_type: field
                .content_type()
                .unwrap_or(DEFAULT_CONTENT_TYPE)
                .to_string(),
        };

        let (mut tx, rx) = mpsc::channel::<std::io::Result<Bytes>>(CHUNK_BUFFER);
        let upload = FileUpload {
            info,
            stream: Box::pin(rx),
        };

        // Feeds the engine until the part ends or the engine stops reading.
        let pump = async move {
            let mut field = field;
            loop {
                match field.chunk().await {
                    Ok(Some(chunk)) => {
                        if tx.send(Ok(chunk)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        let _ = tx.send(Err(std::io::Error::other(e.to_string()))).await;
                        break;
                    }
                }
            }
        };

        let (result, ()) = tokio::join!(state.engine.handle_file(&ctx, upload), pump);

        match result {
            Ok(file) => stored.push(file),
            Err(e) => {
                cleanup(&state, &ctx, &stored).await;
                return Err(storage_error(e));
            }
        }
    }

    if stored.is_empty() {
        return Err(ApiError::bad_request("at least one file part is required"));
    }

    tracing::debug!(count = stored.len(), "Stored uploaded files");

    Ok(JSend::success(UploadResponse { files: stored }))
}

pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    request: Request,
) -> Result<Json<JSend<()>>, ApiError> {
    let (parts, _) = request.into_parts();
    let ctx = request_context(&parts);

    state
        .engine
        .remove_file(&ctx, &filename)
        .await
        .map_err(storage_error)?;

    tracing::debug!(filename = %filename, "Deleted file");
    Ok(JSend::success(()))
}

// ============================================================================
// Helpers
// ============================================================================

/// Copy of the request head handed to resolvers. Extensions are not carried
/// over.
fn request_context(parts: &Parts) -> Parts {
    let (mut ctx, ()) = axum::http::Request::new(()).into_parts();
    ctx.method = parts.method.clone();
    ctx.uri = parts.uri.clone();
    ctx.version = parts.version;
    ctx.headers = parts.headers.clone();
    ctx
}

async fn cleanup(state: &AppState, ctx: &Parts, stored: &[StoredFile]) {
    for file in stored {
        if let Err(e) = state.engine.remove_file(ctx, &file.filename).await {
            tracing::warn!(
                filename = %file.filename,
                error = %e,
                "Failed to remove file after aborted upload"
            );
        }
    }
}
