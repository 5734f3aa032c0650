use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
};
use tracing::{debug, error, info, warn};

use crate::errors::UploadError;
use crate::models::{Attachment, UploadTarget};
use crate::storage::{ByteRange, ShareConnector};
use crate::AppState;

pub const UPLOAD_SUCCESS_MESSAGE: &str = "File uploaded successfully.";

/// Handle a file upload (GET or POST)
///
/// Only the first file in the form is used. Anything after it is left unread.
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, &'static str), UploadError> {
    info!("FileShareFunction processing a request for a file");

    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            debug!(reason = %rejection, "Request body is not multipart form data");
            return Err(UploadError::NoFile);
        }
    };

    let attachment = match first_attachment(&mut multipart).await {
        Ok(Some(attachment)) => attachment,
        Ok(None) => return Err(UploadError::NoFile),
        Err(err) => {
            warn!(error = %err, "Failed to read multipart body");
            return Err(err);
        }
    };

    let file_name = attachment.file_name.clone();
    let size = attachment.len();
    debug!(
        file = %file_name,
        size,
        content_type = ?attachment.content_type,
        "Received attachment"
    );

    match forward_to_share(state.connector.as_ref(), &state.target, attachment).await {
        Ok(()) => {
            info!(file = %file_name, size, "File uploaded to share");
            Ok((StatusCode::OK, UPLOAD_SUCCESS_MESSAGE))
        }
        Err(UploadError::Storage(err)) => {
            error!(
                error = %err,
                kind = err.kind(),
                file = %file_name,
                "An error occurred during file upload"
            );
            Err(UploadError::Storage(err))
        }
        Err(err) => Err(err),
    }
}

/// Read form fields up to and including the first one carrying a file name.
async fn first_attachment(multipart: &mut Multipart) -> Result<Option<Attachment>, UploadError> {
    while let Some(field) = multipart.next_field().await? {
        let Some(file_name) = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
        else {
            debug!(field = field.name().unwrap_or("unknown"), "Skipping non-file form field");
            continue;
        };

        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;

        return Ok(Some(Attachment {
            file_name,
            content_type,
            data,
        }));
    }

    Ok(None)
}

/// Check the share, create the file at full size, then write every byte in one range.
///
/// A file created before a failed range write is left in place.
pub async fn forward_to_share(
    connector: &dyn ShareConnector,
    target: &UploadTarget,
    attachment: Attachment,
) -> Result<(), UploadError> {
    let store = connector.connect()?;

    let share = target.share();
    if !store.share_exists(&share).await? {
        return Err(UploadError::ShareMissing(share.name().to_string()));
    }

    let file = target.file_for(&attachment);
    let length = attachment.len();

    store.create_file(&file, length).await?;
    store
        .upload_range(&file, ByteRange::new(0, length), attachment.data)
        .await?;

    Ok(())
}
