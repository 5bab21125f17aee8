use bytes::Bytes;
use chrono::Utc;

use super::{ServiceError, ServiceResult};
use crate::data_url::DataUrl;
use crate::storage::models::{DocumentKind, DocumentRecord, WriteOp};
use crate::storage::Database;

const FALLBACK_MIME: &str = "application/octet-stream";

/// MIME type for an upload: the declared content type, else a guess from the
/// file name, else `application/octet-stream`.
pub fn resolve_mime(content_type: Option<&str>, file_name: Option<&str>) -> String {
    if let Some(declared) = content_type.map(str::trim).filter(|c| !c.is_empty()) {
        if declared != FALLBACK_MIME {
            return declared.to_string();
        }
    }

    file_name
        .and_then(|name| mime_guess::from_path(name).first())
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| FALLBACK_MIME.to_string())
}

/// Build the metadata record for a new upload, rejecting empty or oversized
/// payloads.
pub fn prepare_upload(
    kind: DocumentKind,
    content_type: Option<&str>,
    file_name: Option<&str>,
    byte_size: u64,
    max_upload_size: u64,
) -> ServiceResult<DocumentRecord> {
    if byte_size == 0 {
        return Err(ServiceError::Invalid("Uploaded document is empty".into()));
    }
    if byte_size > max_upload_size {
        return Err(ServiceError::Invalid(format!(
            "Document exceeds the maximum upload size of {max_upload_size} bytes"
        )));
    }

    let file_name = file_name.map(str::trim).filter(|n| !n.is_empty());
    Ok(DocumentRecord {
        id: uuid::Uuid::new_v4().to_string(),
        kind,
        mime_type: resolve_mime(content_type, file_name),
        byte_size,
        file_name: file_name.map(String::from),
        created_at: Utc::now(),
    })
}

/// Decode an embedded data URL into a record plus the bytes to store.
pub fn prepare_data_url(
    kind: DocumentKind,
    data_url: &str,
    file_name: Option<&str>,
    max_upload_size: u64,
) -> ServiceResult<(DocumentRecord, Bytes)> {
    let decoded = DataUrl::parse(data_url)?;
    let record = prepare_upload(
        kind,
        Some(&decoded.mime_type),
        file_name,
        decoded.data.len() as u64,
        max_upload_size,
    )?;
    Ok((record, decoded.data))
}

pub fn find(db: &Database, id: &str) -> ServiceResult<DocumentRecord> {
    db.get_document(id)?
        .ok_or_else(|| ServiceError::NotFound("Document not found".into()))
}

/// Delete an uploaded document that no exam refers to.
pub fn plan_delete(db: &Database, id: &str) -> ServiceResult<WriteOp> {
    let document = find(db, id)?;

    if let Some(exam) = db
        .list_exams()?
        .into_iter()
        .find(|exam| exam.document_ids().contains(&document.id))
    {
        return Err(ServiceError::Conflict(format!(
            "Document is used by exam '{}'",
            exam.title
        )));
    }

    Ok(WriteOp::DeleteDocument { id: document.id })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_mime() {
        assert_eq!(resolve_mime(Some("application/pdf"), None), "application/pdf");
        assert_eq!(resolve_mime(None, Some("sheet.png")), "image/png");
        assert_eq!(
            resolve_mime(Some("application/octet-stream"), Some("paper.pdf")),
            "application/pdf"
        );
        assert_eq!(resolve_mime(None, None), "application/octet-stream");
        assert_eq!(resolve_mime(Some(""), Some("noext")), "application/octet-stream");
    }

    #[test]
    fn test_prepare_upload_limits() {
        assert!(matches!(
            prepare_upload(DocumentKind::Attachment, None, None, 0, 10),
            Err(ServiceError::Invalid(_))
        ));
        assert!(matches!(
            prepare_upload(DocumentKind::Attachment, None, None, 11, 10),
            Err(ServiceError::Invalid(_))
        ));

        let record =
            prepare_upload(DocumentKind::AnswerKey, None, Some(" key.pdf "), 10, 10).unwrap();
        assert_eq!(record.kind, DocumentKind::AnswerKey);
        assert_eq!(record.mime_type, "application/pdf");
        assert_eq!(record.file_name.as_deref(), Some("key.pdf"));
    }

    #[test]
    fn test_prepare_data_url() {
        let url = DataUrl::encode("image/jpeg", b"jpeg-bytes");
        let (record, data) =
            prepare_data_url(DocumentKind::AnswerSheet, &url, None, 1024).unwrap();
        assert_eq!(record.mime_type, "image/jpeg");
        assert_eq!(record.byte_size, 10);
        assert_eq!(&data[..], b"jpeg-bytes");

        assert!(matches!(
            prepare_data_url(DocumentKind::AnswerSheet, "not a url", None, 1024),
            Err(ServiceError::Invalid(_))
        ));
    }
}
