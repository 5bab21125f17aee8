//! Base64 data URLs (`data:<mime>;base64,<payload>`), the format clients use
//! to embed uploaded files in JSON bodies.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataUrlError {
    #[error("not a base64 data URL")]
    NotDataUrl,
    #[error("data URL is missing a MIME type")]
    MissingMimeType,
    #[error("invalid base64 payload: {0}")]
    Payload(#[from] base64::DecodeError),
}

/// A decoded data URL.
#[derive(Debug, Clone, PartialEq)]
pub struct DataUrl {
    pub mime_type: String,
    pub data: Bytes,
}

impl DataUrl {
    pub fn parse(input: &str) -> Result<Self, DataUrlError> {
        let (header, payload) = split(input).ok_or(DataUrlError::NotDataUrl)?;
        let mime_type = header_mime(header).ok_or(DataUrlError::MissingMimeType)?;

        // Browsers never wrap, but pasted payloads sometimes carry whitespace
        let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        let data = STANDARD.decode(payload.as_bytes())?;

        Ok(Self {
            mime_type: mime_type.to_string(),
            data: Bytes::from(data),
        })
    }

    pub fn encode(mime_type: &str, data: &[u8]) -> String {
        format!("data:{mime_type};base64,{}", STANDARD.encode(data))
    }
}

/// Returns the header (between `data:` and `;base64`) and the payload.
fn split(input: &str) -> Option<(&str, &str)> {
    let rest = input.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let header = header.strip_suffix(";base64")?;
    Some((header, payload))
}

fn header_mime(header: &str) -> Option<&str> {
    let mime = header.split(';').next()?.trim();
    if mime.is_empty() || !mime.contains('/') {
        None
    } else {
        Some(mime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pdf() {
        let url = "data:application/pdf;base64,JVBERi0xLjQ=";
        let parsed = DataUrl::parse(url).unwrap();
        assert_eq!(parsed.mime_type, "application/pdf");
        assert_eq!(&parsed.data[..], b"%PDF-1.4");
    }

    #[test]
    fn test_parse_with_parameters() {
        let url = "data:text/plain;charset=utf-8;base64,aGk=";
        let parsed = DataUrl::parse(url).unwrap();
        assert_eq!(parsed.mime_type, "text/plain");
        assert_eq!(&parsed.data[..], b"hi");
    }

    #[test]
    fn test_encode_then_parse() {
        let encoded = DataUrl::encode("image/png", &[0x89, b'P', b'N', b'G']);
        assert!(encoded.starts_with("data:image/png;base64,"));
        let parsed = DataUrl::parse(&encoded).unwrap();
        assert_eq!(&parsed.data[..], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(matches!(
            DataUrl::parse("hello"),
            Err(DataUrlError::NotDataUrl)
        ));
        assert!(matches!(
            DataUrl::parse("data:image/png,plain"),
            Err(DataUrlError::NotDataUrl)
        ));
        assert!(matches!(
            DataUrl::parse("data:;base64,aGk="),
            Err(DataUrlError::MissingMimeType)
        ));
        assert!(matches!(
            DataUrl::parse("data:image/png;base64,@@@"),
            Err(DataUrlError::Payload(_))
        ));
    }
}
