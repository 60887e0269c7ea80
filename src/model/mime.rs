use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;

static DATA_URI_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^data:[^,]*,").expect("valid data uri prefix pattern"));

const IMAGE_DATA_PREFIX: &str = "data:image/";

pub fn is_pdf(mime: &str) -> bool {
    mime.eq_ignore_ascii_case("application/pdf")
}

pub fn is_spreadsheet(mime: &str) -> bool {
    matches!(
        mime,
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            | "application/vnd.ms-excel"
            | "text/csv"
    )
}

/// Accepts both plain mimetypes and data-URI prefixed ones.
pub fn is_image(mime: &str) -> bool {
    if let Some(rest) = mime.strip_prefix(IMAGE_DATA_PREFIX) {
        return !rest.is_empty();
    }
    mime.to_ascii_lowercase().starts_with("image/")
}

pub fn is_previewable(mime: &str) -> bool {
    is_image(mime) || is_pdf(mime)
}

pub fn create_data_uri(mime: &str, base64: &str) -> String {
    format!("data:{mime};base64,{base64}")
}

/// Drops a leading `data:...;base64,` header if present.
pub fn strip_data_uri(content: &str) -> &str {
    match DATA_URI_PREFIX.find(content) {
        Some(found) => &content[found.end()..],
        None => content,
    }
}

/// Strips any data-URI header and decodes the remaining base64 body.
pub fn decode_payload(content: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let body: String = strip_data_uri(content)
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .collect();
    STANDARD.decode(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_detection_handles_data_uri_prefixes() {
        assert!(is_image("image/png"));
        assert!(is_image("data:image/jpeg"));
        assert!(!is_image("data:image/"));
        assert!(!is_image("application/pdf"));
        assert!(is_previewable("application/pdf"));
        assert!(!is_previewable("text/plain"));
    }

    #[test]
    fn spreadsheet_detection_covers_csv() {
        assert!(is_spreadsheet("text/csv"));
        assert!(is_spreadsheet("application/vnd.ms-excel"));
        assert!(!is_spreadsheet("text/plain"));
    }

    #[test]
    fn payload_decoding_strips_header() {
        let decoded = decode_payload("data:text/plain;base64,aGVsbG8=").unwrap();
        assert_eq!(decoded, b"hello");
        assert_eq!(decode_payload("aGVsbG8=").unwrap(), b"hello");
        assert!(decode_payload("data:text/plain;base64,@@@").is_err());
    }

    #[test]
    fn data_uri_round_trips_through_strip() {
        let uri = create_data_uri("image/png", "AAAA");
        assert_eq!(uri, "data:image/png;base64,AAAA");
        assert_eq!(strip_data_uri(&uri), "AAAA");
    }
}
