//! Email message parsing and encoding
//!
//! Converts raw Gmail API messages into normalized email records (header
//! lookup, body extraction) and builds the raw RFC822-style payload for
//! send/draft operations.

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD},
    Engine,
};
use thiserror::Error;

use crate::gmail::types::{Header, Message, MessagePart};

/// Fallback text when no plain-text body can be extracted
pub const BODY_UNAVAILABLE: &str = "Body content not available";

/// A normalized email record, built from a raw Gmail message
///
/// Every field defaults to an empty value rather than a missing one, so
/// downstream formatting never branches on "absent" vs "empty".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailMessage {
    pub id: String,
    pub thread_id: String,
    pub snippet: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub date: String,
    /// Populated only when body extraction was requested; otherwise empty
    pub body: String,
    pub labels: Vec<String>,
}

/// Failure while decoding an inline body part
#[derive(Error, Debug)]
pub enum BodyDecodeError {
    #[error("invalid base64 data: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("body is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Find a header value by name (case-insensitive)
///
/// The first occurrence in provider list order wins; absent headers yield
/// `None`. The header list is never sorted.
pub fn find_header<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

/// Decode inline body data as returned by the Gmail API
///
/// The provider emits standard base64 for inbound payload data, so that
/// alphabet is tried first; URL-safe variants are accepted as a fallback.
pub fn decode_body_data(data: &str) -> Result<String, BodyDecodeError> {
    let bytes = STANDARD
        .decode(data)
        .or_else(|_| URL_SAFE_NO_PAD.decode(data))
        .or_else(|_| URL_SAFE.decode(data))?;
    Ok(String::from_utf8(bytes)?)
}

/// Extract the best available plain-text body from a payload tree
///
/// Handles the two shapes the provider produces for text mail: inline data
/// directly on the root node (single-part messages), or a flat list of
/// alternative parts where the first `text/plain` child wins. Nested
/// multipart children are not recursed into; messages with no reachable
/// plain text yield [`BODY_UNAVAILABLE`].
pub fn extract_body(payload: Option<&MessagePart>) -> String {
    let Some(payload) = payload else {
        return String::new();
    };

    if let Some(data) = payload.body.as_ref().and_then(|b| b.data.as_deref()) {
        return match decode_body_data(data) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!("failed to decode message body: {}", e);
                BODY_UNAVAILABLE.to_string()
            }
        };
    }

    for part in &payload.parts {
        if part.mime_type.as_deref() != Some("text/plain") {
            continue;
        }
        if let Some(data) = part.body.as_ref().and_then(|b| b.data.as_deref()) {
            return match decode_body_data(data) {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!("failed to decode text/plain part: {}", e);
                    BODY_UNAVAILABLE.to_string()
                }
            };
        }
    }

    BODY_UNAVAILABLE.to_string()
}

/// Parse a raw Gmail message into a normalized email record
///
/// Pure transformation; the raw message is never mutated. When
/// `include_body` is false the body extractor is not invoked at all.
pub fn parse_message(message: &Message, include_body: bool) -> EmailMessage {
    let headers: &[Header] = message
        .payload
        .as_ref()
        .map(|p| p.headers.as_slice())
        .unwrap_or_default();

    let header = |name: &str| find_header(headers, name).unwrap_or("").to_string();

    let body = if include_body {
        extract_body(message.payload.as_ref())
    } else {
        String::new()
    };

    EmailMessage {
        id: message.id.clone(),
        thread_id: message.thread_id.clone().unwrap_or_default(),
        snippet: message.snippet.clone().unwrap_or_default(),
        from: header("From"),
        to: header("To"),
        subject: header("Subject"),
        date: header("Date"),
        body,
        labels: message.label_ids.clone(),
    }
}

/// An outgoing email for the send and draft paths
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    /// Send the body as text/html instead of text/plain
    pub html: bool,
}

/// Build the raw RFC822-style message for an outgoing email
///
/// Minimal header block: To, Subject, optional Cc/Bcc, Content-Type, then a
/// blank line and the body.
pub fn build_raw_email(email: &OutgoingEmail) -> String {
    let mut lines = vec![
        format!("To: {}", email.to),
        format!("Subject: {}", email.subject),
    ];

    if let Some(ref cc) = email.cc {
        lines.push(format!("Cc: {}", cc));
    }
    if let Some(ref bcc) = email.bcc {
        lines.push(format!("Bcc: {}", bcc));
    }

    let subtype = if email.html { "html" } else { "plain" };
    lines.push(format!("Content-Type: text/{}; charset=utf-8", subtype));
    lines.push(String::new());
    lines.push(email.body.clone());

    lines.join("\n")
}

/// Encode a raw email message for the Gmail API (base64url, no padding)
pub fn encode_raw_message(message: &str) -> String {
    URL_SAFE_NO_PAD.encode(message.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::types::MessagePartBody;

    fn header(name: &str, value: &str) -> Header {
        Header {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    fn inline_part(mime_type: &str, data: &str) -> MessagePart {
        MessagePart {
            mime_type: Some(mime_type.to_string()),
            body: Some(MessagePartBody {
                size: data.len() as i64,
                data: Some(data.to_string()),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_find_header_case_insensitive() {
        let headers = vec![header("FROM", "a@x.com"), header("subject", "Hi")];
        assert_eq!(find_header(&headers, "From"), Some("a@x.com"));
        assert_eq!(find_header(&headers, "Subject"), Some("Hi"));
    }

    #[test]
    fn test_find_header_first_occurrence_wins() {
        let headers = vec![header("Received", "first"), header("received", "second")];
        assert_eq!(find_header(&headers, "Received"), Some("first"));
    }

    #[test]
    fn test_find_header_absent() {
        let headers = vec![header("From", "a@x.com")];
        assert_eq!(find_header(&headers, "Date"), None);
    }

    #[test]
    fn test_extract_body_no_payload() {
        assert_eq!(extract_body(None), "");
    }

    #[test]
    fn test_extract_body_root_inline_data() {
        // "Hello World" in standard base64, as the provider returns it
        let payload = inline_part("text/plain", "SGVsbG8gV29ybGQ=");
        assert_eq!(extract_body(Some(&payload)), "Hello World");
    }

    #[test]
    fn test_extract_body_root_data_ignores_children() {
        let mut payload = inline_part("text/plain", "cm9vdA==");
        payload.parts = vec![inline_part("text/plain", "Y2hpbGQ=")];
        assert_eq!(extract_body(Some(&payload)), "root");
    }

    #[test]
    fn test_extract_body_first_plain_text_part() {
        let payload = MessagePart {
            mime_type: Some("multipart/alternative".to_string()),
            parts: vec![
                inline_part("text/html", "PGI+aGk8L2I+"),
                inline_part("text/plain", "aGVsbG8="),
                inline_part("text/plain", "aWdub3JlZA=="),
            ],
            ..Default::default()
        };
        assert_eq!(extract_body(Some(&payload)), "hello");
    }

    #[test]
    fn test_extract_body_html_only_yields_sentinel() {
        let payload = MessagePart {
            mime_type: Some("multipart/alternative".to_string()),
            parts: vec![inline_part("text/html", "PGI+aGk8L2I+")],
            ..Default::default()
        };
        assert_eq!(extract_body(Some(&payload)), BODY_UNAVAILABLE);
    }

    #[test]
    fn test_extract_body_no_recursion_into_nested_multipart() {
        // text/plain one level down is out of reach of the shallow scan
        let nested = MessagePart {
            mime_type: Some("multipart/alternative".to_string()),
            parts: vec![inline_part("text/plain", "aGlkZGVu")],
            ..Default::default()
        };
        let payload = MessagePart {
            mime_type: Some("multipart/mixed".to_string()),
            parts: vec![nested],
            ..Default::default()
        };
        assert_eq!(extract_body(Some(&payload)), BODY_UNAVAILABLE);
    }

    #[test]
    fn test_extract_body_invalid_data_yields_sentinel() {
        let payload = inline_part("text/plain", "!!! not base64 !!!");
        assert_eq!(extract_body(Some(&payload)), BODY_UNAVAILABLE);
    }

    #[test]
    fn test_decode_body_data_url_safe_fallback() {
        // base64url with '-' and '_', no padding
        let encoded = URL_SAFE_NO_PAD.encode("subject?>title".as_bytes());
        assert_eq!(decode_body_data(&encoded).unwrap(), "subject?>title");
    }

    #[test]
    fn test_parse_message_missing_headers_yield_empty_fields() {
        let message = Message {
            id: "m1".to_string(),
            thread_id: None,
            label_ids: vec![],
            snippet: None,
            payload: Some(MessagePart {
                headers: vec![header("From", "a@x.com"), header("Subject", "Hi")],
                ..Default::default()
            }),
            internal_date: None,
        };

        let email = parse_message(&message, false);
        assert_eq!(email.from, "a@x.com");
        assert_eq!(email.subject, "Hi");
        assert_eq!(email.to, "");
        assert_eq!(email.date, "");
        assert_eq!(email.body, "");
        assert!(email.labels.is_empty());
    }

    #[test]
    fn test_parse_message_without_body_skips_extraction() {
        let message = Message {
            id: "m1".to_string(),
            thread_id: Some("t1".to_string()),
            label_ids: vec!["INBOX".to_string()],
            snippet: Some("preview".to_string()),
            payload: Some(inline_part("text/plain", "Ym9keQ==")),
            internal_date: None,
        };

        let email = parse_message(&message, false);
        assert_eq!(email.body, "");

        let email = parse_message(&message, true);
        assert_eq!(email.body, "body");
        assert_eq!(email.labels, vec!["INBOX".to_string()]);
    }

    #[test]
    fn test_build_raw_email_plain() {
        let email = OutgoingEmail {
            to: "test@example.com".to_string(),
            subject: "Test Subject".to_string(),
            body: "Test body".to_string(),
            cc: None,
            bcc: None,
            html: false,
        };

        let raw = build_raw_email(&email);
        assert_eq!(
            raw,
            "To: test@example.com\nSubject: Test Subject\nContent-Type: text/plain; charset=utf-8\n\nTest body"
        );
    }

    #[test]
    fn test_build_raw_email_with_cc_bcc_html() {
        let email = OutgoingEmail {
            to: "to@example.com".to_string(),
            subject: "Hello".to_string(),
            body: "<b>hi</b>".to_string(),
            cc: Some("cc@example.com".to_string()),
            bcc: Some("bcc@example.com".to_string()),
            html: true,
        };

        let raw = build_raw_email(&email);
        assert!(raw.contains("Cc: cc@example.com"));
        assert!(raw.contains("Bcc: bcc@example.com"));
        assert!(raw.contains("Content-Type: text/html; charset=utf-8"));
    }

    #[test]
    fn test_encode_raw_message_round_trip() {
        let email = OutgoingEmail {
            to: "to@example.com".to_string(),
            subject: "Round trip ???>>>".to_string(),
            body: "body with unicode: héllo\nand a second line".to_string(),
            cc: None,
            bcc: None,
            html: false,
        };

        let raw = build_raw_email(&email);
        let encoded = encode_raw_message(&raw);
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));
        assert!(!encoded.contains('='));

        let decoded = String::from_utf8(URL_SAFE_NO_PAD.decode(&encoded).unwrap()).unwrap();
        assert_eq!(decoded, raw);
    }
}
