//! Folder identifiers
//!
//! A folder is addressed by an opaque token: the mailbox path segments,
//! each percent-encoded so none can contain the separator, joined with `/`
//! and encoded as URL-safe base64 without padding. Decoding gives the
//! segments back; the server delimiter is applied only when talking to the
//! remote store.
//!
//! The empty path (`[]` or `[""]`) has no token: it encodes to the empty
//! string, which decodes to `DecodeError::Empty`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between path segments inside a token
pub const SEGMENT_SEPARATOR: &str = "/";

/// Second segment of a synthetic "all flagged messages" view
pub const FLAGGED_MARKER: &str = "FLAGGED";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Empty folder identifier")]
    Empty,

    #[error("Folder identifier is not valid base64: {0}")]
    Base64(String),

    #[error("Folder identifier is not valid UTF-8")]
    Utf8,
}

/// Transport-safe folder identity
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderId(String);

impl FolderId {
    /// Encode an ordered list of mailbox name segments
    pub fn encode<S: AsRef<str>>(segments: &[S]) -> Self {
        let joined = segments
            .iter()
            .map(|segment| urlencoding::encode(segment.as_ref()))
            .collect::<Vec<_>>()
            .join(SEGMENT_SEPARATOR);
        FolderId(URL_SAFE_NO_PAD.encode(joined.as_bytes()))
    }

    /// Wrap a caller-submitted token; nothing is checked until decode
    pub fn from_token(token: impl Into<String>) -> Self {
        FolderId(token.into())
    }

    /// Identifier of a remote mailbox path
    pub fn for_mailbox(path: &str, delimiter: &str) -> Self {
        Self::encode(&split_path(path, delimiter))
    }

    /// Identifier of the synthetic flagged-messages view of a mailbox.
    ///
    /// The whole mailbox path stays in the first segment so the marker
    /// always lands second.
    pub fn flagged_view(path: &str) -> Self {
        Self::encode(&[path, FLAGGED_MARKER])
    }

    pub fn token(&self) -> &str {
        &self.0
    }

    /// Decode the token back into path segments
    pub fn segments(&self) -> Result<Vec<String>, DecodeError> {
        decode(&self.0)
    }

    /// Remote mailbox path for a server using `delimiter`
    pub fn mailbox_path(&self, delimiter: &str) -> Result<String, DecodeError> {
        Ok(self.segments()?.join(delimiter))
    }

    pub fn is_virtual(&self) -> bool {
        self.segments()
            .map(|segments| is_virtual_marker(&segments))
            .unwrap_or(false)
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.segments() {
            Ok(segments) => write!(f, "FolderId({:?})", segments.join("/")),
            Err(_) => write!(f, "FolderId(<invalid {:?}>)", self.0),
        }
    }
}

/// Decode a token into path segments
pub fn decode(token: &str) -> Result<Vec<String>, DecodeError> {
    if token.is_empty() {
        return Err(DecodeError::Empty);
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|e| DecodeError::Base64(e.to_string()))?;
    let joined = String::from_utf8(bytes).map_err(|_| DecodeError::Utf8)?;

    joined
        .split(SEGMENT_SEPARATOR)
        .map(|segment| {
            urlencoding::decode(segment)
                .map(|decoded| decoded.into_owned())
                .map_err(|_| DecodeError::Utf8)
        })
        .collect()
}

/// True when the path names a synthetic view rather than a real mailbox
pub fn is_virtual_marker<S: AsRef<str>>(segments: &[S]) -> bool {
    segments.len() >= 2 && segments[1].as_ref() == FLAGGED_MARKER
}

fn split_path<'a>(path: &'a str, delimiter: &str) -> Vec<&'a str> {
    if delimiter.is_empty() {
        vec![path]
    } else {
        path.split(delimiter).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let paths: Vec<Vec<&str>> = vec![
            vec!["INBOX"],
            vec!["INBOX", "Work", "Reports 2024"],
            vec!["Gesendete Objekte"],
            vec!["日本語", "フォルダ"],
            vec!["a", "", "b"],
            vec!["Projects/2024", "50% off"],
        ];

        for path in paths {
            let id = FolderId::encode(&path);
            assert_eq!(id.segments().unwrap(), path);
        }
    }

    #[test]
    fn test_empty_path_has_no_token() {
        let id = FolderId::encode(&[""]);
        assert_eq!(id.token(), "");
        assert_eq!(id.segments(), Err(DecodeError::Empty));
        assert_eq!(FolderId::encode::<&str>(&[]), id);
    }

    #[test]
    fn test_separator_inside_segment_is_preserved() {
        let slashed = FolderId::for_mailbox("Projects/2024", ".");
        let dotted = FolderId::for_mailbox("Projects.2024", ".");

        assert_ne!(slashed, dotted);
        assert_eq!(slashed.segments().unwrap(), vec!["Projects/2024"]);
        assert_eq!(slashed.mailbox_path(".").unwrap(), "Projects/2024");
        assert_eq!(dotted.segments().unwrap(), vec!["Projects", "2024"]);

        let escaped = FolderId::encode(&["100%", "a%2Fb"]);
        assert_eq!(escaped.segments().unwrap(), vec!["100%", "a%2Fb"]);
    }

    #[test]
    fn test_flagged_view_of_slashed_path_keeps_two_segments() {
        let id = FolderId::flagged_view("Work/Clients");
        assert_eq!(id.segments().unwrap(), vec!["Work/Clients", "FLAGGED"]);
        assert!(id.is_virtual());
    }

    #[test]
    fn test_token_is_transport_safe() {
        let id = FolderId::encode(&["INBOX", "??>>~~", "ÿÿÿ"]);
        assert!(id
            .token()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_decode_rejects_malformed_tokens() {
        assert_eq!(decode(""), Err(DecodeError::Empty));
        assert!(matches!(decode("not base64!"), Err(DecodeError::Base64(_))));
        assert!(matches!(decode("SU5CT1g="), Err(DecodeError::Base64(_))));
        assert!(matches!(decode("a"), Err(DecodeError::Base64(_))));
        // 0xFF 0xFE
        assert_eq!(decode("__4"), Err(DecodeError::Utf8));
    }

    #[test]
    fn test_virtual_marker() {
        assert!(is_virtual_marker(&["INBOX", "FLAGGED"]));
        assert!(is_virtual_marker(&["INBOX", "FLAGGED", "deeper"]));
        assert!(!is_virtual_marker(&["FLAGGED"]));
        assert!(!is_virtual_marker(&["INBOX"]));
        assert!(!is_virtual_marker(&["INBOX", "flagged"]));
        assert!(!is_virtual_marker(&["FLAGGED", "INBOX"]));
        assert!(!is_virtual_marker::<&str>(&[]));
    }

    #[test]
    fn test_mailbox_ids_use_server_delimiter() {
        let id = FolderId::for_mailbox("INBOX.Work", ".");
        assert_eq!(id.segments().unwrap(), vec!["INBOX", "Work"]);
        assert_eq!(id.mailbox_path(".").unwrap(), "INBOX.Work");
        assert_eq!(id, FolderId::encode(&["INBOX", "Work"]));
    }

    #[test]
    fn test_flagged_view() {
        let id = FolderId::flagged_view("INBOX");
        assert!(id.is_virtual());
        assert_eq!(id.segments().unwrap(), vec!["INBOX", "FLAGGED"]);
        assert!(FolderId::flagged_view("INBOX.Work").is_virtual());
        assert!(!FolderId::for_mailbox("INBOX", "/").is_virtual());
        assert!(!FolderId::from_token("%%%").is_virtual());
    }

    #[test]
    fn test_serializes_as_token() {
        let id = FolderId::encode(&["INBOX"]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.token()));
        let back: FolderId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
