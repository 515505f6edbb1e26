//! Request path resolution
//!
//! Decodes and normalizes the URL path purely lexically, so traversal is
//! refused before the filesystem is touched.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::path::{Component, Path, PathBuf};

use super::error::ServeError;

/// Characters left unescaped in generated URLs: RFC 3986 unreserved plus `/`
pub const URL_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// A decoded, normalized request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPath {
    segments: Vec<String>,
    trailing_slash: bool,
}

impl RequestPath {
    /// Decode and normalize a raw URL path (query string already removed)
    ///
    /// `.` and empty segments are dropped and `..` pops its parent. A `..`
    /// at the top, or a segment that is not a plain file name, is a traversal.
    pub fn parse(raw: &str) -> Result<Self, ServeError> {
        let decoded = percent_decode_str(raw)
            .decode_utf8()
            .map_err(|_| ServeError::BadRequest(raw.to_string()))?;

        if decoded.contains('\0') {
            return Err(ServeError::BadRequest(raw.to_string()));
        }

        let mut segments: Vec<String> = Vec::new();
        let mut last = "";
        for segment in decoded.split('/') {
            last = segment;
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(ServeError::PathTraversal(raw.to_string()));
                    }
                }
                name => {
                    if !is_plain_name(name) {
                        return Err(ServeError::PathTraversal(raw.to_string()));
                    }
                    segments.push(name.to_string());
                }
            }
        }

        Ok(Self {
            segments,
            trailing_slash: matches!(last, "" | "." | ".."),
        })
    }

    /// Location of this path under `root`
    pub fn to_fs_path(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        path.extend(&self.segments);
        path
    }

    /// Whether the request asked for a directory (`/core/` rather than `/core`)
    pub const fn has_trailing_slash(&self) -> bool {
        self.trailing_slash
    }

    /// Decoded path as shown to users, e.g. `/core/`
    pub fn display_dir(&self) -> String {
        if self.segments.is_empty() {
            "/".to_string()
        } else {
            format!("/{}/", self.segments.join("/"))
        }
    }

    /// Normalized, re-encoded URL of this path as a directory
    ///
    /// Always starts with exactly one `/`, so it is never protocol-relative.
    pub fn url_dir(&self) -> String {
        utf8_percent_encode(&self.display_dir(), URL_ENCODE_SET).to_string()
    }
}

/// A segment must be exactly one normal path component
fn is_plain_name(segment: &str) -> bool {
    if segment.contains('\\') {
        return false;
    }
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(raw: &str) -> Vec<String> {
        RequestPath::parse(raw).unwrap().segments
    }

    #[test]
    fn test_simple_paths() {
        assert!(segments("/").is_empty());
        assert_eq!(segments("/index.html"), vec!["index.html"]);
        assert_eq!(segments("/core/sign-in.html"), vec!["core", "sign-in.html"]);
        assert_eq!(segments("//core///x"), vec!["core", "x"]);
    }

    #[test]
    fn test_percent_decoding() {
        assert_eq!(segments("/my%20file.txt"), vec!["my file.txt"]);
        assert_eq!(segments("/a+b"), vec!["a+b"]);
        assert_eq!(segments("/caf%C3%A9"), vec!["café"]);
        assert_eq!(segments("/core%2Fsign-in.html"), vec!["core", "sign-in.html"]);
    }

    #[test]
    fn test_dot_segments_collapse() {
        assert_eq!(segments("/core/./sign-in.html"), vec!["core", "sign-in.html"]);
        assert_eq!(segments("/core/../index.html"), vec!["index.html"]);
        assert!(segments("/core/..").is_empty());
    }

    #[test]
    fn test_traversal_rejected() {
        for raw in [
            "/..",
            "/../../etc/passwd",
            "/core/../../etc/passwd",
            "/%2e%2e/etc/passwd",
            "/..%2Fetc%2Fpasswd",
            "/a\\..\\..\\b",
        ] {
            assert!(
                matches!(RequestPath::parse(raw), Err(ServeError::PathTraversal(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_malformed_rejected() {
        assert!(matches!(
            RequestPath::parse("/%FF%FE"),
            Err(ServeError::BadRequest(_))
        ));
        assert!(matches!(
            RequestPath::parse("/a%00b"),
            Err(ServeError::BadRequest(_))
        ));
    }

    #[test]
    fn test_trailing_slash() {
        assert!(RequestPath::parse("/").unwrap().has_trailing_slash());
        assert!(RequestPath::parse("/core/").unwrap().has_trailing_slash());
        assert!(RequestPath::parse("/core/.").unwrap().has_trailing_slash());
        assert!(!RequestPath::parse("/core").unwrap().has_trailing_slash());
    }

    #[test]
    fn test_fs_path_and_display() {
        let path = RequestPath::parse("/core/sub/").unwrap();
        assert_eq!(
            path.to_fs_path(Path::new("/srv/www")),
            PathBuf::from("/srv/www/core/sub")
        );
        assert_eq!(path.display_dir(), "/core/sub/");
        assert_eq!(RequestPath::parse("/").unwrap().display_dir(), "/");
    }

    #[test]
    fn test_url_dir_is_normalized() {
        let url_dir = |raw: &str| RequestPath::parse(raw).unwrap().url_dir();
        assert_eq!(url_dir("/core"), "/core/");
        assert_eq!(url_dir("//core"), "/core/");
        assert_eq!(url_dir("///evil.example//x"), "/evil.example/x/");
        assert_eq!(url_dir("/a/../core"), "/core/");
        assert_eq!(url_dir("/my%20dir"), "/my%20dir/");
        assert_eq!(url_dir("/caf%C3%A9%3F"), "/caf%C3%A9%3F/");
        assert_eq!(url_dir("/"), "/");
    }
}
