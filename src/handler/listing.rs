//! Directory listing module
//!
//! Generates the HTML page served for directories without an `index.html`.

use percent_encoding::utf8_percent_encode;
use std::fmt::Write;
use std::path::Path;
use tokio::fs;

use super::error::ServeError;
use super::path::URL_ENCODE_SET;

/// One immediate child of the listed directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    pub is_dir: bool,
    pub is_symlink: bool,
}

impl ListingEntry {
    fn href(&self) -> String {
        let href = utf8_percent_encode(&self.name, URL_ENCODE_SET).to_string();
        if self.is_dir {
            href + "/"
        } else {
            href
        }
    }

    fn label(&self) -> String {
        if self.is_symlink {
            format!("{}@", self.name)
        } else if self.is_dir {
            format!("{}/", self.name)
        } else {
            self.name.clone()
        }
    }
}

/// Read the immediate children of `dir`, sorted case-insensitively
///
/// An unreadable directory is reported as not found.
pub async fn read_entries(dir: &Path) -> Result<Vec<ListingEntry>, ServeError> {
    let mut read_dir = fs::read_dir(dir)
        .await
        .map_err(|_| ServeError::NotFound(dir.display().to_string()))?;

    let mut entries = Vec::new();
    while let Some(entry) = read_dir.next_entry().await? {
        // non-UTF-8 names cannot be requested, so they are not linked
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        let is_symlink = entry
            .file_type()
            .await
            .is_ok_and(|t| t.is_symlink());
        // follows symlinks, so a link to a directory lists as one
        let is_dir = fs::metadata(entry.path())
            .await
            .is_ok_and(|m| m.is_dir());

        entries.push(ListingEntry {
            name,
            is_dir,
            is_symlink,
        });
    }

    entries.sort_by_cached_key(|e| e.name.to_lowercase());
    Ok(entries)
}

/// Render the listing page for `display_path` (e.g. `/core/`)
pub fn render(display_path: &str, entries: &[ListingEntry]) -> String {
    let title = format!("Directory listing for {}", escape_html(display_path));

    let mut html = String::with_capacity(256 + entries.len() * 64);
    html.push_str("<!DOCTYPE HTML>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>{title}</title>");
    html.push_str("</head>\n<body>\n");
    let _ = writeln!(html, "<h1>{title}</h1>");
    html.push_str("<hr>\n<ul>\n");
    for entry in entries {
        let _ = writeln!(
            html,
            "<li><a href=\"{}\">{}</a></li>",
            escape_html(&entry.href()),
            escape_html(&entry.label())
        );
    }
    html.push_str("</ul>\n<hr>\n</body>\n</html>\n");
    html
}

/// Escape text for HTML content and double-quoted attributes
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(name: &str, is_dir: bool) -> ListingEntry {
        ListingEntry {
            name: name.to_string(),
            is_dir,
            is_symlink: false,
        }
    }

    #[test]
    fn test_render_links() {
        let html = render(
            "/",
            &[entry("core", true), entry("index.html", false)],
        );
        assert!(html.contains("<title>Directory listing for /</title>"));
        assert!(html.contains("<li><a href=\"core/\">core/</a></li>"));
        assert!(html.contains("<li><a href=\"index.html\">index.html</a></li>"));
        assert_eq!(html.matches("<a href=").count(), 2);
    }

    #[test]
    fn test_render_escapes_names() {
        let html = render(
            "/a&b/",
            &[entry("my file.txt", false), entry("<script>.js", false)],
        );
        assert!(html.contains("Directory listing for /a&amp;b/"));
        assert!(html.contains("<a href=\"my%20file.txt\">my file.txt</a>"));
        assert!(html.contains("<a href=\"%3Cscript%3E.js\">&lt;script&gt;.js</a>"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_symlink_label() {
        let link = ListingEntry {
            name: "latest".to_string(),
            is_dir: true,
            is_symlink: true,
        };
        let html = render("/", &[link]);
        assert!(html.contains("<a href=\"latest/\">latest@</a>"));
    }

    #[tokio::test]
    async fn test_read_entries_sorted() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("A.txt"), "a").unwrap();
        std::fs::create_dir(dir.path().join("core")).unwrap();

        let entries = read_entries(dir.path()).await.unwrap();
        assert_eq!(
            entries,
            vec![entry("A.txt", false), entry("b.txt", false), entry("core", true)]
        );
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_read_entries_skips_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("ok.txt"), "ok").unwrap();
        std::fs::write(dir.path().join(OsStr::from_bytes(b"bad\xFF.txt")), "x").unwrap();

        let entries = read_entries(dir.path()).await.unwrap();
        assert_eq!(entries, vec![entry("ok.txt", false)]);
    }

    #[tokio::test]
    async fn test_read_entries_missing_dir() {
        let dir = TempDir::new().unwrap();
        let result = read_entries(&dir.path().join("nope")).await;
        assert!(matches!(result, Err(ServeError::NotFound(_))));
    }
}
