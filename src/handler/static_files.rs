//! Static file serving module
//!
//! Resolves a request path under the document root and serves a file, a
//! directory's `index.html`, or a generated listing.

use crate::handler::error::ServeError;
use crate::handler::listing;
use crate::handler::path::RequestPath;
use crate::handler::router::RequestContext;
use crate::http::{self, cache, mime};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::fs::Metadata;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncReadExt;

/// File served in place of a listing
const INDEX_FILE: &str = "index.html";

/// Serve the request path from `root`
///
/// `root` must be canonical; resolved locations are compared against it.
pub async fn serve(
    ctx: &RequestContext<'_>,
    root: &Path,
) -> Result<Response<Full<Bytes>>, ServeError> {
    let request_path = RequestPath::parse(ctx.path)?;
    let candidate = request_path.to_fs_path(root);

    let metadata = fs::metadata(&candidate)
        .await
        .map_err(|_| ServeError::NotFound(ctx.path.to_string()))?;
    ensure_within_root(ctx.path, &candidate, root).await?;

    if metadata.is_dir() {
        return serve_directory(ctx, &request_path, &candidate, root).await;
    }

    // "/index.html/" names a directory that isn't one
    if request_path.has_trailing_slash() || !metadata.is_file() {
        return Err(ServeError::NotFound(ctx.path.to_string()));
    }

    serve_file(ctx, &candidate, &metadata).await
}

/// Serve a directory: redirect to the slashed URL, then index file or listing
async fn serve_directory(
    ctx: &RequestContext<'_>,
    request_path: &RequestPath,
    dir: &Path,
    root: &Path,
) -> Result<Response<Full<Bytes>>, ServeError> {
    if !request_path.has_trailing_slash() {
        // built from the normalized path: a raw "//host" would leave the site
        let location = match ctx.query {
            Some(query) => format!("{}?{query}", request_path.url_dir()),
            None => request_path.url_dir(),
        };
        return Ok(http::build_redirect_response(&location));
    }

    let index_path = dir.join(INDEX_FILE);
    if let Ok(index_metadata) = fs::metadata(&index_path).await {
        if index_metadata.is_file() {
            ensure_within_root(ctx.path, &index_path, root).await?;
            return serve_file(ctx, &index_path, &index_metadata).await;
        }
    }

    let entries = listing::read_entries(dir).await?;
    let html = listing::render(&request_path.display_dir(), &entries);
    Ok(http::build_html_response(html))
}

/// Serve a regular file with `Last-Modified` and conditional GET support
async fn serve_file(
    ctx: &RequestContext<'_>,
    file_path: &Path,
    metadata: &Metadata,
) -> Result<Response<Full<Bytes>>, ServeError> {
    let last_modified = metadata.modified().ok().map(cache::format_http_date);

    if let Ok(modified) = metadata.modified() {
        if cache::check_not_modified(ctx.if_modified_since.as_deref(), modified) {
            if let Some(last_modified) = &last_modified {
                return Ok(http::build_304_response(last_modified));
            }
        }
    }

    // Failing to open is "not accessible"; failing mid-read is internal
    let mut file = fs::File::open(file_path)
        .await
        .map_err(|_| ServeError::NotFound(ctx.path.to_string()))?;
    let capacity = usize::try_from(metadata.len()).unwrap_or(0);
    let mut content = Vec::with_capacity(capacity);
    file.read_to_end(&mut content).await?;

    Ok(http::build_file_response(
        Bytes::from(content),
        mime::content_type_for(file_path),
        last_modified.as_deref(),
    ))
}

/// Reject locations whose real path (after symlinks) leaves the root
///
/// Answered as not found so nothing about the outside target is revealed.
async fn ensure_within_root(
    request: &str,
    location: &Path,
    root: &Path,
) -> Result<(), ServeError> {
    let canonical = fs::canonicalize(location)
        .await
        .map_err(|_| ServeError::NotFound(request.to_string()))?;

    if canonical.starts_with(root) {
        Ok(())
    } else {
        logger::log_warning(&format!(
            "Symlink escape blocked: {request} -> {}",
            canonical.display()
        ));
        Err(ServeError::NotFound(request.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::{Method, StatusCode};
    use http_body_util::BodyExt;
    use std::fs as std_fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn site() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        std_fs::write(dir.path().join("index.html"), "Hello").unwrap();
        std_fs::create_dir(dir.path().join("core")).unwrap();
        std_fs::write(dir.path().join("core/sign-in.html"), "Sign in").unwrap();
        let root = dir.path().canonicalize().unwrap();
        (dir, root)
    }

    fn get(path: &str) -> RequestContext<'_> {
        RequestContext::new(Method::GET, path)
    }

    async fn body(response: Response<Full<Bytes>>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_serves_file_bytes() {
        let (_dir, root) = site();
        let response = serve(&get("/core/sign-in.html"), &root).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["Content-Type"], "text/html; charset=utf-8");
        assert_eq!(response.headers()["Content-Length"], "7");
        assert!(response.headers().contains_key("Last-Modified"));
        assert_eq!(body(response).await, "Sign in");
    }

    #[tokio::test]
    async fn test_binary_file_exact_bytes() {
        let (_dir, root) = site();
        let data: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        std_fs::write(root.join("blob.bin"), &data).unwrap();

        let response = serve(&get("/blob.bin"), &root).await.unwrap();
        assert_eq!(response.headers()["Content-Type"], "application/octet-stream");
        assert_eq!(response.headers()["Content-Length"], "4096");
        assert_eq!(body(response).await.as_ref(), data.as_slice());
    }

    #[tokio::test]
    async fn test_directory_index() {
        let (_dir, root) = site();
        let response = serve(&get("/"), &root).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(response).await, "Hello");
    }

    #[tokio::test]
    async fn test_directory_listing() {
        let (_dir, root) = site();
        std_fs::remove_file(root.join("index.html")).unwrap();
        std_fs::write(root.join("app.js"), "x").unwrap();

        let response = serve(&get("/"), &root).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = String::from_utf8(body(response).await.to_vec()).unwrap();
        assert!(html.contains("<a href=\"core/\">core/</a>"));
        assert!(html.contains("<a href=\"app.js\">app.js</a>"));
        assert_eq!(html.matches("<a href=").count(), 2);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_index_lookup_is_case_sensitive() {
        let (_dir, root) = site();
        std_fs::write(root.join("core/INDEX.HTML"), "upper").unwrap();

        let response = serve(&get("/core/"), &root).await.unwrap();
        let html = String::from_utf8(body(response).await.to_vec()).unwrap();
        assert!(html.contains("Directory listing for /core/"));
        assert!(html.contains("INDEX.HTML"));
    }

    #[tokio::test]
    async fn test_directory_redirect_keeps_query() {
        let (_dir, root) = site();
        let response = serve(&get("/core"), &root).await.unwrap();
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()["Location"], "/core/");

        let mut ctx = get("/core");
        ctx.query = Some("tab=1");
        let response = serve(&ctx, &root).await.unwrap();
        assert_eq!(response.headers()["Location"], "/core/?tab=1");
    }

    #[tokio::test]
    async fn test_directory_redirect_stays_on_site() {
        let (_dir, root) = site();
        for raw in ["//core", "///core", "/./core", "/core/../core"] {
            let response = serve(&get(raw), &root).await.unwrap();
            assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY, "{raw}");
            assert_eq!(response.headers()["Location"], "/core/", "{raw}");
        }
    }

    #[tokio::test]
    async fn test_missing_and_trailing_slash_file() {
        let (_dir, root) = site();
        assert!(matches!(
            serve(&get("/missing.html"), &root).await,
            Err(ServeError::NotFound(_))
        ));
        assert!(matches!(
            serve(&get("/index.html/"), &root).await,
            Err(ServeError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let (_dir, root) = site();
        assert!(matches!(
            serve(&get("/../../etc/passwd"), &root).await,
            Err(ServeError::PathTraversal(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escape_blocked() {
        let (_dir, root) = site();
        let outside = TempDir::new().unwrap();
        std_fs::write(outside.path().join("secret.txt"), "secret").unwrap();
        std::os::unix::fs::symlink(outside.path().join("secret.txt"), root.join("leak.txt"))
            .unwrap();
        std::os::unix::fs::symlink(root.join("core"), root.join("alias")).unwrap();

        assert!(matches!(
            serve(&get("/leak.txt"), &root).await,
            Err(ServeError::NotFound(_))
        ));
        // links that stay inside the root are followed
        let response = serve(&get("/alias/sign-in.html"), &root).await.unwrap();
        assert_eq!(body(response).await, "Sign in");
    }

    #[tokio::test]
    async fn test_if_modified_since() {
        let (_dir, root) = site();
        let first = serve(&get("/index.html"), &root).await.unwrap();
        let last_modified = first.headers()["Last-Modified"].to_str().unwrap().to_string();

        let mut ctx = get("/index.html");
        ctx.if_modified_since = Some(last_modified.clone());
        let response = serve(&ctx, &root).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(response.headers()["Last-Modified"], last_modified.as_str());
        assert!(body(response).await.is_empty());

        ctx.if_modified_since = Some("Thu, 01 Jan 1970 00:00:00 GMT".to_string());
        let response = serve(&ctx, &root).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
