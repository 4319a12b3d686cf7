//! Opening confined files for download and preview.
//!
//! Both operations take a [`ResolvedPath`], which can only come out of the
//! engine's resolver, so a file is never opened without passing the
//! confinement check first. The returned handle is owned by the response
//! body and closed when the body is dropped, including when the client
//! disconnects halfway through.

use std::time::SystemTime;

use chrono::{DateTime, Utc};
use engine::{EngineError, ResolvedPath};
use tokio::fs::{self, File};

/// Content type for downloads.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// How the browser should treat the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Save to disk.
    Attachment,
    /// Render in the browser.
    Inline,
}

/// An open file ready to be streamed.
#[derive(Debug)]
pub struct OpenedFile {
    /// File handle positioned at the start.
    pub file: File,
    /// Exact length in bytes, taken from the open handle.
    pub len: u64,
    /// Base name for the `Content-Disposition` header.
    pub file_name: String,
    /// Value for the `Content-Type` header.
    pub content_type: String,
    /// Last modified time, if the platform reports one.
    pub modified: Option<SystemTime>,
    /// How the body should be presented.
    pub disposition: Disposition,
}

impl OpenedFile {
    /// Value for the `Content-Disposition` header.
    pub fn content_disposition(&self) -> String {
        content_disposition(self.disposition, &self.file_name)
    }

    /// Value for the `Last-Modified` header, in IMF-fixdate form.
    pub fn last_modified(&self) -> Option<String> {
        self.modified.map(http_date)
    }
}

/// Format a time as an HTTP date, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// Opens files that have already been confined.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileAccessor;

impl FileAccessor {
    /// Create a new accessor.
    pub fn new() -> Self {
        Self
    }

    /// Open a file to be saved by the client.
    ///
    /// Fails with [`EngineError::NotFound`] or [`EngineError::IsDirectory`].
    pub async fn open_for_download(&self, target: &ResolvedPath) -> engine::Result<OpenedFile> {
        self.open(target, OCTET_STREAM.to_string(), Disposition::Attachment)
            .await
    }

    /// Open a file to be rendered inline, with a content type guessed from
    /// its extension.
    pub async fn open_for_preview(&self, target: &ResolvedPath) -> engine::Result<OpenedFile> {
        self.open(target, guess_content_type(target), Disposition::Inline)
            .await
    }

    async fn open(
        &self,
        target: &ResolvedPath,
        content_type: String,
        disposition: Disposition,
    ) -> engine::Result<OpenedFile> {
        let path = target.as_path();

        let metadata = fs::metadata(path)
            .await
            .map_err(|e| EngineError::from_io(e, path))?;
        if metadata.is_dir() {
            return Err(EngineError::IsDirectory(path.to_path_buf()));
        }

        let file = File::open(path)
            .await
            .map_err(|e| EngineError::from_io(e, path))?;

        // Length from the handle we stream, not the earlier stat.
        let opened = file
            .metadata()
            .await
            .map_err(|e| EngineError::from_io(e, path))?;

        Ok(OpenedFile {
            file,
            len: opened.len(),
            file_name: target.file_name().unwrap_or_else(|| "download".to_string()),
            content_type,
            modified: opened.modified().ok(),
            disposition,
        })
    }
}

fn guess_content_type(target: &ResolvedPath) -> String {
    let mime = mime_guess::from_path(target.as_path()).first_or_octet_stream();
    if mime.type_() == mime_guess::mime::TEXT && mime.get_param("charset").is_none() {
        format!("{}; charset=utf-8", mime.essence_str())
    } else {
        mime.to_string()
    }
}

/// Build a `Content-Disposition` value.
///
/// The quoted `filename` is an ASCII-only fallback; the exact name goes in
/// the RFC 5987 `filename*` parameter, percent-encoded outside the unreserved
/// set.
pub fn content_disposition(disposition: Disposition, file_name: &str) -> String {
    let kind = match disposition {
        Disposition::Attachment => "attachment",
        Disposition::Inline => "inline",
    };

    let fallback: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if fallback == file_name {
        format!("{}; filename=\"{}\"", kind, file_name)
    } else {
        format!(
            "{}; filename=\"{}\"; filename*=UTF-8''{}",
            kind,
            fallback,
            urlencoding::encode(file_name)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::{ConfinedRoot, PathResolver};
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    fn resolver_for(dir: &std::path::Path) -> PathResolver {
        PathResolver::new(ConfinedRoot::new(dir, "/"))
    }

    #[tokio::test]
    async fn test_open_for_download() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.txt"), vec![b'x'; 2048]).unwrap();

        let target = resolver_for(temp_dir.path()).resolve("/a.txt").unwrap();
        let mut opened = FileAccessor::new().open_for_download(&target).await.unwrap();

        assert_eq!(opened.len, 2048);
        assert_eq!(opened.file_name, "a.txt");
        assert_eq!(opened.content_type, OCTET_STREAM);
        assert_eq!(opened.disposition, Disposition::Attachment);
        assert_eq!(opened.content_disposition(), "attachment; filename=\"a.txt\"");

        let mut contents = Vec::new();
        opened.file.read_to_end(&mut contents).await.unwrap();
        assert_eq!(contents.len(), 2048);
    }

    #[tokio::test]
    async fn test_open_for_preview_guesses_type() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "hello").unwrap();
        std::fs::write(temp_dir.path().join("photo.png"), [0x89, b'P', b'N', b'G']).unwrap();

        let resolver = resolver_for(temp_dir.path());
        let accessor = FileAccessor::new();

        let text = accessor
            .open_for_preview(&resolver.resolve("/notes.txt").unwrap())
            .await
            .unwrap();
        assert_eq!(text.content_type, "text/plain; charset=utf-8");
        assert_eq!(text.disposition, Disposition::Inline);

        let image = accessor
            .open_for_preview(&resolver.resolve("/photo.png").unwrap())
            .await
            .unwrap();
        assert_eq!(image.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let temp_dir = TempDir::new().unwrap();

        let target = resolver_for(temp_dir.path()).resolve("/missing").unwrap();
        let result = FileAccessor::new().open_for_download(&target).await;
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_open_directory() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("sub")).unwrap();

        let resolver = resolver_for(temp_dir.path());
        let accessor = FileAccessor::new();

        let result = accessor
            .open_for_download(&resolver.resolve("/sub").unwrap())
            .await;
        assert!(matches!(result, Err(EngineError::IsDirectory(_))));

        let result = accessor
            .open_for_preview(&resolver.resolve("/").unwrap())
            .await;
        assert!(matches!(result, Err(EngineError::IsDirectory(_))));
    }

    #[test]
    fn test_http_date() {
        let time = UNIX_EPOCH + Duration::from_secs(784_111_777);
        assert_eq!(http_date(time), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[tokio::test]
    async fn test_last_modified_from_handle() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.txt"), "a").unwrap();

        let target = resolver_for(temp_dir.path()).resolve("/a.txt").unwrap();
        let opened = FileAccessor::new().open_for_preview(&target).await.unwrap();

        let value = opened.last_modified().unwrap();
        assert!(value.ends_with(" GMT"));
        assert_eq!(value.len(), "Sun, 06 Nov 1994 08:49:37 GMT".len());
    }

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition(Disposition::Inline, "report 2024.pdf"),
            "inline; filename=\"report 2024.pdf\""
        );
    }

    #[test]
    fn test_content_disposition_quotes_and_unicode() {
        assert_eq!(
            content_disposition(Disposition::Attachment, "say \"hi\".txt"),
            "attachment; filename=\"say _hi_.txt\"; filename*=UTF-8''say%20%22hi%22.txt"
        );
        assert_eq!(
            content_disposition(Disposition::Attachment, "파일.txt"),
            "attachment; filename=\"__.txt\"; filename*=UTF-8''%ED%8C%8C%EC%9D%BC.txt"
        );
        assert_eq!(
            content_disposition(Disposition::Inline, "résumé (1).pdf"),
            "inline; filename=\"r_sum_ (1).pdf\"; filename*=UTF-8''r%C3%A9sum%C3%A9%20%281%29.pdf"
        );
    }
}
