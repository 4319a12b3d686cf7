//! HTML listing page.

use engine::{EntryDescriptor, ListingResult};
use html_escape::{encode_double_quoted_attribute, encode_text};
use url::Url;

/// Route prefix for directory pages.
pub const BROWSE_ROUTE: &str = "browse";
/// Route prefix for downloads.
pub const DOWNLOAD_ROUTE: &str = "download";
/// Route prefix for inline previews.
pub const VIEW_ROUTE: &str = "view";

const STYLE: &str = r#"
* { margin: 0; padding: 0; box-sizing: border-box; }
body { font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); min-height: 100vh; padding: 20px; }
.container { max-width: 1200px; margin: 0 auto; background: rgba(255, 255, 255, 0.95); border-radius: 20px; padding: 30px; box-shadow: 0 20px 40px rgba(0, 0, 0, 0.1); }
.header { text-align: center; margin-bottom: 30px; padding-bottom: 20px; border-bottom: 2px solid #e0e0e0; }
.header h1 { color: #333; font-size: 2.5rem; margin-bottom: 10px; }
.path-nav { background: #f8f9fa; padding: 15px 20px; border-radius: 10px; margin-bottom: 25px; font-family: 'Courier New', monospace; border-left: 4px solid #667eea; }
.back-button { display: inline-block; background: linear-gradient(45deg, #667eea, #764ba2); color: white; padding: 10px 20px; text-decoration: none; border-radius: 25px; margin-bottom: 20px; font-weight: 500; }
.file-grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(300px, 1fr)); gap: 20px; margin-top: 20px; }
.file-item { background: white; border-radius: 15px; padding: 20px; border: 1px solid #e0e0e0; }
.file-item:hover { border-color: #667eea; }
.file-icon { font-size: 2.5rem; margin-bottom: 10px; display: block; }
.file-name { font-weight: 600; color: #333; margin-bottom: 8px; word-break: break-word; font-size: 1.1rem; }
.file-details { color: #6c757d; font-size: 0.9rem; margin-bottom: 15px; }
.file-actions { display: flex; gap: 10px; }
.btn { padding: 8px 16px; border-radius: 20px; text-decoration: none; font-size: 0.9rem; font-weight: 500; }
.btn-primary { background: linear-gradient(45deg, #667eea, #764ba2); color: white; }
.btn-outline { color: #667eea; border: 2px solid #667eea; }
.empty-state { text-align: center; padding: 60px 20px; color: #6c757d; }
.empty-state .icon { font-size: 4rem; margin-bottom: 20px; opacity: 0.5; }
@media (max-width: 768px) { .file-grid { grid-template-columns: 1fr; } .container { padding: 20px; margin: 10px; } }
"#;

/// Render a directory listing as a complete HTML document.
pub fn render_listing(listing: &ListingResult) -> String {
    let title = encode_text(&listing.path);
    let mut html = String::with_capacity(4096 + listing.entries.len() * 512);

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"UTF-8\">\n");
    html.push_str(
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
    );
    html.push_str(&format!("<title>File server - {}</title>\n", title));
    html.push_str(&format!("<style>{}</style>\n", STYLE));
    html.push_str("</head>\n<body>\n<div class=\"container\">\n");

    html.push_str("<div class=\"header\">\n<h1>📁 File server</h1>\n");
    html.push_str("<p>Pick a file to download</p>\n</div>\n");
    html.push_str(&format!(
        "<div class=\"path-nav\"><strong>Current path:</strong> {}</div>\n",
        title
    ));

    if let Some(parent) = &listing.parent {
        html.push_str(&format!(
            "<a href=\"{}\" class=\"back-button\">⬅ Up</a>\n",
            encode_double_quoted_attribute(&link(BROWSE_ROUTE, parent))
        ));
    }

    if listing.entries.is_empty() {
        html.push_str("<div class=\"empty-state\">\n<div class=\"icon\">📂</div>\n");
        html.push_str("<h3>This folder is empty</h3>\n");
        html.push_str("<p>There are no files or subfolders here.</p>\n</div>\n");
    } else {
        html.push_str("<div class=\"file-grid\">\n");
        for entry in &listing.entries {
            render_entry(&mut html, entry);
        }
        html.push_str("</div>\n");
    }

    html.push_str("</div>\n</body>\n</html>\n");
    html
}

fn render_entry(html: &mut String, entry: &EntryDescriptor) {
    let name = encode_text(&entry.name);
    let modified = entry.modified_display();

    html.push_str("<div class=\"file-item\">\n");
    if entry.is_dir {
        html.push_str("<span class=\"file-icon\">📁</span>\n");
        html.push_str(&format!("<div class=\"file-name\">{}</div>\n", name));
        html.push_str(&format!(
            "<div class=\"file-details\">Folder • {}</div>\n",
            modified
        ));
        html.push_str(&format!(
            "<div class=\"file-actions\"><a href=\"{}\" class=\"btn btn-primary\">Open</a></div>\n",
            encode_double_quoted_attribute(&link(BROWSE_ROUTE, &entry.path))
        ));
    } else {
        let size = entry.size_display.as_deref().unwrap_or_default();
        html.push_str("<span class=\"file-icon\">📄</span>\n");
        html.push_str(&format!("<div class=\"file-name\">{}</div>\n", name));
        html.push_str(&format!(
            "<div class=\"file-details\">{} • {}</div>\n",
            size, modified
        ));
        html.push_str(&format!(
            "<div class=\"file-actions\"><a href=\"{}\" class=\"btn btn-primary\" download>Download</a> \
             <a href=\"{}\" class=\"btn btn-outline\" target=\"_blank\">Preview</a></div>\n",
            encode_double_quoted_attribute(&link(DOWNLOAD_ROUTE, &entry.path)),
            encode_double_quoted_attribute(&link(VIEW_ROUTE, &entry.path))
        ));
    }
    html.push_str("</div>\n");
}

/// Build a URL path under `route` for a request path, percent-encoding each
/// segment.
///
/// `link("browse", "/My Docs/a#1")` is `/browse/My%20Docs/a%231`.
pub fn link(route: &str, request_path: &str) -> String {
    let Ok(mut url) = Url::parse("http://localhost/") else {
        return format!("/{}{}", route, request_path);
    };

    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().push(route);
        segments.extend(request_path.split('/').filter(|s| !s.is_empty()));
    }

    url.path().to_string()
}
