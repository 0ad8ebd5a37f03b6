//! Viewer assets compiled into the binary.
//!
//! Paths are relative to the `assets/` directory of this crate, without a
//! leading slash (`index.html`, `css/app.css`, ...).

/// A single embedded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Asset {
    /// Path relative to the asset root.
    pub path: &'static str,
    /// File contents.
    pub body: &'static str,
}

impl Asset {
    /// MIME type inferred from the file extension.
    pub fn content_type(&self) -> &'static str {
        content_type_for(self.path)
    }
}

static ASSETS: &[Asset] = &[
    Asset {
        path: "index.html",
        body: include_str!("../assets/index.html"),
    },
    Asset {
        path: "css/app.css",
        body: include_str!("../assets/css/app.css"),
    },
    Asset {
        path: "js/app.js",
        body: include_str!("../assets/js/app.js"),
    },
];

/// Find an embedded asset. An empty path resolves to `index.html`.
pub fn lookup(path: &str) -> Option<&'static Asset> {
    let path = path.trim_start_matches('/');
    let path = if path.is_empty() { "index.html" } else { path };
    ASSETS.iter().find(|asset| asset.path == path)
}

/// Guess a MIME type from a file name.
pub fn content_type_for(path: &str) -> &'static str {
    let extension = path.rsplit_once('.').map_or("", |(_, ext)| ext);
    match extension.to_ascii_lowercase().as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "ico" => "image/x-icon",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_resolves_to_index() {
        assert_eq!(lookup("").map(|a| a.path), Some("index.html"));
        assert_eq!(lookup("/").map(|a| a.path), Some("index.html"));
        assert_eq!(lookup("/js/app.js").map(|a| a.path), Some("js/app.js"));
    }

    #[test]
    fn unknown_paths_miss() {
        assert!(lookup("css/missing.css").is_none());
        assert!(lookup("../Cargo.toml").is_none());
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type_for("index.html"), "text/html; charset=utf-8");
        assert_eq!(content_type_for("css/app.CSS"), "text/css; charset=utf-8");
        assert_eq!(content_type_for("js/app.js"), "text/javascript; charset=utf-8");
        assert_eq!(content_type_for("blob"), "application/octet-stream");
    }
}
