//! URL predicates and Wayback URL builders

/// Returns true if `url` begins with `http://` or `https://`.
pub fn is_valid_web_url(url: Option<&str>) -> bool {
    match url {
        Some(url) => url.starts_with("http://") || url.starts_with("https://"),
        None => false,
    }
}

/// Prepends `https://` unless the string already carries an http(s) scheme.
pub fn normalize_url(url: &str) -> String {
    if is_valid_web_url(Some(url)) {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// Snapshot address for a capture: `{base}/web/{timestamp}/{original}`
pub fn archive_url(wayback_base: &str, timestamp: &str, original_url: &str) -> String {
    format!(
        "{}/web/{}/{}",
        wayback_base.trim_end_matches('/'),
        timestamp,
        original_url
    )
}

/// Pre-baked Wayback views of a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaybackView {
    Oldest,
    Newest,
    Overview,
}

impl WaybackView {
    pub fn path(&self) -> &'static str {
        match self {
            WaybackView::Oldest => "/web/0/",
            WaybackView::Newest => "/web/2/",
            WaybackView::Overview => "/web/*/",
        }
    }
}

pub fn wayback_view_url(wayback_base: &str, view: WaybackView, url: &str) -> String {
    format!("{}{}{}", wayback_base.trim_end_matches('/'), view.path(), url)
}

/// Percent-encodes whitespace and newlines, leaving every other character alone.
///
/// URLs typed by a user often carry stray spaces; the rest of the string is
/// passed through so already-encoded sequences survive untouched.
pub fn encode_whitespace(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for c in url.chars() {
        if c.is_whitespace() {
            let mut buf = [0u8; 4];
            out.push_str(&urlencoding::encode(c.encode_utf8(&mut buf)));
        } else {
            out.push(c);
        }
    }
    out
}
