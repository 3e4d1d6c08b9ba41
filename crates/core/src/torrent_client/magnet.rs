//! Magnet URI parsing.

/// The parts of a magnet URI this crate cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagnetLink {
    /// Content hash from `xt=urn:btih:` (lowercased).
    pub hash: String,
    /// Display name from `dn=`, percent-decoded.
    pub display_name: Option<String>,
}

impl MagnetLink {
    /// Parse a magnet URI. Returns `None` for anything without a btih hash.
    pub fn parse(uri: &str) -> Option<Self> {
        let query = uri.strip_prefix("magnet:?")?;

        let mut hash = None;
        let mut display_name = None;
        for param in query.split('&') {
            if let Some(value) = param.strip_prefix("xt=urn:btih:") {
                if !value.is_empty() {
                    hash = Some(value.to_lowercase());
                }
            } else if let Some(value) = param.strip_prefix("dn=") {
                let value = value.replace('+', " ");
                display_name = urlencoding::decode(&value)
                    .map(|decoded| decoded.into_owned())
                    .ok();
            }
        }

        hash.map(|hash| Self { hash, display_name })
    }
}
