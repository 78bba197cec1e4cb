//! Hypermedia links attached to API responses.
//!
//! Relation names are part of the API contract:
//!
//! | action   | rels              |
//! |----------|-------------------|
//! | create   | `self`, `delete`  |
//! | list     | `self`            |
//! | delete   | `create`          |
//!
//! `self` is the image download URL, `delete` the `DELETE /qr-codes/{filename}`
//! endpoint and `create` the `POST /qr-codes/` endpoint.

use serde::{Deserialize, Serialize};

/// Relation: the resource itself (image download URL).
pub const REL_SELF: &str = "self";

/// Relation: endpoint that deletes the resource.
pub const REL_DELETE: &str = "delete";

/// Relation: endpoint that creates a resource.
pub const REL_CREATE: &str = "create";

/// Path of the QR code collection.
pub const QR_CODES_PATH: &str = "/qr-codes/";

/// A related action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

impl Link {
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            href: href.into(),
        }
    }

    /// Render as an RFC 8288 `Link` header value.
    pub fn to_header_value(&self) -> String {
        format!("<{}>; rel=\"{}\"", self.href, self.rel)
    }
}

/// Operation the links describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAction {
    Create,
    List,
    Delete,
}

/// Build the ordered links for `action` on `filename`.
pub fn build_links(
    action: LinkAction,
    filename: &str,
    base_url: &str,
    download_url: &str,
) -> Vec<Link> {
    let base_url = base_url.trim_end_matches('/');

    match action {
        LinkAction::Create => vec![
            Link::new(REL_SELF, download_url),
            Link::new(
                REL_DELETE,
                format!("{}{}{}", base_url, QR_CODES_PATH, filename),
            ),
        ],
        LinkAction::List => vec![Link::new(REL_SELF, download_url)],
        LinkAction::Delete => vec![Link::new(
            REL_CREATE,
            format!("{}{}", base_url, QR_CODES_PATH),
        )],
    }
}

/// Download URL of an image: `{base_url}/{download_folder}/{filename}`.
pub fn download_url(base_url: &str, download_folder: &str, filename: &str) -> String {
    format!(
        "{}/{}/{}",
        base_url.trim_end_matches('/'),
        download_folder.trim_matches('/'),
        filename
    )
}
