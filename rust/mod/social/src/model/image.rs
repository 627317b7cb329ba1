use serde::{Deserialize, Serialize};

/// An image already uploaded to the external hosting provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Public URL served to clients.
    pub url: String,

    /// Opaque provider id, needed to delete the image later.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub public_id: String,
}

impl ImageRef {
    pub fn new(url: impl Into<String>, public_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            public_id: public_id.into(),
        }
    }
}
