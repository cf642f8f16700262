//! Reference to an uploaded binary asset.

/// Handle returned by the gateway after an asset upload.
///
/// The name is assigned by the store and is unique; the URL, when present,
/// is where the bytes can be fetched from.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AssetRef {
    pub name: String,
    pub mime_type: Option<String>,
    pub url: Option<String>,
}

impl AssetRef {
    pub fn new(name: impl Into<String>) -> Self {
        AssetRef {
            name: name.into(),
            mime_type: None,
            url: None,
        }
    }

    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let asset = AssetRef::new("voice-1")
            .with_mime_type("audio/m4a")
            .with_url("memory://assets/voice-1");
        assert_eq!(asset.name, "voice-1");
        assert_eq!(asset.mime_type.as_deref(), Some("audio/m4a"));
        assert_eq!(asset.url.as_deref(), Some("memory://assets/voice-1"));
    }

    #[test]
    fn test_round_trip() {
        let asset = AssetRef::new("img").with_mime_type("image/png");
        let json = serde_json::to_value(&asset).unwrap();
        let back: AssetRef = serde_json::from_value(json).unwrap();
        assert_eq!(back, asset);
    }
}
