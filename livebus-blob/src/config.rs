use livebus_core::ConfigSnapshot;

/// Limits applied to a batch of images before anything is uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRules {
    /// Largest accepted file, in bytes.
    pub max_file_bytes: u64,

    /// Accepted media types, lowercase.
    pub allowed_types: Vec<String>,

    /// Most files accepted in one batch.
    pub max_files: usize,
}

impl Default for UploadRules {
    fn default() -> Self {
        Self {
            max_file_bytes: 5 * 1024 * 1024, // 5MB
            allowed_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/gif".to_string(),
                "image/webp".to_string(),
            ],
            max_files: 10,
        }
    }
}

impl UploadRules {
    /// Create new rules with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `upload.max_file_bytes`, `upload.max_files` and
    /// `upload.allowed_types`, keeping defaults for missing keys.
    pub fn from_config(config: &ConfigSnapshot) -> Self {
        let defaults = Self::default();
        Self {
            max_file_bytes: config
                .get_u64("upload.max_file_bytes")
                .unwrap_or(defaults.max_file_bytes),
            allowed_types: config
                .get_list("upload.allowed_types")
                .filter(|types| !types.is_empty())
                .map(|types| types.into_iter().map(|t| t.to_lowercase()).collect())
                .unwrap_or(defaults.allowed_types),
            max_files: config.get_usize("upload.max_files").unwrap_or(defaults.max_files),
        }
    }

    pub fn with_max_file_bytes(mut self, bytes: u64) -> Self {
        self.max_file_bytes = bytes;
        self
    }

    pub fn with_max_files(mut self, max: usize) -> Self {
        self.max_files = max;
        self
    }

    pub fn with_allowed_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_types = types.into_iter().map(|t| t.into().to_lowercase()).collect();
        self
    }

    /// Match on the essence of the media type (`image/png; q=1` → `image/png`).
    pub fn allows_type(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        self.allowed_types.iter().any(|allowed| *allowed == essence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livebus_core::PlannerConfig;

    #[test]
    fn defaults_match_form_limits() {
        let rules = UploadRules::default();
        assert_eq!(rules.max_file_bytes, 5_242_880);
        assert_eq!(rules.max_files, 10);
        assert!(rules.allows_type("image/webp"));
        assert!(rules.allows_type("IMAGE/JPEG; charset=binary"));
        assert!(!rules.allows_type("text/plain"));
    }

    #[test]
    fn config_overrides_defaults() {
        let mut config = PlannerConfig::new();
        config.set("upload.max_files", "3");
        config.set("upload.allowed_types", "image/png");

        let rules = UploadRules::from_config(&config.snapshot());
        assert_eq!(rules.max_files, 3);
        assert_eq!(rules.max_file_bytes, 5 * 1024 * 1024);
        assert!(!rules.allows_type("image/jpeg"));
    }
}
