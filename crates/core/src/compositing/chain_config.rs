use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blurring::domain::gpu_backend::GpuBackend;
use crate::filtering::domain::filter_kind::FilterKind;
use crate::filtering::domain::filter_spec::FilterSpec;
use crate::shared::constants::DEFAULT_MAX_BLUR_RADIUS;

use super::filter_chain::{ChainError, FilterChain};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write config {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("filter '{0}' listed more than once")]
    DuplicateFilter(FilterKind),
    #[error("blur radius must be greater than 0")]
    InvalidRadius,
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Filter preset: the filters to enable and their intensities.
///
/// ```json
/// { "filters": [
///     { "kind": "grayscale", "intensity": 0.5 },
///     { "kind": "blur", "intensity": 1.0, "blur_radius": 6 }
/// ] }
/// ```
///
/// Listed filters are enabled; unlisted ones stay disabled. Intensities
/// outside [0, 1] are clamped on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
}

impl ChainConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&text)?;
        log::info!(
            "Loaded filter preset {} ({} filters)",
            path.display(),
            config.filters.len()
        );
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_json()?).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Snapshot of the enabled filters of `chain`.
    pub fn from_chain(chain: &FilterChain) -> Self {
        let filters = FilterKind::ALL
            .iter()
            .filter(|&&kind| chain.is_enabled(kind))
            .map(|&kind| chain.spec(kind))
            .collect();
        Self { filters }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for spec in &self.filters {
            if !seen.insert(spec.kind) {
                return Err(ConfigError::DuplicateFilter(spec.kind));
            }
            if spec.blur_radius == Some(0) {
                return Err(ConfigError::InvalidRadius);
            }
        }
        Ok(())
    }

    pub fn spec(&self, kind: FilterKind) -> Option<&FilterSpec> {
        self.filters.iter().find(|spec| spec.kind == kind)
    }

    /// Maximum blur radius from the blur entry, or the default.
    pub fn blur_radius(&self) -> u32 {
        self.spec(FilterKind::Blur)
            .and_then(|spec| spec.blur_radius)
            .unwrap_or(DEFAULT_MAX_BLUR_RADIUS)
    }

    /// Applies the preset on top of `chain`'s current state.
    pub fn apply_to(&self, chain: &mut FilterChain) -> Result<(), ConfigError> {
        self.validate()?;
        if self.spec(FilterKind::Blur).is_some() {
            chain.set_blur_radius(self.blur_radius())?;
        }
        for spec in &self.filters {
            chain.set_intensity(spec.kind, spec.intensity.value())?;
            chain.enable(spec.kind)?;
        }
        Ok(())
    }

    /// Builds a chain for `width x height` with this preset applied.
    pub fn build(
        &self,
        width: u32,
        height: u32,
        backend: Option<Box<dyn GpuBackend>>,
    ) -> Result<FilterChain, ConfigError> {
        self.validate()?;
        let mut chain = match backend {
            Some(backend) => FilterChain::with_blur(width, height, backend, self.blur_radius()),
            None => FilterChain::new(width, height),
        };
        self.apply_to(&mut chain)?;
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blurring::infrastructure::software_backend::SoftwareBackend;
    use crate::filtering::domain::intensity::Intensity;
    use tempfile::TempDir;

    const PRESET: &str = r#"{
        "filters": [
            { "kind": "sepia", "intensity": 0.4 },
            { "kind": "blur", "intensity": 1.0, "blur_radius": 6 },
            { "kind": "invert" }
        ]
    }"#;

    #[test]
    fn test_parse_preset() {
        let config = ChainConfig::from_json(PRESET).unwrap();
        assert_eq!(config.filters.len(), 3);
        assert_eq!(config.blur_radius(), 6);
        // Missing intensity defaults to full.
        assert!(config.spec(FilterKind::Invert).unwrap().intensity.is_full());
    }

    #[test]
    fn test_out_of_range_intensity_is_clamped() {
        let config =
            ChainConfig::from_json(r#"{"filters":[{"kind":"grayscale","intensity":3.0}]}"#)
                .unwrap();
        assert_eq!(config.filters[0].intensity, Intensity::FULL);
    }

    #[test]
    fn test_duplicate_filter_rejected() {
        let err = ChainConfig::from_json(
            r#"{"filters":[{"kind":"invert"},{"kind":"invert","intensity":0.2}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateFilter(FilterKind::Invert)));
    }

    #[test]
    fn test_zero_radius_rejected() {
        let err = ChainConfig::from_json(r#"{"filters":[{"kind":"blur","blur_radius":0}]}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRadius));
    }

    #[test]
    fn test_unknown_kind_is_parse_error() {
        let err = ChainConfig::from_json(r#"{"filters":[{"kind":"vignette"}]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_empty_config_defaults() {
        let config = ChainConfig::from_json("{}").unwrap();
        assert!(config.filters.is_empty());
        assert_eq!(config.blur_radius(), DEFAULT_MAX_BLUR_RADIUS);
    }

    #[test]
    fn test_build_enables_listed_filters() {
        let config = ChainConfig::from_json(PRESET).unwrap();
        let chain = config
            .build(8, 8, Some(Box::new(SoftwareBackend::new())))
            .unwrap();
        assert_eq!(
            chain.active_kinds(),
            vec![FilterKind::Sepia, FilterKind::Blur, FilterKind::Invert]
        );
        assert_eq!(chain.max_blur_radius(), 6);
        assert!(!chain.is_enabled(FilterKind::Grayscale));
    }

    #[test]
    fn test_build_with_blur_but_no_backend_fails() {
        let config = ChainConfig::from_json(PRESET).unwrap();
        let err = config.build(8, 8, None).err().unwrap();
        assert!(matches!(
            err,
            ConfigError::Chain(ChainError::BlurUnavailable(_))
        ));
    }

    #[test]
    fn test_from_chain_captures_enabled_filters() {
        let mut chain = FilterChain::new(4, 4);
        chain.set_intensity(FilterKind::Grayscale, 0.25).unwrap();
        chain.enable(FilterKind::Grayscale).unwrap();
        let config = ChainConfig::from_chain(&chain);
        assert_eq!(config.filters.len(), 1);
        assert_eq!(config.filters[0].kind, FilterKind::Grayscale);
        assert_eq!(config.filters[0].intensity, Intensity::new(0.25));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preset.json");
        let config = ChainConfig::from_json(PRESET).unwrap();
        config.save(&path).unwrap();
        assert_eq!(ChainConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.json");
        let err = ChainConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("missing.json"));
    }
}
