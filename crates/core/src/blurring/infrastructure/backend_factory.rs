use std::fmt;
use std::str::FromStr;

use crate::blurring::domain::gpu_backend::{GpuBackend, GpuError};

use super::software_backend::SoftwareBackend;
use super::wgpu_backend::WgpuBackend;

/// Which backend renders the blur.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Hardware adapter through wgpu. Fails if none is present.
    #[default]
    Gpu,
    /// CPU rasterizer running the same blur program.
    Software,
    /// No blur backend; the blur filter is unavailable.
    None,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gpu" => Ok(Self::Gpu),
            "software" | "cpu" => Ok(Self::Software),
            "none" | "off" => Ok(Self::None),
            other => Err(format!(
                "unknown backend '{other}' (expected gpu, software or none)"
            )),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gpu => "gpu",
            Self::Software => "software",
            Self::None => "none",
        })
    }
}

/// Creates the requested backend.
///
/// There is no implicit fallback: asking for [`BackendKind::Gpu`] on a
/// machine without an adapter is an error, and the caller decides whether
/// to run without blur or pick the software backend explicitly.
pub fn create_backend(kind: BackendKind) -> Result<Option<Box<dyn GpuBackend>>, GpuError> {
    match kind {
        BackendKind::Gpu => {
            let backend = WgpuBackend::new()?;
            log::info!("Using GPU backend for blur ({})", backend.describe());
            Ok(Some(Box::new(backend)))
        }
        BackendKind::Software => {
            log::info!("Using software backend for blur");
            Ok(Some(Box::new(SoftwareBackend::new())))
        }
        BackendKind::None => {
            log::info!("No blur backend requested; blur filter disabled");
            Ok(None)
        }
    }
}

/// Returns true if a GPU adapter can be opened.
pub fn gpu_available() -> bool {
    WgpuBackend::new().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("gpu", BackendKind::Gpu)]
    #[case(" GPU ", BackendKind::Gpu)]
    #[case("software", BackendKind::Software)]
    #[case("cpu", BackendKind::Software)]
    #[case("none", BackendKind::None)]
    fn test_parse_backend_kind(#[case] input: &str, #[case] expected: BackendKind) {
        assert_eq!(input.parse::<BackendKind>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown_backend_fails() {
        let err = "metal".parse::<BackendKind>().unwrap_err();
        assert!(err.contains("metal"));
    }

    #[test]
    fn test_display_round_trips() {
        for kind in [BackendKind::Gpu, BackendKind::Software, BackendKind::None] {
            assert_eq!(kind.to_string().parse::<BackendKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_software_backend_always_created() {
        let backend = create_backend(BackendKind::Software).unwrap().unwrap();
        assert_eq!(backend.describe(), "software rasterizer");
    }

    #[test]
    fn test_none_creates_nothing() {
        assert!(create_backend(BackendKind::None).unwrap().is_none());
    }

    #[test]
    fn test_gpu_request_matches_availability() {
        // Result depends on hardware; only the two must agree.
        let available = gpu_available();
        assert_eq!(create_backend(BackendKind::Gpu).is_ok(), available);
    }
}
