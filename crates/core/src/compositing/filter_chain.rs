use thiserror::Error;

use crate::blurring::domain::blur_kernel::radius_for;
use crate::blurring::domain::gpu_backend::GpuBackend;
use crate::blurring::infrastructure::gpu_blur_filter::{BlurError, GpuBlurFilter};
use crate::filtering::domain::filter_kind::FilterKind;
use crate::filtering::domain::filter_spec::FilterSpec;
use crate::filtering::domain::intensity::Intensity;
use crate::filtering::domain::pixel_filter::PixelFilter;
use crate::shared::constants::DEFAULT_MAX_BLUR_RADIUS;
use crate::shared::frame::FrameBuffer;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("filter chain already disposed")]
    Disposed,
    #[error("blur filter unavailable: {0}")]
    BlurUnavailable(String),
    #[error("blur radius must be greater than 0, got {0}")]
    InvalidRadius(u32),
    #[error(transparent)]
    Blur(#[from] BlurError),
}

/// Result of one [`FilterChain::apply_all`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// No filter was active; the destination was not touched.
    Skipped,
    /// `filters` filters ran and the destination holds the composite.
    Composited { filters: usize },
}

/// Availability of the blur slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlurStatus {
    Ready { max_radius: u32, backend: String },
    Unavailable(String),
    Released,
}

#[derive(Debug, Clone, Copy)]
struct FilterSlot {
    kind: FilterKind,
    enabled: bool,
    intensity: Intensity,
}

impl FilterSlot {
    fn new(kind: FilterKind) -> Self {
        Self {
            kind,
            enabled: false,
            intensity: Intensity::FULL,
        }
    }

    fn effective(&self) -> Intensity {
        if self.enabled {
            self.intensity
        } else {
            Intensity::OFF
        }
    }
}

enum BlurSlot {
    Ready(GpuBlurFilter),
    Unavailable(String),
    Released,
}

/// Ordered stack of filters composited onto a frame.
///
/// Slots are fixed in registration order (grayscale, sepia, blur, invert).
/// Each slot carries an `enabled` flag and an intensity; toggling and
/// intensity changes are metadata only and take effect on the next
/// [`apply_all`](Self::apply_all). Later filters see the output of earlier
/// ones: the chain composites into a scratch frame and copies it back to the
/// destination only once every filter has succeeded.
pub struct FilterChain {
    slots: [FilterSlot; 4],
    scratch: FrameBuffer,
    blur: BlurSlot,
    max_blur_radius: u32,
    width: u32,
    height: u32,
    disposed: bool,
}

impl FilterChain {
    /// Chain with CPU filters only; blur reports unavailable.
    pub fn new(width: u32, height: u32) -> Self {
        log::info!("Filter chain {width}x{height} without blur backend");
        Self::assemble(
            width,
            height,
            BlurSlot::Unavailable("no GPU backend attached".to_string()),
            DEFAULT_MAX_BLUR_RADIUS,
        )
    }

    /// Chain whose blur renders on `backend`.
    ///
    /// A blur setup failure does not fail construction: it is logged and the
    /// blur slot is marked unavailable, while the CPU filters keep working.
    pub fn with_blur(
        width: u32,
        height: u32,
        backend: Box<dyn GpuBackend>,
        max_blur_radius: u32,
    ) -> Self {
        let blur = Self::setup_blur(backend, width, height, max_blur_radius);
        Self::assemble(width, height, blur, max_blur_radius)
    }

    fn assemble(width: u32, height: u32, blur: BlurSlot, max_blur_radius: u32) -> Self {
        Self {
            slots: FilterKind::ALL.map(FilterSlot::new),
            scratch: FrameBuffer::blank(width, height),
            blur,
            max_blur_radius,
            width,
            height,
            disposed: false,
        }
    }

    fn setup_blur(
        backend: Box<dyn GpuBackend>,
        width: u32,
        height: u32,
        max_radius: u32,
    ) -> BlurSlot {
        match GpuBlurFilter::new(backend, width, height, max_radius) {
            Ok(filter) => {
                log::info!(
                    "Blur ready on {} ({width}x{height}, max radius {max_radius})",
                    filter.backend_name()
                );
                BlurSlot::Ready(filter)
            }
            Err(e) => {
                log::warn!("Blur filter unavailable: {e}");
                BlurSlot::Unavailable(e.to_string())
            }
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn max_blur_radius(&self) -> u32 {
        self.max_blur_radius
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn blur_status(&self) -> BlurStatus {
        match &self.blur {
            BlurSlot::Ready(filter) => BlurStatus::Ready {
                max_radius: filter.max_radius(),
                backend: filter.backend_name(),
            },
            BlurSlot::Unavailable(reason) => BlurStatus::Unavailable(reason.clone()),
            BlurSlot::Released => BlurStatus::Released,
        }
    }

    fn ensure_live(&self) -> Result<(), ChainError> {
        if self.disposed {
            Err(ChainError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Rejects a blur slot change that would make blur run without a filter.
    fn check_blur(
        &self,
        kind: FilterKind,
        enabled: bool,
        intensity: Intensity,
    ) -> Result<(), ChainError> {
        if kind != FilterKind::Blur || !enabled || !intensity.is_active() {
            return Ok(());
        }
        match &self.blur {
            BlurSlot::Ready(_) => Ok(()),
            BlurSlot::Unavailable(reason) => Err(ChainError::BlurUnavailable(reason.clone())),
            BlurSlot::Released => Err(ChainError::Disposed),
        }
    }

    /// Sets the intensity for `kind`, clamped to [0, 1].
    pub fn set_intensity(&mut self, kind: FilterKind, value: f32) -> Result<(), ChainError> {
        self.ensure_live()?;
        let intensity = Intensity::new(value);
        let slot = self.slots[kind.slot()];
        self.check_blur(kind, slot.enabled, intensity)?;
        self.slots[kind.slot()].intensity = intensity;
        Ok(())
    }

    pub fn enable(&mut self, kind: FilterKind) -> Result<(), ChainError> {
        self.set_enabled(kind, true)
    }

    pub fn disable(&mut self, kind: FilterKind) -> Result<(), ChainError> {
        self.set_enabled(kind, false)
    }

    /// Flips `kind` on or off and returns the new state.
    pub fn toggle(&mut self, kind: FilterKind) -> Result<bool, ChainError> {
        let enabled = !self.is_enabled(kind);
        self.set_enabled(kind, enabled)?;
        Ok(enabled)
    }

    fn set_enabled(&mut self, kind: FilterKind, enabled: bool) -> Result<(), ChainError> {
        self.ensure_live()?;
        let slot = self.slots[kind.slot()];
        self.check_blur(kind, enabled, slot.intensity)?;
        self.slots[kind.slot()].enabled = enabled;
        Ok(())
    }

    pub fn is_enabled(&self, kind: FilterKind) -> bool {
        self.slots[kind.slot()].enabled
    }

    /// Disables every filter, keeping their intensities.
    pub fn clear(&mut self) -> Result<(), ChainError> {
        self.ensure_live()?;
        for slot in &mut self.slots {
            slot.enabled = false;
        }
        Ok(())
    }

    /// Current configuration of `kind`, with the effective intensity.
    pub fn spec(&self, kind: FilterKind) -> FilterSpec {
        let intensity = self.slots[kind.slot()].effective();
        match kind {
            FilterKind::Blur => FilterSpec::blur(intensity, self.max_blur_radius),
            _ => FilterSpec::new(kind, intensity),
        }
    }

    /// Specs of every slot in registration order.
    pub fn specs(&self) -> Vec<FilterSpec> {
        FilterKind::ALL.iter().map(|&kind| self.spec(kind)).collect()
    }

    /// Kinds that would run on the next [`apply_all`](Self::apply_all).
    pub fn active_kinds(&self) -> Vec<FilterKind> {
        self.slots
            .iter()
            .filter(|slot| slot.effective().is_active())
            .map(|slot| slot.kind)
            .collect()
    }

    /// Composites every active filter onto `destination`.
    ///
    /// Panics if the chain was disposed or `destination` does not match the
    /// chain's dimensions. On error `destination` is left untouched.
    pub fn apply_all(
        &mut self,
        destination: &mut FrameBuffer,
    ) -> Result<ApplyOutcome, ChainError> {
        assert!(!self.disposed, "apply_all called on a disposed filter chain");
        assert_eq!(
            destination.dimensions(),
            (self.width, self.height),
            "destination frame must match the filter chain's dimensions"
        );

        if !self.slots.iter().any(|slot| slot.effective().is_active()) {
            return Ok(ApplyOutcome::Skipped);
        }

        self.scratch.copy_from(destination);
        let mut filters = 0;
        for slot in self.slots {
            let intensity = slot.effective();
            if !intensity.is_active() {
                continue;
            }
            let ran = match PixelFilter::for_kind(slot.kind) {
                Some(filter) => {
                    filter.apply(&mut self.scratch, intensity);
                    true
                }
                None => self.apply_blur(intensity)?,
            };
            if ran {
                filters += 1;
            }
        }
        destination.copy_from(&self.scratch);

        log::debug!("Composited {filters} filter(s) onto frame {}", destination.index());
        Ok(ApplyOutcome::Composited { filters })
    }

    /// Blurs the scratch frame in place. Returns `false` when the radius
    /// rounds down to zero and nothing was drawn.
    fn apply_blur(&mut self, intensity: Intensity) -> Result<bool, ChainError> {
        let blur = match &mut self.blur {
            BlurSlot::Ready(filter) => filter,
            BlurSlot::Unavailable(reason) => {
                return Err(ChainError::BlurUnavailable(reason.clone()))
            }
            BlurSlot::Released => return Err(ChainError::Disposed),
        };
        if radius_for(blur.max_radius(), intensity) == 0 {
            return Ok(false);
        }
        blur.update_source(&self.scratch)?;
        blur.apply(intensity)?;
        blur.output(&mut self.scratch)?;
        Ok(true)
    }

    /// Rebuilds the scratch frame and blur resources for a new resolution.
    ///
    /// Returns [`ChainError::BlurUnavailable`] if blur was enabled and could
    /// not be set up at the new size; the chain is resized and blur stays
    /// disabled.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), ChainError> {
        self.ensure_live()?;
        if (width, height) == (self.width, self.height) {
            return Ok(());
        }
        log::info!(
            "Resizing filter chain {}x{} -> {width}x{height}",
            self.width,
            self.height
        );
        self.width = width;
        self.height = height;
        self.scratch.reallocate(width, height);
        let blur_was_enabled = self.is_enabled(FilterKind::Blur);
        self.rebuild_blur();
        match &self.blur {
            BlurSlot::Unavailable(reason) if blur_was_enabled => {
                Err(ChainError::BlurUnavailable(reason.clone()))
            }
            _ => Ok(()),
        }
    }

    /// Reconstructs the blur filter with a new maximum radius.
    pub fn set_blur_radius(&mut self, max_radius: u32) -> Result<(), ChainError> {
        self.ensure_live()?;
        if max_radius == 0 {
            return Err(ChainError::InvalidRadius(max_radius));
        }
        if max_radius == self.max_blur_radius {
            return Ok(());
        }
        self.max_blur_radius = max_radius;
        self.rebuild_blur();
        match &self.blur {
            BlurSlot::Unavailable(reason) => Err(ChainError::BlurUnavailable(reason.clone())),
            _ => Ok(()),
        }
    }

    /// Disposes the blur filter and sets it up again on the same backend
    /// with the current dimensions and radius. An unavailable blur stays
    /// unavailable.
    fn rebuild_blur(&mut self) {
        let previous = std::mem::replace(&mut self.blur, BlurSlot::Released);
        self.blur = match previous {
            BlurSlot::Ready(filter) => match filter.dispose() {
                Some(backend) => {
                    Self::setup_blur(backend, self.width, self.height, self.max_blur_radius)
                }
                None => BlurSlot::Unavailable("blur backend was released".to_string()),
            },
            other => other,
        };
        if !matches!(self.blur, BlurSlot::Ready(_)) {
            self.slots[FilterKind::Blur.slot()].enabled = false;
        }
    }

    /// Releases the blur resources and the scratch frame. Safe to call
    /// more than once.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if let BlurSlot::Ready(filter) = std::mem::replace(&mut self.blur, BlurSlot::Released) {
            drop(filter.dispose());
        }
        self.blur = BlurSlot::Released;
        self.scratch.release();
        log::debug!("Filter chain disposed");
    }
}

impl Drop for FilterChain {
    fn drop(&mut self) {
        self.dispose();
    }
}
