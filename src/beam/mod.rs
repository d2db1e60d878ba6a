//! Primary-beam models.
//!
//! All offsets handed to a beam are angular offsets from the pointing's phase
//! centre in \[radians\]; `dx` is along right ascension (already scaled by the
//! cosine of the phase centre's declination), `dy` along declination.

mod fits;

pub use fits::FitsBeam;

use std::{f64::consts::LN_2, path::PathBuf};

use marlu::constants::VEL_C;
use thiserror::Error;

/// Offsets at which a beam's gain is at or below this value are considered to
/// be outside the beam.
pub const DEFAULT_BEAM_CUTOFF: f64 = 0.01;

/// The FWHM of an Airy disk in units of lambda / D.
const AIRY_FWHM_FACTOR: f64 = 1.029;

#[derive(Error, Debug)]
pub enum BeamError {
    #[error("Primary beam file '{0}' does not exist")]
    FileNotFound(PathBuf),

    #[error("Primary beam image has a bad pixel size along axis {axis}")]
    ZeroPixelSize { axis: u8 },

    #[error("Primary beam image has {got} pixels, but NAXIS1 x NAXIS2 is {expected}")]
    ImageTooSmall { got: usize, expected: usize },

    #[error("Primary beam FWHM must be positive and finite (got {0} rad)")]
    BadFwhm(f64),

    #[error(transparent)]
    Fits(#[from] crate::read::fits::FitsError),
}

pub trait PrimaryBeam: Sync + Send {
    /// The beam response at the given offset, relative to the response at the
    /// phase centre.
    fn gain(&self, dx: f64, dy: f64) -> f64;

    /// Gains at or below this value are outside the beam.
    fn cutoff(&self) -> f64 {
        DEFAULT_BEAM_CUTOFF
    }

    /// Is a source at this offset usable for this pointing?
    fn is_inside_beam(&self, dx: f64, dy: f64) -> bool {
        self.gain(dx, dy) > self.cutoff()
    }
}

/// A beam with a hard edge: everything with `|dx|` and `|dy|` smaller than
/// `half_width` \[radians\] is in, with unit gain.
#[derive(Debug, Clone, Copy)]
pub struct BoxBeam {
    pub half_width: f64,
}

impl BoxBeam {
    pub fn new(half_width: f64) -> BoxBeam {
        BoxBeam { half_width }
    }

    pub fn from_degrees(half_width_deg: f64) -> BoxBeam {
        BoxBeam::new(half_width_deg.to_radians())
    }
}

impl PrimaryBeam for BoxBeam {
    fn gain(&self, dx: f64, dy: f64) -> f64 {
        if self.is_inside_beam(dx, dy) {
            1.0
        } else {
            0.0
        }
    }

    fn is_inside_beam(&self, dx: f64, dy: f64) -> bool {
        dx.abs() < self.half_width && dy.abs() < self.half_width
    }
}

/// A circularly-symmetric Gaussian beam.
#[derive(Debug, Clone, Copy)]
pub struct GaussianBeam {
    /// Full width at half maximum \[radians\].
    pub fwhm: f64,
    pub cutoff: f64,
}

impl GaussianBeam {
    pub fn new(fwhm: f64) -> Result<GaussianBeam, BeamError> {
        if !(fwhm.is_finite() && fwhm > 0.0) {
            return Err(BeamError::BadFwhm(fwhm));
        }
        Ok(GaussianBeam {
            fwhm,
            cutoff: DEFAULT_BEAM_CUTOFF,
        })
    }

    /// Approximate the beam of a uniformly-illuminated dish of diameter
    /// `dish_diameter` \[metres\] observing at `freq_hz`.
    pub fn from_dish(freq_hz: f64, dish_diameter: f64) -> Result<GaussianBeam, BeamError> {
        let lambda = VEL_C / freq_hz;
        GaussianBeam::new(AIRY_FWHM_FACTOR * lambda / dish_diameter)
    }

    pub fn with_cutoff(self, cutoff: f64) -> GaussianBeam {
        GaussianBeam { cutoff, ..self }
    }
}

impl PrimaryBeam for GaussianBeam {
    fn gain(&self, dx: f64, dy: f64) -> f64 {
        let r2 = dx * dx + dy * dy;
        (-4.0 * LN_2 * r2 / (self.fwhm * self.fwhm)).exp()
    }

    fn cutoff(&self) -> f64 {
        self.cutoff
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_box_beam() {
        let beam = BoxBeam::from_degrees(5.0);
        assert!(beam.is_inside_beam(0.0, 0.0));
        assert!(beam.is_inside_beam(4.9_f64.to_radians(), -4.9_f64.to_radians()));
        assert!(!beam.is_inside_beam(5.0_f64.to_radians(), 0.0));
        assert!(!beam.is_inside_beam(0.0, -10.0_f64.to_radians()));
        assert_abs_diff_eq!(beam.gain(0.0, 0.0), 1.0);
        assert_abs_diff_eq!(beam.gain(0.2, 0.0), 0.0);
    }

    #[test]
    fn test_gaussian_beam_half_power() {
        let beam = GaussianBeam::new(1.0_f64.to_radians()).unwrap();
        assert_abs_diff_eq!(beam.gain(0.0, 0.0), 1.0);
        let half = 0.5_f64.to_radians();
        assert_abs_diff_eq!(beam.gain(half, 0.0), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(beam.gain(0.0, -half), 0.5, epsilon = 1e-12);
        // Circularly symmetric.
        let diag = half / 2.0_f64.sqrt();
        assert_abs_diff_eq!(beam.gain(diag, diag), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_gaussian_beam_cutoff() {
        let fwhm = 1.0_f64.to_radians();
        let beam = GaussianBeam::new(fwhm).unwrap();
        // gain = 0.01 at r = fwhm * sqrt(ln(100) / (4 ln 2)).
        let edge = fwhm * (100.0_f64.ln() / (4.0 * LN_2)).sqrt();
        assert!(beam.is_inside_beam(0.99 * edge, 0.0));
        assert!(!beam.is_inside_beam(1.01 * edge, 0.0));

        let beam = beam.with_cutoff(0.5);
        assert!(beam.is_inside_beam(0.49 * fwhm, 0.0));
        assert!(!beam.is_inside_beam(0.51 * fwhm, 0.0));
    }

    #[test]
    fn test_gaussian_beam_from_dish() {
        // A 25 m dish at 1.4 GHz.
        let beam = GaussianBeam::from_dish(1.4e9, 25.0).unwrap();
        let expected = AIRY_FWHM_FACTOR * VEL_C / 1.4e9 / 25.0;
        assert_abs_diff_eq!(beam.fwhm, expected);
        // About half a degree.
        assert!((0.4..0.6).contains(&beam.fwhm.to_degrees()));
    }

    #[test]
    fn test_gaussian_beam_bad_fwhm() {
        assert!(matches!(GaussianBeam::new(0.0), Err(BeamError::BadFwhm(_))));
        assert!(matches!(
            GaussianBeam::new(f64::NAN),
            Err(BeamError::BadFwhm(_))
        ));
        assert!(GaussianBeam::from_dish(1.4e9, 0.0).is_err());
    }
}
