//! Primary beams described by a FITS image, e.g. a CASA primary-beam image
//! exported with `exportfits`.

use std::path::Path;

use log::{debug, trace};
use ndarray::prelude::*;

use super::{BeamError, PrimaryBeam, DEFAULT_BEAM_CUTOFF};
use crate::read::fits::{
    fits_get_float_image, fits_get_required_key, fits_open, fits_open_hdu,
};

/// A primary beam sampled on a regular grid. The reference pixel is the
/// pointing centre; the image is expected to be normalised to 1 there.
#[derive(Debug, Clone)]
pub struct FitsBeam {
    /// The beam response, indexed `[y][x]`.
    image: Array2<f32>,

    /// The 0-indexed pixel coordinates of the pointing centre.
    ref_pix: (f64, f64),

    /// The size of a pixel along each axis \[radians\]. These may be
    /// negative, e.g. RA typically increases to the left.
    pix_size: (f64, f64),

    cutoff: f64,
}

impl FitsBeam {
    /// Read the primary HDU of a FITS image. Only the first `NAXIS1` x `NAXIS2`
    /// plane is used; any further (Stokes, frequency) axes are ignored.
    pub fn new<P: AsRef<Path>>(file: P) -> Result<FitsBeam, BeamError> {
        let file = file.as_ref();
        debug!("Using primary beam image: {}", file.display());
        if !file.exists() {
            return Err(BeamError::FileNotFound(file.to_path_buf()));
        }

        let mut fptr = fits_open(file)?;
        let hdu = fits_open_hdu(&mut fptr, 0)?;
        let nx: usize = fits_get_required_key(&mut fptr, &hdu, "NAXIS1")?;
        let ny: usize = fits_get_required_key(&mut fptr, &hdu, "NAXIS2")?;
        let crpix1: f64 = fits_get_required_key(&mut fptr, &hdu, "CRPIX1")?;
        let crpix2: f64 = fits_get_required_key(&mut fptr, &hdu, "CRPIX2")?;
        let cdelt1: f64 = fits_get_required_key(&mut fptr, &hdu, "CDELT1")?;
        let cdelt2: f64 = fits_get_required_key(&mut fptr, &hdu, "CDELT2")?;
        for (axis, cdelt) in [(1, cdelt1), (2, cdelt2)] {
            if cdelt == 0.0 || !cdelt.is_finite() {
                return Err(BeamError::ZeroPixelSize { axis });
            }
        }
        trace!("Beam image is {nx}x{ny}, CRPIX ({crpix1}, {crpix2}), CDELT ({cdelt1}, {cdelt2}) deg");

        let mut pixels = fits_get_float_image(&mut fptr, &hdu)?;
        let expected = nx * ny;
        if expected == 0 || pixels.len() < expected {
            return Err(BeamError::ImageTooSmall {
                got: pixels.len(),
                expected,
            });
        }
        pixels.truncate(expected);
        let image = Array2::from_shape_vec((ny, nx), pixels)
            .map_err(|_| BeamError::ImageTooSmall {
                got: expected,
                expected,
            })?
            .mapv_into(|p| if p.is_finite() { p } else { 0.0 });

        Ok(FitsBeam {
            image,
            // FITS pixels are 1-indexed.
            ref_pix: (crpix1 - 1.0, crpix2 - 1.0),
            pix_size: (cdelt1.to_radians(), cdelt2.to_radians()),
            cutoff: DEFAULT_BEAM_CUTOFF,
        })
    }

    pub fn with_cutoff(self, cutoff: f64) -> FitsBeam {
        FitsBeam { cutoff, ..self }
    }
}

impl PrimaryBeam for FitsBeam {
    /// Bilinearly interpolate the image at the offset. Offsets that land
    /// outside the image have zero gain.
    fn gain(&self, dx: f64, dy: f64) -> f64 {
        let (ny, nx) = self.image.dim();
        let px = self.ref_pix.0 + dx / self.pix_size.0;
        let py = self.ref_pix.1 + dy / self.pix_size.1;
        if !(0.0..=(nx - 1) as f64).contains(&px) || !(0.0..=(ny - 1) as f64).contains(&py) {
            return 0.0;
        }

        let (x0, y0) = (px.floor() as usize, py.floor() as usize);
        let (x1, y1) = ((x0 + 1).min(nx - 1), (y0 + 1).min(ny - 1));
        let (fx, fy) = (px - x0 as f64, py - y0 as f64);
        let pix = |y: usize, x: usize| f64::from(self.image[(y, x)]);

        (1.0 - fx) * (1.0 - fy) * pix(y0, x0)
            + fx * (1.0 - fy) * pix(y0, x1)
            + (1.0 - fx) * fy * pix(y1, x0)
            + fx * fy * pix(y1, x1)
    }

    fn cutoff(&self) -> f64 {
        self.cutoff
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use fitsio::{
        images::{ImageDescription, ImageType},
        FitsFile,
    };
    use tempfile::TempDir;

    use super::*;
    use crate::read::fits::FitsError;

    const N: usize = 5;

    /// Write a 5x5 beam image with pixel value 0.1 * x + 0.01 * y (0-indexed
    /// pixel coordinates). The reference pixel is the centre and pixels are 1
    /// degree wide, with RA increasing to the left.
    fn write_beam(dir: &TempDir, with_cdelt: bool) -> std::path::PathBuf {
        let path = dir.path().join("beam.fits");
        let desc = ImageDescription {
            data_type: ImageType::Float,
            dimensions: &[N, N],
        };
        let mut fptr = FitsFile::create(&path)
            .with_custom_primary(&desc)
            .open()
            .unwrap();
        let hdu = fptr.primary_hdu().unwrap();
        hdu.write_key(&mut fptr, "CRPIX1", 3.0).unwrap();
        hdu.write_key(&mut fptr, "CRPIX2", 3.0).unwrap();
        if with_cdelt {
            hdu.write_key(&mut fptr, "CDELT1", -1.0).unwrap();
            hdu.write_key(&mut fptr, "CDELT2", 1.0).unwrap();
        }
        let mut data = Vec::with_capacity(N * N);
        for y in 0..N {
            for x in 0..N {
                data.push(0.1 * x as f32 + 0.01 * y as f32);
            }
        }
        hdu.write_image(&mut fptr, &data).unwrap();
        path
    }

    #[test]
    fn test_fits_beam_interpolation() {
        let dir = TempDir::new().unwrap();
        let beam = FitsBeam::new(write_beam(&dir, true)).unwrap();
        let deg = 1.0_f64.to_radians();

        assert_abs_diff_eq!(beam.gain(0.0, 0.0), 0.22, epsilon = 1e-6);
        // Positive dx moves to lower pixel x.
        assert_abs_diff_eq!(beam.gain(deg, 0.0), 0.12, epsilon = 1e-6);
        assert_abs_diff_eq!(beam.gain(0.5 * deg, 0.0), 0.17, epsilon = 1e-6);
        assert_abs_diff_eq!(beam.gain(0.0, 1.5 * deg), 0.235, epsilon = 1e-6);
        assert_abs_diff_eq!(beam.gain(-2.0 * deg, -2.0 * deg), 0.4, epsilon = 1e-6);
    }

    #[test]
    fn test_fits_beam_outside_image() {
        let dir = TempDir::new().unwrap();
        let beam = FitsBeam::new(write_beam(&dir, true)).unwrap();
        let deg = 1.0_f64.to_radians();

        assert_abs_diff_eq!(beam.gain(3.0 * deg, 0.0), 0.0);
        assert_abs_diff_eq!(beam.gain(0.0, -2.5 * deg), 0.0);
        assert!(!beam.is_inside_beam(3.0 * deg, 0.0));
        assert!(beam.is_inside_beam(0.0, 0.0));
        assert!(!beam.with_cutoff(0.5).is_inside_beam(0.0, 0.0));
    }

    #[test]
    fn test_fits_beam_missing_key() {
        let dir = TempDir::new().unwrap();
        let result = FitsBeam::new(write_beam(&dir, false));
        assert!(matches!(
            result,
            Err(BeamError::Fits(FitsError::MissingKey(key))) if key == "CDELT1"
        ));
    }

    #[test]
    fn test_fits_beam_missing_file() {
        let result = FitsBeam::new("/does/not/exist.fits");
        assert!(matches!(result, Err(BeamError::FileNotFound(_))));
    }
}
