//! Pointing metadata from uvfits files.

use std::path::{Path, PathBuf};

use fitsio::{hdu::FitsHdu, FitsFile};
use log::{debug, warn};
use marlu::RADec;
use vec1::Vec1;

use super::{
    fits::{fits_get_optional_key, fits_get_required_key, fits_open, fits_open_hdu},
    PointingRead, ReadError,
};
use crate::{ObsContext, VisInputType};

pub struct UvfitsReader {
    /// Observation metadata.
    obs_context: ObsContext,

    /// The path to the uvfits on disk.
    pub uvfits: PathBuf,
}

impl UvfitsReader {
    /// Read the pointing metadata of a uvfits file. A uvfits file without a
    /// SOURCE table holds a single pointing, phased to the RA and DEC axes'
    /// reference values.
    pub fn new<P: AsRef<Path>>(uvfits: P) -> Result<UvfitsReader, ReadError> {
        let uvfits = uvfits.as_ref();
        debug!("Using uvfits file: {}", uvfits.display());
        if !uvfits.exists() {
            return Err(ReadError::FileNotFound(uvfits.to_path_buf()));
        }

        let mut uvfits_fptr = fits_open(uvfits)?;
        let primary_hdu = fits_open_hdu(&mut uvfits_fptr, 0)?;
        let indices = Indices::new(&mut uvfits_fptr, &primary_hdu, uvfits)?;
        debug!("FREQ index:     {}", indices.freq);
        debug!("RA index:       {}", indices.ra);
        debug!("DEC index:      {}", indices.dec);

        if fits_open_hdu(&mut uvfits_fptr, "AIPS SU").is_ok() {
            warn!("uvfits file has a SOURCE table; only the primary phase centre is used");
        }

        let phase_centre = {
            let ra = fits_get_required_key(
                &mut uvfits_fptr,
                &primary_hdu,
                &format!("CRVAL{}", indices.ra),
            )?;
            let dec = fits_get_required_key(
                &mut uvfits_fptr,
                &primary_hdu,
                &format!("CRVAL{}", indices.dec),
            )?;
            RADec::from_degrees(ra, dec)
        };
        debug!(
            "Phase centre: RA {:.4} deg, Dec {:.4} deg",
            phase_centre.ra.to_degrees(),
            phase_centre.dec.to_degrees()
        );

        let fine_chan_freqs = {
            let base_freq: f64 = fits_get_required_key(
                &mut uvfits_fptr,
                &primary_hdu,
                &format!("CRVAL{}", indices.freq),
            )?;
            // CRPIX might be a float. Parse it as one, then make it an int.
            let base_index: f64 = fits_get_required_key(
                &mut uvfits_fptr,
                &primary_hdu,
                &format!("CRPIX{}", indices.freq),
            )?;
            let base_index = base_index.round();
            let freq_res: f64 = fits_get_required_key(
                &mut uvfits_fptr,
                &primary_hdu,
                &format!("CDELT{}", indices.freq),
            )?;
            let num_fine_freq_chans: usize = fits_get_required_key(
                &mut uvfits_fptr,
                &primary_hdu,
                &format!("NAXIS{}", indices.freq),
            )?;

            let fine_chan_freqs = (0..num_fine_freq_chans)
                .map(|i| base_freq + (i as f64 - base_index + 1.0) * freq_res)
                .collect();
            Vec1::try_from_vec(fine_chan_freqs)
                .map_err(|_| ReadError::NoChannelFreqs(uvfits.to_path_buf()))?
        };
        debug!("Number of fine frequency chans: {}", fine_chan_freqs.len());

        Ok(UvfitsReader {
            obs_context: ObsContext {
                phase_centres: Vec1::new(phase_centre),
                fine_chan_freqs,
                // uvfits has no standard place for dish sizes.
                dish_diameter: None,
            },
            uvfits: uvfits.to_path_buf(),
        })
    }

    pub fn get_obs_context(&self) -> &ObsContext {
        &self.obs_context
    }
}

impl PointingRead for UvfitsReader {
    fn num_pointings(&self) -> usize {
        self.obs_context.phase_centres.len()
    }

    fn phase_centre(&self, pointing: usize) -> RADec {
        self.obs_context.phase_centres[pointing]
    }

    fn get_input_data_type(&self) -> VisInputType {
        VisInputType::Uvfits
    }
}

#[derive(Debug)]
struct Indices {
    /// CTYPE
    freq: u8,
    /// CTYPE
    ra: u8,
    /// CTYPE
    dec: u8,
}

impl Indices {
    /// Find the 1-indexed indices of the "CTYPE" keys we require ("FREQ", "RA",
    /// "DEC").
    fn new(uvfits: &mut FitsFile, hdu: &FitsHdu, file: &Path) -> Result<Self, ReadError> {
        // Accumulate the "CTYPE" keys. CTYPE1 is unused in random-groups
        // files.
        let mut ctypes = Vec::with_capacity(7);
        for i in 2.. {
            let ctype: Option<String> = fits_get_optional_key(uvfits, hdu, &format!("CTYPE{i}"))?;
            match ctype {
                Some(ctype) => ctypes.push(ctype),

                // We've found the last CTYPE.
                None => break,
            }
        }

        let mut freq_index = None;
        let mut ra_index = None;
        let mut dec_index = None;

        for (i, key) in ctypes.into_iter().enumerate() {
            let ii = (i + 2) as u8;
            match key.as_str() {
                "FREQ" => freq_index = Some(ii),
                "RA" => ra_index = Some(ii),
                "DEC" => dec_index = Some(ii),
                _ => (),
            }
        }

        let missing = |axis| ReadError::MissingAxis {
            file: file.to_path_buf(),
            axis,
        };
        Ok(Indices {
            freq: freq_index.ok_or_else(|| missing("FREQ"))?,
            ra: ra_index.ok_or_else(|| missing("RA"))?,
            dec: dec_index.ok_or_else(|| missing("DEC"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use fitsio::images::{ImageDescription, ImageType};
    use tempfile::TempDir;

    use super::*;

    /// Write a uvfits-like primary HDU with three 1 MHz channels centred on
    /// 151 MHz, phased to RA 60 deg, Dec -27 deg. `ctypes` lists the axis
    /// names for CTYPE2 onwards.
    fn write_uvfits(dir: &TempDir, ctypes: &[&str]) -> PathBuf {
        let path = dir.path().join("test.uvfits");
        let desc = ImageDescription {
            data_type: ImageType::Float,
            dimensions: &[3, 3, 3, 3],
        };
        let mut fptr = FitsFile::create(&path)
            .with_custom_primary(&desc)
            .open()
            .unwrap();
        let hdu = fptr.primary_hdu().unwrap();
        for (i, ctype) in ctypes.iter().enumerate() {
            let axis = i + 2;
            let (crval, crpix, cdelt) = match *ctype {
                "FREQ" => (151e6, 2.0, 1e6),
                "RA" => (60.0, 1.0, 1.0),
                "DEC" => (-27.0, 1.0, 1.0),
                _ => (0.0, 1.0, 1.0),
            };
            hdu.write_key(&mut fptr, &format!("CTYPE{axis}"), *ctype)
                .unwrap();
            hdu.write_key(&mut fptr, &format!("CRVAL{axis}"), crval)
                .unwrap();
            hdu.write_key(&mut fptr, &format!("CRPIX{axis}"), crpix)
                .unwrap();
            hdu.write_key(&mut fptr, &format!("CDELT{axis}"), cdelt)
                .unwrap();
        }
        path
    }

    #[test]
    fn test_read_uvfits_pointing() {
        let dir = TempDir::new().unwrap();
        let reader = UvfitsReader::new(write_uvfits(&dir, &["FREQ", "RA", "DEC"])).unwrap();

        assert_eq!(reader.num_pointings(), 1);
        assert_eq!(reader.get_input_data_type(), VisInputType::Uvfits);
        let phase_centre = reader.phase_centre(0);
        assert_abs_diff_eq!(phase_centre.ra, 60.0_f64.to_radians(), epsilon = 1e-12);
        assert_abs_diff_eq!(phase_centre.dec, -27.0_f64.to_radians(), epsilon = 1e-12);

        let obs_context = reader.get_obs_context();
        assert_eq!(
            obs_context.fine_chan_freqs.as_slice(),
            &[150e6, 151e6, 152e6]
        );
        assert_abs_diff_eq!(obs_context.mean_freq(), 151e6);
        assert!(obs_context.dish_diameter.is_none());
    }

    #[test]
    fn test_read_uvfits_axis_order_doesnt_matter() {
        let dir = TempDir::new().unwrap();
        let reader = UvfitsReader::new(write_uvfits(&dir, &["DEC", "FREQ", "RA"])).unwrap();

        let phase_centre = reader.phase_centre(0);
        assert_abs_diff_eq!(phase_centre.ra, 60.0_f64.to_radians(), epsilon = 1e-12);
        assert_abs_diff_eq!(phase_centre.dec, -27.0_f64.to_radians(), epsilon = 1e-12);
        assert_eq!(reader.get_obs_context().fine_chan_freqs.len(), 3);
    }

    #[test]
    fn test_read_uvfits_missing_axis() {
        let dir = TempDir::new().unwrap();
        let result = UvfitsReader::new(write_uvfits(&dir, &["FREQ", "RA"]));
        assert!(matches!(
            result,
            Err(ReadError::MissingAxis { axis: "DEC", .. })
        ));
    }

    #[test]
    fn test_read_uvfits_missing_file() {
        let result = UvfitsReader::new("/does/not/exist.uvfits");
        assert!(matches!(result, Err(ReadError::FileNotFound(_))));
    }
}
