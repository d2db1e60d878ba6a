//! Pointing metadata from CASA measurement sets.
//!
//! More info: https://casa.nrao.edu/Memos/229.html#SECTION00060000000000000000

use std::path::{Path, PathBuf};

use log::{debug, trace, warn};
use marlu::{rubbl_casatables, RADec};
use rubbl_casatables::{Table, TableOpenMode};
use vec1::Vec1;

use super::{PointingRead, ReadError};
use crate::{ObsContext, VisInputType};

/// Open a measurement set table read only. If `table` is `None`, then open the
/// base table.
fn read_table(ms: &Path, table: Option<&str>) -> Result<Table, ReadError> {
    let t = Table::open(
        format!("{}/{}", ms.display(), table.unwrap_or("")),
        TableOpenMode::Read,
    )?;
    Ok(t)
}

pub struct MsReader {
    /// Input data metadata.
    obs_context: ObsContext,

    /// The path to the measurement set on disk.
    pub ms: PathBuf,
}

impl MsReader {
    /// Read the pointing metadata of a measurement set. Every row of the FIELD
    /// table is a pointing, phased to its PHASE_DIR.
    pub fn new<P: AsRef<Path>>(ms: P) -> Result<MsReader, ReadError> {
        let ms = ms.as_ref();
        debug!("Using measurement set: {}", ms.display());
        if !ms.exists() {
            return Err(ReadError::FileNotFound(ms.to_path_buf()));
        }

        // Get the phase centre of each field. PHASE_DIR is a polynomial in
        // time; only the zeroth-order term is used.
        let phase_centres = {
            let mut field_table = read_table(ms, Some("FIELD"))?;
            let num_fields = field_table.n_rows() as usize;
            trace!("There are {num_fields} fields");
            let mut phase_centres = Vec::with_capacity(num_fields);
            for i_field in 0..num_fields {
                let phase_vec: Vec<f64> =
                    field_table.get_cell_as_vec("PHASE_DIR", i_field as u64)?;
                match phase_vec.as_slice() {
                    [ra, dec, ..] => {
                        let phase_centre = RADec::from_radians(*ra, *dec);
                        debug!(
                            "Field {i_field} phase centre: RA {:.4} deg, Dec {:.4} deg",
                            phase_centre.ra.to_degrees(),
                            phase_centre.dec.to_degrees()
                        );
                        phase_centres.push(phase_centre);
                    }
                    _ => {
                        return Err(ReadError::BadPhaseDir {
                            field: i_field,
                            len: phase_vec.len(),
                        })
                    }
                }
            }
            Vec1::try_from_vec(phase_centres)
                .map_err(|_| ReadError::NoFields(ms.to_path_buf()))?
        };

        // Get the frequency information.
        let fine_chan_freqs = {
            let mut spectral_window_table = read_table(ms, Some("SPECTRAL_WINDOW"))?;
            let fine_chan_freqs: Vec<f64> =
                spectral_window_table.get_cell_as_vec("CHAN_FREQ", 0)?;
            Vec1::try_from_vec(fine_chan_freqs)
                .map_err(|_| ReadError::NoChannelFreqs(ms.to_path_buf()))?
        };
        debug!(
            "{} fine channels, {} Hz to {} Hz",
            fine_chan_freqs.len(),
            fine_chan_freqs.first(),
            fine_chan_freqs.last()
        );

        // The smallest dish has the widest beam, so that's the one that
        // matters when deciding what's visible.
        let dish_diameter = {
            let mut antenna_table = read_table(ms, Some("ANTENNA"))?;
            if antenna_table
                .column_names()?
                .iter()
                .any(|c| c == "DISH_DIAMETER")
            {
                let diameters: Vec<f64> = antenna_table.get_col_as_vec("DISH_DIAMETER")?;
                diameters
                    .into_iter()
                    .filter(|d| d.is_finite() && *d > 0.0)
                    .reduce(f64::min)
            } else {
                None
            }
        };
        match dish_diameter {
            Some(d) => debug!("Smallest dish diameter: {d} m"),
            None => warn!("No usable DISH_DIAMETER in the ANTENNA table"),
        }

        Ok(MsReader {
            obs_context: ObsContext {
                phase_centres,
                fine_chan_freqs,
                dish_diameter,
            },
            ms: ms.to_path_buf(),
        })
    }

    pub fn get_obs_context(&self) -> &ObsContext {
        &self.obs_context
    }
}

impl PointingRead for MsReader {
    fn num_pointings(&self) -> usize {
        self.obs_context.phase_centres.len()
    }

    fn phase_centre(&self, pointing: usize) -> RADec {
        self.obs_context.phase_centres[pointing]
    }

    fn get_input_data_type(&self) -> VisInputType {
        VisInputType::MeasurementSet
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_read_ms_missing_file() {
        let result = MsReader::new("/does/not/exist.ms");
        assert!(matches!(result, Err(ReadError::FileNotFound(_))));
    }

    #[test]
    fn test_read_ms_not_a_table() {
        // The directory exists but has no FIELD table.
        let dir = TempDir::new().unwrap();
        let result = MsReader::new(dir.path());
        assert!(matches!(
            result,
            Err(ReadError::Table(_) | ReadError::Casacore(_))
        ));
    }
}
