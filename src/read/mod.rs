pub mod fits;
pub mod ms;
pub mod uvfits;

use std::path::PathBuf;

use marlu::{rubbl_casatables, RADec};
use thiserror::Error;

use super::{ObsContext, VisInputType};

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Visibility file '{0}' does not exist")]
    FileNotFound(PathBuf),

    #[error("The FIELD table of '{0}' has no rows")]
    NoFields(PathBuf),

    #[error("PHASE_DIR of field {field} has {len} values; expected at least 2")]
    BadPhaseDir { field: usize, len: usize },

    #[error("'{0}' reports no channel frequencies")]
    NoChannelFreqs(PathBuf),

    #[error("'{file}' has no {axis} axis")]
    MissingAxis { file: PathBuf, axis: &'static str },

    #[error(transparent)]
    Table(#[from] rubbl_casatables::TableError),

    #[error(transparent)]
    Casacore(#[from] rubbl_casatables::CasacoreError),

    #[error(transparent)]
    Fits(#[from] fits::FitsError),
}

/// Anything that can tell us where each pointing of an observation is phased.
pub trait PointingRead: Sync + Send {
    fn num_pointings(&self) -> usize;

    /// The phase centre of the `pointing`th pointing. Panics if `pointing` is
    /// not smaller than [`PointingRead::num_pointings`].
    fn phase_centre(&self, pointing: usize) -> RADec;

    fn get_input_data_type(&self) -> VisInputType;
}

/// A plain list of pointings, for when no visibility file is involved.
#[derive(Debug, Clone, Default)]
pub struct Pointings {
    pub phase_centres: Vec<RADec>,
}

impl Pointings {
    pub fn new(phase_centres: Vec<RADec>) -> Pointings {
        Pointings { phase_centres }
    }
}

impl PointingRead for Pointings {
    fn num_pointings(&self) -> usize {
        self.phase_centres.len()
    }

    fn phase_centre(&self, pointing: usize) -> RADec {
        self.phase_centres[pointing]
    }

    fn get_input_data_type(&self) -> VisInputType {
        VisInputType::InMemory
    }
}

impl From<&ObsContext> for Pointings {
    fn from(obs_context: &ObsContext) -> Pointings {
        Pointings::new(obs_context.phase_centres.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use vec1::vec1;

    use super::*;

    #[test]
    fn test_pointings_from_obs_context() {
        let obs_context = ObsContext {
            phase_centres: vec1![
                RADec::from_degrees(10.0, -30.0),
                RADec::from_degrees(12.0, -31.0)
            ],
            fine_chan_freqs: vec1![150e6, 151e6],
            dish_diameter: None,
        };
        let pointings = Pointings::from(&obs_context);
        assert_eq!(pointings.num_pointings(), 2);
        assert_eq!(pointings.phase_centre(1).ra, 12.0_f64.to_radians());
        assert_eq!(pointings.phase_centre(1).dec, -31.0_f64.to_radians());
        assert_eq!(pointings.get_input_data_type(), VisInputType::InMemory);
        assert_eq!(obs_context.mean_freq(), 150.5e6);
    }
}
