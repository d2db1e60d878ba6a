//! Coordinate preparation for stacking interferometric visibilities.
//!
//! A catalogue of sky positions is filtered against the primary beam of each
//! pointing of an observation. For every surviving position we keep its offset
//! from the pointing's phase centre and its direction cosines, which is what
//! the stacking stage needs to rotate and combine visibilities.

pub mod beam;
pub mod catalog;
pub mod coords;
pub mod read;
pub mod write;

pub use beam::{BeamError, BoxBeam, FitsBeam, GaussianBeam, PrimaryBeam};
pub use catalog::{CatalogError, CoordUnit, RawCatalog};
pub use coords::{Coords, CoordsError, PointingStack, StackPoint};
pub use read::{ms::MsReader, uvfits::UvfitsReader, PointingRead, Pointings, ReadError};

use marlu::RADec;
use vec1::Vec1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisInputType {
    MeasurementSet,
    Uvfits,
    /// Pointings supplied directly, without a visibility file.
    InMemory,
}

#[derive(Debug, Clone)]
pub struct ObsContext {
    /// The phase centre of every pointing (field) in the data, in the order
    /// the data lists them.
    pub phase_centres: Vec1<RADec>,

    /// All of the fine-channel frequencies within the data \[Hz\]. The values
    /// reflect the frequencies at the *centre* of each channel.
    pub fine_chan_freqs: Vec1<f64>,

    /// The smallest dish diameter of the array \[metres\], if the data
    /// reports it. The smallest dish has the widest primary beam.
    pub dish_diameter: Option<f64>,
}

impl ObsContext {
    /// The mean of all fine-channel frequencies \[Hz\].
    pub fn mean_freq(&self) -> f64 {
        self.fine_chan_freqs.iter().sum::<f64>() / self.fine_chan_freqs.len() as f64
    }
}
