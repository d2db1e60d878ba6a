//! Per-pointing coordinates of the sources to be stacked.
//!
//! For each pointing, every catalogue source is placed relative to the
//! pointing's phase centre, both as an angular offset (used to look up the
//! primary beam) and as direction cosines (used to phase visibilities to the
//! source). Sources outside a pointing's primary beam are dropped for that
//! pointing.

use std::{f64::consts::PI, path::Path};

use indicatif::{ParallelProgressIterator, ProgressBar};
use log::{debug, trace, warn};
use marlu::{RADec, LMN};
use ndarray::prelude::*;
use rayon::prelude::*;
use thiserror::Error;

use crate::{
    beam::PrimaryBeam,
    catalog::{CatalogError, CoordUnit, RawCatalog},
    read::PointingRead,
};

/// The number of columns in [`PointingStack::to_array`].
pub const NUM_STACK_COLUMNS: usize = 9;

#[derive(Error, Debug)]
pub enum CoordsError {
    #[error("The visibility data has no pointings")]
    NoPointings,

    #[error("The phase centre of pointing {pointing} is not finite")]
    NonFinitePhaseCentre { pointing: usize },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// A catalogue source that is inside a pointing's primary beam.
#[derive(Debug, Clone, Copy)]
pub struct StackPoint {
    /// The index of this source in the raw catalogue.
    pub source_index: usize,

    /// Right ascension \[radians\].
    pub x: f64,
    /// Declination \[radians\].
    pub y: f64,
    pub weight: f64,

    /// Offset from the phase centre towards increasing right ascension on
    /// the tangent plane \[radians\]. Near the phase centre this is the RA
    /// difference scaled by the cosine of the phase centre's declination.
    pub dx: f64,
    /// Offset from the phase centre towards the north celestial pole on the
    /// tangent plane \[radians\]. `hypot(dx, dy)` is the angular distance to
    /// the phase centre.
    pub dy: f64,

    /// Direction cosines relative to the phase centre. `n` is the line-of-sight
    /// component and is 1 at the phase centre.
    pub lmn: LMN,
}

/// All of the sources that are usable for a single pointing, in catalogue
/// order.
#[derive(Debug, Clone)]
pub struct PointingStack {
    pub phase_centre: RADec,
    pub points: Vec<StackPoint>,
}

impl PointingStack {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn source_indices(&self) -> Vec<usize> {
        self.points.iter().map(|p| p.source_index).collect()
    }

    pub fn x(&self) -> Vec<f64> {
        self.column(|p| p.x)
    }

    pub fn y(&self) -> Vec<f64> {
        self.column(|p| p.y)
    }

    pub fn weight(&self) -> Vec<f64> {
        self.column(|p| p.weight)
    }

    pub fn dx(&self) -> Vec<f64> {
        self.column(|p| p.dx)
    }

    pub fn dy(&self) -> Vec<f64> {
        self.column(|p| p.dy)
    }

    pub fn omega_x(&self) -> Vec<f64> {
        self.column(|p| p.lmn.l)
    }

    pub fn omega_y(&self) -> Vec<f64> {
        self.column(|p| p.lmn.m)
    }

    pub fn omega_z(&self) -> Vec<f64> {
        self.column(|p| p.lmn.n)
    }

    fn column<F: Fn(&StackPoint) -> f64>(&self, f: F) -> Vec<f64> {
        self.points.iter().map(f).collect()
    }

    /// All points as a `[point][column]` array. The columns are source index,
    /// x, y, weight, dx, dy, omega_x, omega_y and omega_z.
    pub fn to_array(&self) -> Array2<f64> {
        let mut array = Array2::zeros((self.points.len(), NUM_STACK_COLUMNS));
        for (mut row, p) in array.outer_iter_mut().zip(self.points.iter()) {
            row.assign(&arr1(&[
                p.source_index as f64,
                p.x,
                p.y,
                p.weight,
                p.dx,
                p.dy,
                p.lmn.l,
                p.lmn.m,
                p.lmn.n,
            ]));
        }
        array
    }
}

/// The raw catalogue to be stacked and, once [`Coords::compute_coords`] has
/// been run, its coordinates relative to each pointing.
#[derive(Debug, Clone)]
pub struct Coords {
    catalog: RawCatalog,

    /// One entry per pointing. Empty until coordinates are computed.
    pointings: Vec<PointingStack>,

    /// The number of catalogue sources inside the primary beam of at least
    /// one pointing.
    num_visible: usize,
}

impl Coords {
    pub fn new(catalog: RawCatalog) -> Coords {
        Coords {
            catalog,
            pointings: vec![],
            num_visible: 0,
        }
    }

    /// Read a catalogue file; see [`RawCatalog::read`].
    pub fn from_file<P: AsRef<Path>>(file: P, unit: CoordUnit) -> Result<Coords, CoordsError> {
        Ok(Coords::new(RawCatalog::read(file, unit)?))
    }

    /// Use explicit catalogue columns. Positions must be in radians.
    pub fn from_arrays(x: Vec<f64>, y: Vec<f64>, weight: Vec<f64>) -> Result<Coords, CoordsError> {
        Ok(Coords::new(RawCatalog::new(x, y, weight)?))
    }

    pub fn compute_coords(
        &mut self,
        pointings: &dyn PointingRead,
        beam: &dyn PrimaryBeam,
    ) -> Result<(), CoordsError> {
        self.compute_coords_with_progress(pointings, beam, None)
    }

    /// Work out which catalogue sources are inside the primary beam of each
    /// pointing, and their coordinates relative to that pointing. Pointings
    /// are handled in parallel. Any previous results are discarded, including
    /// when an error is returned.
    pub fn compute_coords_with_progress(
        &mut self,
        pointings: &dyn PointingRead,
        beam: &dyn PrimaryBeam,
        progress_bar: Option<ProgressBar>,
    ) -> Result<(), CoordsError> {
        self.pointings.clear();
        self.num_visible = 0;

        let num_pointings = pointings.num_pointings();
        if num_pointings == 0 {
            return Err(CoordsError::NoPointings);
        }
        let phase_centres = (0..num_pointings)
            .map(|pointing| {
                let pc = pointings.phase_centre(pointing);
                if pc.ra.is_finite() && pc.dec.is_finite() {
                    Ok(pc)
                } else {
                    Err(CoordsError::NonFinitePhaseCentre { pointing })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            "Computing coordinates of {} sources for {num_pointings} pointings",
            self.catalog.len()
        );

        let progress_bar = progress_bar.unwrap_or_else(ProgressBar::hidden);
        let stacks: Vec<PointingStack> = phase_centres
            .into_par_iter()
            .progress_with(progress_bar)
            .map(|phase_centre| select_points(&self.catalog, phase_centre, beam))
            .collect();

        let mut visible = vec![false; self.catalog.len()];
        for (i_pointing, stack) in stacks.iter().enumerate() {
            trace!("Pointing {i_pointing}: {} sources in the beam", stack.len());
            if stack.is_empty() {
                warn!("No sources are inside the primary beam of pointing {i_pointing}");
            }
            for p in &stack.points {
                visible[p.source_index] = true;
            }
        }
        self.num_visible = visible.into_iter().filter(|&v| v).count();
        self.pointings = stacks;
        debug!(
            "{} of {} sources are visible in at least one pointing",
            self.num_visible,
            self.catalog.len()
        );

        Ok(())
    }

    pub fn raw(&self) -> &RawCatalog {
        &self.catalog
    }

    /// The number of pointings coordinates were computed for; 0 before
    /// [`Coords::compute_coords`] succeeds.
    pub fn num_pointings(&self) -> usize {
        self.pointings.len()
    }

    pub fn pointings(&self) -> &[PointingStack] {
        &self.pointings
    }

    pub fn pointing(&self, pointing: usize) -> Option<&PointingStack> {
        self.pointings.get(pointing)
    }

    /// The number of sources inside the beam of `pointing`. Pointings that
    /// don't exist have none.
    pub fn num_stack_points(&self, pointing: usize) -> usize {
        self.pointing(pointing).map(PointingStack::len).unwrap_or(0)
    }

    pub fn num_stack_points_visible(&self) -> usize {
        self.num_visible
    }
}

fn select_points(
    catalog: &RawCatalog,
    phase_centre: RADec,
    beam: &dyn PrimaryBeam,
) -> PointingStack {
    let points = catalog
        .x()
        .iter()
        .zip(catalog.y())
        .zip(catalog.weight())
        .enumerate()
        .filter_map(|(source_index, ((&x, &y), &weight))| {
            let lmn = RADec::from_radians(x, y).to_lmn(phase_centre);
            let (dx, dy) = offset(lmn);
            if !beam.is_inside_beam(dx, dy) {
                return None;
            }
            Some(StackPoint {
                source_index,
                x,
                y,
                weight,
                dx,
                dy,
                lmn,
            })
        })
        .collect();

    PointingStack {
        phase_centre,
        points,
    }
}

/// The offset of `lmn` from its phase centre on the zenithal equidistant
/// (ARC) tangent plane \[radians\]. The offset points the same way as (`l`,
/// `m`) and its length is the great-circle distance to the phase centre, so
/// near the centre `dx` is the RA difference foreshortened by the cosine of
/// the phase centre's declination and `dy` is the declination difference.
fn offset(lmn: LMN) -> (f64, f64) {
    let sin_sep = lmn.l.hypot(lmn.m);
    if sin_sep == 0.0 {
        // On axis, or exactly opposite it.
        return if lmn.n >= 0.0 { (0.0, 0.0) } else { (PI, 0.0) };
    }
    let scale = sin_sep.atan2(lmn.n) / sin_sep;
    (lmn.l * scale, lmn.m * scale)
}
