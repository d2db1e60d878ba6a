//! Catalogues of positions to be stacked.

use std::{
    f64::consts::FRAC_PI_2,
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use itertools::Itertools;
use log::{debug, trace};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Catalogue file '{0}' does not exist")]
    FileNotFound(PathBuf),

    #[error("{file}:{line}: expected three numeric fields (x y weight), got '{content}'")]
    Parse {
        file: PathBuf,
        /// 1-indexed line number.
        line: usize,
        content: String,
    },

    #[error("Catalogue columns have different lengths (x: {x}, y: {y}, weight: {weight})")]
    LengthMismatch { x: usize, y: usize, weight: usize },

    #[error("Catalogue entry {index} is not finite")]
    NonFinite { index: usize },

    #[error("Catalogue entry {index} has a declination outside of [-90, 90] degrees ({dec} rad)")]
    DecOutOfRange { index: usize, dec: f64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The angular unit of the positions in a catalogue file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordUnit {
    #[default]
    Degrees,
    Radians,
}

impl CoordUnit {
    fn to_radians(self, value: f64) -> f64 {
        match self {
            CoordUnit::Degrees => value.to_radians(),
            CoordUnit::Radians => value,
        }
    }
}

/// The unfiltered positions and weights of the sources to be stacked. The
/// three columns always have the same length, and index `i` of each refers to
/// the same source.
#[derive(Debug, Clone, Default)]
pub struct RawCatalog {
    /// Right ascensions \[radians\].
    x: Vec<f64>,
    /// Declinations \[radians\].
    y: Vec<f64>,
    /// Stacking weights.
    weight: Vec<f64>,
}

impl RawCatalog {
    /// Build a catalogue from explicit columns. Positions must be in radians.
    pub fn new(x: Vec<f64>, y: Vec<f64>, weight: Vec<f64>) -> Result<RawCatalog, CatalogError> {
        if x.len() != y.len() || x.len() != weight.len() {
            return Err(CatalogError::LengthMismatch {
                x: x.len(),
                y: y.len(),
                weight: weight.len(),
            });
        }

        for (index, ((&x, &y), &w)) in x.iter().zip(y.iter()).zip(weight.iter()).enumerate() {
            if !(x.is_finite() && y.is_finite() && w.is_finite()) {
                return Err(CatalogError::NonFinite { index });
            }
            if y.abs() > FRAC_PI_2 {
                return Err(CatalogError::DecOutOfRange { index, dec: y });
            }
        }

        Ok(RawCatalog { x, y, weight })
    }

    /// Read a catalogue file. Each line holds `x y weight`, separated by
    /// whitespace and/or commas; `unit` is the unit of `x` and `y`. Empty lines
    /// and lines starting with '#' are ignored, anything else that isn't three
    /// numbers is an error.
    pub fn read<P: AsRef<Path>>(file: P, unit: CoordUnit) -> Result<RawCatalog, CatalogError> {
        let file = file.as_ref();
        debug!("Reading catalogue: {}", file.display());
        if !file.exists() {
            return Err(CatalogError::FileNotFound(file.to_path_buf()));
        }

        let reader = BufReader::new(File::open(file)?);
        let mut x = vec![];
        let mut y = vec![];
        let mut weight = vec![];
        for (i_line, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let parse_error = || CatalogError::Parse {
                file: file.to_path_buf(),
                line: i_line + 1,
                content: line.clone(),
            };
            // A comma separates exactly two fields; "1,,2" has an empty one.
            let mut fields = vec![];
            for piece in trimmed.split(',') {
                let num_fields = fields.len();
                fields.extend(piece.split_whitespace());
                if fields.len() == num_fields {
                    return Err(parse_error());
                }
            }
            let (x_str, y_str, w_str) = fields
                .into_iter()
                .collect_tuple()
                .ok_or_else(parse_error)?;
            let parse = |s: &str| s.parse::<f64>().map_err(|_| parse_error());
            x.push(unit.to_radians(parse(x_str)?));
            y.push(unit.to_radians(parse(y_str)?));
            weight.push(parse(w_str)?);
        }
        trace!("Read {} catalogue entries", x.len());

        RawCatalog::new(x, y, weight)
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn weight(&self) -> &[f64] {
        &self.weight
    }
}
