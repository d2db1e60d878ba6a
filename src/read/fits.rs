//! Small helpers over `fitsio`, shared by the uvfits reader and FITS beams.

use std::{fmt::Display, path::Path};

use fitsio::{hdu::*, FitsFile};
use thiserror::Error;

/// cfitsio's KEY_NO_EXIST and VALUE_UNDEFINED status codes.
const KEY_MISSING_STATUSES: [i32; 2] = [202, 204];

#[derive(Error, Debug)]
pub enum FitsError {
    #[error("FITS key '{0}' does not exist")]
    MissingKey(String),

    #[error("Couldn't parse FITS key '{key}' (value '{value}')")]
    BadKey { key: String, value: String },

    #[error("Expected an image HDU")]
    NotImage,

    #[error(transparent)]
    Fitsio(#[from] fitsio::errors::Error),
}

/// Open a fits file.
pub(crate) fn fits_open<P: AsRef<Path>>(file: P) -> Result<FitsFile, FitsError> {
    Ok(FitsFile::open(file.as_ref())?)
}

/// Open a fits file's HDU.
pub(crate) fn fits_open_hdu<T: DescribesHdu + Display + Copy>(
    fits_fptr: &mut FitsFile,
    hdu_description: T,
) -> Result<FitsHdu, FitsError> {
    Ok(fits_fptr.hdu(hdu_description)?)
}

/// Given a FITS file pointer, a HDU that belongs to it, and a keyword that may
/// or may not exist, pull out the value of the keyword, parsing it into the
/// desired type.
pub(crate) fn fits_get_optional_key<T: std::str::FromStr>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
) -> Result<Option<T>, FitsError> {
    let unparsed_value: String = match hdu.read_key(fits_fptr, keyword) {
        Ok(key_value) => key_value,
        Err(fitsio::errors::Error::Fits(fe)) if KEY_MISSING_STATUSES.contains(&fe.status) => {
            return Ok(None)
        }
        Err(e) => return Err(e.into()),
    };

    // String values come back with their quotes and padding intact.
    let trimmed = unparsed_value.trim().trim_matches('\'').trim();
    match trimmed.parse() {
        Ok(parsed_value) => Ok(Some(parsed_value)),
        Err(_) => Err(FitsError::BadKey {
            key: keyword.to_string(),
            value: unparsed_value,
        }),
    }
}

/// Given a FITS file pointer, a HDU that belongs to it, and a keyword, pull out
/// the value of the keyword, parsing it into the desired type.
pub(crate) fn fits_get_required_key<T: std::str::FromStr>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
) -> Result<T, FitsError> {
    fits_get_optional_key(fits_fptr, hdu, keyword)?
        .ok_or_else(|| FitsError::MissingKey(keyword.to_string()))
}

/// Given a FITS file pointer and a HDU, read the associated float image. The
/// pixels are returned in FITS order (NAXIS1 varies fastest).
pub(crate) fn fits_get_float_image(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
) -> Result<Vec<f32>, FitsError> {
    match &hdu.info {
        HduInfo::ImageInfo { .. } => Ok(hdu.read_image(fits_fptr)?),
        _ => Err(FitsError::NotImage),
    }
}
