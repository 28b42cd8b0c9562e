//! CCD images with physical units, FITS metadata and per-pixel uncertainty,
//! plus conversion to and from single-HDU FITS containers.
//!
//! ```no_run
//! use ccddata::{from_fits_with, to_fits, CcdData, FitsReadOptions, HduList};
//!
//! let hdus = HduList::open("frame.fits")?;
//! let mut ccd: CcdData<f64> =
//!     from_fits_with(&hdus, &FitsReadOptions::new().unit_from_header(true))?;
//! ccd.create_variance(1.5)?;
//! to_fits(&ccd)?.write_to("frame-out.fits", true)?;
//! # Ok::<(), ccddata::Error>(())
//! ```

pub mod ccddata;
pub mod convert;
pub mod error;
pub mod hdu;
pub mod header;
pub mod meta;
pub mod pixel;
pub mod uncertainty;
pub mod unit;
pub mod value;

pub use ccddata::{CcdData, CcdDataBuilder};
pub use convert::{from_fits, from_fits_with, to_fits, FitsReadOptions};
pub use error::{Error, ErrorKind, Result};
pub use hdu::{Hdu, HduData, HduList};
pub use header::{Card, Header, BLOCK_SIZE, CARD_SIZE};
pub use meta::{Meta, MetaSource};
pub use pixel::{DType, Pixel, PixelData};
pub use uncertainty::{
    Combine, StdDevUncertainty, Uncertainty, UncertaintyKind, UncertaintyValue,
    VarianceUncertainty,
};
pub use unit::Unit;
pub use value::HeaderValue;
