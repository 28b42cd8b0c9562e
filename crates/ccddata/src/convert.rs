//! Conversion between [`CcdData`] and the FITS container.

use log::{debug, warn};
use ndarray::ArrayD;

use crate::ccddata::CcdData;
use crate::error::{Error, Result};
use crate::hdu::{is_structural, Hdu, HduList};
use crate::header::Header;
use crate::meta::Meta;
use crate::pixel::{PixelData, Pixel};
use crate::unit::Unit;
use crate::value::HeaderValue;

/// How [`from_fits_with`] interprets the header.
#[derive(Debug, Clone, PartialEq)]
pub struct FitsReadOptions {
    unit: Option<Unit>,
    unit_from_header: bool,
    apply_scaling: bool,
}

impl Default for FitsReadOptions {
    fn default() -> Self {
        FitsReadOptions {
            unit: None,
            unit_from_header: false,
            apply_scaling: true,
        }
    }
}

impl FitsReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the image unit, ignoring `BUNIT`.
    pub fn unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Take the unit from the `BUNIT` keyword.
    pub fn unit_from_header(mut self, enabled: bool) -> Self {
        self.unit_from_header = enabled;
        self
    }

    /// Apply `BSCALE`/`BZERO` to the stored pixels. On by default.
    pub fn apply_scaling(mut self, enabled: bool) -> Self {
        self.apply_scaling = enabled;
        self
    }
}

/// Build an image from a single-HDU container with default options.
///
/// The metadata is the HDU's header, card for card. No unit or uncertainty
/// is inferred.
pub fn from_fits<T: Pixel>(hdus: &HduList) -> Result<CcdData<T>> {
    from_fits_with(hdus, &FitsReadOptions::default())
}

/// Build an image from a single-HDU container.
///
/// Fails with [`Error::AmbiguousHdus`] for multi-HDU input,
/// [`Error::EmptyHduList`] for an empty container and [`Error::MissingData`]
/// when the HDU has no image array.
///
/// Scaled values that `T` cannot hold saturate at its bounds, with a
/// warning; read as `f64` to keep the physical values.
pub fn from_fits_with<T: Pixel>(hdus: &HduList, options: &FitsReadOptions) -> Result<CcdData<T>> {
    let hdu = match hdus.len() {
        0 => return Err(Error::EmptyHduList),
        1 => hdus.primary().ok_or(Error::EmptyHduList)?,
        n => return Err(Error::AmbiguousHdus(n)),
    };
    let (shape, pixels) = hdu.image().ok_or(Error::MissingData)?;
    let mut meta = Meta::from_header(hdu.header().clone());

    let scaling = if options.apply_scaling {
        scaling(hdu.header())
    } else {
        None
    };
    let values: Vec<T> = match scaling {
        Some((bscale, bzero)) => {
            debug!("applying BSCALE={bscale} BZERO={bzero}");
            meta.remove("BSCALE");
            meta.remove("BZERO");
            let (values, clipped) = scale_pixels(pixels, bscale, bzero);
            if !T::DTYPE.is_float() {
                warn!(
                    "BSCALE/BZERO applied to {} pixels; fractions truncate toward zero",
                    T::DTYPE
                );
            }
            if clipped > 0 {
                warn!("{clipped} scaled pixels do not fit in {} and were saturated", T::DTYPE);
            }
            values
        }
        None => convert_pixels(pixels),
    };
    let data = ArrayD::from_shape_vec(shape.to_vec(), values).map_err(|_| {
        Error::ShapeMismatch {
            expected: shape.to_vec(),
            found: vec![pixels.len()],
        }
    })?;

    let unit = match options.unit {
        Some(unit) => unit,
        None if options.unit_from_header => header_unit(hdu.header()),
        None => Unit::Dimensionless,
    };

    debug!(
        "read {:?} {} image, unit {unit}, {} cards",
        shape,
        T::DTYPE,
        meta.len()
    );
    CcdData::builder().data(data).unit(unit).meta(meta).build()
}

/// Wrap an image as a single primary HDU.
///
/// Layout cards are generated from the array; the remaining metadata
/// follows in order. A non-dimensionless unit is written as `BUNIT`.
pub fn to_fits<T: Pixel>(ccd: &CcdData<T>) -> Result<HduList> {
    let pixels = T::into_pixel_data(ccd.data().iter().copied().collect());
    let mut hdu = Hdu::primary_image(pixels, ccd.shape())?;
    let bunit = ccd.unit().bunit();
    let header = hdu.header_mut();
    for card in ccd.header() {
        if is_structural(&card.keyword) || (bunit.is_some() && card.keyword == "BUNIT") {
            continue;
        }
        header.append(card.clone());
    }
    if let Some(bunit) = bunit {
        header.set_with_comment("BUNIT", bunit, "physical unit of the array")?;
    }
    debug!(
        "wrapped {:?} {} image in primary HDU with {} cards",
        ccd.shape(),
        ccd.dtype(),
        header.len()
    );
    Ok(HduList::from(vec![hdu]))
}

/// `(BSCALE, BZERO)` when either is present and not the identity.
fn scaling(header: &Header) -> Option<(f64, f64)> {
    let bscale = header.get("BSCALE").and_then(HeaderValue::as_f64).unwrap_or(1.0);
    let bzero = header.get("BZERO").and_then(HeaderValue::as_f64).unwrap_or(0.0);
    if bscale == 1.0 && bzero == 0.0 {
        None
    } else {
        Some((bscale, bzero))
    }
}

/// Apply `v * bscale + bzero` to every pixel. Returns the pixels and how
/// many saturated at the bounds of an integer `T`.
fn scale_pixels<T: Pixel>(pixels: &PixelData, bscale: f64, bzero: f64) -> (Vec<T>, usize) {
    let mut clipped = 0;
    let values = pixels
        .to_f64()
        .into_iter()
        .map(|v| {
            let scaled = v * bscale + bzero;
            let pixel = T::from_f64(scaled);
            if !T::DTYPE.is_float() && pixel.to_f64() != scaled.trunc() {
                clipped += 1;
            }
            pixel
        })
        .collect();
    (values, clipped)
}

fn convert_pixels<T: Pixel>(pixels: &PixelData) -> Vec<T> {
    let (values, lossy) = T::from_pixel_data(pixels);
    if lossy {
        warn!(
            "converting {} pixels to {} may lose precision",
            pixels.dtype(),
            T::DTYPE
        );
    }
    values
}

fn header_unit(header: &Header) -> Unit {
    let Some(bunit) = header.get("BUNIT") else {
        return Unit::Dimensionless;
    };
    match bunit.as_str().and_then(Unit::from_bunit) {
        Some(unit) => unit,
        None => {
            warn!("unrecognized BUNIT {bunit:?}; treating image as dimensionless");
            Unit::Dimensionless
        }
    }
}
