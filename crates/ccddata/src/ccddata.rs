//! The CCD image container.

use log::debug;
use ndarray::{Array, ArrayD, ArrayViewMutD, Dimension};

use crate::error::{Error, Result};
use crate::header::Header;
use crate::meta::{Meta, MetaSource};
use crate::pixel::{DType, Pixel};
use crate::uncertainty::{Uncertainty, UncertaintyValue, VarianceUncertainty};
use crate::unit::Unit;

/// A CCD image: pixel array, physical unit, FITS metadata and an optional
/// per-pixel uncertainty.
///
/// The array's shape is fixed for the lifetime of the value. Metadata, unit
/// and uncertainty may be replaced; a failed replacement leaves the previous
/// value in place.
#[derive(Debug, Clone)]
pub struct CcdData<T: Pixel = f64> {
    data: ArrayD<T>,
    unit: Unit,
    meta: Meta,
    uncertainty: Option<Box<dyn Uncertainty<T>>>,
}

/// Builder for [`CcdData`], mirroring its optional construction arguments.
#[derive(Debug)]
pub struct CcdDataBuilder<T: Pixel> {
    data: Option<ArrayD<T>>,
    unit: Unit,
    meta: MetaSource,
    uncertainty: Option<UncertaintyValue<T>>,
}

impl<T: Pixel> Default for CcdDataBuilder<T> {
    fn default() -> Self {
        CcdDataBuilder {
            data: None,
            unit: Unit::Dimensionless,
            meta: MetaSource::Absent,
            uncertainty: None,
        }
    }
}

impl<T: Pixel> CcdDataBuilder<T> {
    /// Pixel array of any dimensionality.
    pub fn data<D: Dimension>(mut self, data: Array<T, D>) -> Self {
        self.data = Some(data.into_dyn());
        self
    }

    pub fn unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    /// Metadata from a mapping or a header; see [`MetaSource`].
    pub fn meta(mut self, meta: impl Into<MetaSource>) -> Self {
        self.meta = meta.into();
        self
    }

    pub fn uncertainty(mut self, uncertainty: impl Into<UncertaintyValue<T>>) -> Self {
        self.uncertainty = Some(uncertainty.into());
        self
    }

    /// Validate and assemble the image.
    ///
    /// Fails with [`Error::MissingData`] when no array was given or it has no
    /// elements, [`Error::InvalidMeta`] for an unsupported metadata source,
    /// and with the [`CcdData::set_uncertainty`] errors for the uncertainty.
    pub fn build(self) -> Result<CcdData<T>> {
        let data = self.data.ok_or(Error::MissingData)?;
        if data.is_empty() {
            return Err(Error::MissingData);
        }
        let mut ccd = CcdData {
            data,
            unit: self.unit,
            meta: Meta::normalize(self.meta)?,
            uncertainty: None,
        };
        if let Some(uncertainty) = self.uncertainty {
            ccd.set_uncertainty(uncertainty)?;
        }
        Ok(ccd)
    }
}

impl<T: Pixel> CcdData<T> {
    pub fn builder() -> CcdDataBuilder<T> {
        CcdDataBuilder::default()
    }

    /// Unitless image with empty metadata.
    pub fn new<D: Dimension>(data: Array<T, D>) -> Result<CcdData<T>> {
        CcdData::builder().data(data).build()
    }

    pub fn data(&self) -> &ArrayD<T> {
        &self.data
    }

    /// Mutable pixel access; the shape cannot change.
    pub fn data_mut(&mut self) -> ArrayViewMutD<'_, T> {
        self.data.view_mut()
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Number of pixels.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn set_unit(&mut self, unit: Unit) {
        self.unit = unit;
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    /// Replace the metadata from a new source.
    pub fn set_meta(&mut self, meta: impl Into<MetaSource>) -> Result<()> {
        self.meta = Meta::normalize(meta)?;
        Ok(())
    }

    /// The metadata viewed as a FITS header. Same storage as [`Self::meta`].
    pub fn header(&self) -> &Header {
        self.meta.as_header()
    }

    /// Replace the metadata with every card of `header`.
    pub fn set_header(&mut self, header: Header) {
        self.meta = Meta::from_header(header);
    }

    pub fn uncertainty(&self) -> Option<&dyn Uncertainty<T>> {
        self.uncertainty.as_deref()
    }

    /// Attach an uncertainty.
    ///
    /// Fails with [`Error::InvalidUncertainty`] unless `value` provides the
    /// [`Uncertainty`] capability, and with [`Error::ShapeMismatch`] when its
    /// array does not have the image's shape.
    pub fn set_uncertainty(&mut self, value: impl Into<UncertaintyValue<T>>) -> Result<()> {
        let uncertainty = value.into().into_uncertainty()?;
        if uncertainty.shape() != self.shape() {
            return Err(Error::ShapeMismatch {
                expected: self.shape().to_vec(),
                found: uncertainty.shape().to_vec(),
            });
        }
        self.uncertainty = Some(uncertainty);
        Ok(())
    }

    /// Detach and return the uncertainty.
    pub fn clear_uncertainty(&mut self) -> Option<Box<dyn Uncertainty<T>>> {
        self.uncertainty.take()
    }

    /// Attach a variance estimate of `data / gain` per pixel.
    ///
    /// This is the Poisson shot-noise approximation: it assumes the pixel
    /// values are electron counts and that shot noise dominates, with read
    /// noise and dark current negligible. It is only meaningful for images in
    /// [`Unit::Electron`]; any other unit fails with [`Error::UnitMismatch`].
    /// The gain must be finite and positive.
    ///
    /// The variance has the image's shape and element type; integer images
    /// are truncated after the division.
    pub fn create_variance(&mut self, gain: f64) -> Result<()> {
        if self.unit != Unit::Electron {
            return Err(Error::UnitMismatch {
                expected: Unit::Electron,
                found: self.unit,
            });
        }
        if !gain.is_finite() || gain <= 0.0 {
            return Err(Error::InvalidGain(gain));
        }
        let variance = self.data.mapv(|v| T::from_f64(v.to_f64() / gain));
        debug!("created variance for {:?} image with gain {gain}", self.shape());
        self.uncertainty = Some(Box::new(VarianceUncertainty::new(variance)));
        Ok(())
    }

    /// Split into array, unit, metadata and uncertainty.
    pub fn into_parts(self) -> (ArrayD<T>, Unit, Meta, Option<Box<dyn Uncertainty<T>>>) {
        (self.data, self.unit, self.meta, self.uncertainty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::uncertainty::{StdDevUncertainty, UncertaintyKind};
    use approx::assert_relative_eq;
    use ndarray::{arr2, Array2, Array3};

    #[test]
    fn builder_without_data_fails() {
        let err = CcdData::<f64>::builder().build().unwrap_err();
        assert!(matches!(err, Error::MissingData));
        assert_eq!(err.kind(), ErrorKind::Type);
    }

    #[test]
    fn empty_array_fails() {
        let err = CcdData::new(Array2::<f32>::zeros((0, 4))).unwrap_err();
        assert!(matches!(err, Error::MissingData));
    }

    #[test]
    fn derived_properties() {
        let ccd = CcdData::new(Array2::<i16>::zeros((3, 7))).unwrap();
        assert_eq!(ccd.shape(), &[3, 7]);
        assert_eq!(ccd.size(), 21);
        assert_eq!(ccd.ndim(), 2);
        assert_eq!(ccd.dtype(), DType::I16);
        assert_eq!(ccd.unit(), Unit::Dimensionless);
        assert!(ccd.meta().is_empty());
        assert!(ccd.uncertainty().is_none());
    }

    #[test]
    fn three_dimensional_data() {
        let ccd = CcdData::new(Array3::<u8>::zeros((2, 3, 4))).unwrap();
        assert_eq!(ccd.shape(), &[2, 3, 4]);
        assert_eq!(ccd.size(), 24);
    }

    #[test]
    fn header_and_meta_share_storage() {
        let mut ccd = CcdData::new(Array2::<f64>::ones((5, 5))).unwrap();
        ccd.meta_mut().insert("observer", "Edwin Hubble").unwrap();
        assert_eq!(ccd.header()["OBSERVER"], "Edwin Hubble");
        assert_eq!(ccd.meta()["observer"], "Edwin Hubble");
    }

    #[test]
    fn failed_set_meta_keeps_previous() {
        let mut ccd = CcdData::builder()
            .data(Array2::<f64>::ones((2, 2)))
            .meta([("OBSERVER", "Edwin Hubble")])
            .build()
            .unwrap();
        assert!(ccd.set_meta("not a header").is_err());
        assert_eq!(ccd.meta()["OBSERVER"], "Edwin Hubble");
    }

    #[test]
    fn set_meta_replaces_wholesale() {
        let mut ccd = CcdData::builder()
            .data(Array2::<f64>::ones((2, 2)))
            .meta([("OBSERVER", "Edwin Hubble")])
            .build()
            .unwrap();
        ccd.set_meta([("EXPTIME", 30.0)]).unwrap();
        assert!(ccd.meta().get("OBSERVER").is_none());
        assert_eq!(ccd.meta()["EXPTIME"], 30.0);
    }

    #[test]
    fn uncertainty_through_builder() {
        let ccd = CcdData::builder()
            .data(Array2::<f64>::ones((2, 2)))
            .uncertainty(StdDevUncertainty::new(Array2::<f64>::ones((2, 2))))
            .build()
            .unwrap();
        assert_eq!(ccd.uncertainty().unwrap().kind(), UncertaintyKind::StdDev);
    }

    #[test]
    fn builder_rejects_scalar_uncertainty() {
        let err = CcdData::builder()
            .data(Array2::<f64>::ones((2, 2)))
            .uncertainty(0.5)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidUncertainty(_)));
    }

    #[test]
    fn uncertainty_shape_must_match() {
        let mut ccd = CcdData::new(Array2::<f64>::ones((4, 4))).unwrap();
        let err = ccd
            .set_uncertainty(VarianceUncertainty::new(Array2::<f64>::ones((2, 2))))
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
        assert_eq!(err.kind(), ErrorKind::Value);
        assert!(ccd.uncertainty().is_none());
    }

    #[test]
    fn failed_uncertainty_keeps_previous() {
        let mut ccd = CcdData::new(Array2::<f64>::ones((2, 2))).unwrap();
        ccd.set_uncertainty(VarianceUncertainty::new(Array2::<f64>::ones((2, 2))))
            .unwrap();
        assert!(ccd.set_uncertainty(10).is_err());
        assert_eq!(
            ccd.uncertainty().unwrap().kind(),
            UncertaintyKind::Variance
        );
        assert!(ccd.clear_uncertainty().is_some());
        assert!(ccd.uncertainty().is_none());
    }

    #[test]
    fn variance_is_data_over_gain() {
        let mut ccd = CcdData::builder()
            .data(arr2(&[[10.0f64, 20.0], [30.0, 40.0]]))
            .unit(Unit::Electron)
            .build()
            .unwrap();
        ccd.create_variance(4.0).unwrap();
        let var = ccd.uncertainty().unwrap();
        assert_eq!(var.kind(), UncertaintyKind::Variance);
        assert_relative_eq!(var.array()[[0, 0]], 2.5);
        assert_relative_eq!(var.array()[[1, 1]], 10.0);
    }

    #[test]
    fn variance_of_integer_image_keeps_dtype() {
        let mut ccd = CcdData::builder()
            .data(arr2(&[[7i32, 9]]))
            .unit(Unit::Electron)
            .build()
            .unwrap();
        ccd.create_variance(2.0).unwrap();
        let var = ccd.uncertainty().unwrap().array();
        assert_eq!(var[[0, 0]], 3);
        assert_eq!(var[[0, 1]], 4);
    }

    #[test]
    fn variance_requires_electrons() {
        let mut ccd = CcdData::builder()
            .data(Array2::<f64>::ones((3, 3)))
            .unit(Unit::Adu)
            .build()
            .unwrap();
        let err = ccd.create_variance(1.5).unwrap_err();
        assert!(matches!(
            err,
            Error::UnitMismatch {
                expected: Unit::Electron,
                found: Unit::Adu
            }
        ));
    }

    #[test]
    fn variance_rejects_bad_gain() {
        let mut ccd = CcdData::builder()
            .data(Array2::<f64>::ones((3, 3)))
            .unit(Unit::Electron)
            .build()
            .unwrap();
        for gain in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(ccd.create_variance(gain), Err(Error::InvalidGain(_))));
        }
        assert!(ccd.uncertainty().is_none());
    }

    #[test]
    fn data_mut_edits_pixels() {
        let mut ccd = CcdData::new(Array2::<f32>::zeros((2, 2))).unwrap();
        ccd.data_mut()[[1, 0]] = 5.0;
        assert_eq!(ccd.data()[[1, 0]], 5.0);
    }

    #[test]
    fn clone_copies_uncertainty() {
        let mut ccd = CcdData::builder()
            .data(Array2::<f64>::from_elem((2, 2), 8.0))
            .unit(Unit::Electron)
            .build()
            .unwrap();
        ccd.create_variance(2.0).unwrap();
        let copy = ccd.clone();
        assert_eq!(
            copy.uncertainty().unwrap().array(),
            ccd.uncertainty().unwrap().array()
        );
        let (data, unit, _, uncertainty) = copy.into_parts();
        assert_eq!(data.len(), 4);
        assert_eq!(unit, Unit::Electron);
        assert!(uncertainty.is_some());
    }
}
