//! Per-pixel uncertainty attached to a CCD image.
//!
//! [`Uncertainty`] is the capability an image accepts: an array with the
//! image's element type and shape, plus a rule for how the estimate combines
//! when two images are added or subtracted. Propagation assumes the errors
//! of the two operands are independent.

use std::fmt;

use ndarray::{Array, ArrayD, Dimension, Zip};

use crate::error::{Error, Result};
use crate::pixel::Pixel;

/// What the values of an uncertainty array represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UncertaintyKind {
    /// σ² per pixel.
    Variance,
    /// σ per pixel.
    StdDev,
}

/// Arithmetic combination of two images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combine {
    Add,
    Subtract,
}

/// Uncertainty capability.
pub trait Uncertainty<T: Pixel>: fmt::Debug + Send + Sync {
    fn kind(&self) -> UncertaintyKind;

    /// Per-pixel values, same shape and element type as the image.
    fn array(&self) -> &ArrayD<T>;

    fn shape(&self) -> &[usize] {
        self.array().shape()
    }

    fn clone_box(&self) -> Box<dyn Uncertainty<T>>;

    /// Uncertainty of `self_image op other_image`, expressed in the same
    /// kind as `self`.
    fn propagate(
        &self,
        other: &dyn Uncertainty<T>,
        op: Combine,
    ) -> Result<Box<dyn Uncertainty<T>>>;
}

impl<T: Pixel> Clone for Box<dyn Uncertainty<T>> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Variance of any uncertainty, in `f64`.
fn variance_f64<T: Pixel>(u: &dyn Uncertainty<T>) -> ArrayD<f64> {
    match u.kind() {
        UncertaintyKind::Variance => u.array().mapv(|v| v.to_f64()),
        UncertaintyKind::StdDev => u.array().mapv(|s| s.to_f64().powi(2)),
    }
}

/// For sums and differences of independent values the variances add.
fn summed_variance<T: Pixel>(
    a: &dyn Uncertainty<T>,
    b: &dyn Uncertainty<T>,
    op: Combine,
) -> Result<ArrayD<f64>> {
    if a.shape() != b.shape() {
        return Err(Error::ShapeMismatch {
            expected: a.shape().to_vec(),
            found: b.shape().to_vec(),
        });
    }
    let (va, vb) = (variance_f64(a), variance_f64(b));
    let summed = match op {
        Combine::Add | Combine::Subtract => {
            Zip::from(&va).and(&vb).map_collect(|&x, &y| x + y)
        }
    };
    Ok(summed)
}

/// Per-pixel variance σ².
#[derive(Debug, Clone, PartialEq)]
pub struct VarianceUncertainty<T: Pixel> {
    array: ArrayD<T>,
}

impl<T: Pixel> VarianceUncertainty<T> {
    pub fn new<D: Dimension>(array: Array<T, D>) -> Self {
        VarianceUncertainty {
            array: array.into_dyn(),
        }
    }

    pub fn into_array(self) -> ArrayD<T> {
        self.array
    }

    pub fn to_std_dev(&self) -> StdDevUncertainty<T> {
        StdDevUncertainty::new(self.array.mapv(|v| T::from_f64(v.to_f64().sqrt())))
    }
}

impl<T: Pixel> Uncertainty<T> for VarianceUncertainty<T> {
    fn kind(&self) -> UncertaintyKind {
        UncertaintyKind::Variance
    }

    fn array(&self) -> &ArrayD<T> {
        &self.array
    }

    fn clone_box(&self) -> Box<dyn Uncertainty<T>> {
        Box::new(self.clone())
    }

    fn propagate(
        &self,
        other: &dyn Uncertainty<T>,
        op: Combine,
    ) -> Result<Box<dyn Uncertainty<T>>> {
        let var = summed_variance(self, other, op)?;
        Ok(Box::new(VarianceUncertainty::new(var.mapv(T::from_f64))))
    }
}

/// Per-pixel standard deviation σ.
#[derive(Debug, Clone, PartialEq)]
pub struct StdDevUncertainty<T: Pixel> {
    array: ArrayD<T>,
}

impl<T: Pixel> StdDevUncertainty<T> {
    pub fn new<D: Dimension>(array: Array<T, D>) -> Self {
        StdDevUncertainty {
            array: array.into_dyn(),
        }
    }

    pub fn into_array(self) -> ArrayD<T> {
        self.array
    }

    pub fn to_variance(&self) -> VarianceUncertainty<T> {
        VarianceUncertainty::new(self.array.mapv(|s| T::from_f64(s.to_f64().powi(2))))
    }
}

impl<T: Pixel> Uncertainty<T> for StdDevUncertainty<T> {
    fn kind(&self) -> UncertaintyKind {
        UncertaintyKind::StdDev
    }

    fn array(&self) -> &ArrayD<T> {
        &self.array
    }

    fn clone_box(&self) -> Box<dyn Uncertainty<T>> {
        Box::new(self.clone())
    }

    fn propagate(
        &self,
        other: &dyn Uncertainty<T>,
        op: Combine,
    ) -> Result<Box<dyn Uncertainty<T>>> {
        let var = summed_variance(self, other, op)?;
        Ok(Box::new(StdDevUncertainty::new(
            var.mapv(|v| T::from_f64(v.sqrt())),
        )))
    }
}

/// A value offered for assignment as an image's uncertainty.
///
/// Only [`UncertaintyValue::Capable`] is accepted; the other variants exist
/// so that plain numbers and untyped arrays are rejected at assignment
/// with a descriptive error.
#[derive(Debug)]
pub enum UncertaintyValue<T: Pixel> {
    Capable(Box<dyn Uncertainty<T>>),
    /// A plain number.
    Scalar(f64),
    /// An array without a declared meaning (variance or σ).
    BareArray(ArrayD<T>),
}

impl<T: Pixel> UncertaintyValue<T> {
    /// Unwrap the capable object or fail with [`Error::InvalidUncertainty`].
    pub fn into_uncertainty(self) -> Result<Box<dyn Uncertainty<T>>> {
        match self {
            UncertaintyValue::Capable(u) => Ok(u),
            UncertaintyValue::Scalar(_) => Err(Error::InvalidUncertainty("scalar")),
            UncertaintyValue::BareArray(_) => {
                Err(Error::InvalidUncertainty("array without uncertainty kind"))
            }
        }
    }
}

impl<T: Pixel> From<Box<dyn Uncertainty<T>>> for UncertaintyValue<T> {
    fn from(u: Box<dyn Uncertainty<T>>) -> Self {
        UncertaintyValue::Capable(u)
    }
}

impl<T: Pixel> From<VarianceUncertainty<T>> for UncertaintyValue<T> {
    fn from(u: VarianceUncertainty<T>) -> Self {
        UncertaintyValue::Capable(Box::new(u))
    }
}

impl<T: Pixel> From<StdDevUncertainty<T>> for UncertaintyValue<T> {
    fn from(u: StdDevUncertainty<T>) -> Self {
        UncertaintyValue::Capable(Box::new(u))
    }
}

impl<T: Pixel> From<ArrayD<T>> for UncertaintyValue<T> {
    fn from(a: ArrayD<T>) -> Self {
        UncertaintyValue::BareArray(a)
    }
}

macro_rules! scalar_uncertainty_value {
    ($($t:ty),*) => {
        $(
            impl<T: Pixel> From<$t> for UncertaintyValue<T> {
                fn from(v: $t) -> Self {
                    UncertaintyValue::Scalar(v as f64)
                }
            }
        )*
    };
}

scalar_uncertainty_value!(i32, i64, f32, f64);
