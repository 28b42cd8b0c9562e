//! Pixel element types and their FITS big-endian encoding.

use std::fmt;

use bytemuck::pod_collect_to_vec;

use crate::error::{Error, Result};

/// Element type of a pixel array, one per FITS `BITPIX` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    U8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl DType {
    pub fn bitpix(self) -> i64 {
        match self {
            DType::U8 => 8,
            DType::I16 => 16,
            DType::I32 => 32,
            DType::I64 => 64,
            DType::F32 => -32,
            DType::F64 => -64,
        }
    }

    pub fn from_bitpix(bitpix: i64) -> Result<DType> {
        match bitpix {
            8 => Ok(DType::U8),
            16 => Ok(DType::I16),
            32 => Ok(DType::I32),
            64 => Ok(DType::I64),
            -32 => Ok(DType::F32),
            -64 => Ok(DType::F64),
            other => Err(Error::InvalidBitpix(other)),
        }
    }

    pub fn byte_size(self) -> usize {
        (self.bitpix().unsigned_abs() / 8) as usize
    }

    pub fn is_float(self) -> bool {
        matches!(self, DType::F32 | DType::F64)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::U8 => "uint8",
            DType::I16 => "int16",
            DType::I32 => "int32",
            DType::I64 => "int64",
            DType::F32 => "float32",
            DType::F64 => "float64",
        };
        f.write_str(name)
    }
}

/// A flat pixel buffer tagged with its element type.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelData {
    U8(Vec<u8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl PixelData {
    pub fn dtype(&self) -> DType {
        match self {
            PixelData::U8(_) => DType::U8,
            PixelData::I16(_) => DType::I16,
            PixelData::I32(_) => DType::I32,
            PixelData::I64(_) => DType::I64,
            PixelData::F32(_) => DType::F32,
            PixelData::F64(_) => DType::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PixelData::U8(v) => v.len(),
            PixelData::I16(v) => v.len(),
            PixelData::I32(v) => v.len(),
            PixelData::I64(v) => v.len(),
            PixelData::F32(v) => v.len(),
            PixelData::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every pixel widened to `f64`.
    pub fn to_f64(&self) -> Vec<f64> {
        match self {
            PixelData::U8(v) => v.iter().map(|&x| x as f64).collect(),
            PixelData::I16(v) => v.iter().map(|&x| x as f64).collect(),
            PixelData::I32(v) => v.iter().map(|&x| x as f64).collect(),
            PixelData::I64(v) => v.iter().map(|&x| x as f64).collect(),
            PixelData::F32(v) => v.iter().map(|&x| x as f64).collect(),
            PixelData::F64(v) => v.clone(),
        }
    }

    /// Decode big-endian FITS bytes holding a whole number of pixels.
    pub fn from_be_bytes(dtype: DType, raw: &[u8]) -> Result<PixelData> {
        if raw.len() % dtype.byte_size() != 0 {
            return Err(Error::UnexpectedEof);
        }
        let data = match dtype {
            DType::U8 => PixelData::U8(raw.to_vec()),
            DType::I16 => {
                let mut v: Vec<i16> = pod_collect_to_vec(raw);
                v.iter_mut().for_each(|x| *x = i16::from_be(*x));
                PixelData::I16(v)
            }
            DType::I32 => {
                let mut v: Vec<i32> = pod_collect_to_vec(raw);
                v.iter_mut().for_each(|x| *x = i32::from_be(*x));
                PixelData::I32(v)
            }
            DType::I64 => {
                let mut v: Vec<i64> = pod_collect_to_vec(raw);
                v.iter_mut().for_each(|x| *x = i64::from_be(*x));
                PixelData::I64(v)
            }
            DType::F32 => {
                let mut v: Vec<f32> = pod_collect_to_vec(raw);
                v.iter_mut()
                    .for_each(|x| *x = f32::from_bits(u32::from_be(x.to_bits())));
                PixelData::F32(v)
            }
            DType::F64 => {
                let mut v: Vec<f64> = pod_collect_to_vec(raw);
                v.iter_mut()
                    .for_each(|x| *x = f64::from_bits(u64::from_be(x.to_bits())));
                PixelData::F64(v)
            }
        };
        Ok(data)
    }

    /// Encode as big-endian FITS bytes, without block padding.
    pub fn to_be_bytes(&self) -> Vec<u8> {
        match self {
            PixelData::U8(v) => v.clone(),
            PixelData::I16(v) => v.iter().flat_map(|x| x.to_be_bytes()).collect(),
            PixelData::I32(v) => v.iter().flat_map(|x| x.to_be_bytes()).collect(),
            PixelData::I64(v) => v.iter().flat_map(|x| x.to_be_bytes()).collect(),
            PixelData::F32(v) => v.iter().flat_map(|x| x.to_be_bytes()).collect(),
            PixelData::F64(v) => v.iter().flat_map(|x| x.to_be_bytes()).collect(),
        }
    }
}

/// Numeric element types a CCD image can hold.
///
/// Conversions between element types use Rust `as` semantics: floats
/// truncate toward zero and saturate at the integer bounds.
pub trait Pixel: Copy + PartialEq + fmt::Debug + Send + Sync + 'static {
    const DTYPE: DType;

    fn from_f64(v: f64) -> Self;
    fn to_f64(self) -> f64;

    /// Wrap a buffer of this type.
    fn into_pixel_data(pixels: Vec<Self>) -> PixelData;

    /// Convert a buffer of any type. Returns the pixels and whether the
    /// conversion could lose information.
    fn from_pixel_data(data: &PixelData) -> (Vec<Self>, bool);
}

macro_rules! impl_pixel {
    ($t:ty, $variant:ident) => {
        impl Pixel for $t {
            const DTYPE: DType = DType::$variant;

            fn from_f64(v: f64) -> Self {
                v as $t
            }

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn into_pixel_data(pixels: Vec<Self>) -> PixelData {
                PixelData::$variant(pixels)
            }

            #[allow(unreachable_patterns)]
            fn from_pixel_data(data: &PixelData) -> (Vec<Self>, bool) {
                let lossy = is_lossy(data.dtype(), Self::DTYPE);
                let pixels = match data {
                    PixelData::$variant(v) => v.clone(),
                    PixelData::U8(v) => v.iter().map(|&x| x as $t).collect(),
                    PixelData::I16(v) => v.iter().map(|&x| x as $t).collect(),
                    PixelData::I32(v) => v.iter().map(|&x| x as $t).collect(),
                    PixelData::I64(v) => v.iter().map(|&x| x as $t).collect(),
                    PixelData::F32(v) => v.iter().map(|&x| x as $t).collect(),
                    PixelData::F64(v) => v.iter().map(|&x| x as $t).collect(),
                };
                (pixels, lossy)
            }
        }
    };
}

impl_pixel!(u8, U8);
impl_pixel!(i16, I16);
impl_pixel!(i32, I32);
impl_pixel!(i64, I64);
impl_pixel!(f32, F32);
impl_pixel!(f64, F64);

/// Whether converting `from` into `to` can change a value.
fn is_lossy(from: DType, to: DType) -> bool {
    use DType::*;
    let exact = match (from, to) {
        (a, b) if a == b => true,
        (U8, _) => true,
        (I16, I32 | I64 | F32 | F64) => true,
        (I32, I64 | F64) => true,
        (F32, F64) => true,
        _ => false,
    };
    !exact
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitpix_round_trip() {
        for dtype in [DType::U8, DType::I16, DType::I32, DType::I64, DType::F32, DType::F64] {
            assert_eq!(DType::from_bitpix(dtype.bitpix()).unwrap(), dtype);
        }
        assert!(matches!(DType::from_bitpix(12), Err(Error::InvalidBitpix(12))));
    }

    #[test]
    fn byte_sizes() {
        assert_eq!(DType::U8.byte_size(), 1);
        assert_eq!(DType::I16.byte_size(), 2);
        assert_eq!(DType::F32.byte_size(), 4);
        assert_eq!(DType::F64.byte_size(), 8);
    }

    #[test]
    fn i16_is_big_endian() {
        let data = PixelData::I16(vec![1, -2]);
        assert_eq!(data.to_be_bytes(), vec![0x00, 0x01, 0xFF, 0xFE]);
    }

    #[test]
    fn f64_bytes_decode() {
        let pixels = vec![0.0, 1.5, -2.25, f64::MAX];
        let bytes = PixelData::F64(pixels.clone()).to_be_bytes();
        assert_eq!(
            PixelData::from_be_bytes(DType::F64, &bytes).unwrap(),
            PixelData::F64(pixels)
        );
    }

    #[test]
    fn decode_rejects_partial_pixel() {
        assert!(PixelData::from_be_bytes(DType::I32, &[0, 0, 0]).is_err());
    }

    #[test]
    fn widening_is_exact() {
        let (v, lossy) = f64::from_pixel_data(&PixelData::I16(vec![-3, 7]));
        assert_eq!(v, vec![-3.0, 7.0]);
        assert!(!lossy);
    }

    #[test]
    fn narrowing_is_flagged_lossy() {
        let (v, lossy) = i16::from_pixel_data(&PixelData::F64(vec![1.9, -1.9]));
        assert_eq!(v, vec![1, -1]);
        assert!(lossy);
    }

    #[test]
    fn same_type_is_copied() {
        let (v, lossy) = u8::from_pixel_data(&PixelData::U8(vec![1, 2, 3]));
        assert_eq!(v, vec![1, 2, 3]);
        assert!(!lossy);
    }

    #[test]
    fn dtype_display() {
        assert_eq!(DType::F64.to_string(), "float64");
        assert_eq!(<f32 as Pixel>::DTYPE, DType::F32);
    }
}
