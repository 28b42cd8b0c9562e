//! Header Data Units and the in-memory FITS container.
//!
//! Only image HDUs (the primary array and `IMAGE` extensions) are decoded.
//! Other extensions are kept as raw bytes so a file can be opened, counted,
//! and written back unchanged.
//!
//! Image shapes are stored in ndarray order (slowest axis first), which is
//! the reverse of the FITS `NAXISn` order.

use std::path::Path;

use log::debug;

use crate::error::{Error, Result};
use crate::header::{padded_len, Card, Header, BLOCK_SIZE};
use crate::pixel::{DType, PixelData};
use crate::value::HeaderValue;

/// Whether `keyword` describes the data layout rather than the observation.
///
/// These cards are regenerated from the pixel array whenever an HDU is built
/// or written.
pub fn is_structural(keyword: &str) -> bool {
    match keyword {
        "SIMPLE" | "XTENSION" | "BITPIX" | "NAXIS" | "EXTEND" | "PCOUNT" | "GCOUNT" | "GROUPS"
        | "END" => true,
        k => k
            .strip_prefix("NAXIS")
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit())),
    }
}

/// Data segment of an HDU.
#[derive(Debug, Clone, PartialEq)]
pub enum HduData {
    /// `NAXIS = 0` or a zero-length axis.
    Empty,
    Image {
        /// Axis lengths, slowest axis first.
        shape: Vec<usize>,
        pixels: PixelData,
    },
    /// Undecoded bytes of a non-image extension (tables, random groups).
    Raw(Vec<u8>),
}

/// One header plus its data segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Hdu {
    header: Header,
    data: HduData,
}

impl Hdu {
    /// A primary HDU holding `pixels` laid out with the given `shape`.
    pub fn primary_image(pixels: PixelData, shape: &[usize]) -> Result<Hdu> {
        check_pixel_count(&pixels, shape)?;
        let mut header = Header::new();
        header.push(Card::new("SIMPLE", true)?.with_comment("conforms to FITS standard"));
        push_layout_cards(&mut header, pixels.dtype(), shape)?;
        header.push(Card::new("EXTEND", true)?);
        Ok(Hdu {
            header,
            data: HduData::Image {
                shape: shape.to_vec(),
                pixels,
            },
        })
    }

    /// A primary HDU with no data (`NAXIS = 0`).
    pub fn empty_primary() -> Result<Hdu> {
        let mut header = Header::new();
        header.push(Card::new("SIMPLE", true)?.with_comment("conforms to FITS standard"));
        push_layout_cards(&mut header, DType::U8, &[])?;
        header.push(Card::new("EXTEND", true)?);
        Ok(Hdu {
            header,
            data: HduData::Empty,
        })
    }

    /// An `IMAGE` extension, optionally named with `EXTNAME`.
    pub fn image_extension(
        pixels: PixelData,
        shape: &[usize],
        extname: Option<&str>,
    ) -> Result<Hdu> {
        check_pixel_count(&pixels, shape)?;
        let mut header = Header::new();
        header.push(Card::new("XTENSION", "IMAGE")?.with_comment("image extension"));
        push_layout_cards(&mut header, pixels.dtype(), shape)?;
        header.push(Card::new("PCOUNT", 0)?);
        header.push(Card::new("GCOUNT", 1)?);
        if let Some(name) = extname {
            header.push(Card::new("EXTNAME", name)?);
        }
        Ok(Hdu {
            header,
            data: HduData::Image {
                shape: shape.to_vec(),
                pixels,
            },
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Mutable header access. Layout cards are rewritten from the data when
    /// the HDU is serialized, so edits to them do not stick.
    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    pub fn data(&self) -> &HduData {
        &self.data
    }

    pub fn is_primary(&self) -> bool {
        self.header.contains("SIMPLE")
    }

    pub fn extname(&self) -> Option<&str> {
        self.header.get("EXTNAME").and_then(HeaderValue::as_str)
    }

    /// Shape and pixels, if this HDU holds image data.
    pub fn image(&self) -> Option<(&[usize], &PixelData)> {
        match &self.data {
            HduData::Image { shape, pixels } => Some((shape, pixels)),
            _ => None,
        }
    }

    /// Parse one HDU at the start of `bytes`, returning it and the number of
    /// bytes consumed including padding.
    fn parse(bytes: &[u8], first: bool) -> Result<(Hdu, usize)> {
        let (header, header_len) = Header::parse(bytes)?;
        let simple = header.get("SIMPLE").and_then(HeaderValue::as_bool);
        if first && simple != Some(true) {
            return Err(Error::InvalidHeader("first HDU must be primary"));
        }

        let bitpix = header
            .get("BITPIX")
            .and_then(HeaderValue::as_i64)
            .ok_or(Error::MissingKeyword("BITPIX"))?;
        let dtype = DType::from_bitpix(bitpix)?;
        let naxes = read_naxes(&header)?;
        let groups = first && header.get("GROUPS").and_then(HeaderValue::as_bool) == Some(true);
        let data_len = data_size(&header, dtype, &naxes, groups)?;

        let start = header_len;
        let end = start
            .checked_add(data_len)
            .ok_or(Error::InvalidHeader("data size overflow"))?;
        if end > bytes.len() {
            return Err(Error::UnexpectedEof);
        }
        let raw = &bytes[start..end];

        let is_image = if first {
            !groups
        } else {
            header.get("XTENSION").and_then(HeaderValue::as_str) == Some("IMAGE")
        };
        let data = if data_len == 0 {
            HduData::Empty
        } else if is_image {
            HduData::Image {
                shape: naxes.iter().rev().copied().collect(),
                pixels: PixelData::from_be_bytes(dtype, raw)?,
            }
        } else {
            HduData::Raw(raw.to_vec())
        };

        // Tolerate a missing final padding block.
        let padded = data_len
            .div_ceil(BLOCK_SIZE)
            .checked_mul(BLOCK_SIZE)
            .and_then(|n| n.checked_add(start))
            .ok_or(Error::InvalidHeader("data size overflow"))?;
        let consumed = padded.min(bytes.len());
        Ok((Hdu { header, data }, consumed))
    }

    /// Serialize header and data, each padded to whole blocks.
    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut header = self.header.clone();
        let payload = match &self.data {
            HduData::Image { shape, pixels } => {
                sync_layout_cards(&mut header, pixels.dtype(), shape)?;
                pixels.to_be_bytes()
            }
            HduData::Empty => {
                let dtype = header
                    .get("BITPIX")
                    .and_then(HeaderValue::as_i64)
                    .and_then(|b| DType::from_bitpix(b).ok())
                    .unwrap_or(DType::U8);
                sync_layout_cards(&mut header, dtype, &[])?;
                Vec::new()
            }
            HduData::Raw(bytes) => bytes.clone(),
        };

        let mut out = header.to_bytes()?;
        let data_start = out.len();
        out.extend_from_slice(&payload);
        out.resize(data_start + padded_len(payload.len()), 0);
        Ok(out)
    }
}

fn check_pixel_count(pixels: &PixelData, shape: &[usize]) -> Result<()> {
    let expected: usize = shape.iter().product();
    if shape.is_empty() || expected != pixels.len() {
        return Err(Error::ShapeMismatch {
            expected: shape.to_vec(),
            found: vec![pixels.len()],
        });
    }
    Ok(())
}

/// Append `BITPIX`, `NAXIS` and `NAXISn` for an array of `shape`.
fn push_layout_cards(header: &mut Header, dtype: DType, shape: &[usize]) -> Result<()> {
    header.push(Card::new("BITPIX", dtype.bitpix())?.with_comment("array data type"));
    header.push(Card::new("NAXIS", shape.len() as i64)?.with_comment("number of array dimensions"));
    for (i, &n) in shape.iter().rev().enumerate() {
        header.push(Card::new(&format!("NAXIS{}", i + 1), n as i64)?);
    }
    Ok(())
}

/// Rewrite the layout cards in place, dropping stale `NAXISn` beyond the
/// current dimensionality.
fn sync_layout_cards(header: &mut Header, dtype: DType, shape: &[usize]) -> Result<()> {
    header.set("BITPIX", dtype.bitpix())?;
    header.set("NAXIS", shape.len() as i64)?;
    for (i, &n) in shape.iter().rev().enumerate() {
        header.set(&format!("NAXIS{}", i + 1), n as i64)?;
    }
    let mut extra = shape.len() + 1;
    while header.remove(&format!("NAXIS{extra}")).is_some() {
        extra += 1;
    }
    Ok(())
}

/// Byte length of the data segment described by `header`.
///
/// Random groups (`GROUPS = T`, `NAXIS1 = 0`) hold `GCOUNT` groups of
/// `PCOUNT` parameters plus an `NAXIS2 * ... * NAXISm` array each.
fn data_size(header: &Header, dtype: DType, naxes: &[usize], groups: bool) -> Result<usize> {
    let pcount = read_count(header, "PCOUNT", 0)?;
    let gcount = read_count(header, "GCOUNT", 1)?;
    let product = |axes: &[usize]| {
        axes.iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .ok_or(Error::InvalidHeader("NAXIS overflow"))
    };
    let elements = match naxes {
        [] => 0,
        [0, rest @ ..] if groups => product(rest)?,
        all => product(all)?,
    };
    elements
        .checked_add(pcount)
        .and_then(|n| n.checked_mul(gcount))
        .and_then(|n| n.checked_mul(dtype.byte_size()))
        .ok_or(Error::InvalidHeader("data size overflow"))
}

/// `NAXIS1..NAXISn` in FITS order (fastest axis first).
fn read_naxes(header: &Header) -> Result<Vec<usize>> {
    let naxis = header
        .get("NAXIS")
        .and_then(HeaderValue::as_i64)
        .ok_or(Error::MissingKeyword("NAXIS"))?;
    let naxis = usize::try_from(naxis).map_err(|_| Error::InvalidHeader("negative NAXIS"))?;
    (1..=naxis)
        .map(|i| {
            let n = header
                .get(&format!("NAXIS{i}"))
                .and_then(HeaderValue::as_i64)
                .ok_or(Error::MissingKeyword("NAXISn"))?;
            usize::try_from(n).map_err(|_| Error::InvalidHeader("negative NAXISn"))
        })
        .collect()
}

fn read_count(header: &Header, keyword: &'static str, default: usize) -> Result<usize> {
    match header.get(keyword) {
        None => Ok(default),
        Some(v) => v
            .as_i64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or(Error::InvalidHeader("PCOUNT/GCOUNT must be a non-negative integer")),
    }
}

/// An ordered sequence of HDUs, primary first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HduList {
    hdus: Vec<Hdu>,
}

impl HduList {
    pub fn new() -> HduList {
        HduList::default()
    }

    pub fn push(&mut self, hdu: Hdu) {
        self.hdus.push(hdu);
    }

    pub fn len(&self) -> usize {
        self.hdus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hdus.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Hdu> {
        self.hdus.get(index)
    }

    pub fn primary(&self) -> Option<&Hdu> {
        self.hdus.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hdu> {
        self.hdus.iter()
    }

    /// Finds the first HDU whose `EXTNAME` matches `name`.
    pub fn find_by_name(&self, name: &str) -> Option<&Hdu> {
        self.hdus.iter().find(|hdu| hdu.extname() == Some(name))
    }

    /// Parse a complete FITS byte stream.
    pub fn from_bytes(bytes: &[u8]) -> Result<HduList> {
        if bytes.len() < BLOCK_SIZE {
            return Err(Error::UnexpectedEof);
        }
        let mut hdus = Vec::new();
        let mut offset = 0;
        while bytes.len() - offset >= BLOCK_SIZE {
            let (hdu, consumed) = Hdu::parse(&bytes[offset..], hdus.is_empty())?;
            debug!(
                "HDU {} at byte {}: {} cards, {:?}",
                hdus.len(),
                offset,
                hdu.header.len(),
                hdu.image().map(|(shape, px)| (shape.to_vec(), px.dtype()))
            );
            hdus.push(hdu);
            offset += consumed;
        }
        Ok(HduList { hdus })
    }

    /// Serialize every HDU into one FITS byte stream.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for hdu in &self.hdus {
            out.extend_from_slice(&hdu.to_bytes()?);
        }
        debug!("serialized {} HDUs, {} bytes", self.hdus.len(), out.len());
        Ok(out)
    }

    /// Read and parse a FITS file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<HduList> {
        let bytes = std::fs::read(path.as_ref())?;
        debug!("read {} bytes from {}", bytes.len(), path.as_ref().display());
        HduList::from_bytes(&bytes)
    }

    /// Write to `path`. Fails with [`Error::FileExists`] if the file exists
    /// and `overwrite` is false.
    pub fn write_to<P: AsRef<Path>>(&self, path: P, overwrite: bool) -> Result<()> {
        let path = path.as_ref();
        if !overwrite && path.exists() {
            return Err(Error::FileExists(path.to_path_buf()));
        }
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }
}

impl From<Vec<Hdu>> for HduList {
    fn from(hdus: Vec<Hdu>) -> HduList {
        HduList { hdus }
    }
}

impl<'a> IntoIterator for &'a HduList {
    type Item = &'a Hdu;
    type IntoIter = std::slice::Iter<'a, Hdu>;

    fn into_iter(self) -> Self::IntoIter {
        self.hdus.iter()
    }
}
