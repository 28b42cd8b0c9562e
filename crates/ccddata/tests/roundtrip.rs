//! FITS round trips through bytes and files.

use ccddata::{
    from_fits, from_fits_with, to_fits, CcdData, DType, Error, ErrorKind, FitsReadOptions, Hdu,
    HduList, HeaderValue, PixelData, Unit, BLOCK_SIZE,
};
use ndarray::{Array2, Array3};

fn electrons_frame() -> CcdData<f32> {
    let data = Array2::from_shape_fn((6, 9), |(r, c)| (r * 9 + c) as f32 * 0.5);
    let meta: Vec<(&str, HeaderValue)> = vec![
        ("OBSERVER", "Edwin Hubble".into()),
        ("EXPTIME", 30.0.into()),
        ("FILTER", "R".into()),
    ];
    CcdData::builder()
        .data(data)
        .unit(Unit::Electron)
        .meta(meta)
        .build()
        .unwrap()
}

// ===========================================================================
// In-memory
// ===========================================================================

#[test]
fn bytes_round_trip() {
    let ccd = electrons_frame();
    let bytes = to_fits(&ccd).unwrap().to_bytes().unwrap();
    assert_eq!(bytes.len() % BLOCK_SIZE, 0);

    let hdus = HduList::from_bytes(&bytes).unwrap();
    let back: CcdData<f32> = from_fits(&hdus).unwrap();
    assert_eq!(back.data(), ccd.data());
    assert_eq!(back.dtype(), DType::F32);
    assert_eq!(back.meta()["OBSERVER"], "Edwin Hubble");
    assert_eq!(back.meta()["EXPTIME"], 30.0);
    assert_eq!(back.meta()["FILTER"], "R");
    assert_eq!(back.unit(), Unit::Dimensionless);
}

#[test]
fn bunit_round_trip() {
    let ccd = electrons_frame();
    let bytes = to_fits(&ccd).unwrap().to_bytes().unwrap();
    let hdus = HduList::from_bytes(&bytes).unwrap();
    let options = FitsReadOptions::new().unit_from_header(true);
    let back: CcdData<f32> = from_fits_with(&hdus, &options).unwrap();
    assert_eq!(back.unit(), Unit::Electron);
}

#[test]
fn cube_keeps_axis_order() {
    let data = Array3::from_shape_fn((2, 3, 4), |(a, b, c)| (a * 100 + b * 10 + c) as i16);
    let ccd = CcdData::new(data).unwrap();
    let hdus = to_fits(&ccd).unwrap();
    let header = hdus.primary().unwrap().header();
    assert_eq!(header["NAXIS1"], 4i64);
    assert_eq!(header["NAXIS3"], 2i64);

    let bytes = hdus.to_bytes().unwrap();
    let back: CcdData<i16> = from_fits(&HduList::from_bytes(&bytes).unwrap()).unwrap();
    assert_eq!(back.shape(), &[2, 3, 4]);
    assert_eq!(back.data()[[1, 2, 3]], 123);
}

#[test]
fn scaled_integers_read_as_physical() {
    let mut hdu = Hdu::primary_image(PixelData::I16(vec![-32768, 0, 32767]), &[3]).unwrap();
    hdu.header_mut().set("BZERO", 32768.0).unwrap();
    let bytes = HduList::from(vec![hdu]).to_bytes().unwrap();

    let hdus = HduList::from_bytes(&bytes).unwrap();
    let ccd: CcdData<f64> = from_fits(&hdus).unwrap();
    assert_eq!(ccd.data().as_slice().unwrap(), &[0.0, 32768.0, 65535.0]);
    assert!(!ccd.meta().contains("BZERO"));
}

#[test]
fn history_and_comments_survive() {
    let mut ccd = electrons_frame();
    ccd.meta_mut().insert("HISTORY", "bias subtracted").unwrap();
    ccd.meta_mut()
        .header_mut()
        .add_comment("taken at Mount Wilson")
        .unwrap();
    let bytes = to_fits(&ccd).unwrap().to_bytes().unwrap();
    let back: CcdData<f32> = from_fits(&HduList::from_bytes(&bytes).unwrap()).unwrap();
    assert_eq!(back.meta().commentary("HISTORY"), vec!["bias subtracted"]);
    assert_eq!(back.meta().commentary("COMMENT"), vec!["taken at Mount Wilson"]);
}

#[test]
fn unwritable_meta_values_are_rejected() {
    let mut ccd = electrons_frame();
    let err = ccd.meta_mut().insert("OBJECT", "x".repeat(100)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Value);
    let err = ccd
        .meta_mut()
        .insert("OBSERVER", "Ejnar Hertzsprung \u{c5}")
        .unwrap_err();
    assert!(matches!(err, Error::InvalidValue { .. }));
    assert_eq!(ccd.meta()["OBSERVER"], "Edwin Hubble");
    assert!(!ccd.meta().contains("OBJECT"));

    let bytes = to_fits(&ccd).unwrap().to_bytes().unwrap();
    let back: CcdData<f32> = from_fits(&HduList::from_bytes(&bytes).unwrap()).unwrap();
    assert_eq!(back.meta()["OBSERVER"], "Edwin Hubble");
}

#[test]
fn variance_written_as_image() {
    let mut ccd: CcdData<f64> = CcdData::builder()
        .data(Array2::from_elem((4, 4), 100.0))
        .unit(Unit::Electron)
        .build()
        .unwrap();
    ccd.create_variance(2.0).unwrap();
    let variance = ccd.uncertainty().unwrap().array().clone();
    let out = CcdData::new(variance).unwrap();
    let bytes = to_fits(&out).unwrap().to_bytes().unwrap();
    let back: CcdData<f64> = from_fits(&HduList::from_bytes(&bytes).unwrap()).unwrap();
    assert!(back.data().iter().all(|&v| v == 50.0));
}

// ===========================================================================
// Files
// ===========================================================================

#[test]
fn file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.fits");
    let ccd = electrons_frame();
    to_fits(&ccd).unwrap().write_to(&path, false).unwrap();

    let back: CcdData<f32> = from_fits(&HduList::open(&path).unwrap()).unwrap();
    assert_eq!(back.data(), ccd.data());
    assert_eq!(back.meta()["OBSERVER"], "Edwin Hubble");
}

#[test]
fn existing_file_needs_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.fits");
    let hdus = to_fits(&electrons_frame()).unwrap();
    hdus.write_to(&path, false).unwrap();

    let err = hdus.write_to(&path, false).unwrap_err();
    assert!(matches!(err, Error::FileExists(_)));
    hdus.write_to(&path, true).unwrap();
}

#[test]
fn truncated_file_fails() {
    let bytes = to_fits(&electrons_frame()).unwrap().to_bytes().unwrap();
    let err = HduList::from_bytes(&bytes[..BLOCK_SIZE - 80]).unwrap_err();
    assert!(matches!(err, Error::UnexpectedEof));
}
