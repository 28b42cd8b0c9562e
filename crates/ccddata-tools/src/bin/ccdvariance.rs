//! Derive a shot-noise variance frame from an electron-count image.
//!
//! ```shell
//! ccdvariance frame.fits frame-var.fits --gain 1.5
//! ```

use std::path::PathBuf;

use anyhow::Context;
use ccddata::{from_fits_with, to_fits, CcdData, FitsReadOptions, HduList, Unit};
use clap::Parser;
use log::info;

#[derive(Debug, Parser)]
#[command(
    name = "ccdvariance",
    about = "Writes the Poisson variance (data / gain) of an electron-count image"
)]
struct Cli {
    /// input FITS file holding a single image
    input: PathBuf,
    /// output FITS file for the variance
    output: PathBuf,
    /// detector gain
    #[arg(short, long)]
    gain: f64,
    /// treat the input as electrons regardless of BUNIT
    #[arg(short, long)]
    electrons: bool,
    /// replace the output file if it exists
    #[arg(long)]
    overwrite: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let hdus = HduList::open(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let options = if cli.electrons {
        FitsReadOptions::new().unit(Unit::Electron)
    } else {
        FitsReadOptions::new().unit_from_header(true)
    };
    let mut ccd: CcdData<f64> = from_fits_with(&hdus, &options)?;
    ccd.create_variance(cli.gain)
        .context("pass --electrons if the image is in electrons but lacks BUNIT")?;

    let (_, _, mut meta, uncertainty) = ccd.into_parts();
    let variance = uncertainty
        .context("variance missing after create_variance")?
        .array()
        .clone();
    meta.remove("BUNIT");
    meta.header_mut()
        .add_history(&format!("variance = data / gain, gain = {}", cli.gain))?;

    let out = CcdData::builder().data(variance).meta(meta).build()?;
    to_fits(&out)?
        .write_to(&cli.output, cli.overwrite)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    info!(
        "wrote {:?} variance to {}",
        out.shape(),
        cli.output.display()
    );
    Ok(())
}
