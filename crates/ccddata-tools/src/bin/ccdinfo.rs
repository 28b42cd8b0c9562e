//! Summarize a CCD image stored in a FITS file.
//!
//! ```shell
//! ccdinfo frame.fits --cards
//! ```

use std::path::PathBuf;

use anyhow::Context;
use ccddata::{from_fits_with, CcdData, FitsReadOptions, HduData, HduList};
use clap::Parser;
use log::info;

#[derive(Debug, Parser)]
#[command(name = "ccdinfo", about = "Print the shape, type, unit and metadata of a CCD image")]
struct Cli {
    /// FITS file to inspect
    file: PathBuf,
    /// also print every metadata card
    #[arg(short, long)]
    cards: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let hdus = HduList::open(&cli.file)
        .with_context(|| format!("failed to read {}", cli.file.display()))?;
    info!("{}: {} HDU(s)", cli.file.display(), hdus.len());

    for (i, hdu) in hdus.iter().enumerate() {
        let kind = match hdu.data() {
            HduData::Empty => String::from("no data"),
            HduData::Image { shape, pixels } => format!("image {:?} {}", shape, pixels.dtype()),
            HduData::Raw(bytes) => format!("{} bytes of non-image data", bytes.len()),
        };
        let name = match (hdu.is_primary(), hdu.extname()) {
            (_, Some(name)) => name,
            (true, None) => "PRIMARY",
            (false, None) => "(unnamed)",
        };
        println!("HDU {i}: {name} {kind}");
    }

    let options = FitsReadOptions::new().unit_from_header(true);
    let ccd: CcdData<f64> = from_fits_with(&hdus, &options)
        .with_context(|| format!("{} is not a single CCD image", cli.file.display()))?;
    println!("shape: {:?}", ccd.shape());
    println!("size:  {}", ccd.size());
    println!("unit:  {}", ccd.unit());

    if cli.cards {
        for card in ccd.header() {
            println!("{card}");
        }
    }
    Ok(())
}
