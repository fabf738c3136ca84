//! Command-line packer for iCE40 multiboot images.

use clap::Parser;
use engrave_multiboot::{BuildOptions, Image, build};
use eyre::WrapErr;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_tracing(args.verbose);

    let options = BuildOptions {
        align_bits: args.align.or(args.align_first).unwrap_or(0),
        align_first: args.align_first.is_some(),
        coldboot: args.coldboot,
        por_image: args.por_image,
    };

    let mut images = Vec::with_capacity(args.inputs.len());
    for path in &args.inputs {
        images.push(Image::open(path)?);
    }

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .wrap_err_with(|| format!("can't open output file `{}`", path.display()))?;
            build(images, &options, BufWriter::new(file))?;
        }
        None => build(images, &options, io::stdout().lock())?,
    }
    info!("done");
    Ok(())
}

/// Command-line arguments.
#[derive(Parser)]
struct Args {
    /// Input bitstream images, in boot slot order.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Coldboot mode: the power-on/reset image is selected by the
    /// CBSEL0/CBSEL1 pins.
    #[arg(short = 'c')]
    coldboot: bool,
    /// Select the power-on/reset image when not using coldboot mode.
    #[arg(short = 'p', value_name = "IMAGE", default_value_t = 0,
          value_parser = clap::value_parser!(u8).range(0..=3))]
    por_image: u8,
    /// Align images at 2^N bytes.
    #[arg(short = 'a', value_name = "N", value_parser = align_exponent)]
    align: Option<u32>,
    /// Align images at 2^N bytes, image 0 included.
    #[arg(short = 'A', value_name = "N", value_parser = align_exponent, conflicts_with = "align")]
    align_first: Option<u32>,
    /// Write the output image to a file instead of stdout.
    #[arg(short = 'o', value_name = "FILE")]
    output: Option<PathBuf>,
    /// Verbose; repeat to increase verbosity.
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Alignment exponents accept hex or decimal and are capped at 31 so the
/// shift stays in range.
fn align_exponent(s: &str) -> Result<u32, String> {
    clap_num::maybe_hex_range(s, 0, 31)
}

/// Map the `-v` count onto the subscriber filter; `RUST_LOG` wins when set.
/// Diagnostics land on stderr, keeping stdout clean for the image itself.
fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .without_time()
        .with_target(false)
        .init();
}
