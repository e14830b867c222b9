use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use qrbridge::{
    decode_batch, render_to_file, EcLevel, MatrixGenerator, PipelineHarness, ProcessGenerator,
    RasterConfig, RqrrDetector,
};

#[derive(Parser)]
#[command(
    name = "qrbridge",
    version,
    about = "Generate QR images through an external encoder and read them back"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a QR matrix with the external encoder and rasterize it
    Encode {
        /// Text to encode
        text: String,
        /// Output image path
        #[arg(short, long, default_value = "qr.png")]
        output: PathBuf,
        /// Module size in pixels
        #[arg(short = 's', long, default_value_t = 10)]
        size: u32,
        /// Quiet zone width in modules
        #[arg(short, long, default_value_t = 4)]
        border: u32,
        /// Error correction level (L, M, Q or H)
        #[arg(long)]
        ec: Option<String>,
        /// Interpreter that runs the encoder library
        #[arg(long, default_value = "lua")]
        program: PathBuf,
        /// Encoder library the generator script loads
        #[arg(long, default_value = "qrencode.lua")]
        library: PathBuf,
        /// Sweep module sizes and report which ones decode back
        #[arg(long)]
        test: bool,
    },
    /// Decode QR images and print their payloads
    Decode {
        /// Image files to decode
        #[arg(required = true)]
        images: Vec<PathBuf>,
        /// Write decoded payloads here, one per line
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print corner points and per-image diagnostics
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if matches!(cli.command, Command::Decode { verbose: true, .. }) {
        "qrbridge=debug"
    } else {
        "qrbridge=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Encode { text, output, size, border, ec, program, library, test } => {
            let ec = ec.as_deref().map(EcLevel::from_str).transpose()?;
            let generator = ProcessGenerator::new(program, library);

            if test {
                let detector = RqrrDetector;
                let report =
                    PipelineHarness::new(&generator, &detector).border(border).run(&text, ec)?;
                for outcome in &report.outcomes {
                    let verdict = if outcome.pass { "ok" } else { "failed" };
                    println!("module size {:>2}px: {verdict}", outcome.module_size);
                }
                match report.first_pass() {
                    Some(px) => println!("smallest working module size: {px}px"),
                    None => bail!("no module size decoded back"),
                }
                return Ok(());
            }

            let matrix = generator.generate(&text, ec)?;
            let config = RasterConfig::new().module_size(size).border(border);
            render_to_file(&matrix, &config, &output)
                .with_context(|| format!("could not write {}", output.display()))?;
            println!(
                "saved {} ({} modules, {size}px each, {border} module border)",
                output.display(),
                matrix.size()
            );
        }
        Command::Decode { images, output, verbose } => {
            let report = decode_batch(&RqrrDetector, &images, output.as_deref())?;
            for (path, result) in &report.decoded {
                if verbose {
                    println!("{}: {}", path.display(), result.text);
                    if let Some(corners) = &result.corners {
                        let pts: Vec<String> =
                            corners.iter().map(|p| format!("({}, {})", p.x, p.y)).collect();
                        println!("  corners: {}", pts.join(" "));
                    }
                } else {
                    println!("{}", result.text);
                }
            }
            if report.skipped > 0 {
                eprintln!("{} image(s) skipped", report.skipped);
            }
            if let Some(output) = output {
                eprintln!("decoded payloads written to {}", output.display());
            }
        }
    }

    Ok(())
}
