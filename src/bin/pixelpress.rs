use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use pixelpress::{ImageDocument, TransformRequest, render};

#[derive(Parser, Debug)]
#[command(name = "pixelpress", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply a JSON edit spec to an image and save the result.
    Apply(ApplyArgs),
    /// Print the detected format and dimensions of an image.
    Probe(ProbeArgs),
}

#[derive(Parser, Debug)]
struct ApplyArgs {
    /// Input image: a local path, or a URL with remote fetching enabled.
    #[arg(long = "in")]
    in_source: String,

    /// Edit spec JSON; omitted means pass the image through unchanged.
    #[arg(long)]
    spec: Option<PathBuf>,

    /// Output path; the format is inferred from the extension.
    #[arg(long)]
    out: PathBuf,

    /// JPEG quality (1-100).
    #[arg(long, default_value_t = 90)]
    quality: u8,
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    /// Input image path.
    #[arg(long = "in")]
    in_source: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Apply(args) => cmd_apply(args),
        Command::Probe(args) => cmd_probe(args),
    }
}

fn read_request(path: Option<&PathBuf>) -> anyhow::Result<TransformRequest> {
    let Some(path) = path else {
        return Ok(TransformRequest::default());
    };
    let f = File::open(path).with_context(|| format!("open spec '{}'", path.display()))?;
    let req: TransformRequest =
        serde_json::from_reader(BufReader::new(f)).context("parse edit spec JSON")?;
    Ok(req)
}

fn cmd_apply(args: ApplyArgs) -> anyhow::Result<()> {
    let req = read_request(args.spec.as_ref())?;
    req.validate()?;

    let mut doc = ImageDocument::open_source(&args.in_source)
        .with_context(|| format!("open source '{}'", args.in_source))?;

    let report = render(&mut doc, &req)?;
    for skipped in &report.skipped_texts {
        eprintln!(
            "skipped text {} ({:?}): {}",
            skipped.index, skipped.text, skipped.reason
        );
    }

    doc.save_as(&args.out, Some(args.quality))
        .with_context(|| format!("save '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let doc = ImageDocument::open_source(&args.in_source)
        .with_context(|| format!("open source '{}'", args.in_source))?;
    println!(
        "{} {}x{}",
        doc.kind().as_str(),
        doc.width(),
        doc.height()
    );
    Ok(())
}
