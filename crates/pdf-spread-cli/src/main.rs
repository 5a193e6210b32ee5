mod logger;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use pdf_spread::{Pipeline, Scratch, SpreadOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pdf-spread",
    about = "Normalize PDF pages and pair them into spreads",
    version
)]
struct Cli {
    /// Input PDF file(s), concatenated in order
    #[arg(short, long, required = true, num_args = 1..)]
    input: Vec<PathBuf>,

    /// Output PDF file
    #[arg(short, long, required_unless_present = "stats_only")]
    output: Option<PathBuf>,

    /// JSON options file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Turn pages that do not have this orientation
    #[arg(long, value_enum)]
    rotate: Option<OrientationArg>,

    /// Direction of the quarter turn used by rotate and combine
    #[arg(long, default_value = "left", value_enum)]
    turn: TurnArg,

    /// Fit every page to a standard paper size
    #[arg(long, value_enum, conflicts_with = "custom_size")]
    paper: Option<PaperArg>,

    /// Fit every page to a custom size, as WIDTHxHEIGHT in mm
    #[arg(long, value_parser = parse_size)]
    custom_size: Option<(f32, f32)>,

    /// Pair consecutive pages into double-wide spreads
    #[arg(long)]
    combine: bool,

    /// Author written to the output
    #[arg(long)]
    author: Option<String>,

    /// Creator written to the output
    #[arg(long)]
    creator: Option<String>,

    /// Producer written to the output
    #[arg(long)]
    producer: Option<String>,

    /// Maximum number of pages transformed at once
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Show statistics only, don't generate PDF
    #[arg(long)]
    stats_only: bool,

    /// Log every page transform
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OrientationArg {
    Portrait,
    Landscape,
}

#[derive(Clone, Copy, ValueEnum)]
enum TurnArg {
    Left,
    Right,
}

#[derive(Clone, Copy, ValueEnum)]
enum PaperArg {
    A0,
    A1,
    A2,
    A3,
    A4,
    A5,
    A6,
    Letter,
    Legal,
    Tabloid,
}

impl From<OrientationArg> for pdf_spread::Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Portrait => Self::Portrait,
            OrientationArg::Landscape => Self::Landscape,
        }
    }
}

impl From<TurnArg> for pdf_spread::TurnDirection {
    fn from(arg: TurnArg) -> Self {
        match arg {
            TurnArg::Left => Self::Left,
            TurnArg::Right => Self::Right,
        }
    }
}

impl From<PaperArg> for pdf_spread::PaperSize {
    fn from(arg: PaperArg) -> Self {
        match arg {
            PaperArg::A0 => Self::A0,
            PaperArg::A1 => Self::A1,
            PaperArg::A2 => Self::A2,
            PaperArg::A3 => Self::A3,
            PaperArg::A4 => Self::A4,
            PaperArg::A5 => Self::A5,
            PaperArg::A6 => Self::A6,
            PaperArg::Letter => Self::Letter,
            PaperArg::Legal => Self::Legal,
            PaperArg::Tabloid => Self::Tabloid,
        }
    }
}

fn parse_size(value: &str) -> std::result::Result<(f32, f32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", value))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<f32>()
            .map_err(|e| format!("'{}': {}", part, e))
    };
    Ok((parse(width)?, parse(height)?))
}

impl Cli {
    /// Options from the config file, if any, with flags applied on top
    async fn options(&self) -> Result<SpreadOptions> {
        let mut options = match &self.config {
            Some(path) => SpreadOptions::load(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?,
            None => SpreadOptions::default(),
        };

        let turn = self.turn.into();
        if let Some(orientation) = self.rotate {
            options.rotate = Some(pdf_spread::RotateStep {
                orientation: orientation.into(),
                direction: turn,
            });
        }
        if let Some(paper) = self.paper {
            options.resize = Some(paper.into());
        }
        if let Some((width_mm, height_mm)) = self.custom_size {
            options.resize = Some(pdf_spread::PaperSize::Custom {
                width_mm,
                height_mm,
            });
        }
        if self.combine {
            options.combine = Some(turn);
        }
        if let Some(author) = &self.author {
            options.info.author = author.clone();
        }
        if let Some(creator) = &self.creator {
            options.info.creator = creator.clone();
        }
        if let Some(producer) = &self.producer {
            options.info.producer = producer.clone();
        }
        if let Some(jobs) = self.jobs {
            options.parallelism = jobs;
        }

        options.validate()?;
        Ok(options)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::StderrLogger::new(logger::level_for(cli.verbose)).init()?;

    // Scratch files are removed when this goes out of scope
    let _scratch = Scratch::global().guard();

    let options = cli.options().await?;

    // Load all input PDFs into one sequence
    let mut pipeline = Pipeline::empty();
    for path in &cli.input {
        let loaded = Pipeline::load_path(path)
            .await
            .with_context(|| format!("Failed to load {}", path.display()))?;
        pipeline = pipeline.append(loaded);
    }

    // Calculate and show statistics
    let stats = pdf_spread::calculate_statistics(pipeline.len(), &options)?;
    println!("Spread Statistics:");
    println!("  Source pages: {}", stats.source_pages);
    println!("  Output pages: {}", stats.output_pages);
    if options.combine.is_some() {
        println!("  Spreads: {}", stats.spreads);
        println!("  Unpaired pages: {}", stats.unpaired_pages);
    }
    if let Some(rect) = stats.target_rect {
        println!("  Page size: {:.1} x {:.1} pt", rect.width, rect.height);
    }

    if cli.stats_only {
        return Ok(());
    }

    let Some(output) = cli.output else {
        bail!("--output is required unless --stats-only is given");
    };

    let pipeline = pipeline.run(&options).await?;
    for failure in pipeline.failures() {
        println!(
            "  Page {} left unchanged by {}: {}",
            failure.index + 1,
            failure.stage,
            failure.error
        );
    }

    pipeline
        .save(&output)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Spread {} page(s) → {}", pipeline.len(), output.display());

    Ok(())
}
