use anyhow::{Context, Result, bail};
use clap::Parser;
use region_vision::core_modules::annotator::{Annotator, caption_lines};
use region_vision::core_modules::preprocess::Binarization;
use region_vision::pipeline::{PipelineConfig, RegionPipeline};
use region_vision::session::{
    DecisionSource, FrameNaming, FrameReport, LabelDecision, NoLabeling, Session, SessionConfig,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Extracts, tracks and labels foreground regions in a numbered image sequence.
#[derive(Parser, Debug)]
#[command(name = "region_labeler", version)]
struct Args {
    /// Directory holding the numbered frames.
    input_dir: PathBuf,
    /// Directory the annotated frames are written to. Created if missing.
    output_dir: PathBuf,
    /// Components with fewer pixels are ignored.
    min_region_size: u32,
    /// At most this many regions are drawn and tracked per frame.
    max_regions: usize,
    /// Labeled feature vectors are appended to this file.
    feature_file: PathBuf,

    /// `adaptive`, `otsu`, or a fixed gray level (0-255).
    #[arg(long, default_value = "adaptive", value_parser = parse_threshold)]
    threshold: ThresholdMode,
    /// Treat dark pixels as foreground for `otsu` and fixed levels.
    #[arg(long)]
    invert: bool,
    /// Half-size of the local window for adaptive thresholding.
    #[arg(long, default_value_t = 5)]
    block_radius: u32,
    /// Pixels at or below the local mean minus this count as foreground.
    #[arg(long, default_value_t = 2, allow_hyphen_values = true)]
    offset: i16,
    #[arg(long, default_value_t = 1.1)]
    blur_sigma: f32,
    #[arg(long)]
    no_blur: bool,
    /// Font used for the region captions instead of the bundled DejaVu Sans Mono.
    #[arg(long, value_name = "PATH")]
    font: Option<PathBuf>,
    /// Never prompt; process every frame without labeling.
    #[arg(long)]
    no_label: bool,
    /// Also write the cleaned binary mask of each frame.
    #[arg(long)]
    save_masks: bool,
    #[arg(long, default_value = "img")]
    prefix: String,
    #[arg(long, default_value = "p3.png")]
    suffix: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ThresholdMode {
    Adaptive,
    Otsu,
    Fixed(u8),
}

fn parse_threshold(value: &str) -> Result<ThresholdMode, String> {
    match value.to_ascii_lowercase().as_str() {
        "adaptive" => Ok(ThresholdMode::Adaptive),
        "otsu" => Ok(ThresholdMode::Otsu),
        level => level
            .parse::<u8>()
            .map(ThresholdMode::Fixed)
            .map_err(|_| format!("expected `adaptive`, `otsu` or 0-255, got {value:?}")),
    }
}

impl Args {
    fn binarization(&self) -> Binarization {
        match self.threshold {
            ThresholdMode::Adaptive => Binarization::Adaptive {
                block_radius: self.block_radius,
                offset: self.offset,
            },
            ThresholdMode::Otsu => Binarization::Otsu {
                invert: self.invert,
            },
            ThresholdMode::Fixed(level) => Binarization::Fixed {
                level,
                invert: self.invert,
            },
        }
    }
}

/// Prints `text` without a newline and flushes so it shows before stdin blocks.
fn prompt(text: &str) {
    print!("{text}");
    if let Err(e) = io::stdout().flush() {
        log::warn!("Could not flush stdout: {e}");
    }
}

/// Prompts on the terminal after every frame.
struct ConsoleDecisions {
    stdin: io::Stdin,
}

impl ConsoleDecisions {
    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.stdin.lock().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line),
            Err(e) => {
                log::error!("Could not read from stdin: {e}");
                None
            }
        }
    }
}

impl DecisionSource for ConsoleDecisions {
    fn decide(&mut self, frame: &FrameReport<'_>) -> LabelDecision {
        let analysis = frame.analysis;
        println!(
            "Frame {} ({}): {} regions, {} drawn",
            frame.index,
            frame.input_path.display(),
            analysis.regions.len(),
            analysis.accepted.len()
        );
        for (i, colored) in analysis.accepted.iter().enumerate() {
            let [area, ar, filled] = caption_lines(&colored.region);
            println!(
                "  #{i} at ({:.0}, {:.0})  {area}  {ar}  {filled}  axis {:.3} rad",
                colored.region.centroid.x,
                colored.region.centroid.y,
                colored.region.least_central_moment_axis
            );
        }

        prompt("Press 'n' to label the current object, 'q' to exit, Enter to continue: ");
        let Some(answer) = self.read_line() else {
            return LabelDecision::Exit;
        };

        match answer.trim().to_ascii_lowercase().as_str() {
            "n" => {
                prompt("Enter label for the current object: ");
                let Some(line) = self.read_line() else {
                    return LabelDecision::Exit;
                };
                match line.split_whitespace().next() {
                    Some(label) => LabelDecision::Label(label.to_string()),
                    None => {
                        log::warn!("Empty label, frame not recorded.");
                        LabelDecision::Skip
                    }
                }
            }
            "q" | "esc" | "\u{1b}" => LabelDecision::Exit,
            _ => LabelDecision::Skip,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if !args.input_dir.is_dir() {
        bail!(
            "Provided input path {} is not a directory.",
            args.input_dir.display()
        );
    }

    let annotator = match &args.font {
        Some(path) => Annotator::from_font_file(path).context("loading caption font")?,
        None => Annotator::default(),
    };
    let pipeline_config = PipelineConfig {
        min_region_size: args.min_region_size,
        max_regions: args.max_regions,
        binarization: args.binarization(),
        blur_sigma: (!args.no_blur).then_some(args.blur_sigma),
    };
    let session_config = SessionConfig {
        input_dir: args.input_dir.clone(),
        output_dir: args.output_dir.clone(),
        dataset_path: args.feature_file.clone(),
        naming: FrameNaming {
            prefix: args.prefix.clone(),
            suffix: args.suffix.clone(),
            ..FrameNaming::default()
        },
        save_masks: args.save_masks,
    };

    let mut session = Session::new(
        session_config,
        RegionPipeline::new(pipeline_config, annotator),
    )
    .context("setting up session")?;

    let summary = if args.no_label {
        session.run(&mut NoLabeling)
    } else {
        session.run(&mut ConsoleDecisions { stdin: io::stdin() })
    };

    log::info!(
        "{} frames processed, {} skipped, {} saved, {} records written{}",
        summary.frames_processed,
        summary.frames_skipped,
        summary.frames_saved,
        summary.records_written,
        if summary.exited_early { " (stopped early)" } else { "" }
    );
    Ok(())
}
