// ============================================================================
// pixelmill CLI: headless batch editing via command-line arguments
// ============================================================================
//
// Usage examples:
//   pixelmill -i photo.png --op sepia -o result.png
//   pixelmill -i photo.jpg --op contrast-high --op flip-horizontal -o out.bmp
//   pixelmill -i "shots/*.jpg" --op invert --output-dir processed/ --format png
//   pixelmill -i a.png --op grayscale-low --op revert --preview 320x240
//
// Every --op is one independent edit on the working image, replayed in order
// through an `Editor` session exactly as interactive button presses would be.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::config::EngineConfig;
use crate::editor::{EditCommand, Editor, parse_size};
use crate::error::{EngineError, Result};
use crate::io::{SaveFormat, load_image, save_image_as};
use crate::ops::adjustments::Filter;
use crate::ops::transform::fit_to_box;
use crate::{log_err, log_info};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// pixelmill headless image editor.
#[derive(Parser, Debug)]
#[command(
    name = "pixelmill",
    version,
    about = "Parallel per-pixel image filters with revert history",
    long_about = "Apply color filters and simple transforms to PNG, JPEG and BMP files\n\
                  without a GUI. Each --op is applied in order as an independent edit.\n\n\
                  Example:\n  \
                  pixelmill --input photo.png --op sepia --output result.png\n  \
                  pixelmill -i \"*.jpg\" --op invert --output-dir out/ --format png"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, num_args = 1.., required_unless_present = "list_filters")]
    pub input: Vec<String>,

    /// Edit to apply: a filter name, flip-horizontal, flip-vertical,
    /// rotate-90, resize=WxH or revert. Repeat to apply several in order.
    #[arg(long = "op", value_name = "COMMAND")]
    pub ops: Vec<String>,

    /// Output file path. Only valid for single-file input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    /// Files are written here with the original stem and the target format's extension.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: png, jpg, bmp.
    /// When omitted, the format is inferred from --output's extension, defaulting to png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality (1–100). Overrides the config file.
    #[arg(short, long, value_name = "1-100", value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: Option<u8>,

    /// Worker threads for filter passes (0 = one per CPU). Overrides the config file.
    #[arg(short, long, value_name = "N")]
    pub threads: Option<usize>,

    /// JSON engine configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Also write a display-scaled copy fitted into WxH as <stem>_preview.<ext>.
    #[arg(long, value_name = "WxH")]
    pub preview: Option<String>,

    /// Session log file (default: platform data directory).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Print the available filters and exit.
    #[arg(long)]
    pub list_filters: bool,

    /// Print per-file timing and history information.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    if args.list_filters {
        for filter in Filter::all() {
            println!("{:<18} {}", filter.name(), filter.label());
        }
        return ExitCode::SUCCESS;
    }

    let config = match resolve_config(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let commands = match args
        .ops
        .iter()
        .map(|op| op.parse::<EditCommand>())
        .collect::<Result<Vec<_>>>()
    {
        Ok(cmds) => cmds,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let preview = match args.preview.as_deref().map(parse_size).transpose() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: --preview: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    // Multiple inputs require --output-dir, not --output
    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let save_format = match parse_format(args.format.as_deref(), args.output.as_deref()) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!(
            "error: could not create output directory '{}': {}",
            dir.display(), e
        );
        return ExitCode::FAILURE;
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();

        let Some(output_path) = build_output_path(
            input_path,
            args.output.as_deref(),
            args.output_dir.as_deref(),
            save_format,
        ) else {
            eprintln!(
                "  error: cannot determine output path for '{}'.",
                input_path.display()
            );
            any_failure = true;
            continue;
        };

        match run_one(input_path, &output_path, &commands, &config, save_format, preview, args.verbose) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                log_err!("{}: {}", input_path.display(), e);
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

fn run_one(
    input:    &Path,
    output:   &Path,
    commands: &[EditCommand],
    config:   &EngineConfig,
    format:   SaveFormat,
    preview:  Option<(u32, u32)>,
    verbose:  bool,
) -> Result<()> {
    // -- Step 1: Load ----------------------------------------------------
    let image = load_image(input)?;
    let mut editor = Editor::new(config)?;
    editor.open(image);

    // -- Step 2: Replay edits --------------------------------------------
    for command in commands {
        let step_start = Instant::now();
        editor.execute(*command)?;
        if verbose {
            println!(
                "  {} ({:.0}ms, history depth {}, pending revert {})",
                command,
                step_start.elapsed().as_secs_f64() * 1000.0,
                editor.history().depth(),
                editor.history().pending_revert_count()
            );
        }
    }

    // -- Step 3: Save ----------------------------------------------------
    let result = editor.into_current().ok_or(EngineError::NullImage)?;
    save_image_as(&result, output, format, config.jpeg_quality)?;

    if let Some((box_w, box_h)) = preview {
        let shown = fit_to_box(&result, box_w, box_h)?;
        let preview_path = preview_path(output, format);
        save_image_as(&shown, &preview_path, format, config.jpeg_quality)?;
        if verbose {
            println!("  preview → {}", preview_path.display());
        }
    }

    log_info!("{} → {} ({} edits)", input.display(), output.display(), commands.len());
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Config file (if any) with command-line overrides applied.
fn resolve_config(args: &CliArgs) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    if let Some(quality) = args.quality {
        config.jpeg_quality = quality;
    }
    config.validate()?;
    Ok(config)
}

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Choose the [`SaveFormat`] from the `--format` string or infer it from the
/// output file extension. Defaults to PNG when neither is given; an explicit
/// but unknown format is an error, and so is a `--format` that contradicts a
/// recognised `--output` extension.
fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> Result<SaveFormat> {
    let from_output = output.map(SaveFormat::from_path);
    let Some(f) = format_arg else {
        return from_output.unwrap_or(Ok(SaveFormat::Png));
    };

    let format = SaveFormat::from_extension(f)?;
    if let (Some(Ok(implied)), Some(out)) = (from_output, output)
        && implied != format
    {
        return Err(EngineError::InvalidCommand(format!(
            "--format {} does not match output file '{}'",
            format.extension(),
            out.display()
        )));
    }
    Ok(format)
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, derives filename from input stem)
/// 3. Fallback: same directory as input, same stem, new extension
///    (appends `_out` to stem if it would collide with the input path)
fn build_output_path(
    input:      &Path,
    output:     Option<&Path>,
    output_dir: Option<&Path>,
    format:     SaveFormat,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let ext  = format.extension();
    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    let parent = input.parent().unwrap_or(Path::new("."));
    let candidate = parent.join(format!("{}.{}", stem, ext));

    // Avoid silent overwrite of the input
    if candidate == input {
        Some(parent.join(format!("{}_out.{}", stem, ext)))
    } else {
        Some(candidate)
    }
}

/// `<dir>/<stem>_preview.<ext>` next to the main output.
fn preview_path(output: &Path, format: SaveFormat) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let parent = output.parent().unwrap_or(Path::new("."));
    parent.join(format!("{}_preview.{}", stem, format.extension()))
}
