// ============================================================================
// PhotoFE CLI: headless batch editing via command-line arguments
// ============================================================================
//
// Usage examples:
//   photofe --input photo.png --adjust brightness=250 --output result.png
//   photofe -i photo.jpg --filter moon -o out.png         (format inferred from output ext)
//   photofe -i "*.jpg" --adjust sepia=80 --output-dir processed/ --format png
//   photofe -i shot.png --crop 10,10,200,200 --rotate right --mask heart -o heart.png
//   photofe -i a.png b.png c.png --flip x --output-dir out/
//
// Each input runs through the same sequence of editing actions that the
// interactive editor would record: transforms, then sliders, then filters,
// then the shape mask.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, ValueEnum};

use crate::io::{encode_and_write, SaveFormat};
use crate::ops::adjustments::Adjustment;
use crate::ops::filters::Filter;
use crate::ops::mask::MaskShape;
use crate::project::Project;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rotation {
    Left,
    Right,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlipAxis {
    X,
    Y,
}

/// PhotoFE headless image editor.
#[derive(Parser, Debug)]
#[command(
    name = "photofe",
    about = "PhotoFE headless batch photo editor",
    long_about = "Apply adjustments, filters, transforms and shape masks to image files\n\
                  without opening an editor. Reads and writes PNG, JPEG, WEBP, BMP, TGA,\n\
                  ICO and TIFF.\n\n\
                  Example:\n  \
                  photofe --input photo.png --adjust contrast=140 --filter hudson --output result.png\n  \
                  photofe -i \"*.jpg\" --adjust grayscale=100 --output-dir out/ --format png"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Output file path. Only valid for single-file input.
    /// For batch input use --output-dir instead.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    /// Files are written here with the original stem and the target format's extension.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: png, jpeg, webp, bmp, tga, ico, tiff.
    /// When omitted, the format is inferred from --output's extension, defaulting to png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality (1–100, default 90).
    #[arg(short, long, default_value_t = 90, value_name = "1-100")]
    pub quality: u8,

    /// Slider adjustment, repeatable: brightness, contrast, saturation, hue,
    /// blur, opacity, invert, grayscale, sepia. Out-of-range values clamp.
    #[arg(long = "adjust", value_name = "NAME=VALUE", value_parser = parse_adjust)]
    pub adjust: Vec<(Adjustment, f32)>,

    /// One-shot filter, repeatable: moon, hudson, retro, black-and-white.
    #[arg(long = "filter", value_name = "NAME", value_parser = parse_filter)]
    pub filter: Vec<Filter>,

    /// Rotate the whole image by 90°.
    #[arg(long, value_enum)]
    pub rotate: Option<Rotation>,

    /// Mirror the whole image.
    #[arg(long, value_enum)]
    pub flip: Option<FlipAxis>,

    /// Resample to WIDTHxHEIGHT.
    #[arg(long, value_name = "WxH", value_parser = parse_size)]
    pub resize: Option<(u32, u32)>,

    /// Keep only the X,Y,W,H rectangle.
    #[arg(long, value_name = "X,Y,W,H", value_parser = parse_rect)]
    pub crop: Option<(u32, u32, u32, u32)>,

    /// Fit the image in a shape: heart, circle, triangle, rhombus, star.
    #[arg(long, value_name = "SHAPE", value_parser = parse_mask)]
    pub mask: Option<MaskShape>,

    /// Maximum undo entries kept per image.
    #[arg(long, default_value_t = crate::project::DEFAULT_HISTORY_LIMIT, value_name = "N")]
    pub history_limit: usize,

    /// Seed for reproducible random layouts.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Mirror log output to stderr and print per-file timing and history.
    #[arg(short, long)]
    pub verbose: bool,

    /// Write the session log here instead of the OS data directory.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    // Resolve glob patterns / literal paths → concrete PathBufs
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

    let save_format = parse_format(args.format.as_deref(), args.output.as_deref());

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
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
            eprintln!("  error: cannot determine output path for '{}'.", input_path.display());
            any_failure = true;
            continue;
        };

        match run_one(input_path, &output_path, save_format, &args) {
            Ok(history) => {
                if args.verbose {
                    for label in &history {
                        println!("  · {}", label);
                    }
                }
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                crate::log_err!("{}: {}", input_path.display(), e);
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

/// Edit one file and write the result.  Returns the history labels.
fn run_one(input: &Path, output: &Path, format: SaveFormat, args: &CliArgs) -> Result<Vec<String>, String> {
    // -- Step 1: Load ----------------------------------------------------
    let mut project = Project::from_file(input, args.history_limit, args.seed)
        .map_err(|e| format!("load failed: {}", e))?;

    // -- Step 2: Geometry ------------------------------------------------
    if let Some((x, y, w, h)) = args.crop {
        project.crop(x, y, w, h).map_err(|e| format!("crop failed: {}", e))?;
    }
    if let Some((w, h)) = args.resize {
        project.resize(w, h).map_err(|e| format!("resize failed: {}", e))?;
    }
    match args.rotate {
        Some(Rotation::Left) => {
            project.rotate_left();
        }
        Some(Rotation::Right) => {
            project.rotate_right();
        }
        None => {}
    }
    match args.flip {
        Some(FlipAxis::X) => {
            project.flip_x();
        }
        Some(FlipAxis::Y) => {
            project.flip_y();
        }
        None => {}
    }

    // -- Step 3: Sliders, then filters -------------------------------------
    for &(adj, value) in &args.adjust {
        if let Some(stored) = project.set_adjustment(adj, value)
            && stored != value
        {
            eprintln!("  warning: {} clamped to {}", adj, stored);
        }
    }
    for &filter in &args.filter {
        project.apply_filter(filter);
    }

    // -- Step 4: Shape mask --------------------------------------------------
    if let Some(shape) = args.mask {
        project.apply_mask(shape);
    }

    // -- Step 5: Save ----------------------------------------------------
    let flat = project.export();
    encode_and_write(flat.as_rgba_image(), output, format, args.quality)
        .map_err(|e| format!("save failed: {}", e))?;
    project.mark_clean();

    Ok(project.history_labels())
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            // Literal path, use directly
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        // Treat as glob pattern
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
/// output file extension. Defaults to PNG when neither is known.
fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> SaveFormat {
    match (format_arg, output) {
        (Some(f), _) => SaveFormat::from_name(f),
        (None, Some(out)) => SaveFormat::from_path(out),
        (None, None) => SaveFormat::Png,
    }
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, derives filename from input stem)
/// 3. Fallback: same directory as input, same stem, new extension
///    (appends `_out` to stem if it would collide with the input path)
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: SaveFormat,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let ext = format.extension();
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

/// `brightness=150`
fn parse_adjust(s: &str) -> Result<(Adjustment, f32), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))?;
    let adj: Adjustment = name.parse().map_err(|e: crate::error::EditorError| e.to_string())?;
    let value: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", value.trim()))?;
    if !value.is_finite() {
        return Err(format!("'{}' is not a finite number", value));
    }
    Ok((adj, value))
}

fn parse_filter(s: &str) -> Result<Filter, String> {
    s.parse().map_err(|e: crate::error::EditorError| e.to_string())
}

fn parse_mask(s: &str) -> Result<MaskShape, String> {
    s.parse().map_err(|e: crate::error::EditorError| e.to_string())
}

/// `800x600`
fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .to_ascii_lowercase()
        .split_once('x')
        .map(|(w, h)| (w.trim().to_string(), h.trim().to_string()))
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
    let w: u32 = w.parse().map_err(|_| format!("bad width '{}'", w))?;
    let h: u32 = h.parse().map_err(|_| format!("bad height '{}'", h))?;
    if w == 0 || h == 0 {
        return Err(format!("size must be non-zero, got {}x{}", w, h));
    }
    Ok((w, h))
}

/// `X,Y,W,H`
fn parse_rect(s: &str) -> Result<(u32, u32, u32, u32), String> {
    let parts: Vec<u32> = s
        .split(',')
        .map(|p| p.trim().parse::<u32>().map_err(|_| format!("bad number '{}' in '{}'", p.trim(), s)))
        .collect::<Result<_, _>>()?;
    match parts.as_slice() {
        &[x, y, w, h] => Ok((x, y, w, h)),
        _ => Err(format!("expected X,Y,W,H, got '{}'", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjust_pairs_parse() {
        assert_eq!(parse_adjust("brightness=150"), Ok((Adjustment::Brightness, 150.0)));
        assert_eq!(parse_adjust("Hue= 90"), Ok((Adjustment::Hue, 90.0)));
        assert!(parse_adjust("brightness").is_err());
        assert!(parse_adjust("glow=1").is_err());
        assert!(parse_adjust("blur=lots").is_err());
        assert!(parse_adjust("blur=NaN").is_err());
    }

    #[test]
    fn sizes_and_rects_parse() {
        assert_eq!(parse_size("800x600"), Ok((800, 600)));
        assert_eq!(parse_size("10X20"), Ok((10, 20)));
        assert!(parse_size("0x5").is_err());
        assert!(parse_size("800").is_err());
        assert_eq!(parse_rect("1, 2,3,4"), Ok((1, 2, 3, 4)));
        assert!(parse_rect("1,2,3").is_err());
        assert!(parse_rect("1,2,three,4").is_err());
    }

    #[test]
    fn named_values_parse() {
        assert_eq!(parse_filter("vintage"), Ok(Filter::Retro));
        assert_eq!(parse_mask("diamond"), Ok(MaskShape::Rhombus));
        assert!(parse_filter("lomo").is_err());
    }

    #[test]
    fn format_prefers_explicit_flag() {
        assert_eq!(parse_format(Some("jpg"), Some(Path::new("a.png"))), SaveFormat::Jpeg);
        assert_eq!(parse_format(None, Some(Path::new("a.bmp"))), SaveFormat::Bmp);
        assert_eq!(parse_format(None, None), SaveFormat::Png);
    }

    #[test]
    fn output_path_avoids_overwriting_input() {
        let input = Path::new("shots/a.png");
        assert_eq!(
            build_output_path(input, None, None, SaveFormat::Png),
            Some(PathBuf::from("shots/a_out.png"))
        );
        assert_eq!(
            build_output_path(input, None, Some(Path::new("out")), SaveFormat::Jpeg),
            Some(PathBuf::from("out/a.jpg"))
        );
        assert_eq!(
            build_output_path(input, Some(Path::new("x.tga")), None, SaveFormat::Tga),
            Some(PathBuf::from("x.tga"))
        );
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        CliArgs::command().debug_assert();
        let args = CliArgs::try_parse_from([
            "photofe", "-i", "a.png", "--adjust", "sepia=40", "--adjust", "blur=2",
            "--filter", "moon", "--rotate", "left", "--flip", "y", "--crop", "0,0,5,5",
        ])
        .unwrap();
        assert_eq!(args.adjust.len(), 2);
        assert_eq!(args.rotate, Some(Rotation::Left));
        assert_eq!(args.flip, Some(FlipAxis::Y));
        assert_eq!(args.crop, Some((0, 0, 5, 5)));
    }
}
