use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use image::DynamicImage;
use serde_json::json;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use sprite_sheet_viewer::loader;
use sprite_sheet_viewer::normalize;
use sprite_sheet_viewer::prefs::{PreferenceStore, Theme};
use sprite_sheet_viewer::render::{render_overlay, OverlayOptions};
use sprite_sheet_viewer::Session;

#[derive(Parser, Debug)]
#[command(
    name = "ssv",
    version,
    about = "Inspect sprite-sheet frame metadata against its image and convert sprite-list JSON"
)]
struct Cli {
    /// Directory holding preferences.toml (default: platform config dir)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print supported commands in JSON
    Commands,
    /// Report which metadata format a JSON file uses
    Detect(DetectArgs),
    /// List the normalized frames of a metadata file
    Frames(FramesArgs),
    /// Pair metadata with its sheet image and render frame boundaries
    View(ViewArgs),
    /// Convert paired sprite-list metadata to the hash-atlas JSON shape
    Export(ExportArgs),
    /// Show or change the saved theme
    Theme(ThemeArgs),
}

#[derive(Args, Debug)]
struct DetectArgs {
    /// Frame metadata JSON
    json: PathBuf,
}

#[derive(Args, Debug)]
struct FramesArgs {
    /// Frame metadata JSON
    json: PathBuf,
    /// Print the normalized frame set as JSON
    #[arg(long)]
    json_out: bool,
}

#[derive(Args, Debug)]
struct ViewArgs {
    /// Frame metadata JSON
    json: PathBuf,
    /// Sprite-sheet image
    image: PathBuf,
    /// Output PNG path
    #[arg(long)]
    out: PathBuf,
    /// Frame name to emphasize
    #[arg(long)]
    highlight: Option<String>,
    /// Skip the "name (wxh)" labels
    #[arg(long)]
    no_labels: bool,
    /// Outline thickness in pixels
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=64))]
    thickness: u32,
    /// Override the saved theme for this render
    #[arg(long, value_enum)]
    theme: Option<Theme>,
    /// Path to write frame metadata sidecar (default: <out>.json)
    #[arg(long)]
    meta_out: Option<PathBuf>,
    /// Disable metadata sidecar output
    #[arg(long)]
    no_meta: bool,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Sprite-list metadata JSON
    json: PathBuf,
    /// Sheet image the metadata must match before it is exported
    image: PathBuf,
    /// Output path (default: <name>_phaser.json next to the input)
    #[arg(long)]
    out: Option<PathBuf>,
    /// Print the document instead of writing a file
    #[arg(long)]
    stdout: bool,
}

#[derive(Args, Debug)]
struct ThemeArgs {
    #[arg(value_enum, default_value_t = ThemeAction::Show)]
    action: ThemeAction,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ThemeAction {
    Show,
    Light,
    Dark,
    Toggle,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let store = match &cli.config_dir {
        Some(dir) => PreferenceStore::in_dir(dir),
        None => PreferenceStore::default_location(),
    };

    match cli.command {
        Commands::Commands => print_commands(),
        Commands::Detect(args) => command_detect(args),
        Commands::Frames(args) => command_frames(args),
        Commands::View(args) => command_view(args, &store),
        Commands::Export(args) => command_export(args),
        Commands::Theme(args) => command_theme(args, &store),
    }
}

fn print_commands() -> Result<()> {
    let rows = vec![
        json!({
            "name": "detect",
            "description": "Classify frame metadata as hash-atlas or sprite-list."
        }),
        json!({
            "name": "frames",
            "description": "List normalized frames with their geometry."
        }),
        json!({
            "name": "view",
            "description": "Check image size against metadata and draw frame boundaries."
        }),
        json!({
            "name": "export",
            "description": "Write paired sprite-list metadata as hash-atlas JSON."
        }),
        json!({
            "name": "theme",
            "description": "Show, set or toggle the saved overlay theme."
        }),
    ];

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({ "commands": rows }))?
    );
    Ok(())
}

fn command_detect(args: DetectArgs) -> Result<()> {
    let (raw, _) = loader::read_json_document(&args.json)
        .with_context(|| format!("failed to read frame metadata: {}", args.json.display()))?;
    let tag = normalize::detect(&raw)
        .with_context(|| format!("cannot classify {}", args.json.display()))?;
    println!(
        "{}",
        serde_json::to_string(&json!({
            "path": abs_path(&args.json).display().to_string(),
            "format": tag,
        }))?
    );
    Ok(())
}

fn command_frames(args: FramesArgs) -> Result<()> {
    let loaded = loader::load_frame_set(&args.json)
        .with_context(|| format!("failed to load frame metadata: {}", args.json.display()))?;
    let frames = &loaded.frame_set;

    if args.json_out {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "format": loaded.tag,
                "sheet_size": frames.sheet_size,
                "frames": frames.frames,
            }))?
        );
        return Ok(());
    }

    println!("{} sheet {} ({} frames)", loaded.tag, frames.sheet_size, frames.len());
    for (name, rect) in &frames.frames {
        println!("{name} ({}x{}) at ({}, {})", rect.w, rect.h, rect.x, rect.y);
    }
    Ok(())
}

fn command_view(args: ViewArgs, store: &PreferenceStore) -> Result<()> {
    let mut session = Session::new();
    session
        .load_frame_set_file(&args.json)
        .with_context(|| format!("failed to load frame metadata: {}", args.json.display()))?;
    session
        .load_image_file(&args.image)
        .with_context(|| format!("failed to load sheet image: {}", args.image.display()))?;

    let (Some(frames), Some(image)) = (session.frame_set(), session.image()) else {
        bail!("frame metadata and image were not paired");
    };

    if let Some(name) = &args.highlight {
        if frames.get(name).is_none() {
            tracing::warn!(frame = %name, "highlighted frame not present in metadata");
        }
    }

    let theme = args.theme.unwrap_or_else(|| store.load().theme);
    let options = OverlayOptions {
        theme,
        labels: !args.no_labels,
        highlight: args.highlight.clone(),
        thickness: args.thickness,
    };
    let (rendered, marks) = render_overlay(&image.pixels().to_rgba8(), frames, &options);
    let (img_w, img_h) = image.dimensions();

    ensure_parent_dir(&args.out)?;
    DynamicImage::ImageRgba8(rendered)
        .save(&args.out)
        .with_context(|| format!("failed to save output image: {}", args.out.display()))?;

    if !args.no_meta {
        let meta_path = args
            .meta_out
            .clone()
            .unwrap_or_else(|| default_sidecar_for(&args.out));

        let payload = json!({
            "overlay_meta_version": 1,
            "json_path": abs_path(&args.json).display().to_string(),
            "image_path": abs_path(&args.image).display().to_string(),
            "output_path": abs_path(&args.out).display().to_string(),
            "generated_at": Utc::now().to_rfc3339(),
            "format": session.source_format(),
            "theme": theme.as_str(),
            "size": {"width": img_w, "height": img_h, "units": "px"},
            "frames": marks,
        });

        write_json_pretty(&meta_path, &payload)?;
    }

    println!("{}", abs_path(&args.out).display());
    Ok(())
}

fn command_export(args: ExportArgs) -> Result<()> {
    let mut session = Session::new();
    session
        .load_frame_set_file(&args.json)
        .with_context(|| format!("failed to load frame metadata: {}", args.json.display()))?;
    session
        .load_image_file(&args.image)
        .with_context(|| format!("failed to load sheet image: {}", args.image.display()))?;

    if !session.can_export() {
        bail!(
            "export is only offered for sprite-list metadata; {} is already hash-atlas",
            args.json.display()
        );
    }
    let frames = session
        .frame_set()
        .context("no frame metadata loaded")?;
    let text = normalize::export_json_pretty(frames)?;

    if args.stdout {
        println!("{text}");
        return Ok(());
    }

    let out = args
        .out
        .unwrap_or_else(|| default_export_path(&args.json, &session.export_file_name()));
    write_output(&out, text)?;
    println!("{}", abs_path(&out).display());
    Ok(())
}

fn command_theme(args: ThemeArgs, store: &PreferenceStore) -> Result<()> {
    let theme = match args.action {
        ThemeAction::Show => store.load().theme,
        ThemeAction::Light => store.set_theme(Theme::Light)?,
        ThemeAction::Dark => store.set_theme(Theme::Dark)?,
        ThemeAction::Toggle => store.toggle_theme()?,
    };
    println!(
        "{}",
        serde_json::to_string(&json!({
            "theme": theme.as_str(),
            "path": store.path().display().to_string(),
        }))?
    );
    Ok(())
}

fn write_json_pretty(path: &Path, value: &serde_json::Value) -> Result<()> {
    write_output(path, serde_json::to_string_pretty(value)?)
}

/// Write an output file, creating missing parent directories first.
fn write_output(path: &Path, contents: String) -> Result<()> {
    ensure_parent_dir(path)?;
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        Some(dir) => fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory: {}", dir.display())),
        None => Ok(()),
    }
}

fn default_sidecar_for(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("overlay")
        .to_string();
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    parent.join(format!("{stem}.json"))
}

fn default_export_path(json_path: &Path, file_name: &str) -> PathBuf {
    json_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(file_name)
}

fn abs_path(path: &Path) -> PathBuf {
    match env::current_dir() {
        Ok(cwd) if path.is_relative() => cwd.join(path),
        _ => path.to_path_buf(),
    }
}
