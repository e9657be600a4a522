use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use globset::{Glob, GlobSetBuilder};
use handlebars::Handlebars;
use image::{ImageReader, Rgb, RgbaImage};
use pixel_forge_core::color::{HueBand, parse_hex};
use pixel_forge_core::config::{
    AtlasConfig, ChannelAdjustment, ChannelAdjustments, CleanupConfig, ColorMode, DitherConfig,
    OutlineConfig, OverflowPolicy, PipelineConfig, ScaleMode,
};
use pixel_forge_core::palette::{
    Palette, export_palette_json, export_palette_text, generate_auto, import_palette, preset,
    preset_names,
};
use pixel_forge_core::{
    ManualEdits, TextureAtlas, encode_png, load_project, pixelate, pixelate_many, save_project,
    to_layout_json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(
    name = "pixel-forge",
    about = "Turn images into pixel art and arrange sprites into texture atlases",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show progress bars (disable with --no-progress or --quiet)
    #[arg(long, default_value_t = true, action=ArgAction::Set, global=true, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert an image (or a directory of images) into pixel art
    Pixelate(PixelateArgs),
    /// Enlarge pixel art by an integer factor without smoothing
    Upscale(UpscaleArgs),
    /// Arrange images into a single atlas PNG
    Atlas(AtlasArgs),
    /// Export or import palettes
    Palette {
        #[command(subcommand)]
        command: PaletteCommand,
    },
}

#[derive(Subcommand, Debug)]
enum PaletteCommand {
    /// Write a built-in preset or an auto palette taken from an image
    Export(PaletteExportArgs),
    /// Read hex colours from any text file and save them as a palette
    Import(PaletteImportArgs),
}

#[derive(Parser, Debug, Clone)]
struct PixelateArgs {
    // Input/Output
    /// Input file or directory
    #[arg(help_heading = "Input/Output")]
    input: PathBuf,
    /// Output file (single input only; default pixelart_{w}x{h}.png)
    #[arg(short, long, help_heading = "Input/Output")]
    output: Option<PathBuf>,
    /// Output directory
    #[arg(long, default_value = ".", help_heading = "Input/Output")]
    out_dir: PathBuf,
    /// YAML config file path (overrides pipeline options)
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,
    /// Include patterns (glob) when the input is a directory
    #[arg(long, help_heading = "Input/Output")]
    include: Vec<String>,
    /// Exclude patterns (glob) when the input is a directory
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,
    /// Manual pixel edits (JSON list of {x, y, rgba}); single input only
    #[arg(long, help_heading = "Input/Output")]
    edits: Option<PathBuf>,

    // Size & palette
    /// Target width in pixels; height follows the aspect ratio
    #[arg(long, default_value_t = 32, help_heading = "Size/Palette")]
    width: u32,
    /// Maximum colours for the auto palette
    #[arg(long, default_value_t = 16, help_heading = "Size/Palette")]
    colors: usize,
    /// Built-in palette instead of auto: gameboy|pico8|cga|nes|grayscale4|sweetie16
    #[arg(long, help_heading = "Size/Palette")]
    preset: Option<String>,
    /// Palette file (palette JSON or any text containing #RRGGBB tokens)
    #[arg(long, help_heading = "Size/Palette")]
    palette_file: Option<PathBuf>,
    /// Skip quantization and keep the resized colours
    #[arg(long, default_value_t = false, help_heading = "Size/Palette")]
    keep_colors: bool,

    // Grading
    /// Brightness delta (-50..50)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true, help_heading = "Grading")]
    brightness: f32,
    /// Contrast delta (-50..50)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true, help_heading = "Grading")]
    contrast: f32,
    /// Saturation delta in percent (-100..100)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true, help_heading = "Grading")]
    saturation: f32,
    /// Per-hue adjustment `band:saturation:lightness`, e.g. `blue:30:-10` (repeatable)
    #[arg(long = "band", allow_hyphen_values = true, help_heading = "Grading")]
    bands: Vec<String>,
    /// Luminance noise before quantization (0..0.5)
    #[arg(long, default_value_t = 0.0, help_heading = "Grading")]
    noise: f32,

    // Post-processing
    /// Floyd-Steinberg dithering
    #[arg(long, default_value_t = false, help_heading = "Post-processing")]
    dither: bool,
    /// Dither error scale (0.1..1)
    #[arg(long, default_value_t = 1.0, help_heading = "Post-processing")]
    dither_strength: f32,
    /// Remove isolated single pixels
    #[arg(long, default_value_t = false, help_heading = "Post-processing")]
    cleanup: bool,
    /// Cleanup passes (1 or 2)
    #[arg(long, default_value_t = 1, help_heading = "Post-processing")]
    cleanup_passes: u32,
    /// Grain added after quantization (0..0.5)
    #[arg(long, default_value_t = 0.0, help_heading = "Post-processing")]
    roughness: f32,
    /// Draw a 1px outline around opaque shapes
    #[arg(long, default_value_t = false, help_heading = "Post-processing")]
    outline: bool,
    /// Outline colour (#RGB or #RRGGBB)
    #[arg(long, default_value = "#000000", help_heading = "Post-processing")]
    outline_color: String,
    /// Seed for noise and roughness (reproducible output)
    #[arg(long, help_heading = "Post-processing")]
    seed: Option<u64>,

    // Export
    /// Print the merged configuration (after CLI/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,
    /// Also write the palette used (JSON) next to the image
    #[arg(long, default_value_t = false, help_heading = "Export")]
    save_palette: bool,
}

#[derive(Parser, Debug, Clone)]
struct UpscaleArgs {
    /// Input image
    input: PathBuf,
    /// Integer scale factor
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u32).range(1..=16))]
    factor: u32,
    /// Output file (default pixelart_x{factor}.png)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
struct AtlasArgs {
    // Input/Output
    /// Input file or directory (appended to the project, if any)
    #[arg(help_heading = "Input/Output")]
    input: Option<PathBuf>,
    /// Start from a saved project
    #[arg(long, help_heading = "Input/Output")]
    project: Option<PathBuf>,
    /// Output PNG (default atlas_{w}x{h}.png)
    #[arg(short, long, help_heading = "Input/Output")]
    output: Option<PathBuf>,
    /// Output directory
    #[arg(long, default_value = ".", help_heading = "Input/Output")]
    out_dir: PathBuf,
    /// YAML config file path (overrides layout options)
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,
    /// Include patterns (glob). If set, only files matching any pattern are considered
    #[arg(long, help_heading = "Input/Output")]
    include: Vec<String>,
    /// Exclude patterns (glob). Files matching any pattern will be ignored
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,

    // Layout
    /// Canvas width
    #[arg(long, default_value_t = 512, help_heading = "Layout")]
    width: u32,
    /// Canvas height
    #[arg(long, default_value_t = 512, help_heading = "Layout")]
    height: u32,
    /// Grid tile size, WxH
    #[arg(long, default_value = "16x16", help_heading = "Layout")]
    tile: String,
    /// Padding around every texture (also the grid gap)
    #[arg(long, default_value_t = 0, help_heading = "Layout")]
    padding: u32,
    /// Round footprints up to whole tiles
    #[arg(long, default_value_t = true, action=ArgAction::Set, help_heading = "Layout")]
    grid: bool,
    /// What to do when content runs past the canvas: report | grow | reject
    #[arg(long, default_value = "report", help_heading = "Layout")]
    overflow: String,
    /// Keep positions loaded from the project instead of re-arranging
    #[arg(long, default_value_t = false, help_heading = "Layout")]
    keep_positions: bool,

    // Export
    /// Write layout metadata (JSON frames) to this file
    #[arg(long, help_heading = "Export")]
    layout: Option<PathBuf>,
    /// Save the workspace as a project file (default name atlas_project.json)
    #[arg(long, num_args = 0..=1, default_missing_value = "atlas_project.json", help_heading = "Export")]
    save_project: Option<PathBuf>,
    /// Built-in engine template: godot | phaser3 | css
    #[arg(long, help_heading = "Export")]
    engine: Option<String>,
    /// External template file (handlebars)
    #[arg(long, help_heading = "Export")]
    template: Option<PathBuf>,
    /// Also write a preview PNG with the guide grid
    #[arg(long, help_heading = "Export")]
    preview: Option<PathBuf>,
    /// Export atlas stats (JSON) to this file
    #[arg(long, help_heading = "Export")]
    export_stats: Option<PathBuf>,
    /// Print the merged configuration (after CLI/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Dry run: arrange and report but do not write files
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,
}

#[derive(Parser, Debug, Clone)]
struct PaletteExportArgs {
    /// Preset name (omit with --from-image)
    preset: Option<String>,
    /// Build an auto palette from this image instead
    #[arg(long, conflicts_with = "preset")]
    from_image: Option<PathBuf>,
    /// Maximum colours for --from-image
    #[arg(long, default_value_t = 16)]
    colors: usize,
    /// json | text
    #[arg(long, default_value = "json", value_parser = ["json", "text"])]
    format: String,
    /// Output file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// List preset names and exit
    #[arg(long, default_value_t = false)]
    list: bool,
}

#[derive(Parser, Debug, Clone)]
struct PaletteImportArgs {
    /// Text file containing #RGB / #RRGGBB tokens
    input: PathBuf,
    /// Palette name (defaults to the file stem)
    #[arg(long)]
    name: Option<String>,
    /// json | text
    #[arg(long, default_value = "json", value_parser = ["json", "text"])]
    format: String,
    /// Output file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    let show_progress = cli.progress && !cli.quiet;
    match &cli.command {
        Commands::Pixelate(args) => run_pixelate(args, show_progress),
        Commands::Upscale(args) => run_upscale(args),
        Commands::Atlas(args) => run_atlas(args, show_progress),
        Commands::Palette { command } => match command {
            PaletteCommand::Export(args) => run_palette_export(args),
            PaletteCommand::Import(args) => run_palette_import(args),
        },
    }
}

fn run_pixelate(args: &PixelateArgs, show_progress: bool) -> anyhow::Result<()> {
    let mut cfg = pipeline_config_from_args(args)?;
    if let Some(path) = &args.config {
        let file = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let y: PipelineYaml = serde_yaml::from_str(&file)?;
        cfg = y.into_pipeline_config(cfg)?;
    }
    cfg.validate()?;

    if args.print_config {
        match args.print_config_format.as_str() {
            "yaml" => println!("{}", serde_yaml::to_string(&cfg)?),
            _ => println!("{}", serde_json::to_string_pretty(&cfg)?),
        }
        return Ok(());
    }

    let edits = match &args.edits {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("read edits {}", path.display()))?;
            serde_json::from_str::<ManualEdits>(&text)
                .with_context(|| format!("parse edits {}", path.display()))?
        }
        None => ManualEdits::new(),
    };

    let paths = gather_paths(&args.input, &args.include, &args.exclude)?;
    if paths.is_empty() {
        anyhow::bail!("no images found under {}", args.input.display());
    }
    if paths.len() > 1 && (args.output.is_some() || !edits.is_empty()) {
        anyhow::bail!("--output and --edits need a single input image");
    }
    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create out_dir {}", args.out_dir.display()))?;

    let inputs = load_images_with_progress(&paths, show_progress)?;
    info!(count = inputs.len(), "loaded input images");
    let start = Instant::now();

    if let [(name, img)] = inputs.as_slice() {
        let out = pixelate(img, &cfg, &edits)?;
        let (w, h) = out.image.dimensions();
        let path = args
            .output
            .clone()
            .unwrap_or_else(|| args.out_dir.join(format!("pixelart_{w}x{h}.png")));
        write_png(&path, &out.image)?;
        info!(?path, source = %name, width = w, height = h, cleaned = out.stats.cleaned, outlined = out.stats.outlined, "pixel art written");
        if args.save_palette {
            if let Some(pal) = &out.palette {
                write_palette_next_to(&path, pal)?;
            }
        }
    } else {
        let images: Vec<RgbaImage> = inputs.iter().map(|(_, img)| img.clone()).collect();
        let results = pixelate_many(&images, &cfg);
        for ((name, _), res) in inputs.iter().zip(results) {
            match res {
                Ok(out) => {
                    let (w, h) = out.image.dimensions();
                    let stem = Path::new(name)
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .unwrap_or("image");
                    let path = args.out_dir.join(format!("{stem}_pixelart_{w}x{h}.png"));
                    write_png(&path, &out.image)?;
                    if args.save_palette {
                        if let Some(pal) = &out.palette {
                            write_palette_next_to(&path, pal)?;
                        }
                    }
                    info!(?path, "pixel art written");
                }
                Err(e) => error!(source = %name, error = %e, "skip image"),
            }
        }
    }
    info!(elapsed = %fmt_dur(start.elapsed()), "done");
    Ok(())
}

fn run_upscale(args: &UpscaleArgs) -> anyhow::Result<()> {
    let img = load_image(&args.input)
        .with_context(|| format!("load {}", args.input.display()))?;
    let cfg = PipelineConfig::builder()
        .upscale(args.factor)
        .keep_colors()
        .build();
    let out = pixelate(&img, &cfg, &ManualEdits::new())?;
    let path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("pixelart_x{}.png", args.factor)));
    write_png(&path, &out.image)?;
    let (w, h) = out.image.dimensions();
    info!(?path, width = w, height = h, factor = args.factor, "upscaled image written");
    Ok(())
}

fn run_atlas(args: &AtlasArgs, show_progress: bool) -> anyhow::Result<()> {
    let mut atlas = match &args.project {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("read project {}", path.display()))?;
            let atlas = load_project(&text)
                .with_context(|| format!("load project {}", path.display()))?;
            info!(textures = atlas.len(), "project loaded");
            atlas
        }
        None => TextureAtlas::new(atlas_config_from_args(args)?),
    };
    // Explicit layout flags win over the project's stored settings.
    if args.project.is_none() || args.config.is_some() || layout_flags_given(args) {
        let mut cfg = if args.project.is_some() && !layout_flags_given(args) {
            *atlas.config()
        } else {
            atlas_config_from_args(args)?
        };
        if let Some(path) = &args.config {
            let file = fs::read_to_string(path)
                .with_context(|| format!("read config {}", path.display()))?;
            let y: AtlasYaml = serde_yaml::from_str(&file)?;
            cfg = y.into_atlas_config(cfg)?;
        }
        cfg.validate()?;
        atlas.set_config(cfg);
    }

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(atlas.config())?);
        return Ok(());
    }

    let mut added = 0usize;
    if let Some(input) = &args.input {
        let paths = gather_paths(input, &args.include, &args.exclude)?;
        for (name, img) in load_images_with_progress(&paths, show_progress)? {
            atlas.add_texture(name, img);
            added += 1;
        }
        info!(count = added, "loaded input images");
    }
    if atlas.is_empty() {
        anyhow::bail!("nothing to pack: give an input directory or a non-empty --project");
    }

    if !(args.keep_positions && args.project.is_some() && added == 0) {
        let report = atlas.auto_arrange().context("auto-arrange")?;
        info!(
            placed = report.placed,
            shelves = report.shelves,
            overflowed = report.overflowed.len(),
            grew = report.grew,
            "arranged"
        );
        for id in &report.overflowed {
            if let Some(t) = atlas.get(*id) {
                warn!(name = %t.name, x = t.x, y = t.y, "texture is outside the canvas");
            }
        }
    }

    let stats = atlas.stats();
    info!("{}", stats.summary());
    let (w, h) = (atlas.config().width, atlas.config().height);

    if args.dry_run {
        println!("{}", stats.summary());
        return Ok(());
    }

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create out_dir {}", args.out_dir.display()))?;
    let png_path = args
        .output
        .clone()
        .unwrap_or_else(|| args.out_dir.join(format!("atlas_{w}x{h}.png")));
    write_png(&png_path, &atlas.compose())?;
    info!(?png_path, "atlas written");

    if let Some(path) = &args.preview {
        write_png(path, &atlas.compose_preview())?;
        info!(?path, "preview written");
    }
    if let Some(path) = &args.layout {
        let json = serde_json::to_string_pretty(&to_layout_json(&atlas))?;
        fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
        info!(?path, "layout written");
    }
    if let Some(path) = &args.save_project {
        let path = if path.is_relative() && path.parent().is_none_or(|p| p.as_os_str().is_empty()) {
            args.out_dir.join(path)
        } else {
            path.clone()
        };
        fs::write(&path, save_project(&atlas)?)
            .with_context(|| format!("write {}", path.display()))?;
        info!(?path, "project saved");
    }
    if args.engine.is_some() || args.template.is_some() {
        let image_name = png_path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("atlas.png")
            .to_string();
        let ctx = build_template_context(&atlas, &image_name);
        let tpl_owned_from_file: Option<String> = match &args.template {
            Some(path) => Some(
                fs::read_to_string(path)
                    .with_context(|| format!("read template {}", path.display()))?,
            ),
            None => None,
        };
        let (tpl_ref, ext): (&str, &str) = if let Some(ref s) = tpl_owned_from_file {
            (s.as_str(), "template.txt")
        } else {
            match args
                .engine
                .as_deref()
                .unwrap_or("godot")
                .to_ascii_lowercase()
                .as_str()
            {
                "godot" => (include_str!("templates/godot.hbs"), "godot.json"),
                "phaser3" => (include_str!("templates/phaser3.hbs"), "phaser3.json"),
                "css" => (include_str!("templates/css.hbs"), "css"),
                other => anyhow::bail!("unknown engine template: {}", other),
            }
        };
        let mut reg = Handlebars::new();
        reg.set_strict_mode(true);
        reg.register_template_string("tpl", tpl_ref)?;
        let rendered = reg.render("tpl", &ctx)?;
        let out_path = png_path.with_extension(ext);
        fs::write(&out_path, rendered)
            .with_context(|| format!("write {}", out_path.display()))?;
        info!(?out_path, "template written");
    }
    if let Some(path) = &args.export_stats {
        fs::write(path, serde_json::to_string_pretty(&stats)?)
            .with_context(|| format!("write {}", path.display()))?;
        info!(?path, "stats exported");
    }
    Ok(())
}

fn run_palette_export(args: &PaletteExportArgs) -> anyhow::Result<()> {
    if args.list {
        for name in preset_names() {
            println!("{name}");
        }
        return Ok(());
    }
    let pal = match (&args.preset, &args.from_image) {
        (_, Some(path)) => {
            let img = load_image(path).with_context(|| format!("load {}", path.display()))?;
            let mut pal = generate_auto(&img, args.colors);
            pal.name = file_stem(path);
            pal
        }
        (Some(name), None) => preset(name)?,
        (None, None) => anyhow::bail!("give a preset name or --from-image (see --list)"),
    };
    emit_palette(&pal, &args.format, args.output.as_deref())
}

fn run_palette_import(args: &PaletteImportArgs) -> anyhow::Result<()> {
    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("read {}", args.input.display()))?;
    let name = args.name.clone().unwrap_or_else(|| file_stem(&args.input));
    let pal = import_palette(&name, &text)?;
    info!(name = %pal.name, colors = pal.len(), "palette imported");
    emit_palette(&pal, &args.format, args.output.as_deref())
}

fn emit_palette(pal: &Palette, format: &str, output: Option<&Path>) -> anyhow::Result<()> {
    let body = match format {
        "text" => export_palette_text(pal),
        _ => export_palette_json(pal)?,
    };
    match output {
        Some(path) => {
            fs::write(path, body).with_context(|| format!("write {}", path.display()))?;
            info!(?path, colors = pal.len(), "palette written");
        }
        None => println!("{body}"),
    }
    Ok(())
}

fn write_palette_next_to(image_path: &Path, pal: &Palette) -> anyhow::Result<()> {
    let path = image_path.with_extension("palette.json");
    fs::write(&path, export_palette_json(pal)?)
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

fn read_palette_file(path: &Path) -> anyhow::Result<Palette> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    if let Ok(p) = serde_json::from_str::<Palette>(&text) {
        return Ok(p);
    }
    Ok(import_palette(&file_stem(path), &text)?)
}

fn pipeline_config_from_args(args: &PixelateArgs) -> anyhow::Result<PipelineConfig> {
    let color = if let Some(path) = &args.palette_file {
        ColorMode::Custom {
            palette: read_palette_file(path)?,
        }
    } else if let Some(name) = &args.preset {
        ColorMode::Preset { name: name.clone() }
    } else if args.keep_colors {
        ColorMode::Keep
    } else {
        ColorMode::Auto {
            max_colors: args.colors,
        }
    };
    let mut channels = ChannelAdjustments::default();
    for band_arg in &args.bands {
        let (band, adj) = parse_band(band_arg)?;
        channels.set(band, adj);
    }
    let mut cfg = PipelineConfig {
        scale: ScaleMode::Downscale {
            target_width: args.width,
        },
        color,
        dither: DitherConfig {
            enabled: args.dither,
            strength: args.dither_strength,
        },
        cleanup: CleanupConfig {
            enabled: args.cleanup,
            passes: args.cleanup_passes,
        },
        roughness: args.roughness,
        outline: OutlineConfig {
            enabled: args.outline,
            color: parse_color(&args.outline_color)?,
        },
        seed: args.seed,
        ..Default::default()
    };
    cfg.grading.brightness = args.brightness;
    cfg.grading.contrast = args.contrast;
    cfg.grading.saturation = args.saturation;
    cfg.grading.noise = args.noise;
    cfg.grading.channels = channels;
    Ok(cfg)
}

fn parse_band(arg: &str) -> anyhow::Result<(HueBand, ChannelAdjustment)> {
    let parts: Vec<&str> = arg.split(':').collect();
    let [name, sat, light] = parts.as_slice() else {
        anyhow::bail!("band must look like name:saturation:lightness, got {arg:?}");
    };
    let band: HueBand = name
        .parse()
        .map_err(|_| anyhow::anyhow!("unknown hue band: {}", name))?;
    let sat: f32 = sat
        .trim()
        .parse()
        .with_context(|| format!("band saturation in {arg:?}"))?;
    let light: f32 = light
        .trim()
        .parse()
        .with_context(|| format!("band lightness in {arg:?}"))?;
    Ok((band, ChannelAdjustment::new(sat, light)))
}

fn parse_color(s: &str) -> anyhow::Result<Rgb<u8>> {
    parse_hex(s).ok_or_else(|| anyhow::anyhow!("invalid colour: {}", s))
}

fn parse_tile(s: &str) -> anyhow::Result<(u32, u32)> {
    let (w, h) = s
        .to_ascii_lowercase()
        .split_once('x')
        .map(|(w, h)| (w.trim().to_string(), h.trim().to_string()))
        .ok_or_else(|| anyhow::anyhow!("tile size must look like WxH, got {}", s))?;
    Ok((
        w.parse().with_context(|| format!("tile width in {s:?}"))?,
        h.parse().with_context(|| format!("tile height in {s:?}"))?,
    ))
}

fn parse_overflow(s: &str) -> anyhow::Result<OverflowPolicy> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("unknown overflow policy: {} (report|grow|reject)", s))
}

fn atlas_config_from_args(args: &AtlasArgs) -> anyhow::Result<AtlasConfig> {
    let (tw, th) = parse_tile(&args.tile)?;
    Ok(AtlasConfig::builder()
        .with_canvas(args.width, args.height)
        .with_tile(tw, th)
        .padding(args.padding)
        .use_grid(args.grid)
        .overflow(parse_overflow(&args.overflow)?)
        .build())
}

/// True when any layout flag differs from its default, i.e. the user asked for it.
fn layout_flags_given(args: &AtlasArgs) -> bool {
    args.width != 512
        || args.height != 512
        || args.tile != "16x16"
        || args.padding != 0
        || !args.grid
        || args.overflow != "report"
}

fn file_stem(p: &Path) -> String {
    p.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("palette")
        .to_string()
}

fn fmt_dur(d: std::time::Duration) -> String {
    let ms = d.as_secs_f64() * 1000.0;
    if ms >= 1.0 {
        format!("{:.1}ms", ms)
    } else {
        format!("{}us", d.as_micros())
    }
}

fn gather_paths(
    path: &Path,
    include: &[String],
    exclude: &[String],
) -> anyhow::Result<Vec<PathBuf>> {
    // Build glob matchers
    let mut inc_set = None;
    if !include.is_empty() {
        let mut b = GlobSetBuilder::new();
        for pat in include {
            b.add(Glob::new(pat)?);
        }
        inc_set = Some(b.build()?);
    }
    let mut exc_set = None;
    if !exclude.is_empty() {
        let mut b = GlobSetBuilder::new();
        for pat in exclude {
            b.add(Glob::new(pat)?);
        }
        exc_set = Some(b.build()?);
    }
    let mut list: Vec<PathBuf> = Vec::new();
    if path.is_file() {
        if !should_skip(path, inc_set.as_ref(), exc_set.as_ref()) && is_image(path) {
            list.push(path.to_path_buf());
        }
    } else {
        for entry in WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let p = entry.path();
            if p.is_file() && !should_skip(p, inc_set.as_ref(), exc_set.as_ref()) && is_image(p) {
                list.push(p.to_path_buf());
            }
        }
    }
    Ok(list)
}

fn should_skip(
    p: &Path,
    include: Option<&globset::GlobSet>,
    exclude: Option<&globset::GlobSet>,
) -> bool {
    let s = p.to_string_lossy().replace('\\', "/");
    if let Some(ex) = exclude {
        if ex.is_match(&s) {
            return true;
        }
    }
    if let Some(inc) = include {
        if !inc.is_match(&s) {
            return true;
        }
    }
    false
}

fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_ascii_lowercase()),
        Some(ext) if matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "bmp" | "gif" | "webp")
    )
}

/// Decode every path, skipping (and logging) the ones that fail.
/// Entries are `(file name, pixels)` in path order.
fn load_images_with_progress(
    paths: &[PathBuf],
    progress: bool,
) -> anyhow::Result<Vec<(String, RgbaImage)>> {
    use indicatif::{ProgressBar, ProgressStyle};
    let bar = if progress {
        let b = ProgressBar::new(paths.len() as u64);
        b.set_style(ProgressStyle::with_template(
            "{spinner:.green} loading {pos}/{len} [{elapsed_precise}] {wide_msg}",
        )?);
        Some(b)
    } else {
        None
    };
    let mut list = Vec::with_capacity(paths.len());
    for p in paths {
        let name = p
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_string();
        if let Some(b) = &bar {
            b.set_message(name.clone());
        }
        match load_image(p) {
            Ok(img) => list.push((name, img)),
            Err(e) => {
                error!(?p, error = %e, "skip image");
            }
        }
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    Ok(list)
}

fn load_image(p: &Path) -> anyhow::Result<RgbaImage> {
    let img = ImageReader::open(p)?.with_guessed_format()?.decode()?;
    Ok(img.to_rgba8())
}

fn write_png(path: &Path, img: &RgbaImage) -> anyhow::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    fs::write(path, encode_png(img)?).with_context(|| format!("write {}", path.display()))
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .try_init();
}

#[derive(Serialize)]
struct TemplateSprite {
    name: String,
    slug: String,
    frame: serde_json::Value,
    source_size: serde_json::Value,
}

#[derive(Serialize)]
struct TemplateContext {
    image: String,
    size: serde_json::Value,
    sprites: Vec<TemplateSprite>,
    meta: serde_json::Value,
}

fn build_template_context(atlas: &TextureAtlas, image: &str) -> TemplateContext {
    let cfg = atlas.config();
    let sprites = atlas
        .textures()
        .iter()
        .map(|t| {
            let (x, y) = t.drawn_origin(cfg.padding);
            TemplateSprite {
                name: t.name.clone(),
                slug: t
                    .name
                    .chars()
                    .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
                    .collect(),
                frame: serde_json::json!({
                    "x": x,
                    "y": y,
                    "w": t.width(),
                    "h": t.height(),
                }),
                source_size: serde_json::json!({"w": t.width(), "h": t.height()}),
            }
        })
        .collect();
    TemplateContext {
        image: image.to_string(),
        size: serde_json::json!({"w": cfg.width, "h": cfg.height}),
        sprites,
        meta: serde_json::json!({
            "app": "pixel-forge",
            "version": env!("CARGO_PKG_VERSION"),
        }),
    }
}

/// Pipeline options from a YAML file; every present key overrides the CLI value.
#[derive(Debug, Deserialize, Default)]
struct PipelineYaml {
    width: Option<u32>,
    upscale: Option<u32>,
    colors: Option<usize>,
    preset: Option<String>,
    palette_file: Option<PathBuf>,
    keep_colors: Option<bool>,
    brightness: Option<f32>,
    contrast: Option<f32>,
    saturation: Option<f32>,
    noise: Option<f32>,
    channels: Option<ChannelAdjustments>,
    dither: Option<bool>,
    dither_strength: Option<f32>,
    cleanup: Option<bool>,
    cleanup_passes: Option<u32>,
    roughness: Option<f32>,
    outline: Option<bool>,
    outline_color: Option<String>,
    seed: Option<u64>,
}

impl PipelineYaml {
    fn into_pipeline_config(self, mut cfg: PipelineConfig) -> anyhow::Result<PipelineConfig> {
        if let Some(v) = self.width {
            cfg.scale = ScaleMode::Downscale { target_width: v };
        }
        if let Some(v) = self.upscale {
            cfg.scale = ScaleMode::Upscale { factor: v };
        }
        if let Some(v) = self.colors {
            cfg.color = ColorMode::Auto { max_colors: v };
        }
        if let Some(v) = self.preset {
            cfg.color = ColorMode::Preset { name: v };
        }
        if let Some(path) = self.palette_file {
            cfg.color = ColorMode::Custom {
                palette: read_palette_file(&path)?,
            };
        }
        if self.keep_colors == Some(true) {
            cfg.color = ColorMode::Keep;
        }
        if let Some(v) = self.brightness {
            cfg.grading.brightness = v;
        }
        if let Some(v) = self.contrast {
            cfg.grading.contrast = v;
        }
        if let Some(v) = self.saturation {
            cfg.grading.saturation = v;
        }
        if let Some(v) = self.noise {
            cfg.grading.noise = v;
        }
        if let Some(v) = self.channels {
            cfg.grading.channels = v;
        }
        if let Some(v) = self.dither {
            cfg.dither.enabled = v;
        }
        if let Some(v) = self.dither_strength {
            cfg.dither.strength = v;
        }
        if let Some(v) = self.cleanup {
            cfg.cleanup.enabled = v;
        }
        if let Some(v) = self.cleanup_passes {
            cfg.cleanup.passes = v;
        }
        if let Some(v) = self.roughness {
            cfg.roughness = v;
        }
        if let Some(v) = self.outline {
            cfg.outline.enabled = v;
        }
        if let Some(v) = self.outline_color {
            cfg.outline.color = parse_color(&v)?;
        }
        if let Some(v) = self.seed {
            cfg.seed = Some(v);
        }
        Ok(cfg)
    }
}

/// Atlas layout options from a YAML file; every present key overrides the CLI value.
#[derive(Debug, Deserialize, Default)]
struct AtlasYaml {
    width: Option<u32>,
    height: Option<u32>,
    tile: Option<String>,
    padding: Option<u32>,
    use_grid: Option<bool>,
    overflow: Option<String>,
}

impl AtlasYaml {
    fn into_atlas_config(self, mut cfg: AtlasConfig) -> anyhow::Result<AtlasConfig> {
        if let Some(v) = self.width {
            cfg.width = v;
        }
        if let Some(v) = self.height {
            cfg.height = v;
        }
        if let Some(v) = self.tile {
            (cfg.tile_width, cfg.tile_height) = parse_tile(&v)?;
        }
        if let Some(v) = self.padding {
            cfg.padding = v;
        }
        if let Some(v) = self.use_grid {
            cfg.use_grid = v;
        }
        if let Some(v) = self.overflow {
            cfg.overflow = parse_overflow(&v)?;
        }
        Ok(cfg)
    }
}
