//! smaa-tool: bake the SMAA lookup tables, or anti-alias a PNG offline

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use helio_pass_smaa::tunables::TUNABLES;
use helio_pass_smaa::{
    ExtensionRegistry, FrameContext, ScreenPassTexture, SmaaModule, SmaaModuleConfig, TableSource,
    Texture, TextureDesc, Tunables,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use wgpu::TextureFormat;

#[derive(Parser)]
#[command(name = "smaa-tool", about = "Subpixel morphological anti-aliasing for still images")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Write the area and search tables as PNG under <DIR>/Textures
    Bake { dir: PathBuf },
    /// Run the SMAA chain over a PNG
    Apply(ApplyArgs),
    /// List every tunable with its environment variable
    Tunables,
}

#[derive(clap::Args)]
struct ApplyArgs {
    input: PathBuf,
    output: PathBuf,
    /// Greyscale depth image, same size as the input
    #[arg(long)]
    depth: Option<PathBuf>,
    /// Table directory written by `bake`; tables are generated in memory otherwise
    #[arg(long)]
    tables: Option<PathBuf>,
    /// Tunable assignment such as r.SMAA.Quality=3; repeatable
    #[arg(long = "set", value_name = "NAME=VALUE")]
    sets: Vec<String>,
    /// Treat the input as linear instead of sRGB encoded
    #[arg(long)]
    linear: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Cmd::Bake { dir } => {
            helio_pass_smaa::lut::write_tables(&dir).with_context(|| format!("baking tables into {}", dir.display()))
        }
        Cmd::Apply(args) => apply(&args),
        Cmd::Tunables => {
            let tunables = Tunables::from_env();
            for info in TUNABLES {
                let value = tunables.get(info.name)?;
                println!("{:<32} {:<34} = {:<6} {}", info.name, info.env, value, info.help);
            }
            Ok(())
        }
    }
}

fn read_texture(path: &Path, format: TextureFormat) -> Result<Texture> {
    let image = image::open(path)
        .with_context(|| format!("reading {}", path.display()))?
        .to_rgba8();
    let desc = TextureDesc::new(image.width(), image.height(), format);
    Ok(Texture::from_rgba8(path.display().to_string(), desc, image.as_raw())?)
}

fn apply(args: &ApplyArgs) -> Result<()> {
    let format = if args.linear {
        TextureFormat::Rgba8Unorm
    } else {
        TextureFormat::Rgba8UnormSrgb
    };
    let color = read_texture(&args.input, format)?;
    let depth = match &args.depth {
        Some(path) => Some(read_texture(path, TextureFormat::R8Unorm)?),
        None => None,
    };

    // Enabled unless the command line says otherwise
    let tunables = Arc::new(Tunables::from_env());
    tunables.set("r.SMAA.Enable", "1")?;
    for assignment in &args.sets {
        tunables.assign(assignment)?;
    }

    let tables = match &args.tables {
        Some(dir) => TableSource::Directory(dir.clone()),
        None => TableSource::Baked,
    };
    let mut registry = ExtensionRegistry::new();
    let module = SmaaModule::startup(SmaaModuleConfig::new(tables, tunables), &mut registry)?;

    let output = registry.post_process(&FrameContext::new(0), ScreenPassTexture::full(&color), depth.as_ref())?;
    if output.is_borrowed() {
        log::info!("SMAA did not run; writing the input unchanged");
    }
    let texture = output.texture();
    let image = image::RgbaImage::from_raw(texture.width(), texture.height(), texture.to_rgba8());
    let Some(image) = image else {
        bail!("output buffer does not match {}x{}", texture.width(), texture.height());
    };
    image
        .save(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;

    module.shutdown(&mut registry)?;
    log::info!("Wrote {}", args.output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(input: PathBuf, output: PathBuf) -> ApplyArgs {
        ApplyArgs {
            input,
            output,
            depth: None,
            tables: None,
            sets: Vec::new(),
            linear: false,
        }
    }

    fn write_staircase(path: &Path) {
        let image = image::RgbaImage::from_fn(32, 24, |x, y| {
            let v = if y < 8 + x / 4 { 220 } else { 30 };
            image::Rgba([v, v, v, 255])
        });
        image.save(path).unwrap();
    }

    #[test]
    fn test_apply_writes_same_size_png() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        let output = dir.path().join("out.png");
        write_staircase(&input);

        apply(&args(input.clone(), output.clone())).unwrap();
        let before = image::open(&input).unwrap().to_rgba8();
        let after = image::open(&output).unwrap().to_rgba8();
        assert_eq!(after.dimensions(), before.dimensions());
        assert_ne!(after.as_raw(), before.as_raw());
        assert_eq!(after.get_pixel(31, 0), before.get_pixel(31, 0));
    }

    #[test]
    fn test_apply_disabled_copies_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        let output = dir.path().join("out.png");
        write_staircase(&input);

        let mut disabled = args(input.clone(), output.clone());
        disabled.sets.push("r.SMAA.Enable=0".to_string());
        apply(&disabled).unwrap();
        let before = image::open(&input).unwrap().to_rgba8();
        let after = image::open(&output).unwrap().to_rgba8();
        assert_eq!(after.as_raw(), before.as_raw());
    }

    #[test]
    fn test_apply_with_baked_table_directory() {
        let dir = tempfile::tempdir().unwrap();
        helio_pass_smaa::lut::write_tables(dir.path()).unwrap();
        let input = dir.path().join("in.png");
        write_staircase(&input);

        let mut with_tables = args(input, dir.path().join("out.png"));
        with_tables.tables = Some(dir.path().to_path_buf());
        with_tables.linear = true;
        apply(&with_tables).unwrap();
        assert!(dir.path().join("out.png").exists());
    }

    #[test]
    fn test_bad_assignment_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        write_staircase(&input);

        let mut bad = args(input, dir.path().join("out.png"));
        bad.sets.push("r.SMAA.Quality".to_string());
        assert!(apply(&bad).is_err());
    }
}
