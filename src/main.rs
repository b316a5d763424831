use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use spritepack::{
    pack,
    packer::{ExternalPacker, PackerConfig},
    scene_file,
    spritepack_core::FrontFace,
    texture::{AtlasTexture, Platform, TargetFormat},
    PackConfig,
};

#[derive(Parser, Debug)]
#[command(name = "spritepack", version, about = "Merge a scene's sprites into one atlas and mesh")]
struct Cli {
    /// Scene description to pack
    scene: PathBuf,

    /// Packer executable
    #[arg(long)]
    packer: PathBuf,

    /// Argument passed to the packer before its own, repeatable
    #[arg(long = "packer-arg", allow_hyphen_values = true)]
    packer_args: Vec<String>,

    /// rgba32, rgba4444, rgb565, dxt5, etc2-rgba8 or pvrtc-rgba4, rgba32 when no platform is given
    #[arg(long, conflicts_with = "platform")]
    format: Option<TargetFormat>,

    /// Pick the texture format this platform uses
    #[arg(long, value_enum)]
    platform: Option<PlatformArg>,

    #[arg(long, default_value = "1024x1024", value_parser = parse_size)]
    max_size: (u32, u32),

    #[arg(long, default_value_t = 3)]
    padding: u32,

    #[arg(long)]
    no_trim: bool,

    /// Kill the packer after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Also pack sprites on inactive nodes
    #[arg(long)]
    include_inactive: bool,

    #[arg(long, value_enum, default_value_t = Winding::Cw)]
    front_face: Winding,

    /// Directory mesh.json and the atlas texture are written to
    #[arg(long)]
    out: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Winding {
    Cw,
    Ccw,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PlatformArg {
    Desktop,
    Android,
    Ios,
}

impl From<PlatformArg> for Platform {
    fn from(platform: PlatformArg) -> Self {
        match platform {
            PlatformArg::Desktop => Platform::Desktop,
            PlatformArg::Android => Platform::Android,
            PlatformArg::Ios => Platform::Ios,
        }
    }
}

impl Cli {
    fn target_format(&self) -> TargetFormat {
        match (self.format, self.platform) {
            (Some(format), _) => format,
            (None, Some(platform)) => TargetFormat::for_platform(platform.into()),
            (None, None) => TargetFormat::default(),
        }
    }
}

impl From<Winding> for FrontFace {
    fn from(winding: Winding) -> Self {
        match winding {
            Winding::Cw => FrontFace::Clockwise,
            Winding::Ccw => FrontFace::CounterClockwise,
        }
    }
}

fn parse_size(size: &str) -> Result<(u32, u32), String> {
    let (width, height) = size
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {size}"))?;
    let parse = |value: &str| {
        value
            .parse::<u32>()
            .ok()
            .filter(|value| *value > 0)
            .ok_or_else(|| format!("invalid dimension {value} in {size}"))
    };
    Ok((parse(width)?, parse(height)?))
}

/// Packer arguments naming files relative to here, made absolute since the packer
/// runs in its own scratch directory
fn resolve_packer_args(args: &[String]) -> Result<Vec<String>> {
    let cwd = std::env::current_dir().context("reading the working directory")?;
    Ok(args
        .iter()
        .map(|arg| {
            let path = Path::new(arg);
            if !arg.starts_with('-') && path.is_relative() && path.exists() {
                cwd.join(path).to_string_lossy().into_owned()
            } else {
                arg.clone()
            }
        })
        .collect())
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
    let cli = Cli::parse();

    let scene = scene_file::load(&cli.scene)
        .with_context(|| format!("loading scene {}", cli.scene.display()))?;

    let packer_config = PackerConfig::default()
        .with_max_size(cli.max_size.0, cli.max_size.1)
        .with_padding(cli.padding)
        .with_trim(!cli.no_trim);
    let config = PackConfig::default()
        .with_packer(packer_config)
        .with_target_format(cli.target_format())
        .with_front_face(cli.front_face.into());

    let packer = ExternalPacker::new(&cli.packer)
        .with_program_args(resolve_packer_args(&cli.packer_args)?)
        .with_timeout(cli.timeout_secs.map(Duration::from_secs));

    let packed = pack(
        &scene.sprites().include_inactive(cli.include_inactive),
        &packer,
        &config,
    )
    .context("packing sprites")?;

    fs::create_dir_all(&cli.out)
        .with_context(|| format!("creating output directory {}", cli.out.display()))?;
    let mesh_path = cli.out.join("mesh.json");
    fs::write(&mesh_path, serde_json::to_vec_pretty(&packed.mesh)?)
        .with_context(|| format!("writing {}", mesh_path.display()))?;
    log::info!("Wrote {}", mesh_path.display());

    match &packed.texture {
        Some(texture) => write_texture(texture, &cli.out)?,
        None => log::info!("Scene has no sprites, no atlas written"),
    }
    Ok(())
}

fn write_texture(texture: &AtlasTexture, out: &Path) -> Result<()> {
    let (path, bytes) = match texture.format {
        TargetFormat::Rgba32 => (out.join("atlas.png"), texture.to_png()?),
        format if format.is_block_compressed() => {
            log::warn!("{format} needs an engine side compressor, writing the resampled atlas as png");
            (out.join("atlas.png"), texture.to_png()?)
        }
        format => (out.join(format!("atlas.{format}.bin")), texture.encode()?),
    };
    fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
    log::info!("Wrote {} ({}x{})", path.display(), texture.width(), texture.height());
    Ok(())
}
