//! CLI front-end (spec §6): converts a single PNG into one of the
//! supported ComputerCraft terminal formats. Mirrors
//! `original_source/src/sanjuuni.cpp`'s option surface, minus the
//! server/streaming modes, which this binary only validates and rejects
//! (network serving is an explicit out-of-scope collaborator).

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use sanjuuni_rs::color::Rgb;
use sanjuuni_rs::error::{Result, SanjuuniError};
use sanjuuni_rs::frame_source::{FrameSource, PngFrameSource};
use sanjuuni_rs::grid::build_cell_grid;
use sanjuuni_rs::palette::{KMeans, MedianCut, Octree, PaletteReducer};
use sanjuuni_rs::quantize::{FloydSteinberg, Quantizer, Threshold};
use sanjuuni_rs::serialize::{lua, nfp, raw, EncodedFrame};
use sanjuuni_rs::subtitle::{parse_ass_subtitles, render_subtitles};
use sanjuuni_rs::vid32::huffman::make_32vid_frame_compressed;
use sanjuuni_rs::vid32::uncompressed::make_32vid_frame;
use sanjuuni_rs::workqueue::WorkQueue;

/// The CC default 16-color palette (`original_source/src/sanjuuni.cpp`'s
/// `defaultPalette`), used when `--default-palette` skips reduction.
const DEFAULT_PALETTE: [(u8, u8, u8); 16] = [
    (0xf0, 0xf0, 0xf0),
    (0x33, 0xb2, 0xf2),
    (0xd8, 0x7f, 0xe5),
    (0xf2, 0xb2, 0x99),
    (0x6c, 0xde, 0xde),
    (0x19, 0xcc, 0x7f),
    (0xcc, 0xb2, 0xf2),
    (0x4c, 0x4c, 0x4c),
    (0x99, 0x99, 0x99),
    (0xb2, 0x99, 0x4c),
    (0xe5, 0x66, 0xb2),
    (0xcc, 0x66, 0x33),
    (0x4c, 0x66, 0x7f),
    (0x4e, 0xa6, 0x57),
    (0x4c, 0x4c, 0xcc),
    (0x11, 0x11, 0x11),
];

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Lua,
    Raw,
    Nfp,
    BlitImage,
    Vid32,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum CompressionMode {
    None,
    /// Accepted for CLI-surface parity; never implemented upstream either.
    Lzw,
    Deflate,
    Custom,
}

#[derive(Parser, Debug)]
#[command(name = "sanjuuni", about = "Converts images into ComputerCraft terminal display formats")]
struct Args {
    #[arg(short = 'i', long)]
    input: PathBuf,

    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "lua")]
    format: OutputFormat,

    #[arg(short = 'S', long)]
    subtitle: Option<PathBuf>,

    #[arg(short = 'p', long = "default-palette")]
    default_palette: bool,

    /// Use threshold (dither-less) quantization instead of Floyd-Steinberg.
    #[arg(short = 't', long)]
    threshold: bool,

    /// Reduce the palette with an octree instead of median-cut.
    #[arg(short = '8', long)]
    octree: bool,

    /// Reduce the palette with k-means instead of median-cut.
    #[arg(short = 'k', long)]
    kmeans: bool,

    #[arg(short = 'c', long, value_enum, default_value = "custom")]
    compression: CompressionMode,

    #[arg(short = 'L', long = "compression-level", default_value_t = 6)]
    compression_level: u8,

    #[arg(short = 'd', long)]
    dfpwm: bool,

    #[arg(short = 'm', long)]
    mute: bool,

    #[arg(short = 'W', long)]
    width: Option<u32>,

    #[arg(short = 'H', long)]
    height: Option<u32>,

    #[arg(short = 's', long)]
    http: Option<u16>,

    #[arg(short = 'w', long)]
    websocket: Option<u16>,

    #[arg(short = 'u', long = "websocket-client")]
    websocket_client: Option<String>,

    #[arg(short = 'T', long)]
    streamed: bool,
}

fn reject_unsupported(args: &Args) -> Result<()> {
    if args.http.is_some() {
        return Err(SanjuuniError::Unsupported("--http"));
    }
    if args.websocket.is_some() {
        return Err(SanjuuniError::Unsupported("--websocket"));
    }
    if args.websocket_client.is_some() {
        return Err(SanjuuniError::Unsupported("--websocket-client"));
    }
    if args.streamed {
        return Err(SanjuuniError::Unsupported("--streamed"));
    }
    Ok(())
}

fn build_palette(image: &sanjuuni_rs::mat::Mat<Rgb>, args: &Args, queue: &WorkQueue) -> Result<Vec<Rgb>> {
    if args.default_palette {
        return Ok(DEFAULT_PALETTE.iter().map(|&(r, g, b)| Rgb::new(r, g, b)).collect());
    }
    let reducer: Box<dyn PaletteReducer> = if args.octree {
        Box::new(Octree)
    } else if args.kmeans {
        Box::new(KMeans)
    } else {
        Box::new(MedianCut)
    };
    reducer.reduce(image, 16, queue)
}

fn quantize_image(
    image: &sanjuuni_rs::mat::Mat<Rgb>,
    palette: &[Rgb],
    args: &Args,
    queue: &WorkQueue,
) -> Result<sanjuuni_rs::mat::Mat<u8>> {
    let quantizer: Box<dyn Quantizer> = if args.threshold { Box::new(Threshold) } else { Box::new(FloydSteinberg) };
    quantizer.quantize(image, palette, queue)
}

/// Nearest-neighbor resize to the requested `--width`/`--height`, rounded
/// down to a multiple of 2x3 so the cell grid needs no further truncation.
/// Either dimension left unset keeps the source's size on that axis.
fn resize_if_requested(
    image: sanjuuni_rs::mat::Mat<Rgb>,
    width: Option<u32>,
    height: Option<u32>,
) -> sanjuuni_rs::mat::Mat<Rgb> {
    if width.is_none() && height.is_none() {
        return image;
    }
    let src_w = image.width();
    let src_h = image.height();
    let dst_w = (width.unwrap_or(src_w as u32) as usize).max(2);
    let dst_h = (height.unwrap_or(src_h as u32) as usize).max(3);
    if dst_w == src_w && dst_h == src_h {
        return image;
    }

    let mut data = Vec::with_capacity(dst_w * dst_h);
    for y in 0..dst_h {
        let sy = (y * src_h / dst_h).min(src_h - 1);
        for x in 0..dst_w {
            let sx = (x * src_w / dst_w).min(src_w - 1);
            data.push(*image.at(sx, sy).expect("indices computed within bounds"));
        }
    }
    sanjuuni_rs::mat::Mat::from_vec(dst_w, dst_h, data)
}

fn run(args: &Args) -> Result<()> {
    reject_unsupported(args)?;

    #[cfg(feature = "debug-logging")]
    log::info!("decoding {}", args.input.display());

    let mut source = PngFrameSource::open(&args.input)?;
    let image = source
        .next_frame()?
        .ok_or_else(|| SanjuuniError::OutOfRange("input image decoded to zero frames".to_string()))?;
    let image = resize_if_requested(image, args.width, args.height);

    let queue = WorkQueue::new(0);
    let palette = build_palette(&image, args, &queue)?;
    let indexed = quantize_image(&image, &palette, args, &queue)?;
    let grid = build_cell_grid(&indexed, &palette, &queue)?;

    if let Some(path) = &args.subtitle {
        let content = fs::read_to_string(path)?;
        // A still image is one frame; treat it as frame 0 of a 1fps stream
        // so any subtitle active at t=0 gets composited onto it.
        let events = parse_ass_subtitles(&content, 1.0);
        let mut characters = grid.characters.clone();
        let mut colors = grid.colors.clone();
        render_subtitles(&events, 0, &mut characters, &mut colors, &palette, grid.width, grid.height);
        return write_output(&characters, &colors, &palette, grid.width, grid.height, args);
    }

    write_output(&grid.characters, &grid.colors, &palette, grid.width, grid.height, args)
}

fn write_output(
    characters: &[u8],
    colors: &[u8],
    palette: &[Rgb],
    width: usize,
    height: usize,
    args: &Args,
) -> Result<()> {
    let frame = EncodedFrame { width, height, characters, colors, palette };

    let output: Vec<u8> = match args.format {
        OutputFormat::Lua => lua::make_lua_file(&frame).into_bytes(),
        OutputFormat::Nfp => nfp::make_nfp(&frame).into_bytes(),
        OutputFormat::Raw => raw::make_raw_image(&frame).into_bytes(),
        OutputFormat::BlitImage => lua::make_table(&frame, false, true, false).into_bytes(),
        OutputFormat::Vid32 => match args.compression {
            CompressionMode::Custom => make_32vid_frame_compressed(&frame),
            CompressionMode::Deflate => deflate(&make_32vid_frame(&frame), args.compression_level),
            CompressionMode::None => make_32vid_frame(&frame),
            CompressionMode::Lzw => return Err(SanjuuniError::Unsupported("--compression lzw")),
        },
    };

    match &args.output {
        Some(path) => fs::write(path, output)?,
        None => std::io::stdout().write_all(&output)?,
    }
    Ok(())
}

/// Deflates a whole 32vid video stream, matching the original's use of
/// zlib's `compress2` over the concatenated uncompressed frame bytes
/// (`sanjuuni.cpp`'s `VID32_FLAG_VIDEO_COMPRESSION_DEFLATE` branch).
fn deflate(data: &[u8], level: u8) -> Vec<u8> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    let level = level.clamp(1, 9) as u32;
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(data).expect("writing to an in-memory encoder cannot fail");
    encoder.finish().expect("finishing an in-memory encoder cannot fail")
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("sanjuuni: {e}");
        std::process::exit(1);
    }
}
