use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scriptorium_core::{
    export_stats_csv, AnnotationSession, CsvExportConfig, MeasurementKind, MeasurementStats, Point,
    Rect,
};
use scriptorium_export::{FileSurface, FixedDelay, PdfExporter};
use scriptorium_iiif::{
    is_remote, resolve_manifest, FileFetcher, HttpFetcher, ImageFetcher, ManifestFetcher,
};
use scriptorium_segment::{crop_lines, draw_overlay, segment_lines, LineCrop, TextLine};
use scriptorium_storage::{load_session_file, Storage, StorageError, ViewerConfig};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Overrides the directory holding stored config and sessions
pub const DATA_DIR_ENV: &str = "SCRIPTORIUM_DATA_DIR";

#[derive(Debug, Parser)]
#[command(name = "scriptorium")]
#[command(about = "Manuscript page measurement and annotation toolkit")]
pub struct Cli {
    /// Configuration file to use instead of the stored one.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve a IIIF manifest (URL or local file) into page image URLs.
    Manifest {
        #[arg(value_name = "SOURCE")]
        source: String,
        /// Store a new session for the resolved pages under this name.
        #[arg(long, value_name = "NAME")]
        save: Option<String>,
    },
    /// Print measurement statistics for a page or the whole document.
    Stats {
        /// Session file or stored session name.
        #[arg(value_name = "SESSION")]
        session: String,
        #[arg(long)]
        page: Option<usize>,
    },
    /// Write document statistics as CSV.
    Report {
        #[arg(value_name = "SESSION")]
        session: String,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Leave out measurement kinds with no measurements.
        #[arg(long)]
        skip_empty: bool,
    },
    /// Export the annotated pages as a PDF.
    Export {
        #[arg(value_name = "SESSION")]
        session: String,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Leave out pages with no annotations.
        #[arg(long)]
        skip_unannotated: bool,
        #[arg(long, default_value_t = scriptorium_export::DEFAULT_CAPTURE_SCALE)]
        scale: f64,
    },
    /// Crop a region of an annotated page to PNG.
    Crop {
        #[arg(value_name = "SESSION")]
        session: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Region as X,Y,WIDTH,HEIGHT in viewer pixels.
        #[arg(long, value_parser = parse_region)]
        region: Rect,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Detect the text lines of a page image (path or URL).
    Segment {
        #[arg(value_name = "IMAGE")]
        image: String,
        /// Write line crops and a segmentation overlay into this directory.
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },
    /// List stored sessions.
    Sessions,
    /// Print the effective configuration.
    Config,
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    page: Option<usize>,
    page_count: usize,
    stats: BTreeMap<MeasurementKind, MeasurementStats>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SegmentOutput {
    lines: Vec<TextLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    overlay: Option<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    crops: Vec<LineCrop>,
}

/// A loaded session and the directory its image paths are relative to
struct OpenedSession {
    session: AnnotationSession,
    base_dir: PathBuf,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    if let Commands::Version = cli.command {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Manifest { source, save } => run_manifest(&source, save.as_deref(), &config),
        Commands::Stats { session, page } => run_stats(&session, page, &config),
        Commands::Report { session, output, skip_empty } => {
            run_report(&session, output.as_deref(), skip_empty, &config)
        }
        Commands::Export { session, output, skip_unannotated, scale } => {
            run_export(&session, output.as_deref(), skip_unannotated, scale, &config)
        }
        Commands::Crop { session, page, region, output } => {
            run_crop(&session, page, region, output.as_deref(), &config)
        }
        Commands::Segment { image, output_dir } => {
            run_segment(&image, output_dir.as_deref(), &config)
        }
        Commands::Sessions => run_sessions(),
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Version => Ok(()),
    }
}

fn run_manifest(source: &str, save: Option<&str>, config: &ViewerConfig) -> Result<()> {
    let fetcher: Box<dyn ManifestFetcher> = if is_remote(source) {
        Box::new(HttpFetcher::new(config.http_timeout()))
    } else {
        ensure_file_exists(Path::new(source))?;
        Box::new(FileFetcher::new())
    };

    let urls = resolve_manifest(fetcher.as_ref(), source)
        .with_context(|| format!("failed to resolve manifest {source}"))?;
    if urls.is_empty() {
        tracing::warn!(source, "manifest resolved to no pages");
    }

    if let Some(name) = save {
        let mut session = AnnotationSession::new(config.session_settings());
        session.load_images(urls.clone());
        let path = default_storage()?
            .save_session(name, &session.snapshot())
            .with_context(|| format!("failed to store session {name}"))?;
        tracing::info!(path = %path.display(), "stored session");
    }

    println!("{}", serde_json::to_string_pretty(&urls)?);
    Ok(())
}

fn run_stats(session: &str, page: Option<usize>, config: &ViewerConfig) -> Result<()> {
    let OpenedSession { session, .. } = open_session(session, config)?;
    let page_count = session.total_pages();

    let payload = match page {
        Some(page) => {
            let index = page_index(page, page_count)?;
            StatsOutput { page: Some(page), page_count, stats: session.page_stats(index) }
        }
        None => StatsOutput { page: None, page_count, stats: session.document_stats() },
    };

    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn run_report(
    session: &str,
    output: Option<&Path>,
    skip_empty: bool,
    config: &ViewerConfig,
) -> Result<()> {
    let OpenedSession { session, .. } = open_session(session, config)?;
    let stats = session.document_stats();
    let csv_config = CsvExportConfig { include_empty: !skip_empty, ..CsvExportConfig::default() };

    match output {
        Some(path) => {
            create_parent_dir(path)?;
            let file = fs::File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            export_stats_csv(file, &stats, &csv_config).context("failed to write report")?;
            println!("{}", path.display());
        }
        None => {
            export_stats_csv(std::io::stdout().lock(), &stats, &csv_config)
                .context("failed to write report")?;
        }
    }

    Ok(())
}

fn run_export(
    session: &str,
    output: Option<&Path>,
    skip_unannotated: bool,
    scale: f64,
    config: &ViewerConfig,
) -> Result<()> {
    if !(scale.is_finite() && scale > 0.0) {
        anyhow::bail!("--scale must be a positive number");
    }

    let OpenedSession { session, base_dir } = open_session(session, config)?;
    let page_count = session.total_pages();
    if page_count == 0 {
        anyhow::bail!("session has no pages");
    }

    let annotated: Vec<bool> = (0..page_count).map(|page| session.page_has_content(page)).collect();
    let mut surface = FileSurface::new(session, &base_dir)
        .with_capture_scale(scale)
        .with_fetcher(HttpFetcher::new(config.http_timeout()));
    let exporter = PdfExporter::with_wait(FixedDelay(config.capture_delay()))
        .file_name(config.export_file_name.clone());

    let document = exporter
        .export(&mut surface, page_count, |page| skip_unannotated && !annotated[page])
        .context("failed to export annotated PDF")?;

    let path = match output {
        Some(path) => {
            create_parent_dir(path)?;
            fs::write(path, &document.bytes)
                .with_context(|| format!("failed to write PDF to {}", path.display()))?;
            path.to_path_buf()
        }
        None => document.write_to(&base_dir).context("failed to write PDF")?,
    };

    println!("{}", path.display());
    Ok(())
}

fn run_crop(
    session: &str,
    page: usize,
    region: Rect,
    output: Option<&Path>,
    config: &ViewerConfig,
) -> Result<()> {
    let OpenedSession { mut session, base_dir } = open_session(session, config)?;
    let index = page_index(page, session.total_pages())?;

    session.viewer.go_to_page(index);
    session.crop.start();
    session.crop.begin(Point::new(region.x, region.y));
    session.crop.update_to(Point::new(region.x + region.width, region.y + region.height));

    let mut surface =
        FileSurface::new(session, &base_dir).with_fetcher(HttpFetcher::new(config.http_timeout()));
    let png = surface.capture_crop().context("failed to crop page")?;

    let output = output
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| base_dir.join(format!("page-{page}-crop.png")));
    create_parent_dir(&output)?;
    fs::write(&output, png).with_context(|| format!("failed to write {}", output.display()))?;

    println!("{}", output.display());
    Ok(())
}

fn run_segment(source: &str, output_dir: Option<&Path>, config: &ViewerConfig) -> Result<()> {
    let image = if is_remote(source) {
        let bytes = HttpFetcher::new(config.http_timeout())
            .fetch_image(source)
            .with_context(|| format!("failed to fetch {source}"))?;
        image::load_from_memory(&bytes).with_context(|| format!("failed to decode {source}"))?
    } else {
        ensure_file_exists(Path::new(source))?;
        image::open(source).with_context(|| format!("failed to open {source}"))?
    };

    let lines = segment_lines(&image).context("failed to segment page")?;
    let mut payload = SegmentOutput { lines, overlay: None, crops: Vec::new() };

    if let Some(dir) = output_dir {
        payload.crops = crop_lines(&image, &payload.lines, &dir.join("lines"))
            .context("failed to write line crops")?;
        let overlay = dir.join("overlay.jpg");
        draw_overlay(&image, &payload.lines)
            .save(&overlay)
            .with_context(|| format!("failed to write {}", overlay.display()))?;
        payload.overlay = Some(overlay);
    }

    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn run_sessions() -> Result<()> {
    let names = default_storage()?.list_sessions().context("failed to list sessions")?;
    println!("{}", serde_json::to_string_pretty(&names)?);
    Ok(())
}

fn load_config(explicit: Option<&Path>) -> Result<ViewerConfig> {
    let config = match explicit {
        Some(path) => {
            ensure_file_exists(path)?;
            ViewerConfig::from_file(path)
                .with_context(|| format!("failed to read config {}", path.display()))?
        }
        None => match default_storage() {
            Ok(storage) => storage.load_config().context("failed to read stored config")?,
            Err(StorageError::NoDataDirectory) => ViewerConfig::default(),
            Err(error) => return Err(error.into()),
        },
    };

    config.with_env_overrides().context("invalid configuration override")
}

fn default_storage() -> Result<Storage, StorageError> {
    match std::env::var_os(DATA_DIR_ENV) {
        Some(dir) => Ok(Storage::with_root(PathBuf::from(dir))),
        None => Storage::from_default_project(),
    }
}

/// Load `reference` as a session file, falling back to a stored session name
fn open_session(reference: &str, config: &ViewerConfig) -> Result<OpenedSession> {
    let path = Path::new(reference);
    let (snapshot, base_dir) = if path.is_file() {
        let snapshot = load_session_file(path)
            .with_context(|| format!("failed to read session {}", path.display()))?;
        (snapshot, parent_dir(path))
    } else {
        let storage = default_storage()?;
        match storage.load_session(reference) {
            Ok(snapshot) => (snapshot, PathBuf::from(".")),
            Err(StorageError::SessionNotFound(_) | StorageError::InvalidSessionName(_)) => {
                anyhow::bail!("session does not exist: {reference}")
            }
            Err(error) => {
                return Err(error).with_context(|| format!("failed to read session {reference}"))
            }
        }
    };

    let session = AnnotationSession::from_snapshot(snapshot, config.session_settings());
    Ok(OpenedSession { session, base_dir })
}

fn page_index(page: usize, page_count: usize) -> Result<usize> {
    if page == 0 {
        anyhow::bail!("--page is 1-based and must be >= 1");
    }
    if page > page_count {
        anyhow::bail!("page {page} out of range (page_count={page_count})");
    }
    Ok(page - 1)
}

fn parse_region(value: &str) -> Result<Rect, String> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| format!("expected X,Y,WIDTH,HEIGHT, got {value:?}"))?;

    match parts.as_slice() {
        [x, y, width, height] if *width > 0.0 && *height > 0.0 => {
            Ok(Rect::new(*x, *y, *width, *height))
        }
        [_, _, _, _] => Err("region width and height must be positive".to_string()),
        _ => Err(format!("expected X,Y,WIDTH,HEIGHT, got {value:?}")),
    }
}

fn ensure_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_parses_four_numbers() {
        assert_eq!(parse_region("1, 2.5,30,40"), Ok(Rect::new(1.0, 2.5, 30.0, 40.0)));
        assert!(parse_region("1,2,3").is_err());
        assert!(parse_region("1,2,0,4").is_err());
        assert!(parse_region("a,b,c,d").is_err());
    }

    #[test]
    fn page_numbers_are_one_based() {
        assert_eq!(page_index(1, 3).unwrap(), 0);
        assert!(page_index(0, 3).is_err());
        assert!(page_index(4, 3).is_err());
    }

    #[test]
    fn relative_session_resolves_to_current_dir() {
        assert_eq!(parent_dir(Path::new("session.json")), PathBuf::from("."));
        assert_eq!(parent_dir(Path::new("work/session.json")), PathBuf::from("work"));
    }
}
