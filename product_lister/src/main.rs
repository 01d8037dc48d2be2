//! Product Lister - UPC to Sellbrite listing
//!
//! Scans a UPC with a camera (or still images), then mints a SKU, prices the
//! product from eBay sold listings, generates metadata with OpenAI and
//! creates the product in Sellbrite.

use clap::{Parser, Subcommand};
use product_lister::openai::MetadataFormat;
use product_lister::scanner::{
    acquire_upc, FrameSource, ImageFileSource, RxingDecoder, ScanOptions, ScanOutcome,
};
use product_lister::{
    AuthScheme, Config, CounterBackend, Credentials, ListerError, PricingPolicy, PublishOutcome,
    Stage, StageTracker, Upc,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

/// Create Sellbrite products from scanned UPC barcodes
#[derive(Parser, Debug)]
#[command(name = "product_lister")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct Settings {
    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    openai_api_key: Option<String>,

    /// eBay application ID (App ID)
    #[arg(long, env = "EBAY_APP_ID", hide_env_values = true, global = true)]
    ebay_app_id: Option<String>,

    /// Sellbrite API key
    #[arg(long, env = "SELLBRITE_API_KEY", hide_env_values = true, global = true)]
    sellbrite_api_key: Option<String>,

    /// Sellbrite API secret
    #[arg(long, env = "SELLBRITE_API_SECRET", hide_env_values = true, global = true)]
    sellbrite_api_secret: Option<String>,

    /// SKU counter backend: file or sqlite
    #[arg(long, default_value = "file", global = true)]
    counter_store: CounterBackend,

    /// Counter location (default: ./sequential_number.txt or the data dir for sqlite)
    #[arg(long, global = true)]
    counter_path: Option<PathBuf>,

    /// Metadata reply format: structured (JSON) or lines
    #[arg(long, default_value = "structured", global = true)]
    metadata_format: MetadataFormat,

    /// OpenAI model (default depends on the metadata format)
    #[arg(long, env = "OPENAI_MODEL", global = true)]
    openai_model: Option<String>,

    /// Send "Basic key:secret" unencoded instead of base64
    #[arg(long, default_value_t = false, global = true)]
    legacy_auth_header: bool,

    /// Multiplier applied to the mean sold price
    #[arg(long, default_value_t = 0.5, global = true)]
    sold_factor: f64,

    /// Multiplier applied to the MSRP when nothing sold
    #[arg(long, default_value_t = 0.5, global = true)]
    msrp_factor: f64,

    /// Per-request HTTP timeout in seconds (default: none)
    #[arg(long, global = true)]
    http_timeout_secs: Option<u64>,

    /// Override the OpenAI API root
    #[arg(long, env = "OPENAI_BASE_URL", global = true)]
    openai_url: Option<String>,

    /// Override the eBay Finding API endpoint
    #[arg(long, env = "EBAY_FINDING_URL", global = true)]
    ebay_url: Option<String>,

    /// Override the Sellbrite API root
    #[arg(long, env = "SELLBRITE_BASE_URL", global = true)]
    sellbrite_url: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a UPC from the camera and create the listing
    ///
    /// Camera capture needs a build with `--features camera`; otherwise pass
    /// `--image` files.
    Scan {
        /// Camera index (needs `--features camera`)
        #[arg(long, default_value_t = 1)]
        camera_index: u32,

        /// Read frames from these image files instead of the camera
        /// (required unless built with `--features camera`)
        #[arg(long = "image", value_name = "PATH")]
        images: Vec<PathBuf>,

        /// Give up after this many seconds (default: wait forever)
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Pause between frames in milliseconds
        #[arg(long, default_value_t = 0)]
        poll_interval_ms: u64,
    },
    /// Create the listing for a UPC you already have
    Publish {
        /// UPC digits
        #[arg(long)]
        upc: String,
    },
    /// Create or reset the SKU counter
    InitCounter {
        /// Value to store; the next SKU uses value + 1
        #[arg(long, default_value_t = 0)]
        value: u64,

        /// Overwrite an existing counter
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

impl Settings {
    fn into_config(self) -> Config {
        Config {
            credentials: Credentials {
                openai_api_key: self.openai_api_key,
                ebay_app_id: self.ebay_app_id,
                sellbrite_api_key: self.sellbrite_api_key,
                sellbrite_api_secret: self.sellbrite_api_secret,
            },
            counter_backend: self.counter_store,
            counter_path: self.counter_path,
            metadata_format: self.metadata_format,
            openai_model: self.openai_model,
            auth_scheme: if self.legacy_auth_header {
                AuthScheme::LegacyConcatenated
            } else {
                AuthScheme::Basic
            },
            policy: PricingPolicy {
                sold_factor: self.sold_factor,
                msrp_factor: self.msrp_factor,
            },
            http_timeout: self.http_timeout_secs.map(Duration::from_secs),
            openai_base_url: self.openai_url,
            ebay_base_url: self.ebay_url,
            sellbrite_base_url: self.sellbrite_url,
        }
    }
}

fn main() {
    // Initialize logging. Set RUST_LOG to control the level, e.g. RUST_LOG=product_lister=debug
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.settings.into_config();

    let result = match args.command {
        Command::Scan {
            camera_index,
            images,
            timeout_secs,
            poll_interval_ms,
        } => {
            let options = ScanOptions {
                timeout: timeout_secs.map(Duration::from_secs),
                poll_interval: Duration::from_millis(poll_interval_ms),
            };
            run_scan(&config, camera_index, images, options)
        }
        Command::Publish { upc } => Upc::parse(&upc).and_then(|upc| run_publish(&config, &upc)),
        Command::InitCounter { value, force } => run_init_counter(&config, value, force),
    };

    if let Err(e) = result {
        log::error!("{}", e);
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn new_runtime() -> Result<Runtime, ListerError> {
    Runtime::new().map_err(|e| ListerError::Config(format!("cannot start async runtime: {e}")))
}

/// Acquire a UPC, then hand it to the pipeline
fn run_scan(
    config: &Config,
    camera_index: u32,
    images: Vec<PathBuf>,
    options: ScanOptions,
) -> Result<(), ListerError> {
    // Build clients first so missing credentials fail before the camera opens
    let pipeline = config.build_pipeline()?;
    let runtime = new_runtime()?;

    let cancel = Arc::new(AtomicBool::new(false));
    let scanning = Arc::new(AtomicBool::new(true));
    install_interrupt_handler(&runtime, Arc::clone(&cancel), Arc::clone(&scanning));

    let mut tracker = StageTracker::default();
    tracker.enter(Stage::Acquiring);

    let decoder = RxingDecoder::new();
    let outcome = if images.is_empty() {
        scan_camera(camera_index, &decoder, options, &cancel)?
    } else {
        scan_source(ImageFileSource::new(images), &decoder, options, &cancel)
    };
    scanning.store(false, Ordering::SeqCst);

    let upc = match outcome {
        ScanOutcome::Found(upc) => upc,
        ScanOutcome::TimedOut => {
            return Err(scan_failed(&mut tracker, "no UPC found before the timeout"))
        }
        ScanOutcome::Cancelled => return Err(scan_failed(&mut tracker, "cancelled")),
        ScanOutcome::Exhausted => {
            return Err(scan_failed(&mut tracker, "no UPC found in the given images"))
        }
    };

    log::info!("Scanned UPC {}", upc);
    if upc.check_digit_valid() == Some(false) {
        log::warn!("UPC {} has an invalid check digit", upc);
    }
    println!("Scanned UPC: {upc}");

    let report = runtime.block_on(pipeline.run(&upc))?;
    report_outcome(&report.outcome);
    Ok(())
}

fn scan_failed(tracker: &mut StageTracker, reason: &str) -> ListerError {
    tracker.enter(Stage::Failed);
    ListerError::ScanStopped(reason.to_string())
}

fn scan_source<F: FrameSource>(
    source: F,
    decoder: &RxingDecoder,
    options: ScanOptions,
    cancel: &AtomicBool,
) -> ScanOutcome {
    acquire_upc(source, decoder, options, cancel)
}

#[cfg(feature = "camera")]
fn scan_camera(
    camera_index: u32,
    decoder: &RxingDecoder,
    options: ScanOptions,
    cancel: &AtomicBool,
) -> Result<ScanOutcome, ListerError> {
    let camera = product_lister::scanner::CameraSource::open(camera_index)?;
    Ok(scan_source(camera, decoder, options, cancel))
}

#[cfg(not(feature = "camera"))]
fn scan_camera(
    camera_index: u32,
    _decoder: &RxingDecoder,
    _options: ScanOptions,
    _cancel: &AtomicBool,
) -> Result<ScanOutcome, ListerError> {
    Err(ListerError::Camera(format!(
        "cannot open camera {camera_index}: built without the `camera` feature (use --image)"
    )))
}

/// Ctrl-C stops an ongoing scan; outside a scan (or a second time) it exits
fn install_interrupt_handler(runtime: &Runtime, cancel: Arc<AtomicBool>, scanning: Arc<AtomicBool>) {
    runtime.spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::warn!("Cannot listen for Ctrl-C: {}", e);
                return;
            }
            if scanning.load(Ordering::SeqCst) && !cancel.swap(true, Ordering::SeqCst) {
                log::warn!("Interrupted, stopping scan");
                continue;
            }
            log::warn!("Interrupted, exiting");
            std::process::exit(130);
        }
    });
}

fn run_publish(config: &Config, upc: &Upc) -> Result<(), ListerError> {
    let pipeline = config.build_pipeline()?;
    let runtime = new_runtime()?;
    let report = runtime.block_on(pipeline.run(upc))?;
    report_outcome(&report.outcome);
    Ok(())
}

fn run_init_counter(config: &Config, value: u64, force: bool) -> Result<(), ListerError> {
    let store = config.open_sequence_store()?;
    store.initialize(value, force)?;
    println!(
        "Counter {} set to {} (next SKU uses {:03})",
        store.location().display(),
        value,
        value.saturating_add(1)
    );
    Ok(())
}

/// A rejected listing is reported, not treated as a process failure
fn report_outcome(outcome: &PublishOutcome) {
    match outcome {
        PublishOutcome::Created => println!("Product listing created successfully."),
        PublishOutcome::Rejected { status, body } => {
            println!("Failed to create product listing ({status}). Error: {body}")
        }
    }
}
