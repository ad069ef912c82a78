//! Wiki Revision Time-Lapse
//!
//! Discovers the revisions of an article over a time window, then plays them
//! back frame by frame in the terminal.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use std::time::Duration;
use tracing::info;

use wiki_timelapse::discovery::{
    discover, CallbackMode, CallbackSpec, DiscoveryObserver, DiscoveryProgress, DiscoveryRequest,
    FetchStrategy,
};
use wiki_timelapse::playback::{Playback, RenderSink, TerminalSink, TokioClock};
use wiki_timelapse::timestamp::{self, parse_instant};
use wiki_timelapse::utils::init_logging;
use wiki_timelapse::{TimelapseConfig, WikiClient};

// ──────────────────────────────────────────────────────────────────────────────
// ARGUMENTS
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "wiki_timelapse", version, about = "Play back a wiki article's revision history as a time-lapse")]
struct Args {
    /// Article title, e.g. "UVB-76"
    title: String,

    /// Start of the window (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_parser = parse_instant)]
    start: DateTime<Utc>,

    /// End of the window (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_parser = parse_instant)]
    end: DateTime<Utc>,

    /// Interval between samples, in seconds
    #[arg(long, default_value_t = 86_400)]
    interval: u64,

    /// Discovery strategy: linear or tree
    #[arg(long, default_value_t = FetchStrategy::Linear)]
    strategy: FetchStrategy,

    /// How --callback-value is read: percent, frames-to-end or frame
    #[arg(long, default_value_t = CallbackMode::Percent)]
    callback_mode: CallbackMode,

    /// Point during linear discovery at which playback is announced as ready
    #[arg(long, default_value_t = 100.0)]
    callback_value: f64,

    /// Delay between frames in milliseconds (overrides TIMELAPSE_FRAME_DELAY_MS)
    #[arg(long)]
    frame_delay_ms: Option<u64>,

    /// Display zoom in percent (overrides TIMELAPSE_ZOOM_PERCENT)
    #[arg(long)]
    zoom: Option<u32>,

    /// Bytes of plain text shown per revision
    #[arg(long, default_value_t = 240)]
    preview_bytes: usize,

    /// Print the discovery result as JSON
    #[arg(long)]
    json: bool,

    /// Stop after discovery
    #[arg(long)]
    no_play: bool,
}

/// Forwards discovery progress to the sink's progress line
struct TerminalProgress<'a> {
    sink: &'a mut dyn RenderSink,
}

impl DiscoveryObserver for TerminalProgress<'_> {
    fn on_step(&mut self, progress: &DiscoveryProgress) {
        self.sink.show_progress(&progress.label());
    }

    fn on_trigger(&mut self) {
        info!("Enough revisions fetched, playback is ready");
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// MAIN ENTRY POINT
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let args = Args::parse();

    init_logging().map_err(|e| anyhow::anyhow!("Failed to initialise logging: {}", e))?;

    let mut config = TimelapseConfig::from_env().context("Invalid configuration")?;
    if let Some(ms) = args.frame_delay_ms {
        config.frame_delay = Duration::from_millis(ms);
    }
    if let Some(zoom) = args.zoom {
        config.zoom_percent = zoom;
    }

    let client = WikiClient::from_config(&config).context("Failed to build wiki client")?;
    let request = DiscoveryRequest::with_interval_secs(&args.title, args.start, args.end, args.interval)
        .context("Invalid time window")?;
    let callback = CallbackSpec::from_mode(args.callback_mode, args.callback_value);

    info!(
        "Fetching '{}' from {} between {} and {}: {} intervals of {}s",
        request.title(),
        client.api_url(),
        timestamp::date_label(request.start()),
        timestamp::date_label(request.end()),
        request.rev_total(),
        args.interval
    );

    let mut sink = TerminalSink::stdout(args.preview_bytes, config.zoom_percent);

    let result = {
        let mut progress = TerminalProgress { sink: &mut sink };
        discover(&client, &request, args.strategy, callback, &mut progress)
            .await
            .context("Discovery failed")?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    if args.no_play {
        return Ok(());
    }

    let playback = Playback::new(&result, config.frame_delay);
    info!(
        "Playing {} frames, {}ms apart",
        playback.total_frames(),
        playback.frame_delay().as_millis()
    );
    let report = playback.run(&mut sink, &mut TokioClock).await;
    info!(
        "Played {} frames across {} revisions",
        report.frames, report.runs
    );

    Ok(())
}
