//! Vellum preview driver.
//!
//! Renders a document through the preview correlation service and mirrors
//! the editor's log panel on stderr, one batch per flush window.

mod config;
mod engine;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, fmt};
use vellum_log_panel::{EngineSink, LogEntry, LogPanelLayer, LogView};
use vellum_preview::{RenderBackend, RenderCorrelationService};
use vellum_worker::EngineThread;

use crate::config::AppConfig;
use crate::engine::TextEngine;

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "vellum")]
#[command(about = "Render a document through the vellum preview pipeline")]
struct Args {
	/// Document to render
	#[arg(value_name = "FILE")]
	input: PathBuf,

	/// Configuration file (TOML)
	#[arg(short, long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Output backend
	#[arg(short, long, default_value = "asciidoc")]
	backend: RenderBackend,

	/// Wrap the output in a standalone document
	#[arg(long)]
	header_footer: bool,

	/// Simulated engine latency in milliseconds
	#[arg(long, default_value_t = 0)]
	latency_ms: u64,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

/// Log panel stand-in that prints each batch to stderr.
struct StderrPanel;

impl LogView for StderrPanel {
	fn append_entries(&mut self, batch: Vec<LogEntry>) {
		for entry in batch {
			eprintln!("[panel] {:<5} {}: {}", entry.level, entry.target, entry.message);
		}
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();
	let config = AppConfig::load(args.config.as_deref())?;

	let panel = EngineThread::spawn("log-panel", || StderrPanel).context("spawning log panel thread")?;
	let panel_layer = LogPanelLayer::new(config.log_panel.clone(), EngineSink::new(&panel));
	let flush = panel_layer.flush_handle();
	let status = panel_layer.status();

	let level = if args.verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
	tracing_subscriber::registry()
		.with(fmt::layer().with_writer(std::io::stderr).with_filter(level))
		.with(panel_layer)
		.try_init()
		.context("installing tracing subscriber")?;

	let result = run(&args, &config).await;
	if let Err(err) = &result {
		let chain = format!("{err:#}");
		error!(error = %chain, "render failed");
	}

	flush.shutdown();
	// Batches queue in order, so this returns once the last one is printed.
	panel.call(|_| ()).await.context("log panel stopped")?;
	if status.has_errors() {
		eprintln!("[panel] errors were logged; last: {}", status.last_message().unwrap_or_default());
	}
	result
}

async fn run(args: &Args, config: &AppConfig) -> Result<()> {
	let text = std::fs::read_to_string(&args.input).with_context(|| format!("reading {}", args.input.display()))?;

	let runtime = tokio::runtime::Handle::current();
	let latency = Duration::from_millis(args.latency_ms);
	let service = RenderCorrelationService::spawn(&config.preview, move |port| TextEngine::new(port, runtime, latency))
		.context("spawning preview engine thread")?;

	if service.is_html(text.as_str()).await {
		info!(target: "vellum::preview", input = %args.input.display(), "input is already HTML, passing through");
		println!("{text}");
		return Ok(());
	}

	let text = service.apply_replacements(text).await;
	let overrides = json!({ "header_footer": args.header_footer });
	let output = service.convert_backend(args.backend, text, &overrides).await?;

	info!(
		target: "vellum::preview",
		backend = output.backend.as_deref().unwrap_or(args.backend.as_str()),
		doctitle = output.doctitle.as_deref().unwrap_or("untitled"),
		"rendered {}",
		args.input.display()
	);
	print!("{}", output.rendered);
	Ok(())
}
