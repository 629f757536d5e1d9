//! Household Demographics Dashboard
//!
//! Interactive dashboard over household demographic tables, with CSV and
//! PNG export. Runs headless when an export directory or summary is requested.

mod charts;
mod config;
mod data;
mod gui;
mod stats;

use anyhow::{Context, Result};
use charts::{AgeChartData, ChartData, StaticChartRenderer};
use clap::Parser;
use config::DashboardConfig;
use data::{CsvExporter, DataLoader, DataSource, TableCache};
use eframe::egui;
use gui::DashboardApp;
use serde_json::json;
use std::path::PathBuf;
use stats::StatsCalculator;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Household Demographics Dashboard")]
struct Args {
    /// JSON config file (defaults to ./household_dashboard.json when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Read tables from CSV files in this directory
    #[arg(long, conflicts_with = "remote")]
    data_dir: Option<PathBuf>,

    /// Fetch tables from a published spreadsheet; `{table}` is replaced per table
    #[arg(long)]
    remote: Option<String>,

    /// Write every table, a zip bundle and chart PNGs here, then exit
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Print the header KPIs as JSON, then exit
    #[arg(long)]
    summary: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(env).with_target(false).init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = DashboardConfig::load(args.config.as_deref()).context("loading config")?;
    if let Some(path) = args.data_dir.clone() {
        config.source = DataSource::Directory { path };
    } else if let Some(url_template) = args.remote.clone() {
        config.source = DataSource::Remote { url_template };
    }
    info!(source = %config.source.describe(), "starting");

    if args.export_dir.is_some() || args.summary {
        return run_headless(&args, &config);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 860.0])
            .with_min_inner_size([1100.0, 700.0])
            .with_title("Household Demographics Dashboard"),
        ..Default::default()
    };

    eframe::run_native(
        "Household Demographics Dashboard",
        options,
        Box::new(move |cc| Ok(Box::new(DashboardApp::new(cc, config)))),
    )
    .map_err(|e| anyhow::anyhow!("GUI error: {e}"))
}

fn run_headless(args: &Args, config: &DashboardConfig) -> Result<()> {
    let mut cache = TableCache::new(config.cache_ttl());
    let report = cache.get_or_load(&config.source, || {
        DataLoader::new(config.source.clone())
            .with_total_override(config.total_households)
            .with_timeout(config.fetch_timeout())
            .load()
    });
    for fb in &report.fallbacks {
        warn!(table = %fb.kind, "using bundled rows: {}", fb.reason);
    }
    let ds = report.dataset.as_ref();

    if let Some(dir) = &args.export_dir {
        let written = CsvExporter::write_all(ds, dir)
            .with_context(|| format!("writing tables to {}", dir.display()))?;
        let zip_path = dir.join("household_tables.zip");
        CsvExporter::write_zip_file(ds, &zip_path)
            .with_context(|| format!("writing {}", zip_path.display()))?;

        let d = &config.display;
        let bars = ChartData::dashboard_set(ds, d.unit, d.show_unknowns);
        let age = AgeChartData::build(&ds.age, d.unit, d.age_smoothing);
        let charts = StaticChartRenderer::render_all(&bars, &age, dir, (1200, 800))
            .context("rendering charts")?;
        info!(
            tables = written.len(),
            charts = charts.len(),
            "export complete → {}",
            dir.display()
        );
    }

    if args.summary {
        let kpis = StatsCalculator::compute_kpis(ds);
        let seniors = StatsCalculator::share_at_or_above(&ds.age, config.senior_age, config.display.unit);
        let fallbacks: Vec<String> = report.fallbacks.iter().map(|f| f.kind.to_string()).collect();
        let out = json!({
            "source": report.source.describe(),
            "kpis": kpis,
            "senior_share": seniors,
            "fallback_tables": fallbacks,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    }

    Ok(())
}
