//! Household Dashboard Main Application
//! Main window with control panel and tabbed chart viewer.

use crate::charts::{AgeChartData, ChartData, StaticChartRenderer};
use crate::config::DashboardConfig;
use crate::data::{CsvExporter, DataLoader, DataSource, LoadReport, TableCache, TableKind};
use crate::gui::{ChartViewer, ControlPanel, ControlPanelAction, UserSettings};
use egui::SidePanel;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::thread;
use tracing::{error, info};

/// Static chart export size in pixels
const PNG_SIZE: (u32, u32) = (1200, 800);

/// Table loading result from background thread
#[derive(Debug)]
enum LoadResult {
    Progress(String),
    Complete(LoadReport),
}

/// What a poll of the loader channel found.
#[derive(Debug)]
enum LoadPoll {
    Pending(Option<String>),
    Complete(LoadReport),
    /// The loader thread ended without sending a report.
    Died,
}

/// Drain whatever the loader thread has sent so far.
fn poll_loader(rx: &Receiver<LoadResult>) -> LoadPoll {
    let mut status = None;
    loop {
        match rx.try_recv() {
            Ok(LoadResult::Progress(s)) => status = Some(s),
            Ok(LoadResult::Complete(report)) => return LoadPoll::Complete(report),
            Err(TryRecvError::Empty) => return LoadPoll::Pending(status),
            Err(TryRecvError::Disconnected) => return LoadPoll::Died,
        }
    }
}

/// Main application window.
pub struct DashboardApp {
    config: DashboardConfig,
    cache: TableCache,
    report: Option<LoadReport>,
    control_panel: ControlPanel,
    chart_viewer: ChartViewer,

    // Async table loading
    load_rx: Option<Receiver<LoadResult>>,
    is_loading: bool,
}

impl DashboardApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: DashboardConfig) -> Self {
        let mut control_panel = ControlPanel::new(UserSettings::from(&config.display));
        control_panel.source_description = config.source.describe();

        let mut app = Self {
            cache: TableCache::new(config.cache_ttl()),
            config,
            report: None,
            control_panel,
            chart_viewer: ChartViewer::new(),
            load_rx: None,
            is_loading: false,
        };
        app.start_load();
        app
    }

    /// Serve from cache, or load tables on a background thread.
    fn start_load(&mut self) {
        if self.is_loading {
            return;
        }

        if let Some(hit) = self.cache.get(&self.config.source).cloned() {
            self.apply_report(hit);
            return;
        }

        let loader = DataLoader::new(self.config.source.clone())
            .with_total_override(self.config.total_households)
            .with_timeout(self.config.fetch_timeout());

        let (tx, rx) = channel();
        self.load_rx = Some(rx);
        self.is_loading = true;
        self.control_panel.busy = true;
        self.control_panel.set_progress(10.0, "Loading tables...");

        thread::spawn(move || {
            let _ = tx.send(LoadResult::Progress(format!(
                "Reading {}...",
                loader.source().describe()
            )));
            let report = loader.load();
            let _ = tx.send(LoadResult::Complete(report));
        });
    }

    fn apply_report(&mut self, report: LoadReport) {
        self.chart_viewer.set_dataset(&report.dataset);
        let status = if report.fallbacks.is_empty() {
            format!("Loaded {} tables", TableKind::ALL.len())
        } else {
            format!(
                "Loaded with {} bundled fallback(s)",
                report.fallbacks.len()
            )
        };
        self.control_panel.set_progress(100.0, &status);
        self.report = Some(report);
    }

    /// Check for table loading results
    fn check_load_results(&mut self) {
        let Some(rx) = self.load_rx.take() else {
            return;
        };

        match poll_loader(&rx) {
            LoadPoll::Pending(status) => {
                if let Some(status) = status {
                    self.control_panel.set_progress(40.0, &status);
                }
                self.load_rx = Some(rx);
            }
            LoadPoll::Complete(report) => {
                self.finish_load();
                self.cache.put(report.clone());
                self.apply_report(report);
            }
            LoadPoll::Died => {
                error!("table loader stopped without a result, showing bundled data");
                self.finish_load();
                self.apply_report(DataLoader::new(DataSource::Bundled).load());
                self.control_panel
                    .set_progress(0.0, "Error: loading failed, showing bundled data");
            }
        }
    }

    fn finish_load(&mut self) {
        self.is_loading = false;
        self.control_panel.busy = false;
    }

    fn handle_reload(&mut self) {
        info!("reload requested");
        self.cache.invalidate();
        self.start_load();
    }

    /// Handle CSV download for a single table
    fn handle_download_csv(&mut self, kind: TableKind) {
        let Some(report) = &self.report else {
            self.control_panel.set_progress(0.0, "No data loaded");
            return;
        };

        let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV Files", &["csv"])
            .set_file_name(kind.file_name())
            .save_file()
        else {
            return; // User cancelled
        };

        match CsvExporter::write_table(&report.dataset, kind, &path) {
            Ok(()) => self.finish_export(path, format!("Exported {}", kind.file_name())),
            Err(e) => self.fail("CSV export", e.to_string()),
        }
    }

    /// Handle zip export of every table
    fn handle_export_zip(&mut self) {
        let Some(report) = &self.report else {
            self.control_panel.set_progress(0.0, "No data loaded");
            return;
        };

        let Some(path) = rfd::FileDialog::new()
            .add_filter("Zip Archive", &["zip"])
            .set_file_name("household_tables.zip")
            .save_file()
        else {
            return;
        };

        match CsvExporter::write_zip_file(&report.dataset, &path) {
            Ok(()) => self.finish_export(path, "Exported all tables".to_string()),
            Err(e) => self.fail("Zip export", e.to_string()),
        }
    }

    /// Handle PNG export of the dashboard charts
    fn handle_save_charts(&mut self) {
        let Some(report) = &self.report else {
            self.control_panel.set_progress(0.0, "No data loaded");
            return;
        };

        let Some(dir) = rfd::FileDialog::new().pick_folder() else {
            return;
        };

        let s = &self.control_panel.settings;
        let bars = ChartData::dashboard_set(&report.dataset, s.unit, s.show_unknowns);
        let age = AgeChartData::build(&report.dataset.age, s.unit, s.age_smoothing);

        match StaticChartRenderer::render_all(&bars, &age, &dir, PNG_SIZE) {
            Ok(written) => self.finish_export(dir, format!("Exported {} charts", written.len())),
            Err(e) => self.fail("Chart export", e.to_string()),
        }
    }

    fn handle_open_last_export(&mut self) {
        if let Some(path) = self.control_panel.last_export.clone() {
            if let Err(e) = open::that(&path) {
                self.fail("Open", e.to_string());
            }
        }
    }

    fn finish_export(&mut self, path: PathBuf, status: String) {
        info!(path = %path.display(), "{status}");
        self.control_panel.set_progress(100.0, &status);
        self.control_panel.last_export = Some(path);
    }

    fn fail(&mut self, what: &str, err: String) {
        error!("{what} failed: {err}");
        self.control_panel
            .set_progress(0.0, &format!("Error: {what} failed: {err}"));
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Check for background results
        self.check_load_results();

        // Request repaint while loading
        if self.is_loading {
            ctx.request_repaint();
        }

        // Left panel - Control Panel
        SidePanel::left("control_panel")
            .min_width(280.0)
            .max_width(340.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let action = self.control_panel.show(ui);

                    match action {
                        ControlPanelAction::Reload => self.handle_reload(),
                        ControlPanelAction::DownloadCsv(kind) => self.handle_download_csv(kind),
                        ControlPanelAction::ExportZip => self.handle_export_zip(),
                        ControlPanelAction::SaveCharts => self.handle_save_charts(),
                        ControlPanelAction::OpenLastExport => self.handle_open_last_export(),
                        ControlPanelAction::None => {}
                    }
                });
            });

        // Central panel - Chart Viewer
        egui::CentralPanel::default().show(ctx, |ui| {
            let (ds, fallbacks) = match &self.report {
                Some(r) => (Some(r.dataset.as_ref()), r.fallbacks.as_slice()),
                None => (None, &[][..]),
            };
            self.chart_viewer.show(
                ui,
                ds,
                fallbacks,
                &self.control_panel.settings,
                self.config.senior_age,
            );
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_reports_progress_then_completion() {
        let (tx, rx) = channel();
        assert!(matches!(poll_loader(&rx), LoadPoll::Pending(None)));

        tx.send(LoadResult::Progress("Reading...".to_string())).unwrap();
        assert!(matches!(poll_loader(&rx), LoadPoll::Pending(Some(s)) if s == "Reading..."));

        tx.send(LoadResult::Complete(DataLoader::new(DataSource::Bundled).load()))
            .unwrap();
        assert!(matches!(poll_loader(&rx), LoadPoll::Complete(r) if r.fallbacks.is_empty()));
    }

    #[test]
    fn test_poll_detects_dead_loader_thread() {
        let (tx, rx) = channel::<LoadResult>();
        let handle = thread::spawn(move || {
            let _tx = tx;
            panic!("loader crashed");
        });
        assert!(handle.join().is_err());
        assert!(matches!(poll_loader(&rx), LoadPoll::Died));
    }

    #[test]
    fn test_poll_prefers_report_sent_before_disconnect() {
        let (tx, rx) = channel();
        tx.send(LoadResult::Complete(DataLoader::new(DataSource::Bundled).load()))
            .unwrap();
        drop(tx);
        assert!(matches!(poll_loader(&rx), LoadPoll::Complete(_)));
    }
}
