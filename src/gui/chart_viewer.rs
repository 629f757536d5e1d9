//! Chart Viewer Widget
//! Central panel: header KPIs, fallback notices and the tabbed chart views.

use crate::charts::{AgeChartData, ChartData, ChartPlotter};
use crate::data::{Dataset, Fallback, TableKind, Unit};
use crate::gui::control_panel::UserSettings;
use crate::stats::{format_count, tidy_percent, Kpis, StatsCalculator};
use egui::{Color32, RichText, ScrollArea};

/// Dashboard tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Overview,
    Demographics,
    IncomeNetWorth,
    Age,
    HomeOwnership,
    Data,
}

impl Tab {
    pub const ALL: [Tab; 6] = [
        Tab::Overview,
        Tab::Demographics,
        Tab::IncomeNetWorth,
        Tab::Age,
        Tab::HomeOwnership,
        Tab::Data,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Overview => "Overview",
            Tab::Demographics => "Demographics",
            Tab::IncomeNetWorth => "Income & Net Worth",
            Tab::Age => "Age",
            Tab::HomeOwnership => "Home Ownership",
            Tab::Data => "Data",
        }
    }
}

/// Text of the senior-share caption under the age chart.
pub fn senior_caption(ds: &Dataset, threshold: u32, unit: Unit) -> Option<String> {
    let share = StatsCalculator::share_at_or_above(&ds.age, threshold, unit)?;
    Some(match unit {
        Unit::Percent => format!("Share ages {}+: {}", threshold, tidy_percent(share.share_percent)),
        Unit::Count => format!(
            "Households ages {}+: {} ({})",
            threshold,
            format_count(share.value.round() as u64),
            tidy_percent(share.share_percent)
        ),
    })
}

/// Info line for the unknown-age bucket.
pub fn age_unknown_notice(ds: &Dataset) -> Option<String> {
    ds.age.unknown().map(|r| {
        format!(
            "Age 'Unknown' count: {} ({}).",
            format_count(r.count),
            tidy_percent(r.percent)
        )
    })
}

/// Scrollable dashboard area with a tab strip.
pub struct ChartViewer {
    pub active_tab: Tab,
    pub data_table: TableKind,
    kpis: Option<Kpis>,
}

impl Default for ChartViewer {
    fn default() -> Self {
        Self {
            active_tab: Tab::Overview,
            data_table: TableKind::HouseholdSize,
            kpis: None,
        }
    }
}

impl ChartViewer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute header metrics after a (re)load.
    pub fn set_dataset(&mut self, ds: &Dataset) {
        self.kpis = Some(StatsCalculator::compute_kpis(ds));
    }

    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        ds: Option<&Dataset>,
        fallbacks: &[Fallback],
        settings: &UserSettings,
        senior_age: u32,
    ) {
        let Some(ds) = ds else {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("Loading data…").size(20.0));
            });
            return;
        };

        self.draw_header(ui, fallbacks);
        ui.add_space(8.0);

        ui.horizontal(|ui| {
            for tab in Tab::ALL {
                ui.selectable_value(
                    &mut self.active_tab,
                    tab,
                    RichText::new(tab.title()).size(14.0),
                );
            }
        });
        ui.separator();

        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| match self.active_tab {
                Tab::Overview => Self::overview_tab(ui, ds, settings),
                Tab::Demographics => Self::demographics_tab(ui, ds, settings),
                Tab::IncomeNetWorth => Self::income_tab(ui, ds, settings),
                Tab::Age => Self::age_tab(ui, ds, settings, senior_age),
                Tab::HomeOwnership => Self::home_tab(ui, ds, settings),
                Tab::Data => self.data_tab(ui, ds),
            });
    }

    fn metric(ui: &mut egui::Ui, label: &str, value: &str, note: Option<&str>) {
        egui::Frame::none()
            .rounding(8.0)
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .inner_margin(10.0)
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.label(RichText::new(label).size(12.0).color(Color32::GRAY));
                ui.label(RichText::new(value).size(22.0).strong());
                if let Some(note) = note {
                    ui.label(RichText::new(note).size(11.0).color(Color32::GRAY));
                }
            });
    }

    fn draw_header(&self, ui: &mut egui::Ui, fallbacks: &[Fallback]) {
        ui.label(RichText::new("📊 Household Demographics Dashboard").size(24.0).strong());
        ui.label(
            RichText::new(
                "Interactive view of household size, marital status, gender, children, \
                 income, net worth, age distribution, and home ownership.",
            )
            .color(Color32::GRAY),
        );
        ui.add_space(8.0);

        if let Some(k) = &self.kpis {
            let dash = || "–".to_string();
            let top_income = match (&k.top_income_label, k.top_income_percent) {
                (Some(label), Some(pct)) => format!("{} ({})", label, tidy_percent(pct)),
                _ => dash(),
            };
            let median_note = k
                .median_income_label
                .as_ref()
                .map(|m| format!("Median income bucket ≈ {}", m));

            ui.columns(4, |cols| {
                Self::metric(&mut cols[0], "Total Households", &format_count(k.total_households), None);
                Self::metric(
                    &mut cols[1],
                    "With Children (Yes)",
                    &k.with_children_percent.map(tidy_percent).unwrap_or_else(dash),
                    None,
                );
                Self::metric(
                    &mut cols[2],
                    "Verified Home Owners",
                    &k.verified_home_owners_percent
                        .map(tidy_percent)
                        .unwrap_or_else(dash),
                    None,
                );
                Self::metric(
                    &mut cols[3],
                    "Top Income Bucket",
                    &top_income,
                    median_note.as_deref(),
                );
            });
        }

        if !fallbacks.is_empty() {
            ui.add_space(6.0);
            let names: Vec<&str> = fallbacks.iter().map(|f| f.kind.stem()).collect();
            ui.label(
                RichText::new(format!(
                    "⚠ Using bundled data for: {}",
                    names.join(", ")
                ))
                .color(Color32::from_rgb(243, 156, 18)),
            )
            .on_hover_text(
                fallbacks
                    .iter()
                    .map(|f| format!("{}: {}", f.kind.stem(), f.reason))
                    .collect::<Vec<_>>()
                    .join("\n"),
            );
        }
    }

    fn chart(ds: &Dataset, kind: TableKind, title: &str, settings: &UserSettings) -> ChartData {
        match ds.category(kind) {
            Some(table) => ChartData::from_table(title, table, settings.unit, settings.show_unknowns),
            None => ChartData {
                title: title.to_string(),
                unit: settings.unit,
                points: Vec::new(),
            },
        }
    }

    fn overview_tab(ui: &mut egui::Ui, ds: &Dataset, s: &UserSettings) {
        ui.columns(2, |cols| {
            ChartPlotter::draw_hbar_chart(
                &mut cols[0],
                &Self::chart(ds, TableKind::HouseholdSize, "Household Size Distribution", s),
            );
            ChartPlotter::draw_donut_chart(
                &mut cols[1],
                &Self::chart(ds, TableKind::MaritalStatus, "Household Marital Status", s),
            );
        });
        ui.add_space(12.0);
        ui.columns(2, |cols| {
            ChartPlotter::draw_bar_chart(&mut cols[0], &Self::chart(ds, TableKind::Gender, "Gender", s));
            ChartPlotter::draw_bar_chart(
                &mut cols[1],
                &Self::chart(ds, TableKind::PresenceOfChildren, "Presence of Children", s),
            );
        });
    }

    fn demographics_tab(ui: &mut egui::Ui, ds: &Dataset, s: &UserSettings) {
        ui.heading("Household Size");
        ChartPlotter::draw_treemap(
            ui,
            &Self::chart(ds, TableKind::HouseholdSize, "Treemap: Household Size", s),
        );
        ui.add_space(12.0);

        ui.heading("Marital Status");
        ChartPlotter::draw_bar_chart(
            ui,
            &Self::chart(ds, TableKind::MaritalStatus, "Marital Status Distribution", s),
        );
        ui.add_space(12.0);

        ui.heading("Gender");
        ChartPlotter::draw_funnel_chart(
            ui,
            &Self::chart(ds, TableKind::Gender, "Gender Share (Funnel)", s),
        );
    }

    fn income_tab(ui: &mut egui::Ui, ds: &Dataset, s: &UserSettings) {
        ui.columns(2, |cols| {
            let left = &mut cols[0];
            left.heading("Estimated Household Income");
            ChartPlotter::draw_bar_chart(
                left,
                &Self::chart(ds, TableKind::Income, "Income Distribution (Ordered)", s),
            );
            left.add_space(12.0);
            ChartPlotter::draw_treemap(left, &Self::chart(ds, TableKind::Income, "Income Treemap", s));

            let right = &mut cols[1];
            right.heading("Net Worth");
            ChartPlotter::draw_hbar_chart(
                right,
                &Self::chart(ds, TableKind::NetWorth, "Net Worth Tiers", s),
            );
            right.add_space(12.0);
            ChartPlotter::draw_donut_chart(
                right,
                &Self::chart(ds, TableKind::NetWorth, "Net Worth Share", s),
            );
        });
    }

    fn age_tab(ui: &mut egui::Ui, ds: &Dataset, s: &UserSettings, senior_age: u32) {
        ui.heading("Age Distribution");
        let data = AgeChartData::build(&ds.age, s.unit, s.age_smoothing);
        ChartPlotter::draw_age_chart(ui, &data, senior_age);

        if let Some(caption) = senior_caption(ds, senior_age, s.unit) {
            ui.label(RichText::new(caption).color(Color32::GRAY));
        }
        if let Some(notice) = age_unknown_notice(ds) {
            ui.add_space(6.0);
            egui::Frame::none()
                .rounding(5.0)
                .fill(Color32::from_rgb(30, 60, 90))
                .inner_margin(8.0)
                .show(ui, |ui| {
                    ui.label(RichText::new(format!("ℹ {}", notice)).color(Color32::WHITE));
                });
        }
    }

    fn home_tab(ui: &mut egui::Ui, ds: &Dataset, s: &UserSettings) {
        ui.heading("Home Ownership");
        ui.columns(2, |cols| {
            ChartPlotter::draw_hbar_chart(
                &mut cols[0],
                &Self::chart(ds, TableKind::HomeOwnership, "Home Ownership Categories", s),
            );
            ChartPlotter::draw_donut_chart(
                &mut cols[1],
                &Self::chart(ds, TableKind::HomeOwnership, "Home Ownership Share", s),
            );
        });
    }

    fn data_tab(&mut self, ui: &mut egui::Ui, ds: &Dataset) {
        egui::ComboBox::from_id_salt("data_table")
            .width(240.0)
            .selected_text(self.data_table.title())
            .show_ui(ui, |ui| {
                for kind in TableKind::ALL {
                    ui.selectable_value(&mut self.data_table, kind, kind.title());
                }
            });
        ui.add_space(8.0);

        let header = |ui: &mut egui::Ui, cols: &[&str]| {
            for c in cols {
                ui.label(RichText::new(*c).strong());
            }
            ui.end_row();
        };

        egui::Grid::new(ui.make_persistent_id(format!("data_grid_{}", self.data_table.stem())))
            .striped(true)
            .min_col_width(70.0)
            .spacing([16.0, 4.0])
            .show(ui, |ui| match ds.category(self.data_table) {
                Some(table) => {
                    header(ui, &["Code", "Label", "Count", "Percent"]);
                    for row in &table.rows {
                        ui.label(&row.code);
                        ui.label(&row.label);
                        ui.label(format_count(row.count));
                        ui.label(tidy_percent(row.percent));
                        ui.end_row();
                    }
                    ui.label("");
                    ui.label(RichText::new("Total").strong());
                    ui.label(RichText::new(format_count(table.total_count())).strong());
                    ui.label(RichText::new(tidy_percent(table.total_percent())).strong());
                    ui.end_row();
                }
                None => {
                    header(ui, &["Age", "Count", "Percent"]);
                    for row in ds.age.all_rows() {
                        ui.label(row.age.to_string());
                        ui.label(format_count(row.count));
                        ui.label(tidy_percent(row.percent));
                        ui.end_row();
                    }
                    ui.label(RichText::new("Total").strong());
                    ui.label(RichText::new(format_count(ds.age.total_count())).strong());
                    ui.label("");
                    ui.end_row();
                }
            });
    }
}
