//! Chart renderers.
//!
//! Each renderer lays out one chart shape into a [`Figure`]. Sizes are in
//! figure units (100 per inch); font sizes from the configuration are in
//! points and converted with [`pt`].

use super::figure::{Anchor, Figure, Rgb, TextRun};
use super::theme::{colors, Theme};
use super::{month_tick_interval, month_ticks, pie_slices, year_ticks};
use crate::analysis::cumulative;
use crate::config::ChartConfig;
use crate::fonts::{self, FontFace};
use crate::models::{
    format_bytes, human_size, with_thousands, AggregationResult, DistributionShape, GrowthPoint,
    Period, RankedEntry, SizeCategory,
};
use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;

/// Convert a point size to figure units.
pub fn pt(points: f64) -> f64 {
    points * 100.0 / 72.0
}

/// Plot rectangle inside a figure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Area {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Area {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

/// Linear axis starting at zero.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearAxis {
    pub max: f64,
    pub ticks: Vec<f64>,
}

impl LinearAxis {
    /// Axis for byte values up to `max_value`, extended by `headroom`.
    /// Ticks fall on round multiples of the binary unit of the axis top,
    /// so `format_bytes` labels stay short.
    pub fn bytes(max_value: f64, headroom: f64) -> Self {
        let top = (max_value * headroom).max(1.0);
        let mut unit = 1.0;
        while top / unit >= 1024.0 && unit < 1024f64.powi(5) {
            unit *= 1024.0;
        }
        let step = nice_step(top / unit / 5.0) * unit;
        let ticks = (0u32..)
            .map(|i| i as f64 * step)
            .take_while(|&t| t <= top * (1.0 + 1e-9))
            .collect();
        Self { max: top, ticks }
    }

    /// Fraction of the axis covered by `value`.
    pub fn fraction(&self, value: f64) -> f64 {
        (value / self.max).clamp(0.0, 1.0)
    }
}

/// Decade-based logarithmic axis.
#[derive(Debug, Clone, PartialEq)]
pub struct LogAxis {
    pub min_exp: i32,
    pub max_exp: i32,
}

impl LogAxis {
    /// Axis covering `min..=max` (both at least 1) with room below the
    /// smallest bar.
    pub fn covering(min: u64, max: u64) -> Self {
        let lo = (min.max(1) as f64).log10();
        let hi = (max.max(1) as f64).log10();
        let mut min_exp = lo.floor() as i32;
        if (lo - min_exp as f64) < 0.3 {
            min_exp -= 1;
        }
        let max_exp = ((hi + 0.1).ceil() as i32).max(min_exp + 1);
        Self { min_exp, max_exp }
    }

    pub fn fraction(&self, value: f64) -> f64 {
        let v = value.max(f64::MIN_POSITIVE).log10();
        ((v - self.min_exp as f64) / (self.max_exp - self.min_exp) as f64).clamp(0.0, 1.0)
    }

    pub fn ticks(&self) -> Vec<i32> {
        (self.min_exp..=self.max_exp).collect()
    }
}

fn nice_step(raw: f64) -> f64 {
    if raw <= 0.0 || !raw.is_finite() {
        return 1.0;
    }
    let base = 10f64.powf(raw.log10().floor());
    let frac = raw / base;
    let nice = if frac <= 1.0 {
        1.0
    } else if frac <= 2.0 {
        2.0
    } else if frac <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * base
}

fn decade_label(exp: i32) -> String {
    if exp >= 0 {
        with_thousands(10u64.saturating_pow(exp as u32))
    } else {
        format!("{}", 10f64.powi(exp))
    }
}

/// Renders chart figures with one theme and font configuration.
#[derive(Debug, Clone)]
pub struct ChartRenderer {
    theme: Theme,
    title_size: f64,
    label_size: f64,
    rotation: f64,
}

impl ChartRenderer {
    pub fn new(config: &ChartConfig) -> Self {
        Self {
            theme: Theme::named(&config.style),
            title_size: pt(config.title_fontsize as f64),
            label_size: pt(config.label_fontsize as f64),
            rotation: config.xaxis_rotation as f64,
        }
    }

    fn run(&self, x: f64, y: f64, text: impl Into<String>, size: f64, anchor: Anchor) -> TextRun {
        TextRun {
            x,
            y,
            text: text.into(),
            size,
            color: self.theme.text,
            anchor,
            rotation: 0.0,
            bold: false,
        }
    }

    /// Centered title, one run per line, shrunk to the figure width.
    /// Returns the y coordinate below the title.
    fn title(&self, fig: &mut Figure, title: &str, size: f64) -> f64 {
        let face = FontFace::HELVETICA;
        let mut y = 20.0;
        for line in title.lines() {
            let line_size = fonts::fit_size(face, line, size, size * 0.5, fig.width - 40.0);
            y += line_size * 1.2;
            let run = self.run(fig.width / 2.0, y, line, line_size, Anchor::Middle);
            fig.text(run);
        }
        y + 10.0
    }

    fn plot_frame(&self, fig: &mut Figure, area: Area) {
        fig.rect(
            area.left,
            area.top,
            area.width(),
            area.height(),
            self.theme.plot_background,
        );
    }

    /// Axis spines, drawn only when they differ from the plot background.
    fn spines(&self, fig: &mut Figure, area: Area) {
        if self.theme.axis == self.theme.plot_background {
            return;
        }
        fig.line(
            vec![
                (area.left, area.top),
                (area.left, area.bottom),
                (area.right, area.bottom),
                (area.right, area.top),
                (area.left, area.top),
            ],
            self.theme.axis,
            1.0,
        );
    }

    fn hgrid(&self, fig: &mut Figure, area: Area, ys: impl IntoIterator<Item = f64>) {
        for y in ys {
            fig.line(vec![(area.left, y), (area.right, y)], self.theme.grid, 1.0);
        }
    }

    fn vgrid(&self, fig: &mut Figure, area: Area, xs: impl IntoIterator<Item = f64>) {
        for x in xs {
            fig.line(vec![(x, area.top), (x, area.bottom)], self.theme.grid, 1.0);
        }
    }

    /// Rotated axis label along the left edge.
    fn y_label(&self, fig: &mut Figure, x: f64, area: Area, text: &str) {
        let mut run = self.run(
            x,
            area.top + area.height() / 2.0,
            text,
            self.label_size,
            Anchor::Middle,
        );
        run.rotation = 90.0;
        fig.text(run);
    }

    /// Category or date label under the x axis, rotated per configuration.
    fn x_tick_label(&self, fig: &mut Figure, x: f64, y: f64, text: &str) {
        let anchor = if self.rotation > 0.0 {
            Anchor::End
        } else {
            Anchor::Middle
        };
        let mut run = self.run(x, y + self.label_size, text, self.label_size, anchor);
        run.rotation = self.rotation;
        fig.text(run);
    }

    fn rotated_label_extent(&self, labels: &[String]) -> f64 {
        let widest = labels
            .iter()
            .map(|l| FontFace::HELVETICA.text_width(l, self.label_size))
            .fold(0.0, f64::max);
        let angle = self.rotation.abs().to_radians();
        widest * angle.sin() + self.label_size * (1.0 + angle.cos())
    }

    fn widest(&self, labels: impl IntoIterator<Item = String>, size: f64) -> f64 {
        labels
            .into_iter()
            .map(|l| FontFace::HELVETICA.text_width(&l, size))
            .fold(0.0, f64::max)
    }

    /// Horizontal bars, largest on top, each annotated with its size.
    pub fn ranked_bars(&self, entries: &[RankedEntry], title: &str, color: Rgb) -> Option<Figure> {
        if entries.is_empty() {
            return None;
        }

        let mut fig = Figure::new(1000.0, 700.0, self.theme.background);
        let top = self.title(&mut fig, title, self.title_size);
        let l = self.label_size;
        let face = FontFace::HELVETICA;

        let label_width = self
            .widest(entries.iter().map(|e| e.key.clone()), l)
            .min(fig.width * 0.35);
        let area = Area {
            left: 20.0 + label_width + 8.0,
            top: top + 10.0,
            right: fig.width - 30.0,
            bottom: fig.height - (3.0 * l + 30.0),
        };

        let max = entries.iter().map(|e| e.total_bytes).max().unwrap_or(0);
        let axis = LinearAxis::bytes(max as f64, 1.3);
        self.plot_frame(&mut fig, area);
        let tick_xs: Vec<f64> = axis
            .ticks
            .iter()
            .map(|&t| area.left + axis.fraction(t) * area.width())
            .collect();
        self.vgrid(&mut fig, area, tick_xs.iter().copied());
        self.spines(&mut fig, area);

        for (&t, &x) in axis.ticks.iter().zip(&tick_xs) {
            let run = self.run(x, area.bottom + l + 6.0, format_bytes(Some(t)), l, Anchor::Middle);
            fig.text(run);
        }
        let x_label = self.run(
            area.left + area.width() / 2.0,
            area.bottom + 2.0 * l + 22.0,
            "Total Size",
            l,
            Anchor::Middle,
        );
        fig.text(x_label);

        let band = area.height() / entries.len() as f64;
        for (i, entry) in entries.iter().rev().enumerate() {
            let center = area.bottom - (i as f64 + 0.5) * band;
            let bar_h = band * 0.8;
            let bar_w = axis.fraction(entry.total_bytes as f64) * area.width();
            fig.rect(area.left, center - bar_h / 2.0, bar_w, bar_h, color);

            let name = fonts::ellipsize(face, &entry.key, l, label_width);
            fig.text(self.run(area.left - 6.0, center + l * 0.35, name, l, Anchor::End));
            fig.text(self.run(
                area.left + bar_w + 5.0,
                center + l * 0.35,
                human_size(entry.total_bytes),
                l,
                Anchor::Start,
            ));
        }

        Some(fig)
    }

    /// Project distribution: a pie, or a single bar when only one project
    /// exists.
    pub fn distribution(&self, entries: &[RankedEntry], title: &str) -> Option<Figure> {
        match DistributionShape::of(entries) {
            DistributionShape::Empty => None,
            DistributionShape::Single => Some(self.single_bar(&entries[0], title)),
            DistributionShape::Complete(_) | DistributionShape::Folded(_) => {
                Some(self.pie(&pie_slices(entries), title))
            }
        }
    }

    fn single_bar(&self, entry: &RankedEntry, title: &str) -> Figure {
        let mut fig = Figure::new(1000.0, 800.0, self.theme.background);
        let top = self.title(
            &mut fig,
            &format!("{}\n(Single Item Found)", title),
            self.title_size,
        );
        let l = self.label_size;

        let axis = LinearAxis::bytes(entry.total_bytes as f64, 1.15);
        let tick_labels: Vec<String> = axis.ticks.iter().map(|&t| format_bytes(Some(t))).collect();
        let left = 30.0 + 1.5 * l + self.widest(tick_labels.iter().cloned(), l) + 8.0;
        let area = Area {
            left,
            top: top + pt(12.0) + 20.0,
            right: fig.width - 30.0,
            bottom: fig.height - (2.0 * l + 30.0),
        };

        self.plot_frame(&mut fig, area);
        let tick_ys: Vec<f64> = axis
            .ticks
            .iter()
            .map(|&t| area.bottom - axis.fraction(t) * area.height())
            .collect();
        self.hgrid(&mut fig, area, tick_ys.iter().copied());
        self.spines(&mut fig, area);
        for (label, &y) in tick_labels.into_iter().zip(&tick_ys) {
            fig.text(self.run(area.left - 6.0, y + l * 0.35, label, l, Anchor::End));
        }
        self.y_label(&mut fig, 30.0 + l, area, "Total Size");

        let center = area.left + area.width() / 2.0;
        let bar_w = area.width() / 2.0;
        let bar_h = axis.fraction(entry.total_bytes as f64) * area.height();
        fig.rect(
            center - bar_w / 2.0,
            area.bottom - bar_h,
            bar_w,
            bar_h,
            colors::STEEL_BLUE,
        );

        let mut value = self.run(
            center,
            area.bottom - bar_h - 6.0,
            format!(" {}", human_size(entry.total_bytes)),
            pt(12.0),
            Anchor::Middle,
        );
        value.bold = true;
        fig.text(value);

        let name = fonts::ellipsize(FontFace::HELVETICA, &entry.key, l, area.width());
        fig.text(self.run(center, area.bottom + l + 6.0, name, l, Anchor::Middle));
        fig
    }

    fn pie(&self, slices: &[RankedEntry], title: &str) -> Figure {
        let mut fig = Figure::new(1000.0, 800.0, self.theme.background);
        let top = self.title(&mut fig, title, self.title_size);
        let l = self.label_size;
        let face = FontFace::HELVETICA;

        let total = slices
            .iter()
            .fold(0u64, |acc, s| acc.saturating_add(s.total_bytes));

        let legend_entries: Vec<String> = slices
            .iter()
            .map(|s| format!("{} ({})", s.key, human_size(s.total_bytes)))
            .collect();
        let swatch = l;
        let legend_w = (self.widest(legend_entries.iter().cloned(), l) + swatch + 8.0).min(380.0);

        let avail_top = top + 20.0;
        let avail_bottom = fig.height - 30.0;
        let radius = ((avail_bottom - avail_top) / 2.0).min(280.0);
        let span = 2.0 * radius + 40.0 + legend_w;
        let cx = ((fig.width - span) / 2.0).max(20.0) + radius;
        let cy = avail_top + (avail_bottom - avail_top) / 2.0;

        if total == 0 {
            fig.text(self.run(cx, cy, "No storage recorded", l, Anchor::Middle));
        } else {
            let mut start = 90.0f64;
            for (i, slice) in slices.iter().enumerate() {
                let share = slice.total_bytes as f64 / total as f64;
                let sweep = share * 360.0;
                if sweep <= 0.0 {
                    continue;
                }
                fig.polygon(
                    wedge(cx, cy, radius, start, start + sweep),
                    self.theme.slice_color(i),
                );

                let pct = share * 100.0;
                if pct > 3.0 {
                    let mid = (start + sweep / 2.0).to_radians();
                    let size = pt(10.0);
                    let mut label = self.run(
                        cx + 0.85 * radius * mid.cos(),
                        cy - 0.85 * radius * mid.sin() + size * 0.35,
                        format!("{:.1}%", pct),
                        size,
                        Anchor::Middle,
                    );
                    label.color = Rgb::WHITE;
                    label.bold = true;
                    fig.text(label);
                }
                start += sweep;
            }
        }

        let legend_x = cx + radius + 40.0;
        let row_h = l * 1.6;
        let legend_h = row_h * (slices.len() as f64 + 1.0);
        let mut y = cy - legend_h / 2.0;
        fig.text(self.run(
            legend_x + legend_w / 2.0,
            y + l,
            "Project Id",
            l,
            Anchor::Middle,
        ));
        for (i, entry) in legend_entries.iter().enumerate() {
            y += row_h;
            fig.rect(legend_x, y, swatch, swatch * 0.7, self.theme.slice_color(i));
            let text = fonts::ellipsize(face, entry, l, legend_w - swatch - 8.0);
            fig.text(self.run(
                legend_x + swatch + 8.0,
                y + swatch * 0.7,
                text,
                l,
                Anchor::Start,
            ));
        }

        fig
    }

    /// Object counts per size category on a log scale, in canonical order.
    pub fn size_histogram(
        &self,
        distribution: &BTreeMap<SizeCategory, u64>,
        title: &str,
        color: Rgb,
    ) -> Option<Figure> {
        let bars: Vec<(SizeCategory, u64)> = SizeCategory::ALL
            .iter()
            .filter_map(|c| distribution.get(c).map(|&n| (*c, n)))
            .filter(|&(_, n)| n > 0)
            .collect();
        if bars.is_empty() {
            return None;
        }

        let mut fig = Figure::new(1000.0, 600.0, self.theme.background);
        let top = self.title(&mut fig, title, self.title_size);
        let l = self.label_size;

        let min = bars.iter().map(|&(_, n)| n).min().unwrap_or(1);
        let max = bars.iter().map(|&(_, n)| n).max().unwrap_or(1);
        let axis = LogAxis::covering(min, max);
        let tick_labels: Vec<(i32, String)> =
            axis.ticks().into_iter().map(|e| (e, decade_label(e))).collect();
        let categories: Vec<String> = bars.iter().map(|(c, _)| c.label().to_string()).collect();

        let area = Area {
            left: 30.0 + 1.5 * l + self.widest(tick_labels.iter().map(|(_, s)| s.clone()), l) + 8.0,
            top: top + 10.0,
            right: fig.width - 30.0,
            bottom: fig.height - 20.0 - self.rotated_label_extent(&categories),
        };

        self.plot_frame(&mut fig, area);
        let tick_ys: Vec<f64> = tick_labels
            .iter()
            .map(|(e, _)| area.bottom - axis.fraction(10f64.powi(*e)) * area.height())
            .collect();
        self.hgrid(&mut fig, area, tick_ys.iter().copied());
        self.spines(&mut fig, area);
        for ((_, label), &y) in tick_labels.iter().zip(&tick_ys) {
            fig.text(self.run(area.left - 6.0, y + l * 0.35, label.clone(), l, Anchor::End));
        }
        self.y_label(&mut fig, 30.0 + l, area, "Number of Objects (Log Scale)");

        let band = area.width() / bars.len() as f64;
        for (i, ((_, count), label)) in bars.iter().zip(&categories).enumerate() {
            let center = area.left + (i as f64 + 0.5) * band;
            let bar_w = band * 0.8;
            let bar_h = axis.fraction(*count as f64) * area.height();
            fig.rect(center - bar_w / 2.0, area.bottom - bar_h, bar_w, bar_h, color);
            self.x_tick_label(&mut fig, center, area.bottom + 4.0, label);
        }

        Some(fig)
    }

    /// Cumulative growth as a filled line over a time axis.
    pub fn growth(&self, series: &[GrowthPoint], period: Period, title: &str) -> Option<Figure> {
        let points = cumulative(series);
        let (first, last) = match (points.first(), points.last()) {
            (Some(f), Some(l)) => (f.0, l.0),
            _ => return None,
        };

        let mut fig = Figure::new(1200.0, 600.0, self.theme.background);
        let top = self.title(&mut fig, title, self.title_size);
        let l = self.label_size;

        let span = (last - first).num_days();
        let min_pad = match period {
            Period::Month => 15,
            Period::Year => 182,
        };
        let pad = Duration::days((span / 20).max(min_pad));
        let (x_lo, x_hi) = (first - pad, last + pad);

        let (ticks, fmt) = match period {
            Period::Month => (
                month_ticks(x_lo, x_hi, month_tick_interval(points.len())),
                "%Y-%m",
            ),
            Period::Year => (year_ticks(x_lo, x_hi), "%Y"),
        };
        let tick_text: Vec<String> = ticks.iter().map(|d| d.format(fmt).to_string()).collect();

        let max = points.iter().map(|&(_, v)| v).max().unwrap_or(0);
        let axis = LinearAxis::bytes(max as f64, 1.1);
        let y_labels: Vec<String> = axis.ticks.iter().map(|&t| format_bytes(Some(t))).collect();

        let area = Area {
            left: 30.0 + 1.5 * l + self.widest(y_labels.iter().cloned(), l) + 8.0,
            top: top + 10.0,
            right: fig.width - 30.0,
            bottom: fig.height - 20.0 - self.rotated_label_extent(&tick_text),
        };

        let total_days = (x_hi - x_lo).num_days().max(1) as f64;
        let x_of = |d: NaiveDate| area.left + (d - x_lo).num_days() as f64 / total_days * area.width();
        let y_of = |v: u64| area.bottom - axis.fraction(v as f64) * area.height();

        self.plot_frame(&mut fig, area);
        let tick_ys: Vec<f64> = axis
            .ticks
            .iter()
            .map(|&t| area.bottom - axis.fraction(t) * area.height())
            .collect();
        self.hgrid(&mut fig, area, tick_ys.iter().copied());
        self.vgrid(&mut fig, area, ticks.iter().map(|&d| x_of(d)));
        self.spines(&mut fig, area);

        for (label, &y) in y_labels.into_iter().zip(&tick_ys) {
            fig.text(self.run(area.left - 6.0, y + l * 0.35, label, l, Anchor::End));
        }
        self.y_label(&mut fig, 30.0 + l, area, "Total Storage");
        for (d, label) in ticks.iter().zip(&tick_text) {
            self.x_tick_label(&mut fig, x_of(*d), area.bottom + 4.0, label);
        }

        let line: Vec<(f64, f64)> = points.iter().map(|&(d, v)| (x_of(d), y_of(v))).collect();
        let mut fill = line.clone();
        fill.push((x_of(last), area.bottom));
        fill.push((x_of(first), area.bottom));
        fig.polygon(fill, colors::SERIES.blend(self.theme.plot_background, 0.8));
        fig.line(line.clone(), colors::SERIES, 2.5);
        for (x, y) in line {
            fig.rect(x - 3.0, y - 3.0, 6.0, 6.0, colors::SERIES);
        }

        Some(fig)
    }

    /// Headline numbers plus three reused panels on a 2x2 grid.
    pub fn dashboard(&self, aggregation: &AggregationResult) -> Figure {
        let mut fig = Figure::new(2000.0, 1400.0, self.theme.background);
        let mut heading = self.run(
            fig.width / 2.0,
            20.0 + pt(28.0),
            "Storage Analysis Dashboard",
            pt(28.0),
            Anchor::Middle,
        );
        heading.bold = true;
        fig.text(heading);

        let gap = 20.0;
        let grid_top = 40.0 + pt(28.0) + gap;
        let cell_w = (fig.width - 3.0 * gap) / 2.0;
        let cell_h = (fig.height - grid_top - 2.0 * gap) / 2.0;
        let cell = |row: usize, col: usize| {
            (
                gap + col as f64 * (cell_w + gap),
                grid_top + row as f64 * (cell_h + gap),
            )
        };

        let (x, y) = cell(0, 0);
        self.headline_box(&mut fig, aggregation, x + cell_w / 2.0, y + cell_h / 2.0);

        let panels = [
            (
                (0, 1),
                self.distribution(&aggregation.distribution_by_project, "Storage by Project"),
            ),
            (
                (1, 0),
                self.ranked_bars(&aggregation.top_buckets, "Top Buckets by Size", colors::TEAL),
            ),
            (
                (1, 1),
                self.size_histogram(
                    &aggregation.size_distribution,
                    "Size Distribution",
                    colors::INDIGO,
                ),
            ),
        ];
        for ((row, col), panel) in panels {
            if let Some(panel) = panel {
                let (x, y) = cell(row, col);
                fig.embed(&panel, x, y, cell_w, cell_h);
            }
        }

        fig
    }

    fn headline_box(&self, fig: &mut Figure, aggregation: &AggregationResult, cx: f64, cy: f64) {
        let size = pt(24.0);
        let lines = [
            "Total Objects".to_string(),
            with_thousands(aggregation.summary.object_count),
            String::new(),
            "Total Storage".to_string(),
            format_bytes(aggregation.summary.total_bytes.map(|b| b as f64)),
        ];
        let line_h = size * 1.2;
        let pad = size * 0.5;
        let text_w = self.widest(lines.iter().cloned(), size);
        let box_w = text_w + 2.0 * pad;
        let box_h = line_h * lines.len() as f64 + 2.0 * pad;
        let (bx, by) = (cx - box_w / 2.0, cy - box_h / 2.0);
        let border = 3.0;

        fig.rect(bx - border, by - border, box_w + 2.0 * border, box_h + 2.0 * border, colors::BLUE);
        fig.rect(bx, by, box_w, box_h, colors::ALICE_BLUE);
        for (i, line) in lines.into_iter().enumerate() {
            let mut run = self.run(
                cx,
                by + pad + line_h * (i as f64 + 1.0) - size * 0.25,
                line,
                size,
                Anchor::Middle,
            );
            run.color = Rgb::BLACK;
            fig.text(run);
        }
    }
}

/// Closed outline of a pie wedge from `start` to `end` degrees,
/// counter-clockwise, in y-down coordinates.
fn wedge(cx: f64, cy: f64, r: f64, start: f64, end: f64) -> Vec<(f64, f64)> {
    let steps = (((end - start) / 2.0).ceil() as usize).max(1);
    let mut points = Vec::with_capacity(steps + 2);
    if end - start < 359.999 {
        points.push((cx, cy));
    }
    for i in 0..=steps {
        let a = (start + (end - start) * i as f64 / steps as f64).to_radians();
        points.push((cx + r * a.cos(), cy - r * a.sin()));
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::figure_texts;

    fn renderer() -> ChartRenderer {
        ChartRenderer::new(&ChartConfig::default())
    }

    fn entries(n: usize) -> Vec<RankedEntry> {
        (0..n)
            .map(|i| RankedEntry::new(format!("project-{}", i), 1000 * (n - i) as u64))
            .collect()
    }

    #[test]
    fn test_byte_axis_ticks_use_round_units() {
        let axis = LinearAxis::bytes(900.0 * 1024.0 * 1024.0, 1.0);
        assert_eq!(axis.ticks[0], 0.0);
        for t in &axis.ticks {
            assert!(format_bytes(Some(*t)).ends_with(".00 MB") || *t == 0.0, "{}", t);
        }
        assert!(*axis.ticks.last().unwrap() <= axis.max);

        let zero = LinearAxis::bytes(0.0, 1.3);
        assert_eq!(zero.max, 1.0);
    }

    #[test]
    fn test_log_axis_leaves_room_under_smallest_bar() {
        let axis = LogAxis::covering(1, 1500);
        assert_eq!(axis.min_exp, -1);
        assert_eq!(axis.max_exp, 4);
        assert!(axis.fraction(1.0) > 0.0);
        assert!(axis.fraction(1500.0) < 1.0);
    }

    #[test]
    fn test_ranked_bars_draw_largest_on_top() {
        let data = entries(3);
        let fig = renderer()
            .ranked_bars(&data, "Top", colors::SKY_BLUE)
            .unwrap();
        let bars: Vec<(f64, f64)> = fig
            .ops
            .iter()
            .filter_map(|op| match op {
                crate::charts::DrawOp::Rect { y, w, fill, .. } if *fill == colors::SKY_BLUE => {
                    Some((*y, *w))
                }
                _ => None,
            })
            .collect();
        assert_eq!(bars.len(), 3);
        // Drawn bottom-up: smallest first, ending with the widest bar at the top
        assert!(bars[0].1 < bars[2].1);
        assert!(bars[2].0 < bars[0].0);

        let texts = figure_texts(&fig);
        assert!(texts.contains(&"2.93 KB".to_string()));
        assert!(texts.contains(&"Total Size".to_string()));
    }

    #[test]
    fn test_empty_inputs_render_nothing() {
        let r = renderer();
        assert!(r.ranked_bars(&[], "t", colors::SKY_BLUE).is_none());
        assert!(r.distribution(&[], "t").is_none());
        assert!(r.size_histogram(&BTreeMap::new(), "t", colors::PURPLE).is_none());
        assert!(r.growth(&[], Period::Month, "t").is_none());
    }

    #[test]
    fn test_single_project_uses_single_bar() {
        let fig = renderer().distribution(&entries(1), "Storage").unwrap();
        let texts = figure_texts(&fig);
        assert!(texts.contains(&"(Single Item Found)".to_string()));
        assert!(texts.contains(&"project-0".to_string()));
        assert!(!fig
            .ops
            .iter()
            .any(|op| matches!(op, crate::charts::DrawOp::Polygon { .. })));
    }

    #[test]
    fn test_pie_folds_tail_into_others() {
        let fig = renderer().distribution(&entries(8), "Storage").unwrap();
        let wedges = fig
            .ops
            .iter()
            .filter(|op| matches!(op, crate::charts::DrawOp::Polygon { .. }))
            .count();
        assert_eq!(wedges, 6);
        let texts = figure_texts(&fig);
        assert!(texts.iter().any(|t| t.starts_with("Others (")));
        assert!(texts.contains(&"Project Id".to_string()));
    }

    #[test]
    fn test_pie_hides_small_percentages() {
        let data = vec![RankedEntry::new("big", 990), RankedEntry::new("tiny", 10)];
        let fig = renderer().distribution(&data, "Storage").unwrap();
        let texts = figure_texts(&fig);
        assert!(texts.contains(&"99.0%".to_string()));
        assert!(!texts.contains(&"1.0%".to_string()));
    }

    #[test]
    fn test_size_histogram_canonical_order() {
        let mut dist = BTreeMap::new();
        dist.insert(SizeCategory::OverTb, 2);
        dist.insert(SizeCategory::Empty, 5);
        dist.insert(SizeCategory::KbToMb, 1500);
        let fig = renderer()
            .size_histogram(&dist, "Sizes", colors::PURPLE)
            .unwrap();
        let texts = figure_texts(&fig);
        let order: Vec<_> = texts
            .iter()
            .filter(|t| ["0 B", "1 KB - 1 MB", "> 1 TB"].contains(&t.as_str()))
            .cloned()
            .collect();
        assert_eq!(order, vec!["0 B", "1 KB - 1 MB", "> 1 TB"]);
    }

    #[test]
    fn test_growth_uses_six_month_ticks_for_long_series() {
        let series: Vec<GrowthPoint> = (0..30)
            .map(|i| GrowthPoint {
                period_start: NaiveDate::from_ymd_opt(2021 + (i / 12), (i % 12) as u32 + 1, 1)
                    .unwrap(),
                total_bytes: 1024,
            })
            .collect();
        let fig = renderer()
            .growth(&series, Period::Month, "Growth")
            .unwrap();
        let texts = figure_texts(&fig);
        assert!(texts.contains(&"2021-07".to_string()));
        assert!(texts.contains(&"2022-01".to_string()));
        assert!(!texts.contains(&"2021-04".to_string()));
    }

    #[test]
    fn test_dashboard_headline() {
        let aggregation = AggregationResult {
            summary: crate::models::Summary {
                object_count: 12345,
                total_bytes: Some(2048),
            },
            ..Default::default()
        };
        let fig = renderer().dashboard(&aggregation);
        let texts = figure_texts(&fig);
        assert!(texts.contains(&"Storage Analysis Dashboard".to_string()));
        assert!(texts.contains(&"12,345".to_string()));
        assert!(texts.contains(&"2.00 KB".to_string()));
    }
}
