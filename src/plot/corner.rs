//! plot/corner.rs — N×N corner plot of sampled parameters.
//!
//! Panel (k, q) is hidden above the diagonal, a marginal histogram of
//! parameter q on it, and a density-coloured scatter of (q, k) below it.
//! Panels share axes by column (x) and by row (y), so tick labels appear only
//! on the outer panels: y ticks on the first column, x ticks on the last row.
//!
//! [`CornerPlotLayout::build`] is pure; it resolves every axis before any
//! panel is filled so an unplottable parameter fails the whole figure up
//! front. Rendering is a separate step over any plotters backend.

use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontTransform;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::axis::{self, AxisSpec, ResolvedAxis};
use crate::core::density::{DEFAULT_FALLBACK_DENSITY, DensityGridEstimator, marginal_histogram};
use crate::error::{AnalysisError, Result};
use crate::plot::colormap::{Colormap, parse_color};
use crate::trials::{ColumnSpec, ParameterTrialTable};

/// Visual options of a corner plot. Serialized as the `[corner]` table of
/// the analysis config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CornerStyle {
    /// Number of bin edges per axis (before deduplication).
    #[serde(default = "CornerStyle::default_bins")]
    pub bins: usize,
    /// Normalize histograms to unit area instead of raw counts.
    #[serde(default)]
    pub density: bool,
    /// Scatter marker diameter in points.
    #[serde(default = "CornerStyle::default_point_size")]
    pub point_size: f64,
    #[serde(default)]
    pub colormap: Colormap,
    /// Fill colour of the marginal histograms (`#rrggbb` or a name).
    #[serde(default = "CornerStyle::default_hist_color")]
    pub hist_color: String,
    /// Tick and caption size in points.
    #[serde(default = "CornerStyle::default_font_size")]
    pub font_size: f64,
    /// Raster resolution; 100 dpi renders one pixel per layout unit.
    #[serde(default = "CornerStyle::default_dpi")]
    pub dpi: u32,
    /// Side of one panel in layout units.
    #[serde(default = "CornerStyle::default_panel_px")]
    pub panel_px: u32,
    /// Density for samples outside the interpolation support.
    #[serde(default = "CornerStyle::default_fallback_density")]
    pub fallback_density: f64,
}

impl CornerStyle {
    fn default_bins() -> usize {
        20
    }
    fn default_point_size() -> f64 {
        5.0
    }
    fn default_hist_color() -> String {
        "#4b0082".to_string()
    }
    fn default_font_size() -> f64 {
        7.0
    }
    fn default_dpi() -> u32 {
        300
    }
    fn default_panel_px() -> u32 {
        120
    }
    fn default_fallback_density() -> f64 {
        DEFAULT_FALLBACK_DENSITY
    }
}

impl Default for CornerStyle {
    fn default() -> Self {
        Self {
            bins: Self::default_bins(),
            density: false,
            point_size: Self::default_point_size(),
            colormap: Colormap::default(),
            hist_color: Self::default_hist_color(),
            font_size: Self::default_font_size(),
            dpi: Self::default_dpi(),
            panel_px: Self::default_panel_px(),
            fallback_density: Self::default_fallback_density(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelKind {
    Hidden,
    Diagonal,
    OffDiagonal,
}

impl PanelKind {
    #[inline]
    pub fn classify(row: usize, col: usize) -> Self {
        match row.cmp(&col) {
            std::cmp::Ordering::Less => Self::Hidden,
            std::cmp::Ordering::Equal => Self::Diagonal,
            std::cmp::Ordering::Greater => Self::OffDiagonal,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HistogramBar {
    pub lo: f64,
    pub hi: f64,
    pub height: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub density: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PanelContent {
    Blank,
    Histogram {
        bars: Vec<HistogramBar>,
        max_height: f64,
    },
    /// Points in draw order: ascending density, densest drawn last.
    Scatter {
        points: Vec<ScatterPoint>,
        density_range: (f64, f64),
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct PanelSpec {
    pub row: usize,
    pub col: usize,
    pub kind: PanelKind,
    pub x_axis: Option<AxisSpec>,
    /// Diagonal panels have a count/density y axis with no labels.
    pub y_axis: Option<AxisSpec>,
    pub show_x_ticks: bool,
    pub show_y_ticks: bool,
    pub title: Option<String>,
    pub x_caption: Option<String>,
    pub y_caption: Option<String>,
    pub content: PanelContent,
}

impl PanelSpec {
    fn hidden(row: usize, col: usize) -> Self {
        Self {
            row,
            col,
            kind: PanelKind::Hidden,
            x_axis: None,
            y_axis: None,
            show_x_ticks: false,
            show_y_ticks: false,
            title: None,
            x_caption: None,
            y_caption: None,
            content: PanelContent::Blank,
        }
    }

    /// Densities of the scatter points in the order they are drawn.
    pub fn draw_densities(&self) -> Vec<f64> {
        match &self.content {
            PanelContent::Scatter { points, .. } => points.iter().map(|p| p.density).collect(),
            _ => Vec::new(),
        }
    }
}

/// A fully resolved corner figure, ready to render.
#[derive(Clone, Debug)]
pub struct CornerPlotLayout {
    n: usize,
    panels: Vec<PanelSpec>,
    style: CornerStyle,
}

impl CornerPlotLayout {
    pub fn build(
        table: &ParameterTrialTable,
        columns: &[ColumnSpec],
        style: &CornerStyle,
    ) -> Result<Self> {
        let n = columns.len();
        if n < 2 {
            return Err(AnalysisError::degenerate("plotted parameters", n, 2));
        }
        parse_color(&style.hist_color)?;

        let values: Vec<Vec<f64>> = columns
            .iter()
            .map(|c| table.column(&c.name))
            .collect::<Result<_>>()?;
        let axes: Vec<ResolvedAxis> = columns
            .iter()
            .zip(&values)
            .map(|(c, v)| axis::resolve(v, c.log, style.bins).map_err(|e| e.for_parameter(&c.name)))
            .collect::<Result<_>>()?;

        let estimator = DensityGridEstimator::new(style.density, style.fallback_density);
        let mut panels = Vec::with_capacity(n * n);
        for k in 0..n {
            for q in 0..n {
                let panel = match PanelKind::classify(k, q) {
                    PanelKind::Hidden => PanelSpec::hidden(k, q),
                    PanelKind::Diagonal => {
                        diagonal_panel(k, &columns[q], &values[q], &axes[q], n, style.density)?
                    }
                    PanelKind::OffDiagonal => {
                        let estimate = estimator.estimate(
                            &values[q],
                            &values[k],
                            &axes[q].edges,
                            &axes[k].edges,
                        )?;
                        let points: Vec<ScatterPoint> = estimate
                            .draw_order()
                            .into_iter()
                            .map(|i| ScatterPoint {
                                x: estimate.points[i].0,
                                y: estimate.points[i].1,
                                density: estimate.point_densities[i],
                            })
                            .collect();
                        let density_range = points.iter().fold(
                            (f64::INFINITY, f64::NEG_INFINITY),
                            |(lo, hi), p| (lo.min(p.density), hi.max(p.density)),
                        );
                        debug!(
                            x = %columns[q].name,
                            y = %columns[k].name,
                            points = points.len(),
                            "scatter panel built"
                        );
                        let last_row = k == n - 1;
                        let first_col = q == 0;
                        PanelSpec {
                            row: k,
                            col: q,
                            kind: PanelKind::OffDiagonal,
                            x_axis: Some(axes[q].spec()),
                            y_axis: Some(axes[k].spec()),
                            show_x_ticks: last_row,
                            show_y_ticks: first_col,
                            title: None,
                            x_caption: last_row.then(|| columns[q].display_label().to_string()),
                            y_caption: first_col.then(|| columns[k].display_label().to_string()),
                            content: PanelContent::Scatter {
                                points,
                                density_range,
                            },
                        }
                    }
                };
                panels.push(panel);
            }
        }

        Ok(Self {
            n,
            panels,
            style: style.clone(),
        })
    }

    /// Number of plotted parameters.
    pub fn n(&self) -> usize {
        self.n
    }

    pub fn panels(&self) -> &[PanelSpec] {
        &self.panels
    }

    pub fn panel(&self, row: usize, col: usize) -> &PanelSpec {
        &self.panels[row * self.n + col]
    }

    pub fn style(&self) -> &CornerStyle {
        &self.style
    }

    /// Canvas size in pixels at the given scale.
    pub fn canvas_size(&self, scale: f64) -> (u32, u32) {
        Geometry::new(&self.style, scale).canvas(self.n)
    }

    /// Write `<stem>.png` and `<stem>.svg` into `out_dir`.
    pub fn render(&self, out_dir: &Path, stem: &str) -> Result<(PathBuf, PathBuf)> {
        fs::create_dir_all(out_dir)?;
        let png = out_dir.join(format!("{stem}.png"));
        let svg = out_dir.join(format!("{stem}.svg"));
        self.render_png(&png)?;
        self.render_svg(&svg)?;
        Ok((png, svg))
    }

    pub fn render_png(&self, path: &Path) -> Result<()> {
        let scale = self.style.dpi as f64 / 100.0;
        let dims = self.canvas_size(scale);
        let root = BitMapBackend::new(path, dims).into_drawing_area();
        self.draw(&root, scale)?;
        root.present().map_err(render_err)?;
        info!(path = %path.display(), width = dims.0, height = dims.1, "corner plot written");
        Ok(())
    }

    pub fn render_svg(&self, path: &Path) -> Result<()> {
        let dims = self.canvas_size(1.0);
        let root = SVGBackend::new(path, dims).into_drawing_area();
        self.draw(&root, 1.0)?;
        root.present().map_err(render_err)?;
        info!(path = %path.display(), "corner plot written");
        Ok(())
    }

    pub fn render_svg_string(&self) -> Result<String> {
        let dims = self.canvas_size(1.0);
        let mut out = String::new();
        {
            let root = SVGBackend::with_string(&mut out, dims).into_drawing_area();
            self.draw(&root, 1.0)?;
            root.present().map_err(render_err)?;
        }
        Ok(out)
    }

    /// Draw the whole figure onto `root`, which must be at least
    /// [`Self::canvas_size`] large.
    pub fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>, scale: f64) -> Result<()> {
        let geo = Geometry::new(&self.style, scale);
        root.fill(&WHITE).map_err(render_err)?;
        let grid = root.margin(geo.top, geo.bottom, geo.left, geo.right);
        let cells = grid.split_evenly((self.n, self.n));
        for (panel, cell) in self.panels.iter().zip(cells.iter()) {
            if panel.kind != PanelKind::Hidden {
                self.draw_panel(root, cell, panel, &geo)?;
            }
        }
        Ok(())
    }

    fn draw_panel<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        cell: &DrawingArea<DB, Shift>,
        panel: &PanelSpec,
        geo: &Geometry,
    ) -> Result<()> {
        let Some(x_axis) = panel.x_axis.as_ref() else {
            return Ok(());
        };
        let x_range = projected_range(x_axis)?;
        let y_range = match (&panel.y_axis, &panel.content) {
            (Some(y_axis), _) => projected_range(y_axis)?,
            (None, PanelContent::Histogram { max_height, .. }) if *max_height > 0.0 => {
                0.0..max_height * 1.05
            }
            _ => 0.0..1.0,
        };
        let mut chart = ChartBuilder::on(cell)
            .build_cartesian_2d(x_range.clone(), y_range.clone())
            .map_err(render_err)?;

        match &panel.content {
            PanelContent::Blank => {}
            PanelContent::Histogram { bars, .. } => {
                let fill = parse_color(&self.style.hist_color)?.mix(0.25).filled();
                let projected: Vec<(f64, f64, f64)> = bars
                    .iter()
                    .filter_map(|b| {
                        Some((x_axis.scale.project(b.lo)?, x_axis.scale.project(b.hi)?, b.height))
                    })
                    .collect();
                chart
                    .draw_series(
                        projected
                            .iter()
                            .map(|&(x0, x1, h)| Rectangle::new([(x0, 0.0), (x1, h)], fill)),
                    )
                    .map_err(render_err)?;
                let mut outline = Vec::with_capacity(projected.len() * 2 + 2);
                if let Some(&(x0, _, _)) = projected.first() {
                    outline.push((x0, 0.0));
                }
                for &(x0, x1, h) in &projected {
                    outline.push((x0, h));
                    outline.push((x1, h));
                }
                if let Some(&(_, x1, _)) = projected.last() {
                    outline.push((x1, 0.0));
                }
                chart
                    .draw_series(std::iter::once(PathElement::new(outline, BLACK.stroke_width(1))))
                    .map_err(render_err)?;
            }
            PanelContent::Scatter {
                points,
                density_range,
            } => {
                let y_scale = panel.y_axis.as_ref().map(|a| a.scale).unwrap_or_default();
                let (lo, hi) = *density_range;
                let cmap = self.style.colormap;
                let radius = geo.marker_radius;
                chart
                    .draw_series(points.iter().filter_map(|p| {
                        let x = x_axis.scale.project(p.x)?;
                        let y = y_scale.project(p.y)?;
                        let color = cmap.normalized(p.density, lo, hi);
                        Some(Circle::new((x, y), radius, color.filled()))
                    }))
                    .map_err(render_err)?;
            }
        }

        let (x0, y0) = cell.get_base_pixel();
        let (w, h) = cell.dim_in_pixel();
        let (x1, y1) = (x0 + w as i32 - 1, y0 + h as i32 - 1);
        root.draw(&Rectangle::new([(x0, y0), (x1, y1)], BLACK.stroke_width(1)))
            .map_err(render_err)?;

        let tick_len = geo.tick_len;
        let gap = geo.font_px as i32 / 3 + 1;
        if panel.show_x_ticks {
            let style = geo.text(Pos::new(HPos::Center, VPos::Top), false);
            for tick in &x_axis.ticks {
                let Some(p) = x_axis.scale.project(tick.position) else {
                    continue;
                };
                let (px, _) = chart.backend_coord(&(p, y_range.start));
                draw_tick(root, [(px, y1), (px, y1 + tick_len)])?;
                draw_text(root, &tick.label, (px, y1 + tick_len + gap), &style)?;
            }
        }
        if panel.show_y_ticks {
            if let Some(y_axis) = panel.y_axis.as_ref() {
                let style = geo.text(Pos::new(HPos::Right, VPos::Center), false);
                for tick in &y_axis.ticks {
                    let Some(p) = y_axis.scale.project(tick.position) else {
                        continue;
                    };
                    let (_, py) = chart.backend_coord(&(x_range.start, p));
                    draw_tick(root, [(x0 - tick_len, py), (x0, py)])?;
                    draw_text(root, &tick.label, (x0 - tick_len - gap, py), &style)?;
                }
            }
        }

        let cx = x0 + w as i32 / 2;
        let cy = y0 + h as i32 / 2;
        if let Some(title) = &panel.title {
            let style = geo.text(Pos::new(HPos::Center, VPos::Bottom), false);
            draw_text(root, title, (cx, y0 - gap), &style)?;
        }
        if let Some(caption) = &panel.x_caption {
            let style = geo.text(Pos::new(HPos::Center, VPos::Top), false);
            let y = y1 + tick_len + gap + 2 * geo.font_px as i32;
            draw_text(root, caption, (cx, y), &style)?;
        }
        if let Some(caption) = &panel.y_caption {
            let style = geo.text(Pos::new(HPos::Center, VPos::Bottom), true);
            let x = x0 - tick_len - gap - 4 * geo.font_px as i32;
            draw_text(root, caption, (x, cy), &style)?;
        }
        Ok(())
    }
}

fn diagonal_panel(
    k: usize,
    column: &ColumnSpec,
    values: &[f64],
    axis: &ResolvedAxis,
    n: usize,
    density: bool,
) -> Result<PanelSpec> {
    let heights = marginal_histogram(values, &axis.edges, density)?;
    let bars: Vec<HistogramBar> = axis
        .edges
        .windows(2)
        .zip(&heights)
        .map(|(w, &height)| HistogramBar {
            lo: w[0],
            hi: w[1],
            height,
        })
        .collect();
    let max_height = heights.iter().copied().fold(0.0, f64::max);
    let last_row = k == n - 1;
    Ok(PanelSpec {
        row: k,
        col: k,
        kind: PanelKind::Diagonal,
        x_axis: Some(axis.spec()),
        y_axis: None,
        show_x_ticks: last_row,
        show_y_ticks: false,
        title: Some(column.display_label().to_string()),
        x_caption: last_row.then(|| column.display_label().to_string()),
        y_caption: None,
        content: PanelContent::Histogram { bars, max_height },
    })
}

/// Pixel geometry of one rendering.
struct Geometry {
    panel: i32,
    left: i32,
    right: i32,
    top: i32,
    bottom: i32,
    font_px: f64,
    tick_len: i32,
    marker_radius: i32,
}

impl Geometry {
    fn new(style: &CornerStyle, scale: f64) -> Self {
        // Points to pixels at 100 dpi, then the raster scale.
        let pt = scale * 100.0 / 72.0;
        let font_px = (style.font_size * pt).max(1.0);
        Self {
            panel: ((style.panel_px as f64 * scale).round() as i32).max(1),
            left: (7.0 * font_px).round() as i32,
            right: (2.0 * font_px).round() as i32,
            top: (2.0 * font_px).round() as i32,
            bottom: (5.0 * font_px).round() as i32,
            font_px,
            tick_len: ((3.0 * scale).round() as i32).max(1),
            marker_radius: ((0.5 * style.point_size * pt).round() as i32).max(1),
        }
    }

    fn canvas(&self, n: usize) -> (u32, u32) {
        let n = n as i32;
        (
            (self.left + n * self.panel + self.right) as u32,
            (self.top + n * self.panel + self.bottom) as u32,
        )
    }

    fn text(&self, pos: Pos, rotated: bool) -> TextStyle<'static> {
        let font = ("sans-serif", self.font_px).into_font();
        let font = if rotated {
            font.transform(FontTransform::Rotate270)
        } else {
            font
        };
        font.color(&BLACK).pos(pos)
    }
}

fn projected_range(axis: &AxisSpec) -> Result<Range<f64>> {
    let (lo, hi) = axis.limits;
    match (axis.scale.project(lo), axis.scale.project(hi)) {
        (Some(lo), Some(hi)) if lo < hi => Ok(lo..hi),
        _ => Err(AnalysisError::NumericalDomain(format!(
            "axis limits [{lo}, {hi}] cannot be shown on a {:?} scale",
            axis.scale
        ))),
    }
}

fn draw_tick<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, ends: [(i32, i32); 2]) -> Result<()> {
    root.draw(&PathElement::new(ends.to_vec(), BLACK.stroke_width(1)))
        .map_err(render_err)
}

fn draw_text<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    text: &str,
    at: (i32, i32),
    style: &TextStyle<'static>,
) -> Result<()> {
    root.draw(&Text::new(text.to_string(), at, style.clone()))
        .map_err(render_err)
}

fn render_err(err: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::Render(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trials::TableSchema;

    fn table(rows: &[[f64; 3]]) -> ParameterTrialTable {
        let columns = vec![
            ColumnSpec::new("a", "A", false),
            ColumnSpec::new("b", "B", true),
            ColumnSpec::new("c", "C", false),
        ];
        let schema = TableSchema::new(columns, 0, false).unwrap();
        let mut t = ParameterTrialTable::empty(schema);
        for r in rows {
            t.push_row(r.to_vec()).unwrap();
        }
        t
    }

    fn sample_table() -> ParameterTrialTable {
        let rows: Vec<[f64; 3]> = (0..40)
            .map(|i| {
                let t = i as f64;
                [t * 0.25, 1.0 + (t * 0.37).sin().abs() * 100.0, (t * 0.7).cos()]
            })
            .collect();
        table(&rows)
    }

    #[test]
    fn classify_splits_the_grid() {
        assert_eq!(PanelKind::classify(0, 1), PanelKind::Hidden);
        assert_eq!(PanelKind::classify(2, 2), PanelKind::Diagonal);
        assert_eq!(PanelKind::classify(2, 0), PanelKind::OffDiagonal);
    }

    #[test]
    fn ticks_only_on_outer_panels() {
        let t = sample_table();
        let layout =
            CornerPlotLayout::build(&t, t.schema().columns(), &CornerStyle::default()).unwrap();
        assert_eq!(layout.n(), 3);
        for p in layout.panels() {
            match p.kind {
                PanelKind::Hidden => {
                    assert!(p.x_axis.is_none() && !p.show_x_ticks && !p.show_y_ticks)
                }
                PanelKind::Diagonal => {
                    assert_eq!(p.show_x_ticks, p.row == 2);
                    assert!(!p.show_y_ticks);
                    assert!(p.title.is_some());
                }
                PanelKind::OffDiagonal => {
                    assert_eq!(p.show_x_ticks, p.row == 2);
                    assert_eq!(p.show_y_ticks, p.col == 0);
                }
            }
        }
        assert_eq!(layout.panel(2, 0).y_caption.as_deref(), Some("C"));
        assert_eq!(layout.panel(2, 1).x_caption.as_deref(), Some("B"));
    }

    #[test]
    fn bottom_right_histogram_carries_x_ticks_and_caption() {
        let t = sample_table();
        let layout =
            CornerPlotLayout::build(&t, t.schema().columns(), &CornerStyle::default()).unwrap();
        let corner = layout.panel(2, 2);
        assert_eq!(corner.kind, PanelKind::Diagonal);
        assert!(corner.show_x_ticks);
        assert_eq!(corner.x_caption.as_deref(), Some("C"));
        assert_eq!(corner.x_axis.as_ref().map(|a| a.ticks.len()), Some(4));
        // Upper diagonals share their column's x axis but stay unlabelled.
        assert!(!layout.panel(1, 1).show_x_ticks);
        assert!(layout.panel(1, 1).x_caption.is_none());
    }

    #[test]
    fn scatter_points_are_in_ascending_density() {
        let t = sample_table();
        let layout =
            CornerPlotLayout::build(&t, t.schema().columns(), &CornerStyle::default()).unwrap();
        let d = layout.panel(1, 0).draw_densities();
        assert_eq!(d.len(), 40);
        assert!(d.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn single_parameter_is_degenerate() {
        let t = sample_table();
        let err = CornerPlotLayout::build(&t, &t.schema().columns()[..1], &CornerStyle::default())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::DegenerateInput { .. }));
    }

    #[test]
    fn constant_column_fails_before_any_panel() {
        let rows: Vec<[f64; 3]> = (0..10).map(|i| [i as f64, 1.0 + i as f64, 4.0]).collect();
        let t = table(&rows);
        let err = CornerPlotLayout::build(&t, t.schema().columns(), &CornerStyle::default())
            .unwrap_err();
        match err {
            AnalysisError::BinCollapse { what, .. } => assert!(what.starts_with("c ")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn canvas_scales_with_dpi() {
        let t = sample_table();
        let layout =
            CornerPlotLayout::build(&t, t.schema().columns(), &CornerStyle::default()).unwrap();
        let (w1, h1) = layout.canvas_size(1.0);
        let (w3, h3) = layout.canvas_size(3.0);
        assert!(w1 > 3 * 120 && h1 > 3 * 120);
        assert!(w3 > 2 * w1 && h3 > 2 * h1);
    }
}
