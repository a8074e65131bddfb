use std::path::PathBuf;

use rand::{Rng, SeedableRng, rngs::StdRng};

use fakeit_corner::core::axis::{self, AxisScale, TICK_CANDIDATES, interior_ticks, scientific_label};
use fakeit_corner::core::density::DensityGridEstimator;
use fakeit_corner::plot::corner::{CornerPlotLayout, CornerStyle, PanelContent, PanelKind};
use fakeit_corner::trials::{AnalysisId, ColumnSpec, ParameterTrialTable, TableSchema};

fn unique_dir(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!(
        "fakeit_corner_plot_{}_{}",
        name,
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    path
}

/// chisq, dof, then three plotted parameters; `norm` is log-scaled.
fn synthetic_table(seed: u64, rows: usize) -> ParameterTrialTable {
    let schema = TableSchema::new(
        vec![
            ColumnSpec::new("chisq", "", false),
            ColumnSpec::new("dof", "", false),
            ColumnSpec::new("kt", "kT", false),
            ColumnSpec::new("norm", "N", true),
            ColumnSpec::new("tau", "", false),
        ],
        2,
        false,
    )
    .unwrap();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut table = ParameterTrialTable::empty(schema);
    for _ in 0..rows {
        let kt: f64 = rng.random_range(0.5..3.0);
        let norm = 10f64.powf(rng.random_range(-4.0..-1.0));
        let tau = kt * 2.0 + rng.random_range(-0.3..0.3);
        table
            .push_row(vec![rng.random_range(90.0..110.0), 100.0, kt, norm, tau])
            .unwrap();
    }
    table
}

#[test]
fn scientific_labels_hide_zero_exponent() {
    assert_eq!(scientific_label(1000.0), "1·10^3");
    assert_eq!(scientific_label(1.0), "1");
}

#[test]
fn four_interior_ticks_in_both_modes() {
    for (lo, hi) in [(0.0, 1.0), (1e-3, 1e2), (2.0, 7.5)] {
        for scale in [AxisScale::Linear, AxisScale::Log] {
            if scale == AxisScale::Log && lo <= 0.0 {
                continue;
            }
            let candidates = scale.spaced(lo, hi, TICK_CANDIDATES);
            let ticks = interior_ticks(lo, hi, scale);
            assert_eq!(ticks.len(), 4);
            assert_eq!(ticks, candidates[1..5].to_vec());
            assert!(ticks.iter().all(|&t| t > lo && t < hi));
        }
    }
}

#[test]
fn nan_pair_is_dropped_from_density_estimate() {
    let x = [0.1, f64::NAN, 0.4, 0.8, 0.9, 0.35];
    let y = [1.0, 2.0, 1.5, 1.2, 1.9, 1.1];
    let x_axis = axis::resolve(&x, false, 5).unwrap();
    let y_axis = axis::resolve(&y, false, 5).unwrap();
    let est = DensityGridEstimator::default()
        .estimate(&x, &y, &x_axis.edges, &y_axis.edges)
        .unwrap();
    assert_eq!(est.points.len(), 5);
    assert_eq!(est.point_densities.len(), 5);
    assert!(est.points.iter().all(|(px, _)| !px.is_nan()));
}

#[test]
fn off_diagonal_draw_order_is_ascending() {
    let table = synthetic_table(11, 300);
    let layout =
        CornerPlotLayout::build(&table, table.schema().plotted(), &CornerStyle::default()).unwrap();
    let mut scatter_panels = 0;
    for panel in layout.panels() {
        if panel.kind != PanelKind::OffDiagonal {
            continue;
        }
        scatter_panels += 1;
        let order = panel.draw_densities();
        assert_eq!(order.len(), 300);
        assert!(order.windows(2).all(|w| w[0] <= w[1]), "panel ({}, {})", panel.row, panel.col);
    }
    assert_eq!(scatter_panels, 3);
}

#[test]
fn svg_contains_one_marker_per_scatter_point() {
    let table = synthetic_table(5, 60);
    let layout =
        CornerPlotLayout::build(&table, table.schema().plotted(), &CornerStyle::default()).unwrap();
    let svg = layout.render_svg_string().unwrap();
    let expected: usize = layout.panels().iter().map(|p| p.draw_densities().len()).sum();
    assert_eq!(svg.matches("<circle").count(), expected);
    assert!(svg.contains("kT"));
}

#[test]
fn vector_output_is_bit_identical_across_renders() {
    let table = synthetic_table(23, 120);
    let style = CornerStyle::default();
    let first = CornerPlotLayout::build(&table, table.schema().plotted(), &style)
        .unwrap()
        .render_svg_string()
        .unwrap();
    let second = CornerPlotLayout::build(&table, table.schema().plotted(), &style)
        .unwrap()
        .render_svg_string()
        .unwrap();
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn svg_file_lands_under_analysis_stem() {
    let dir = unique_dir("svg");
    std::fs::create_dir_all(&dir).unwrap();
    let table = synthetic_table(8, 40);
    let layout =
        CornerPlotLayout::build(&table, table.schema().plotted(), &CornerStyle::default()).unwrap();
    let path = dir.join("corner_p1.8_t100_s3.svg");
    layout.render_svg(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("<svg"));
    let _ = std::fs::remove_dir_all(&dir);
}

/// Fill colour of every `<circle>` in document order.
fn circle_fills(svg: &str) -> Vec<(u8, u8, u8)> {
    svg.split("<circle")
        .skip(1)
        .map(|tag| {
            let tag = &tag[..tag.find("/>").unwrap()];
            let start = tag.find("fill=\"#").unwrap() + "fill=\"#".len();
            let hex = &tag[start..start + 6];
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).unwrap();
            (channel(0), channel(2), channel(4))
        })
        .collect()
}

#[test]
fn rendered_markers_follow_ascending_density() {
    let table = synthetic_table(17, 80);
    let style = CornerStyle::default();
    let layout = CornerPlotLayout::build(&table, table.schema().plotted(), &style).unwrap();

    let mut expected = Vec::new();
    for panel in layout.panels() {
        if let PanelContent::Scatter {
            points,
            density_range,
        } = &panel.content
        {
            for p in points {
                let c = style.colormap.normalized(p.density, density_range.0, density_range.1);
                expected.push((c.0, c.1, c.2));
            }
        }
    }

    let rendered = circle_fills(&layout.render_svg_string().unwrap());
    assert_eq!(rendered.len(), 3 * 80);
    assert_eq!(rendered, expected);

    // The last marker of each panel carries the top of the colour scale.
    let top = style.colormap.at(1.0);
    for k in 1..=3 {
        assert_eq!(rendered[k * 80 - 1], (top.0, top.1, top.2));
    }
}

fn png_size(bytes: &[u8]) -> (u32, u32) {
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    assert_eq!(&bytes[12..16], b"IHDR");
    let be = |b: &[u8]| u32::from_be_bytes([b[0], b[1], b[2], b[3]]);
    (be(&bytes[16..20]), be(&bytes[20..24]))
}

#[test]
fn render_writes_raster_and_vector_under_corner_stem() {
    let dir = unique_dir("render");
    let table = synthetic_table(29, 50);
    let style = CornerStyle {
        panel_px: 60,
        ..CornerStyle::default()
    };
    let layout = CornerPlotLayout::build(&table, table.schema().plotted(), &style).unwrap();
    let id = AnalysisId::new("100", "1.8", "3");

    let (png, svg) = layout.render(&dir, &id.corner_stem()).unwrap();
    assert_eq!(png, dir.join("corner_p1.8_t100_s3.png"));
    assert_eq!(svg, dir.join("corner_p1.8_t100_s3.svg"));
    assert!(std::fs::read_to_string(&svg).unwrap().contains("<svg"));

    let bytes = std::fs::read(&png).unwrap();
    let expected = layout.canvas_size(style.dpi as f64 / 100.0);
    assert_eq!(png_size(&bytes), expected);
    assert!(expected.0 > 3 * 60 * 3, "dpi scaling widens the raster");

    let _ = std::fs::remove_dir_all(&dir);
}
