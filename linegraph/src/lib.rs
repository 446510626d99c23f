use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};

use std::collections::BTreeMap;
use std::error::Error;
use std::path::Path;
use std::sync::OnceLock;

mod scales;

pub use scales::*;

pub use plotters::style::RGBColor;

macro_rules! hexcolour {
    ($colour:literal) => {
        RGBColor(
            (($colour & 0xFF0000) >> 16) as u8,
            (($colour & 0x00FF00) >> 8) as u8,
            ($colour & 0x0000FF) as u8,
        )
    };
}

/// Ten colour colour-blind safe palette, used while the labels fit.
pub const COLOURS: &[RGBColor] = &[
    hexcolour!(0x0173B2),
    hexcolour!(0xDE8F05),
    hexcolour!(0x029E73),
    hexcolour!(0xD55E00),
    hexcolour!(0xCC78BC),
    hexcolour!(0xCA9161),
    hexcolour!(0xFBAFE4),
    hexcolour!(0x949494),
    hexcolour!(0xECE133),
    hexcolour!(0x56B4E9),
];

/// Twenty colour categorical palette for larger label sets.
pub const WIDE_COLOURS: &[RGBColor] = &[
    hexcolour!(0x1F77B4),
    hexcolour!(0xAEC7E8),
    hexcolour!(0xFF7F0E),
    hexcolour!(0xFFBB78),
    hexcolour!(0x2CA02C),
    hexcolour!(0x98DF8A),
    hexcolour!(0xD62728),
    hexcolour!(0xFF9896),
    hexcolour!(0x9467BD),
    hexcolour!(0xC5B0D5),
    hexcolour!(0x8C564B),
    hexcolour!(0xC49C94),
    hexcolour!(0xE377C2),
    hexcolour!(0xF7B6D2),
    hexcolour!(0x7F7F7F),
    hexcolour!(0xC7C7C7),
    hexcolour!(0xBCBD22),
    hexcolour!(0xDBDB8D),
    hexcolour!(0x17BECF),
    hexcolour!(0x9EDAE5),
];

const FONT: &str = "sans-serif";

static FONTS: OnceLock<bool> = OnceLock::new();

/// Registers the embedded DejaVu face under the family used by every chart.
/// Rendering does not depend on fonts installed on the host.
fn register_fonts() -> Result<(), Box<dyn Error>> {
    let registered = *FONTS.get_or_init(|| {
        let bytes: &'static [u8] = dejavu::sans_mono::regular();
        register_font(FONT, FontStyle::Normal, bytes).is_ok()
            && register_font(FONT, FontStyle::Bold, bytes).is_ok()
    });
    if registered {
        Ok(())
    } else {
        Err("failed to register the embedded chart font".into())
    }
}

/// Compact magnitude for point annotations: `1.50k`, `2.50M`, `42.0`.
pub fn human_fmt(x: f64) -> String {
    if x == 0.0 {
        return "0".to_owned();
    }
    let abs = x.abs();
    if abs >= 1_000_000.0 {
        format!("{:.2}M", x / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("{:.2}k", x / 1_000.0)
    } else if abs >= 100.0 {
        format!("{:.0}", x)
    } else if abs >= 10.0 {
        format!("{:.1}", x)
    } else {
        format!("{:.2}", x)
    }
}

/// A stable label to colour assignment.
///
/// Labels are sorted before colours are handed out, so the same label set
/// always gets the same colours regardless of the order they were seen in.
#[derive(Clone, Debug)]
pub struct ColourMap {
    colours: BTreeMap<String, RGBColor>,
}

impl ColourMap {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut labels: Vec<String> = labels
            .into_iter()
            .map(|l| l.as_ref().to_owned())
            .collect();
        labels.sort();
        labels.dedup();

        let palette = if labels.len() > COLOURS.len() {
            WIDE_COLOURS
        } else {
            COLOURS
        };

        let colours = labels
            .into_iter()
            .zip(palette.iter().cycle().copied())
            .collect();

        Self { colours }
    }

    pub fn get(&self, label: &str) -> RGBColor {
        self.colours.get(label).copied().unwrap_or(BLACK)
    }

    pub fn len(&self) -> usize {
        self.colours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colours.is_empty()
    }
}

/// One line of a chart: a label, its colour and `(concurrency, value)` points.
#[derive(Clone, Debug)]
pub struct Series {
    pub label: String,
    pub colour: RGBColor,
    pub points: Vec<(f64, f64)>,
}

impl Series {
    /// Builds a series, sorting points by ascending x.
    pub fn new(label: impl Into<String>, colour: RGBColor, mut points: Vec<(f64, f64)>) -> Self {
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self {
            label: label.into(),
            colour,
            points,
        }
    }

    pub fn last(&self) -> Option<(f64, f64)> {
        self.points.last().copied()
    }
}

/// Settings for a single concurrency line chart.
pub struct PlotConfig {
    caption: String,
    x_desc: String,
    y_desc: String,
    size: (u32, u32),
    caption_size: u32,
    label_size: u32,
    annotation_size: u32,
    line_width: u32,
    marker_size: u32,
    logx: bool,
    legend_columns: usize,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PlotConfig {
    pub fn new() -> Self {
        Self {
            caption: String::new(),
            x_desc: "Concurrency".to_owned(),
            y_desc: String::new(),
            size: (2024, 1188),
            caption_size: 40,
            label_size: 22,
            annotation_size: 20,
            line_width: 3,
            marker_size: 6,
            logx: false,
            legend_columns: 1,
        }
    }

    /// Settings suited to a small panel inside a grid.
    pub fn panel() -> Self {
        Self {
            caption_size: 26,
            label_size: 16,
            annotation_size: 15,
            line_width: 2,
            marker_size: 4,
            legend_columns: 0,
            ..Self::new()
        }
    }

    pub fn caption(&mut self, caption: impl AsRef<str>) -> &mut Self {
        self.caption = caption.as_ref().to_owned();
        self
    }

    pub fn y_desc(&mut self, y_desc: impl AsRef<str>) -> &mut Self {
        self.y_desc = y_desc.as_ref().to_owned();
        self
    }

    pub fn size(&mut self, size: (u32, u32)) -> &mut Self {
        self.size = size;
        self
    }

    pub fn logx(&mut self, logx: bool) -> &mut Self {
        self.logx = logx;
        self
    }

    /// Columns of the legend drawn in the upper left of the chart. Zero
    /// leaves the legend out.
    pub fn legend_columns(&mut self, columns: usize) -> &mut Self {
        self.legend_columns = columns;
        self
    }

    /// Renders the series to a PNG file.
    pub fn plot(&self, filename: impl AsRef<Path>, series: &[Series]) -> Result<(), Box<dyn Error>> {
        register_fonts()?;

        let root = BitMapBackend::new(filename.as_ref(), self.size).into_drawing_area();
        root.fill(&WHITE)?;
        self.draw(&root, series)?;
        root.present()?;

        Ok(())
    }

    /// Draws the series onto an existing drawing area.
    pub fn draw(
        &self,
        area: &DrawingArea<BitMapBackend<'_>, Shift>,
        series: &[Series],
    ) -> Result<(), Box<dyn Error>> {
        register_fonts()?;

        let series: Vec<Series> = series
            .iter()
            .map(|s| Series {
                label: s.label.clone(),
                colour: s.colour,
                points: s
                    .points
                    .iter()
                    .copied()
                    .filter(|(x, y)| x.is_finite() && y.is_finite() && (!self.logx || *x > 0.0))
                    .collect(),
            })
            .filter(|s| !s.points.is_empty())
            .collect();

        let xs: Vec<f64> = series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.0))
            .collect();
        let x_axis = ConcurrencyAxis::new(&xs, self.logx);
        let y_range = value_range(series.iter().flat_map(|s| s.points.iter().map(|p| p.1)));

        let mut chart = ChartBuilder::on(area)
            .caption(&self.caption, (FONT, self.caption_size))
            .margin(20)
            .set_label_area_size(LabelAreaPosition::Left, (self.label_size * 5) as i32)
            .set_label_area_size(LabelAreaPosition::Bottom, (self.label_size * 3) as i32)
            .build_cartesian_2d(x_axis, y_range)?;

        chart
            .configure_mesh()
            .x_desc(&self.x_desc)
            .y_desc(&self.y_desc)
            .x_label_formatter(&|x| concurrency_label(*x))
            .y_label_formatter(&|y| human_fmt(*y))
            .label_style((FONT, self.label_size))
            .axis_desc_style((FONT, self.label_size))
            .light_line_style(WHITE.mix(0.0))
            .bold_line_style(BLACK.mix(0.15))
            .draw()?;

        for s in &series {
            let colour = s.colour;
            let line_width = self.line_width;

            chart.draw_series(LineSeries::new(
                s.points.iter().copied(),
                colour.stroke_width(line_width),
            ))?;

            let marker_size = self.marker_size as i32;
            chart.draw_series(
                s.points
                    .iter()
                    .map(|&p| Circle::new(p, marker_size, colour.filled())),
            )?;

            if let Some(last) = s.last() {
                let offset = (self.marker_size as i32 + 2, -(self.annotation_size as i32) - 2);
                let style = (FONT, self.annotation_size).into_font().color(&colour);
                chart.draw_series(std::iter::once(
                    EmptyElement::at(last) + Text::new(human_fmt(last.1), offset, style),
                ))?;
            }
        }

        if self.legend_columns > 0 && !series.is_empty() {
            let entries: Vec<(String, RGBColor)> = series
                .iter()
                .map(|s| (s.label.clone(), s.colour))
                .collect();
            let area = chart.plotting_area().strip_coord_spec();
            draw_legend(
                &area,
                &entries,
                self.legend_columns,
                self.label_size,
                Anchor::UpperLeft,
            )?;
        }

        Ok(())
    }
}

/// y range covering the values with a small margin on both sides.
fn value_range<I: Iterator<Item = f64>>(values: I) -> std::ops::Range<f64> {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    let span = max - min;
    let pad = if span > 0.0 {
        span * 0.08
    } else if min != 0.0 {
        min.abs() * 0.1
    } else {
        1.0
    };
    (min - pad)..(max + pad)
}

/// One panel of a grid: its settings and the lines to draw.
pub struct Panel {
    pub config: PlotConfig,
    pub series: Vec<Series>,
}

/// Settings for a multi-panel figure with a shared legend underneath.
pub struct GridConfig {
    caption: String,
    rows: usize,
    cols: usize,
    size: (u32, u32),
    legend_columns: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self::new(2, 4)
    }
}

impl GridConfig {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            caption: String::new(),
            rows,
            cols,
            size: (3200, 1600),
            legend_columns: 4,
        }
    }

    pub fn caption(&mut self, caption: impl AsRef<str>) -> &mut Self {
        self.caption = caption.as_ref().to_owned();
        self
    }

    pub fn size(&mut self, size: (u32, u32)) -> &mut Self {
        self.size = size;
        self
    }

    pub fn legend_columns(&mut self, columns: usize) -> &mut Self {
        self.legend_columns = columns.max(1);
        self
    }

    /// Renders up to `rows * cols` panels row by row. Cells without a panel
    /// stay blank. `legend` is drawn once, centred below the grid.
    pub fn plot(
        &self,
        filename: impl AsRef<Path>,
        panels: &[Panel],
        legend: &[(String, RGBColor)],
    ) -> Result<(), Box<dyn Error>> {
        register_fonts()?;

        let root = BitMapBackend::new(filename.as_ref(), self.size).into_drawing_area();
        root.fill(&WHITE)?;

        let body = root.titled(&self.caption, (FONT, 44))?;

        let legend_height = if legend.is_empty() {
            0
        } else {
            legend_size(legend, self.legend_columns, GRID_LEGEND_FONT_SIZE).1 + 40
        };
        let (_, body_height) = body.dim_in_pixel();
        let (grid, footer) = body.split_vertically((body_height as i32 - legend_height).max(0));

        let cells = grid.split_evenly((self.rows, self.cols));
        for (cell, panel) in cells.iter().zip(panels.iter()) {
            panel.config.draw(cell, &panel.series)?;
        }

        if !legend.is_empty() {
            draw_legend(
                &footer,
                legend,
                self.legend_columns,
                GRID_LEGEND_FONT_SIZE,
                Anchor::Centre,
            )?;
        }

        root.present()?;

        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Anchor {
    Centre,
    UpperLeft,
}

const GRID_LEGEND_FONT_SIZE: u32 = 22;

/// Pixel size of a legend box. Glyph advance is estimated at three fifths of
/// the font size, which holds for the monospace face.
fn legend_size(entries: &[(String, RGBColor)], columns: usize, font_size: u32) -> (i32, i32) {
    let columns = columns.min(entries.len()).max(1);
    let rows = ((entries.len() + columns - 1) / columns) as i32;
    let size = font_size as i32;
    let longest = entries
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0) as i32;

    let column_width = size * 2 + longest * size * 3 / 5 + size;
    let row_height = size * 8 / 5;
    (
        column_width * columns as i32 + size,
        row_height * rows + size / 2,
    )
}

fn draw_legend(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    entries: &[(String, RGBColor)],
    columns: usize,
    font_size: u32,
    anchor: Anchor,
) -> Result<(), Box<dyn Error>> {
    let columns = columns.min(entries.len()).max(1);
    let size = font_size as i32;
    let (box_width, box_height) = legend_size(entries, columns, font_size);
    let column_width = (box_width - size) / columns as i32;
    let row_height = size * 8 / 5;

    let (left, top) = match anchor {
        Anchor::Centre => {
            let (width, height) = area.dim_in_pixel();
            (
                (width as i32 - box_width) / 2,
                (height as i32 - box_height) / 2,
            )
        }
        Anchor::UpperLeft => (size / 2, size / 2),
    };

    area.draw(&Rectangle::new(
        [(left, top), (left + box_width, top + box_height)],
        WHITE.mix(0.9).filled(),
    ))?;
    area.draw(&Rectangle::new(
        [(left, top), (left + box_width, top + box_height)],
        BLACK.mix(0.4),
    ))?;

    for (i, (label, colour)) in entries.iter().enumerate() {
        let x = left + size / 2 + column_width * (i % columns) as i32;
        let y = top + size / 4 + row_height * (i / columns) as i32 + row_height / 2;
        area.draw(&PathElement::new(
            vec![(x, y), (x + size * 3 / 2, y)],
            colour.stroke_width(4),
        ))?;
        area.draw(&Text::new(
            label.as_str(),
            (x + size * 2, y - size / 2),
            (FONT, font_size).into_font(),
        ))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_fmt_thresholds() {
        assert_eq!(human_fmt(0.0), "0");
        assert_eq!(human_fmt(999.0), "999");
        assert_eq!(human_fmt(1500.0), "1.50k");
        assert_eq!(human_fmt(2_500_000.0), "2.50M");
        assert_eq!(human_fmt(42.25), "42.2");
        assert_eq!(human_fmt(0.4213), "0.42");
        assert_eq!(human_fmt(-1500.0), "-1.50k");
    }

    #[test]
    fn colour_map_is_stable() {
        let a = ColourMap::new(vec!["b", "a", "c"]);
        let b = ColourMap::new(vec!["c", "b", "a", "a"]);
        assert_eq!(a.len(), 3);
        for label in &["a", "b", "c"] {
            assert_eq!(a.get(label), b.get(label));
        }
        assert_eq!(a.get("a"), COLOURS[0]);
        assert_eq!(a.get("c"), COLOURS[2]);
    }

    #[test]
    fn colour_map_widens_palette() {
        let labels: Vec<String> = (0..12).map(|i| format!("label-{:02}", i)).collect();
        let map = ColourMap::new(&labels);
        assert_eq!(map.get("label-00"), WIDE_COLOURS[0]);
        assert_eq!(map.get("label-11"), WIDE_COLOURS[11]);
    }

    #[test]
    fn colour_map_cycles() {
        let labels: Vec<String> = (0..25).map(|i| format!("label-{:02}", i)).collect();
        let map = ColourMap::new(&labels);
        assert_eq!(map.get("label-20"), WIDE_COLOURS[0]);
    }

    #[test]
    fn series_sorted_by_concurrency() {
        let s = Series::new("x", COLOURS[0], vec![(8.0, 3.0), (1.0, 1.0), (4.0, 2.0)]);
        assert_eq!(s.points, vec![(1.0, 1.0), (4.0, 2.0), (8.0, 3.0)]);
        assert_eq!(s.last(), Some((8.0, 3.0)));
    }

    #[test]
    fn value_range_pads() {
        let r = value_range(vec![1.0, 2.0].into_iter());
        assert!(r.start < 1.0 && r.end > 2.0);
        let r = value_range(vec![5.0].into_iter());
        assert!(r.start < 5.0 && r.end > 5.0);
        let r = value_range(std::iter::empty());
        assert_eq!(r, 0.0..1.0);
    }

    #[test]
    fn plot_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.png");
        let series = vec![
            Series::new("a", COLOURS[0], vec![(1.0, 0.5), (2.0, 0.7), (4.0, 1.2)]),
            Series::new("b", COLOURS[1], vec![(1.0, 0.4), (4.0, 0.9)]),
        ];
        PlotConfig::new()
            .caption("latency")
            .y_desc("seconds")
            .size((640, 480))
            .logx(true)
            .plot(&path, &series)
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn grid_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.png");
        let mut config = PlotConfig::panel();
        config.caption("panel");
        let panels = vec![Panel {
            config,
            series: vec![Series::new("a", COLOURS[0], vec![(1.0, 1.0), (2.0, 3.0)])],
        }];
        GridConfig::new(2, 4)
            .caption("overview")
            .size((1600, 800))
            .plot(&path, &panels, &[("a".to_owned(), COLOURS[0])])
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn legend_columns_fold_rows() {
        let entries: Vec<(String, RGBColor)> = (0..10)
            .map(|i| (format!("label-{}", i), COLOURS[i]))
            .collect();
        let (one_wide, one_high) = legend_size(&entries, 1, 20);
        let (two_wide, two_high) = legend_size(&entries, 2, 20);
        assert!(two_wide > one_wide);
        assert!(two_high < one_high);
        // more columns than entries collapses to one row
        assert_eq!(legend_size(&entries[..2], 4, 20), legend_size(&entries[..2], 2, 20));
    }

    #[test]
    fn plot_with_two_column_legend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.png");
        let series: Vec<Series> = (0..12)
            .map(|i| {
                Series::new(
                    format!("variant-{}", i),
                    WIDE_COLOURS[i],
                    vec![(1.0, i as f64), (2.0, i as f64 + 1.0)],
                )
            })
            .collect();
        PlotConfig::new()
            .caption("throughput")
            .size((800, 600))
            .legend_columns(2)
            .plot(&path, &series)
            .unwrap();
        assert!(path.exists());
    }
}
