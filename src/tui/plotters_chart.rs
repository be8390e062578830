//! Plotters-powered spectrum panel widget for Ratatui.
//!
//! One widget draws one panel of the stacked view (residuals, experimental or
//! theoretical). Every panel of a frame shares the same x bounds so the cursor
//! and span markers line up vertically.
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// A render-only panel description.
///
/// All series and bounds are computed outside the render call; `render()` only
/// draws.
pub struct SpectrumChart<'a> {
    /// Connected trace (a sampled spectrum, or residuals).
    pub trace: &'a [(f64, f64)],
    /// Vertical sticks from `y = 0` to each point. Negative heights draw
    /// downward.
    pub sticks: &'a [(f64, f64)],
    /// Fitted profile drawn over the trace.
    pub overlay: &'a [(f64, f64)],
    /// Highlighted samples (the pending selection).
    pub marked: &'a [(f64, f64)],
    /// Cursor position.
    pub cursor: Option<f64>,
    /// Anchored or last completed span.
    pub span: Option<(f64, f64)>,
    /// Draw a `y = 0` reference line.
    pub zero_line: bool,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub y_label: &'a str,
    /// Whether this panel is the current selection target.
    pub active: bool,
}

impl<'a> Widget for SpectrumChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to lay out a chart in a tiny area.
        if area.width < 20 || area.height < 4 {
            buf.set_string(
                area.x,
                area.y,
                "Panel too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .set_label_area_size(LabelAreaPosition::Left, 8)
                .set_label_area_size(LabelAreaPosition::Bottom, 2)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            let axis = if self.active { RGBColor(255, 255, 0) } else { WHITE };
            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .y_desc(self.y_label)
                .x_labels(5)
                .y_labels(3)
                .x_label_formatter(&|v| format!("{v:.3}"))
                .y_label_formatter(&|v| format!("{v:.2e}"))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&axis)
                .bold_line_style(&axis)
                .draw()?;

            let trace_color = WHITE;
            let stick_color = RGBColor(0, 255, 255); // cyan
            let fit_color = RGBColor(255, 0, 255); // magenta
            let mark_color = RGBColor(0, 255, 0); // green
            let cursor_color = RGBColor(255, 255, 0); // yellow
            let span_color = RGBColor(255, 128, 0); // orange
            let zero_color = RGBColor(128, 128, 128);

            if self.zero_line && y0 < 0.0 && y1 > 0.0 {
                chart.draw_series(LineSeries::new([(x0, 0.0), (x1, 0.0)], &zero_color))?;
            }

            chart.draw_series(LineSeries::new(self.trace.iter().copied(), &trace_color))?;
            chart.draw_series(
                self.sticks
                    .iter()
                    .map(|&(x, y)| PathElement::new(vec![(x, 0.0), (x, y)], &stick_color)),
            )?;
            if !self.overlay.is_empty() {
                chart.draw_series(LineSeries::new(self.overlay.iter().copied(), &fit_color))?;
            }

            // `Circle` radii are mis-scaled by the ratatui backend; pixels are not.
            chart.draw_series(self.marked.iter().map(|&(x, y)| Pixel::new((x, y), mark_color)))?;

            if let Some((a, b)) = self.span {
                for x in [a, b] {
                    if x >= x0 && x <= x1 {
                        chart.draw_series(std::iter::once(PathElement::new(
                            vec![(x, y0), (x, y1)],
                            &span_color,
                        )))?;
                    }
                }
            }
            if let Some(x) = self.cursor.filter(|x| *x >= x0 && *x <= x1) {
                chart.draw_series(std::iter::once(PathElement::new(vec![(x, y0), (x, y1)], &cursor_color)))?;
            }

            Ok(())
        });

        widget.render(area, buf);
    }
}

/// `[min, max]` of the finite y values, padded by 5% (or `[-1, 1]` when empty
/// or flat). `include_zero` extends the range to contain `y = 0`.
pub fn padded_y_bounds<'p>(series: impl IntoIterator<Item = &'p (f64, f64)>, include_zero: bool) -> [f64; 2] {
    let (mut lo, mut hi) = if include_zero { (0.0_f64, 0.0_f64) } else { (f64::INFINITY, f64::NEG_INFINITY) };
    for &(_, y) in series {
        if y.is_finite() {
            lo = lo.min(y);
            hi = hi.max(y);
        }
    }
    if !(lo.is_finite() && hi.is_finite()) || hi <= lo {
        let mid = if lo.is_finite() { lo } else { 0.0 };
        return [mid - 1.0, mid + 1.0];
    }
    let pad = ((hi - lo) * 0.05).max(1e-12);
    [lo - pad, hi + pad]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_pad_and_include_zero() {
        let pts = [(0.0, 1.0), (1.0, 3.0)];
        let [lo, hi] = padded_y_bounds(&pts, false);
        assert!((lo - 0.9).abs() < 1e-12 && (hi - 3.1).abs() < 1e-12);

        let [lo, hi] = padded_y_bounds(&pts, true);
        assert!((lo + 0.15).abs() < 1e-12 && (hi - 3.15).abs() < 1e-12);
    }

    #[test]
    fn empty_or_flat_series_gets_unit_range() {
        assert_eq!(padded_y_bounds(&[], false), [-1.0, 1.0]);
        assert_eq!(padded_y_bounds(&[(0.0, 2.0), (1.0, 2.0)], false), [1.0, 3.0]);
    }
}
