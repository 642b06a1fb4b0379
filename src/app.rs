//! Live waveform window: egui/eframe application.
//!
//! [`ScopeApp`] owns the [`RenderDriver`] and runs it from `update`: when a
//! tick is due it performs one blocking chunk read, then paints the latest
//! frame as a single polyline over the fixed amplitude range.  Repaints are
//! requested for the next tick, so the window keeps redrawing on its own.
//!
//! Closing the window stops the capture session.  A capture fault also closes
//! the window; the fault text is left in the shared [`FaultSlot`] so `main`
//! can choose the exit status.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use eframe::egui;

use crate::audio::{AmplitudeFrame, WaveformView};
use crate::config::UiConfig;
use crate::pipeline::RenderDriver;

/// Window title, also used as the plot heading.
pub const WINDOW_TITLE: &str = "Live Loopback Waveform";

/// Where the window records the fault that ended the session, if any.
pub type FaultSlot = Rc<RefCell<Option<String>>>;

const WAVE_COLOR: egui::Color32 = egui::Color32::from_rgb(80, 200, 120);
const CLIP_COLOR: egui::Color32 = egui::Color32::from_rgb(255, 68, 68);
const AXIS_COLOR: egui::Color32 = egui::Color32::from_rgb(110, 110, 110);
const ZERO_COLOR: egui::Color32 = egui::Color32::from_rgb(60, 60, 60);
const LABEL_COLOR: egui::Color32 = egui::Color32::from_rgb(160, 160, 160);

/// Space reserved around the plot for tick labels and axis titles.
const MARGIN_LEFT: f32 = 56.0;
const MARGIN_RIGHT: f32 = 12.0;
const MARGIN_TOP: f32 = 20.0;
const MARGIN_BOTTOM: f32 = 30.0;

// ---------------------------------------------------------------------------
// ScopeApp
// ---------------------------------------------------------------------------

pub struct ScopeApp {
    driver: RenderDriver,
    view: WaveformView,
    line_width: f32,
    fault: FaultSlot,
}

impl ScopeApp {
    pub fn new(driver: RenderDriver, ui: &UiConfig, fault: FaultSlot) -> Self {
        let view = WaveformView::new(driver.chunk_size());
        Self {
            driver,
            view,
            line_width: ui.line_width,
            fault,
        }
    }

    /// Run one driver tick if it is due.  A failed tick ends the session.
    ///
    /// Returns `false` once the driver has stopped.
    fn advance(&mut self, now: Instant) -> bool {
        if !self.driver.is_due(now) {
            return self.driver.is_running();
        }
        if let Err(e) = self.driver.tick_at(now) {
            log::error!("capture failed: {e}");
            *self.fault.borrow_mut() = Some(e.to_string());
            if let Err(close_err) = self.driver.shutdown() {
                log::warn!("error while stopping capture: {close_err}");
            }
            return false;
        }
        true
    }

    // ── Status strip ──────────────────────────────────────────────────────

    fn draw_status(&self, ui: &mut egui::Ui) {
        let device = self.driver.device();
        let format = self.driver.format();
        let stats = self.driver.stats();
        let frame = self.driver.frame();

        ui.horizontal(|ui| {
            ui.label(
                egui::RichText::new(format!(
                    "device {} · {} ch · {} Hz · {} frames/chunk",
                    device.index, device.channel_count, format.sample_rate, format.chunk_frames
                ))
                .color(LABEL_COLOR),
            );
            ui.separator();
            ui.label(
                egui::RichText::new(format!(
                    "overflows {} · short reads {}",
                    stats.overflowed, stats.truncated
                ))
                .color(LABEL_COLOR),
            );
            ui.separator();
            ui.label(egui::RichText::new(format!("peak {}", frame.peak())).color(LABEL_COLOR));
            if frame.is_clipping() {
                ui.label(egui::RichText::new("CLIP").color(CLIP_COLOR).strong());
            }
        });
    }

    // ── Plot ──────────────────────────────────────────────────────────────

    fn draw_plot(&self, ui: &mut egui::Ui) {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::hover());
        let plot = plot_rect(response.rect);
        let font = egui::FontId::proportional(12.0);

        // Axes
        let axis = egui::Stroke::new(1.0, AXIS_COLOR);
        painter.line_segment([plot.left_top(), plot.left_bottom()], axis);
        painter.line_segment([plot.left_bottom(), plot.right_bottom()], axis);

        // Zero line
        let zero_y = screen_y(plot, WaveformView::y(0));
        painter.line_segment(
            [egui::pos2(plot.left(), zero_y), egui::pos2(plot.right(), zero_y)],
            egui::Stroke::new(1.0, ZERO_COLOR),
        );

        // Y ticks
        for value in [i16::MAX, 0, i16::MIN] {
            painter.text(
                egui::pos2(plot.left() - 6.0, screen_y(plot, WaveformView::y(value))),
                egui::Align2::RIGHT_CENTER,
                value,
                font.clone(),
                LABEL_COLOR,
            );
        }

        // X ticks
        painter.text(
            plot.left_bottom() + egui::vec2(0.0, 4.0),
            egui::Align2::LEFT_TOP,
            0,
            font.clone(),
            LABEL_COLOR,
        );
        painter.text(
            plot.right_bottom() + egui::vec2(0.0, 4.0),
            egui::Align2::RIGHT_TOP,
            self.view.chunk_size(),
            font.clone(),
            LABEL_COLOR,
        );

        // Axis titles
        painter.text(
            egui::pos2(plot.center().x, plot.bottom() + 4.0),
            egui::Align2::CENTER_TOP,
            "Sample",
            font.clone(),
            LABEL_COLOR,
        );
        painter.text(
            plot.left_top() - egui::vec2(0.0, 4.0),
            egui::Align2::LEFT_BOTTOM,
            "Amplitude",
            font,
            LABEL_COLOR,
        );

        let points = plot_points(plot, &self.view, self.driver.frame());
        painter.add(egui::Shape::line(
            points,
            egui::Stroke::new(self.line_width, WAVE_COLOR),
        ));
    }
}

// ---------------------------------------------------------------------------
// Geometry helpers
// ---------------------------------------------------------------------------

/// Inner plot area of the painter rect, leaving room for labels.
fn plot_rect(outer: egui::Rect) -> egui::Rect {
    egui::Rect::from_min_max(
        outer.min + egui::vec2(MARGIN_LEFT, MARGIN_TOP),
        outer.max - egui::vec2(MARGIN_RIGHT, MARGIN_BOTTOM),
    )
}

/// Unit-square `y` (0 at the bottom) to screen `y` (grows downward).
fn screen_y(plot: egui::Rect, y: f32) -> f32 {
    plot.bottom() - y * plot.height()
}

/// Screen positions of every sample in `frame`.
fn plot_points(plot: egui::Rect, view: &WaveformView, frame: &AmplitudeFrame) -> Vec<egui::Pos2> {
    view.normalized(frame)
        .into_iter()
        .map(|(x, y)| egui::pos2(plot.left() + x * plot.width(), screen_y(plot, y)))
        .collect()
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for ScopeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        if self.advance(now) {
            ctx.request_repaint_after(self.driver.until_next(Instant::now()));
        } else {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| self.draw_status(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.heading(WINDOW_TITLE);
            });
            self.draw_plot(ui);
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Err(e) = self.driver.shutdown() {
            log::warn!("error while stopping capture: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::fake::FakeHost;
    use crate::audio::{CaptureOptions, CaptureSession, SelectedDevice};
    use crate::pipeline::TICK_INTERVAL;

    fn app(host: &FakeHost, chunk_size: usize) -> (ScopeApp, FaultSlot) {
        let options = CaptureOptions {
            chunk_size,
            ..CaptureOptions::default()
        };
        let device = SelectedDevice {
            index: 0,
            channel_count: 2,
        };
        let session = CaptureSession::open(host, device, &options).unwrap();
        let fault = FaultSlot::default();
        let app = ScopeApp::new(
            RenderDriver::new(session, TICK_INTERVAL),
            &UiConfig::default(),
            Rc::clone(&fault),
        );
        (app, fault)
    }

    #[test]
    fn plot_points_span_the_plot_rect() {
        let plot = egui::Rect::from_min_size(egui::pos2(10.0, 20.0), egui::vec2(300.0, 100.0));
        let view = WaveformView::new(4);
        let frame = AmplitudeFrame {
            samples: vec![i16::MIN, 0, i16::MAX, 0],
        };

        let points = plot_points(plot, &view, &frame);
        assert_eq!(points.len(), 4);
        assert_eq!(points[0], egui::pos2(10.0, 120.0));
        assert_eq!(points[2].y, 20.0);
        assert!(points.windows(2).all(|w| w[0].x < w[1].x));
        assert!(points.iter().all(|p| plot.expand(0.01).contains(*p)));
    }

    #[test]
    fn plot_rect_leaves_label_margins() {
        let outer = egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(900.0, 360.0));
        let plot = plot_rect(outer);
        assert!(outer.contains_rect(plot));
        assert_eq!(plot.left(), MARGIN_LEFT);
        assert_eq!(plot.bottom(), 360.0 - MARGIN_BOTTOM);
    }

    #[test]
    fn advance_reads_one_chunk_when_due() {
        let host = FakeHost::new(&[("Stereo Mix", 2)])
            .with_chunks(vec![FakeHost::full_chunk(4, 2, 1000)]);
        let (mut app, fault) = app(&host, 4);
        let now = Instant::now();

        assert!(app.advance(now));
        assert!(app.advance(now)); // not due again yet
        assert_eq!(app.driver.stats().ticks, 1);
        assert_eq!(app.driver.frame().peak(), 1000);
        assert!(fault.borrow().is_none());
    }

    #[test]
    fn capture_fault_is_recorded_and_session_closed() {
        let host = FakeHost::new(&[("Stereo Mix", 2)]); // empty script
        let (mut app, fault) = app(&host, 4);

        assert!(!app.advance(Instant::now()));
        assert!(fault.borrow().is_some());
        assert!(!app.driver.is_running());
        assert_eq!(host.events(), vec!["stop", "release"]);
    }
}
