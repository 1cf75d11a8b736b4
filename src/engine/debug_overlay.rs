// Developer overlay: stats panel, curl guide lines and mesh outlines,
// drawn with egui on top of the pages.

use egui::epaint::Shadow;

use super::layout::ViewMode;
use super::page_turn::{CurlParams, CurlState};


pub struct DebugStats {
    pub fps: u32,
    pub frame_time_avg_ms: f32,
    pub frame_time_min_ms: f32,
    pub frame_time_max_ms: f32,
    pub draw_calls: u32,
    pub resolution: (u32, u32),
    pub page_pixels: (u32, u32),
    pub view_mode: ViewMode,
    pub curl_state: CurlState,
    pub current_index: usize,
    pub page_count: usize,
    /// Front / back vertex counts of the curl slot.
    pub curl_vertices: (usize, usize),
    /// Drop / self shadow strip lengths of the curl slot.
    pub curl_shadows: (usize, usize),
    pub curl_params: Option<CurlParams>,
    /// Time spent in the last `curl()` pass (ms).
    pub curl_ms: f32,
}

/// Curl guide lines, already projected to egui screen points.
///
/// The curl line runs through the anchor perpendicular to the curl
/// direction; the arrow shows the direction scaled by the radius.
/// Toggled with F4.
pub struct CurlGuideDraw {
    pub anchor: egui::Pos2,
    pub line: [egui::Pos2; 2],
    pub direction_tip: egui::Pos2,
    /// End of the curl arc, one arc length behind the anchor.
    pub arc_end: [egui::Pos2; 2],
}

/// Triangle strip edges of one mesh, already projected to egui screen
/// points. Toggled with F5.
pub struct MeshOutlineDraw {
    pub front: Vec<egui::Pos2>,
    pub back: Vec<egui::Pos2>,
}

pub struct DebugOverlay {
    pub visible: bool,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl DebugOverlay {
    pub fn new(
        window: &winit::window::Window,
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let egui_ctx = egui::Context::default();

        // Style: dark, semi-transparent, small monospace white font
        let mut visuals = egui::Visuals::dark();
        visuals.window_fill = egui::Color32::from_rgba_premultiplied(0, 0, 0, 180);
        visuals.window_stroke = egui::Stroke::NONE;
        visuals.window_shadow = Shadow::NONE;
        visuals.override_text_color = Some(egui::Color32::WHITE);
        egui_ctx.set_visuals(visuals);

        let mut style = (*egui_ctx.style()).clone();
        style.override_font_id = Some(egui::FontId::monospace(13.0));
        egui_ctx.set_style(style);

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let egui_renderer = egui_wgpu::Renderer::new(
            device,
            surface_format,
            None,  // no depth
            1,     // msaa samples
            false, // no dithering
        );

        Self {
            visible: false,
            egui_ctx,
            egui_state,
            egui_renderer,
        }
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    pub fn handle_window_event(
        &mut self,
        window: &winit::window::Window,
        event: &winit::event::WindowEvent,
    ) -> egui_winit::EventResponse {
        self.egui_state.on_window_event(window, event)
    }

    /// Render one egui frame covering all optional debug layers:
    ///
    /// - `outlines`: F5 triangle strip edges per mesh (`None` = hidden).
    /// - `guides`  : F4 curl line, arc end and direction (`None` = hidden).
    /// - `stats`   : F3 stats panel (`None` = hidden).
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        window: &winit::window::Window,
        view: &wgpu::TextureView,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
        stats: Option<&DebugStats>,
        guides: Option<&CurlGuideDraw>,
        outlines: Option<&[MeshOutlineDraw]>,
    ) {
        let raw_input = self.egui_state.take_egui_input(window);

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            // ── F5: strip outlines (drawn first, behind the guides) ─────────
            if let Some(outlines) = outlines {
                let painter = ctx.layer_painter(egui::LayerId::new(
                    egui::Order::Background,
                    egui::Id::new("mesh_outline"),
                ));
                let front_stroke = egui::Stroke::new(
                    1.0,
                    egui::Color32::from_rgba_unmultiplied(128, 128, 255, 200),
                );
                let back_stroke = egui::Stroke::new(
                    1.0,
                    egui::Color32::from_rgba_unmultiplied(255, 128, 128, 200),
                );
                for outline in outlines {
                    draw_strip(&painter, &outline.front, front_stroke);
                    draw_strip(&painter, &outline.back, back_stroke);
                }
            }

            // ── F4: curl guides ──────────────────────────────────────────────
            if let Some(guide) = guides {
                let painter = ctx.layer_painter(egui::LayerId::new(
                    egui::Order::Background,
                    egui::Id::new("curl_guides"),
                ));
                let line_stroke = egui::Stroke::new(
                    1.5,
                    egui::Color32::from_rgba_unmultiplied(255, 220, 0, 200),
                );
                let arc_stroke = egui::Stroke::new(
                    1.0,
                    egui::Color32::from_rgba_unmultiplied(255, 220, 0, 120),
                );
                let dir_stroke = egui::Stroke::new(
                    2.0,
                    egui::Color32::from_rgba_unmultiplied(80, 255, 140, 220),
                );
                painter.line_segment(guide.line, line_stroke);
                painter.line_segment(guide.arc_end, arc_stroke);
                painter.line_segment([guide.anchor, guide.direction_tip], dir_stroke);
                painter.circle_filled(
                    guide.anchor,
                    3.0,
                    egui::Color32::from_rgba_unmultiplied(255, 220, 0, 220),
                );
            }

            // ── F3: stats panel ──────────────────────────────────────────────
            if let Some(stats) = stats {
                egui::Area::new(egui::Id::new("debug_overlay"))
                    .fixed_pos(egui::pos2(10.0, 10.0))
                    .show(ctx, |ui| {
                        egui::Frame::none()
                            .fill(egui::Color32::from_rgba_premultiplied(0, 0, 0, 180))
                            .inner_margin(egui::Margin::same(8.0))
                            .rounding(4.0)
                            .show(ui, |ui: &mut egui::Ui| {
                                ui.label(format!("FPS: {}", stats.fps));
                                ui.label(format!(
                                    "Frame: {:.2} ms (min: {:.1} | max: {:.1})",
                                    stats.frame_time_avg_ms,
                                    stats.frame_time_min_ms,
                                    stats.frame_time_max_ms
                                ));
                                ui.label(format!("Draw calls: {}", stats.draw_calls));
                                ui.label(format!(
                                    "Resolution: {} x {}  page {} x {}",
                                    stats.resolution.0, stats.resolution.1,
                                    stats.page_pixels.0, stats.page_pixels.1,
                                ));
                                ui.label(format!(
                                    "{:?}  {:?}  page {} / {}",
                                    stats.view_mode, stats.curl_state,
                                    stats.current_index, stats.page_count,
                                ));
                                ui.label(format!(
                                    "Curl vertices: {} front  {} back",
                                    stats.curl_vertices.0, stats.curl_vertices.1,
                                ));
                                ui.label(format!(
                                    "Shadows: {} drop  {} self  ({:.3} ms)",
                                    stats.curl_shadows.0, stats.curl_shadows.1, stats.curl_ms,
                                ));
                                if let Some(p) = stats.curl_params {
                                    ui.label(format!(
                                        "Anchor: ({:.3}, {:.3})  dir ({:.2}, {:.2})  r {:.3}",
                                        p.anchor.x, p.anchor.y,
                                        p.direction.x, p.direction.y,
                                        p.radius,
                                    ));
                                }
                            });
                    });
            }
        });

        self.egui_state
            .handle_platform_output(window, full_output.platform_output);

        let tris = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, &tris, screen_descriptor);

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            self.egui_renderer
                .render(&mut render_pass.forget_lifetime(), &tris, screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}

// Every triangle of a strip: consecutive vertices plus the i → i+2 edge.
fn draw_strip(painter: &egui::Painter, points: &[egui::Pos2], stroke: egui::Stroke) {
    for pair in points.windows(2) {
        painter.line_segment([pair[0], pair[1]], stroke);
    }
    for (a, b) in points.iter().zip(points.iter().skip(2)) {
        painter.line_segment([*a, *b], stroke);
    }
}
