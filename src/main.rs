// Page curl demo: a procedurally generated book rendered with wgpu.
// Drag a page with the mouse (or a finger) to turn it.
//
// Keys: ←/→ step a page, Tab switches one/two page view,
// F3 stats, F4 curl guides, F5 strip outlines, Esc quits.

mod pages;

use std::sync::Arc;
use std::time::Instant;

use eyre::eyre;
use glam::DVec2;
use wgpu::util::DeviceExt;
use winit::{
    event::{Event as WinitEvent, WindowEvent, ElementState, KeyEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use page_curl::engine::debug_overlay::{CurlGuideDraw, DebugOverlay, DebugStats, MeshOutlineDraw};
use page_curl::engine::input::InputState;
use page_curl::engine::mesh::{
    to_wgpu_color, GpuPageVertex, GpuShadowVertex, PageBuffers, ShadowBuffers,
};
use page_curl::engine::shadow::ShadowColors;
use page_curl::engine::{
    CurlMesh, CurlState, PageImage, PageSide, PageTurner, PointerEvent, Settings, SlotRole, ViewMode,
};
use pages::DemoBook;

const PAGE_TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

// ============================================================================
// UNIFORM DATA
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
}

/// Per-side texture parameters. `flags[0]` mirrors the texture.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct SideParams {
    flags: [f32; 4],
}

// ============================================================================
// PER-SLOT GPU RESOURCES
// ============================================================================

/// Texture and bind group for one side of a page.
struct SideTexture {
    texture:       wgpu::Texture,
    size:          (u32, u32),
    params_buffer: wgpu::Buffer,
    bind_group:    wgpu::BindGroup,
}

impl SideTexture {
    fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        size: (u32, u32),
    ) -> Self {
        let texture = create_page_texture(device, size);
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Side Params Buffer"),
            contents: bytemuck::cast_slice(&[SideParams { flags: [0.0; 4] }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = create_side_bind_group(device, layout, sampler, &texture, &params_buffer);
        Self { texture, size, params_buffer, bind_group }
    }

    /// Upload an image, reallocating the texture if its size changed.
    fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        image: &PageImage,
        mirror: bool,
    ) {
        let size = (image.width(), image.height());
        if size != self.size {
            self.texture = create_page_texture(device, size);
            self.bind_group =
                create_side_bind_group(device, layout, sampler, &self.texture, &self.params_buffer);
            self.size = size;
        }

        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.pixels(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * size.0),
                rows_per_image: Some(size.1),
            },
            wgpu::Extent3d { width: size.0, height: size.1, depth_or_array_layers: 1 },
        );

        let params = SideParams { flags: [if mirror { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0] };
        queue.write_buffer(&self.params_buffer, 0, bytemuck::cast_slice(&[params]));
    }
}

/// GPU side of one physical page slot. Slots swap roles, not resources.
struct SlotGpu {
    page_buffer:   wgpu::Buffer,
    shadow_buffer: wgpu::Buffer,
    front:         SideTexture,
    back:          SideTexture,
    pages:         PageBuffers,
    shadows:       ShadowBuffers,
}

impl SlotGpu {
    fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        mesh: &CurlMesh,
    ) -> Self {
        // Sized once for the largest mesh the slot can produce.
        let page_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Page Vertex Buffer"),
            size: (PageBuffers::capacity_for(mesh) * std::mem::size_of::<GpuPageVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let shadow_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Shadow Vertex Buffer"),
            size: (ShadowBuffers::capacity_for(mesh).max(1) * std::mem::size_of::<GpuShadowVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            page_buffer,
            shadow_buffer,
            front: SideTexture::new(device, layout, sampler, (1, 1)),
            back: SideTexture::new(device, layout, sampler, (1, 1)),
            pages: PageBuffers::default(),
            shadows: ShadowBuffers::default(),
        }
    }

    fn side(&self, side: PageSide) -> &SideTexture {
        match side {
            PageSide::Front => &self.front,
            PageSide::Back | PageSide::Both => &self.back,
        }
    }
}

fn create_page_texture(device: &wgpu::Device, (width, height): (u32, u32)) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Page Texture"),
        size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: PAGE_TEXTURE_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

fn create_side_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    texture: &wgpu::Texture,
    params_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: params_buffer.as_entire_binding(),
            },
        ],
        label: Some("side_bind_group"),
    })
}

fn create_strip_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    vertex_layout: wgpu::VertexBufferLayout<'static>,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[vertex_layout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // Both faces of a curled page are visible.
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}

// ============================================================================
// FRAME TIMING
// ============================================================================

struct FrameTimer {
    last_frame:      Instant,
    last_fps_update: Instant,
    frame_times_ms:  Vec<f32>,
    fps:     u32,
    avg_ms:  f32,
    min_ms:  f32,
    max_ms:  f32,
}

impl FrameTimer {
    fn new() -> Self {
        let now = Instant::now();
        Self {
            last_frame: now,
            last_fps_update: now,
            frame_times_ms: Vec::with_capacity(240),
            fps: 0,
            avg_ms: 0.0,
            min_ms: 0.0,
            max_ms: 0.0,
        }
    }

    fn frame(&mut self) {
        let now = Instant::now();
        self.frame_times_ms.push((now - self.last_frame).as_secs_f32() * 1000.0);
        self.last_frame = now;

        if (now - self.last_fps_update).as_secs_f32() >= 1.0 {
            let times = &self.frame_times_ms;
            self.fps = times.len() as u32;
            self.avg_ms = times.iter().sum::<f32>() / times.len().max(1) as f32;
            self.min_ms = times.iter().copied().fold(f32::INFINITY, f32::min);
            self.max_ms = times.iter().copied().fold(0.0, f32::max);
            log::debug!("FPS: {} | frame {:.2} ms", self.fps, self.avg_ms);
            self.frame_times_ms.clear();
            self.last_fps_update = now;
        }
    }
}

// ============================================================================
// APPLICATION STATE
// ============================================================================

struct State {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    page_pipeline: wgpu::RenderPipeline,
    shadow_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    side_bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,

    // Indexed by physical slot, like `PageTurner::slots()`.
    slots: Vec<SlotGpu>,
    turner: PageTurner<DemoBook>,
    shadow_colors: ShadowColors,
    background: wgpu::Color,

    input: InputState,
    overlay: DebugOverlay,
    show_guides: bool,
    show_outline: bool,
    timer: FrameTimer,
    curl_ms: f32,
    draw_calls: u32,
}

impl State {
    async fn new(window: Arc<Window>, settings: &Settings) -> eyre::Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| eyre!("no suitable GPU adapter"))?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);

        let page_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Page Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("page.wgsl").into()),
        });
        let shadow_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shadow Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shadow.wgsl").into()),
        });

        let uniforms = Uniforms { view_proj: glam::Mat4::IDENTITY.to_cols_array_2d() };

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::cast_slice(&[uniforms]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("uniform_bind_group_layout"),
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("uniform_bind_group"),
        });

        let side_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            multisampled: false,
                            view_dimension: wgpu::TextureViewDimension::D2,
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
                label: Some("side_bind_group_layout"),
            });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Page Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let page_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Page Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout, &side_bind_group_layout],
            push_constant_ranges: &[],
        });
        let shadow_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Shadow Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout],
            push_constant_ranges: &[],
        });

        let page_pipeline = create_strip_pipeline(
            &device,
            "Page Pipeline",
            &page_pipeline_layout,
            &page_shader,
            GpuPageVertex::desc(),
            config.format,
        );
        let shadow_pipeline = create_strip_pipeline(
            &device,
            "Shadow Pipeline",
            &shadow_pipeline_layout,
            &shadow_shader,
            GpuShadowVertex::desc(),
            config.format,
        );

        let mut turner = PageTurner::new(settings, DemoBook::new(settings.page_count, settings.seed));
        turner.set_viewport(size.width, size.height);
        turner.set_current_index(0);

        let slots = turner
            .slots()
            .iter()
            .map(|slot| SlotGpu::new(&device, &side_bind_group_layout, &sampler, &slot.mesh))
            .collect();

        let mut overlay = DebugOverlay::new(&window, &device, config.format);
        overlay.visible = settings.debug.show_stats;

        let [r, g, b, a] = settings.background;

        log::info!(
            "{} pages, {:?}, surface {:?} {}x{}",
            turner.page_count(),
            turner.layout().view_mode(),
            config.format,
            config.width,
            config.height,
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            page_pipeline,
            shadow_pipeline,
            uniform_buffer,
            uniform_bind_group,
            side_bind_group_layout,
            sampler,
            slots,
            turner,
            shadow_colors: settings.shadow,
            background: to_wgpu_color(glam::DVec4::new(r, g, b, a)),
            input: InputState::new(),
            overlay,
            show_guides: settings.debug.show_guides,
            show_outline: settings.debug.show_outline,
            timer: FrameTimer::new(),
            curl_ms: 0.0,
            draw_calls: 0,
        })
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.turner.set_viewport(new_size.width, new_size.height);
        }
    }

    /// Route a window event to the overlay, then to the page turner.
    fn handle_window_event(&mut self, event: &WindowEvent) {
        let _ = self.overlay.handle_window_event(&self.window, event);

        let Some(pointer) = self.input.process_event(event) else {
            return;
        };
        let event = PointerEvent {
            action: pointer.action,
            position: self.turner.layout().translate(pointer.position),
            pressure: pointer.pressure,
        };
        let start = Instant::now();
        if self.turner.handle_pointer(event, start) {
            self.curl_ms = start.elapsed().as_secs_f32() * 1000.0;
        }
    }

    fn update(&mut self) {
        if self.input.was_key_pressed(KeyCode::F3) {
            self.overlay.toggle();
        }
        if self.input.was_key_pressed(KeyCode::F4) {
            self.show_guides = !self.show_guides;
        }
        if self.input.was_key_pressed(KeyCode::F5) {
            self.show_outline = !self.show_outline;
        }

        let idle = self.turner.state() == CurlState::Idle && !self.turner.is_animating();
        if idle {
            let index = self.turner.current_index();
            if self.input.was_key_pressed(KeyCode::ArrowRight) {
                self.turner.set_current_index(index + 1);
            }
            if self.input.was_key_pressed(KeyCode::ArrowLeft) {
                self.turner.set_current_index(index.saturating_sub(1));
            }
            if self.input.was_key_pressed(KeyCode::Tab) {
                let mode = match self.turner.layout().view_mode() {
                    ViewMode::OnePage => ViewMode::TwoPages,
                    ViewMode::TwoPages => ViewMode::OnePage,
                };
                self.turner.set_view_mode(mode);
            }
        }

        let start = Instant::now();
        if self.turner.tick(start) {
            self.curl_ms = start.elapsed().as_secs_f32() * 1000.0;
        }

        self.upload_textures();
        self.upload_geometry();
        self.input.end_frame();
    }

    fn upload_textures(&mut self) {
        for (slot, gpu) in self.turner.slots_mut().iter_mut().zip(&mut self.slots) {
            if !slot.take_texture_upload() {
                continue;
            }
            let mirror_back = slot.page.has_back_texture();
            gpu.front.upload(
                &self.device,
                &self.queue,
                &self.side_bind_group_layout,
                &self.sampler,
                slot.page.texture(PageSide::Front),
                false,
            );
            gpu.back.upload(
                &self.device,
                &self.queue,
                &self.side_bind_group_layout,
                &self.sampler,
                slot.page.texture(PageSide::Back),
                mirror_back,
            );
        }
    }

    fn upload_geometry(&mut self) {
        for (slot, gpu) in self.turner.slots().iter().zip(&mut self.slots) {
            if !slot.visible() {
                continue;
            }
            gpu.pages.pack(&slot.mesh, &slot.page);
            gpu.shadows.pack(&slot.mesh, &self.shadow_colors);
            if !gpu.pages.vertices.is_empty() {
                self.queue.write_buffer(&gpu.page_buffer, 0, gpu.pages.vertex_bytes());
            }
            if !gpu.shadows.vertices.is_empty() {
                self.queue.write_buffer(&gpu.shadow_buffer, 0, gpu.shadows.vertex_bytes());
            }
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let uniforms = Uniforms {
            view_proj: self.turner.layout().projection().to_cols_array_2d(),
        };
        self.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let draw_list: Vec<usize> = self.turner.draw_list().collect();
        let mut draw_calls = 0;

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Page Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.background),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);

            // Per slot: drop shadow → front → back → self shadow.
            for &i in &draw_list {
                let gpu = &self.slots[i];

                if !gpu.shadows.drop_shadow.is_empty() {
                    render_pass.set_pipeline(&self.shadow_pipeline);
                    render_pass.set_vertex_buffer(0, gpu.shadow_buffer.slice(..));
                    render_pass.draw(gpu.shadows.drop_shadow.clone(), 0..1);
                    draw_calls += 1;
                }

                render_pass.set_pipeline(&self.page_pipeline);
                render_pass.set_vertex_buffer(0, gpu.page_buffer.slice(..));
                for strip in [&gpu.pages.front, &gpu.pages.back].into_iter().flatten() {
                    render_pass.set_bind_group(1, &gpu.side(strip.side).bind_group, &[]);
                    render_pass.draw(strip.vertices.clone(), 0..1);
                    draw_calls += 1;
                }

                if !gpu.shadows.self_shadow.is_empty() {
                    render_pass.set_pipeline(&self.shadow_pipeline);
                    render_pass.set_vertex_buffer(0, gpu.shadow_buffer.slice(..));
                    render_pass.draw(gpu.shadows.self_shadow.clone(), 0..1);
                    draw_calls += 1;
                }
            }
        }
        self.draw_calls = draw_calls;

        if self.overlay.visible || self.show_guides || self.show_outline {
            let stats = self.overlay.visible.then(|| self.debug_stats());
            let guides = if self.show_guides { self.curl_guides() } else { None };
            let outlines = self.show_outline.then(|| self.mesh_outlines(&draw_list));

            let screen_descriptor = egui_wgpu::ScreenDescriptor {
                size_in_pixels: [self.config.width, self.config.height],
                pixels_per_point: self.window.scale_factor() as f32,
            };
            self.overlay.render(
                &self.device,
                &self.queue,
                &mut encoder,
                &self.window,
                &view,
                &screen_descriptor,
                stats.as_ref(),
                guides.as_ref(),
                outlines.as_deref(),
            );
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    // ------------------------------------------------------------------------
    // Debug layers
    // ------------------------------------------------------------------------

    fn debug_stats(&self) -> DebugStats {
        let curl = &self.turner.slot_for(SlotRole::Curl).mesh;
        DebugStats {
            fps: self.timer.fps,
            frame_time_avg_ms: self.timer.avg_ms,
            frame_time_min_ms: self.timer.min_ms,
            frame_time_max_ms: self.timer.max_ms,
            draw_calls: self.draw_calls,
            resolution: (self.size.width, self.size.height),
            page_pixels: self.turner.layout().page_pixels(),
            view_mode: self.turner.layout().view_mode(),
            curl_state: self.turner.state(),
            current_index: self.turner.current_index(),
            page_count: self.turner.page_count(),
            curl_vertices: (curl.front_count(), curl.back_count()),
            curl_shadows: (curl.drop_shadow_count(), curl.self_shadow_count()),
            curl_params: self.turner.curl_params(),
            curl_ms: self.curl_ms,
        }
    }

    // View coordinates to egui points.
    fn to_egui(&self, view: DVec2) -> egui::Pos2 {
        let screen = self.turner.layout().to_screen(view) / self.window.scale_factor();
        egui::pos2(screen.x as f32, screen.y as f32)
    }

    fn curl_guides(&self) -> Option<CurlGuideDraw> {
        let p = self.turner.curl_params()?;
        let view = self.turner.layout().view_rect();
        // Long enough to cross the whole view.
        let reach = view.width() + view.height();
        let along = p.direction.perp() * reach;
        let arc = p.anchor - p.direction * (p.radius * std::f64::consts::PI);

        Some(CurlGuideDraw {
            anchor: self.to_egui(p.anchor),
            line: [self.to_egui(p.anchor - along), self.to_egui(p.anchor + along)],
            direction_tip: self.to_egui(p.anchor + p.direction * p.radius.max(0.05)),
            arc_end: [self.to_egui(arc - along), self.to_egui(arc + along)],
        })
    }

    fn mesh_outlines(&self, draw_list: &[usize]) -> Vec<MeshOutlineDraw> {
        draw_list
            .iter()
            .map(|&i| {
                let mesh = &self.turner.slots()[i].mesh;
                let points = |range: std::ops::Range<usize>| -> Vec<egui::Pos2> {
                    mesh.vertices()[range]
                        .iter()
                        .map(|v| self.to_egui(v.position.truncate()))
                        .collect()
                };
                let (start, len) = mesh.back_strip();
                let back = if mesh.back_count() > 0 { points(start..start + len) } else { Vec::new() };
                MeshOutlineDraw { front: points(0..mesh.front_count()), back }
            })
            .collect()
    }
}

// ============================================================================
// MAIN
// ============================================================================

fn main() -> eyre::Result<()> {
    env_logger::init();

    let settings = Settings::load();

    let event_loop = EventLoop::new()?;

    let window_attributes = Window::default_attributes()
        .with_title("Page Curl")
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 800));

    let window = Arc::new(event_loop.create_window(window_attributes)?);

    let mut state = pollster::block_on(State::new(window.clone(), &settings))?;

    event_loop.run(move |event, control_flow| {
        match event {
            WinitEvent::WindowEvent {
                ref event,
                window_id,
            } if window_id == window.id() => match event {
                WindowEvent::CloseRequested
                | WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            state: ElementState::Pressed,
                            physical_key: PhysicalKey::Code(KeyCode::Escape),
                            ..
                        },
                    ..
                } => control_flow.exit(),
                WindowEvent::Resized(physical_size) => {
                    state.handle_window_event(event);
                    state.resize(*physical_size);
                }
                WindowEvent::RedrawRequested => {
                    state.update();
                    match state.render() {
                        Ok(_) => {}
                        Err(wgpu::SurfaceError::Lost) => state.resize(state.size),
                        Err(wgpu::SurfaceError::OutOfMemory) => control_flow.exit(),
                        Err(e) => log::error!("{:?}", e),
                    }
                    state.timer.frame();
                }
                _ => state.handle_window_event(event),
            },
            WinitEvent::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}
