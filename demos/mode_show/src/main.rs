//! Windowed show host: a mode-switched canvas graph presented with glow.
//!
//! Keys: `1` gentle, `2` rave, `3` blackout, `Space` next mode. Audio analysis is out of scope,
//! so signals are synthesized from time.
//!
//! Usage: `vj-demo-mode-show [show_config.json]`

mod plasma;

use std::f32::consts::TAU;
use std::num::NonZeroU32;
use std::time::Instant;

use anyhow::{anyhow, Context};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use winit::event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

// raw-window-handle 0.5 traits (matches glutin 0.30)
use raw_window_handle::HasRawWindowHandle;

use vj_core::{Color, ColorScheme, Frame, FrameSignal, Mode, ShowConfig, Vibe};
use vj_graph::{print_tree, Constructor, Node, Random};
use vj_nodes::effects::{Bloom, BrightnessPulse, StaticColor};
use vj_nodes::{BlackoutSwitch, CanvasNode, Generative, ModeSwitch, PostProcess, RenderTarget};
use vj_runtime_glow::GlowGpu;

use plasma::Plasma;

type ShowNode = CanvasNode<GlowGpu>;

fn main() {
    if let Err(e) = run() {
        eprintln!("[vj mode_show] error: {e:#}");
        std::process::exit(1);
    }
}

fn load_config() -> anyhow::Result<ShowConfig> {
    match std::env::args().nth(1) {
        Some(path) => ShowConfig::from_json_path(&path).with_context(|| format!("loading {path}")),
        None => Ok(ShowConfig::default()),
    }
}

fn init_tracing(cfg: &ShowConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn seed(cfg: &ShowConfig, salt: u64) -> u64 {
    cfg.seed.unwrap_or_else(rand::random).wrapping_add(salt)
}

fn pulse(input: ShowNode) -> ShowNode {
    Box::new(PostProcess::new(input, BrightnessPulse::default()))
}

fn bloom(input: ShowNode) -> ShowNode {
    Box::new(PostProcess::new(input, Bloom::default()))
}

/// blackout switch → mode switch → { gentle: bloom(plasma), rave: random(pulse | bloom+pulse) }
fn build_graph(cfg: &ShowConfig) -> anyhow::Result<ShowNode> {
    let (w, h) = (cfg.width, cfg.height);

    let gentle = bloom(Box::new(
        Generative::with_seed(Plasma::default(), seed(cfg, 1)).with_size(w, h),
    ));

    let mut ops: Vec<Constructor<GlowGpu, Option<RenderTarget>>> = Vec::new();
    ops.push(Box::new(pulse));
    ops.push(Box::new(|input: ShowNode| bloom(pulse(input))));
    let rave_source: ShowNode = Box::new(
        Generative::with_seed(Plasma::default(), seed(cfg, 2)).with_size(w, h),
    );
    let rave = Random::over(rave_source, &ops, Some(seed(cfg, 3)))?;

    let idle: ShowNode = Box::new(
        Generative::new(StaticColor::new(Color::rgb(0.05, 0.02, 0.08))).with_size(w, h),
    );

    let modes: ShowNode = Box::new(
        ModeSwitch::builder()
            .branch(Mode::Gentle, gentle)
            .branch(Mode::Rave, Box::new(rave))
            .branch(Mode::Blackout, idle)
            .require(Mode::Gentle)
            .require(Mode::Rave)
            .build()?,
    );
    Ok(Box::new(BlackoutSwitch::new(modes)))
}

fn synth_frame(t: f32) -> Frame {
    let beat = 0.5 + 0.5 * (t * TAU * 2.0).sin();
    let swell = 0.5 + 0.5 * (t * TAU * 0.1).sin();
    Frame::silent(t)
        .with(FrameSignal::FreqAll, beat * swell)
        .with(FrameSignal::FreqLow, beat)
        .with(FrameSignal::FreqHigh, 1.0 - beat)
        .with(FrameSignal::SustainedLow, swell)
        .with(FrameSignal::SustainedHigh, 1.0 - swell)
        .with(FrameSignal::Dampen, swell * 0.5)
        .with(FrameSignal::Pulse, if beat > 0.9 { 1.0 } else { 0.0 })
}

fn next_mode(mode: Mode) -> Mode {
    let i = Mode::ALL.iter().position(|m| *m == mode).unwrap_or(0);
    Mode::ALL[(i + 1) % Mode::ALL.len()]
}

fn run() -> anyhow::Result<()> {
    let cfg = load_config()?;
    init_tracing(&cfg);
    let mut graph = build_graph(&cfg)?;

    // --- Window + GL context
    let event_loop = EventLoop::new();

    let window_builder = WindowBuilder::new()
        .with_title("vj: mode_show")
        .with_inner_size(winit::dpi::LogicalSize::new(960.0, 540.0));

    let template = glutin::config::ConfigTemplateBuilder::new()
        .with_alpha_size(8)
        .with_depth_size(0)
        .with_stencil_size(0)
        .with_transparency(false);

    let display_builder =
        glutin_winit::DisplayBuilder::new().with_window_builder(Some(window_builder));

    let (window, gl_config) = display_builder
        .build(&event_loop, template, |configs| {
            configs
                .reduce(|accum, config| {
                    if config.num_samples() > accum.num_samples() {
                        config
                    } else {
                        accum
                    }
                })
                .expect("display offered no GL configs")
        })
        .map_err(|e| anyhow!("DisplayBuilder.build: {e}"))?;

    let window = window.context("DisplayBuilder did not create a window")?;
    let gl_display = gl_config.display();
    let raw_window_handle = window.raw_window_handle();

    let context_attributes = glutin::context::ContextAttributesBuilder::new()
        .with_profile(glutin::context::GlProfile::Core)
        .build(Some(raw_window_handle));
    let fallback_context_attributes = glutin::context::ContextAttributesBuilder::new()
        .with_profile(glutin::context::GlProfile::Core)
        .build(None);

    let not_current_gl_context = unsafe {
        gl_display
            .create_context(&gl_config, &context_attributes)
            .or_else(|_| gl_display.create_context(&gl_config, &fallback_context_attributes))
            .context("create_context")?
    };

    let size = window.inner_size();
    let attrs = glutin::surface::SurfaceAttributesBuilder::<glutin::surface::WindowSurface>::new()
        .build(
            raw_window_handle,
            NonZeroU32::new(size.width.max(1)).context("zero window width")?,
            NonZeroU32::new(size.height.max(1)).context("zero window height")?,
        );

    let gl_surface = unsafe {
        gl_display
            .create_window_surface(&gl_config, &attrs)
            .context("create_window_surface")?
    };

    let gl_context = not_current_gl_context
        .make_current(&gl_surface)
        .context("make_current")?;

    let gl = unsafe {
        glow::Context::from_loader_function(|s| match std::ffi::CString::new(s) {
            Ok(name) => gl_display.get_proc_address(name.as_c_str()) as *const _,
            Err(_) => std::ptr::null(),
        })
    };
    let mut gpu = GlowGpu::new(gl);

    // --- Activate the graph
    let mut mode = cfg.initial_mode;
    graph.enter_recursive(&mut gpu).context("entering graph")?;
    graph
        .generate_recursive(&Vibe::new(mode), &mut gpu)
        .context("initial generate")?;
    info!(%mode, "show started\n{}", print_tree(graph.as_ref()));

    let scheme = ColorScheme::new(
        Color::rgb(1.0, 0.24, 0.67),
        Color::rgb(0.02, 0.0, 0.12),
        Color::rgb(0.2, 0.9, 0.9),
    );
    let start = Instant::now();
    let mut running = true;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested if running => {
                    running = false;
                    graph.exit_recursive(&mut gpu);
                    info!(live = gpu.live_objects(), "show stopped");
                    *control_flow = ControlFlow::Exit;
                }

                WindowEvent::Resized(physical_size) => {
                    if let (Some(w), Some(h)) = (
                        NonZeroU32::new(physical_size.width),
                        NonZeroU32::new(physical_size.height),
                    ) {
                        gl_surface.resize(&gl_context, w, h);
                    }
                    window.request_redraw();
                }

                WindowEvent::KeyboardInput {
                    input:
                        KeyboardInput {
                            state: ElementState::Pressed,
                            virtual_keycode: Some(key),
                            ..
                        },
                    ..
                } => {
                    let requested = match key {
                        VirtualKeyCode::Key1 => Some(Mode::Gentle),
                        VirtualKeyCode::Key2 => Some(Mode::Rave),
                        VirtualKeyCode::Key3 => Some(Mode::Blackout),
                        VirtualKeyCode::Space => Some(next_mode(mode)),
                        _ => None,
                    };
                    if let (true, Some(next)) = (running, requested) {
                        mode = next;
                        match graph.generate_recursive(&Vibe::new(mode), &mut gpu) {
                            Ok(()) => info!(%mode, "mode changed\n{}", print_tree(graph.as_ref())),
                            Err(e) => {
                                error!(%mode, error = %e, "generate failed, stopping");
                                running = false;
                                graph.exit_recursive(&mut gpu);
                                *control_flow = ControlFlow::Exit;
                            }
                        }
                    }
                }

                _ => {}
            },

            Event::MainEventsCleared => window.request_redraw(),

            Event::RedrawRequested(_) if running => {
                let s = window.inner_size();
                let (w, h) = (s.width.max(1), s.height.max(1));

                let frame = synth_frame(start.elapsed().as_secs_f32());
                match graph.render(&frame, &scheme, &mut gpu) {
                    Some(target) => gpu.present(&target, w, h),
                    None => gpu.clear_screen(w, h),
                }

                if let Err(e) = gl_surface.swap_buffers(&gl_context) {
                    warn!(error = %e, "swap_buffers failed");
                }
            }

            _ => {}
        }
    });
}
