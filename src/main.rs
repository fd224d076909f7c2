use std::path::Path;

use log::{debug, error, info, trace};
use winit::{
  dpi::LogicalSize,
  event::{Event, StartCause, VirtualKeyCode, WindowEvent},
  event_loop::{ControlFlow, EventLoop},
  window::WindowBuilder,
};

use crate::{
  app_timer::AppTimer, config::Config, render_graph::RenderGraph, vk_ctx::vk_ctx_initialize,
  vk_utils::ShaderAssets,
};

mod app_timer;
mod config;
mod gpu;
mod render_graph;
mod utils;
mod vk_ctx;
mod vk_utils;

// glslangValidator -V assets/shaders/triangle.vert.glsl -o assets/shaders-compiled/triangle.vert.spv
// glslangValidator -V assets/shaders/triangle.frag.glsl -o assets/shaders-compiled/triangle.frag.spv
// glslangValidator -V assets/shaders/present.vert.glsl -o assets/shaders-compiled/present.vert.spv
// glslangValidator -V assets/shaders/present.frag.glsl -o assets/shaders-compiled/present.frag.spv

fn exit_with_error(msg: &str, err: &dyn std::fmt::Display) -> ! {
  error!("{}: {}", msg, err);
  std::process::exit(1);
}

fn main() {
  let config = Config::new();
  if let Err(err) = simple_logger::SimpleLogger::new().init() {
    eprintln!("Could not initialize logger: {}", err);
  }
  log::set_max_level(config.log_level);
  info!("-- Start --");

  // init window
  let event_loop = EventLoop::new();
  let window = WindowBuilder::new()
    .with_title(config.window_title)
    .with_resizable(false)
    .with_inner_size(LogicalSize::new(config.window_width, config.window_height))
    .build(&event_loop)
    .unwrap_or_else(|err| exit_with_error("Could not create window", &err));

  // init renderer
  let mut vk_app = vk_ctx_initialize(&window, &config)
    .unwrap_or_else(|err| exit_with_error("Vulkan init failed", &err));
  let render_graph = ShaderAssets::load(Path::new(ShaderAssets::DEFAULT_DIR))
    .and_then(|shaders| RenderGraph::new(&vk_app, &config, &shaders));
  let mut render_graph = match render_graph {
    Ok(render_graph) => render_graph,
    Err(err) => {
      unsafe { vk_app.destroy() };
      exit_with_error("Render init failed", &err);
    }
  };
  info!("Render init went OK!");

  let mut timer = AppTimer::new();
  let mut exiting = false;

  // start event loop
  info!("Starting event loop");
  event_loop.run(move |event, _, control_flow| {
    match event {
      Event::NewEvents(StartCause::Init) => {
        *control_flow = ControlFlow::Poll;
      }

      // on clicked 'x'
      Event::WindowEvent {
        event: WindowEvent::CloseRequested,
        ..
      } => {
        exiting = true;
        *control_flow = ControlFlow::Exit;
      }

      // on keyboard
      Event::WindowEvent {
        event: WindowEvent::KeyboardInput { input, .. },
        ..
      } => {
        if input.virtual_keycode == Some(VirtualKeyCode::Escape) {
          exiting = true;
          *control_flow = ControlFlow::Exit;
        }
      }

      Event::MainEventsCleared if !exiting => {
        timer.mark_start_frame();

        match render_graph.draw_frame(&vk_app, &config) {
          Ok(report) => trace!("{:?}", report),
          Err(err) => {
            error!("Frame {} failed: {}", render_graph.frame_counter(), err);
            exiting = true;
            *control_flow = ControlFlow::ExitWithCode(1);
            return;
          }
        }

        let frames_drawn = render_graph.frame_counter();
        if config.frame_stats_every > 0 && frames_drawn % config.frame_stats_every == 0 {
          debug!(
            "Frame {}: {:.2}ms ({:.0} fps)",
            frames_drawn,
            timer.delta_time_ms(),
            timer.fps()
          );
        }
        if config.should_exit_after(frames_drawn) {
          info!("Drew {} frames, exiting", frames_drawn);
          exiting = true;
          *control_flow = ControlFlow::Exit;
        }
      }

      // before destroy
      Event::LoopDestroyed => {
        info!("EventLoop is shutting down");
        unsafe {
          if let Err(err) = render_graph.destroy(&vk_app) {
            error!("Could not release frame resources: {}", err);
          }
          vk_app.destroy();
        }
        info!("-- End --");
      }

      // default
      _ => (),
    }
  });
}
