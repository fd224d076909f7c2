use ash::vk;
use log::info;

use crate::config::Config;
use crate::gpu::{GpuError, GpuResult};
use crate::vk_ctx::VkCtx;
use crate::vk_utils::*;

mod frame_scheduler;
mod frame_slot;
mod pass_exec_context;
mod present_pass;
mod swapchain_image_ownership;
mod triangle_pass;

pub use self::frame_scheduler::FrameReport;
use self::frame_scheduler::{FrameScheduler, PassRecorder};
use self::frame_slot::{FrameSlot, FrameSlotDesc};
use self::pass_exec_context::PassExecContext;
use self::present_pass::PresentPass;
use self::triangle_pass::TrianglePass;

/// Two passes per frame: triangle into offscreen image (A),
/// then offscreen image into the swapchain image (B).
pub struct RenderGraph {
  triangle_pass: TrianglePass,
  present_pass: PresentPass,
  /// Indexed by swapchain image index
  present_framebuffers: Vec<vk::Framebuffer>,
  scheduler: FrameScheduler,
}

impl RenderGraph {
  /// On failure, everything created so far is destroyed.
  pub fn new(vk_app: &VkCtx, config: &Config, shaders: &ShaderAssets) -> GpuResult<Self> {
    let device = vk_app.vk_device();
    let image_format = vk_app.swapchain.surface_format.format;
    let image_count = vk_app.swapchain_image_count();

    let triangle_pass = TrianglePass::new(vk_app, image_format, shaders)?;
    let present_pass = match PresentPass::new(vk_app, image_format, shaders) {
      Ok(pass) => pass,
      Err(err) => {
        unsafe { triangle_pass.destroy(device) };
        return Err(err);
      }
    };
    let present_framebuffers = match present_pass.create_framebuffers(vk_app) {
      Ok(framebuffers) => framebuffers,
      Err(err) => {
        unsafe { destroy_passes(device, &triangle_pass, &present_pass, Vec::new()) };
        return Err(err);
      }
    };

    let slot_desc = FrameSlotDesc {
      extent: vk_app.window_size(),
      offscreen_format: image_format,
      offscreen_render_pass: triangle_pass.render_pass,
      sampled_image_layout: present_pass.uniforms_layout,
      sampler: present_pass.sampler,
    };
    // one slot per swapchain image
    let scheduler = match FrameScheduler::new(
      vk_app,
      &slot_desc,
      image_count,
      image_count,
      config.fence_timeout_ns,
    ) {
      Ok(scheduler) => scheduler,
      Err(err) => {
        unsafe { destroy_passes(device, &triangle_pass, &present_pass, present_framebuffers) };
        return Err(err);
      }
    };
    info!("RenderGraph ready, {} frame slots", scheduler.slot_count());

    Ok(RenderGraph {
      triangle_pass,
      present_pass,
      present_framebuffers,
      scheduler,
    })
  }

  /// Waits for the GPU before releasing anything. Host-side objects are
  /// released even if the wait failed, the error is returned after.
  pub unsafe fn destroy(&mut self, vk_app: &VkCtx) -> GpuResult<()> {
    let shutdown = self.scheduler.shutdown(vk_app);

    let framebuffers = self.present_framebuffers.drain(..).collect();
    destroy_passes(
      vk_app.vk_device(),
      &self.triangle_pass,
      &self.present_pass,
      framebuffers,
    );
    shutdown
  }

  pub fn frame_counter(&self) -> u64 {
    self.scheduler.frame_counter()
  }

  pub fn draw_frame(&mut self, vk_app: &VkCtx, config: &Config) -> GpuResult<FrameReport> {
    let recorder = FrameRecorder {
      vk_app,
      config,
      triangle_pass: &self.triangle_pass,
      present_pass: &self.present_pass,
      present_framebuffers: &self.present_framebuffers,
    };
    self.scheduler.draw_frame(vk_app, &recorder)
  }
}

unsafe fn destroy_passes(
  device: &ash::Device,
  triangle_pass: &TrianglePass,
  present_pass: &PresentPass,
  present_framebuffers: Vec<vk::Framebuffer>,
) {
  for framebuffer in present_framebuffers {
    device.destroy_framebuffer(framebuffer, None);
  }
  present_pass.destroy(device);
  triangle_pass.destroy(device);
}

/// Records the real passes for the scheduler.
struct FrameRecorder<'a> {
  vk_app: &'a VkCtx,
  config: &'a Config,
  triangle_pass: &'a TrianglePass,
  present_pass: &'a PresentPass,
  present_framebuffers: &'a [vk::Framebuffer],
}

impl FrameRecorder<'_> {
  fn exec_ctx(&self, command_buffer: vk::CommandBuffer) -> PassExecContext {
    PassExecContext {
      vk_app: self.vk_app,
      config: self.config,
      command_buffer,
      size: self.vk_app.window_size(),
    }
  }
}

impl PassRecorder for FrameRecorder<'_> {
  fn record_offscreen_pass(&self, cmd: vk::CommandBuffer, slot: &FrameSlot) -> GpuResult<()> {
    let exec_ctx = self.exec_ctx(cmd);
    self.triangle_pass.execute(&exec_ctx, slot);
    Ok(())
  }

  fn record_present_pass(
    &self,
    cmd: vk::CommandBuffer,
    slot: &FrameSlot,
    image_index: u32,
  ) -> GpuResult<()> {
    let images = &self.vk_app.swapchain.images;
    let idx = image_index as usize;
    let (image, framebuffer) = match (images.get(idx), self.present_framebuffers.get(idx)) {
      (Some(image), Some(framebuffer)) => (*image, *framebuffer),
      _ => {
        return Err(GpuError::ImageIndexOutOfRange {
          image_index,
          image_count: self.present_framebuffers.len(),
        })
      }
    };

    let exec_ctx = self.exec_ctx(cmd);
    self.present_pass.execute(&exec_ctx, slot, image, framebuffer);
    Ok(())
  }
}
