use ash;
use ash::vk;
use log::trace;

use super::frame_slot::FrameSlot;
use super::pass_exec_context::PassExecContext;
use crate::gpu::GpuResult;
use crate::vk_ctx::VkCtx;
use crate::vk_utils::*;

/// Pass A. Renders the triangle into the slot's offscreen image,
/// which is left in `SHADER_READ_ONLY_OPTIMAL` for the present pass.
pub struct TrianglePass {
  pub render_pass: vk::RenderPass,
  pipeline: vk::Pipeline,
  pipeline_layout: vk::PipelineLayout,
}

impl TrianglePass {
  /// On failure, objects created so far are destroyed.
  pub fn new(vk_app: &VkCtx, image_format: vk::Format, shaders: &ShaderAssets) -> GpuResult<Self> {
    trace!("Creating TrianglePass");
    let device = vk_app.vk_device();

    let mut pass = TrianglePass {
      render_pass: vk::RenderPass::null(),
      pipeline: vk::Pipeline::null(),
      pipeline_layout: vk::PipelineLayout::null(),
    };
    match pass.create_objects(vk_app, image_format, shaders) {
      Ok(()) => Ok(pass),
      Err(err) => {
        unsafe { pass.destroy(device) };
        Err(err)
      }
    }
  }

  fn create_objects(
    &mut self,
    vk_app: &VkCtx,
    image_format: vk::Format,
    shaders: &ShaderAssets,
  ) -> GpuResult<()> {
    let device = vk_app.vk_device();
    self.render_pass = TrianglePass::create_render_pass(device, image_format)?;
    self.pipeline_layout = create_pipeline_layout(device, &[])?;
    self.pipeline = TrianglePass::create_pipeline(
      device,
      vk_app.pipeline_cache,
      self.render_pass,
      self.pipeline_layout,
      shaders,
    )?;
    Ok(())
  }

  /// Null handles are skipped by the driver.
  pub unsafe fn destroy(&self, device: &ash::Device) {
    device.destroy_pipeline(self.pipeline, None);
    device.destroy_pipeline_layout(self.pipeline_layout, None);
    device.destroy_render_pass(self.render_pass, None);
  }

  fn create_render_pass(device: &ash::Device, image_format: vk::Format) -> GpuResult<vk::RenderPass> {
    let color_attachment = create_color_attachment(
      0,
      image_format,
      vk::AttachmentLoadOp::CLEAR,
      vk::AttachmentStoreOp::STORE,
      vk::ImageLayout::UNDEFINED,
      vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    );

    // previous present pass of this slot could still be sampling the image
    let dependency_in = vk::SubpassDependency::builder()
      .src_subpass(vk::SUBPASS_EXTERNAL)
      .dst_subpass(0)
      .src_stage_mask(vk::PipelineStageFlags::FRAGMENT_SHADER)
      .src_access_mask(vk::AccessFlags::SHADER_READ)
      .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
      .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
      .build();
    // result is sampled in present pass
    let dependency_out = vk::SubpassDependency::builder()
      .src_subpass(0)
      .dst_subpass(vk::SUBPASS_EXTERNAL)
      .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
      .src_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
      .dst_stage_mask(vk::PipelineStageFlags::FRAGMENT_SHADER)
      .dst_access_mask(vk::AccessFlags::SHADER_READ)
      .build();

    create_render_pass_from_attachments(
      device,
      &[color_attachment],
      &[dependency_in, dependency_out],
    )
  }

  fn create_pipeline(
    device: &ash::Device,
    pipeline_cache: vk::PipelineCache,
    render_pass: vk::RenderPass,
    pipeline_layout: vk::PipelineLayout,
    shaders: &ShaderAssets,
  ) -> GpuResult<vk::Pipeline> {
    let (module_vs, module_fs) =
      load_render_shaders(device, &shaders.triangle_vert, &shaders.triangle_frag)?;
    let stages = [
      create_shader_stage(vk::ShaderStageFlags::VERTEX, module_vs),
      create_shader_stage(vk::ShaderStageFlags::FRAGMENT, module_fs),
    ];

    let pipeline = create_pipeline_with_defaults(
      device,
      pipeline_cache,
      render_pass,
      pipeline_layout,
      &stages,
      1,
    );

    unsafe {
      device.destroy_shader_module(module_vs, None);
      device.destroy_shader_module(module_fs, None);
    }

    pipeline
  }

  pub fn execute(&self, exec_ctx: &PassExecContext, slot: &FrameSlot) {
    let device = exec_ctx.device();
    let command_buffer = exec_ctx.command_buffer;
    let render_area = size_to_rect_vk(&exec_ctx.size);
    let viewport = create_viewport(&exec_ctx.size);
    let clear_color = exec_ctx.config.clear_color;

    let clear_values = [vk::ClearValue {
      color: vk::ClearColorValue {
        float32: [clear_color.x, clear_color.y, clear_color.z, 1f32],
      },
    }];
    let render_pass_begin_info = vk::RenderPassBeginInfo::builder()
      .render_pass(self.render_pass)
      .framebuffer(slot.offscreen.framebuffer)
      .render_area(render_area)
      .clear_values(&clear_values)
      .build();

    unsafe {
      device.cmd_begin_render_pass(
        command_buffer,
        &render_pass_begin_info,
        vk::SubpassContents::INLINE,
      );

      device.cmd_set_viewport(command_buffer, 0, &[viewport]);
      device.cmd_set_scissor(command_buffer, 0, &[render_area]);
      device.cmd_bind_pipeline(
        command_buffer,
        vk::PipelineBindPoint::GRAPHICS,
        self.pipeline,
      );

      // positions and colors are in the vertex shader
      device.cmd_draw(command_buffer, 3, 1, 0, 0);

      device.cmd_end_render_pass(command_buffer)
    }
  }
}
