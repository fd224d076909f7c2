use ash;
use ash::vk;
use log::trace;

use super::frame_slot::FrameSlot;
use super::pass_exec_context::PassExecContext;
use crate::gpu::GpuResult;
use crate::vk_ctx::VkCtx;
use crate::vk_utils::*;

/// Offscreen result of the triangle pass
pub const BINDING_INDEX_OFFSCREEN_RESULT: u32 = 0;

/// Pass B. Samples the slot's offscreen image and writes the OS window framebuffer.
pub struct PresentPass {
  pub render_pass: vk::RenderPass,
  pipeline: vk::Pipeline,
  pipeline_layout: vk::PipelineLayout,
  pub uniforms_layout: vk::DescriptorSetLayout,
  pub sampler: vk::Sampler,
}

impl PresentPass {
  /// On failure, objects created so far are destroyed.
  pub fn new(vk_app: &VkCtx, image_format: vk::Format, shaders: &ShaderAssets) -> GpuResult<Self> {
    trace!("Creating PresentPass");
    let device = vk_app.vk_device();

    let mut pass = PresentPass {
      render_pass: vk::RenderPass::null(),
      pipeline: vk::Pipeline::null(),
      pipeline_layout: vk::PipelineLayout::null(),
      uniforms_layout: vk::DescriptorSetLayout::null(),
      sampler: vk::Sampler::null(),
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
    self.render_pass = PresentPass::create_render_pass(device, image_format)?;
    self.uniforms_layout = PresentPass::create_uniforms_layout(device)?;
    self.sampler = create_sampler(device, vk::Filter::NEAREST, vk::Filter::NEAREST)?;
    self.pipeline_layout = create_pipeline_layout(device, &[self.uniforms_layout])?;
    self.pipeline = PresentPass::create_pipeline(
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
    device.destroy_sampler(self.sampler, None);
    device.destroy_descriptor_set_layout(self.uniforms_layout, None);
    device.destroy_render_pass(self.render_pass, None);
  }

  fn create_render_pass(device: &ash::Device, image_format: vk::Format) -> GpuResult<vk::RenderPass> {
    let color_attachment = create_color_attachment(
      0,
      image_format,
      vk::AttachmentLoadOp::DONT_CARE, // we override every pixel regardless
      vk::AttachmentStoreOp::STORE,
      vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
      vk::ImageLayout::PRESENT_SRC_KHR,
    );

    let dependency = vk::SubpassDependency::builder()
      .src_subpass(vk::SUBPASS_EXTERNAL)
      .dst_subpass(0)
      .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
      .src_access_mask(vk::AccessFlags::empty())
      .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
      .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
      .build();

    create_render_pass_from_attachments(device, &[color_attachment], &[dependency])
  }

  fn create_uniforms_layout(device: &ash::Device) -> GpuResult<vk::DescriptorSetLayout> {
    let binding_offscreen_tex = create_texture_binding(
      BINDING_INDEX_OFFSCREEN_RESULT,
      vk::ShaderStageFlags::FRAGMENT,
    );
    create_descriptor_set_layout(device, &[binding_offscreen_tex])
  }

  fn create_pipeline(
    device: &ash::Device,
    pipeline_cache: vk::PipelineCache,
    render_pass: vk::RenderPass,
    pipeline_layout: vk::PipelineLayout,
    shaders: &ShaderAssets,
  ) -> GpuResult<vk::Pipeline> {
    let (module_vs, module_fs) =
      load_render_shaders(device, &shaders.present_vert, &shaders.present_frag)?;
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

  /// One per swapchain image, indexed by image index.
  pub fn create_framebuffers(&self, vk_app: &VkCtx) -> GpuResult<Vec<vk::Framebuffer>> {
    create_framebuffers_with_one_attachment(
      vk_app.vk_device(),
      self.render_pass,
      &vk_app.swapchain.image_views,
      &vk_app.window_size(),
    )
  }

  pub fn execute(
    &self,
    exec_ctx: &PassExecContext,
    slot: &FrameSlot,
    swapchain_image: vk::Image,
    framebuffer: vk::Framebuffer,
  ) {
    let device = exec_ctx.device();
    let command_buffer = exec_ctx.command_buffer;
    let render_area = size_to_rect_vk(&exec_ctx.size);
    let viewport = create_viewport(&exec_ctx.size);

    let render_pass_begin_info = vk::RenderPassBeginInfo::builder()
      .render_pass(self.render_pass)
      .framebuffer(framebuffer)
      .render_area(render_area)
      .build();

    unsafe {
      cmd_transition_swapchain_image_for_write(device, command_buffer, swapchain_image);

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

      // always this slot's offscreen image
      device.cmd_bind_descriptor_sets(
        command_buffer,
        vk::PipelineBindPoint::GRAPHICS,
        self.pipeline_layout,
        0,
        &[slot.descriptor_set],
        &[],
      );

      // fullscreen triangle
      device.cmd_draw(command_buffer, 3, 1, 0, 0);

      device.cmd_end_render_pass(command_buffer)
    }
  }
}
