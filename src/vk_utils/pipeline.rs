use ash::vk;

use crate::gpu::{GpuError, GpuResult};

pub fn create_pipeline_cache(device: &ash::Device) -> GpuResult<vk::PipelineCache> {
  let create_info = vk::PipelineCacheCreateInfo::builder().build();
  unsafe {
    device
      .create_pipeline_cache(&create_info, None)
      .map_err(GpuError::call("vkCreatePipelineCache"))
  }
}

pub fn create_pipeline_layout(
  device: &ash::Device,
  uniform_layouts: &[vk::DescriptorSetLayout],
) -> GpuResult<vk::PipelineLayout> {
  let create_info = vk::PipelineLayoutCreateInfo::builder()
    .set_layouts(uniform_layouts)
    .build();
  unsafe {
    device
      .create_pipeline_layout(&create_info, None)
      .map_err(GpuError::call("vkCreatePipelineLayout"))
  }
}

pub fn create_pipeline(
  device: &ash::Device,
  pipeline_cache: vk::PipelineCache,
  pipeline_create_info: vk::GraphicsPipelineCreateInfo,
) -> GpuResult<vk::Pipeline> {
  let pipelines = unsafe {
    device
      .create_graphics_pipelines(pipeline_cache, &[pipeline_create_info], None)
      .map_err(|(_, result)| GpuError::Call {
        call: "vkCreateGraphicsPipelines",
        result,
      })?
  };
  pipelines.first().copied().ok_or(GpuError::Call {
    call: "vkCreateGraphicsPipelines",
    result: vk::Result::ERROR_UNKNOWN,
  })
}

/// Both passes in this app draw a single triangle with no vertex buffers,
/// no depth and no blending. Viewport and scissor are set during recording.
pub fn create_pipeline_with_defaults(
  device: &ash::Device,
  pipeline_cache: vk::PipelineCache,
  render_pass: vk::RenderPass,
  pipeline_layout: vk::PipelineLayout,
  stages: &[vk::PipelineShaderStageCreateInfo],
  color_attachment_count: usize,
) -> GpuResult<vk::Pipeline> {
  // DO NOT INLINE INTO .builder(), create infos only hold pointers
  let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
  let dynamic_state = ps_dynamic_state(&dynamic_states);
  let vertex_input_state = ps_vertex_empty();
  let input_assembly_state = ps_ia_triangle_list();
  let viewport_state = ps_viewport_single_dynamic();
  let rasterization_state = ps_raster_polygons(vk::CullModeFlags::NONE);
  let multisample_state = ps_multisample_disabled();
  let depth_stencil_state = ps_depth_always_stencil_always();
  let color_attachments = ps_color_attachments_write_all(color_attachment_count);
  let color_blend_state = ps_color_blend_override(&color_attachments);

  let create_info = vk::GraphicsPipelineCreateInfo::builder()
    .stages(stages)
    .vertex_input_state(&vertex_input_state)
    .input_assembly_state(&input_assembly_state)
    .viewport_state(&viewport_state)
    .rasterization_state(&rasterization_state)
    .multisample_state(&multisample_state)
    .depth_stencil_state(&depth_stencil_state)
    .color_blend_state(&color_blend_state)
    .dynamic_state(&dynamic_state)
    .layout(pipeline_layout)
    .render_pass(render_pass)
    .build();

  create_pipeline(device, pipeline_cache, create_info)
}

// This file contains presets for `vk::GraphicsPipelineCreateInfo`.
// Most common options, so it's actually manageable and <100LOC every time

/// No data for vertices provided by the app, it will all be handled in the shader.
/// Common usage is
/// https://www.saschawillems.de/blog/2016/08/13/vulkan-tutorial-on-rendering-a-fullscreen-quad-without-buffers/
pub fn ps_vertex_empty() -> vk::PipelineVertexInputStateCreateInfo {
  vk::PipelineVertexInputStateCreateInfo::builder().build()
}

/// PipelineInputAssembly-TRIANGLE_LIST
pub fn ps_ia_triangle_list() -> vk::PipelineInputAssemblyStateCreateInfo {
  vk::PipelineInputAssemblyStateCreateInfo::builder()
    .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
    .build()
}

/// Does not specify dimensions during pipeline create, requires PipelineDynamicStateCreateInfo with
/// - vk::DynamicState::VIEWPORT
/// - vk::DynamicState::SCISSOR
pub fn ps_viewport_single_dynamic() -> vk::PipelineViewportStateCreateInfo {
  vk::PipelineViewportStateCreateInfo {
    viewport_count: 1,
    scissor_count: 1,
    ..Default::default()
  }
}

pub fn ps_raster_polygons(
  cull_mode: vk::CullModeFlags,
) -> vk::PipelineRasterizationStateCreateInfo {
  vk::PipelineRasterizationStateCreateInfo::builder()
    .depth_clamp_enable(false)
    .polygon_mode(vk::PolygonMode::FILL)
    .cull_mode(cull_mode)
    .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
    .line_width(1.0) // validation layers: has to be 1.0 if not dynamic
    .build()
}

/// - Depth: test SKIP, write OFF
/// - Stencil: test SKIP
pub fn ps_depth_always_stencil_always() -> vk::PipelineDepthStencilStateCreateInfo {
  vk::PipelineDepthStencilStateCreateInfo::builder()
    .depth_test_enable(false)
    .depth_write_enable(false)
    .depth_compare_op(vk::CompareOp::ALWAYS)
    .depth_bounds_test_enable(false)
    .stencil_test_enable(false)
    .build()
}

pub fn ps_multisample_disabled() -> vk::PipelineMultisampleStateCreateInfo {
  vk::PipelineMultisampleStateCreateInfo::builder()
    .rasterization_samples(vk::SampleCountFlags::TYPE_1)
    .sample_shading_enable(false)
    .build()
}

/// Write result to all color attachments, disable blending
pub fn ps_color_attachments_write_all(
  attachment_count: usize,
) -> Vec<vk::PipelineColorBlendAttachmentState> {
  // VULKAN SPEC:
  // > If the independent blending feature is not enabled on the device,
  // all VkPipelineColorBlendAttachmentState elements in the pAttachments
  // array must be identical.
  let write_all = vk::PipelineColorBlendAttachmentState::builder()
    .color_write_mask(vk::ColorComponentFlags::RGBA)
    .blend_enable(false)
    .src_color_blend_factor(vk::BlendFactor::ONE) // shader output
    .dst_color_blend_factor(vk::BlendFactor::ZERO) // existing value on destination attachment
    .src_alpha_blend_factor(vk::BlendFactor::ONE)
    .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
    .build();

  vec![write_all; attachment_count]
}

/// `attachments` has to outlive the result
pub fn ps_color_blend_override(
  attachments: &[vk::PipelineColorBlendAttachmentState],
) -> vk::PipelineColorBlendStateCreateInfo {
  vk::PipelineColorBlendStateCreateInfo::builder()
    .attachments(attachments)
    .build()
}

/// List of things that will be provided as separate command before draw (actuall 'runtime').
/// Used so that we do not have to specify everything during pipeline create
pub fn ps_dynamic_state(states: &[vk::DynamicState]) -> vk::PipelineDynamicStateCreateInfo {
  vk::PipelineDynamicStateCreateInfo::builder()
    .dynamic_states(states)
    .build()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn color_blend_writes_all_channels_of_every_attachment() {
    let attachments = ps_color_attachments_write_all(2);
    assert_eq!(attachments.len(), 2);
    for a in attachments.iter() {
      assert_eq!(a.blend_enable, vk::FALSE);
      assert_eq!(a.color_write_mask, vk::ColorComponentFlags::RGBA);
    }

    let state = ps_color_blend_override(&attachments);
    assert_eq!(state.attachment_count, 2);
  }

  #[test]
  fn dynamic_viewport_state_has_no_dimensions() {
    let state = ps_viewport_single_dynamic();
    assert_eq!(state.viewport_count, 1);
    assert_eq!(state.scissor_count, 1);
    assert!(state.p_viewports.is_null());
    assert!(state.p_scissors.is_null());
  }
}
