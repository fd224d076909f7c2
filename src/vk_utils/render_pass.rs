use ash::vk;

use crate::gpu::{GpuError, GpuResult};

/// Raw Vulkan objects used to create vk::RenderPass
pub type AttachmentDefinition = (vk::AttachmentDescription, vk::AttachmentReference);

/// Render pass transitions the image from `initial_layout` to `final_layout`.
/// Inside the subpass it is always `COLOR_ATTACHMENT_OPTIMAL`.
pub fn create_color_attachment(
  attachment_idx: u32,
  image_format: vk::Format,
  load_op: vk::AttachmentLoadOp,
  store_op: vk::AttachmentStoreOp,
  initial_layout: vk::ImageLayout,
  final_layout: vk::ImageLayout,
) -> AttachmentDefinition {
  let attachment = vk::AttachmentDescription::builder()
    .format(image_format)
    .samples(vk::SampleCountFlags::TYPE_1) // single sampled
    .load_op(load_op)
    .store_op(store_op)
    .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
    .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
    .initial_layout(initial_layout)
    .final_layout(final_layout)
    .build();

  let attachment_reference = vk::AttachmentReference {
    attachment: attachment_idx,
    layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
  };

  (attachment, attachment_reference)
}

/// Single subpass writing to all `colors`.
pub fn create_render_pass_from_attachments(
  device: &ash::Device,
  colors: &[AttachmentDefinition],
  dependencies: &[vk::SubpassDependency],
) -> GpuResult<vk::RenderPass> {
  let attachment_descs = colors.iter().map(|a| a.0).collect::<Vec<_>>();
  let color_refs = colors.iter().map(|a| a.1).collect::<Vec<_>>();

  let subpasses = [vk::SubpassDescription::builder()
    .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
    .color_attachments(&color_refs)
    .build()];

  let create_info = vk::RenderPassCreateInfo::builder()
    .dependencies(dependencies)
    .attachments(&attachment_descs)
    .subpasses(&subpasses)
    .build();
  unsafe {
    device
      .create_render_pass(&create_info, None)
      .map_err(GpuError::call("vkCreateRenderPass"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn color_attachment_keeps_requested_layouts() {
    let (desc, reference) = create_color_attachment(
      0,
      vk::Format::B8G8R8A8_UNORM,
      vk::AttachmentLoadOp::CLEAR,
      vk::AttachmentStoreOp::STORE,
      vk::ImageLayout::UNDEFINED,
      vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    );

    assert_eq!(desc.format, vk::Format::B8G8R8A8_UNORM);
    assert_eq!(desc.initial_layout, vk::ImageLayout::UNDEFINED);
    assert_eq!(desc.final_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
    assert_eq!(desc.load_op, vk::AttachmentLoadOp::CLEAR);
    assert_eq!(reference.attachment, 0);
    assert_eq!(reference.layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
  }
}
