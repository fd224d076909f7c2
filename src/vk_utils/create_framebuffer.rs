use ash::vk;
use log::trace;

use crate::gpu::{GpuError, GpuResult};

/// One framebuffer per view, each with a single attachment.
/// Result is indexed the same way as `image_views`.
/// On failure, framebuffers created so far are destroyed.
pub fn create_framebuffers_with_one_attachment(
  device: &ash::Device,
  render_pass: vk::RenderPass,
  image_views: &[vk::ImageView],
  size: &vk::Extent2D,
) -> GpuResult<Vec<vk::Framebuffer>> {
  trace!("Will create {} framebuffers {:?}", image_views.len(), size);
  let mut framebuffers = Vec::with_capacity(image_views.len());
  for &iv in image_views {
    match create_framebuffer(device, render_pass, &[iv], size) {
      Ok(fb) => framebuffers.push(fb),
      Err(err) => {
        for fb in framebuffers {
          unsafe { device.destroy_framebuffer(fb, None) };
        }
        return Err(err);
      }
    }
  }
  Ok(framebuffers)
}

pub fn create_framebuffer(
  device: &ash::Device,
  render_pass: vk::RenderPass,
  image_views: &[vk::ImageView],
  size: &vk::Extent2D,
) -> GpuResult<vk::Framebuffer> {
  let create_info = vk::FramebufferCreateInfo::builder()
    .render_pass(render_pass)
    .attachments(image_views)
    .width(size.width)
    .height(size.height)
    .layers(1)
    .build();
  unsafe {
    device
      .create_framebuffer(&create_info, None)
      .map_err(GpuError::call("vkCreateFramebuffer"))
  }
}
