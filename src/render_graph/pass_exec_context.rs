use ash::vk;

use crate::{config::Config, vk_ctx::VkCtx};

/// All the kitchen sink that we might want to use in the render pass.
/// Created so we do not have to provide it all one-by-one.
pub struct PassExecContext<'a> {
  pub vk_app: &'a VkCtx,
  pub config: &'a Config,
  /// Already in recording state
  pub command_buffer: vk::CommandBuffer,
  pub size: vk::Extent2D,
}

impl PassExecContext<'_> {
  pub fn device(&self) -> &ash::Device {
    self.vk_app.vk_device()
  }
}
