use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::mem::ManuallyDrop;

use ash::extensions::ext::DebugUtils;
use ash::extensions::khr::Surface;
use ash::vk;
use log::{info, warn};

use super::*;

/** Kitchen sink for Vulkan stuff */
pub struct VkCtx {
  pub entry: ash::Entry,
  pub instance: ash::Instance,
  pub device: VkCtxDevice,
  pub swapchain: VkCtxSwapchain,
  pub command_pool: vk::CommandPool,
  pub descriptor_pool: vk::DescriptorPool,
  pub pipeline_cache: vk::PipelineCache,
  /// Has to be destroyed before the device, see `destroy()`
  pub allocator: ManuallyDrop<vma::Allocator>,
  /// Memory behind every image created through `GpuDevice::create_image`
  pub(super) image_allocations: RefCell<HashMap<vk::Image, vma::Allocation>>,

  // surface
  pub surface_loader: Surface,
  pub surface_khr: vk::SurfaceKHR,

  // debug
  pub debug_utils: Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>,
  pub(super) suboptimal_reported: Cell<bool>,
}

impl VkCtx {
  pub fn vk_device(&self) -> &ash::Device {
    &self.device.device
  }

  pub fn window_size(&self) -> vk::Extent2D {
    self.swapchain.size
  }

  pub fn swapchain_image_count(&self) -> usize {
    self.swapchain.image_count()
  }

  /// Suboptimal swapchain still works, there is just nothing we can do about it.
  pub(super) fn report_suboptimal(&self, call: &str) {
    if !self.suboptimal_reported.replace(true) {
      warn!(
        "{} reported VK_SUBOPTIMAL_KHR, swapchain no longer matches the surface exactly",
        call
      );
    }
  }

  /// Device has to be idle.
  pub unsafe fn destroy(&mut self) {
    info!("VkCtx::destroy()");
    let device = &self.device.device;

    for (image, mut allocation) in self.image_allocations.borrow_mut().drain() {
      warn!("Image {:?} was not destroyed before VkCtx", image);
      self.allocator.destroy_image(image, &mut allocation);
    }

    self.swapchain.destroy(device);
    device.destroy_descriptor_pool(self.descriptor_pool, None);
    device.destroy_command_pool(self.command_pool, None);
    device.destroy_pipeline_cache(self.pipeline_cache, None);
    ManuallyDrop::drop(&mut self.allocator);

    self.device.destroy();
    self.surface_loader.destroy_surface(self.surface_khr, None);

    if let Some((debug_utils_loader, debug_messenger)) = self.debug_utils.take() {
      debug_utils_loader.destroy_debug_utils_messenger(debug_messenger, None);
    }

    self.instance.destroy_instance(None);
    info!("VkCtx::destroy() finished");
  }
}
