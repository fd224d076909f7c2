use ash::extensions::khr::Swapchain;
use ash::vk;

pub struct VkCtxSwapchain {
  pub swapchain_loader: Swapchain,
  pub swapchain: vk::SwapchainKHR,
  pub size: vk::Extent2D,
  pub surface_format: vk::SurfaceFormatKHR,
  pub present_mode: vk::PresentModeKHR,

  // Both indexed by the image index returned from vkAcquireNextImageKHR.
  // Length never changes, there is no swapchain recreation.
  pub images: Vec<vk::Image>,
  pub image_views: Vec<vk::ImageView>,
}

impl VkCtxSwapchain {
  pub fn image_count(&self) -> usize {
    self.images.len()
  }

  /// Will also destroy images. From validation layers:
  /// VK_OBJECT_TYPE_IMAGE; is a presentable image and it is controlled by the implementation and is destroyed with vkDestroySwapchainKHR.
  pub unsafe fn destroy(&mut self, device: &ash::Device) {
    for image_view in self.image_views.drain(..) {
      device.destroy_image_view(image_view, None);
    }
    self.images.clear();

    self
      .swapchain_loader
      .destroy_swapchain(self.swapchain, None);
  }
}
