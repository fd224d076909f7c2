use ash::vk;

pub struct VkCtxDevice {
  pub phys_device: vk::PhysicalDevice,
  /// Graphics and present
  pub queue_family_index: u32,
  pub device: ash::Device,
  pub queue: vk::Queue,
}

impl VkCtxDevice {
  /// Every object created from this device has to be destroyed first.
  pub unsafe fn destroy(&self) {
    self.device.destroy_device(None);
  }
}
