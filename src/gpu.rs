use ash::vk;

mod error;
#[cfg(test)]
pub mod fake_device;

pub use self::error::*;

/// Wait forever. Fence waits and image acquisition use this unless configured otherwise.
pub const TIMEOUT_INFINITE: u64 = u64::MAX;

/// Parameters for a 2D, single mip, single layer image.
#[derive(Clone, Debug)]
pub struct ImageDesc {
  /// For debugging
  pub name: String,
  pub extent: vk::Extent2D,
  pub format: vk::Format,
  pub usage: vk::ImageUsageFlags,
}

/// Device-level object creation, submission and synchronization.
///
/// Implemented by `VkCtx` over ash. The frame scheduler and frame slots
/// only talk to the GPU through this trait.
///
/// All `destroy_*` calls require that the object is no longer referenced by
/// any pending submission (usually: after `device_wait_idle`).
pub trait GpuDevice {
  // objects
  fn create_semaphore(&self) -> GpuResult<vk::Semaphore>;
  fn create_fence(&self, signaled: bool) -> GpuResult<vk::Fence>;
  fn allocate_command_buffer(&self) -> GpuResult<vk::CommandBuffer>;
  fn create_image(&self, desc: &ImageDesc) -> GpuResult<vk::Image>;
  fn create_image_view(&self, image: vk::Image, format: vk::Format) -> GpuResult<vk::ImageView>;
  fn create_framebuffer(
    &self,
    render_pass: vk::RenderPass,
    views: &[vk::ImageView],
    extent: vk::Extent2D,
  ) -> GpuResult<vk::Framebuffer>;
  fn allocate_descriptor_set(
    &self,
    layout: vk::DescriptorSetLayout,
  ) -> GpuResult<vk::DescriptorSet>;
  /// Point `binding` of the set at `view`. Image is expected in `SHADER_READ_ONLY_OPTIMAL`.
  fn write_sampled_image(
    &self,
    set: vk::DescriptorSet,
    binding: u32,
    view: vk::ImageView,
    sampler: vk::Sampler,
  );

  // recording + submission
  /// Also resets the command buffer.
  fn begin_recording(&self, cmd: vk::CommandBuffer) -> GpuResult<()>;
  /// `fence` can be `vk::Fence::null()`.
  fn end_and_submit(
    &self,
    cmd: vk::CommandBuffer,
    waits: &[(vk::Semaphore, vk::PipelineStageFlags)],
    signals: &[vk::Semaphore],
    fence: vk::Fence,
  ) -> GpuResult<()>;

  // presentation
  /// Does not block until the image is usable. `signal` is signaled when it is.
  fn acquire_next_image(&self, timeout: u64, signal: vk::Semaphore) -> GpuResult<u32>;
  fn present(&self, waits: &[vk::Semaphore], image_index: u32) -> GpuResult<()>;

  // host synchronization
  fn wait_for_fences(&self, fences: &[vk::Fence], wait_all: bool, timeout: u64) -> GpuResult<()>;
  fn reset_fences(&self, fences: &[vk::Fence]) -> GpuResult<()>;
  fn device_wait_idle(&self) -> GpuResult<()>;

  // destruction
  fn destroy_semaphore(&self, semaphore: vk::Semaphore);
  fn destroy_fence(&self, fence: vk::Fence);
  fn free_command_buffer(&self, cmd: vk::CommandBuffer);
  fn destroy_image(&self, image: vk::Image);
  fn destroy_image_view(&self, view: vk::ImageView);
  fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer);
  fn free_descriptor_set(&self, set: vk::DescriptorSet);
}
