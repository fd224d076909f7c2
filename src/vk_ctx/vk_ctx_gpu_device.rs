use ash::vk;
use log::{trace, warn};
use vma::Alloc;

use super::VkCtx;
use crate::gpu::{GpuDevice, GpuError, GpuResult, ImageDesc};
use crate::vk_utils::*;

impl GpuDevice for VkCtx {
  fn create_semaphore(&self) -> GpuResult<vk::Semaphore> {
    let create_info = vk::SemaphoreCreateInfo::builder().build();
    unsafe {
      self
        .vk_device()
        .create_semaphore(&create_info, None)
        .map_err(GpuError::call("vkCreateSemaphore"))
    }
  }

  fn create_fence(&self, signaled: bool) -> GpuResult<vk::Fence> {
    let flags = if signaled {
      vk::FenceCreateFlags::SIGNALED
    } else {
      vk::FenceCreateFlags::empty()
    };
    let create_info = vk::FenceCreateInfo::builder().flags(flags).build();
    unsafe {
      self
        .vk_device()
        .create_fence(&create_info, None)
        .map_err(GpuError::call("vkCreateFence"))
    }
  }

  fn allocate_command_buffer(&self) -> GpuResult<vk::CommandBuffer> {
    create_command_buffer(self.vk_device(), self.command_pool)
  }

  fn create_image(&self, desc: &ImageDesc) -> GpuResult<vk::Image> {
    trace!("Creating image '{}' {:?}", desc.name, desc.extent);
    let create_info = vk::ImageCreateInfo::builder()
      .image_type(vk::ImageType::TYPE_2D)
      .extent(vk::Extent3D {
        width: desc.extent.width,
        height: desc.extent.height,
        depth: 1,
      })
      .format(desc.format)
      .tiling(vk::ImageTiling::OPTIMAL)
      .usage(desc.usage)
      // first render pass clears it anyway
      .initial_layout(vk::ImageLayout::UNDEFINED)
      // verbose properties, but vulkan requires
      .sharing_mode(vk::SharingMode::EXCLUSIVE)
      .samples(vk::SampleCountFlags::TYPE_1)
      .mip_levels(1)
      .array_layers(1)
      .build();

    let alloc_info = vma::AllocationCreateInfo {
      usage: vma::MemoryUsage::AutoPreferDevice,
      ..Default::default()
    };

    let (image, allocation) = unsafe {
      self
        .allocator
        .create_image(&create_info, &alloc_info)
        .map_err(GpuError::call("vmaCreateImage"))?
    };
    self
      .image_allocations
      .borrow_mut()
      .insert(image, allocation);
    Ok(image)
  }

  fn create_image_view(&self, image: vk::Image, format: vk::Format) -> GpuResult<vk::ImageView> {
    create_image_view(self.vk_device(), image, format, vk::ImageAspectFlags::COLOR)
  }

  fn create_framebuffer(
    &self,
    render_pass: vk::RenderPass,
    views: &[vk::ImageView],
    extent: vk::Extent2D,
  ) -> GpuResult<vk::Framebuffer> {
    create_framebuffer(self.vk_device(), render_pass, views, &extent)
  }

  fn allocate_descriptor_set(
    &self,
    layout: vk::DescriptorSetLayout,
  ) -> GpuResult<vk::DescriptorSet> {
    allocate_descriptor_set(self.vk_device(), self.descriptor_pool, layout)
  }

  fn write_sampled_image(
    &self,
    set: vk::DescriptorSet,
    binding: u32,
    view: vk::ImageView,
    sampler: vk::Sampler,
  ) {
    unsafe {
      write_texture_descriptor(
        self.vk_device(),
        set,
        binding,
        view,
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        sampler,
      );
    }
  }

  fn begin_recording(&self, cmd: vk::CommandBuffer) -> GpuResult<()> {
    begin_command_buffer_for_one_time_submit(self.vk_device(), cmd)
  }

  fn end_and_submit(
    &self,
    cmd: vk::CommandBuffer,
    waits: &[(vk::Semaphore, vk::PipelineStageFlags)],
    signals: &[vk::Semaphore],
    fence: vk::Fence,
  ) -> GpuResult<()> {
    let device = self.vk_device();
    unsafe {
      device
        .end_command_buffer(cmd)
        .map_err(GpuError::call("vkEndCommandBuffer"))?;
    }

    let wait_semaphores: Vec<vk::Semaphore> = waits.iter().map(|w| w.0).collect();
    let wait_stages: Vec<vk::PipelineStageFlags> = waits.iter().map(|w| w.1).collect();
    let command_buffers = [cmd];
    let submit_info = vk::SubmitInfo::builder()
      .wait_semaphores(&wait_semaphores)
      .wait_dst_stage_mask(&wait_stages)
      .command_buffers(&command_buffers)
      .signal_semaphores(signals)
      .build();

    unsafe {
      device
        .queue_submit(self.device.queue, &[submit_info], fence)
        .map_err(GpuError::call("vkQueueSubmit"))
    }
  }

  fn acquire_next_image(&self, timeout: u64, signal: vk::Semaphore) -> GpuResult<u32> {
    let swapchain = &self.swapchain;
    let (image_index, suboptimal) = unsafe {
      swapchain
        .swapchain_loader
        .acquire_next_image(swapchain.swapchain, timeout, signal, vk::Fence::null())
        .map_err(GpuError::swapchain_call("vkAcquireNextImageKHR"))?
    };
    if suboptimal {
      self.report_suboptimal("vkAcquireNextImageKHR");
    }
    Ok(image_index)
  }

  fn present(&self, waits: &[vk::Semaphore], image_index: u32) -> GpuResult<()> {
    let swapchain = &self.swapchain;
    let swapchains = [swapchain.swapchain];
    let image_indices = [image_index];
    let present_info = vk::PresentInfoKHR::builder()
      .wait_semaphores(waits)
      .swapchains(&swapchains)
      .image_indices(&image_indices)
      .build();

    let suboptimal = unsafe {
      swapchain
        .swapchain_loader
        .queue_present(self.device.queue, &present_info)
        .map_err(GpuError::swapchain_call("vkQueuePresentKHR"))?
    };
    if suboptimal {
      self.report_suboptimal("vkQueuePresentKHR");
    }
    Ok(())
  }

  fn wait_for_fences(&self, fences: &[vk::Fence], wait_all: bool, timeout: u64) -> GpuResult<()> {
    unsafe {
      self
        .vk_device()
        .wait_for_fences(fences, wait_all, timeout)
        .map_err(GpuError::call("vkWaitForFences"))
    }
  }

  fn reset_fences(&self, fences: &[vk::Fence]) -> GpuResult<()> {
    unsafe {
      self
        .vk_device()
        .reset_fences(fences)
        .map_err(GpuError::call("vkResetFences"))
    }
  }

  fn device_wait_idle(&self) -> GpuResult<()> {
    unsafe {
      self
        .vk_device()
        .device_wait_idle()
        .map_err(GpuError::call("vkDeviceWaitIdle"))
    }
  }

  fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
    unsafe { self.vk_device().destroy_semaphore(semaphore, None) }
  }

  fn destroy_fence(&self, fence: vk::Fence) {
    unsafe { self.vk_device().destroy_fence(fence, None) }
  }

  fn free_command_buffer(&self, cmd: vk::CommandBuffer) {
    unsafe {
      self
        .vk_device()
        .free_command_buffers(self.command_pool, &[cmd])
    }
  }

  fn destroy_image(&self, image: vk::Image) {
    let allocation = self.image_allocations.borrow_mut().remove(&image);
    match allocation {
      Some(mut allocation) => unsafe { self.allocator.destroy_image(image, &mut allocation) },
      None => warn!("Tried to destroy image {:?} that has no allocation", image),
    }
  }

  fn destroy_image_view(&self, view: vk::ImageView) {
    unsafe { self.vk_device().destroy_image_view(view, None) }
  }

  fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
    unsafe { self.vk_device().destroy_framebuffer(framebuffer, None) }
  }

  fn free_descriptor_set(&self, set: vk::DescriptorSet) {
    let result = unsafe {
      self
        .vk_device()
        .free_descriptor_sets(self.descriptor_pool, &[set])
    };
    if let Err(err) = result {
      warn!("vkFreeDescriptorSets failed: {:?}", err);
    }
  }
}
