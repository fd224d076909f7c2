use ash::vk;

/*
https://github.com/KhronosGroup/Vulkan-Docs/wiki/Synchronization-Examples
https://gpuopen.com/learn/vulkan-barriers-explained/
*/

/// https://registry.khronos.org/vulkan/specs/1.3-extensions/man/html/VkImageMemoryBarrier.html
pub fn create_image_barrier(
  image: vk::Image,
  aspect_mask: vk::ImageAspectFlags,
  old_layout: vk::ImageLayout,
  new_layout: vk::ImageLayout,
  src_access_mask: vk::AccessFlags,
  dst_access_mask: vk::AccessFlags,
) -> vk::ImageMemoryBarrier {
  vk::ImageMemoryBarrier::builder()
    .old_layout(old_layout)
    .new_layout(new_layout)
    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
    .image(image)
    .src_access_mask(src_access_mask)
    .dst_access_mask(dst_access_mask)
    .subresource_range(vk::ImageSubresourceRange {
      aspect_mask,
      base_mip_level: 0,
      level_count: 1, // vk::REMAINING_MIP_LEVELS
      base_array_layer: 0,
      layer_count: 1, // vk::REMAINING_ARRAY_LAYERS
    })
    .build()
}

/// Swapchain image contents are discarded, previous frame's result is not needed.
/// Waits on the same stage as the image-acquired semaphore.
pub unsafe fn cmd_transition_swapchain_image_for_write(
  device: &ash::Device,
  command_buffer: vk::CommandBuffer,
  image: vk::Image,
) {
  let barrier = create_image_barrier(
    image,
    vk::ImageAspectFlags::COLOR,
    vk::ImageLayout::UNDEFINED,
    vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    vk::AccessFlags::empty(),
    vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
  );
  device.cmd_pipeline_barrier(
    command_buffer,
    vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
    vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
    vk::DependencyFlags::empty(),
    &[],
    &[],
    &[barrier],
  );
}
