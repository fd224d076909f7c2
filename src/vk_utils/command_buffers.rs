use ash::vk;

use crate::gpu::{GpuError, GpuResult};

pub fn create_command_pool(
  device: &ash::Device,
  queue_family_index: u32,
) -> GpuResult<vk::CommandPool> {
  // RESET_COMMAND_BUFFER - every frame slot re-records its own buffers
  let cmd_pool_create_info = vk::CommandPoolCreateInfo::builder()
    .queue_family_index(queue_family_index)
    .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
    .build();

  unsafe {
    device
      .create_command_pool(&cmd_pool_create_info, None)
      .map_err(GpuError::call("vkCreateCommandPool"))
  }
}

pub fn create_command_buffer(
  device: &ash::Device,
  cmd_pool: vk::CommandPool,
) -> GpuResult<vk::CommandBuffer> {
  let cmd_buf_create_info = vk::CommandBufferAllocateInfo::builder()
    .command_buffer_count(1)
    .command_pool(cmd_pool)
    .level(vk::CommandBufferLevel::PRIMARY)
    .build();

  let cmd_buffers = unsafe {
    device
      .allocate_command_buffers(&cmd_buf_create_info)
      .map_err(GpuError::call("vkAllocateCommandBuffers"))?
  };
  cmd_buffers
    .first()
    .copied()
    .ok_or(GpuError::Call {
      call: "vkAllocateCommandBuffers",
      result: vk::Result::ERROR_UNKNOWN,
    })
}

/// Prepare command buffer for recording. Also resets command buffer.
pub fn begin_command_buffer_for_one_time_submit(
  device: &ash::Device,
  cmd_buf: vk::CommandBuffer,
) -> GpuResult<()> {
  // We will rerecord cmds before next submit
  let cmd_buf_begin_info = vk::CommandBufferBeginInfo::builder()
    .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)
    .build();
  unsafe {
    device
      .begin_command_buffer(cmd_buf, &cmd_buf_begin_info)
      .map_err(GpuError::call("vkBeginCommandBuffer"))
  }
}
