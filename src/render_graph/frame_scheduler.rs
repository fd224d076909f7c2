use ash::vk;
use log::{trace, warn};

use crate::gpu::{GpuDevice, GpuError, GpuResult};
use crate::render_graph::frame_slot::{FrameSlot, FrameSlotDesc, FrameSlotRing};
use crate::render_graph::swapchain_image_ownership::SwapchainImageOwnership;

/// Stage at which Pass B waits for the presentation engine to release the image.
pub const IMAGE_ACQUIRED_WAIT_STAGE: vk::PipelineStageFlags =
  vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT;
/// Stage at which Pass B waits for Pass A. Fragment shader samples the
/// offscreen image and runs before color attachment output.
pub const PASS_A_COMPLETE_WAIT_STAGE: vk::PipelineStageFlags =
  vk::PipelineStageFlags::FRAGMENT_SHADER;

/// Records the commands of both passes. Command buffer is already in recording state.
pub trait PassRecorder {
  /// Pass A. Writes only to `slot.offscreen`.
  fn record_offscreen_pass(&self, cmd: vk::CommandBuffer, slot: &FrameSlot) -> GpuResult<()>;

  /// Pass B. Samples `slot.descriptor_set`, writes swapchain image `image_index`.
  fn record_present_pass(
    &self,
    cmd: vk::CommandBuffer,
    slot: &FrameSlot,
    image_index: u32,
  ) -> GpuResult<()>;
}

/// What happened during a single `draw_frame`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameReport {
  pub frame: u64,
  pub slot: usize,
  pub image_index: u32,
  /// Previous writer of the swapchain image, if it was not confirmed retired yet
  pub hazard_slot: Option<usize>,
}

/// Drives frames through the slot ring. Up to `slot_count` frames can be in flight,
/// Pass A/B of different slots are free to overlap on the GPU.
pub struct FrameScheduler {
  ring: FrameSlotRing,
  ownership: SwapchainImageOwnership,
  frame_counter: u64,
  timeout: u64,
}

impl FrameScheduler {
  pub fn new(
    device: &impl GpuDevice,
    desc: &FrameSlotDesc,
    slot_count: usize,
    image_count: usize,
    timeout: u64,
  ) -> GpuResult<Self> {
    let ring = FrameSlotRing::new(device, desc, slot_count)?;
    trace!(
      "FrameScheduler: {} frame slots, {} swapchain images",
      slot_count,
      image_count
    );

    Ok(Self {
      ring,
      ownership: SwapchainImageOwnership::new(image_count),
      frame_counter: 0,
      timeout,
    })
  }

  pub fn slot_count(&self) -> usize {
    self.ring.len()
  }

  pub fn frame_counter(&self) -> u64 {
    self.frame_counter
  }

  pub fn draw_frame(
    &mut self,
    device: &impl GpuDevice,
    passes: &impl PassRecorder,
  ) -> GpuResult<FrameReport> {
    let frame = self.frame_counter;
    let slot_idx = self.ring.acquire_slot(frame);
    let slot = self.ring.slot(slot_idx);

    // slot's command buffers, semaphores and offscreen image are free after this
    device.wait_for_fences(&[slot.completion_fence], true, self.timeout)?;

    let image_index = device.acquire_next_image(self.timeout, slot.image_acquired_semaphore)?;
    let image_count = self.ownership.image_count();
    if image_index as usize >= image_count {
      return Err(GpuError::ImageIndexOutOfRange {
        image_index,
        image_count,
      });
    }

    // swapchain image might still be written by some other slot
    let hazard_slot = self.ownership.resolve_hazard(image_index);
    match hazard_slot {
      Some(prev_slot_idx) if prev_slot_idx != slot_idx => {
        trace!(
          "Frame {}: swapchain image {} still owned by slot {}, waiting",
          frame,
          image_index,
          prev_slot_idx
        );
        let prev_fence = self.ring.slot(prev_slot_idx).completion_fence;
        device.wait_for_fences(&[prev_fence], true, self.timeout)?;
      }
      // own fence, already waited on
      _ => (),
    }

    // only after the wait, otherwise the signal could be lost
    device.reset_fences(&[slot.completion_fence])?;

    // Pass A
    device.begin_recording(slot.command_buffer)?;
    passes.record_offscreen_pass(slot.command_buffer, slot)?;
    device.end_and_submit(
      slot.command_buffer,
      &[],
      &[slot.pass_a_complete_semaphore],
      vk::Fence::null(),
    )?;

    // Pass B
    device.begin_recording(slot.post_command_buffer)?;
    passes.record_present_pass(slot.post_command_buffer, slot, image_index)?;
    let waits = [
      (slot.image_acquired_semaphore, IMAGE_ACQUIRED_WAIT_STAGE),
      (slot.pass_a_complete_semaphore, PASS_A_COMPLETE_WAIT_STAGE),
    ];
    device.end_and_submit(
      slot.post_command_buffer,
      &waits,
      &[slot.pass_b_complete_semaphore],
      slot.completion_fence,
    )?;

    self.ownership.record_ownership(image_index, slot_idx);

    device.present(&[slot.pass_b_complete_semaphore], image_index)?;

    trace!(
      "Frame {}: slot {}, swapchain image {}",
      frame,
      slot_idx,
      image_index
    );
    self.frame_counter += 1;

    Ok(FrameReport {
      frame,
      slot: slot_idx,
      image_index,
      hazard_slot,
    })
  }

  /// Waits for the device to finish everything, then releases all slots.
  /// Slots are released even if the wait failed (e.g. device lost), the error is returned after.
  /// Safe to call more than once.
  pub fn shutdown(&mut self, device: &impl GpuDevice) -> GpuResult<()> {
    let idle = device.device_wait_idle();
    if let Err(err) = &idle {
      warn!("Releasing frame slots after failed idle wait: {}", err);
    }
    self.ring.destroy(device);
    idle
  }
}
