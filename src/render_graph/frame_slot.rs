use ash::vk::{self, Handle};
use log::trace;

use crate::gpu::{GpuDevice, GpuResult, ImageDesc};
use crate::render_graph::present_pass::BINDING_INDEX_OFFSCREEN_RESULT;

/// Everything a slot needs from passes created earlier.
#[derive(Clone, Copy, Debug)]
pub struct FrameSlotDesc {
  pub extent: vk::Extent2D,
  pub offscreen_format: vk::Format,
  /// Pass A, writes the offscreen image
  pub offscreen_render_pass: vk::RenderPass,
  /// Pass B, samples the offscreen image
  pub sampled_image_layout: vk::DescriptorSetLayout,
  pub sampler: vk::Sampler,
}

/// Pass A render target, Pass B input.
pub struct OffscreenTarget {
  pub image: vk::Image,
  pub image_view: vk::ImageView,
  pub framebuffer: vk::Framebuffer,
}

/// One element of the frame ring. Owns one cycle's worth of GPU resources.
/// Nothing here is shared with other slots.
pub struct FrameSlot {
  pub index: usize,
  /// Pass A
  pub command_buffer: vk::CommandBuffer,
  /// Pass B
  pub post_command_buffer: vk::CommandBuffer,
  /// Signaled when Pass B finished. Created signaled so the first wait does not block.
  pub completion_fence: vk::Fence,

  // device-side only, never waited on by host
  pub image_acquired_semaphore: vk::Semaphore,
  pub pass_a_complete_semaphore: vk::Semaphore,
  pub pass_b_complete_semaphore: vk::Semaphore,

  pub offscreen: OffscreenTarget,
  /// Always points at `offscreen.image_view`. Written once, never updated.
  pub descriptor_set: vk::DescriptorSet,
}

impl FrameSlot {
  /// On failure, everything created so far is released.
  pub fn new(device: &impl GpuDevice, index: usize, desc: &FrameSlotDesc) -> GpuResult<Self> {
    let mut slot = Self::empty(index);
    match slot.create_resources(device, desc) {
      Ok(()) => {
        trace!("Created frame slot #{}", index);
        Ok(slot)
      }
      Err(err) => {
        slot.destroy(device);
        Err(err)
      }
    }
  }

  fn empty(index: usize) -> Self {
    Self {
      index,
      command_buffer: vk::CommandBuffer::null(),
      post_command_buffer: vk::CommandBuffer::null(),
      completion_fence: vk::Fence::null(),
      image_acquired_semaphore: vk::Semaphore::null(),
      pass_a_complete_semaphore: vk::Semaphore::null(),
      pass_b_complete_semaphore: vk::Semaphore::null(),
      offscreen: OffscreenTarget {
        image: vk::Image::null(),
        image_view: vk::ImageView::null(),
        framebuffer: vk::Framebuffer::null(),
      },
      descriptor_set: vk::DescriptorSet::null(),
    }
  }

  fn create_resources(&mut self, device: &impl GpuDevice, desc: &FrameSlotDesc) -> GpuResult<()> {
    self.command_buffer = device.allocate_command_buffer()?;
    self.post_command_buffer = device.allocate_command_buffer()?;
    self.completion_fence = device.create_fence(true)?;
    self.image_acquired_semaphore = device.create_semaphore()?;
    self.pass_a_complete_semaphore = device.create_semaphore()?;
    self.pass_b_complete_semaphore = device.create_semaphore()?;

    let offscreen = &mut self.offscreen;
    offscreen.image = device.create_image(&ImageDesc {
      name: format!("FrameSlot.offscreen#{}", self.index),
      extent: desc.extent,
      format: desc.offscreen_format,
      usage: vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
    })?;
    offscreen.image_view = device.create_image_view(offscreen.image, desc.offscreen_format)?;
    offscreen.framebuffer =
      device.create_framebuffer(desc.offscreen_render_pass, &[offscreen.image_view], desc.extent)?;

    self.descriptor_set = device.allocate_descriptor_set(desc.sampled_image_layout)?;
    device.write_sampled_image(
      self.descriptor_set,
      BINDING_INDEX_OFFSCREEN_RESULT,
      offscreen.image_view,
      desc.sampler,
    );
    Ok(())
  }

  /// Reverse creation order, skips whatever was never created. Device has to be idle.
  pub fn destroy(&self, device: &impl GpuDevice) {
    release_if_created(self.descriptor_set, |h| device.free_descriptor_set(h));
    release_if_created(self.offscreen.framebuffer, |h| device.destroy_framebuffer(h));
    release_if_created(self.offscreen.image_view, |h| device.destroy_image_view(h));
    release_if_created(self.offscreen.image, |h| device.destroy_image(h));
    release_if_created(self.pass_b_complete_semaphore, |h| device.destroy_semaphore(h));
    release_if_created(self.pass_a_complete_semaphore, |h| device.destroy_semaphore(h));
    release_if_created(self.image_acquired_semaphore, |h| device.destroy_semaphore(h));
    release_if_created(self.completion_fence, |h| device.destroy_fence(h));
    release_if_created(self.post_command_buffer, |h| device.free_command_buffer(h));
    release_if_created(self.command_buffer, |h| device.free_command_buffer(h));
  }
}

fn release_if_created<H: Handle + Copy>(handle: H, release: impl FnOnce(H)) {
  if handle.as_raw() != 0 {
    release(handle);
  }
}

/// Fixed-size ring of frame slots. Size never changes after creation.
pub struct FrameSlotRing {
  slots: Vec<FrameSlot>,
}

impl FrameSlotRing {
  /// On failure, slots created so far are released.
  pub fn new(device: &impl GpuDevice, desc: &FrameSlotDesc, slot_count: usize) -> GpuResult<Self> {
    assert!(slot_count > 0, "Frame slot ring cannot be empty");

    let mut ring = Self {
      slots: Vec::with_capacity(slot_count),
    };
    for idx in 0..slot_count {
      match FrameSlot::new(device, idx, desc) {
        Ok(slot) => ring.slots.push(slot),
        Err(err) => {
          ring.destroy(device);
          return Err(err);
        }
      }
    }
    Ok(ring)
  }

  pub fn len(&self) -> usize {
    self.slots.len()
  }

  /// Round robin, `frame_counter mod N`.
  pub fn acquire_slot(&self, frame_counter: u64) -> usize {
    (frame_counter % self.slots.len() as u64) as usize
  }

  pub fn slot(&self, slot_idx: usize) -> &FrameSlot {
    let slot_count = self.slots.len();
    self.slots.get(slot_idx).unwrap_or_else(|| {
      panic!(
        "Requested frame slot {}, there are only {}",
        slot_idx, slot_count
      )
    })
  }

  pub fn iter(&self) -> impl Iterator<Item = &FrameSlot> {
    self.slots.iter()
  }

  /// Slots are released last-created-first. Device has to be idle.
  pub fn destroy(&mut self, device: &impl GpuDevice) {
    for slot in self.slots.drain(..).rev() {
      slot.destroy(device);
    }
  }
}

#[cfg(test)]
pub fn test_slot_desc() -> FrameSlotDesc {
  FrameSlotDesc {
    extent: vk::Extent2D {
      width: 800,
      height: 600,
    },
    offscreen_format: vk::Format::B8G8R8A8_UNORM,
    offscreen_render_pass: vk::RenderPass::null(),
    sampled_image_layout: vk::DescriptorSetLayout::null(),
    sampler: vk::Sampler::null(),
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use ash::vk::Handle;

  use super::*;
  use crate::gpu::fake_device::{FakeDevice, FakeEvent};
  use crate::gpu::GpuError;

  #[test]
  fn acquire_slot_is_frame_counter_mod_n() {
    let device = FakeDevice::new(3);
    let ring = FrameSlotRing::new(&device, &test_slot_desc(), 3).unwrap();

    for frame in 0..100u64 {
      assert_eq!(ring.acquire_slot(frame), (frame % 3) as usize);
    }
  }

  #[test]
  fn each_period_visits_every_slot_once() {
    let device = FakeDevice::new(4);
    let ring = FrameSlotRing::new(&device, &test_slot_desc(), 4).unwrap();

    for period in 0..5u64 {
      let visited: Vec<usize> = (0..4).map(|i| ring.acquire_slot(period * 4 + i)).collect();
      assert_eq!(visited, vec![0, 1, 2, 3]);
    }
  }

  #[test]
  fn slots_do_not_share_resources() {
    let device = FakeDevice::new(3);
    let ring = FrameSlotRing::new(&device, &test_slot_desc(), 3).unwrap();

    let mut seen = HashSet::new();
    for slot in ring.iter() {
      let handles = [
        slot.command_buffer.as_raw(),
        slot.post_command_buffer.as_raw(),
        slot.completion_fence.as_raw(),
        slot.image_acquired_semaphore.as_raw(),
        slot.pass_a_complete_semaphore.as_raw(),
        slot.pass_b_complete_semaphore.as_raw(),
        slot.offscreen.image.as_raw(),
        slot.offscreen.image_view.as_raw(),
        slot.offscreen.framebuffer.as_raw(),
        slot.descriptor_set.as_raw(),
      ];
      for h in handles.iter() {
        assert!(seen.insert(*h), "handle {} shared between slots", h);
      }
    }
  }

  #[test]
  fn destroy_releases_everything_in_reverse_creation_order() {
    let device = FakeDevice::new(2);
    let mut ring = FrameSlotRing::new(&device, &test_slot_desc(), 2).unwrap();
    assert_eq!(device.live_object_count(), 20);

    ring.destroy(&device);

    assert_eq!(device.live_object_count(), 0);
    assert!(device.violations().is_empty(), "{:?}", device.violations());
    let destroyed: Vec<u64> = device
      .events()
      .into_iter()
      .filter_map(|e| match e {
        FakeEvent::Destroy(raw) => Some(raw),
        _ => None,
      })
      .collect();
    // handles are minted in creation order, 1..=20
    let expected: Vec<u64> = (1..=20).rev().collect();
    assert_eq!(destroyed, expected);
    assert_eq!(ring.len(), 0);
  }

  #[test]
  fn creation_failure_releases_partial_slot() {
    let device = FakeDevice::new(2);
    device.fail_on("vmaCreateImage");
    let result = FrameSlotRing::new(&device, &test_slot_desc(), 2);

    assert!(result.is_err());
    assert_eq!(device.live_object_count(), 0);
    assert!(device.violations().is_empty(), "{:?}", device.violations());
  }

  #[test]
  fn creation_failure_releases_completed_slots() {
    let device = FakeDevice::new(3);
    // slots 0 and 1 get their descriptor sets, slot 2 does not
    device.fail_after("vkAllocateDescriptorSets", 2);
    let result = FrameSlotRing::new(&device, &test_slot_desc(), 3);

    assert!(matches!(
      result,
      Err(GpuError::Call {
        call: "vkAllocateDescriptorSets",
        ..
      })
    ));
    assert_eq!(device.live_object_count(), 0);
    assert!(device.violations().is_empty(), "{:?}", device.violations());
    // 2 full slots + 9 objects of the third one
    let destroyed = device
      .events()
      .into_iter()
      .filter(|e| matches!(e, FakeEvent::Destroy(_)))
      .count();
    assert_eq!(destroyed, 29);
  }
}
