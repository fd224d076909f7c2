//! In-memory `GpuDevice` that tracks object lifetimes and fence states.
//!
//! Work "completes" only when the host observes it: waiting on a fence retires
//! every submission up to the one that signals it (single in-order queue),
//! `device_wait_idle` retires everything. Misuse of the synchronization
//! protocol is collected in `violations()` instead of corrupting memory.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};

use ash::vk::{self, Handle};

use super::{GpuDevice, GpuError, GpuResult, ImageDesc};

#[derive(Clone, Debug, PartialEq)]
pub enum FakeEvent {
  WaitFences(Vec<vk::Fence>),
  ResetFences(Vec<vk::Fence>),
  Acquire {
    image_index: u32,
    signal: vk::Semaphore,
  },
  BeginRecording(vk::CommandBuffer),
  Submit {
    cmd: vk::CommandBuffer,
    waits: Vec<(vk::Semaphore, vk::PipelineStageFlags)>,
    signals: Vec<vk::Semaphore>,
    fence: vk::Fence,
  },
  Present {
    image_index: u32,
    waits: Vec<vk::Semaphore>,
  },
  WaitIdle,
  Destroy(u64),
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum FenceState {
  Signaled,
  Unsignaled,
  /// Will be signaled by submission with this id
  Pending(u64),
}

struct Submission {
  id: u64,
  handles: Vec<u64>,
  /// Swapchain image written by this submission, from the acquire semaphore it waits on
  writes_image: Option<u32>,
}

pub struct FakeDevice {
  image_count: u32,
  next_handle: Cell<u64>,
  next_submission: Cell<u64>,
  acquire_count: Cell<u64>,
  live: RefCell<HashSet<u64>>,
  fences: RefCell<HashMap<u64, FenceState>>,
  in_flight: RefCell<Vec<Submission>>,
  image_sequence: RefCell<VecDeque<u32>>,
  /// Acquire semaphore -> image index, until a submission waits on it
  acquired_images: RefCell<HashMap<u64, u32>>,
  /// Call name and how many calls still succeed
  failing_call: Cell<Option<(&'static str, u32)>>,
  events: RefCell<Vec<FakeEvent>>,
  violations: RefCell<Vec<String>>,
}

impl FakeDevice {
  /// Acquires images round-robin unless `with_image_sequence` is used.
  pub fn new(image_count: u32) -> Self {
    Self {
      image_count,
      next_handle: Cell::new(1),
      next_submission: Cell::new(1),
      acquire_count: Cell::new(0),
      live: RefCell::new(HashSet::new()),
      fences: RefCell::new(HashMap::new()),
      in_flight: RefCell::new(Vec::new()),
      image_sequence: RefCell::new(VecDeque::new()),
      acquired_images: RefCell::new(HashMap::new()),
      failing_call: Cell::new(None),
      events: RefCell::new(Vec::new()),
      violations: RefCell::new(Vec::new()),
    }
  }

  /// Presentation engine returns these indices first, then falls back to round-robin.
  pub fn with_image_sequence(self, sequence: &[u32]) -> Self {
    self.image_sequence.replace(sequence.iter().copied().collect());
    self
  }

  /// Every subsequent call named `call` returns `ERROR_DEVICE_LOST`.
  pub fn fail_on(&self, call: &'static str) {
    self.fail_after(call, 0);
  }

  /// First `successes` calls named `call` work, every later one returns `ERROR_DEVICE_LOST`.
  pub fn fail_after(&self, call: &'static str, successes: u32) {
    self.failing_call.set(Some((call, successes)));
  }

  pub fn events(&self) -> Vec<FakeEvent> {
    self.events.borrow().clone()
  }

  pub fn clear_events(&self) {
    self.events.borrow_mut().clear();
  }

  pub fn violations(&self) -> Vec<String> {
    self.violations.borrow().clone()
  }

  pub fn live_object_count(&self) -> usize {
    self.live.borrow().len()
  }

  pub fn pending_submission_count(&self) -> usize {
    self.in_flight.borrow().len()
  }

  fn mint(&self) -> u64 {
    let id = self.next_handle.get();
    self.next_handle.set(id + 1);
    self.live.borrow_mut().insert(id);
    id
  }

  fn check_failure(&self, call: &'static str) -> GpuResult<()> {
    match self.failing_call.get() {
      Some((failing, 0)) if failing == call => Err(GpuError::Call {
        call,
        result: vk::Result::ERROR_DEVICE_LOST,
      }),
      Some((failing, successes)) if failing == call => {
        self.failing_call.set(Some((failing, successes - 1)));
        Ok(())
      }
      _ => Ok(()),
    }
  }

  fn violation(&self, msg: String) {
    self.violations.borrow_mut().push(msg);
  }

  fn is_referenced(&self, raw: u64) -> bool {
    self
      .in_flight
      .borrow()
      .iter()
      .any(|s| s.handles.contains(&raw))
  }

  fn retire_up_to(&self, submission_id: u64) {
    self
      .in_flight
      .borrow_mut()
      .retain(|s| s.id > submission_id);
  }

  fn release(&self, raw: u64, what: &str) {
    if !self.live.borrow_mut().remove(&raw) {
      self.violation(format!("{} {} destroyed twice or never created", what, raw));
    }
    if self.is_referenced(raw) {
      self.violation(format!(
        "{} {} destroyed while referenced by a pending submission",
        what, raw
      ));
    }
    self.events.borrow_mut().push(FakeEvent::Destroy(raw));
  }
}

impl GpuDevice for FakeDevice {
  fn create_semaphore(&self) -> GpuResult<vk::Semaphore> {
    self.check_failure("vkCreateSemaphore")?;
    Ok(vk::Semaphore::from_raw(self.mint()))
  }

  fn create_fence(&self, signaled: bool) -> GpuResult<vk::Fence> {
    self.check_failure("vkCreateFence")?;
    let id = self.mint();
    let state = if signaled {
      FenceState::Signaled
    } else {
      FenceState::Unsignaled
    };
    self.fences.borrow_mut().insert(id, state);
    Ok(vk::Fence::from_raw(id))
  }

  fn allocate_command_buffer(&self) -> GpuResult<vk::CommandBuffer> {
    self.check_failure("vkAllocateCommandBuffers")?;
    Ok(vk::CommandBuffer::from_raw(self.mint()))
  }

  fn create_image(&self, _desc: &ImageDesc) -> GpuResult<vk::Image> {
    self.check_failure("vmaCreateImage")?;
    Ok(vk::Image::from_raw(self.mint()))
  }

  fn create_image_view(&self, _image: vk::Image, _format: vk::Format) -> GpuResult<vk::ImageView> {
    self.check_failure("vkCreateImageView")?;
    Ok(vk::ImageView::from_raw(self.mint()))
  }

  fn create_framebuffer(
    &self,
    _render_pass: vk::RenderPass,
    _views: &[vk::ImageView],
    _extent: vk::Extent2D,
  ) -> GpuResult<vk::Framebuffer> {
    self.check_failure("vkCreateFramebuffer")?;
    Ok(vk::Framebuffer::from_raw(self.mint()))
  }

  fn allocate_descriptor_set(
    &self,
    _layout: vk::DescriptorSetLayout,
  ) -> GpuResult<vk::DescriptorSet> {
    self.check_failure("vkAllocateDescriptorSets")?;
    Ok(vk::DescriptorSet::from_raw(self.mint()))
  }

  fn write_sampled_image(
    &self,
    _set: vk::DescriptorSet,
    _binding: u32,
    _view: vk::ImageView,
    _sampler: vk::Sampler,
  ) {
  }

  fn begin_recording(&self, cmd: vk::CommandBuffer) -> GpuResult<()> {
    self.check_failure("vkBeginCommandBuffer")?;
    if self.is_referenced(cmd.as_raw()) {
      self.violation(format!(
        "command buffer {} re-recorded while still pending",
        cmd.as_raw()
      ));
    }
    self
      .events
      .borrow_mut()
      .push(FakeEvent::BeginRecording(cmd));
    Ok(())
  }

  fn end_and_submit(
    &self,
    cmd: vk::CommandBuffer,
    waits: &[(vk::Semaphore, vk::PipelineStageFlags)],
    signals: &[vk::Semaphore],
    fence: vk::Fence,
  ) -> GpuResult<()> {
    self.check_failure("vkQueueSubmit")?;
    let id = self.next_submission.get();
    self.next_submission.set(id + 1);

    let mut handles = vec![cmd.as_raw()];
    handles.extend(waits.iter().map(|(s, _)| s.as_raw()));
    handles.extend(signals.iter().map(|s| s.as_raw()));

    // waiting on the acquire semaphore means this submission writes the swapchain image
    let writes_image = waits
      .iter()
      .find_map(|(s, _)| self.acquired_images.borrow_mut().remove(&s.as_raw()));
    if let Some(image_index) = writes_image {
      let previous_writer = self
        .in_flight
        .borrow()
        .iter()
        .find(|s| s.writes_image == Some(image_index))
        .map(|s| s.id);
      if let Some(previous_id) = previous_writer {
        self.violation(format!(
          "swapchain image {} written while submission {} may still write it",
          image_index, previous_id
        ));
      }
    }

    if fence != vk::Fence::null() {
      handles.push(fence.as_raw());
      let mut fences = self.fences.borrow_mut();
      let state = fences.entry(fence.as_raw()).or_insert(FenceState::Unsignaled);
      if *state != FenceState::Unsignaled {
        self.violation(format!(
          "fence {} submitted while {:?}",
          fence.as_raw(),
          state
        ));
      }
      *state = FenceState::Pending(id);
    }

    self
      .in_flight
      .borrow_mut()
      .push(Submission {
        id,
        handles,
        writes_image,
      });
    self.events.borrow_mut().push(FakeEvent::Submit {
      cmd,
      waits: waits.to_vec(),
      signals: signals.to_vec(),
      fence,
    });
    Ok(())
  }

  fn acquire_next_image(&self, _timeout: u64, signal: vk::Semaphore) -> GpuResult<u32> {
    self.check_failure("vkAcquireNextImageKHR")?;
    let count = self.acquire_count.get();
    self.acquire_count.set(count + 1);
    let image_index = self
      .image_sequence
      .borrow_mut()
      .pop_front()
      .unwrap_or((count % self.image_count as u64) as u32);

    self
      .acquired_images
      .borrow_mut()
      .insert(signal.as_raw(), image_index);
    self.events.borrow_mut().push(FakeEvent::Acquire {
      image_index,
      signal,
    });
    Ok(image_index)
  }

  fn present(&self, waits: &[vk::Semaphore], image_index: u32) -> GpuResult<()> {
    self.check_failure("vkQueuePresentKHR")?;
    self.events.borrow_mut().push(FakeEvent::Present {
      image_index,
      waits: waits.to_vec(),
    });
    Ok(())
  }

  fn wait_for_fences(&self, fences: &[vk::Fence], _wait_all: bool, _timeout: u64) -> GpuResult<()> {
    self.check_failure("vkWaitForFences")?;
    self
      .events
      .borrow_mut()
      .push(FakeEvent::WaitFences(fences.to_vec()));

    for fence in fences {
      let state = self.fences.borrow().get(&fence.as_raw()).copied();
      match state {
        Some(FenceState::Pending(id)) => {
          self.retire_up_to(id);
          self
            .fences
            .borrow_mut()
            .insert(fence.as_raw(), FenceState::Signaled);
        }
        Some(FenceState::Signaled) => {}
        Some(FenceState::Unsignaled) | None => {
          self.violation(format!(
            "waiting on fence {} that nothing will signal",
            fence.as_raw()
          ));
          return Err(GpuError::Call {
            call: "vkWaitForFences",
            result: vk::Result::TIMEOUT,
          });
        }
      }
    }
    Ok(())
  }

  fn reset_fences(&self, fences: &[vk::Fence]) -> GpuResult<()> {
    self.check_failure("vkResetFences")?;
    self
      .events
      .borrow_mut()
      .push(FakeEvent::ResetFences(fences.to_vec()));

    let mut states = self.fences.borrow_mut();
    for fence in fences {
      let state = states
        .entry(fence.as_raw())
        .or_insert(FenceState::Unsignaled);
      if let FenceState::Pending(_) = state {
        self.violation(format!(
          "fence {} reset before its signal was waited on",
          fence.as_raw()
        ));
      }
      *state = FenceState::Unsignaled;
    }
    Ok(())
  }

  fn device_wait_idle(&self) -> GpuResult<()> {
    self.check_failure("vkDeviceWaitIdle")?;
    self.events.borrow_mut().push(FakeEvent::WaitIdle);
    self.in_flight.borrow_mut().clear();
    for state in self.fences.borrow_mut().values_mut() {
      if let FenceState::Pending(_) = state {
        *state = FenceState::Signaled;
      }
    }
    Ok(())
  }

  fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
    self.release(semaphore.as_raw(), "semaphore");
  }

  fn destroy_fence(&self, fence: vk::Fence) {
    self.release(fence.as_raw(), "fence");
    self.fences.borrow_mut().remove(&fence.as_raw());
  }

  fn free_command_buffer(&self, cmd: vk::CommandBuffer) {
    self.release(cmd.as_raw(), "command buffer");
  }

  fn destroy_image(&self, image: vk::Image) {
    self.release(image.as_raw(), "image");
  }

  fn destroy_image_view(&self, view: vk::ImageView) {
    self.release(view.as_raw(), "image view");
  }

  fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
    self.release(framebuffer.as_raw(), "framebuffer");
  }

  fn free_descriptor_set(&self, set: vk::DescriptorSet) {
    self.release(set.as_raw(), "descriptor set");
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn submit_for_image(device: &FakeDevice, image_index: u32) -> vk::Fence {
    let acquired = device.create_semaphore().unwrap();
    let cmd = device.allocate_command_buffer().unwrap();
    let fence = device.create_fence(false).unwrap();
    device
      .image_sequence
      .borrow_mut()
      .push_back(image_index);
    assert_eq!(device.acquire_next_image(u64::MAX, acquired).unwrap(), image_index);
    device.begin_recording(cmd).unwrap();
    device
      .end_and_submit(
        cmd,
        &[(acquired, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)],
        &[],
        fence,
      )
      .unwrap();
    fence
  }

  #[test]
  fn second_write_to_pending_swapchain_image_is_flagged() {
    let device = FakeDevice::new(3);
    submit_for_image(&device, 1);
    submit_for_image(&device, 1);

    let violations = device.violations();
    assert_eq!(violations.len(), 1, "{:?}", violations);
    assert!(violations[0].contains("swapchain image 1"));
  }

  #[test]
  fn write_after_previous_writer_retired_is_fine() {
    let device = FakeDevice::new(3);
    let fence = submit_for_image(&device, 1);
    device.wait_for_fences(&[fence], true, u64::MAX).unwrap();
    submit_for_image(&device, 1);
    // different image never conflicts
    submit_for_image(&device, 2);

    assert!(device.violations().is_empty(), "{:?}", device.violations());
  }

  #[test]
  fn fail_after_lets_first_calls_through() {
    let device = FakeDevice::new(2);
    device.fail_after("vkCreateFence", 2);

    assert!(device.create_fence(true).is_ok());
    assert!(device.create_fence(true).is_ok());
    assert!(device.create_fence(true).is_err());
    assert!(device.create_fence(true).is_err());
  }
}
