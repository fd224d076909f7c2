use std::path::PathBuf;

use ash::vk;
use thiserror::Error;

/// Everything here is fatal for the sample. There is no retry path.
#[derive(Error, Debug)]
pub enum GpuError {
  /// Device call did not return `VK_SUCCESS`
  #[error("{call} failed: expected VK_SUCCESS, got {result:?}")]
  Call {
    call: &'static str,
    result: vk::Result,
  },

  #[error("{call} reported the swapchain as out of date, swapchain recreation is not supported")]
  OutOfDate { call: &'static str },

  #[error("Failed to load Vulkan: {0}")]
  Loading(#[from] ash::LoadingError),

  #[error("No physical device with a graphics+present queue found")]
  NoSuitableDevice,

  #[error("Surface does not offer any color format")]
  NoSurfaceFormat,

  #[error("Failed to read shader '{}': {source}", path.display())]
  Shader {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Presentation engine returned image {image_index}, swapchain has only {image_count} images")]
  ImageIndexOutOfRange { image_index: u32, image_count: usize },
}

pub type GpuResult<T> = std::result::Result<T, GpuError>;

impl GpuError {
  /// Use with `map_err` right after the device call, e.g.
  /// `device.create_fence(..).map_err(GpuError::call("vkCreateFence"))`
  pub fn call(call: &'static str) -> impl FnOnce(vk::Result) -> GpuError {
    move |result| GpuError::Call { call, result }
  }

  /// Same as `call`, but recognizes `ERROR_OUT_OF_DATE_KHR`.
  pub fn swapchain_call(call: &'static str) -> impl FnOnce(vk::Result) -> GpuError {
    move |result| match result {
      vk::Result::ERROR_OUT_OF_DATE_KHR => GpuError::OutOfDate { call },
      _ => GpuError::Call { call, result },
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn call_error_names_the_call_and_actual_status() {
    let err = GpuError::call("vkQueueSubmit")(vk::Result::ERROR_DEVICE_LOST);
    let msg = err.to_string();
    assert!(msg.contains("vkQueueSubmit"), "{}", msg);
    assert!(msg.contains("VK_SUCCESS"), "{}", msg);
    assert!(msg.contains("ERROR_DEVICE_LOST"), "{}", msg);
  }

  #[test]
  fn swapchain_call_detects_out_of_date() {
    let err = GpuError::swapchain_call("vkQueuePresentKHR")(vk::Result::ERROR_OUT_OF_DATE_KHR);
    assert!(matches!(
      err,
      GpuError::OutOfDate {
        call: "vkQueuePresentKHR"
      }
    ));

    let err = GpuError::swapchain_call("vkQueuePresentKHR")(vk::Result::ERROR_SURFACE_LOST_KHR);
    assert!(matches!(err, GpuError::Call { .. }));
  }
}
