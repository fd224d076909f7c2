mod vk_ctx;
mod vk_ctx_device;
mod vk_ctx_gpu_device;
mod vk_ctx_initialize;
mod vk_ctx_swapchain;

pub use vk_ctx::*;
pub use vk_ctx_device::*;
pub use vk_ctx_initialize::*;
pub use vk_ctx_swapchain::*;
