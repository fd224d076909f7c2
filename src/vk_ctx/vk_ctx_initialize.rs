use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::mem::ManuallyDrop;

use ash::extensions::khr::{Surface, Swapchain};
use ash::vk;
use log::{info, trace};
use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle};

use crate::config::Config;
use crate::gpu::{GpuError, GpuResult};
use crate::vk_ctx::{VkCtx, VkCtxDevice, VkCtxSwapchain};
use crate::vk_utils::*;

fn get_window_size(window: &winit::window::Window) -> vk::Extent2D {
  let size = window.inner_size();
  vk::Extent2D {
    width: size.width,
    height: size.height,
  }
}

// https://github.com/MaikKlein/ash/blob/master/examples/src/lib.rs#L332
pub fn vk_ctx_initialize(window: &winit::window::Window, config: &Config) -> GpuResult<VkCtx> {
  let entry = unsafe { ash::Entry::load()? };
  let instance = create_instance(&entry, window, config.graphics_debugging)?;
  let debug_utils = if config.graphics_debugging {
    Some(setup_debug_reporting(&entry, &instance)?)
  } else {
    None
  };

  // surface data
  let surface_loader = Surface::new(&entry, &instance);
  let surface_khr = unsafe {
    ash_window::create_surface(
      &entry,
      &instance,
      window.raw_display_handle(),
      window.raw_window_handle(),
      None,
    )
    .map_err(GpuError::call("vkCreateSurfaceKHR"))?
  };

  // devices
  let (phys_device, queue_family_index) =
    pick_physical_device_and_queue_family_idx(&instance, &surface_loader, surface_khr)?;
  let (device, queue) = pick_device_and_queue(&instance, phys_device, queue_family_index)?;

  // swapchain - prepare
  let surface_format = get_swapchain_format(&surface_loader, surface_khr, phys_device)?;
  let surface_capabilities = get_surface_capabilities(phys_device, &surface_loader, surface_khr)?;
  let window_size = get_swapchain_extent(&surface_capabilities, get_window_size(window));
  let present_mode = get_present_mode(&surface_loader, surface_khr, phys_device, config.vsync)?;
  trace!(
    "window_size {:?}, surface format {:?}, present mode {:?}",
    window_size,
    surface_format,
    present_mode
  );

  // swapchain
  let swapchain_loader = Swapchain::new(&instance, &device);
  let swapchain = create_swapchain_khr(
    &swapchain_loader,
    &SwapchainCreateParams {
      surface_khr,
      surface_format,
      surface_capabilities,
      size: window_size,
      present_mode,
    },
  )?;
  let (images, image_views) =
    create_swapchain_images(&swapchain_loader, swapchain, &device, surface_format.format)?;
  info!(
    "Swapchain has {} images, will use as many frames in flight",
    images.len()
  );

  // pools. Every frame slot gets one descriptor set
  let command_pool = create_command_pool(&device, queue_family_index)?;
  let descriptor_pool = create_descriptor_pool(&device, images.len() as u32)?;
  let pipeline_cache = create_pipeline_cache(&device)?;

  // gpu memory allocator
  let allocator = unsafe {
    vma::Allocator::new(vma::AllocatorCreateInfo::new(
      &instance,
      &device,
      phys_device,
    ))
    .map_err(GpuError::call("vmaCreateAllocator"))?
  };

  Ok(VkCtx {
    entry,
    instance,
    device: VkCtxDevice {
      phys_device,
      queue_family_index,
      device,
      queue,
    },
    swapchain: VkCtxSwapchain {
      swapchain_loader,
      swapchain,
      size: window_size,
      surface_format,
      present_mode,
      images,
      image_views,
    },
    command_pool,
    descriptor_pool,
    pipeline_cache,
    allocator: ManuallyDrop::new(allocator),
    image_allocations: RefCell::new(HashMap::new()),
    surface_loader,
    surface_khr,
    debug_utils,
    suboptimal_reported: Cell::new(false),
  })
}
