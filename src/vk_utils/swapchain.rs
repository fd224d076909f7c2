use ash::extensions::khr::{Surface, Swapchain};
use ash::vk;
use log::trace;

use crate::gpu::{GpuError, GpuResult};
use crate::vk_utils::create_image_view;

/*
// https://github.com/zeux/niagara/blob/master/src/swapchain.cpp#L78
struct Swapchain
{
  VkSwapchainKHR swapchain;

  std::vector<VkImage> images;

  uint32_t width, height;
  uint32_t imageCount;
};
*/

/// Prefers B8G8R8A8_UNORM + SRGB_NONLINEAR, otherwise takes first offered format.
/// https://registry.khronos.org/vulkan/specs/1.3-extensions/man/html/VkSurfaceFormatKHR.html
pub fn get_swapchain_format(
  surface_loader: &Surface,
  surface_khr: vk::SurfaceKHR,
  phys_device: vk::PhysicalDevice,
) -> GpuResult<vk::SurfaceFormatKHR> {
  let surface_formats = unsafe {
    surface_loader
      .get_physical_device_surface_formats(phys_device, surface_khr)
      .map_err(GpuError::call("vkGetPhysicalDeviceSurfaceFormatsKHR"))?
  };
  choose_surface_format(&surface_formats).ok_or(GpuError::NoSurfaceFormat)
}

// https://stackoverflow.com/questions/66401081/vulkan-swapchain-format-unorm-vs-srgb
fn choose_surface_format(surface_formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
  let preferred = surface_formats.iter().find(|surface_fmt| {
    let fmt_ok = surface_fmt.format == vk::Format::B8G8R8A8_UNORM;
    let color_space_ok = surface_fmt.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR;
    fmt_ok && color_space_ok
  });

  preferred.or_else(|| surface_formats.first()).copied()
}

pub fn get_surface_capabilities(
  phys_device: vk::PhysicalDevice,
  surface_loader: &Surface,
  surface_khr: vk::SurfaceKHR,
) -> GpuResult<vk::SurfaceCapabilitiesKHR> {
  let surface_capabilities = unsafe {
    surface_loader
      .get_physical_device_surface_capabilities(phys_device, surface_khr)
      .map_err(GpuError::call("vkGetPhysicalDeviceSurfaceCapabilitiesKHR"))?
  };
  trace!("Surface_capabilities {:?}", surface_capabilities);
  Ok(surface_capabilities)
}

/// Surface decides, unless it lets the window decide (`u32::MAX`).
pub fn get_swapchain_extent(
  surface_capabilities: &vk::SurfaceCapabilitiesKHR,
  window_size: vk::Extent2D,
) -> vk::Extent2D {
  let current = surface_capabilities.current_extent;
  if current.width != u32::MAX {
    return current;
  }

  let min = surface_capabilities.min_image_extent;
  let max = surface_capabilities.max_image_extent;
  vk::Extent2D {
    width: window_size.width.clamp(min.width, max.width),
    height: window_size.height.clamp(min.height, max.height),
  }
}

/// One more than the minimum, so the app is not blocked by the presentation engine.
/// `max_image_count == 0` means there is no limit.
pub fn get_swapchain_image_count(surface_capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
  let desired = surface_capabilities.min_image_count + 1;
  if surface_capabilities.max_image_count > 0 {
    desired.min(surface_capabilities.max_image_count)
  } else {
    desired
  }
}

fn get_pre_transform(
  surface_capabilities: &vk::SurfaceCapabilitiesKHR,
) -> vk::SurfaceTransformFlagsKHR {
  let can_identity = surface_capabilities
    .supported_transforms
    .contains(vk::SurfaceTransformFlagsKHR::IDENTITY);
  if can_identity {
    vk::SurfaceTransformFlagsKHR::IDENTITY
  } else {
    surface_capabilities.current_transform
  }
}

/// https://registry.khronos.org/vulkan/specs/1.3-extensions/man/html/VkPresentModeKHR.html
/// https://github.com/EmbarkStudios/kajiya/blob/main/crates/lib/kajiya-backend/src/vulkan/swapchain.rs#L85
pub fn get_present_mode(
  surface_loader: &Surface,
  surface_khr: vk::SurfaceKHR,
  phys_device: vk::PhysicalDevice,
  vsync: bool,
) -> GpuResult<vk::PresentModeKHR> {
  let present_modes = unsafe {
    surface_loader
      .get_physical_device_surface_present_modes(phys_device, surface_khr)
      .map_err(GpuError::call("vkGetPhysicalDeviceSurfacePresentModesKHR"))?
  };
  Ok(choose_present_mode(&present_modes, vsync))
}

fn choose_present_mode(present_modes: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {
  let present_mode_preference = if vsync {
    [vk::PresentModeKHR::FIFO_RELAXED, vk::PresentModeKHR::FIFO]
  } else {
    [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE]
  };

  present_mode_preference
    .iter()
    .copied()
    .find(|mode| present_modes.contains(mode))
    .unwrap_or(vk::PresentModeKHR::FIFO) // FIFO is guaranteed
}

pub struct SwapchainCreateParams {
  pub surface_khr: vk::SurfaceKHR,
  pub surface_format: vk::SurfaceFormatKHR,
  pub surface_capabilities: vk::SurfaceCapabilitiesKHR,
  pub size: vk::Extent2D,
  pub present_mode: vk::PresentModeKHR,
}

pub fn create_swapchain_khr(
  swapchain_loader: &Swapchain,
  params: &SwapchainCreateParams,
) -> GpuResult<vk::SwapchainKHR> {
  let image_count = get_swapchain_image_count(&params.surface_capabilities);

  let create_info = vk::SwapchainCreateInfoKHR::builder()
    .surface(params.surface_khr)
    .min_image_count(image_count)
    .image_format(params.surface_format.format)
    .image_color_space(params.surface_format.color_space)
    .image_extent(params.size)
    .image_array_layers(1)
    .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
    .image_sharing_mode(vk::SharingMode::EXCLUSIVE) // one queue for graphics and present
    .present_mode(params.present_mode)
    .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
    .pre_transform(get_pre_transform(&params.surface_capabilities))
    .clipped(true)
    .build();

  let swapchain = unsafe {
    swapchain_loader
      .create_swapchain(&create_info, None)
      .map_err(GpuError::call("vkCreateSwapchainKHR"))?
  };
  trace!("Swapchain created");
  Ok(swapchain)
}

/// Images are owned by the swapchain. Views have to be destroyed by the caller.
pub fn create_swapchain_images(
  swapchain_loader: &Swapchain,
  swapchain: vk::SwapchainKHR,
  device: &ash::Device,
  image_format: vk::Format,
) -> GpuResult<(Vec<vk::Image>, Vec<vk::ImageView>)> {
  // auto destroyed with swapchain
  let swapchain_images = unsafe {
    swapchain_loader
      .get_swapchain_images(swapchain)
      .map_err(GpuError::call("vkGetSwapchainImagesKHR"))?
  };
  trace!("Will create {} swapchain images", swapchain_images.len());

  let swapchain_image_views = swapchain_images
    .iter()
    .map(|&image| create_image_view(device, image, image_format, vk::ImageAspectFlags::COLOR))
    .collect::<GpuResult<Vec<_>>>()?;

  trace!("Swapchain images created");
  Ok((swapchain_images, swapchain_image_views))
}
