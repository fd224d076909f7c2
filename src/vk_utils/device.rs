use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use ash::extensions::{
  ext::DebugUtils,
  khr::{Surface, Swapchain},
};
use ash::vk;
use log::{info, trace};
use raw_window_handle::HasRawDisplayHandle;

use crate::gpu::{GpuError, GpuResult};

const VALIDATION_LAYER_NAME: &[u8] = b"VK_LAYER_KHRONOS_validation\0";

fn get_app_version() -> u32 {
  let to_u32 = |s: &str| s.parse::<u32>().unwrap_or(0);

  vk::make_api_version(
    0,
    to_u32(env!("CARGO_PKG_VERSION_MAJOR")),
    to_u32(env!("CARGO_PKG_VERSION_MINOR")),
    to_u32(env!("CARGO_PKG_VERSION_PATCH")),
  )
}

fn get_layer_names(graphics_debugging: bool) -> Vec<*const c_char> {
  let mut layer_names = Vec::new();
  if graphics_debugging {
    layer_names.push(VALIDATION_LAYER_NAME.as_ptr() as *const c_char);
  }
  layer_names
}

/// Whatever the windowing system needs for surfaces + debug utils if requested.
fn get_extension_names(
  window: &winit::window::Window,
  graphics_debugging: bool,
) -> GpuResult<Vec<*const c_char>> {
  let surface_extensions = ash_window::enumerate_required_extensions(window.raw_display_handle())
    .map_err(GpuError::call("vkEnumerateInstanceExtensionProperties"))?;

  let mut names = surface_extensions.to_vec();
  if graphics_debugging {
    names.push(DebugUtils::name().as_ptr());
  }
  Ok(names)
}

pub fn create_instance(
  entry: &ash::Entry,
  window: &winit::window::Window,
  graphics_debugging: bool,
) -> GpuResult<ash::Instance> {
  let app_name = CString::new(env!("CARGO_PKG_NAME")).unwrap_or_default();

  // 1.1 for negative viewport height
  let app_info = vk::ApplicationInfo::builder()
    .application_name(&app_name)
    .application_version(get_app_version())
    .api_version(vk::make_api_version(0, 1, 1, 0))
    .build();

  // https://github.com/EmbarkStudios/kajiya/blob/main/crates/lib/kajiya-backend/src/vulkan/instance.rs#L52
  let layers_names_raw = get_layer_names(graphics_debugging);
  let extension_names_raw = get_extension_names(window, graphics_debugging)?;

  let create_info = vk::InstanceCreateInfo::builder()
    .application_info(&app_info)
    .enabled_layer_names(&layers_names_raw)
    .enabled_extension_names(&extension_names_raw)
    .build();

  let instance = unsafe {
    entry
      .create_instance(&create_info, None)
      .map_err(GpuError::call("vkCreateInstance"))?
  };

  trace!("Ash instance created");
  Ok(instance)
}

fn find_queue_family(
  instance: &ash::Instance,
  surface_loader: &Surface,
  surface_khr: vk::SurfaceKHR,
  phys_device: vk::PhysicalDevice,
) -> GpuResult<Option<u32>> {
  let q_props = unsafe { instance.get_physical_device_queue_family_properties(phys_device) };

  for (index, q) in q_props.iter().enumerate() {
    let is_gfx = q.queue_flags.contains(vk::QueueFlags::GRAPHICS);
    let is_present_support = unsafe {
      surface_loader
        .get_physical_device_surface_support(phys_device, index as u32, surface_khr)
        .map_err(GpuError::call("vkGetPhysicalDeviceSurfaceSupportKHR"))?
    };

    if is_gfx && is_present_support {
      return Ok(Some(index as u32));
    }
  }
  Ok(None)
}

/// Discrete GPUs go first, then whatever else can render and present.
fn get_device_type_rank(device_type: vk::PhysicalDeviceType) -> u32 {
  match device_type {
    vk::PhysicalDeviceType::DISCRETE_GPU => 0,
    vk::PhysicalDeviceType::INTEGRATED_GPU => 1,
    vk::PhysicalDeviceType::VIRTUAL_GPU => 2,
    vk::PhysicalDeviceType::CPU => 3,
    _ => 4,
  }
}

/// Picks physical device e.g. "GeForce GTX 1050 Ti" and graphic queue family index.
/// Same queue is used to present the result.
pub fn pick_physical_device_and_queue_family_idx(
  instance: &ash::Instance,
  surface_loader: &Surface,
  surface_khr: vk::SurfaceKHR,
) -> GpuResult<(vk::PhysicalDevice, u32)> {
  let phys_devices = unsafe {
    instance
      .enumerate_physical_devices()
      .map_err(GpuError::call("vkEnumeratePhysicalDevices"))?
  };
  trace!("Found {} physical devices", phys_devices.len());

  let mut candidates = Vec::with_capacity(phys_devices.len());
  for phys_device in phys_devices {
    let props = unsafe { instance.get_physical_device_properties(phys_device) };
    if let Some(queue_family_idx) =
      find_queue_family(instance, surface_loader, surface_khr, phys_device)?
    {
      candidates.push((
        get_device_type_rank(props.device_type),
        phys_device,
        queue_family_idx,
      ));
    }
  }
  candidates.sort_by_key(|c| c.0);

  let (_, phys_device, queue_family_idx) = candidates
    .first()
    .copied()
    .ok_or(GpuError::NoSuitableDevice)?;

  let props = unsafe { instance.get_physical_device_properties(phys_device) };
  let device_name = unsafe { CStr::from_ptr(props.device_name.as_ptr()) };
  info!("Using physical device: {:?}", device_name);
  Ok((phys_device, queue_family_idx))
}

/// Pick logical device. Only extension is the swapchain.
pub fn pick_device_and_queue(
  instance: &ash::Instance,
  phys_device: vk::PhysicalDevice,
  queue_family_index: u32,
) -> GpuResult<(ash::Device, vk::Queue)> {
  trace!("Will pick logical device");
  let queue_prio = [1.0f32]; // only one queue
  let queue_create_infos = [vk::DeviceQueueCreateInfo::builder()
    .queue_family_index(queue_family_index)
    .queue_priorities(&queue_prio)
    .build()];

  let device_extension_names_raw = [Swapchain::name().as_ptr()];
  let features = vk::PhysicalDeviceFeatures::default();

  let device_create_info = vk::DeviceCreateInfo::builder()
    .queue_create_infos(&queue_create_infos)
    .enabled_extension_names(&device_extension_names_raw)
    .enabled_features(&features)
    .build();

  let device: ash::Device = unsafe {
    instance
      .create_device(phys_device, &device_create_info, None)
      .map_err(GpuError::call("vkCreateDevice"))?
  };
  trace!("Logical device selected");

  let queue = unsafe { device.get_device_queue(queue_family_index, 0) }; // only one queue created above
  trace!("Queue on logical device selected");

  Ok((device, queue))
}
