use ash::vk;

use crate::gpu::{GpuError, GpuResult};

/*
https://vulkan-tutorial.com/Uniform_buffers/Descriptor_layout_and_buffer <3

You cannot bind a single shader resource to a buffer/texture. You can only bind a group
of resources as descriptor sets.

Steps:
  1. Create descriptor pool. Specify how many descriptors will be allocated
  2. Create descriptor set(s). This are connected to each shader. Each descriptor set
     contains some number of uniform buffers/textures, each assigned a `binding`.
  3. Connect the real data buffer to a (descriptor_set, binding) using `vkUpdateDescriptorSets`.
  4. Bind the descriptor sets before draw call: `vkCmdBindDescriptorSets`.

Here every frame slot gets one set in step 2 and step 3 happens once at startup.
Only step 4 runs per frame.
*/

/// Create layout for a single texture/sampler object.
/// That layout will be one of layouts gathered in DescriptorSetLayout.
pub fn create_texture_binding(
  binding: u32,
  stage_flags: vk::ShaderStageFlags,
) -> vk::DescriptorSetLayoutBinding {
  vk::DescriptorSetLayoutBinding::builder()
    .binding(binding)
    .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
    .descriptor_count(1)
    .stage_flags(stage_flags)
    .build()
}

pub fn create_descriptor_set_layout(
  device: &ash::Device,
  bindings: &[vk::DescriptorSetLayoutBinding],
) -> GpuResult<vk::DescriptorSetLayout> {
  let create_info = vk::DescriptorSetLayoutCreateInfo::builder()
    .bindings(bindings)
    .build();

  unsafe {
    device
      .create_descriptor_set_layout(&create_info, None)
      .map_err(GpuError::call("vkCreateDescriptorSetLayout"))
  }
}

/// Pool for `max_sets` sets of one combined image sampler each.
/// Sets can be freed one by one.
pub fn create_descriptor_pool(
  device: &ash::Device,
  max_sets: u32,
) -> GpuResult<vk::DescriptorPool> {
  let pool_sizes = [vk::DescriptorPoolSize {
    ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
    descriptor_count: max_sets,
  }];
  let create_info = vk::DescriptorPoolCreateInfo::builder()
    .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
    .max_sets(max_sets)
    .pool_sizes(&pool_sizes)
    .build();

  unsafe {
    device
      .create_descriptor_pool(&create_info, None)
      .map_err(GpuError::call("vkCreateDescriptorPool"))
  }
}

pub fn allocate_descriptor_set(
  device: &ash::Device,
  pool: vk::DescriptorPool,
  layout: vk::DescriptorSetLayout,
) -> GpuResult<vk::DescriptorSet> {
  let layouts = [layout];
  let alloc_info = vk::DescriptorSetAllocateInfo::builder()
    .descriptor_pool(pool)
    .set_layouts(&layouts)
    .build();

  let sets = unsafe {
    device
      .allocate_descriptor_sets(&alloc_info)
      .map_err(GpuError::call("vkAllocateDescriptorSets"))?
  };
  sets.first().copied().ok_or(GpuError::Call {
    call: "vkAllocateDescriptorSets",
    result: vk::Result::ERROR_OUT_OF_POOL_MEMORY,
  })
}

/// `vkUpdateDescriptorSets` for a single combined image sampler.
pub unsafe fn write_texture_descriptor(
  device: &ash::Device,
  descriptor_set: vk::DescriptorSet,
  binding: u32,
  image_view: vk::ImageView,
  image_layout: vk::ImageLayout,
  sampler: vk::Sampler,
) {
  // has to outlive vk::WriteDescriptorSet, which only holds a pointer to it
  let image_infos = [vk::DescriptorImageInfo {
    image_layout,
    image_view,
    sampler,
  }];
  let write = vk::WriteDescriptorSet::builder()
    .dst_set(descriptor_set)
    .dst_binding(binding)
    .dst_array_element(0)
    .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
    .image_info(&image_infos)
    .build();

  device.update_descriptor_sets(&[write], &[]);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn texture_binding_is_single_combined_sampler() {
    let binding = create_texture_binding(3, vk::ShaderStageFlags::FRAGMENT);
    assert_eq!(binding.binding, 3);
    assert_eq!(
      binding.descriptor_type,
      vk::DescriptorType::COMBINED_IMAGE_SAMPLER
    );
    assert_eq!(binding.descriptor_count, 1);
    assert_eq!(binding.stage_flags, vk::ShaderStageFlags::FRAGMENT);
  }
}
