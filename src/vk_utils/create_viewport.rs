use ash::vk;

/// Y-up, same as OpenGL. Needs Vulkan 1.1 (negative viewport height).
pub fn create_viewport(size: &vk::Extent2D) -> vk::Viewport {
  vk::Viewport {
    x: 0f32,
    y: size.height as f32, // flip vulkan coord system - important!
    width: size.width as f32,
    height: -(size.height as f32), // flip vulkan coord system - important!
    min_depth: 0f32,
    max_depth: 1.0f32,
  }
}

pub fn size_to_rect_vk(size: &vk::Extent2D) -> vk::Rect2D {
  vk::Rect2D {
    offset: vk::Offset2D { x: 0, y: 0 },
    extent: *size,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn viewport_is_flipped_and_covers_whole_target() {
    let size = vk::Extent2D {
      width: 800,
      height: 600,
    };
    let vp = create_viewport(&size);
    assert_eq!(vp.y, 600.0);
    assert_eq!(vp.height, -600.0);
    assert_eq!(vp.width, 800.0);

    let rect = size_to_rect_vk(&size);
    assert_eq!(rect.offset.x, 0);
    assert_eq!(rect.extent.width, 800);
    assert_eq!(rect.extent.height, 600);
  }
}
