use std::ffi::CStr;
use std::fs::File;
use std::path::{Path, PathBuf};

use ash::vk;
use log::trace;

use crate::gpu::{GpuError, GpuResult};

// https://github.com/zeux/niagara/blob/master/src/shaders.cpp

const SHADER_ENTRY_POINT: &[u8] = b"main\0";

/// SPIR-V of every shader the app uses. Loaded once at startup,
/// pipelines are then created from borrowed words.
pub struct ShaderAssets {
  pub triangle_vert: Vec<u32>,
  pub triangle_frag: Vec<u32>,
  pub present_vert: Vec<u32>,
  pub present_frag: Vec<u32>,
}

impl ShaderAssets {
  pub const DEFAULT_DIR: &'static str = "./assets/shaders-compiled";

  pub fn load(dir: &Path) -> GpuResult<Self> {
    Ok(Self {
      triangle_vert: read_spirv(&dir.join("triangle.vert.spv"))?,
      triangle_frag: read_spirv(&dir.join("triangle.frag.spv"))?,
      present_vert: read_spirv(&dir.join("present.vert.spv"))?,
      present_frag: read_spirv(&dir.join("present.frag.spv"))?,
    })
  }
}

pub fn read_spirv(path: &Path) -> GpuResult<Vec<u32>> {
  trace!("Loading shader from {}", path.to_string_lossy());
  let to_err = |source| GpuError::Shader {
    path: PathBuf::from(path),
    source,
  };

  let mut file = File::open(path).map_err(to_err)?;
  ash::util::read_spv(&mut file).map_err(to_err)
}

pub fn create_shader_module(device: &ash::Device, spirv: &[u32]) -> GpuResult<vk::ShaderModule> {
  let create_info = vk::ShaderModuleCreateInfo::builder().code(spirv).build();
  unsafe {
    device
      .create_shader_module(&create_info, None)
      .map_err(GpuError::call("vkCreateShaderModule"))
  }
}

pub fn create_shader_stage(
  stage: vk::ShaderStageFlags,
  module: vk::ShaderModule,
) -> vk::PipelineShaderStageCreateInfo {
  let shader_fn_name = unsafe { CStr::from_bytes_with_nul_unchecked(SHADER_ENTRY_POINT) };
  vk::PipelineShaderStageCreateInfo::builder()
    .stage(stage)
    .module(module)
    .name(shader_fn_name)
    .build()
}

/// Vertex + fragment modules. Destroy both right after the pipeline was created.
pub fn load_render_shaders(
  device: &ash::Device,
  vert: &[u32],
  frag: &[u32],
) -> GpuResult<(vk::ShaderModule, vk::ShaderModule)> {
  let module_vs = create_shader_module(device, vert)?;
  let module_fs = match create_shader_module(device, frag) {
    Ok(m) => m,
    Err(e) => {
      unsafe { device.destroy_shader_module(module_vs, None) };
      return Err(e);
    }
  };
  Ok((module_vs, module_fs))
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;

  fn temp_file(name: &str, bytes: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
      "overlapping-frames-{}-{}",
      std::process::id(),
      name
    ));
    let mut file = File::create(&path).unwrap();
    file.write_all(bytes).unwrap();
    path
  }

  #[test]
  fn read_spirv_returns_words() {
    let mut bytes = Vec::new();
    for word in [0x0723_0203u32, 0x0001_0000, 42].iter() {
      bytes.extend_from_slice(&word.to_le_bytes());
    }
    let path = temp_file("ok.spv", &bytes);

    let words = read_spirv(&path).unwrap();
    assert_eq!(words, vec![0x0723_0203, 0x0001_0000, 42]);
    std::fs::remove_file(path).unwrap();
  }

  #[test]
  fn read_spirv_reports_path_of_missing_file() {
    let path = Path::new("./does-not-exist/triangle.vert.spv");
    let err = read_spirv(path).unwrap_err();
    match &err {
      GpuError::Shader { path: p, .. } => assert_eq!(p, path),
      other => panic!("expected GpuError::Shader, got {:?}", other),
    }
    assert!(err.to_string().contains("triangle.vert.spv"));
  }

  #[test]
  fn read_spirv_rejects_truncated_file() {
    let path = temp_file("truncated.spv", &[0x03, 0x02, 0x23]);
    assert!(matches!(read_spirv(&path), Err(GpuError::Shader { .. })));
    std::fs::remove_file(path).unwrap();
  }

  #[test]
  fn missing_asset_dir_fails_on_first_shader() {
    let err = ShaderAssets::load(Path::new("./does-not-exist")).err().unwrap();
    assert!(err.to_string().contains("triangle.vert.spv"));
  }
}
