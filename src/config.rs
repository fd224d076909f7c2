use glam::Vec3;
use log::LevelFilter;

use crate::gpu::TIMEOUT_INFINITE;
use crate::utils::color_hex_to_vec;

pub struct Config {
  // window
  pub window_title: &'static str,
  pub window_width: f64,
  pub window_height: f64,
  /// FIFO if true, otherwise MAILBOX/IMMEDIATE when available
  pub vsync: bool,
  /// Validation layers + debug messenger
  pub graphics_debugging: bool,
  /// Background of the triangle pass
  pub clear_color: Vec3,
  /// Used for both fence waits and image acquire. Nanoseconds.
  pub fence_timeout_ns: u64,
  /// Exit after this many frames. `None` runs until the window is closed.
  pub max_frames: Option<u64>,
  pub log_level: LevelFilter,
  /// Log average frame time every _this many_ frames. 0 to disable.
  pub frame_stats_every: u64,
}

impl Config {
  pub const ENV_MAX_FRAMES: &'static str = "OVERLAPPING_FRAMES_MAX_FRAMES";
  pub const ENV_NO_VSYNC: &'static str = "OVERLAPPING_FRAMES_NO_VSYNC";

  pub fn new() -> Config {
    let clear_col: u8 = 30;

    let mut config = Config {
      window_title: "Overlapping frames",
      window_width: 800f64,
      window_height: 600f64,
      vsync: true,
      graphics_debugging: cfg!(debug_assertions),
      clear_color: color_hex_to_vec(clear_col, clear_col, clear_col + 10),
      fence_timeout_ns: TIMEOUT_INFINITE,
      max_frames: None,
      log_level: LevelFilter::Info,
      frame_stats_every: 300,
    };
    config.apply_env_overrides(|key| std::env::var(key).ok());
    config
  }

  /// `lookup` returns the value of an environment variable, if set.
  fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(max_frames) = lookup(Self::ENV_MAX_FRAMES).as_deref().and_then(parse_max_frames) {
      self.max_frames = Some(max_frames);
    }
    if lookup(Self::ENV_NO_VSYNC).is_some() {
      self.vsync = false;
    }
  }

  pub fn should_exit_after(&self, frames_drawn: u64) -> bool {
    match self.max_frames {
      Some(max_frames) => frames_drawn >= max_frames,
      None => false,
    }
  }
}

/// Positive integer, anything else is ignored.
pub fn parse_max_frames(value: &str) -> Option<u64> {
  match value.trim().parse::<u64>() {
    Ok(0) | Err(_) => None,
    Ok(v) => Some(v),
  }
}
