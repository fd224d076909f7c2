use std::{collections::VecDeque, time::Instant};

use crate::utils::get_simple_type_name;

// Delta times are filtered over _this many_ frames.
const DT_FILTER_WIDTH: usize = 20;

pub type FrameIdx = u64;

/// Heavily inspired by:
/// - https://github.com/EmbarkStudios/kajiya/blob/main/crates/lib/kajiya-simple/src/main_loop.rs#L329
/// - https://github.com/kayru/imgv/blob/main/src/main.rs#L918
pub struct AppTimer {
  /// Frames started so far
  frame_idx: FrameIdx,
  last_frame_start: Instant,
  delta_time: f32,
  /// Circular buffer for delta times
  dt_queue: VecDeque<f32>,
}

impl AppTimer {
  pub fn new() -> Self {
    Self {
      frame_idx: 0,
      last_frame_start: Instant::now(),
      delta_time: 0.0,
      dt_queue: VecDeque::with_capacity(DT_FILTER_WIDTH),
    }
  }

  #[allow(dead_code)]
  pub fn frame_idx(&self) -> FrameIdx {
    self.frame_idx
  }

  /// @return filtered delta time in seconds
  pub fn mark_start_frame(&mut self) -> f32 {
    let now = Instant::now();
    let dt_duration = now - self.last_frame_start;
    self.last_frame_start = now;
    self.push_delta_time(dt_duration.as_secs_f32())
  }

  fn push_delta_time(&mut self, dt_raw: f32) -> f32 {
    self.inc_frame_idx();

    while self.dt_queue.len() >= DT_FILTER_WIDTH {
      self.dt_queue.pop_front();
    }
    self.dt_queue.push_back(dt_raw);

    self.delta_time = self.calc_average_frame_time();
    self.delta_time
  }

  fn calc_average_frame_time(&self) -> f32 {
    let sum = self.dt_queue.iter().copied().sum::<f32>();
    let count = self.dt_queue.len();
    sum / (count as f32)
  }

  fn inc_frame_idx(&mut self) {
    match self.frame_idx.checked_add(1) {
      Some(e) => self.frame_idx = e,
      _ => panic!(
        "Integer overflow in {}.inc_frame_idx(). How long did the app run?!",
        get_simple_type_name::<Self>()
      ),
    }
  }

  pub fn delta_time_ms(&self) -> f32 {
    self.delta_time * 1000.0
  }

  pub fn fps(&self) -> f32 {
    if self.delta_time > 0.0 {
      1.0 / self.delta_time
    } else {
      0.0
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn delta_time_is_averaged() {
    let mut timer = AppTimer::new();
    timer.push_delta_time(0.010);
    let dt = timer.push_delta_time(0.030);

    assert!((dt - 0.020).abs() < 1e-6);
    assert!((timer.delta_time_ms() - 20.0).abs() < 1e-3);
    assert!((timer.fps() - 50.0).abs() < 1e-2);
    assert_eq!(timer.frame_idx(), 2);
  }

  #[test]
  fn old_samples_fall_out_of_the_window() {
    let mut timer = AppTimer::new();
    for _ in 0..DT_FILTER_WIDTH {
      timer.push_delta_time(1.0);
    }
    let mut dt = 0.0;
    for _ in 0..DT_FILTER_WIDTH {
      dt = timer.push_delta_time(0.016);
    }

    assert!((dt - 0.016).abs() < 1e-6);
    assert_eq!(timer.dt_queue.len(), DT_FILTER_WIDTH);
  }

  #[test]
  fn fresh_timer_reports_zero() {
    let timer = AppTimer::new();
    assert_eq!(timer.frame_idx(), 0);
    assert_eq!(timer.fps(), 0.0);
  }
}
