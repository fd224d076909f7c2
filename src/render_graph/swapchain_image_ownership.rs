/// Remembers which frame slot last rendered into each swapchain image and
/// has not been confirmed as finished yet.
///
/// The presentation engine is free to hand out the same image again before the
/// frame that wrote to it retired (e.g. present queue shallower than the ring).
/// The per-slot fence only protects the slot's own resources, so reacquiring
/// an image needs a second, separate wait on the fence of its previous writer.
///
/// One entry per swapchain image index, so there can never be two owners.
pub struct SwapchainImageOwnership {
  owners: Vec<Option<usize>>,
}

impl SwapchainImageOwnership {
  pub fn new(image_count: usize) -> Self {
    Self {
      owners: vec![None; image_count],
    }
  }

  pub fn image_count(&self) -> usize {
    self.owners.len()
  }

  /// Overwrites previous owner, if any.
  pub fn record_ownership(&mut self, image_index: u32, slot_idx: usize) {
    *self.entry(image_index) = Some(slot_idx);
  }

  /// Returns slot that still may be writing to the image and forgets about it.
  /// Absence means the image can be reused right away.
  pub fn resolve_hazard(&mut self, image_index: u32) -> Option<usize> {
    self.entry(image_index).take()
  }

  /// Peek without resolving.
  pub fn owner(&self, image_index: u32) -> Option<usize> {
    self.owners.get(image_index as usize).copied().flatten()
  }

  fn entry(&mut self, image_index: u32) -> &mut Option<usize> {
    let image_count = self.owners.len();
    self.owners.get_mut(image_index as usize).unwrap_or_else(|| {
      panic!(
        "Requested owner of swapchain image {}, there are only {}",
        image_index, image_count
      )
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_map_reports_no_hazard() {
    let mut ownership = SwapchainImageOwnership::new(3);
    for image in 0..3 {
      assert_eq!(ownership.resolve_hazard(image), None);
    }
  }

  #[test]
  fn resolve_returns_owner_once() {
    let mut ownership = SwapchainImageOwnership::new(3);
    ownership.record_ownership(1, 2);

    assert_eq!(ownership.resolve_hazard(1), Some(2));
    assert_eq!(ownership.resolve_hazard(1), None);
    assert_eq!(ownership.owner(1), None);
  }

  #[test]
  fn record_overwrites_previous_owner() {
    let mut ownership = SwapchainImageOwnership::new(2);
    ownership.record_ownership(0, 0);
    ownership.record_ownership(0, 1);

    assert_eq!(ownership.owner(0), Some(1));
    assert_eq!(ownership.resolve_hazard(0), Some(1));
    assert_eq!(ownership.resolve_hazard(0), None);
  }

  #[test]
  fn entries_are_independent_per_image() {
    let mut ownership = SwapchainImageOwnership::new(3);
    ownership.record_ownership(0, 0);
    ownership.record_ownership(2, 1);

    assert_eq!(ownership.resolve_hazard(2), Some(1));
    assert_eq!(ownership.owner(0), Some(0));
    assert_eq!(ownership.owner(1), None);
  }

  #[test]
  #[should_panic(expected = "there are only 2")]
  fn out_of_range_image_panics() {
    let mut ownership = SwapchainImageOwnership::new(2);
    ownership.record_ownership(5, 0);
  }
}
