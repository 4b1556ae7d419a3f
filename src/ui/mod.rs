pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::api::Catalog;
use ratatui::widgets::TableState;

/// What every view needs to build itself and the views it navigates to.
#[derive(Clone)]
pub struct ViewContext {
  pub catalog: Catalog,
  pub page_size: u32,
}

/// Keep a table selection inside `0..len`, selecting the first row when unset.
pub fn ensure_valid_selection(state: &mut TableState, len: usize) {
  if len == 0 {
    state.select(None);
    return;
  }
  match state.selected() {
    Some(i) if i >= len => state.select(Some(len - 1)),
    None => state.select(Some(0)),
    _ => {}
  }
}
