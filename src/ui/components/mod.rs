use ratatui::layout::Rect;

mod command_input;
mod confirm_dialog;
mod delete_book;
mod genre_picker;
mod input;

pub use command_input::{CommandEvent, CommandInput};
pub use confirm_dialog::{ConfirmDialog, ConfirmEvent};
pub use delete_book::DeleteBook;
pub use genre_picker::{GenrePicker, GenrePickerEvent};
pub use input::{InputResult, TextInput};

/// How a component responded to a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Consumed, nothing for the parent to do
  Handled,
  /// Consumed, and the parent should process this event
  Event(T),
  /// Not consumed, parent should try next handler
  NotHandled,
}

/// Center a `width` x `height` box inside `area`, clamped to fit.
pub(crate) fn centered(area: Rect, width: u16, height: u16) -> Rect {
  let width = width.min(area.width);
  let height = height.min(area.height);
  Rect::new(
    area.x + (area.width - width) / 2,
    area.y + (area.height - height) / 2,
    width,
    height,
  )
}
