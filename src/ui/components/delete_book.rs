use super::{ConfirmDialog, ConfirmEvent, KeyResult};
use crate::api::{ApiError, Book, Catalog};
use crate::query::Mutation;
use crate::ui::view::Notice;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use tracing::info;

/// Confirm-then-delete flow shared by the views that list books.
pub struct DeleteBook {
  catalog: Catalog,
  dialog: ConfirmDialog,
  target: Option<(String, String)>,
  mutation: Mutation<()>,
}

impl DeleteBook {
  pub fn new(catalog: Catalog) -> Self {
    Self {
      catalog,
      dialog: ConfirmDialog::new(),
      target: None,
      mutation: Mutation::new(),
    }
  }

  pub fn is_active(&self) -> bool {
    self.dialog.is_active()
  }

  pub fn is_pending(&self) -> bool {
    self.mutation.is_pending()
  }

  /// Ask for confirmation before deleting `book`
  pub fn request(&mut self, book: &Book) {
    if self.mutation.is_pending() {
      return;
    }
    self.target = Some((book.id.clone(), book.title.clone()));
    self
      .dialog
      .show("Are you sure?", "This action cannot be undone!", "Yes, delete it!");
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<()> {
    match self.dialog.handle_key(key) {
      KeyResult::Event(ConfirmEvent::Confirmed) => {
        if let Some((id, title)) = self.target.take() {
          info!("Deleting book {} ({})", id, title);
          self.mutation.start(self.catalog.delete_book(&id));
        }
        KeyResult::Handled
      }
      KeyResult::Event(ConfirmEvent::Cancelled) => {
        self.target = None;
        KeyResult::Handled
      }
      KeyResult::Handled => KeyResult::Handled,
      KeyResult::NotHandled => KeyResult::NotHandled,
    }
  }

  /// Poll the delete request; yields the notice to show once it settles
  pub fn poll(&mut self) -> Option<Notice> {
    if !self.mutation.poll() {
      return None;
    }
    self.mutation.take_outcome().map(outcome_notice)
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    self.dialog.render_overlay(frame, area);
  }
}

fn outcome_notice(outcome: Result<(), ApiError>) -> Notice {
  match outcome {
    Ok(()) => Notice::success("The book has been deleted successfully."),
    Err(e) => Notice::error(e.user_message("Failed to delete the book.")),
  }
}
