use super::{book_table, error_text, render_message, status_suffix, titled_block};
use crate::api::{Book, BookPage, PageParams};
use crate::query::Subscription;
use crate::ui::components::{DeleteBook, KeyResult};
use crate::ui::ensure_valid_selection;
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::{BookDetailView, BookFormView, BorrowFormView};
use crate::ui::ViewContext;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::TableState;
use tracing::debug;

/// Paginated table of every book
pub struct BookListView {
  ctx: ViewContext,
  page: u32,
  books: Subscription<BookPage>,
  table_state: TableState,
  delete: DeleteBook,
}

impl BookListView {
  pub fn new(ctx: ViewContext) -> Self {
    let books = ctx.catalog.books(PageParams::new(1, ctx.page_size));
    let delete = DeleteBook::new(ctx.catalog.clone());
    Self {
      ctx,
      page: 1,
      books,
      table_state: TableState::default(),
      delete,
    }
  }

  fn books(&self) -> &[Book] {
    self.books.data().map(|p| p.data.as_slice()).unwrap_or(&[])
  }

  /// Total pages, once the first page has loaded
  fn page_count(&self) -> Option<u64> {
    self.books.data().map(|p| p.meta.page_count())
  }

  fn selected(&self) -> Option<&Book> {
    self.table_state.selected().and_then(|i| self.books().get(i))
  }

  fn go_to_page(&mut self, page: u32) {
    if page == self.page || page == 0 {
      return;
    }
    debug!("Book list page {} -> {}", self.page, page);
    self.page = page;
    self.books = self
      .ctx
      .catalog
      .books(PageParams::new(page, self.ctx.page_size));
    self.table_state.select(Some(0));
  }

  fn next_page(&mut self) {
    if let Some(count) = self.page_count() {
      if u64::from(self.page) < count {
        self.go_to_page(self.page + 1);
      }
    }
  }

  fn prev_page(&mut self) {
    if self.page > 1 {
      self.go_to_page(self.page - 1);
    }
  }

  fn title(&self) -> String {
    let suffix = status_suffix(&self.books);
    match self.page_count() {
      Some(count) if count > 1 => format!(" Books (Page {} of {}){} ", self.page, count, suffix),
      _ => format!(" Books{} ", suffix),
    }
  }
}

impl View for BookListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.delete.handle_key(key) != KeyResult::NotHandled {
      return ViewAction::None;
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
      KeyCode::Char('n') | KeyCode::Right => self.next_page(),
      KeyCode::Char('p') | KeyCode::Left => self.prev_page(),
      KeyCode::Char('r') => self.books.refetch(),
      KeyCode::Char('c') => {
        return ViewAction::Push(Box::new(BookFormView::create(self.ctx.clone())));
      }
      KeyCode::Enter => {
        if let Some(book) = self.selected() {
          return ViewAction::Push(Box::new(BookDetailView::new(self.ctx.clone(), &book.id)));
        }
      }
      KeyCode::Char('e') => {
        if let Some(book) = self.selected() {
          return ViewAction::Push(Box::new(BookFormView::edit(self.ctx.clone(), &book.id)));
        }
      }
      KeyCode::Char('b') => {
        if let Some(book) = self.selected() {
          return ViewAction::Push(Box::new(BorrowFormView::new(self.ctx.clone(), &book.id)));
        }
      }
      KeyCode::Char('d') => {
        if let Some(book) = self.selected().cloned() {
          self.delete.request(&book);
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let block = titled_block(self.title());

    if self.books().is_empty() {
      let (text, color) = if self.books.is_error() {
        (error_text(self.books.error()), Color::Red)
      } else if self.books.is_loading() {
        ("Loading books...".to_string(), Color::DarkGray)
      } else {
        ("No books found.".to_string(), Color::DarkGray)
      };
      render_message(frame, area, block, text, color);
    } else {
      let len = self.books().len();
      ensure_valid_selection(&mut self.table_state, len);
      let books = self.books.data().map(|p| p.data.as_slice()).unwrap_or(&[]);
      frame.render_stateful_widget(book_table(books, block), area, &mut self.table_state);
    }

    self.delete.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Books".to_string()
  }

  fn context(&self) -> Option<String> {
    match self.page_count() {
      Some(count) if count > 1 => Some(format!("Page {} of {}", self.page, count)),
      _ => None,
    }
  }

  fn tick(&mut self) -> ViewAction {
    self.books.poll();

    // Deleting the last book on the last page leaves us past the end.
    if let Some(count) = self.page_count() {
      if self.books().is_empty() && count > 0 && u64::from(self.page) > count {
        self.go_to_page(count as u32);
      }
    }

    match self.delete.poll() {
      Some(notice) => ViewAction::Notify(notice),
      None => ViewAction::None,
    }
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("n/p", "page").with_priority(20),
      Shortcut::new("c", "create"),
      Shortcut::new("e", "edit"),
      Shortcut::new("b", "borrow"),
      Shortcut::new("d", "delete"),
      Shortcut::new("r", "refresh"),
    ]
  }
}
