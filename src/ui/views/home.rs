use super::{book_table, error_text, render_message, status_suffix, titled_block};
use crate::api::{Book, BookPage, PageParams};
use crate::query::Subscription;
use crate::ui::components::{DeleteBook, KeyResult};
use crate::ui::ensure_valid_selection;
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::{BookDetailView, BookFormView, BookListView, BorrowFormView};
use crate::ui::ViewContext;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Paragraph, TableState, Wrap};

const RECENT_BOOKS: usize = 6;

/// Landing view: banner plus the most recently added books
pub struct HomeView {
  ctx: ViewContext,
  books: Subscription<BookPage>,
  recent: Vec<Book>,
  table_state: TableState,
  delete: DeleteBook,
}

impl HomeView {
  pub fn new(ctx: ViewContext) -> Self {
    let books = ctx.catalog.books(PageParams::default());
    let delete = DeleteBook::new(ctx.catalog.clone());
    let mut view = Self {
      ctx,
      books,
      recent: Vec::new(),
      table_state: TableState::default(),
      delete,
    };
    view.refresh_recent();
    view
  }

  fn refresh_recent(&mut self) {
    self.recent = self
      .books
      .data()
      .map(|page| page.most_recent(RECENT_BOOKS))
      .unwrap_or_default();
  }

  fn selected(&self) -> Option<&Book> {
    self.table_state.selected().and_then(|i| self.recent.get(i))
  }
}

impl View for HomeView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.delete.handle_key(key) != KeyResult::NotHandled {
      return ViewAction::None;
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
      KeyCode::Char('r') => self.books.refetch(),
      KeyCode::Char('a') => {
        return ViewAction::Push(Box::new(BookListView::new(self.ctx.clone())));
      }
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
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(5), Constraint::Min(3)])
      .split(area);

    let banner = vec![
      Line::from(Span::styled(
        "Welcome to BookNest",
        Style::default().fg(Color::Cyan).bold(),
      )),
      Line::from("A minimal, fast and elegant library management system."),
      Line::from(Span::styled(
        "<a> all books   <c> add a book   <:summary> borrowed books",
        Style::default().fg(Color::DarkGray),
      )),
    ];
    let banner = Paragraph::new(banner)
      .alignment(Alignment::Center)
      .wrap(Wrap { trim: true })
      .block(titled_block(" BookNest ".to_string()));
    frame.render_widget(banner, chunks[0]);

    let title = format!(" Latest Books{} ", status_suffix(&self.books));
    let block = titled_block(title);

    if self.recent.is_empty() {
      let (text, color) = if self.books.is_error() {
        (error_text(self.books.error()), Color::Red)
      } else if self.books.is_loading() {
        ("Loading books...".to_string(), Color::DarkGray)
      } else {
        ("No books yet. Press 'c' to add one.".to_string(), Color::DarkGray)
      };
      render_message(frame, chunks[1], block, text, color);
    } else {
      ensure_valid_selection(&mut self.table_state, self.recent.len());
      let table = book_table(&self.recent, block);
      frame.render_stateful_widget(table, chunks[1], &mut self.table_state);
    }

    self.delete.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Home".to_string()
  }

  fn context(&self) -> Option<String> {
    self.delete.is_pending().then(|| "deleting...".to_string())
  }

  fn tick(&mut self) -> ViewAction {
    if self.books.poll() {
      self.refresh_recent();
    }
    match self.delete.poll() {
      Some(notice) => ViewAction::Notify(notice),
      None => ViewAction::None,
    }
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("enter", "view"),
      Shortcut::new("e", "edit"),
      Shortcut::new("b", "borrow"),
      Shortcut::new("d", "delete"),
      Shortcut::new("r", "refresh"),
    ]
  }
}
