use super::{error_text, render_message, status_suffix, titled_block};
use crate::api::{ApiError, BookEnvelope, TransportError};
use crate::query::Subscription;
use crate::ui::renderfns::availability;
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::{BookFormView, BorrowFormView};
use crate::ui::ViewContext;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Paragraph, Wrap};

/// View for displaying one book
pub struct BookDetailView {
  ctx: ViewContext,
  id: String,
  book: Subscription<BookEnvelope>,
}

impl BookDetailView {
  pub fn new(ctx: ViewContext, id: &str) -> Self {
    let book = ctx.catalog.book(id);
    Self {
      ctx,
      id: id.to_string(),
      book,
    }
  }

  fn is_not_found(&self) -> bool {
    matches!(
      self.book.error(),
      Some(ApiError::Transport(TransportError { status: Some(404), .. }))
    )
  }
}

impl View for BookDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        self.book.refetch();
        ViewAction::None
      }
      KeyCode::Char('e') => ViewAction::Push(Box::new(BookFormView::edit(self.ctx.clone(), &self.id))),
      KeyCode::Char('b') => {
        ViewAction::Push(Box::new(BorrowFormView::new(self.ctx.clone(), &self.id)))
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let title = match self.book.data() {
      Some(envelope) => format!(" {}{} ", envelope.data.title, status_suffix(&self.book)),
      None => format!(" Book{} ", status_suffix(&self.book)),
    };
    let block = titled_block(title);

    let Some(book) = self.book.data().map(|envelope| &envelope.data) else {
      let (text, color) = if self.is_not_found() {
        ("Book not found!".to_string(), Color::Red)
      } else if self.book.is_error() {
        (error_text(self.book.error()), Color::Red)
      } else {
        ("Loading book...".to_string(), Color::DarkGray)
      };
      render_message(frame, area, block, text, color);
      return;
    };

    let label = |text: &'static str| Span::styled(text, Style::default().fg(Color::DarkGray));
    let (status, status_color) = availability(book.available, book.copies);

    let mut lines = vec![
      Line::from(Span::styled(
        book.title.as_str(),
        Style::default().fg(Color::Cyan).bold(),
      )),
      Line::from(vec![label("by "), Span::raw(book.author.as_str())]),
      Line::default(),
      Line::from(vec![label("Genre:  "), Span::raw(book.genre.label())]),
      Line::from(vec![label("ISBN:   "), Span::raw(book.isbn.as_str())]),
      Line::from(vec![label("Copies: "), Span::raw(book.copies.to_string())]),
      Line::from(vec![
        label("Status: "),
        Span::styled(status, Style::default().fg(status_color)),
      ]),
    ];
    if let Some(created) = book.created_at {
      lines.push(Line::from(vec![
        label("Added:  "),
        Span::raw(created.format("%Y-%m-%d").to_string()),
      ]));
    }
    lines.push(Line::default());
    lines.push(Line::from(
      book
        .description
        .as_deref()
        .filter(|d| !d.is_empty())
        .unwrap_or("No description provided."),
    ));

    let paragraph = Paragraph::new(lines)
      .block(block)
      .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
  }

  fn breadcrumb_label(&self) -> String {
    self
      .book
      .data()
      .map(|envelope| envelope.data.title.clone())
      .unwrap_or_else(|| self.id.clone())
  }

  fn tick(&mut self) -> ViewAction {
    self.book.poll();
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new("e", "edit"),
      Shortcut::new("b", "borrow"),
      Shortcut::new("r", "refresh"),
      Shortcut::new("q", "back"),
    ]
  }
}
