use super::{error_text, render_message, status_suffix, titled_block};
use crate::api::{ApiError, Book, BookEnvelope, BorrowRequest, TransportError};
use crate::query::{Mutation, Subscription};
use crate::ui::components::{InputResult, TextInput};
use crate::ui::renderfns::availability;
use crate::ui::view::{Notice, Shortcut, View, ViewAction};
use crate::ui::views::BorrowSummaryView;
use crate::ui::ViewContext;
use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
  Quantity,
  DueDate,
  Submit,
}

impl Focus {
  fn next(self) -> Self {
    match self {
      Focus::Quantity => Focus::DueDate,
      Focus::DueDate => Focus::Submit,
      Focus::Submit => Focus::Quantity,
    }
  }

  fn prev(self) -> Self {
    match self {
      Focus::Quantity => Focus::Submit,
      Focus::DueDate => Focus::Quantity,
      Focus::Submit => Focus::DueDate,
    }
  }
}

/// Turn the raw form fields into a borrow request for `book`.
///
/// Past due dates are accepted; the server is the authority on those.
fn build_request(book: &Book, quantity: &str, due_date: &str) -> Result<BorrowRequest, String> {
  if !book.can_borrow() {
    return Err("This book is not available to borrow.".to_string());
  }

  let (quantity, due_date) = (quantity.trim(), due_date.trim());
  if quantity.is_empty() || due_date.is_empty() {
    return Err("Please fill all fields!".to_string());
  }

  let quantity = quantity
    .parse::<u32>()
    .ok()
    .filter(|q| (1..=book.copies).contains(q))
    .ok_or_else(|| format!("Quantity must be between 1 and {}", book.copies))?;

  let due_date = NaiveDate::parse_from_str(due_date, DATE_FORMAT)
    .map_err(|_| "Due date must be a valid date (YYYY-MM-DD)".to_string())?;

  Ok(BorrowRequest {
    book: book.id.clone(),
    quantity,
    due_date,
  })
}

/// Borrow copies of one book
pub struct BorrowFormView {
  ctx: ViewContext,
  id: String,
  book: Subscription<BookEnvelope>,
  quantity: TextInput,
  due_date: TextInput,
  focus: Focus,
  error: Option<String>,
  borrow: Mutation<()>,
}

impl BorrowFormView {
  pub fn new(ctx: ViewContext, id: &str) -> Self {
    let book = ctx.catalog.book(id);
    Self {
      ctx,
      id: id.to_string(),
      book,
      quantity: TextInput::with_value("1"),
      due_date: TextInput::new(),
      focus: Focus::Quantity,
      error: None,
      borrow: Mutation::new(),
    }
  }

  fn loaded(&self) -> Option<&Book> {
    self.book.data().map(|envelope| &envelope.data)
  }

  fn submit(&mut self) -> ViewAction {
    if self.borrow.is_pending() {
      return ViewAction::None;
    }
    let Some(book) = self.loaded() else {
      return ViewAction::None;
    };

    match build_request(book, self.quantity.value(), self.due_date.value()) {
      Ok(request) => {
        self.error = None;
        self.borrow.start(self.ctx.catalog.borrow_book(&request));
        ViewAction::None
      }
      Err(message) => {
        self.error = Some(message.clone());
        ViewAction::Notify(Notice::error(message))
      }
    }
  }

  fn input_line<'a>(&'a self, label: &'static str, input: &'a TextInput, focus: Focus) -> Line<'a> {
    let focused = self.focus == focus;
    let style = if focused {
      Style::default().fg(Color::Yellow).bold()
    } else {
      Style::default().fg(Color::DarkGray)
    };
    let mut spans = vec![Span::styled(format!("{:<18}", label), style)];
    spans.extend(input.spans(focused));
    Line::from(spans)
  }

  fn render_book(&self, frame: &mut Frame, area: Rect, book: &Book) {
    let label = |text: &'static str| Span::styled(text, Style::default().fg(Color::DarkGray));
    let (status, status_color) = availability(book.available, book.copies);

    let mut lines = vec![
      Line::from(vec![label("Title:            "), Span::raw(book.title.as_str())]),
      Line::from(vec![label("Author:           "), Span::raw(book.author.as_str())]),
      Line::from(vec![
        label("Available Copies: "),
        Span::raw(book.copies.to_string()),
      ]),
      Line::from(vec![
        label("Status:           "),
        Span::styled(status, Style::default().fg(status_color)),
      ]),
      Line::default(),
    ];

    if book.can_borrow() {
      lines.push(self.input_line("Quantity", &self.quantity, Focus::Quantity));
      lines.push(self.input_line("Due date", &self.due_date, Focus::DueDate));
      lines.push(Line::from(Span::styled(
        format!("{:<18}YYYY-MM-DD", ""),
        Style::default().fg(Color::DarkGray),
      )));
      lines.push(Line::default());

      let label = if self.borrow.is_pending() {
        " Borrowing... "
      } else {
        " Borrow Book "
      };
      let style = if self.focus == Focus::Submit {
        Style::default().bg(Color::Cyan).fg(Color::Black).bold()
      } else {
        Style::default().fg(Color::Cyan)
      };
      lines.push(Line::from(Span::styled(label, style)));
    } else {
      lines.push(Line::from(Span::styled(
        "This book cannot be borrowed right now.",
        Style::default().fg(Color::Yellow),
      )));
    }

    if let Some(error) = &self.error {
      lines.push(Line::default());
      lines.push(Line::from(Span::styled(
        error.as_str(),
        Style::default().fg(Color::Red),
      )));
    }

    frame.render_widget(Paragraph::new(lines), area);
  }
}

impl View for BorrowFormView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if key.code == KeyCode::Esc {
      return ViewAction::Pop;
    }

    let borrowable = self.loaded().is_some_and(Book::can_borrow);
    if !borrowable {
      match key.code {
        KeyCode::Char('r') => self.book.refetch(),
        KeyCode::Char('q') => return ViewAction::Pop,
        _ => {}
      }
      return ViewAction::None;
    }

    match key.code {
      KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => self.submit(),
      KeyCode::Tab | KeyCode::Down => {
        self.focus = self.focus.next();
        ViewAction::None
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.focus = self.focus.prev();
        ViewAction::None
      }
      KeyCode::Enter if self.focus == Focus::Submit => self.submit(),
      _ => {
        let input = match self.focus {
          Focus::Quantity => &mut self.quantity,
          Focus::DueDate => &mut self.due_date,
          Focus::Submit => return ViewAction::None,
        };
        if let InputResult::Submitted(_) = input.handle_key(key) {
          self.focus = self.focus.next();
        }
        ViewAction::None
      }
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let block = titled_block(format!(" Borrow Book{} ", status_suffix(&self.book)));

    let Some(book) = self.loaded() else {
      let not_found = matches!(
        self.book.error(),
        Some(ApiError::Transport(TransportError { status: Some(404), .. }))
      );
      let (text, color) = if not_found {
        ("Book not found!".to_string(), Color::Red)
      } else if self.book.is_error() {
        (error_text(self.book.error()), Color::Red)
      } else {
        ("Loading book details...".to_string(), Color::DarkGray)
      };
      render_message(frame, area, block, text, color);
      return;
    };

    let inner = block.inner(area);
    frame.render_widget(block, area);
    self.render_book(frame, inner, book);
  }

  fn breadcrumb_label(&self) -> String {
    match self.loaded() {
      Some(book) => format!("Borrow {}", book.title),
      None => format!("Borrow {}", self.id),
    }
  }

  fn is_editing(&self) -> bool {
    true
  }

  fn tick(&mut self) -> ViewAction {
    self.book.poll();

    if !self.borrow.poll() {
      return ViewAction::None;
    }
    match self.borrow.take_outcome() {
      Some(Ok(())) => ViewAction::reset_with_notice(
        Box::new(BorrowSummaryView::new(self.ctx.clone())),
        Notice::success("Book borrowed successfully!"),
      ),
      Some(Err(e)) => {
        let message = e.user_message("Failed to borrow book!");
        self.error = Some(message.clone());
        ViewAction::Notify(Notice::error(message))
      }
      None => ViewAction::None,
    }
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new("tab", "next field").with_priority(10),
      Shortcut::new("ctrl-s", "borrow"),
      Shortcut::new("esc", "cancel"),
    ]
  }
}
