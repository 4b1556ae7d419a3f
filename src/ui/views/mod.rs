mod book_detail;
mod book_form;
mod book_list;
mod borrow_form;
mod borrow_summary;
mod home;

pub use book_detail::BookDetailView;
pub use book_form::BookFormView;
pub use book_list::BookListView;
pub use borrow_form::BorrowFormView;
pub use borrow_summary::BorrowSummaryView;
pub use home::HomeView;

use crate::api::{ApiError, Book};
use crate::query::Subscription;
use crate::ui::renderfns::{availability, truncate};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table, Wrap};

/// Bordered block with a centered title
fn titled_block(title: String) -> Block<'static> {
  Block::default()
    .title(title)
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue))
}

/// Title suffix describing a subscription's fetch state
fn status_suffix<T>(sub: &Subscription<T>) -> String {
  if let Some(error) = sub.error().filter(|_| sub.is_error()) {
    format!(" (error: {})", error)
  } else if sub.is_loading() {
    " (loading...)".to_string()
  } else {
    String::new()
  }
}

/// Message for a read that failed
fn error_text(error: Option<&ApiError>) -> String {
  match error {
    Some(e) => format!("{}\n\nPress 'r' to retry.", e.user_message("Failed to load data.")),
    None => "Failed to load data. Press 'r' to retry.".to_string(),
  }
}

fn render_message(frame: &mut Frame, area: Rect, block: Block, text: String, color: Color) {
  let paragraph = Paragraph::new(text)
    .block(block)
    .wrap(Wrap { trim: true })
    .style(Style::default().fg(color));
  frame.render_widget(paragraph, area);
}

/// Table of books with the catalog columns
fn book_table<'a>(books: &'a [Book], block: Block<'a>) -> Table<'a> {
  let header = Row::new(["Title", "Author", "Genre", "ISBN", "Copies", "Status"])
    .style(Style::default().fg(Color::Yellow).bold());

  let rows = books.iter().map(|book| {
    let (label, color) = availability(book.available, book.copies);
    Row::new(vec![
      Span::raw(truncate(&book.title, 40)),
      Span::styled(truncate(&book.author, 24), Style::default().fg(Color::Cyan)),
      Span::raw(book.genre.label()),
      Span::styled(book.isbn.as_str(), Style::default().fg(Color::DarkGray)),
      Span::raw(book.copies.to_string()),
      Span::styled(label, Style::default().fg(color)),
    ])
  });

  Table::new(
    rows,
    [
      Constraint::Percentage(30),
      Constraint::Percentage(20),
      Constraint::Length(12),
      Constraint::Length(15),
      Constraint::Length(6),
      Constraint::Length(12),
    ],
  )
  .header(header)
  .block(block)
  .row_highlight_style(
    Style::default()
      .bg(Color::DarkGray)
      .add_modifier(Modifier::BOLD),
  )
  .highlight_symbol("> ")
}
