use super::{render_message, status_suffix, titled_block};
use crate::api::BorrowSummary;
use crate::query::Subscription;
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::truncate;
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::ViewContext;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Row, Table, TableState};

/// Aggregated borrow totals per book
pub struct BorrowSummaryView {
  summary: Subscription<BorrowSummary>,
  table_state: TableState,
}

impl BorrowSummaryView {
  pub fn new(ctx: ViewContext) -> Self {
    Self {
      summary: ctx.catalog.borrow_summary(),
      table_state: TableState::default(),
    }
  }

  fn total_borrowed(&self) -> u64 {
    self
      .summary
      .data()
      .map(|s| s.data.iter().map(|item| item.total_quantity).sum())
      .unwrap_or(0)
  }
}

impl View for BorrowSummaryView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
      KeyCode::Char('r') => self.summary.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let block = titled_block(format!(
      " Borrowed Books Summary{} ",
      status_suffix(&self.summary)
    ));

    let items = self.summary.data().map(|s| s.data.as_slice()).unwrap_or(&[]);
    if items.is_empty() {
      // A failed read shows the same empty state; the title carries the error.
      let text = if self.summary.is_loading() && !self.summary.is_error() {
        "Loading borrow summary..."
      } else {
        "No borrowed books found."
      };
      render_message(frame, area, block, text.to_string(), Color::DarkGray);
      return;
    }

    let header = Row::new(["#", "Title", "ISBN", "Total Quantity"])
      .style(Style::default().fg(Color::Yellow).bold());
    let rows = items.iter().enumerate().map(|(i, item)| {
      Row::new(vec![
        Span::styled((i + 1).to_string(), Style::default().fg(Color::DarkGray)),
        Span::raw(truncate(&item.book.title, 50)),
        Span::styled(item.book.isbn.as_str(), Style::default().fg(Color::DarkGray)),
        Span::styled(item.total_quantity.to_string(), Style::default().fg(Color::Cyan)),
      ])
    });

    let table = Table::new(
      rows,
      [
        Constraint::Length(4),
        Constraint::Min(20),
        Constraint::Length(16),
        Constraint::Length(15),
      ],
    )
    .header(header)
    .block(block)
    .row_highlight_style(Style::default().bg(Color::DarkGray))
    .highlight_symbol("> ");

    let len = items.len();
    ensure_valid_selection(&mut self.table_state, len);
    frame.render_stateful_widget(table, area, &mut self.table_state);
  }

  fn breadcrumb_label(&self) -> String {
    "Borrow Summary".to_string()
  }

  fn context(&self) -> Option<String> {
    self
      .summary
      .data()
      .map(|_| format!("{} borrowed", self.total_borrowed()))
  }

  fn tick(&mut self) -> ViewAction {
    self.summary.poll();
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("r", "refresh"),
      Shortcut::new("q", "back"),
    ]
  }
}
