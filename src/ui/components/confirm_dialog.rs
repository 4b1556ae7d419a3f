use super::{centered, KeyResult};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmEvent {
  Confirmed,
  Cancelled,
}

/// Yes/no popup. Focus starts on the cancel button.
#[derive(Debug, Clone, Default)]
pub struct ConfirmDialog {
  active: bool,
  title: String,
  message: String,
  confirm_label: String,
  confirm_focused: bool,
}

impl ConfirmDialog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn show(&mut self, title: &str, message: &str, confirm_label: &str) {
    self.active = true;
    self.title = title.to_string();
    self.message = message.to_string();
    self.confirm_label = confirm_label.to_string();
    self.confirm_focused = false;
  }

  pub fn hide(&mut self) {
    self.active = false;
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<ConfirmEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Char('y') => {
        self.hide();
        KeyResult::Event(ConfirmEvent::Confirmed)
      }
      KeyCode::Char('n') | KeyCode::Char('q') | KeyCode::Esc => {
        self.hide();
        KeyResult::Event(ConfirmEvent::Cancelled)
      }
      KeyCode::Enter => {
        self.hide();
        if self.confirm_focused {
          KeyResult::Event(ConfirmEvent::Confirmed)
        } else {
          KeyResult::Event(ConfirmEvent::Cancelled)
        }
      }
      KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::BackTab | KeyCode::Char('h')
      | KeyCode::Char('l') => {
        self.confirm_focused = !self.confirm_focused;
        KeyResult::Handled
      }
      _ => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = (self.message.len() as u16 + 6).clamp(36, 60);
    let overlay_area = centered(area, width, 7);
    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Red))
      .title(format!(" {} ", self.title));
    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    let button = |label: &str, focused: bool, color: Color| {
      let style = if focused {
        Style::default().bg(color).fg(Color::Black).bold()
      } else {
        Style::default().fg(color)
      };
      Span::styled(format!(" {} ", label), style)
    };

    let lines = vec![
      Line::from(self.message.as_str()),
      Line::default(),
      Line::from(vec![
        button(&self.confirm_label, self.confirm_focused, Color::Red),
        Span::raw("   "),
        button("Cancel", !self.confirm_focused, Color::Cyan),
      ])
      .alignment(Alignment::Center),
    ];

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
  }
}
