use super::{centered, KeyResult};
use crate::api::Genre;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenrePickerEvent {
  Selected(Genre),
  Cancelled,
}

/// Popup list of the known genres
#[derive(Debug, Clone, Default)]
pub struct GenrePicker {
  active: bool,
  selected: usize,
}

impl GenrePicker {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Open the picker with `current` highlighted when it is a known genre
  pub fn show(&mut self, current: Option<&Genre>) {
    self.active = true;
    self.selected = current
      .and_then(|g| Genre::ALL.iter().position(|known| known == g))
      .unwrap_or(0);
  }

  pub fn hide(&mut self) {
    self.active = false;
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<GenrePickerEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    let len = Genre::ALL.len();
    match key.code {
      KeyCode::Esc | KeyCode::Char('q') => {
        self.hide();
        KeyResult::Event(GenrePickerEvent::Cancelled)
      }
      KeyCode::Enter | KeyCode::Char(' ') => {
        self.hide();
        KeyResult::Event(GenrePickerEvent::Selected(Genre::ALL[self.selected].clone()))
      }
      KeyCode::Char('j') | KeyCode::Down => {
        self.selected = (self.selected + 1) % len;
        KeyResult::Handled
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.selected = (self.selected + len - 1) % len;
        KeyResult::Handled
      }
      _ => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let overlay_area = centered(area, 24, Genre::ALL.len() as u16 + 2);
    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Genre ");

    let items: Vec<ListItem> = Genre::ALL
      .iter()
      .map(|genre| ListItem::new(Span::styled(genre.label(), Style::default().fg(Color::Cyan))))
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = ListState::default();
    state.select(Some(self.selected));
    frame.render_stateful_widget(list, overlay_area, &mut state);
  }
}
