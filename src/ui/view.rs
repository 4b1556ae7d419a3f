use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use std::time::{Duration, Instant};

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone)]
pub struct Shortcut {
  pub key: &'static str,
  pub label: &'static str,
  pub priority: u8, // Lower = shown first
}

impl Shortcut {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
  Success,
  Error,
}

/// Transient message shown in the footer
#[derive(Debug, Clone)]
pub struct Notice {
  pub kind: NoticeKind,
  pub message: String,
  shown_at: Instant,
}

impl Notice {
  pub const LIFETIME: Duration = Duration::from_secs(4);

  pub fn success(message: impl Into<String>) -> Self {
    Self {
      kind: NoticeKind::Success,
      message: message.into(),
      shown_at: Instant::now(),
    }
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self {
      kind: NoticeKind::Error,
      message: message.into(),
      shown_at: Instant::now(),
    }
  }

  pub fn is_expired(&self) -> bool {
    self.shown_at.elapsed() >= Self::LIFETIME
  }

  pub fn color(&self) -> Color {
    match self.kind {
      NoticeKind::Success => Color::Green,
      NoticeKind::Error => Color::Red,
    }
  }
}

/// Actions that a view can request in response to user input
pub enum ViewAction {
  /// No action needed
  None,
  /// Push a new view onto the stack
  Push(Box<dyn View>),
  /// Pop current view from stack (go back)
  Pop,
  /// Replace the whole stack with a new root view
  Reset(Box<dyn View>),
  /// Show a notice in the footer
  Notify(Notice),
  /// Several actions, applied in order
  Batch(Vec<ViewAction>),
}

impl ViewAction {
  /// Navigate to `view` as the new root and show `notice`.
  pub fn reset_with_notice(view: Box<dyn View>, notice: Notice) -> Self {
    ViewAction::Batch(vec![ViewAction::Reset(view), ViewAction::Notify(notice)])
  }
}

impl std::fmt::Debug for ViewAction {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ViewAction::None => write!(f, "None"),
      ViewAction::Push(view) => write!(f, "Push({})", view.breadcrumb_label()),
      ViewAction::Pop => write!(f, "Pop"),
      ViewAction::Reset(view) => write!(f, "Reset({})", view.breadcrumb_label()),
      ViewAction::Notify(notice) => write!(f, "Notify({:?})", notice.message),
      ViewAction::Batch(actions) => f.debug_list().entries(actions).finish(),
    }
  }
}

/// Trait for view behavior
///
/// Views handle their own input modes (forms, dialogs, etc.) and return
/// actions for the App to execute. This creates a clean delegation chain:
/// App → View → Components
///
/// Views read through `Subscription<T>` and write through `Mutation<T>`, and
/// poll both in `tick()`.
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Get the breadcrumb label for this view
  fn breadcrumb_label(&self) -> String;

  /// Extra context for the header, e.g. the current page
  fn context(&self) -> Option<String> {
    None
  }

  /// Whether the view is capturing text input (disables the `:` palette)
  fn is_editing(&self) -> bool {
    false
  }

  /// Called on each tick to poll subscriptions and mutations
  fn tick(&mut self) -> ViewAction {
    ViewAction::None
  }

  /// Get keyboard shortcuts to display in the header
  /// Override this to provide view-specific shortcuts
  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("q", "back").with_priority(30),
    ]
  }
}
