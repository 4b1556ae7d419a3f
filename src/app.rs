use crate::api::Catalog;
use crate::event::{Event, EventHandler};
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::renderfns::{draw_footer, draw_header};
use crate::ui::view::{Notice, View, ViewAction};
use crate::ui::views::{BookFormView, BookListView, BorrowSummaryView, HomeView};
use crate::ui::ViewContext;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::{debug, info, warn};

const TICK_RATE: Duration = Duration::from_millis(250);

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// `:` command palette
  command_input: CommandInput,

  /// Footer notice, cleared once it expires
  notice: Option<Notice>,

  ctx: ViewContext,

  /// Header title
  title: String,

  /// Base URL shown in the header
  api_url: String,

  should_quit: bool,
}

impl App {
  pub fn new(catalog: Catalog, page_size: u32, title: String, api_url: String) -> Self {
    let ctx = ViewContext {
      catalog,
      page_size,
    };
    let root: Box<dyn View> = Box::new(HomeView::new(ctx.clone()));

    Self {
      view_stack: vec![root],
      command_input: CommandInput::new(),
      notice: None,
      ctx,
      title,
      api_url,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.event_loop(&mut terminal).await;

    // Restore the terminal even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    self.ctx.catalog.shutdown();
    info!("booknest exiting");

    result
  }

  async fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE);

    while !self.should_quit {
      terminal.draw(|frame| self.draw(frame))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => self.tick(),
        Some(Event::Resize) => {}
        None => {
          warn!("Event channel closed");
          break;
        }
      }
    }
    Ok(())
  }

  fn draw(&mut self, frame: &mut Frame) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Header
        Constraint::Min(1),    // Main content
        Constraint::Length(1), // Footer
      ])
      .split(frame.area());

    let (context, shortcuts) = match self.view_stack.last() {
      Some(view) => (view.context(), view.shortcuts()),
      None => (None, Vec::new()),
    };
    draw_header(
      frame,
      chunks[0],
      &self.title,
      &self.api_url,
      context.as_deref(),
      &shortcuts,
    );

    if let Some(view) = self.view_stack.last_mut() {
      view.render(frame, chunks[1]);
    }

    let breadcrumb: Vec<String> = self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect();
    draw_footer(frame, chunks[2], &breadcrumb, self.notice.as_ref());

    self.command_input.render_overlay(frame, chunks[1]);
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    // The palette is unavailable while a view captures text
    let editing = self.view_stack.last().is_some_and(|v| v.is_editing());
    if !editing || self.command_input.is_active() {
      match self.command_input.handle_key(key) {
        KeyResult::Event(CommandEvent::Submitted(cmd)) => {
          self.execute_command(&cmd);
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => ViewAction::None,
    };
    self.apply(action);
  }

  fn execute_command(&mut self, cmd: &str) {
    debug!("Command: {}", cmd);
    let action = match cmd {
      "home" => ViewAction::Reset(Box::new(HomeView::new(self.ctx.clone()))),
      "books" => ViewAction::Reset(Box::new(BookListView::new(self.ctx.clone()))),
      "summary" => ViewAction::Reset(Box::new(BorrowSummaryView::new(self.ctx.clone()))),
      "new" => ViewAction::Push(Box::new(BookFormView::create(self.ctx.clone()))),
      "quit" => {
        self.should_quit = true;
        ViewAction::None
      }
      "" => ViewAction::None,
      other => ViewAction::Notify(Notice::error(format!("Unknown command: {}", other))),
    };
    self.apply(action);
  }

  fn tick(&mut self) {
    let action = match self.view_stack.last_mut() {
      Some(view) => view.tick(),
      None => ViewAction::None,
    };
    self.apply(action);

    let evicted = self.ctx.catalog.sweep();
    if evicted > 0 {
      debug!("Evicted {} unused cache entries", evicted);
    }

    if self.notice.as_ref().is_some_and(Notice::is_expired) {
      self.notice = None;
    }
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
      ViewAction::Reset(view) => {
        // Dropping the old views releases their subscriptions
        self.view_stack.clear();
        self.view_stack.push(view);
      }
      ViewAction::Notify(notice) => self.notice = Some(notice),
      ViewAction::Batch(actions) => {
        for action in actions {
          self.apply(action);
        }
      }
    }
  }
}
