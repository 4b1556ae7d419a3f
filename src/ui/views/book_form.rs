use super::{error_text, render_message, titled_block};
use crate::api::{ApiError, Book, BookEnvelope, BookUpdate, FieldError, Genre, NewBook};
use crate::query::{Mutation, Subscription};
use crate::ui::components::{GenrePicker, GenrePickerEvent, InputResult, KeyResult, TextInput};
use crate::ui::view::{Notice, Shortcut, View, ViewAction};
use crate::ui::views::BookListView;
use crate::ui::ViewContext;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
  Title,
  Author,
  Genre,
  Isbn,
  Description,
  Copies,
  Available,
  Submit,
}

impl Field {
  const ORDER: [Field; 8] = [
    Field::Title,
    Field::Author,
    Field::Genre,
    Field::Isbn,
    Field::Description,
    Field::Copies,
    Field::Available,
    Field::Submit,
  ];

  fn index(self) -> usize {
    Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
  }

  fn next(self) -> Self {
    Self::ORDER[(self.index() + 1) % Self::ORDER.len()]
  }

  fn prev(self) -> Self {
    Self::ORDER[(self.index() + Self::ORDER.len() - 1) % Self::ORDER.len()]
  }

  /// Name the server uses in field errors
  fn key(self) -> &'static str {
    match self {
      Field::Title => "title",
      Field::Author => "author",
      Field::Genre => "genre",
      Field::Isbn => "isbn",
      Field::Description => "description",
      Field::Copies => "copies",
      Field::Available => "available",
      Field::Submit => "",
    }
  }

  fn label(self) -> &'static str {
    match self {
      Field::Title => "Title *",
      Field::Author => "Author *",
      Field::Genre => "Genre *",
      Field::Isbn => "ISBN *",
      Field::Description => "Description",
      Field::Copies => "Copies *",
      Field::Available => "Available",
      Field::Submit => "",
    }
  }
}

/// A book record that passed local validation
#[derive(Debug, Clone, PartialEq)]
struct ValidBook {
  title: String,
  author: String,
  genre: Genre,
  isbn: String,
  description: String,
  copies: u32,
  available: bool,
}

impl ValidBook {
  /// Create payload; an unchecked `available` is left for the server to decide
  fn into_new_book(self) -> NewBook {
    NewBook {
      title: self.title,
      author: self.author,
      genre: self.genre,
      isbn: self.isbn,
      description: Some(self.description).filter(|d| !d.is_empty()),
      copies: self.copies,
      available: self.available.then_some(true),
    }
  }

  fn into_update(self) -> BookUpdate {
    BookUpdate {
      title: self.title,
      author: self.author,
      genre: self.genre,
      isbn: self.isbn,
      description: self.description,
      copies: self.copies,
      available: self.available,
    }
  }
}

/// Editable form state
#[derive(Debug, Clone)]
struct BookForm {
  title: TextInput,
  author: TextInput,
  genre: Option<Genre>,
  isbn: TextInput,
  description: TextInput,
  copies: TextInput,
  available: bool,
  errors: Vec<FieldError>,
}

impl Default for BookForm {
  fn default() -> Self {
    Self {
      title: TextInput::new(),
      author: TextInput::new(),
      genre: None,
      isbn: TextInput::new(),
      description: TextInput::new(),
      copies: TextInput::with_value("1"),
      available: true,
      errors: Vec::new(),
    }
  }
}

impl BookForm {
  fn from_book(book: &Book) -> Self {
    Self {
      title: TextInput::with_value(book.title.as_str()),
      author: TextInput::with_value(book.author.as_str()),
      genre: Some(book.genre.clone()),
      isbn: TextInput::with_value(book.isbn.as_str()),
      description: TextInput::with_value(book.description.clone().unwrap_or_default()),
      copies: TextInput::with_value(book.copies.to_string()),
      available: book.available,
      errors: Vec::new(),
    }
  }

  fn input_mut(&mut self, field: Field) -> Option<&mut TextInput> {
    match field {
      Field::Title => Some(&mut self.title),
      Field::Author => Some(&mut self.author),
      Field::Isbn => Some(&mut self.isbn),
      Field::Description => Some(&mut self.description),
      Field::Copies => Some(&mut self.copies),
      Field::Genre | Field::Available | Field::Submit => None,
    }
  }

  fn input(&self, field: Field) -> Option<&TextInput> {
    match field {
      Field::Title => Some(&self.title),
      Field::Author => Some(&self.author),
      Field::Isbn => Some(&self.isbn),
      Field::Description => Some(&self.description),
      Field::Copies => Some(&self.copies),
      Field::Genre | Field::Available | Field::Submit => None,
    }
  }

  fn error_for(&self, field: Field) -> Option<&str> {
    self
      .errors
      .iter()
      .find(|e| e.field == field.key())
      .map(|e| e.message.as_str())
  }

  /// Check required fields; every problem is reported at once.
  fn validate(&self) -> Result<ValidBook, Vec<FieldError>> {
    let mut errors = Vec::new();
    let mut required = |field: Field, input: &TextInput, message: &str| {
      let value = input.value().trim().to_string();
      if value.is_empty() {
        errors.push(FieldError {
          field: field.key().to_string(),
          message: message.to_string(),
        });
      }
      value
    };

    let title = required(Field::Title, &self.title, "Title is required");
    let author = required(Field::Author, &self.author, "Author is required");
    let isbn = required(Field::Isbn, &self.isbn, "ISBN is required");

    if self.genre.is_none() {
      errors.push(FieldError {
        field: Field::Genre.key().to_string(),
        message: "Genre is required".to_string(),
      });
    }

    let copies = self.copies.value().trim().parse::<u32>();
    if copies.is_err() {
      errors.push(FieldError {
        field: Field::Copies.key().to_string(),
        message: "Copies must be a non-negative number".to_string(),
      });
    }

    match (self.genre.clone(), copies) {
      (Some(genre), Ok(copies)) if errors.is_empty() => Ok(ValidBook {
        title,
        author,
        genre,
        isbn,
        description: self.description.value().trim().to_string(),
        copies,
        available: self.available,
      }),
      _ => Err(errors),
    }
  }
}

enum FormMode {
  Create,
  Edit {
    id: String,
    book: Subscription<BookEnvelope>,
    /// The form is filled from the first successful read only
    prefilled: bool,
  },
}

/// Create or edit a book
pub struct BookFormView {
  ctx: ViewContext,
  mode: FormMode,
  form: BookForm,
  focus: Field,
  genre_picker: GenrePicker,
  save: Mutation<Option<Book>>,
}

impl BookFormView {
  pub fn create(ctx: ViewContext) -> Self {
    Self {
      ctx,
      mode: FormMode::Create,
      form: BookForm::default(),
      focus: Field::Title,
      genre_picker: GenrePicker::new(),
      save: Mutation::new(),
    }
  }

  pub fn edit(ctx: ViewContext, id: &str) -> Self {
    let book = ctx.catalog.book(id);
    let mut view = Self {
      ctx,
      mode: FormMode::Edit {
        id: id.to_string(),
        book,
        prefilled: false,
      },
      form: BookForm::default(),
      focus: Field::Title,
      genre_picker: GenrePicker::new(),
      save: Mutation::new(),
    };
    view.try_prefill();
    view
  }

  fn is_ready(&self) -> bool {
    match &self.mode {
      FormMode::Create => true,
      FormMode::Edit { prefilled, .. } => *prefilled,
    }
  }

  fn try_prefill(&mut self) {
    if let FormMode::Edit {
      book, prefilled, ..
    } = &mut self.mode
    {
      if *prefilled {
        return;
      }
      if let Some(envelope) = book.data() {
        self.form = BookForm::from_book(&envelope.data);
        *prefilled = true;
      }
    }
  }

  fn submit(&mut self) -> ViewAction {
    if !self.is_ready() || self.save.is_pending() {
      return ViewAction::None;
    }

    let valid = match self.form.validate() {
      Ok(valid) => valid,
      Err(errors) => {
        let message = errors
          .iter()
          .map(|e| e.message.as_str())
          .collect::<Vec<_>>()
          .join(", ");
        self.form.errors = errors;
        return ViewAction::Notify(Notice::error(message));
      }
    };
    self.form.errors.clear();

    match &self.mode {
      FormMode::Create => {
        self.save.start(self.ctx.catalog.add_book(&valid.into_new_book()));
      }
      FormMode::Edit { id, .. } => {
        self.save.start(self.ctx.catalog.update_book(id, &valid.into_update()));
      }
    }
    ViewAction::None
  }

  fn settle(&mut self, outcome: Result<Option<Book>, ApiError>) -> ViewAction {
    let (success, fallback) = match self.mode {
      FormMode::Create => ("Book added successfully!", "Failed to add book!"),
      FormMode::Edit { .. } => ("Book updated successfully!", "Failed to update book!"),
    };

    match outcome {
      Ok(_) => ViewAction::reset_with_notice(
        Box::new(BookListView::new(self.ctx.clone())),
        Notice::success(success),
      ),
      Err(e) => {
        if let ApiError::Validation(v) = &e {
          self.form.errors = v.errors.clone();
        }
        ViewAction::Notify(Notice::error(e.user_message(fallback)))
      }
    }
  }

  fn handle_field_key(&mut self, key: KeyEvent) -> ViewAction {
    match (self.focus, key.code) {
      (Field::Genre, KeyCode::Enter | KeyCode::Char(' ')) => {
        self.genre_picker.show(self.form.genre.as_ref());
      }
      (Field::Available, KeyCode::Enter | KeyCode::Char(' ')) => {
        self.form.available = !self.form.available;
      }
      (Field::Submit, KeyCode::Enter) => return self.submit(),
      (field, _) => {
        if let Some(input) = self.form.input_mut(field) {
          if let InputResult::Submitted(_) = input.handle_key(key) {
            self.focus = field.next();
          }
        }
      }
    }
    ViewAction::None
  }

  fn field_line(&self, field: Field) -> Line<'_> {
    let focused = self.focus == field;
    let label_style = if focused {
      Style::default().fg(Color::Yellow).bold()
    } else {
      Style::default().fg(Color::DarkGray)
    };

    let mut spans = vec![Span::styled(format!("{:<13}", field.label()), label_style)];
    match field {
      Field::Genre => spans.push(match &self.form.genre {
        Some(genre) => Span::raw(genre.label()),
        None => Span::styled("<select>", Style::default().fg(Color::DarkGray)),
      }),
      Field::Available => {
        spans.push(Span::raw(if self.form.available { "[x]" } else { "[ ]" }))
      }
      Field::Submit => {}
      other => {
        if let Some(input) = self.form.input(other) {
          spans.extend(input.spans(focused));
        }
      }
    }

    if let Some(error) = self.form.error_for(field) {
      spans.push(Span::styled(
        format!("  {}", error),
        Style::default().fg(Color::Red),
      ));
    }
    Line::from(spans)
  }

  fn submit_line(&self) -> Line<'_> {
    let label = match (&self.mode, self.save.is_pending()) {
      (FormMode::Create, false) => " Add Book ",
      (FormMode::Create, true) => " Adding... ",
      (FormMode::Edit { .. }, false) => " Update Book ",
      (FormMode::Edit { .. }, true) => " Updating... ",
    };
    let style = if self.focus == Field::Submit {
      Style::default().bg(Color::Cyan).fg(Color::Black).bold()
    } else {
      Style::default().fg(Color::Cyan)
    };
    Line::from(Span::styled(label, style))
  }
}

impl View for BookFormView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.genre_picker.handle_key(key) {
      KeyResult::Event(GenrePickerEvent::Selected(genre)) => {
        self.form.genre = Some(genre);
        self.focus = Field::Genre.next();
        return ViewAction::None;
      }
      KeyResult::Event(GenrePickerEvent::Cancelled) | KeyResult::Handled => {
        return ViewAction::None;
      }
      KeyResult::NotHandled => {}
    }

    if key.code == KeyCode::Esc {
      return ViewAction::Pop;
    }
    if !self.is_ready() {
      if key.code == KeyCode::Char('r') {
        if let FormMode::Edit { book, .. } = &self.mode {
          book.refetch();
        }
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
      _ => self.handle_field_key(key),
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let title = match &self.mode {
      FormMode::Create => " Add New Book ".to_string(),
      FormMode::Edit { .. } => " Edit Book ".to_string(),
    };
    let block = titled_block(title);

    if let FormMode::Edit {
      book,
      prefilled: false,
      ..
    } = &self.mode
    {
      let (text, color) = if book.is_error() {
        (error_text(book.error()), Color::Red)
      } else {
        ("Loading book...".to_string(), Color::DarkGray)
      };
      render_message(frame, area, block, text, color);
      return;
    }

    let mut lines: Vec<Line> = Vec::new();
    for field in Field::ORDER {
      if field == Field::Submit {
        lines.push(Line::default());
        lines.push(self.submit_line());
      } else {
        lines.push(self.field_line(field));
      }
    }

    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(Paragraph::new(lines), inner);

    self.genre_picker.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    match &self.mode {
      FormMode::Create => "New Book".to_string(),
      FormMode::Edit { id, book, .. } => match book.data() {
        Some(envelope) => format!("Edit {}", envelope.data.title),
        None => format!("Edit {}", id),
      },
    }
  }

  fn is_editing(&self) -> bool {
    true
  }

  fn tick(&mut self) -> ViewAction {
    if let FormMode::Edit { book, .. } = &mut self.mode {
      if book.poll() {
        self.try_prefill();
      }
    }

    if self.save.poll() {
      if let Some(outcome) = self.save.take_outcome() {
        return self.settle(outcome);
      }
    }
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new("tab", "next field").with_priority(10),
      Shortcut::new("space", "toggle/pick"),
      Shortcut::new("ctrl-s", "save"),
      Shortcut::new("esc", "cancel"),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn filled() -> BookForm {
    BookForm {
      title: TextInput::with_value("Dune"),
      author: TextInput::with_value("Frank Herbert"),
      genre: Some(Genre::Fiction),
      isbn: TextInput::with_value("9780441013593"),
      ..BookForm::default()
    }
  }

  #[test]
  fn test_defaults() {
    let form = BookForm::default();
    assert_eq!(form.copies.value(), "1");
    assert!(form.available);
    assert!(form.genre.is_none());
  }

  #[test]
  fn test_missing_fields_are_all_reported() {
    let errors = BookForm::default().validate().unwrap_err();
    let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
    assert_eq!(fields, vec!["title", "author", "isbn", "genre"]);
  }

  #[test]
  fn test_bad_copies() {
    let mut form = filled();
    form.copies.set_value("-2");
    let errors = form.validate().unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field, "copies");
  }

  #[test]
  fn test_create_payload_omits_unchecked_available() {
    let mut form = filled();
    form.available = false;
    let book = form.validate().unwrap().into_new_book();
    assert_eq!(book.available, None);
    assert_eq!(book.description, None);
    assert_eq!(book.copies, 1);

    form.available = true;
    form.description.set_value("  Spice  ");
    let book = form.validate().unwrap().into_new_book();
    assert_eq!(book.available, Some(true));
    assert_eq!(book.description.as_deref(), Some("Spice"));
  }

  #[test]
  fn test_update_payload_keeps_every_field() {
    let mut form = filled();
    form.available = false;
    let update = form.validate().unwrap().into_update();
    assert!(!update.available);
    assert_eq!(update.description, "");
    assert_eq!(update.title, "Dune");
  }

  #[test]
  fn test_prefill_from_book() {
    let book: Book = serde_json::from_value(serde_json::json!({
      "_id": "abc",
      "title": "Dune",
      "author": "Frank Herbert",
      "genre": "SCIENCE",
      "isbn": "9780441013593",
      "copies": 0,
      "available": false
    }))
    .unwrap();

    let form = BookForm::from_book(&book);
    assert_eq!(form.title.value(), "Dune");
    assert_eq!(form.genre, Some(Genre::Science));
    assert_eq!(form.copies.value(), "0");
    assert!(!form.available);
    assert_eq!(form.validate().unwrap().copies, 0);
  }

  #[test]
  fn test_server_errors_attach_to_fields() {
    let mut form = filled();
    form.errors = vec![FieldError {
      field: "isbn".to_string(),
      message: "ISBN already exists".to_string(),
    }];
    assert_eq!(form.error_for(Field::Isbn), Some("ISBN already exists"));
    assert_eq!(form.error_for(Field::Title), None);
  }

  #[test]
  fn test_field_cycle() {
    assert_eq!(Field::Title.prev(), Field::Submit);
    assert_eq!(Field::Submit.next(), Field::Title);
    assert_eq!(Field::Genre.next(), Field::Isbn);
  }
}
