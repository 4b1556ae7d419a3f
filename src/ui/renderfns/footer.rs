use crate::ui::view::Notice;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the footer bar with the view breadcrumb and the current notice
pub fn draw_footer(frame: &mut Frame, area: Rect, breadcrumb: &[String], notice: Option<&Notice>) {
  let mut spans = vec![Span::raw(" ")];

  for (i, part) in breadcrumb.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
    }

    let style = if i + 1 == breadcrumb.len() {
      // Current view - highlighted
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::White)
    };

    spans.push(Span::styled(part.clone(), style));
  }

  let chunks = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Min(10), Constraint::Percentage(55)])
    .split(area);

  let style = Style::default().bg(Color::Black);
  frame.render_widget(Paragraph::new(Line::from(spans)).style(style), chunks[0]);

  if let Some(notice) = notice {
    let line = Line::from(Span::styled(
      format!("{} ", notice.message),
      Style::default().fg(notice.color()).bold(),
    ))
    .alignment(Alignment::Right);
    frame.render_widget(Paragraph::new(line).style(style), chunks[1]);
  } else {
    frame.render_widget(Paragraph::new("").style(style), chunks[1]);
  }
}
