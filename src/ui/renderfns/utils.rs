use ratatui::prelude::Color;

/// Truncate to at most `max_len` characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Label and color for a book's availability
pub fn availability(available: bool, copies: u32) -> (&'static str, Color) {
  match (available, copies) {
    (true, 0) => ("Out of stock", Color::Yellow),
    (true, _) => ("Available", Color::Green),
    (false, _) => ("Unavailable", Color::Red),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("Dune", 10), "Dune");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("Dune", 4), "Dune");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("The Left Hand of Darkness", 11), "The Left...");
  }

  #[test]
  fn test_truncate_multibyte() {
    assert_eq!(truncate("Les Misérables", 9), "Les Mi...");
  }

  #[test]
  fn test_availability() {
    assert_eq!(availability(true, 3), ("Available", Color::Green));
    assert_eq!(availability(true, 0), ("Out of stock", Color::Yellow));
    assert_eq!(availability(false, 3), ("Unavailable", Color::Red));
  }
}
