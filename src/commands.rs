//! Command palette entries and autocomplete.

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "home",
    aliases: &["h"],
    description: "Recently added books",
  },
  Command {
    name: "books",
    aliases: &["b", "book", "list"],
    description: "Browse all books",
  },
  Command {
    name: "new",
    aliases: &["n", "create", "add"],
    description: "Add a new book",
  },
  Command {
    name: "summary",
    aliases: &["s", "borrow", "borrowed"],
    description: "Borrowed books summary",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit booknest",
  },
];

/// Commands matching `input`, best match first.
///
/// Exact names beat exact aliases, which beat prefixes, which beat substrings.
/// An empty input lists every command in declaration order.
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let needle = input.trim().to_lowercase();
  if needle.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut ranked: Vec<(u8, &'static Command)> = COMMANDS
    .iter()
    .filter_map(|cmd| cmd.rank(&needle).map(|rank| (rank, cmd)))
    .collect();
  // Stable sort keeps declaration order within a rank
  ranked.sort_by_key(|(rank, _)| *rank);
  ranked.into_iter().map(|(_, cmd)| cmd).collect()
}

impl Command {
  fn rank(&self, needle: &str) -> Option<u8> {
    let aliases = || self.aliases.iter();
    if self.name == needle {
      Some(0)
    } else if aliases().any(|a| *a == needle) {
      Some(1)
    } else if self.name.starts_with(needle) {
      Some(2)
    } else if aliases().any(|a| a.starts_with(needle)) {
      Some(3)
    } else if self.name.contains(needle) {
      Some(4)
    } else if aliases().any(|a| a.contains(needle)) {
      Some(5)
    } else {
      None
    }
  }
}
