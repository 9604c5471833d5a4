//! Operator interaction seam for the session.

use dialoguer::{Input, Select};

use crate::message::{ALL_TYPES, CommitMessage, CommitType};
use crate::session::Decision;

/// Everything the pipeline asks of the operator. Tests supply a scripted
/// implementation; the binary uses [`TerminalInteract`].
pub trait Interact {
    /// Present the rendered draft and ask for a decision.
    fn review(&mut self, rendered: &str) -> Decision;

    /// Compose a commit message, optionally prefilled from a current
    /// draft. `None` means the operator aborted.
    fn compose(&mut self, current: Option<&CommitMessage>) -> Option<CommitMessage>;

    /// Ask for an optional one-line brief about the changes.
    fn ask_brief(&mut self) -> Option<String>;
}

/// Terminal implementation over dialoguer.
pub struct TerminalInteract {
    title_max: usize,
}

impl TerminalInteract {
    pub fn new(title_max: usize) -> Self {
        Self { title_max }
    }

    fn select_type(&self, current: Option<CommitType>) -> Option<CommitType> {
        let mut items: Vec<String> = ALL_TYPES
            .iter()
            .map(|t| format!("{} {}", t.glyph(), t.as_str()))
            .collect();
        items.push("\u{274c} abort".to_string());

        let default = current
            .and_then(|c| ALL_TYPES.iter().position(|t| *t == c))
            .unwrap_or(0);

        let picked = Select::new()
            .with_prompt("Commit type for your changes")
            .items(&items)
            .default(default)
            .interact()
            .ok()?;

        ALL_TYPES.get(picked).copied()
    }

    fn ask_title(&self, initial: &str) -> Option<String> {
        loop {
            let title: String = Input::new()
                .with_prompt(format!("Commit title (max {} chars)", self.title_max))
                .with_initial_text(initial)
                .interact_text()
                .ok()?;
            let title = title.trim().to_string();
            if title.is_empty() {
                eprintln!("The title cannot be empty.");
                continue;
            }
            if title.chars().count() > self.title_max {
                eprintln!(
                    "The title is {} characters, keep it under {}.",
                    title.chars().count(),
                    self.title_max
                );
                continue;
            }
            return Some(title);
        }
    }
}

impl Interact for TerminalInteract {
    fn review(&mut self, rendered: &str) -> Decision {
        println!("\n--- preview ---\n{}\n---------------", rendered);

        let choice = Select::new()
            .with_prompt("Ready to commit?")
            .items(&["accept", "edit", "regenerate", "cancel"])
            .default(0)
            .interact();

        match choice {
            Ok(0) => Decision::Accept,
            Ok(1) => Decision::Edit,
            Ok(2) => Decision::Regenerate,
            _ => Decision::Cancel,
        }
    }

    fn compose(&mut self, current: Option<&CommitMessage>) -> Option<CommitMessage> {
        let commit_type = self.select_type(current.map(|m| m.commit_type))?;

        let scope: String = Input::new()
            .with_prompt("A scope for your commit (empty for none)")
            .with_initial_text(current.and_then(|m| m.scope.as_deref()).unwrap_or(""))
            .allow_empty(true)
            .interact_text()
            .ok()?;

        let title = self.ask_title(current.map(|m| m.title.as_str()).unwrap_or(""))?;

        let description: String = Input::new()
            .with_prompt("Briefly describe your commit (empty for none)")
            .with_initial_text(current.and_then(|m| m.description.as_deref()).unwrap_or(""))
            .allow_empty(true)
            .interact_text()
            .ok()?;

        Some(CommitMessage {
            commit_type,
            scope: Some(scope.trim().to_lowercase()).filter(|s| !s.is_empty()),
            title,
            description: Some(description.trim().to_string()).filter(|d| !d.is_empty()),
        })
    }

    fn ask_brief(&mut self) -> Option<String> {
        let brief: String = Input::new()
            .with_prompt("May briefly explain your changes (empty to skip)")
            .allow_empty(true)
            .interact_text()
            .ok()?;
        Some(brief.trim().to_string()).filter(|b| !b.is_empty())
    }
}
