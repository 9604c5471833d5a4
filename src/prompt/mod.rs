//! Prompt construction for commit-message generation.
//!
//! Building a prompt is a pure function of its inputs so identical change
//! material, type sets, and briefs always produce identical prompts.

use crate::message::{CommitType, types_csv};

/// Change material for a prompt: the raw rendered change set or a
/// pre-computed summary of it, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeMaterial {
    Raw(String),
    Summarized(String),
}

impl ChangeMaterial {
    fn text(&self) -> &str {
        match self {
            ChangeMaterial::Raw(t) | ChangeMaterial::Summarized(t) => t,
        }
    }

    fn framing(&self) -> &'static str {
        match self {
            ChangeMaterial::Raw(_) => "the pending changes of the working tree",
            ChangeMaterial::Summarized(_) => "a summary of the pending changes",
        }
    }
}

/// A provider-agnostic instruction payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system_instructions: String,
    pub change_material: ChangeMaterial,
    pub allowed_types: Vec<CommitType>,
    pub brief: Option<String>,
    user_sections: String,
}

impl Prompt {
    /// The user-role text sent alongside the system instructions.
    pub fn user_text(&self) -> &str {
        &self.user_sections
    }

    /// Render system and user parts as one text block, for providers that
    /// take a single prompt string and for debug display.
    pub fn render_full(&self) -> String {
        format!("{}\n\n---\n\n{}", self.system_instructions, self.user_sections)
    }
}

/// Build the prompt for commit-message generation.
///
/// `rejected` carries the drafts the operator already turned down during
/// this session, `corrective` a parse failure from the previous reply.
/// Both are appended as extra context sections.
pub fn build_commit_prompt(
    material: ChangeMaterial,
    allowed_types: &[CommitType],
    brief: Option<&str>,
    rejected: &[crate::message::CommitMessage],
    corrective: Option<&str>,
) -> Prompt {
    let csv = types_csv(allowed_types);

    let feat_excluded = !allowed_types.contains(&CommitType::Feat);
    let no_feat_note = if feat_excluded {
        "\nThe author has stated these changes are NOT a feature. Do not use the `feat` type; pick improvement, refactor, chore, or another fitting type."
    } else {
        ""
    };

    let system_instructions = format!(
        r#"You are an experienced software engineer writing a conventional commit message for a git repository.

Reply with the commit subject on its own line, in exactly this shape:

type(scope): title

followed by a blank line and an optional short description paragraph. No other prose, no markdown fences.

Rules:
- The type MUST be one of the types listed below; pick the one whose meaning best covers the changes. Use `other` only when nothing fits.
- The scope is a short lowercase categorization of what changed (e.g. `parser`, `config`, `v1.2.0`). Omit the parentheses when no scope fits.
- The title is a single imperative sentence of at most 72 characters.
- The description explains the changes in at most 500 characters. Do not repeat the title.
- Modified files weigh more than new files when categorizing, unless the author says otherwise.
- Be careful with `feat`: use it only when the main changes add an explicit new feature.{no_feat_note}

Available commit types:
{csv}"#
    );

    let mut sections = vec![format!(
        "Below are {}:\n\n{}",
        material.framing(),
        material.text()
    )];

    if let Some(brief) = brief.map(str::trim).filter(|b| !b.is_empty()) {
        sections.push(format!(
            "The author states the following about these changes, treat it as the primary guide for categorization and wording:\n\n> {}",
            brief
        ));
    }

    if !rejected.is_empty() {
        let drafts = rejected
            .iter()
            .map(|m| format!("- {}", m.render().replace('\n', " ")))
            .collect::<Vec<_>>()
            .join("\n");
        sections.push(format!(
            "The author rejected the following earlier drafts. Produce a message that differs meaningfully from all of them:\n\n{}",
            drafts
        ));
    }

    if let Some(failure) = corrective {
        sections.push(format!(
            "Your previous reply could not be parsed: {}. Reply again, strictly following the subject format above.",
            failure
        ));
    }

    Prompt {
        system_instructions,
        change_material: material,
        allowed_types: allowed_types.to_vec(),
        brief: brief.map(|b| b.to_string()),
        user_sections: sections.join("\n\n"),
    }
}

/// Build the fixed summarization prompt for a rendered change set.
pub fn build_summary_prompt(changes_text: &str, brief: Option<&str>) -> String {
    let mut sections = vec![format!(
        r#"You summarize changes applied to a git repository. Write a short, meaningful digest of the changes below.

Rules:
- New files (untracked) take priority over modified files.
- You may reference files, e.g. "The file 'math.rs' gained a 'sum' function".
- Short inline snippets are fine; never include large code blocks.
- Describe the overall changes, not a step-by-step walkthrough.

Changes:

{}"#,
        changes_text
    )];

    if let Some(brief) = brief.map(str::trim).filter(|b| !b.is_empty()) {
        sections.push(format!(
            "The author states the following about these changes:\n\n> {}",
            brief
        ));
    }

    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{CommitMessage, allowed_types};

    fn raw(text: &str) -> ChangeMaterial {
        ChangeMaterial::Raw(text.to_string())
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let a = build_commit_prompt(raw("diff"), &allowed_types(false), Some("brief"), &[], None);
        let b = build_commit_prompt(raw("diff"), &allowed_types(false), Some("brief"), &[], None);
        assert_eq!(a.render_full(), b.render_full());
    }

    #[test]
    fn test_no_feat_excludes_type_and_warns() {
        let types = allowed_types(true);
        let prompt = build_commit_prompt(raw("diff"), &types, None, &[], None);
        assert!(!prompt.system_instructions.contains("\nFEAT;"));
        assert!(prompt.system_instructions.contains("Do not use the `feat` type"));
        assert!(!prompt.allowed_types.contains(&CommitType::Feat));
    }

    #[test]
    fn test_feat_present_by_default() {
        let types = allowed_types(false);
        let prompt = build_commit_prompt(raw("diff"), &types, None, &[], None);
        assert!(prompt.system_instructions.contains("FEAT;"));
        assert!(!prompt.system_instructions.contains("Do not use the `feat` type"));
    }

    #[test]
    fn test_brief_is_appended_not_substituted() {
        let prompt = build_commit_prompt(
            raw("the diff"),
            &allowed_types(false),
            Some("renamed the config module"),
            &[],
            None,
        );
        let user = prompt.user_text();
        assert!(user.contains("the diff"));
        assert!(user.contains("The author states the following about these changes"));
        assert!(user.contains("> renamed the config module"));
    }

    #[test]
    fn test_rejected_drafts_are_listed() {
        let rejected = vec![CommitMessage {
            commit_type: CommitType::Chore,
            scope: None,
            title: "Tidy things".to_string(),
            description: None,
        }];
        let prompt =
            build_commit_prompt(raw("diff"), &allowed_types(false), None, &rejected, None);
        assert!(prompt.user_text().contains("rejected the following earlier drafts"));
        assert!(prompt.user_text().contains("Tidy things"));
    }

    #[test]
    fn test_corrective_context_is_appended() {
        let prompt = build_commit_prompt(
            raw("diff"),
            &allowed_types(false),
            None,
            &[],
            Some("Unknown commit type 'wibble'"),
        );
        assert!(prompt.user_text().contains("could not be parsed"));
        assert!(prompt.user_text().contains("wibble"));
    }

    #[test]
    fn test_summary_prompt_carries_changes_and_brief() {
        let p = build_summary_prompt("some changes", Some("a hint"));
        assert!(p.contains("some changes"));
        assert!(p.contains("> a hint"));
        let without = build_summary_prompt("some changes", None);
        assert!(!without.contains("The author states"));
    }
}
