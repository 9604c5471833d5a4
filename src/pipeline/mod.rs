//! The commit pipeline: collect, summarize, generate, review, commit.
//!
//! Collaborators arrive through seams ([`ModelProvider`], [`Interact`],
//! [`UsageStore`]) so the whole flow is testable without a network or a
//! terminal. A dry run executes every stage and stops short of touching
//! the repository.

use anyhow::anyhow;
use git2::Repository;
use tracing::warn;

use crate::changes::{ChangeSet, IgnoreList, collect_changes};
use crate::error::ChangeError;
use crate::git;
use crate::message::{CommitMessage, CommitType, allowed_types};
use crate::message::parser::parse_response;
use crate::prompt::{ChangeMaterial, build_commit_prompt};
use crate::provider::{ModelProvider, generate_with_retry};
use crate::session::{Decision, Interact, Session, SessionState};
use crate::summary::summarize_changes;
use crate::usage::{UsageKey, UsageStore, record_usage};

/// How the commit message comes to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitMode {
    /// The operator composes the message through the terminal prompts.
    Manual,
    /// The configured model drafts the message.
    #[default]
    Ai,
}

/// Per-invocation switches, straight from the CLI.
#[derive(Debug, Clone, Default)]
pub struct CommitOptions {
    pub mode: CommitMode,
    pub brief: Option<String>,
    pub force: bool,
    pub push: bool,
    pub dry_run: bool,
    pub no_feat: bool,
    pub debug: bool,
}

/// What the pipeline ended with. Every variant is a clean exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed(git2::Oid),
    DryRun,
    NoChanges,
    Cancelled,
}

/// The pipeline's collaborators, bundled so tests can swap each one.
/// The provider is optional because manual mode runs without one.
pub struct CommitContext<'a> {
    pub provider: Option<&'a dyn ModelProvider>,
    pub summarizer: Option<&'a dyn ModelProvider>,
    pub usage: &'a dyn UsageStore,
    pub device_id: &'a str,
    pub title_max: usize,
    pub max_regenerations: u32,
}

/// Run the full commit flow against an open repository.
pub async fn run_commit(
    repo: &Repository,
    ctx: &CommitContext<'_>,
    interact: &mut dyn Interact,
    options: &CommitOptions,
) -> anyhow::Result<CommitOutcome> {
    let workdir = repo
        .workdir()
        .ok_or_else(|| anyhow!("cannot commit in a bare repository"))?;

    // ── Stage 1: Collect pending changes ──
    let ignore = IgnoreList::load(workdir)?;
    let set = match collect_changes(repo, &ignore) {
        Ok(set) => set,
        Err(ChangeError::NoChanges) => {
            println!("Nothing to commit.");
            return Ok(CommitOutcome::NoChanges);
        }
        Err(e) => return Err(e.into()),
    };

    println!("Found {} changed file(s).", set.len());
    if options.debug {
        for change in set.changes() {
            eprintln!("  {} ({})", change.path, change.status);
        }
    }

    // ── Stage 2: Build the initial session ──
    let mut material: Option<ChangeMaterial> = None;
    let mut brief: Option<String> = None;
    let types: Vec<CommitType> = allowed_types(options.no_feat);

    let mut session = match options.mode {
        CommitMode::Manual => Session::manual(interact.compose(None)),
        CommitMode::Ai => {
            let provider = ctx
                .provider
                .ok_or_else(|| anyhow!("AI mode requires a configured model provider"))?;
            report_month_usage(provider, ctx);

            brief = match (&options.brief, options.force) {
                (Some(b), _) => Some(b.clone()),
                // Force mode never prompts.
                (None, true) => None,
                (None, false) => interact.ask_brief(),
            };

            let prepared =
                prepare_material(ctx, provider, &set, brief.as_deref(), options.debug).await;

            let mut session = Session::new(ctx.max_regenerations, options.force);
            match generate_draft(ctx, provider, &prepared, &types, brief.as_deref(), &[], options.debug)
                .await?
            {
                Some(draft) => session.receive_draft(draft),
                None if options.force => {
                    println!("The model did not produce a usable message; aborting.");
                    return Ok(CommitOutcome::Cancelled);
                }
                None => {
                    println!(
                        "The model did not produce a usable message; falling back to manual entry."
                    );
                    session = Session::manual(None);
                }
            }
            material = Some(prepared);
            session
        }
    };

    // ── Stage 3: Interactive review loop ──
    loop {
        match session.state() {
            SessionState::Draft => session.present(),
            SessionState::Presented => match session.draft() {
                Some(draft) => {
                    let rendered = draft.render();
                    let decision = interact.review(&rendered);
                    session.decide(decision);
                }
                // Manual fallback with nothing to show yet.
                None => session.decide(Decision::Edit),
            },
            SessionState::Editing => match interact.compose(session.draft()) {
                Some(message) => match message.validate(ctx.title_max) {
                    Ok(()) => session.submit_edit(message),
                    Err(e) => eprintln!("{}", e),
                },
                None => session.cancel(),
            },
            SessionState::Regenerating => {
                let (Some(material), Some(provider)) = (material.as_ref(), ctx.provider) else {
                    session.cancel();
                    continue;
                };
                match generate_draft(
                    ctx,
                    provider,
                    material,
                    &types,
                    brief.as_deref(),
                    session.rejected(),
                    options.debug,
                )
                .await?
                {
                    Some(draft) => session.receive_draft(draft),
                    None => {
                        println!(
                            "The model did not produce a usable message; falling back to manual entry."
                        );
                        session = Session::manual(None);
                    }
                }
            }
            SessionState::Accepted | SessionState::Cancelled => break,
        }
    }

    // ── Stage 4: Commit, or report the clean exit ──
    if session.state() == SessionState::Cancelled {
        println!("Commit cancelled.");
        return Ok(CommitOutcome::Cancelled);
    }

    let message = session
        .into_accepted()
        .ok_or_else(|| anyhow!("accepted session carried no message"))?;
    let text = message.render();

    if options.dry_run {
        println!("[dry-run] Would commit with message:\n\n{}", text);
        return Ok(CommitOutcome::DryRun);
    }

    let oid = git::stage_and_commit(repo, &text)?;
    let subject = text.lines().next().unwrap_or_default();
    println!("Committed {:.7}: {}", oid.to_string(), subject);

    if options.push {
        let branch = git::current_branch(repo)?;
        git::push(workdir, "origin", &branch)?;
        println!("Pushed to origin/{}.", branch);
    }

    Ok(CommitOutcome::Committed(oid))
}

/// Print month-to-date token usage for the commit provider. Read failures
/// only warn; accounting never blocks the flow.
fn report_month_usage(provider: &dyn ModelProvider, ctx: &CommitContext<'_>) {
    let key = UsageKey::now(ctx.device_id, provider.name(), provider.model());
    match ctx.usage.totals(&key) {
        Ok(totals) => println!(
            "Token usage this month with {}/{}: {} in, {} out.",
            provider.name(),
            provider.model(),
            totals.tokens_in,
            totals.tokens_out
        ),
        Err(e) => warn!("Could not read token usage: {}", e),
    }
}

/// Decide what change material leaves the machine.
///
/// Local-inference commit providers always get the raw change set; there
/// is nothing to keep on-device that is not already on-device. Otherwise
/// the summarizer digests the changes first, falling back to the raw set
/// when it is unavailable or fails.
async fn prepare_material(
    ctx: &CommitContext<'_>,
    provider: &dyn ModelProvider,
    set: &ChangeSet,
    brief: Option<&str>,
    debug: bool,
) -> ChangeMaterial {
    if provider.is_local() {
        return ChangeMaterial::Raw(set.render_for_prompt());
    }
    let Some(summarizer) = ctx.summarizer else {
        return ChangeMaterial::Raw(set.render_for_prompt());
    };
    match summarize_changes(summarizer, set, brief, debug).await {
        Some((summary, response)) => {
            record_usage(ctx.usage, ctx.device_id, &response);
            ChangeMaterial::Summarized(summary.text)
        }
        None => ChangeMaterial::Raw(set.render_for_prompt()),
    }
}

/// Ask the model for a draft, with one corrective re-prompt on a reply
/// that does not parse.
///
/// Token usage is recorded for every reply the provider produced, whether
/// or not the parser accepted it. Returns `Ok(None)` when the corrective
/// reply also fails to parse; provider errors surface as hard errors.
async fn generate_draft(
    ctx: &CommitContext<'_>,
    provider: &dyn ModelProvider,
    material: &ChangeMaterial,
    types: &[CommitType],
    brief: Option<&str>,
    rejected: &[CommitMessage],
    debug: bool,
) -> anyhow::Result<Option<CommitMessage>> {
    let prompt = build_commit_prompt(material.clone(), types, brief, rejected, None);
    let response = generate_with_retry(
        provider,
        Some(&prompt.system_instructions),
        prompt.user_text(),
        debug,
    )
    .await?;
    record_usage(ctx.usage, ctx.device_id, &response);

    let parse_err = match parse_response(&response.raw_text, ctx.title_max) {
        Ok(message) => return Ok(Some(message)),
        Err(e) => e,
    };
    warn!("Model reply did not parse ({}), re-prompting once", parse_err);

    let corrective = parse_err.to_string();
    let prompt = build_commit_prompt(material.clone(), types, brief, rejected, Some(&corrective));
    let response = generate_with_retry(
        provider,
        Some(&prompt.system_instructions),
        prompt.user_text(),
        debug,
    )
    .await?;
    record_usage(ctx.usage, ctx.device_id, &response);

    match parse_response(&response.raw_text, ctx.title_max) {
        Ok(message) => Ok(Some(message)),
        Err(e) => {
            warn!("Corrective reply did not parse either: {}", e);
            Ok(None)
        }
    }
}
