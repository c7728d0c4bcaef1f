use std::io::Write as _;

use crate::{
    error::{SlidecastError, SlidecastResult},
    model::{Deck, TimingPolicy},
};

/// Seconds a slide without narration stays on screen when the deck has
/// narration elsewhere and no explicit configuration was given.
pub const DEFAULT_FALLBACK_SECS: u32 = 5;

/// One line of operator input. Injected so the resolver is testable without
/// a terminal attached.
pub trait Prompter {
    fn ask(&mut self, question: &str) -> SlidecastResult<String>;
}

/// Prompts on stdout, reads one line from stdin.
pub struct StdioPrompter;

impl Prompter for StdioPrompter {
    fn ask(&mut self, question: &str) -> SlidecastResult<String> {
        print!("{question}");
        std::io::stdout()
            .flush()
            .map_err(|e| SlidecastError::io(format!("failed to flush stdout: {e}")))?;
        let mut line = String::new();
        let read = std::io::stdin()
            .read_line(&mut line)
            .map_err(|e| SlidecastError::io(format!("failed to read stdin: {e}")))?;
        if read == 0 {
            return Err(SlidecastError::io("stdin closed while prompting"));
        }
        Ok(line)
    }
}

/// Decide the run's fallback-duration policy before any per-slide work.
///
/// Returns `Ok(None)` when no video should be produced: the deck has no
/// slides, or no slide has notes and the operator declined a fixed duration.
/// The interactive path re-prompts on malformed input instead of failing.
pub fn resolve_timing(
    deck: &Deck,
    configured_secs: Option<u32>,
    prompter: &mut dyn Prompter,
) -> SlidecastResult<Option<TimingPolicy>> {
    if let Some(secs) = configured_secs
        && secs == 0
    {
        return Err(SlidecastError::path_validation(
            "configured fallback duration must be a positive number of seconds",
        ));
    }

    if deck.slides.is_empty() {
        return Ok(None);
    }

    if deck.has_any_notes() {
        return Ok(Some(TimingPolicy {
            fallback_secs: configured_secs.unwrap_or(DEFAULT_FALLBACK_SECS),
            any_narration: true,
        }));
    }

    if let Some(secs) = configured_secs {
        return Ok(Some(TimingPolicy {
            fallback_secs: secs,
            any_narration: false,
        }));
    }

    // Fully note-less deck and nothing configured: ask once, up front.
    if !confirm(prompter, "No slide has presenter notes. Show every slide for a fixed duration? [y/n] ")? {
        return Ok(None);
    }
    let secs = read_positive_secs(prompter, "Seconds to show each slide: ")?;
    Ok(Some(TimingPolicy {
        fallback_secs: secs,
        any_narration: false,
    }))
}

fn confirm(prompter: &mut dyn Prompter, question: &str) -> SlidecastResult<bool> {
    loop {
        let answer = prompter.ask(question)?;
        match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            other => {
                tracing::debug!(answer = other, "unrecognized yes/no answer; re-prompting");
            }
        }
    }
}

fn read_positive_secs(prompter: &mut dyn Prompter, question: &str) -> SlidecastResult<u32> {
    loop {
        let answer = prompter.ask(question)?;
        match answer.trim().parse::<u32>() {
            Ok(secs) if secs > 0 => return Ok(secs),
            _ => {
                tracing::debug!(answer = answer.trim(), "not a positive integer; re-prompting");
            }
        }
    }
}
