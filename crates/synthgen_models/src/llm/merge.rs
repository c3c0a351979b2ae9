//! Merging of per-input result fragments.
//!
//! A backend that cannot produce several generations per call is invoked once
//! per generation slot. Each call yields a fragment covering a slice of the
//! requested generations for a single input; the functions here concatenate
//! those fragments back into one [`GenerationResult`].
//!
//! Fragment order is significant: callers must pass fragments in the order
//! the calls were submitted, not the order they completed, so that output
//! slot `i` always corresponds to generation slot `i`.

use super::error::GenerationError;
use super::types::{GenerationResult, Statistics};

/// Merges fragments for a single input.
///
/// Generations are concatenated in fragment order, and so is every statistic
/// present in the first fragment. Logprobs are concatenated when every
/// fragment carries them and dropped otherwise.
///
/// Returns `None` for an empty fragment list.
///
/// # Errors
///
/// Returns [`GenerationError::InconsistentFragments`] if a later fragment lacks
/// a statistic present in the first.
pub fn try_merge_responses(
    fragments: Vec<GenerationResult>,
) -> Result<Option<GenerationResult>, GenerationError> {
    merge(fragments, MissingKey::Fail)
}

/// Merges fragments for a single input, assuming they share statistics keys.
///
/// Same as [`try_merge_responses`], except that a key missing from a later
/// fragment contributes no values instead of failing.
#[must_use]
pub fn merge_responses(fragments: Vec<GenerationResult>) -> Option<GenerationResult> {
    merge(fragments, MissingKey::Skip).ok().flatten()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum MissingKey {
    Fail,
    Skip,
}

fn merge(
    fragments: Vec<GenerationResult>,
    missing_key: MissingKey,
) -> Result<Option<GenerationResult>, GenerationError> {
    let Some(first) = fragments.first() else {
        return Ok(None);
    };

    let with_logprobs = fragments.iter().all(|f| f.logprobs.is_some());

    let mut merged = GenerationResult {
        generations: Vec::new(),
        statistics: first
            .statistics
            .keys()
            .map(|key| (key.clone(), Vec::new()))
            .collect::<Statistics>(),
        logprobs: with_logprobs.then(Vec::new),
    };

    for (index, fragment) in fragments.into_iter().enumerate() {
        let GenerationResult {
            generations,
            mut statistics,
            logprobs,
        } = fragment;

        merged.generations.extend(generations);

        for (key, all) in &mut merged.statistics {
            match statistics.remove(key) {
                Some(values) => all.extend(values),
                None if missing_key == MissingKey::Fail => {
                    return Err(GenerationError::InconsistentFragments {
                        key: key.clone(),
                        fragment: index,
                    });
                }
                None => {}
            }
        }

        if let (Some(all), Some(logprobs)) = (merged.logprobs.as_mut(), logprobs) {
            all.extend(logprobs);
        }
    }

    Ok(Some(merged))
}
