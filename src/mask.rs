//! Promotional prefix masking.

use rand::seq::SliceRandom;

use crate::error::{PipelineError, Result};

/// Legacy "view now" marker that older sheets start with.
pub const SENTINEL: &str = "Xem ngay";

/// Makes `text` start with exactly one `prefix`.
///
/// Text already carrying `prefix` is returned as is; otherwise a leading
/// [`SENTINEL`] is swapped for `prefix`, and anything else gets `prefix`
/// glued to the front. Every result starts with `prefix`, so a second pass
/// is a no-op whatever the prefix. A different, previously applied prefix
/// is not recognized.
pub fn mask(text: &str, prefix: &str) -> String {
    if text.starts_with(prefix) {
        return text.to_string();
    }
    match text.strip_prefix(SENTINEL) {
        Some(rest) => format!("{prefix}{rest}"),
        None => format!("{prefix}{text}"),
    }
}

pub fn mask_all<'a, I>(texts: I, prefix: &str) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    texts.into_iter().map(|t| mask(t, prefix)).collect()
}

/// Picks the active prefix for a batch.
pub trait PrefixSelector {
    fn select<'p>(&mut self, prefixes: &'p [String]) -> Option<&'p str>;
}

/// Uniform random pick.
#[derive(Debug, Default)]
pub struct RandomSelector;

impl PrefixSelector for RandomSelector {
    fn select<'p>(&mut self, prefixes: &'p [String]) -> Option<&'p str> {
        prefixes.choose(&mut rand::thread_rng()).map(String::as_str)
    }
}

/// Always picks the prefix at `index`.
#[derive(Debug, Clone, Copy)]
pub struct FixedSelector(pub usize);

impl PrefixSelector for FixedSelector {
    fn select<'p>(&mut self, prefixes: &'p [String]) -> Option<&'p str> {
        prefixes.get(self.0).map(String::as_str)
    }
}

/// Chooses the batch prefix once; an empty list is a configuration error.
pub fn choose_prefix<S: PrefixSelector + ?Sized>(
    prefixes: &[String],
    selector: &mut S,
) -> Result<String> {
    let chosen = selector
        .select(prefixes)
        .ok_or_else(|| PipelineError::InvalidConfig("no promotional prefixes configured".into()))?;
    if chosen.is_empty() {
        return Err(PipelineError::InvalidConfig(
            "promotional prefix must not be empty".into(),
        ));
    }
    Ok(chosen.to_string())
}
