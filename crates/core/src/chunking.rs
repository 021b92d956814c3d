use crate::error::IngestError;
use crate::models::IngestionOptions;
use std::iter::FusedIterator;

/// A cut point is only honoured when it lies past this share of the window.
const MIN_CUT_RATIO: f64 = 0.3;

const CODE_FENCE: &str = "```";
const PARAGRAPH_BREAK: &str = "\n\n";
const SENTENCE_END: &str = ". ";

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub target_size: usize,
}

impl ChunkingConfig {
    pub fn new(target_size: usize) -> Result<Self, IngestError> {
        if target_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "target size must be greater than zero".to_string(),
            ));
        }
        Ok(Self { target_size })
    }
}

impl TryFrom<&IngestionOptions> for ChunkingConfig {
    type Error = IngestError;

    fn try_from(value: &IngestionOptions) -> Result<Self, Self::Error> {
        Self::new(value.chunk_size)
    }
}

/// Splits `text` into trimmed chunks of at most `target_size` characters.
pub fn chunk_text(text: &str, target_size: usize) -> Result<Chunks<'_>, IngestError> {
    let config = ChunkingConfig::new(target_size)?;
    Ok(Chunks::new(text, config))
}

/// Greedy single-pass splitter over a borrowed text.
///
/// Each step looks at the next `target_size` characters and cuts at the latest code fence
/// (before it), blank line or sentence end (after the newline/period) found in that window.
/// Without a usable marker the window is cut as is.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    text: &'a str,
    cursor: usize,
    target_size: usize,
}

impl<'a> Chunks<'a> {
    pub fn new(text: &'a str, config: ChunkingConfig) -> Self {
        Self {
            text,
            cursor: 0,
            target_size: config.target_size,
        }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor < self.text.len() {
            let rest = &self.text[self.cursor..];
            let window_end = rest
                .char_indices()
                .nth(self.target_size)
                .map(|(offset, _)| offset)
                .unwrap_or(rest.len());

            let end = cut_point(&rest[..window_end], self.target_size).unwrap_or(window_end);
            self.cursor += end;

            let chunk = rest[..end].trim();
            if !chunk.is_empty() {
                return Some(chunk);
            }
        }

        None
    }
}

impl FusedIterator for Chunks<'_> {}

fn cut_point(window: &str, target_size: usize) -> Option<usize> {
    let candidates = [
        window.rfind(CODE_FENCE).map(|at| (at, 0)),
        window.rfind(PARAGRAPH_BREAK).map(|at| (at, 1)),
        window.rfind(SENTENCE_END).map(|at| (at, 1)),
    ];

    let mut best: Option<(usize, usize)> = None;
    for (at, keep) in candidates.into_iter().flatten() {
        if best.map_or(true, |(best_at, _)| at > best_at) {
            best = Some((at, keep));
        }
    }

    let (at, keep) = best?;
    let chars_before = window[..at].chars().count();
    if chars_before as f64 > target_size as f64 * MIN_CUT_RATIO {
        Some(at + keep)
    } else {
        None
    }
}
