//! Header-aware document splitter.
//!
//! Splits markdown-ish text at `#` and `##` headers only; deeper levels
//! stay inside their section so documents are not over-fragmented.
//! Sections longer than `max_chars` are further split on paragraph, then
//! line, then word boundaries, with the tail of each piece repeated at
//! the start of the next so context survives arbitrary cut points.

use crate::config::ChunkingSettings;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        let s = ChunkingSettings::default();
        Self {
            max_chars: s.max_chars,
            overlap_chars: s.overlap_chars,
        }
    }
}

impl From<ChunkingSettings> for ChunkerConfig {
    fn from(s: ChunkingSettings) -> Self {
        Self {
            max_chars: s.max_chars,
            overlap_chars: s.overlap_chars,
        }
    }
}

/// A split segment before the pipeline assigns ids and merges metadata.
/// `headers` is the stack of enclosing section headers, outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDraft {
    pub content: String,
    pub headers: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Chunker {
    max_chars: usize,
    overlap_chars: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(ChunkerConfig::default())
    }
}

struct Section {
    headers: Vec<String>,
    body: String,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        let max_chars = config.max_chars.max(1);
        let mut overlap_chars = config.overlap_chars;
        if overlap_chars > max_chars / 2 {
            warn!(
                overlap_chars,
                max_chars, "overlap exceeds half the chunk size, clamping"
            );
            overlap_chars = max_chars / 2;
        }
        Self {
            max_chars,
            overlap_chars,
        }
    }

    /// Split raw text into ordered drafts. Empty input yields an empty
    /// vec (a no-op, not an error); header-less text yields at least one
    /// draft; a header whose body is blank yields none.
    pub fn split(&self, raw_text: &str) -> Vec<ChunkDraft> {
        if raw_text.trim().is_empty() {
            return Vec::new();
        }
        let mut drafts = Vec::new();
        for section in split_sections(raw_text) {
            let body = section.body.trim();
            if body.is_empty() {
                continue;
            }
            if char_len(body) <= self.max_chars {
                drafts.push(ChunkDraft {
                    content: body.to_string(),
                    headers: section.headers.clone(),
                });
            } else {
                for piece in self.split_bounded(body) {
                    drafts.push(ChunkDraft {
                        content: piece,
                        headers: section.headers.clone(),
                    });
                }
            }
        }
        drafts
    }

    /// Length-bounded splitter for over-long sections. Atomic pieces are
    /// cut on paragraph, then line, then word boundaries, merged greedily
    /// up to `max_chars`, and each new chunk starts with the last
    /// `overlap_chars` characters of the previous one.
    fn split_bounded(&self, text: &str) -> Vec<String> {
        // Leave room for the carried-over tail plus a joining newline.
        let budget = self
            .max_chars
            .saturating_sub(self.overlap_chars + 1)
            .max(1);
        let pieces = atomize(text, budget);

        let mut chunks: Vec<String> = Vec::new();
        let mut cur = String::new();
        for piece in pieces {
            if !cur.is_empty() && char_len(&cur) + 1 + char_len(&piece) > self.max_chars {
                let tail = tail_chars(&cur, self.overlap_chars).to_string();
                chunks.push(std::mem::take(&mut cur));
                cur = tail;
            }
            if !cur.is_empty() {
                cur.push('\n');
            }
            cur.push_str(&piece);
        }
        if !cur.trim().is_empty() {
            chunks.push(cur);
        }
        chunks
    }
}

/// Walk the text line by line, tracking the active `#`/`##` header stack.
/// Header markers inside fenced code blocks are body text.
fn split_sections(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut headers: Vec<String> = Vec::new();
    let mut body = String::new();
    let mut in_fence = false;

    let mut flush = |headers: &[String], body: &mut String| {
        if !body.trim().is_empty() {
            sections.push(Section {
                headers: headers.to_vec(),
                body: std::mem::take(body),
            });
        } else {
            body.clear();
        }
    };

    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            if !body.is_empty() {
                body.push('\n');
            }
            body.push_str(line);
            continue;
        }
        match header_level(trimmed) {
            Some(level) if !in_fence && level <= 2 => {
                flush(&headers, &mut body);
                let title = trimmed[level..].trim().to_string();
                headers.truncate(level - 1);
                headers.push(title);
            }
            _ => {
                if !body.is_empty() {
                    body.push('\n');
                }
                body.push_str(line);
            }
        }
    }
    flush(&headers, &mut body);
    sections
}

/// ATX header level of a line, if it is one. `###...` counts too so the
/// caller can decide not to split on it.
fn header_level(line: &str) -> Option<usize> {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if hashes == 0 {
        return None;
    }
    let rest = &line[hashes..];
    if rest.is_empty() || rest.starts_with(' ') {
        Some(hashes)
    } else {
        None
    }
}

/// Cut text into pieces no longer than `budget` characters, preferring
/// paragraph, then line, then word boundaries, hard-windowing anything
/// unbreakable.
fn atomize(text: &str, budget: usize) -> Vec<String> {
    let mut out = Vec::new();
    for para in text.split("\n\n") {
        let para = para.trim_matches('\n');
        if para.trim().is_empty() {
            continue;
        }
        if char_len(para) <= budget {
            out.push(para.to_string());
            continue;
        }
        for line in para.lines() {
            if line.trim().is_empty() {
                continue;
            }
            if char_len(line) <= budget {
                out.push(line.to_string());
                continue;
            }
            let mut buf = String::new();
            for word in line.split_whitespace() {
                if char_len(word) > budget {
                    if !buf.is_empty() {
                        out.push(std::mem::take(&mut buf));
                    }
                    out.extend(char_windows(word, budget));
                    continue;
                }
                if !buf.is_empty() && char_len(&buf) + 1 + char_len(word) > budget {
                    out.push(std::mem::take(&mut buf));
                }
                if !buf.is_empty() {
                    buf.push(' ');
                }
                buf.push_str(word);
            }
            if !buf.is_empty() {
                out.push(buf);
            }
        }
    }
    out
}

/// Fixed-size character windows over an unbreakable token.
fn char_windows(s: &str, window: usize) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    chars
        .chunks(window.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Last `n` characters of a string, on a char boundary.
fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_level_detection() {
        assert_eq!(header_level("# Title"), Some(1));
        assert_eq!(header_level("## Sub"), Some(2));
        assert_eq!(header_level("### Deep"), Some(3));
        assert_eq!(header_level("#hashtag"), None);
        assert_eq!(header_level("plain"), None);
        assert_eq!(header_level("#"), Some(1));
    }

    #[test]
    fn tail_chars_is_utf8_safe() {
        assert_eq!(tail_chars("héllo", 2), "lo");
        assert_eq!(tail_chars("héllo", 5), "héllo");
        assert_eq!(tail_chars("ab", 10), "ab");
        assert_eq!(tail_chars("ab", 0), "");
    }

    #[test]
    fn char_windows_cover_the_token() {
        let w = char_windows("abcdefg", 3);
        assert_eq!(w, vec!["abc", "def", "g"]);
    }
}
