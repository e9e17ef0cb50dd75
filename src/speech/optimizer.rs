//! Rewrites assistant replies into text that a TTS backend reads naturally.
//!
//! Pipeline (fixed order):
//! 1. Strip meta-commentary (`(Thinks: ...)`, `[...]`)
//! 2. Detect language (Devanagari share > 20% → Hindi)
//! 3. Collapse repeated words
//! 4. English only: contractions, then pronunciation fixes
//! 5. Break sentences longer than the configured limit at conjunctions
//! 6. Insert pauses after discourse markers
//! 7. Maybe prepend a filler word
//! 8. Make sure the text ends with `.`, `!` or `?`
//! 9. Collapse whitespace and repeated punctuation

use std::fmt;

use rand::seq::IndexedRandom;
use rand::Rng;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::lexicon::{
    BREAK_CONJUNCTIONS, CONTRACTIONS, FILLERS_EN, FILLERS_HI, PAUSE_MARKERS, PRONUNCIATIONS,
    QUESTION_WORDS,
};
use crate::config::SpeechConfig;
use crate::error::SpeechError;

const DEVANAGARI: std::ops::RangeInclusive<char> = '\u{0900}'..='\u{097F}';
const HINDI_THRESHOLD: f64 = 0.2;
const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Hindi,
    English,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hindi => write!(f, "hindi"),
            Self::English => write!(f, "english"),
        }
    }
}

/// Classify text by its share of Devanagari code points.
pub fn detect_language(text: &str) -> Language {
    let total = text.chars().count();
    if total == 0 {
        return Language::English;
    }
    let hindi = text.chars().filter(|c| DEVANAGARI.contains(c)).count();
    if hindi as f64 > total as f64 * HINDI_THRESHOLD {
        Language::Hindi
    } else {
        Language::English
    }
}

/// Collapse runs of case-insensitively identical consecutive words.
pub fn remove_repetition(text: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    for word in text.split_whitespace() {
        match kept.last() {
            Some(prev) if prev.to_lowercase() == word.to_lowercase() => {}
            _ => kept.push(word),
        }
    }
    kept.join(" ")
}

/// Prepend a language-appropriate filler with the given probability.
pub fn add_filler<R: Rng + ?Sized>(
    text: &str,
    lang: Language,
    probability: f64,
    rng: &mut R,
) -> String {
    let fillers = match lang {
        Language::Hindi => FILLERS_HI,
        Language::English => FILLERS_EN,
    };
    if rng.random::<f64>() < probability {
        if let Some(filler) = fillers.choose(rng) {
            return format!("{filler}, {text}");
        }
    }
    text.to_string()
}

fn is_word_char(c: Option<char>) -> bool {
    c.is_some_and(|c| c.is_alphanumeric() || c == '_')
}

/// Case-insensitive whole-word pattern for a lexicon term. Sides of the
/// term that are not word characters get no boundary anchor.
fn term_regex(term: &str) -> Regex {
    let start = if is_word_char(term.chars().next()) { r"\b" } else { "" };
    let end = if is_word_char(term.chars().last()) { r"\b" } else { "" };
    Regex::new(&format!("(?i){start}{}{end}", regex::escape(term)))
        .expect("lexicon term is a valid pattern")
}

fn alternation(words: &[&str]) -> String {
    words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|")
}

fn preview(text: &str) -> String {
    let head: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        format!("{head}...")
    } else {
        head
    }
}

pub struct SpeechOptimizer {
    config: SpeechConfig,
    contractions: Vec<(Regex, &'static str)>,
    pronunciations: Vec<(Regex, &'static str)>,
    pause_markers: Regex,
    conjunctions: Regex,
    question_words: Regex,
    sentence_end: Regex,
    thinks: Regex,
    brackets: Regex,
    whitespace: Regex,
    space_before_punct: Regex,
    repeated_dots: Regex,
    repeated_commas: Regex,
}

impl Default for SpeechOptimizer {
    fn default() -> Self {
        Self::new(SpeechConfig::default())
    }
}

impl SpeechOptimizer {
    pub fn new(config: SpeechConfig) -> Self {
        let compile = |pattern: &str| Regex::new(pattern).expect("static pattern is valid");

        Self {
            config,
            contractions: CONTRACTIONS
                .iter()
                .map(|(full, short)| (term_regex(full), *short))
                .collect(),
            pronunciations: PRONUNCIATIONS
                .iter()
                .map(|(term, spoken)| (term_regex(term), *spoken))
                .collect(),
            pause_markers: compile(&format!(r"(?i)\b(?:{})\b", alternation(PAUSE_MARKERS))),
            conjunctions: compile(&format!(r"(?i)\s+({})\s+", alternation(BREAK_CONJUNCTIONS))),
            question_words: compile(&format!(r"(?i)\b(?:{})\b", alternation(QUESTION_WORDS))),
            sentence_end: compile(r"[.!?]+\s+"),
            thinks: compile(r"(?i)\(Thinks:.*?\)"),
            brackets: compile(r"\[.*?\]"),
            whitespace: compile(r"\s+"),
            space_before_punct: compile(r"\s+([,.!?])"),
            repeated_dots: compile(r"\.{2,}"),
            repeated_commas: compile(r",{2,}"),
        }
    }

    pub fn config(&self) -> &SpeechConfig {
        &self.config
    }

    /// Optimize text for speech using the thread-local RNG for filler choice.
    pub fn optimize(&self, text: &str) -> String {
        let mut rng = rand::rng();
        self.optimize_with(text, &mut rng)
    }

    /// `None` passes through untouched.
    pub fn optimize_opt(&self, text: Option<&str>) -> Option<String> {
        text.map(|t| self.optimize(t))
    }

    /// Optimize text for speech with an injected RNG.
    pub fn optimize_with<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }

        let stripped = self.strip_meta_commentary(text.trim());
        if stripped.trim().is_empty() {
            return String::new();
        }

        let lang = detect_language(&stripped);
        let mut optimized = remove_repetition(&stripped);

        if lang == Language::English {
            optimized = self.apply_contractions(&optimized);
            optimized = self.fix_pronunciations(&optimized);
        }

        optimized = self.break_long_sentences(&optimized);
        optimized = self.insert_pauses(&optimized);
        optimized = add_filler(&optimized, lang, self.config.filler_probability, rng);
        optimized = self.add_natural_ending(&optimized);
        let optimized = self.cleanup(&optimized);

        debug!(
            "Speech optimization [{lang}]: \"{}\" → \"{}\"",
            preview(text),
            preview(&optimized)
        );

        optimized
    }

    /// Optimize (when enabled) and enforce the synthesis length limit.
    pub fn prepare_for_tts(&self, text: &str) -> Result<String, SpeechError> {
        let prepared = if self.config.enabled {
            self.optimize(text)
        } else {
            text.trim().to_string()
        };

        let chars = prepared.chars().count();
        if chars > self.config.max_tts_chars {
            return Err(SpeechError::TooLong {
                chars,
                max: self.config.max_tts_chars,
            });
        }
        Ok(prepared)
    }

    pub fn strip_meta_commentary(&self, text: &str) -> String {
        let without_thoughts = self.thinks.replace_all(text, "");
        self.brackets.replace_all(&without_thoughts, "").into_owned()
    }

    pub fn apply_contractions(&self, text: &str) -> String {
        let mut result = text.to_string();
        for (pattern, short) in &self.contractions {
            result = pattern
                .replace_all(&result, |caps: &regex::Captures| {
                    let lowercase_start = caps[0].chars().next().is_some_and(char::is_lowercase);
                    if lowercase_start && !short.starts_with("I'") {
                        lowercase_first(short)
                    } else {
                        short.to_string()
                    }
                })
                .into_owned();
        }
        result
    }

    pub fn fix_pronunciations(&self, text: &str) -> String {
        let mut result = text.to_string();
        for (pattern, spoken) in &self.pronunciations {
            result = pattern.replace_all(&result, *spoken).into_owned();
        }
        result
    }

    /// Add commas around conjunctions in sentences longer than the limit.
    pub fn break_long_sentences(&self, text: &str) -> String {
        let max = self.config.long_sentence_chars;
        let mut result = String::with_capacity(text.len() + 16);
        let mut last = 0;

        let push_segment = |segment: &str, out: &mut String| {
            if segment.chars().count() > max {
                out.push_str(&self.break_at_conjunctions(segment));
            } else {
                out.push_str(segment);
            }
        };

        for boundary in self.sentence_end.find_iter(text) {
            push_segment(&text[last..boundary.start()], &mut result);
            result.push_str(boundary.as_str());
            last = boundary.end();
        }
        push_segment(&text[last..], &mut result);

        result
    }

    /// Adjacent conjunctions share whitespace, so one pass can miss the
    /// second; rescan until every conjunction is followed by a comma.
    fn break_at_conjunctions(&self, segment: &str) -> String {
        let mut text = segment.to_string();
        loop {
            let next = self
                .conjunctions
                .replace_all(&text, |caps: &regex::Captures| {
                    let start = caps.get(0).map_or(0, |m| m.start());
                    let lead = if text[..start].ends_with(',') { " " } else { ", " };
                    format!("{lead}{}, ", &caps[1])
                })
                .into_owned();
            if next == text {
                return text;
            }
            text = next;
        }
    }

    /// Append a comma after each discourse marker, unless punctuation
    /// already follows it.
    pub fn insert_pauses(&self, text: &str) -> String {
        let mut result = String::with_capacity(text.len() + 16);
        let mut last = 0;

        for marker in self.pause_markers.find_iter(text) {
            result.push_str(&text[last..marker.end()]);
            let next = text[marker.end()..].chars().next();
            if !matches!(next, Some(',' | '.' | '!' | '?' | ';' | ':')) {
                result.push(',');
            }
            last = marker.end();
        }
        result.push_str(&text[last..]);

        result
    }

    pub fn add_natural_ending(&self, text: &str) -> String {
        let trimmed = text.trim_end_matches(|c: char| c == ',' || c.is_whitespace());
        if trimmed.is_empty() || trimmed.ends_with(['.', '!', '?']) {
            return trimmed.to_string();
        }
        if self.question_words.is_match(trimmed) {
            format!("{trimmed}?")
        } else {
            format!("{trimmed}.")
        }
    }

    pub fn cleanup(&self, text: &str) -> String {
        let collapsed = self.whitespace.replace_all(text, " ");
        let trimmed = collapsed.trim_start_matches(|c: char| c == ',' || c.is_whitespace());
        let tightened = self.space_before_punct.replace_all(trimmed.trim_end(), "${1}");
        let dots = self.repeated_dots.replace_all(&tightened, ".");
        self.repeated_commas.replace_all(&dots, ",").into_owned()
    }
}

fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
