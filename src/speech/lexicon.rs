//! Fixed word tables for the speech optimizer.
//!
//! Order matters where a later entry could match the output of an earlier
//! one; entries are applied top to bottom.

/// English phrase → contraction.
pub const CONTRACTIONS: &[(&str, &str)] = &[
    ("I am", "I'm"),
    ("I have", "I've"),
    ("I will", "I'll"),
    ("Let us", "Let's"),
    ("Do not", "Don't"),
    ("Cannot", "Can't"),
    ("It is", "It's"),
    ("That is", "That's"),
    ("You are", "You're"),
    ("We are", "We're"),
    ("They are", "They're"),
    ("Would not", "Wouldn't"),
    ("Could not", "Couldn't"),
    ("Should not", "Shouldn't"),
    ("Will not", "Won't"),
    ("Did not", "Didn't"),
];

pub const FILLERS_EN: &[&str] = &["Okay", "Sure", "Alright", "Got it", "Great", "Right", "Well"];

pub const FILLERS_HI: &[&str] = &["Accha", "Theek hai", "Haan", "Bilkul", "Zaroor"];

/// Discourse markers that get a short pause (comma) after them.
pub const PAUSE_MARKERS: &[&str] = &[
    "but", "so", "because", "actually", "alright", "okay", "great", "sure", "anyway",
    "lekin", "toh", "kyunki", "asal mein", "vaise", "phir", "aur",
];

/// Conjunctions a long sentence may be broken around.
pub const BREAK_CONJUNCTIONS: &[&str] = &["and", "but", "so", "because", "kyunki", "aur", "lekin"];

/// Real-estate acronyms and units → TTS-friendly spoken form.
pub const PRONUNCIATIONS: &[(&str, &str)] = &[
    ("BHK", "B H K"),
    ("DLF", "D L F"),
    ("RERA", "R E R A"),
    ("EMI", "E M I"),
    ("sq ft", "square feet"),
    ("sqft", "square feet"),
    ("lakhs", "lakh"),
    ("₹", "rupees "),
];

/// Words that mark a sentence as a question, in either language.
pub const QUESTION_WORDS: &[&str] = &[
    "kya", "kaise", "kab", "kahan", "kaun", "what", "when", "where", "who", "how",
];
