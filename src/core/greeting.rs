//! Local small-talk detection.
//!
//! Greetings, farewells, thanks and questions about the assistant itself are
//! answered from canned text without contacting the remote endpoint. The
//! matcher is purely lexical: a fixed phrase set, a handful of filler words
//! and the assistant's own name.

/// Phrases that count as small talk when they make up the whole message.
const PHRASES: &[&str] = &[
    // greetings
    "hi",
    "hello",
    "hey",
    "greetings",
    "good morning",
    "good afternoon",
    "good evening",
    "good night",
    "howdy",
    "hola",
    "salaam",
    "salam",
    // farewells
    "bye",
    "goodbye",
    "good bye",
    "see you",
    "farewell",
    "take care",
    "catch you later",
    "until next time",
    "talk to you later",
    "ttyl",
    // thanks
    "thanks",
    "thank you",
    "thx",
    "ty",
    "appreciate it",
    "appreciated",
    "grateful",
    "much appreciated",
    // small-talk questions
    "how are you",
    "how are you doing",
    "how do you do",
    "whats up",
    "what is up",
    "sup",
    "wassup",
    "hows it going",
    "how is it going",
    // identity questions
    "whats your name",
    "what is your name",
    "whats you name",
    "what is you name",
    "who are you",
    "what are you",
    "tell me about yourself",
    "introduce yourself",
];

/// Words allowed to pad a short greeting ("hi there", "thanks so much").
const FILLER_WORDS: &[&str] = &["there", "again", "so", "much", "very"];

/// Above this many words a message is treated as a real question.
const MAX_GREETING_WORDS: usize = 4;

#[derive(Debug, Clone, Copy)]
enum Keyword {
    /// Matches anywhere in the text.
    Substring(&'static str),
    /// Matches a whole whitespace-separated word.
    Word(&'static str),
}

impl Keyword {
    fn found_in(self, text: &str) -> bool {
        match self {
            Keyword::Substring(needle) => text.contains(needle),
            Keyword::Word(word) => text.split_whitespace().any(|w| w == word),
        }
    }
}

const IDENTITY_KEYWORDS: &[Keyword] = &[
    Keyword::Substring("your name"),
    Keyword::Substring("you name"),
    Keyword::Substring("who are you"),
    Keyword::Substring("what are you"),
    Keyword::Substring("about yourself"),
    Keyword::Substring("introduce yourself"),
];

const STATUS_KEYWORDS: &[Keyword] = &[
    Keyword::Substring("how are you"),
    Keyword::Substring("how do you do"),
    Keyword::Substring("hows it going"),
    Keyword::Substring("how is it going"),
    Keyword::Substring("whats up"),
    Keyword::Substring("what is up"),
    Keyword::Word("sup"),
    Keyword::Word("wassup"),
];

const FAREWELL_KEYWORDS: &[Keyword] = &[
    Keyword::Substring("bye"),
    Keyword::Substring("farewell"),
    Keyword::Substring("see you"),
    Keyword::Substring("take care"),
    Keyword::Substring("later"),
    Keyword::Substring("next time"),
    Keyword::Word("ttyl"),
];

const THANKS_KEYWORDS: &[Keyword] = &[
    Keyword::Substring("thank"),
    Keyword::Word("thx"),
    Keyword::Word("ty"),
    Keyword::Substring("appreciate"),
    Keyword::Substring("grateful"),
];

/// Result of classifying one user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub is_greeting: bool,
    pub canonical_response: Option<String>,
}

impl Classification {
    fn substantive() -> Self {
        Self {
            is_greeting: false,
            canonical_response: None,
        }
    }

    fn greeting(response: String) -> Self {
        Self {
            is_greeting: true,
            canonical_response: Some(response),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GreetingClassifier {
    display_name: String,
    name_token: String,
}

impl Default for GreetingClassifier {
    fn default() -> Self {
        Self::new("Nebras")
    }
}

impl GreetingClassifier {
    pub fn new(assistant_name: &str) -> Self {
        let display_name = assistant_name.trim().to_string();
        Self {
            name_token: normalize_apostrophes(&display_name.to_lowercase()),
            display_name,
        }
    }

    pub fn classify(&self, text: &str) -> Classification {
        let normalized = text.trim().to_lowercase();
        if normalized.is_empty() {
            return Classification::substantive();
        }

        if is_punctuation_only(&normalized) {
            return Classification::greeting(self.ask_for_question());
        }

        let cleaned = clean(&normalized);
        if !self.matches_phrase_set(&cleaned) {
            return Classification::substantive();
        }

        Classification::greeting(self.response_for(&cleaned))
    }

    fn matches_phrase_set(&self, cleaned: &str) -> bool {
        if is_phrase(cleaned) || is_phrase(&self.without_name(cleaned)) {
            return true;
        }

        let words: Vec<&str> = cleaned.split_whitespace().collect();
        match words.len() {
            0 => false,
            n if n > MAX_GREETING_WORDS => false,
            1 => is_phrase(words[0]) || words[0] == self.name_token,
            _ => words.iter().all(|word| {
                is_phrase(word) || FILLER_WORDS.contains(word) || *word == self.name_token
            }),
        }
    }

    fn without_name(&self, cleaned: &str) -> String {
        if self.name_token.is_empty() {
            return cleaned.to_string();
        }
        cleaned
            .split_whitespace()
            .filter(|word| *word != self.name_token)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn response_for(&self, cleaned: &str) -> String {
        let name = &self.display_name;
        let mentions = |keywords: &[Keyword]| keywords.iter().any(|k| k.found_in(cleaned));

        if mentions(IDENTITY_KEYWORDS) {
            format!(
                "I'm {name} 🤖, your AI medical assistant! I'm here to provide medical information and guidance. How can I help with your health questions today?"
            )
        } else if mentions(STATUS_KEYWORDS) {
            "I'm doing great, thank you for asking! 😊 I'm here and ready to help with any medical questions you have. How can I assist you today?".to_string()
        } else if mentions(FAREWELL_KEYWORDS) {
            "Goodbye! Take care and feel free to come back anytime you need medical information. Stay healthy! 👋".to_string()
        } else if mentions(THANKS_KEYWORDS) {
            "You're very welcome! I'm here anytime you need medical advice or information. Stay healthy! 😊".to_string()
        } else {
            format!(
                "Hello! 👋 I'm {name}, your AI medical assistant. How can I help you with your health questions today?"
            )
        }
    }

    fn ask_for_question(&self) -> String {
        "I'm here to help with medical questions! Please ask me anything about symptoms, conditions, medications, or general health concerns. 🏥".to_string()
    }
}

fn is_phrase(candidate: &str) -> bool {
    PHRASES.contains(&candidate)
}

fn is_punctuation_only(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_whitespace() || matches!(c, '?' | '!' | '.' | ',' | ';' | ':' | '\'' | '"'))
}

/// Drops apostrophes together with any whitespace around them, so
/// "what 's" and "what' s" both become "whats".
fn normalize_apostrophes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_whitespace() {
            let mut pending = String::from(c);
            while let Some(&next) = chars.peek() {
                if next.is_whitespace() {
                    pending.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            if !matches!(chars.peek(), Some('\'' | '’')) {
                out.push_str(&pending);
            }
        } else if c == '\'' || c == '’' {
            while chars.peek().is_some_and(|next| next.is_whitespace()) {
                chars.next();
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn clean(normalized: &str) -> String {
    let without_apostrophes = normalize_apostrophes(normalized);
    let trimmed = without_apostrophes.trim_end_matches([',', '!', '.', ';', '?', ':']);
    let spaced: String = trimmed
        .chars()
        .map(|c| match c {
            ',' | '!' | '.' | ';' | '?' | ':' => ' ',
            other => other,
        })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}
