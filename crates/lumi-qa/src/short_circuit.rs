//! Questions answered without retrieval. Checks run in order and the first
//! match wins.

const INTRODUCTION: &str =
    "I'm Lumi, your study assistant. Add PDFs or YouTube transcripts to a collection and ask me anything about them.";

const GREETINGS: [&str; 9] = ["hi", "hello", "hey", "hiya", "greetings", "good morning", "good afternoon", "good evening", "yo"];

const IDENTITY_QUESTIONS: [&str; 7] = [
    "who are you",
    "what are you",
    "what is your name",
    "whats your name",
    "introduce yourself",
    "tell me about yourself",
    "are you a bot",
];

pub trait ShortCircuit: Send + Sync {
    fn name(&self) -> &str;
    /// The reply, when this check claims the question.
    fn answer(&self, question: &str) -> Option<String>;
}

/// Lowercase words with punctuation removed.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.chars().filter(|c| c.is_alphanumeric()).flat_map(char::to_lowercase).collect::<String>())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// "hi", "hello there", "good morning lumi".
pub struct Greeting;

impl ShortCircuit for Greeting {
    fn name(&self) -> &str { "greeting" }

    fn answer(&self, question: &str) -> Option<String> {
        let text = normalize(question);
        let words = text.split(' ').count();
        let greeted = GREETINGS.iter().any(|g| text == *g || (text.starts_with(&format!("{g} ")) && words <= g.split(' ').count() + 2));
        greeted.then(|| format!("Hello! {INTRODUCTION}"))
    }
}

/// Questions about the assistant itself.
pub struct IdentityQuestion;

impl ShortCircuit for IdentityQuestion {
    fn name(&self) -> &str { "identity" }

    fn answer(&self, question: &str) -> Option<String> {
        let text = normalize(question);
        IDENTITY_QUESTIONS.iter().any(|q| text.contains(q)).then(|| INTRODUCTION.to_string())
    }
}

pub fn default_short_circuits() -> Vec<Box<dyn ShortCircuit>> {
    vec![Box::new(Greeting), Box::new(IdentityQuestion)]
}
