//! Question answering over retrieved context: greeting and identity
//! short-circuits, the two-step context/analysis generation, and an
//! OpenAI-compatible chat completions client.

pub mod client;
pub mod generator;
pub mod orchestrator;
pub mod prompts;
pub mod retry;
pub mod short_circuit;

pub use client::ChatCompletionsClient;
pub use generator::AnswerGenerator;
pub use orchestrator::{remember, Answer, ChatTurn, QaOrchestrator, QaOutcome, Role, HISTORY_TURNS};
pub use short_circuit::{default_short_circuits, ShortCircuit};
