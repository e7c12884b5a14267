use futures::future::BoxFuture;

use lumi_core::error::Result;

/// Turns a rendered prompt into generated text.
pub trait AnswerGenerator: Send + Sync {
    fn model_id(&self) -> &str;
    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>>;
}
