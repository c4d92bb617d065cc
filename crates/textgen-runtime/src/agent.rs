//! Pass-through agent execution

use std::sync::Arc;
use textgen_core::{GenerationRequest, GenerationResult, GenerationStream};
use textgen_providers::TextProvider;
use tracing::debug;

/// Dependencies for one agent run
///
/// Assembled once by the caller and passed in explicitly; the run itself
/// holds no other state. Upstream pipeline outputs (reasoner scope,
/// advisor guidance) are folded into the system prompt at request time.
#[derive(Clone)]
pub struct AgentDeps {
    /// Active generation provider
    pub provider: Arc<dyn TextProvider>,

    /// Base system prompt
    pub system_prompt: String,

    /// Scope document produced by the upstream reasoner step
    pub reasoner_output: String,

    /// Guidance produced by the upstream advisor step
    pub advisor_output: String,
}

impl AgentDeps {
    /// Create a deps bundle with empty upstream outputs
    pub fn new(provider: Arc<dyn TextProvider>, system_prompt: impl Into<String>) -> Self {
        Self {
            provider,
            system_prompt: system_prompt.into(),
            reasoner_output: String::new(),
            advisor_output: String::new(),
        }
    }

    /// Attach the reasoner's scope document
    pub fn with_reasoner_output(mut self, output: impl Into<String>) -> Self {
        self.reasoner_output = output.into();
        self
    }

    /// Attach the advisor's guidance
    pub fn with_advisor_output(mut self, output: impl Into<String>) -> Self {
        self.advisor_output = output.into();
        self
    }

    fn assembled_system_prompt(&self) -> String {
        let mut prompt = self.system_prompt.clone();
        if !self.reasoner_output.is_empty() {
            prompt.push_str("\n\nScope document from the reasoner:\n");
            prompt.push_str(&self.reasoner_output);
        }
        if !self.advisor_output.is_empty() {
            prompt.push_str("\n\nGuidance from the advisor:\n");
            prompt.push_str(&self.advisor_output);
        }
        prompt
    }

    fn build_request(&self, query: String) -> GenerationRequest {
        let mut builder = GenerationRequest::builder(query);
        let system = self.assembled_system_prompt();
        if !system.is_empty() {
            builder = builder.system_prompt(system);
        }
        builder.build()
    }
}

/// Run one query through the configured provider and return its result
///
/// Failures come back in-band as results with an error finish reason;
/// this function never fails on its own.
pub async fn run_agent(deps: &AgentDeps, query: impl Into<String>) -> GenerationResult {
    let request = deps.build_request(query.into());
    debug!(provider = deps.provider.name(), "Running agent query");
    deps.provider.generate(request).await
}

/// Stream one query through the configured provider
pub fn run_agent_stream(deps: &AgentDeps, query: impl Into<String>) -> GenerationStream {
    let request = deps.build_request(query.into());
    debug!(provider = deps.provider.name(), "Running streaming agent query");
    deps.provider.generate_stream(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::StreamExt;
    use std::sync::Mutex;
    use textgen_core::{FinishReason, StreamChunk, TokenEstimator, UsageRecord};

    /// Stub backend that answers every query with a fixed response and
    /// records the request it received.
    struct StubProvider {
        reply: &'static str,
        seen: Mutex<Option<GenerationRequest>>,
    }

    impl StubProvider {
        fn new(reply: &'static str) -> Self {
            Self {
                reply,
                seen: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl TextProvider for StubProvider {
        async fn generate(&self, request: GenerationRequest) -> GenerationResult {
            let estimator = TokenEstimator::new();
            let usage = UsageRecord::estimated(
                estimator.prompt_tokens(request.system_prompt.as_deref(), &request.prompt),
                estimator.estimate(self.reply),
            );
            *self.seen.lock().expect("lock") = Some(request);
            GenerationResult::completed(self.reply, "stub-model", usage)
        }

        fn generate_stream(&self, request: GenerationRequest) -> GenerationStream {
            let estimator = TokenEstimator::new();
            let usage = UsageRecord::estimated(
                estimator.prompt_tokens(request.system_prompt.as_deref(), &request.prompt),
                estimator.estimate(self.reply),
            );
            Box::pin(futures::stream::iter(vec![
                StreamChunk::fragment(self.reply, "stub-model", usage.clone()),
                StreamChunk::stopped("stub-model", usage),
            ]))
        }

        fn name(&self) -> &'static str {
            "stub"
        }

        fn model(&self) -> &'static str {
            "stub-model"
        }
    }

    #[tokio::test]
    async fn test_run_agent_passes_through_result() {
        let provider = Arc::new(StubProvider::new("Paris."));
        let deps = AgentDeps::new(provider.clone(), "Keep it short.");

        let result = run_agent(&deps, "What is the capital of France?").await;

        assert_eq!(result.text, "Paris.");
        assert_eq!(result.finish_reason, Some(FinishReason::Stop));
        assert!(result.usage.total_tokens > 0);

        let seen = provider.seen.lock().expect("lock").take().expect("request seen");
        assert_eq!(seen.prompt, "What is the capital of France?");
        assert_eq!(seen.system_prompt.as_deref(), Some("Keep it short."));
    }

    #[tokio::test]
    async fn test_upstream_outputs_folded_into_system_prompt() {
        let provider = Arc::new(StubProvider::new("ok"));
        let deps = AgentDeps::new(provider.clone(), "Base prompt.")
            .with_reasoner_output("scope here")
            .with_advisor_output("advice here");

        run_agent(&deps, "query").await;

        let seen = provider.seen.lock().expect("lock").take().expect("request seen");
        let system = seen.system_prompt.expect("has system prompt");
        assert!(system.starts_with("Base prompt."));
        assert!(system.contains("scope here"));
        assert!(system.contains("advice here"));
    }

    #[tokio::test]
    async fn test_empty_system_prompt_omitted() {
        let provider = Arc::new(StubProvider::new("ok"));
        let deps = AgentDeps::new(provider.clone(), "");

        run_agent(&deps, "query").await;

        let seen = provider.seen.lock().expect("lock").take().expect("request seen");
        assert_eq!(seen.system_prompt, None);
    }

    #[tokio::test]
    async fn test_run_agent_stream_terminates_once() {
        let provider = Arc::new(StubProvider::new("Paris."));
        let deps = AgentDeps::new(provider, "");

        let chunks: Vec<_> = run_agent_stream(&deps, "query").collect().await;

        assert_eq!(chunks.len(), 2);
        assert!(!chunks[0].is_terminal());
        assert!(chunks[1].is_terminal());
    }
}
