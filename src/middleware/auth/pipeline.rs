//! Ordered request stages and the runner that folds them.
//!
//! Each stage sees the request head and the context produced by the stages
//! before it, and either hands a (possibly augmented) context on or ends the
//! request with a rejection. Nothing is retried and nothing is cached across
//! requests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::request::Parts;
use tokio::time::Instant;

use super::context::RequestContext;
use super::rejection::AuthRejection;

#[derive(Debug)]
pub enum Outcome {
    Continue(RequestContext),
    Reject(AuthRejection),
}

#[async_trait]
pub trait Stage: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn run(&self, parts: &Parts, ctx: RequestContext) -> Outcome;
}

/// An explicit, ordered list of stages.
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
    verify_timeout: Option<Duration>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.stages.iter().map(|s| s.name()).collect();
        f.debug_struct("Pipeline")
            .field("stages", &names)
            .field("verify_timeout", &self.verify_timeout)
            .finish()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage; stages run in the order they were added.
    pub fn then<S: Stage + 'static>(mut self, stage: S) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Deadline given to requests that do not already carry one.
    pub fn verify_timeout(mut self, timeout: Duration) -> Self {
        self.verify_timeout = Some(timeout);
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub async fn run(
        &self,
        parts: &Parts,
        mut ctx: RequestContext,
    ) -> Result<RequestContext, AuthRejection> {
        if let (None, Some(timeout)) = (ctx.deadline(), self.verify_timeout) {
            ctx = ctx.with_deadline(Instant::now() + timeout);
        }

        for stage in &self.stages {
            match stage.run(parts, ctx).await {
                Outcome::Continue(next) => ctx = next,
                Outcome::Reject(rejection) => {
                    tracing::debug!(
                        stage = stage.name(),
                        status = %rejection.status(),
                        method = %parts.method,
                        path = %parts.uri.path(),
                        "request rejected"
                    );
                    return Err(rejection);
                }
            }
        }

        Ok(ctx)
    }
}
