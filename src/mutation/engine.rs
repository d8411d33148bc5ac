//! Resolve, evaluate, apply: one admission request end to end.

use super::applier::PatchApplier;
use super::error::MutationError;
use super::request::{AdmissionContext, AdmissionRequest, PatchExpression};
use crate::config::EngineConfig;
use crate::resolver::{SchemaClient, SchemaResolver};
use crate::value::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// MutationEngine ties a shared schema resolver to the patch applier.
pub struct MutationEngine<C> {
    resolver: Arc<SchemaResolver<C>>,
    applier: PatchApplier,
    schema_timeout: Duration,
}

impl<C: SchemaClient> MutationEngine<C> {
    pub fn new(resolver: Arc<SchemaResolver<C>>, config: &EngineConfig) -> Self {
        MutationEngine {
            resolver,
            applier: PatchApplier::new(),
            schema_timeout: config.schema_timeout(),
        }
    }

    pub fn resolver(&self) -> &SchemaResolver<C> {
        &self.resolver
    }

    /// Mutates the object of `request` with the patch `expression` yields.
    ///
    /// Schema resolution is bounded by the configured timeout; running out
    /// of time is reported as `SchemaUnavailable`.
    #[instrument(skip_all, fields(uid = %request.uid, kind = %request.kind, operation = ?request.operation))]
    pub async fn mutate(
        &self,
        request: &AdmissionRequest,
        expression: &dyn PatchExpression,
        variables: Map,
    ) -> Result<Value, MutationError> {
        let kind = request.resource_kind();
        let schema = self.resolver.resolve_within(&kind, self.schema_timeout).await?;

        let ctx = AdmissionContext::new(request).with_variables(variables);
        let evaluation = expression.evaluate(&ctx);
        let live = request.object.clone().unwrap_or_default();

        let result = self.applier.apply_evaluation(kind, live, evaluation, Some(schema));
        if let Err(ref err) = result {
            debug!(reason = err.reason(), error = %err, "mutation failed");
        }
        result
    }
}
