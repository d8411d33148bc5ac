//! The discovery boundary: where schemas come from.

use crate::openapi::{convert_openapi_to_schema, ConversionError, OpenAPIDocument};
use crate::schema::{GroupVersionKind, KindSchema, ResourceKind, Schema, TypeRef};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// ClientError is what a schema client reports when it cannot describe a kind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    #[error("no schema published for {0}")]
    NotFound(ResourceKind),

    #[error("schema for {kind} is unusable: root type {root} not found")]
    Unresolvable { kind: ResourceKind, root: String },

    #[error("discovery request failed: {0}")]
    Upstream(String),
}

/// SchemaClient fetches the structural schema of a resource kind, from a
/// live cluster's discovery endpoint or from an embedded schema set.
pub trait SchemaClient: Send + Sync {
    fn fetch(&self, kind: &ResourceKind) -> impl Future<Output = Result<KindSchema, ClientError>> + Send;
}

impl<C: SchemaClient> SchemaClient for Arc<C> {
    fn fetch(&self, kind: &ResourceKind) -> impl Future<Output = Result<KindSchema, ClientError>> + Send {
        self.as_ref().fetch(kind)
    }
}

/// StaticSchemaClient serves kinds from OpenAPI documents loaded up front.
/// It never touches the network.
#[derive(Debug, Clone, Default)]
pub struct StaticSchemaClient {
    kinds: BTreeMap<GroupVersionKind, (Arc<Schema>, String)>,
}

impl StaticSchemaClient {
    pub fn new() -> Self {
        StaticSchemaClient::default()
    }

    /// Builds a client from several documents. Conversion problems are
    /// returned alongside; they do not stop the remaining definitions from
    /// being served.
    pub fn from_openapi<'a, I>(docs: I) -> (Self, Vec<ConversionError>)
    where
        I: IntoIterator<Item = &'a OpenAPIDocument>,
    {
        let mut client = StaticSchemaClient::new();
        let mut errors = Vec::new();
        for doc in docs {
            errors.extend(client.add_document(doc));
        }
        (client, errors)
    }

    /// Adds every kind a document declares.
    pub fn add_document(&mut self, doc: &OpenAPIDocument) -> Vec<ConversionError> {
        let result = convert_openapi_to_schema(doc);
        let schema = Arc::new(result.schema);
        for (gvk, root) in result.kinds {
            self.kinds.insert(gvk, (schema.clone(), root));
        }
        result.errors
    }

    /// Registers a kind whose root type is `root` in `schema`.
    pub fn insert(&mut self, gvk: GroupVersionKind, schema: Arc<Schema>, root: impl Into<String>) {
        self.kinds.insert(gvk, (schema, root.into()));
    }

    /// Kinds this client can serve, in sorted order.
    pub fn kinds(&self) -> impl Iterator<Item = &GroupVersionKind> {
        self.kinds.keys()
    }

    fn lookup(&self, kind: &ResourceKind) -> Result<KindSchema, ClientError> {
        let (schema, root) = self
            .kinds
            .get(&kind.gvk)
            .ok_or_else(|| ClientError::NotFound(kind.clone()))?;
        let kind_schema = KindSchema::new(kind.clone(), schema.clone(), TypeRef::named(root.as_str()));
        if !kind_schema.is_resolvable() {
            return Err(ClientError::Unresolvable {
                kind: kind.clone(),
                root: root.clone(),
            });
        }
        Ok(kind_schema)
    }
}

impl SchemaClient for StaticSchemaClient {
    fn fetch(&self, kind: &ResourceKind) -> impl Future<Output = Result<KindSchema, ClientError>> + Send {
        std::future::ready(self.lookup(kind))
    }
}
