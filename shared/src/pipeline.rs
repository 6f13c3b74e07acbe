//! Ordered request pipeline: guard stages, then validation, then the handler.
//!
//! A [`Pipeline`] always ends with a [`ValidationGate`], so a handler only ever
//! receives an [`ApiRequest`] whose body, query and params have been parsed
//! against the route schema. Any stage failure short-circuits to the error
//! mapper and the handler is never invoked.

use std::collections::BTreeMap;
use std::future::Future;

use lambda_http::http::{HeaderMap, Method};
use lambda_http::{Body, Request, RequestExt, Response};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::auth::IdentityClaims;
use crate::http::error_response;
use crate::validation::{RouteSchema, ValidationGate};
use crate::{Error, Result};

/// Request surfaces exactly as they arrived.
#[derive(Debug, Clone, Default)]
pub struct RawInput {
    pub body: Option<Vec<u8>>,
    pub query: BTreeMap<String, String>,
    pub params: BTreeMap<String, String>,
}

/// Request surfaces after schema coercion.
#[derive(Debug, Clone, Default)]
pub struct ParsedInput {
    pub body: Map<String, Value>,
    pub query: Map<String, Value>,
    pub params: Map<String, Value>,
}

#[derive(Debug, Clone)]
enum Input {
    Raw(RawInput),
    Parsed(ParsedInput),
}

/// The request context threaded through every stage.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    headers: HeaderMap,
    identity: Option<IdentityClaims>,
    input: Input,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>, headers: HeaderMap, raw: RawInput) -> Self {
        Self {
            method,
            path: path.into(),
            headers,
            identity: None,
            input: Input::Raw(raw),
        }
    }

    /// Build from a Lambda proxy event. `route_params` are the segments the
    /// router captured and take precedence over API Gateway path parameters.
    pub fn from_lambda(event: &Request, route_params: BTreeMap<String, String>) -> Self {
        let mut query = BTreeMap::new();
        for (key, value) in event.query_string_parameters().iter() {
            query.entry(key.to_string()).or_insert_with(|| value.to_string());
        }

        let mut params: BTreeMap<String, String> = event
            .path_parameters()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        params.extend(route_params);

        let body = match event.body() {
            Body::Empty => None,
            body if body.as_ref().is_empty() => None,
            body => Some(body.as_ref().to_vec()),
        };

        Self::new(
            event.method().clone(),
            event.uri().path(),
            event.headers().clone(),
            RawInput {
                body,
                query,
                params,
            },
        )
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub(crate) fn attach_identity(&mut self, claims: IdentityClaims) {
        self.identity = Some(claims);
    }

    /// Identity attached by the auth guard.
    pub fn identity(&self) -> Result<&IdentityClaims> {
        self.identity.as_ref().ok_or(Error::MissingToken)
    }

    pub(crate) fn raw(&self) -> Option<&RawInput> {
        match &self.input {
            Input::Raw(raw) => Some(raw),
            Input::Parsed(_) => None,
        }
    }

    pub(crate) fn replace_input(&mut self, parsed: ParsedInput) {
        self.input = Input::Parsed(parsed);
    }

    fn parsed(&self) -> Result<&ParsedInput> {
        match &self.input {
            Input::Parsed(parsed) => Ok(parsed),
            Input::Raw(_) => Err(Error::Internal(format!(
                "{} {} reached a handler without validation",
                self.method, self.path
            ))),
        }
    }

    /// Parsed body as a typed value.
    pub fn body<T: DeserializeOwned>(&self) -> Result<T> {
        surface(&self.parsed()?.body)
    }

    /// Parsed query string as a typed value.
    pub fn query<T: DeserializeOwned>(&self) -> Result<T> {
        surface(&self.parsed()?.query)
    }

    /// Parsed path parameters as a typed value.
    pub fn params<T: DeserializeOwned>(&self) -> Result<T> {
        surface(&self.parsed()?.params)
    }

    /// Parsed body as its canonical JSON object.
    pub fn body_fields(&self) -> Result<&Map<String, Value>> {
        Ok(&self.parsed()?.body)
    }
}

fn surface<T: DeserializeOwned>(fields: &Map<String, Value>) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(fields.clone()))?)
}

/// One step of the pipeline: continue with a (possibly modified) request or
/// terminate with an error.
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, request: ApiRequest) -> Result<ApiRequest>;
}

/// Accumulates guard stages before the mandatory validation gate.
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<Box<dyn Stage>>,
}

impl PipelineBuilder {
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Close the pipeline with the route's validation gate.
    pub fn validate(mut self, schema: RouteSchema) -> Pipeline {
        self.stages.push(Box::new(ValidationGate::new(schema)));
        Pipeline {
            stages: self.stages,
        }
    }
}

/// An ordered sequence of stages ending in validation.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Run every stage in order, stopping at the first failure.
    pub fn prepare(&self, mut request: ApiRequest) -> Result<ApiRequest> {
        for stage in &self.stages {
            request = stage.apply(request).map_err(|e| {
                tracing::debug!(stage = stage.name(), "pipeline stage terminated request");
                e
            })?;
        }
        Ok(request)
    }

    /// Prepare the request, invoke the handler and map any failure.
    pub async fn run<F, Fut>(&self, request: ApiRequest, handler: F) -> Response<Body>
    where
        F: FnOnce(ApiRequest) -> Fut,
        Fut: Future<Output = Result<Response<Body>>>,
    {
        let outcome = match self.prepare(request) {
            Ok(request) => handler(request).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(response) => response,
            Err(e) => error_response(&e),
        }
    }
}
