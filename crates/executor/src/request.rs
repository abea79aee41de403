use serde::{Deserialize, Serialize};
use value::{ConstValue, Variables};

/// An incoming GraphQL request.
#[derive(Debug, Deserialize)]
pub struct Request {
    pub query: String,
    #[serde(default, rename = "operationName", alias = "operation")]
    pub operation_name: Option<String>,
    #[serde(default)]
    pub variables: Variables,
}

impl Request {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            operation_name: None,
            variables: Variables::default(),
        }
    }

    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }
}

/// A GraphQL response.
#[derive(Debug, Default, Serialize)]
pub struct Response {
    pub data: ConstValue,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ServerError>,
}

impl Response {
    pub fn from_error(error: ServerError) -> Self {
        Self {
            data: ConstValue::Null,
            errors: vec![error],
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// One error entry of a response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerError {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<ConstValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<ConstValue>,
}

impl ServerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
            extensions: None,
        }
    }

    pub fn with_path(mut self, path: Vec<ConstValue>) -> Self {
        self.path = path;
        self
    }

    pub fn with_extensions(mut self, extensions: ConstValue) -> Self {
        self.extensions = Some(extensions);
        self
    }
}
