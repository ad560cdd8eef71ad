// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

/// Classification of an [`Error`], used by callers that need to branch on the
/// failure rather than on its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Kube,
    NotFound,
    Conflict,
    ServiceNotFound,
    ApplicationNotFound,
    EmptyApplication,
    ShapeMismatch,
    InvalidPath,
    InvalidAnnotationPrefix,
    EmptyAnnotationName,
    HandlerNotFound,
    NamingStrategy,
    MappingTemplate,
    InvalidOptions,
    UnknownResource,
    Serialization,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("{resource} \"{name}\" not found")]
    NotFound { resource: String, name: String },

    #[error("conflict updating {resource} \"{name}\": {message}")]
    Conflict {
        resource: String,
        name: String,
        message: String,
    },

    #[error("backing service {kind} \"{name}\" not found")]
    ServiceNotFound { kind: String, name: String },

    #[error("application not found")]
    ApplicationNotFound,

    #[error("application is empty, neither name nor label selector is set")]
    EmptyApplication,

    #[error("unexpected shape at {path}: {message}")]
    ShapeMismatch { path: String, message: String },

    #[error("invalid path {0:?}: expected {{.field.path}}")]
    InvalidPath(String),

    #[error("annotation {0:?} is not a binding annotation")]
    InvalidAnnotationPrefix(String),

    #[error("annotation {0:?} produced an empty output name")]
    EmptyAnnotationName(String),

    #[error("no handler for annotation {name}={value}")]
    HandlerNotFound { name: String, value: String },

    #[error("naming strategy failed: {0}")]
    NamingStrategy(String),

    #[error("mapping {name:?} failed to render: {message}")]
    MappingTemplate { name: String, message: String },

    #[error("option {0:?} is missing")]
    InvalidOptions(&'static str),

    #[error("no API resource known for {0}")]
    UnknownResource(String),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::KubeError(kube::Error::Api(err)) if err.code == 404 => ErrorKind::NotFound,
            Error::KubeError(kube::Error::Api(err)) if err.code == 409 => ErrorKind::Conflict,
            Error::KubeError(_) => ErrorKind::Kube,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Conflict { .. } => ErrorKind::Conflict,
            Error::ServiceNotFound { .. } => ErrorKind::ServiceNotFound,
            Error::ApplicationNotFound => ErrorKind::ApplicationNotFound,
            Error::EmptyApplication => ErrorKind::EmptyApplication,
            Error::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            Error::InvalidPath(_) => ErrorKind::InvalidPath,
            Error::InvalidAnnotationPrefix(_) => ErrorKind::InvalidAnnotationPrefix,
            Error::EmptyAnnotationName(_) => ErrorKind::EmptyAnnotationName,
            Error::HandlerNotFound { .. } => ErrorKind::HandlerNotFound,
            Error::NamingStrategy(_) => ErrorKind::NamingStrategy,
            Error::MappingTemplate { .. } => ErrorKind::MappingTemplate,
            Error::InvalidOptions(_) => ErrorKind::InvalidOptions,
            Error::UnknownResource(_) => ErrorKind::UnknownResource,
            Error::SerializationError(_) => ErrorKind::Serialization,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Annotation errors that only disqualify a single annotation.
    pub fn is_skippable_annotation(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidAnnotationPrefix
                | ErrorKind::EmptyAnnotationName
                | ErrorKind::HandlerNotFound
        )
    }

    pub(crate) fn shape(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ShapeMismatch {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
