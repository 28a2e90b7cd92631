//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls and pure engines into use-case APIs.
//! - Keep CLI and UI layers decoupled from storage details.

pub mod calendar_service;
pub mod reminder_service;

use crate::model::event::EventValidationError;
use crate::model::reminder::RecordId;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for calendar and reminder use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Quick-add input produced no title.
    EmptyTitle,
    /// Target record does not exist.
    NotFound(RecordId),
    /// Event write rejected by model invariants.
    InvalidEvent(EventValidationError),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Write succeeded but read-back did not match.
    InconsistentState(&'static str),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "reminder title must not be empty"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::InvalidEvent(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent state: {details}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEvent(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::Validation(err) => Self::InvalidEvent(err),
            other => Self::Repo(other),
        }
    }
}
