use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::tree::NodeId;

pub type Result<T> = std::result::Result<T, DetourError>;

#[derive(Error, Debug)]
pub enum DetourError {
    #[error("invalid geometry for {}: {reason}", road_label(.road))]
    InvalidGeometry {
        road: Option<RoadRef>,
        reason: String,
    },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("no failing oracle or no selectable road beneath node {node}, selection is undefined")]
    UndefinedSelection { node: NodeId },
    #[error("malformed road record {index}: {reason}")]
    Record { index: usize, reason: String },
    #[error("I/O error accessing path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("JSON error in '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Position of a road in the caller's input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoadRef {
    /// Index into the combined list, executed roads first.
    Combined(usize),
    Executed(usize),
    NotExecuted(usize),
}

impl RoadRef {
    /// Splits a combined index into the list the road was given in.
    pub fn split(self, executed_count: usize) -> Self {
        match self {
            RoadRef::Combined(i) if i < executed_count => RoadRef::Executed(i),
            RoadRef::Combined(i) => RoadRef::NotExecuted(i - executed_count),
            other => other,
        }
    }
}

impl fmt::Display for RoadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoadRef::Combined(i) => write!(f, "road {i} (executed roads first)"),
            RoadRef::Executed(i) => write!(f, "executed road {i}"),
            RoadRef::NotExecuted(i) => write!(f, "not-executed road {i}"),
        }
    }
}

fn road_label(road: &Option<RoadRef>) -> String {
    road.map_or_else(|| "road ?".to_string(), |r| r.to_string())
}

impl DetourError {
    pub(crate) fn geometry(reason: impl Into<String>) -> Self {
        DetourError::InvalidGeometry {
            road: None,
            reason: reason.into(),
        }
    }

    /// Attaches the combined index of the offending road to a geometry error.
    pub(crate) fn at_road(self, index: usize) -> Self {
        match self {
            DetourError::InvalidGeometry { reason, .. } => DetourError::InvalidGeometry {
                road: Some(RoadRef::Combined(index)),
                reason,
            },
            other => other,
        }
    }

    /// Rewrites a combined road index into the executed or not-executed list.
    pub(crate) fn in_input_lists(self, executed_count: usize) -> Self {
        match self {
            DetourError::InvalidGeometry { road, reason } => DetourError::InvalidGeometry {
                road: road.map(|r| r.split(executed_count)),
                reason,
            },
            other => other,
        }
    }
}
