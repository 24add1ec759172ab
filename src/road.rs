//! Road test cases used for testing an automated driving system.
//!
//! A road is identified by an opaque caller value (a number, a json record, ...)
//! and described by its Cartesian points. Executed roads are oracles with a known
//! outcome, not-executed roads are the candidates a selection draws from.

use geo_types::Coord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Failing,
    Passing,
    /// Not executed yet.
    Unknown,
}

impl Outcome {
    pub fn from_failing(is_failing: bool) -> Self {
        if is_failing {
            Outcome::Failing
        } else {
            Outcome::Passing
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoadTestCase<Id> {
    id: Id,
    points: Vec<Coord<f64>>,
    outcome: Outcome,
}

impl<Id> RoadTestCase<Id> {
    pub fn new(id: Id, points: Vec<Coord<f64>>, outcome: Outcome) -> Self {
        Self {
            id,
            points,
            outcome,
        }
    }

    /// An oracle road with a known pass/fail result.
    pub fn executed(id: Id, points: Vec<Coord<f64>>, is_failing: bool) -> Self {
        Self::new(id, points, Outcome::from_failing(is_failing))
    }

    pub fn not_executed(id: Id, points: Vec<Coord<f64>>) -> Self {
        Self::new(id, points, Outcome::Unknown)
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn points(&self) -> &[Coord<f64>] {
        &self.points
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn is_failing(&self) -> bool {
        self.outcome == Outcome::Failing
    }

    /// Only roads that have not been executed can be selected.
    pub fn is_selectable(&self) -> bool {
        self.outcome == Outcome::Unknown
    }
}
