//! Temporal constraints between dependee and dependant
//!
//! A constraint compares one boundary of the dependee (start or finish,
//! shifted by the lag) with one boundary of the dependant and reports a
//! [`Collision`] when the dependant is placed too early.
//!
//! | Type | Dependee boundary | Dependant boundary |
//! |------|-------------------|--------------------|
//! | FS   | finish            | start              |
//! | SS   | start             | start              |
//! | FF   | finish            | finish             |
//! | SF   | start             | finish             |

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ParseError;
use crate::domain::{Activity, Calendar};

/// Kind of temporal relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConstraintType {
    #[serde(rename = "SS")]
    StartStart,
    #[serde(rename = "FS")]
    FinishStart,
    #[serde(rename = "FF")]
    FinishFinish,
    #[serde(rename = "SF")]
    StartFinish,
}

impl ConstraintType {
    /// All constraint types in persistent order
    pub const ALL: [ConstraintType; 4] = [
        ConstraintType::StartStart,
        ConstraintType::FinishStart,
        ConstraintType::FinishFinish,
        ConstraintType::StartFinish,
    ];

    fn ordinal(&self) -> usize {
        match self {
            ConstraintType::StartStart => 0,
            ConstraintType::FinishStart => 1,
            ConstraintType::FinishFinish => 2,
            ConstraintType::StartFinish => 3,
        }
    }

    /// Returns the numeric persistent form, `"1"` to `"4"`
    pub fn persistent_value(&self) -> String {
        (self.ordinal() + 1).to_string()
    }

    /// Parses the numeric persistent form
    pub fn from_persistent_value(value: &str) -> Result<Self, ParseError> {
        value
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|code| code.checked_sub(1))
            .and_then(|ordinal| Self::ALL.get(ordinal).copied())
            .ok_or_else(|| ParseError::InvalidConstraintCode(value.to_string()))
    }

    /// Returns the two-letter mnemonic
    pub fn mnemonic(&self) -> &'static str {
        match self {
            ConstraintType::StartStart => "SS",
            ConstraintType::FinishStart => "FS",
            ConstraintType::FinishFinish => "FF",
            ConstraintType::StartFinish => "SF",
        }
    }

    /// Parses the two-letter mnemonic
    pub fn from_mnemonic(value: &str) -> Result<Self, ParseError> {
        Self::ALL
            .into_iter()
            .find(|t| t.mnemonic() == value)
            .ok_or_else(|| ParseError::InvalidConstraintMnemonic(value.to_string()))
    }

    /// Returns true if the dependee's start (not finish) is the reference boundary
    pub fn uses_dependee_start(&self) -> bool {
        matches!(self, ConstraintType::StartStart | ConstraintType::StartFinish)
    }

    /// Returns true if the dependant's finish (not start) is the constrained boundary
    pub fn constrains_dependant_finish(&self) -> bool {
        matches!(self, ConstraintType::FinishFinish | ConstraintType::StartFinish)
    }

    /// The dependee date the constraint is measured from
    pub fn dependee_date(&self, dependee: &Activity) -> NaiveDate {
        if self.uses_dependee_start() {
            dependee.start
        } else {
            dependee.end
        }
    }

    /// The dependant date the constraint applies to
    pub fn dependant_date(&self, dependant: &Activity) -> NaiveDate {
        if self.constrains_dependant_finish() {
            dependant.end
        } else {
            dependant.start
        }
    }

    /// Checks the dependant's current placement
    pub fn collision(
        &self,
        dependee: &Activity,
        dependant: &Activity,
        lag: i64,
        calendar: &dyn Calendar,
    ) -> Collision {
        let barrier = calendar.shift_date(self.dependee_date(dependee), lag);
        let active = self.dependant_date(dependant) < barrier;
        let acceptable_start = if self.constrains_dependant_finish() {
            calendar.shift_date(barrier, -dependant.working_length(calendar))
        } else {
            barrier
        };

        Collision::new(acceptable_start, Variation::StartLater, active)
    }

    /// Checks a hypothetical dependant start against the dependee
    ///
    /// The returned `acceptable_start` is the latest finish the dependee may
    /// have for `candidate_start` to satisfy the constraint; the collision is
    /// active if the dependee currently ends later than that.
    pub fn backward_collision(
        &self,
        dependee: &Activity,
        dependant: &Activity,
        lag: i64,
        candidate_start: NaiveDate,
        calendar: &dyn Calendar,
    ) -> Collision {
        let dependant_boundary = if self.constrains_dependant_finish() {
            calendar.shift_date(candidate_start, dependant.working_length(calendar))
        } else {
            candidate_start
        };
        let dependee_boundary = calendar.shift_date(dependant_boundary, -lag);
        let latest_finish = if self.uses_dependee_start() {
            calendar.shift_date(dependee_boundary, dependee.working_length(calendar))
        } else {
            dependee_boundary
        };

        Collision::new(
            latest_finish,
            Variation::StartEarlier,
            dependee.end > latest_finish,
        )
    }
}

impl fmt::Display for ConstraintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

impl FromStr for ConstraintType {
    type Err = ParseError;

    /// Accepts either the mnemonic or the numeric code
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::from_mnemonic(s).or_else(|_| {
            if s.chars().all(|c| c.is_ascii_digit()) && !s.is_empty() {
                Self::from_persistent_value(s)
            } else {
                Err(ParseError::InvalidConstraintMnemonic(s.to_string()))
            }
        })
    }
}

/// Direction in which the dependant has to move to resolve a collision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variation {
    StartEarlier,
    NoVariation,
    StartLater,
}

impl Variation {
    /// Signed value: -1, 0 or 1
    pub fn value(&self) -> i8 {
        match self {
            Variation::StartEarlier => -1,
            Variation::NoVariation => 0,
            Variation::StartLater => 1,
        }
    }
}

/// Result of testing a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collision {
    pub acceptable_start: NaiveDate,
    pub variation: Variation,
    pub active: bool,
}

impl Collision {
    pub fn new(acceptable_start: NaiveDate, variation: Variation, active: bool) -> Self {
        Self {
            acceptable_start,
            variation,
            active,
        }
    }

    /// Returns true if the dependant has to move
    pub fn is_active(&self) -> bool {
        self.active
    }
}
