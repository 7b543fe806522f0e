use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Clone, Debug, Serialize, Deserialize, JsonSchema, Eq, PartialEq, Ord, PartialOrd, Hash,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}
id_newtype!(StudentId);
id_newtype!(StaffId);

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, Eq, PartialEq, Hash)]
pub struct StudentRecord {
    pub id: StudentId,
    pub name: String,
    pub class: String,
    #[serde(default)]
    pub section: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, Eq, PartialEq, Hash)]
pub struct StaffRecord {
    pub id: StaffId,
    pub name: String,
}

/// One exam room in the plan. Only the last hall of a plan may stay
/// partially empty; every earlier hall must be packed to capacity.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct Hall {
    pub name: String,
    pub capacity: u32,
    #[serde(default)]
    pub rows: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct SeatingOptions {
    #[serde(default = "default_true")]
    pub shuffle_same_class: bool,
    /// Accepted for compatibility; only binary adjacency (distance 1) is
    /// enforced by the solver.
    #[serde(default = "default_min_distance")]
    pub min_distance_between_same_class: u32,
    #[serde(default = "default_true")]
    pub randomize_seats: bool,
}

fn default_true() -> bool {
    true
}

fn default_min_distance() -> u32 {
    1
}

impl Default for SeatingOptions {
    fn default() -> Self {
        Self {
            shuffle_same_class: true,
            min_distance_between_same_class: 1,
            randomize_seats: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct SeatingConfig {
    pub classes: Vec<String>,
    pub total_students: u32,
    pub total_teachers: u32,
    pub halls: Vec<Hall>,
    #[serde(default)]
    pub options: SeatingOptions,
}

impl SeatingConfig {
    pub fn total_capacity(&self) -> u32 {
        self.halls.iter().map(|h| h.capacity).sum()
    }
}

/// Randomness and work budget for one generation run. The seed makes the
/// whole run reproducible; the attempt cap and optional deadline bound the
/// backtracking search.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema)]
pub struct SeatingParams {
    pub seed: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub time_limit_ms: Option<u64>,
}

fn default_max_attempts() -> u32 {
    10
}

impl Default for SeatingParams {
    fn default() -> Self {
        Self {
            seed: 0,
            max_attempts: 10,
            time_limit_ms: None,
        }
    }
}

impl SeatingParams {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }
}

/// Solver input with the roster already resolved. Directory lookups happen
/// before this is built, so solving never suspends for I/O.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct SeatingRequest {
    pub config: SeatingConfig,
    #[serde(default)]
    pub params: SeatingParams,
    pub students: Vec<StudentRecord>,
    pub staff: Vec<StaffRecord>,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct SeatedStudent {
    pub id: StudentId,
    pub name: String,
    pub class: String,
    pub section: String,
    pub seat_number: u32,
    pub row: u32,
    pub column: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct HallArrangement {
    pub hall_name: String,
    pub capacity: u32,
    pub total_students: u32,
    pub available_seats: u32,
    pub rows: u32,
    pub columns: u32,
    pub supervisor: Option<String>,
    pub students: Vec<SeatedStudent>,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, Eq, PartialEq)]
pub struct SeatAddress {
    pub hall_name: String,
    pub seat_number: u32,
    pub row: u32,
    pub column: u32,
}

/// A pair of horizontally or diagonally adjacent seats whose occupants are
/// related. Seat numbers are the hall-local 1-based fill order.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, Eq, PartialEq)]
pub struct SeatViolation {
    pub hall_name: String,
    pub seat_a: u32,
    pub seat_b: u32,
    pub student_a: StudentId,
    pub student_b: StudentId,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct SeatingSummary {
    pub total_students: u32,
    pub total_halls: u32,
    pub total_capacity: u32,
    pub utilization_rate: f64,
    pub students_per_hall: Vec<u32>,
    pub teachers_assigned: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct SeatingResult {
    /// "solved" when every hall is violation-free, "degraded" when the
    /// retry budget ran out and the best attempt still has violations.
    pub status: String,
    pub halls: Vec<HallArrangement>,
    pub summary: SeatingSummary,
    pub seating_arrangement: BTreeMap<String, SeatAddress>,
    pub violations: Vec<SeatViolation>,
    pub stats: serde_json::Value,
}

impl SeatingResult {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}
