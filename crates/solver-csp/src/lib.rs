mod csp;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use seating_core::grid::GridDims;
use seating_core::{validate, Directory, SeatingError, Solver};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use types::{
    Hall, HallArrangement, SeatAddress, SeatViolation, SeatedStudent, SeatingConfig, SeatingParams,
    SeatingRequest, SeatingResult, SeatingSummary, StaffRecord, StudentRecord,
};

pub struct CspSolver;
impl CspSolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Solver for CspSolver {
    async fn solve(&self, request: SeatingRequest) -> Result<SeatingResult, SeatingError> {
        self.generate(request)
    }
}

impl CspSolver {
    /// Synchronous entry point; `Solver::solve` delegates here. The whole
    /// run is CPU-bound and deterministic for a given request.
    pub fn generate(&self, request: SeatingRequest) -> Result<SeatingResult, SeatingError> {
        let SeatingRequest {
            config,
            params,
            students,
            staff,
        } = request;

        validate(&config)?;
        if params.max_attempts == 0 {
            return Err(SeatingError::Validation(
                "max_attempts must be positive".into(),
            ));
        }
        let students = check_roster(&config, students)?;
        let staff = check_staff(&config, staff)?;

        info!(
            "seating {} students across {} halls (seed {})",
            students.len(),
            config.halls.len(),
            params.seed
        );
        if config.options.min_distance_between_same_class > 1 {
            warn!(
                "min_distance_between_same_class={} requested; only direct adjacency is enforced",
                config.options.min_distance_between_same_class
            );
        }

        let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
        let deadline = params
            .time_limit_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms));

        let mut roster = students;
        if config.options.randomize_seats {
            roster.shuffle(&mut rng);
        }
        if config.options.shuffle_same_class {
            roster = interleave_sections(roster);
        }

        let rosters = pack_halls(&roster, &config.halls)?;
        let supervisors = assign_supervisors(&staff, config.halls.len(), &mut rng);

        let mut halls: Vec<HallArrangement> = Vec::with_capacity(config.halls.len());
        let mut flat: BTreeMap<String, SeatAddress> = BTreeMap::new();
        let mut violations: Vec<SeatViolation> = Vec::new();
        let mut attempts_per_hall: Vec<u32> = Vec::with_capacity(config.halls.len());

        for (i, sub) in rosters.into_iter().enumerate() {
            let hall = &config.halls[i];
            let dims = GridDims::for_capacity(hall.capacity as usize, hall.rows.map(|r| r as usize));
            let outcome = csp::solve_hall(
                &hall.name,
                dims,
                sub,
                config.options.shuffle_same_class,
                params.max_attempts,
                deadline,
                &mut rng,
            );
            if i + 1 < config.halls.len() && (outcome.placed.len() as u32) < hall.capacity {
                return Err(SeatingError::EarlyHallUnderfilled {
                    hall: hall.name.clone(),
                    missing: hall.capacity - outcome.placed.len() as u32,
                });
            }
            attempts_per_hall.push(outcome.attempts);
            violations.extend(violations_for_hall(hall, &outcome));

            let arrangement = format_hall(hall, &dims, &outcome.placed, supervisors[i].clone());
            for s in &arrangement.students {
                flat.insert(
                    s.id.0.clone(),
                    SeatAddress {
                        hall_name: hall.name.clone(),
                        seat_number: s.seat_number,
                        row: s.row,
                        column: s.column,
                    },
                );
            }
            halls.push(arrangement);
        }

        let summary = summarize(&config, &halls);
        let status = if violations.is_empty() {
            "solved"
        } else {
            "degraded"
        };
        if status == "degraded" {
            warn!(
                "retry budget exhausted; best arrangement keeps {} adjacency violations",
                violations.len()
            );
        }
        info!(
            "arrangement {}: {} of {} seats used",
            status, summary.total_students, summary.total_capacity
        );

        Ok(SeatingResult {
            status: status.into(),
            halls,
            summary,
            seating_arrangement: flat,
            violations,
            stats: serde_json::json!({
                "method": "csp-backtracking",
                "seed": params.seed,
                "attempts_per_hall": attempts_per_hall,
            }),
        })
    }
}

/// Looks up students and staff through `directory`, then solves. The config
/// classes list drives the student query; `total_teachers` caps the staff
/// query.
pub async fn generate_seating<D>(
    directory: &D,
    config: SeatingConfig,
    params: SeatingParams,
) -> Result<SeatingResult, SeatingError>
where
    D: Directory + ?Sized,
{
    validate(&config)?;
    let students = directory.find_students(&config.classes).await?;
    let staff = directory.find_staff(config.total_teachers as usize).await?;
    CspSolver::new().generate(SeatingRequest {
        config,
        params,
        students,
        staff,
    })
}

fn check_roster(
    config: &SeatingConfig,
    students: Vec<StudentRecord>,
) -> Result<Vec<StudentRecord>, SeatingError> {
    if students.is_empty() {
        return Err(SeatingError::Directory(anyhow::anyhow!(
            "no students found for classes {:?}",
            config.classes
        )));
    }
    let mut seen = HashSet::new();
    for s in &students {
        if !seen.insert(s.id.0.as_str()) {
            return Err(SeatingError::Directory(anyhow::anyhow!(
                "duplicate student id {} in lookup result",
                s.id
            )));
        }
    }
    if students.len() as u32 != config.total_students {
        warn!(
            "config declares {} students but the lookup returned {}; seating the returned roster",
            config.total_students,
            students.len()
        );
    }
    Ok(students)
}

fn check_staff(
    config: &SeatingConfig,
    staff: Vec<StaffRecord>,
) -> Result<Vec<StaffRecord>, SeatingError> {
    if staff.len() < config.halls.len() {
        return Err(SeatingError::Capacity(format!(
            "{} supervisors available for {} halls",
            staff.len(),
            config.halls.len()
        )));
    }
    if staff.len() as u32 != config.total_teachers {
        warn!(
            "config declares {} teachers but the lookup returned {}",
            config.total_teachers,
            staff.len()
        );
    }
    Ok(staff)
}

/// Groups the roster by class+section and deals the groups back out round
/// robin, so consecutive seats draw from different groups. Group order
/// follows first appearance, which the caller's shuffle already randomized.
fn interleave_sections(roster: Vec<StudentRecord>) -> Vec<StudentRecord> {
    let mut groups: Vec<(String, VecDeque<StudentRecord>)> = Vec::new();
    for student in roster {
        let key = format!(
            "{}::{}",
            student.class.trim(),
            student.section.trim().to_uppercase()
        );
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, group)) => group.push_back(student),
            None => groups.push((key, VecDeque::from([student]))),
        }
    }

    let total: usize = groups.iter().map(|(_, g)| g.len()).sum();
    let mut out = Vec::with_capacity(total);
    while out.len() < total {
        for (_, group) in groups.iter_mut() {
            if let Some(student) = group.pop_front() {
                out.push(student);
            }
        }
    }
    out
}

/// Shuffle used before every retry; the initial ordering additionally
/// honors `randomize_seats`.
pub(crate) fn reshuffle_roster(
    roster: &mut Vec<StudentRecord>,
    shuffle_same_class: bool,
    rng: &mut ChaCha8Rng,
) {
    roster.shuffle(rng);
    if shuffle_same_class {
        let drained = std::mem::take(roster);
        *roster = interleave_sections(drained);
    }
}

/// Splits the roster into per-hall slices in declaration order. Every hall
/// except the last must be filled to capacity; students beyond the total
/// capacity are left out with a warning.
fn pack_halls(
    roster: &[StudentRecord],
    halls: &[Hall],
) -> Result<Vec<Vec<StudentRecord>>, SeatingError> {
    let mut out = Vec::with_capacity(halls.len());
    let mut cursor = 0usize;
    for (i, hall) in halls.iter().enumerate() {
        let take = (hall.capacity as usize).min(roster.len() - cursor);
        if i + 1 < halls.len() && take < hall.capacity as usize {
            return Err(SeatingError::Capacity(format!(
                "hall {} needs {} students to fill but only {} remain; \
                 shrink the room plan or enroll the missing students",
                hall.name, hall.capacity, take
            )));
        }
        out.push(roster[cursor..cursor + take].to_vec());
        cursor += take;
    }
    if cursor < roster.len() {
        warn!(
            "{} students exceed the total hall capacity and were not seated",
            roster.len() - cursor
        );
    }
    Ok(out)
}

fn assign_supervisors(
    staff: &[StaffRecord],
    halls: usize,
    rng: &mut ChaCha8Rng,
) -> Vec<Option<String>> {
    let mut pool: Vec<&StaffRecord> = staff.iter().collect();
    pool.shuffle(rng);
    (0..halls).map(|i| pool.get(i).map(|s| s.name.clone())).collect()
}

fn violations_for_hall(hall: &Hall, outcome: &csp::HallOutcome) -> Vec<SeatViolation> {
    outcome
        .violations
        .iter()
        .map(|&(a, b)| SeatViolation {
            hall_name: hall.name.clone(),
            seat_a: a as u32 + 1,
            seat_b: b as u32 + 1,
            student_a: outcome.placed[a].id.clone(),
            student_b: outcome.placed[b].id.clone(),
        })
        .collect()
}

fn format_hall(
    hall: &Hall,
    dims: &GridDims,
    placed: &[StudentRecord],
    supervisor: Option<String>,
) -> HallArrangement {
    let students = placed
        .iter()
        .enumerate()
        .map(|(seat, s)| SeatedStudent {
            id: s.id.clone(),
            name: s.name.clone(),
            class: s.class.clone(),
            section: s.section.clone(),
            seat_number: seat as u32 + 1,
            row: dims.row_of(seat) as u32 + 1,
            column: dims.col_of(seat) as u32 + 1,
        })
        .collect();
    HallArrangement {
        hall_name: hall.name.clone(),
        capacity: hall.capacity,
        total_students: placed.len() as u32,
        available_seats: hall.capacity - placed.len() as u32,
        rows: dims.rows as u32,
        columns: dims.cols as u32,
        supervisor,
        students,
    }
}

fn summarize(config: &SeatingConfig, halls: &[HallArrangement]) -> SeatingSummary {
    let placed: u32 = halls.iter().map(|h| h.total_students).sum();
    let capacity = config.total_capacity();
    SeatingSummary {
        total_students: placed,
        total_halls: halls.len() as u32,
        total_capacity: capacity,
        utilization_rate: if capacity == 0 {
            0.0
        } else {
            f64::from(placed) / f64::from(capacity)
        },
        students_per_hall: halls.iter().map(|h| h.total_students).collect(),
        teachers_assigned: halls.iter().filter(|h| h.supervisor.is_some()).count() as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{StaffId, StudentId};

    fn student(id: &str, class: &str, section: &str) -> StudentRecord {
        StudentRecord {
            id: StudentId(id.into()),
            name: format!("Student {id}"),
            class: class.into(),
            section: section.into(),
        }
    }

    fn staff(n: usize) -> Vec<StaffRecord> {
        (0..n)
            .map(|i| StaffRecord {
                id: StaffId(format!("t{i}")),
                name: format!("Teacher {i}"),
            })
            .collect()
    }

    fn hall(name: &str, capacity: u32, rows: Option<u32>) -> Hall {
        Hall {
            name: name.into(),
            capacity,
            rows,
        }
    }

    #[test]
    fn packer_fills_early_halls_exactly() {
        let roster: Vec<StudentRecord> = (0..7)
            .map(|i| student(&format!("s{i}"), &format!("{}", i + 1), "A"))
            .collect();
        let halls = vec![hall("A", 5, None), hall("B", 5, None)];
        let packed = pack_halls(&roster, &halls).unwrap();
        assert_eq!(packed[0].len(), 5);
        assert_eq!(packed[1].len(), 2);
    }

    #[test]
    fn packer_rejects_a_shortfall_before_the_last_hall() {
        let roster: Vec<StudentRecord> = (0..4)
            .map(|i| student(&format!("s{i}"), "9", "A"))
            .collect();
        let halls = vec![hall("A", 5, None), hall("B", 5, None)];
        let err = pack_halls(&roster, &halls).unwrap_err();
        assert!(matches!(err, SeatingError::Capacity(_)));
        assert!(err.to_string().contains("hall A needs 5"));
    }

    #[test]
    fn packer_truncates_overflow_to_capacity() {
        let roster: Vec<StudentRecord> = (0..9)
            .map(|i| student(&format!("s{i}"), &format!("{}", i + 1), "A"))
            .collect();
        let halls = vec![hall("A", 4, None), hall("B", 3, None)];
        let packed = pack_halls(&roster, &halls).unwrap();
        assert_eq!(packed[0].len(), 4);
        assert_eq!(packed[1].len(), 3);
    }

    #[test]
    fn interleave_alternates_groups() {
        let roster = vec![
            student("a1", "5", "A"),
            student("a2", "5", "A"),
            student("a3", "5", "A"),
            student("b1", "6", "A"),
            student("b2", "6", "A"),
            student("b3", "6", "A"),
        ];
        let mixed = interleave_sections(roster);
        let classes: Vec<&str> = mixed.iter().map(|s| s.class.as_str()).collect();
        assert_eq!(classes, vec!["5", "6", "5", "6", "5", "6"]);
    }

    #[test]
    fn interleave_drains_uneven_groups() {
        let roster = vec![
            student("a1", "5", "A"),
            student("a2", "5", "A"),
            student("a3", "5", "A"),
            student("b1", "6", "A"),
        ];
        let mixed = interleave_sections(roster);
        assert_eq!(mixed.len(), 4);
        let classes: Vec<&str> = mixed.iter().map(|s| s.class.as_str()).collect();
        assert_eq!(classes, vec!["5", "6", "5", "5"]);
    }

    #[test]
    fn supervisors_cover_every_hall_without_repeats() {
        let staff = staff(5);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let picked = assign_supervisors(&staff, 3, &mut rng);
        assert_eq!(picked.len(), 3);
        let names: HashSet<&String> = picked.iter().flatten().collect();
        assert_eq!(names.len(), 3, "no teacher supervises two halls");
    }

    #[test]
    fn staff_shortage_is_a_capacity_error() {
        let config = SeatingConfig {
            classes: vec!["9A".into()],
            total_students: 2,
            total_teachers: 2,
            halls: vec![hall("A", 2, None), hall("B", 2, None)],
            options: Default::default(),
        };
        let err = check_staff(&config, staff(1)).unwrap_err();
        assert!(matches!(err, SeatingError::Capacity(_)));
        assert!(err.to_string().contains("supervisors"));
    }

    #[test]
    fn duplicate_roster_ids_are_rejected() {
        let config = SeatingConfig {
            classes: vec!["9A".into()],
            total_students: 2,
            total_teachers: 1,
            halls: vec![hall("A", 2, None)],
            options: Default::default(),
        };
        let dup = vec![student("s1", "9", "A"), student("s1", "9", "A")];
        let err = check_roster(&config, dup).unwrap_err();
        assert!(matches!(err, SeatingError::Directory(_)));
    }

    #[test]
    fn zero_max_attempts_is_rejected() {
        let config = SeatingConfig {
            classes: vec!["9A".into()],
            total_students: 1,
            total_teachers: 1,
            halls: vec![hall("A", 1, None)],
            options: Default::default(),
        };
        let request = SeatingRequest {
            config,
            params: SeatingParams {
                seed: 0,
                max_attempts: 0,
                time_limit_ms: None,
            },
            students: vec![student("s1", "9", "A")],
            staff: staff(1),
        };
        let err = CspSolver::new().generate(request).unwrap_err();
        assert!(matches!(err, SeatingError::Validation(_)));
    }
}
