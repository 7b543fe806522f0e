use crate::grid::GridDims;
use crate::relation::{are_related, related_labels};
use types::{HallArrangement, SeatViolation, SeatedStudent, StudentRecord};

// Right, down-left, down-right: every unordered adjacent pair is visited
// from exactly one of its endpoints.
const CANONICAL_DIRECTIONS: [(isize, isize); 3] = [(0, 1), (1, -1), (1, 1)];

/// Violating seat pairs (lower seat first) in a row-major placement where
/// `placed[seat]` is the occupant of that seat.
pub fn placement_violations(dims: &GridDims, placed: &[&StudentRecord]) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    for seat in 0..placed.len() {
        let row = dims.row_of(seat) as isize;
        let col = dims.col_of(seat) as isize;
        for (dr, dc) in CANONICAL_DIRECTIONS {
            let (r, c) = (row + dr, col + dc);
            if r >= dims.rows as isize || c < 0 || c >= dims.cols as isize {
                continue;
            }
            let other = r as usize * dims.cols + c as usize;
            if other < placed.len() && are_related(placed[seat], placed[other]) {
                out.push((seat, other));
            }
        }
    }
    out
}

/// Re-checks a formatted hall, reporting 1-based seat numbers and student
/// ids. Handles sparse occupancy: the tail of the last hall may be empty.
pub fn arrangement_violations(hall: &HallArrangement) -> Vec<SeatViolation> {
    let dims = GridDims {
        rows: hall.rows as usize,
        cols: hall.columns as usize,
    };
    let mut by_seat: Vec<Option<&SeatedStudent>> = vec![None; dims.seat_count()];
    for s in &hall.students {
        let seat = (s.row as usize - 1) * dims.cols + (s.column as usize - 1);
        if seat < by_seat.len() {
            by_seat[seat] = Some(s);
        }
    }

    let mut out = Vec::new();
    for seat in 0..by_seat.len() {
        let Some(a) = by_seat[seat] else { continue };
        let row = dims.row_of(seat) as isize;
        let col = dims.col_of(seat) as isize;
        for (dr, dc) in CANONICAL_DIRECTIONS {
            let (r, c) = (row + dr, col + dc);
            if r >= dims.rows as isize || c < 0 || c >= dims.cols as isize {
                continue;
            }
            let Some(b) = by_seat[r as usize * dims.cols + c as usize] else {
                continue;
            };
            if related_labels(&a.class, &a.section, &b.class, &b.section) {
                out.push(SeatViolation {
                    hall_name: hall.hall_name.clone(),
                    seat_a: a.seat_number,
                    seat_b: b.seat_number,
                    student_a: a.id.clone(),
                    student_b: b.id.clone(),
                });
            }
        }
    }
    out
}
