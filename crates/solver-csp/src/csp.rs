use rand_chacha::ChaCha8Rng;
use seating_core::audit::placement_violations;
use seating_core::grid::GridDims;
use seating_core::relation::are_related;
use std::time::Instant;
use tracing::{debug, warn};
use types::StudentRecord;

const LAST_ROW_PENALTY: u32 = 1000;
const DEADLINE_CHECK_NODES: u64 = 128;

pub(crate) struct HallOutcome {
    /// Occupant per seat in row-major order; len == roster len.
    pub placed: Vec<StudentRecord>,
    /// Violating seat pairs of the returned placement. Empty means clean.
    pub violations: Vec<(usize, usize)>,
    pub attempts: u32,
}

/// Fills one hall. Each attempt runs a complete backtracking search; a
/// failed attempt is patched greedily so there is always a full placement
/// to fall back on, and the roster is reshuffled before the next try.
pub(crate) fn solve_hall(
    hall_name: &str,
    dims: GridDims,
    mut roster: Vec<StudentRecord>,
    shuffle_same_class: bool,
    max_attempts: u32,
    deadline: Option<Instant>,
    rng: &mut ChaCha8Rng,
) -> HallOutcome {
    let max_attempts = max_attempts.max(1);
    let mut best: Option<(Vec<StudentRecord>, Vec<(usize, usize)>)> = None;
    let mut attempts = 0u32;

    for attempt in 0..max_attempts {
        if attempt > 0 {
            crate::reshuffle_roster(&mut roster, shuffle_same_class, rng);
        }
        attempts = attempt + 1;

        let mut search = Search::new(&roster, dims, deadline);
        if search.run() {
            debug!(
                "hall {hall_name}: clean arrangement on attempt {attempts} ({} nodes)",
                search.nodes
            );
            return HallOutcome {
                placed: search.into_placement(),
                violations: Vec::new(),
                attempts,
            };
        }

        let placed = greedy_fill(&roster, &search.related, &search.neighbors);
        let refs: Vec<&StudentRecord> = placed.iter().collect();
        let violations = placement_violations(&dims, &refs);
        debug!(
            "hall {hall_name}: attempt {attempts} left {} adjacency violations",
            violations.len()
        );
        if best.as_ref().map_or(true, |(_, v)| violations.len() < v.len()) {
            best = Some((placed, violations));
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            warn!("hall {hall_name}: time limit hit after attempt {attempts}");
            break;
        }
    }

    let (placed, violations) = best.expect("at least one attempt ran");
    HallOutcome {
        placed,
        violations,
        attempts,
    }
}

struct Search<'a> {
    students: &'a [StudentRecord],
    dims: GridDims,
    seats: usize,
    neighbors: Vec<Vec<usize>>,
    related: Vec<Vec<bool>>,
    /// assignment[seat] = roster index of the occupant.
    assignment: Vec<Option<usize>>,
    /// domains[seat] = roster indices still allowed there.
    domains: Vec<Vec<usize>>,
    used: Vec<bool>,
    deadline: Option<Instant>,
    nodes: u64,
    out_of_time: bool,
}

impl<'a> Search<'a> {
    fn new(students: &'a [StudentRecord], dims: GridDims, deadline: Option<Instant>) -> Self {
        let seats = students.len();
        Search {
            students,
            dims,
            seats,
            neighbors: dims.neighbor_map(seats),
            related: relation_matrix(students),
            assignment: vec![None; seats],
            domains: vec![(0..seats).collect(); seats],
            used: vec![false; seats],
            deadline,
            nodes: 0,
            out_of_time: false,
        }
    }

    fn run(&mut self) -> bool {
        let Some(seat) = (0..self.seats).find(|&s| self.assignment[s].is_none()) else {
            // Complete; re-verify the whole grid before accepting.
            return self.verify_clean();
        };

        self.nodes += 1;
        if self.nodes % DEADLINE_CHECK_NODES == 0
            && self.deadline.is_some_and(|d| Instant::now() >= d)
        {
            self.out_of_time = true;
            return false;
        }

        let mut candidates: Vec<usize> = self.domains[seat]
            .iter()
            .copied()
            .filter(|&s| !self.used[s])
            .collect();
        candidates.sort_by_key(|&c| self.lcv_cost(seat, c));

        for cand in candidates {
            if !self.consistent(seat, cand) {
                continue;
            }
            self.assignment[seat] = Some(cand);
            self.used[cand] = true;
            let pruned = self.forward_check(seat, cand);
            if self.run() {
                return true;
            }
            self.restore(pruned);
            self.assignment[seat] = None;
            self.used[cand] = false;
            if self.out_of_time {
                return false;
            }
        }
        false
    }

    /// Least-constraining-value cost: how many options this candidate would
    /// remove from unassigned neighbor domains. Back-row candidates that
    /// already clash with a placed neighbor are pushed to the end of the
    /// ordering.
    fn lcv_cost(&self, seat: usize, cand: usize) -> u32 {
        let mut cost = 0u32;
        for &nb in &self.neighbors[seat] {
            if self.assignment[nb].is_some() {
                continue;
            }
            for &other in &self.domains[nb] {
                if self.used[other] {
                    continue;
                }
                if other == cand || self.related[cand][other] {
                    cost += 1;
                }
            }
        }
        if self.dims.row_of(seat) + 1 == self.dims.rows && !self.consistent(seat, cand) {
            cost += LAST_ROW_PENALTY;
        }
        cost
    }

    fn consistent(&self, seat: usize, cand: usize) -> bool {
        self.neighbors[seat].iter().all(|&nb| match self.assignment[nb] {
            Some(placed) => !self.related[cand][placed],
            None => true,
        })
    }

    fn forward_check(&mut self, seat: usize, cand: usize) -> Vec<(usize, Vec<usize>)> {
        let mut saved = Vec::new();
        for i in 0..self.neighbors[seat].len() {
            let nb = self.neighbors[seat][i];
            if self.assignment[nb].is_some() {
                continue;
            }
            let kept: Vec<usize> = self.domains[nb]
                .iter()
                .copied()
                .filter(|&other| other != cand && !self.related[cand][other])
                .collect();
            if kept.len() != self.domains[nb].len() {
                saved.push((nb, std::mem::replace(&mut self.domains[nb], kept)));
            }
        }
        saved
    }

    fn restore(&mut self, saved: Vec<(usize, Vec<usize>)>) {
        for (nb, domain) in saved {
            self.domains[nb] = domain;
        }
    }

    fn verify_clean(&self) -> bool {
        let placed: Vec<&StudentRecord> = self
            .assignment
            .iter()
            .map(|slot| &self.students[slot.expect("assignment is complete")])
            .collect();
        placement_violations(&self.dims, &placed).is_empty()
    }

    fn into_placement(self) -> Vec<StudentRecord> {
        self.assignment
            .into_iter()
            .map(|slot| self.students[slot.expect("assignment is complete")].clone())
            .collect()
    }
}

fn relation_matrix(students: &[StudentRecord]) -> Vec<Vec<bool>> {
    let n = students.len();
    let mut m = vec![vec![false; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            if are_related(&students[i], &students[j]) {
                m[i][j] = true;
                m[j][i] = true;
            }
        }
    }
    m
}

/// Seat-by-seat fill that takes, for every seat in row-major order, the
/// unused student clashing with the fewest already-placed neighbors. Always
/// produces a complete placement.
fn greedy_fill(
    students: &[StudentRecord],
    related: &[Vec<bool>],
    neighbors: &[Vec<usize>],
) -> Vec<StudentRecord> {
    let n = students.len();
    let mut seat_of: Vec<Option<usize>> = vec![None; n];
    let mut used = vec![false; n];

    for seat in 0..n {
        let mut pick = None;
        let mut pick_cost = u32::MAX;
        for cand in 0..n {
            if used[cand] {
                continue;
            }
            let cost = neighbors[seat]
                .iter()
                .filter(|&&nb| matches!(seat_of[nb], Some(p) if related[cand][p]))
                .count() as u32;
            if cost < pick_cost {
                pick = Some(cand);
                pick_cost = cost;
                if cost == 0 {
                    break;
                }
            }
        }
        let cand = pick.expect("one unused student per open seat");
        seat_of[seat] = Some(cand);
        used[cand] = true;
    }

    seat_of
        .into_iter()
        .map(|slot| students[slot.expect("every seat filled")].clone())
        .collect()
}
