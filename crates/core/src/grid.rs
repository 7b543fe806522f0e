/// Rectangular seat grid for one hall. Seats are numbered row-major from
/// the front-left corner: seat = row * cols + col.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GridDims {
    pub rows: usize,
    pub cols: usize,
}

impl GridDims {
    /// Derives a grid with rows * cols >= capacity. Without an explicit row
    /// count the grid leans wide: cols = ceil(sqrt(capacity * 1.5)).
    pub fn for_capacity(capacity: usize, explicit_rows: Option<usize>) -> Self {
        match explicit_rows {
            Some(rows) => {
                let rows = rows.max(1);
                let cols = capacity.div_ceil(rows).max(1);
                GridDims { rows, cols }
            }
            None => {
                let cols = ((capacity as f64 * 1.5).sqrt().ceil() as usize).max(1);
                let rows = capacity.div_ceil(cols).max(1);
                GridDims { rows, cols }
            }
        }
    }

    pub fn seat_count(&self) -> usize {
        self.rows * self.cols
    }

    pub fn row_of(&self, seat: usize) -> usize {
        seat / self.cols
    }

    pub fn col_of(&self, seat: usize) -> usize {
        seat % self.cols
    }

    /// Seats directly left, right and on the four diagonals of `seat`.
    /// Directly in front / behind is absent on purpose: students may share
    /// a column.
    pub fn neighbor_seats(&self, seat: usize) -> Vec<usize> {
        let row = self.row_of(seat) as isize;
        let col = self.col_of(seat) as isize;
        let mut out = Vec::with_capacity(6);
        for (dr, dc) in [(0, -1), (0, 1), (-1, -1), (-1, 1), (1, -1), (1, 1)] {
            let (r, c) = (row + dr, col + dc);
            if r >= 0 && r < self.rows as isize && c >= 0 && c < self.cols as isize {
                out.push(r as usize * self.cols + c as usize);
            }
        }
        out
    }

    /// Per-seat neighbor lists for the first `occupied` seats, dropping
    /// neighbors that can never hold a student.
    pub fn neighbor_map(&self, occupied: usize) -> Vec<Vec<usize>> {
        (0..occupied)
            .map(|seat| {
                self.neighbor_seats(seat)
                    .into_iter()
                    .filter(|&n| n < occupied)
                    .collect()
            })
            .collect()
    }
}
