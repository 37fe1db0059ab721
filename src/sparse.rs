//! Sparse matrices backing the automaton graphs.
//!
//! Both matrix types go through a two-phase lifecycle: a build phase that accepts
//! coordinate triplets in any order, and a sealed phase that stores the entries in
//! compressed form for traversal. Sealing sorts, deduplicates and compresses; unsealing
//! re-expands the entries so that more triplets can be accepted. Queries are only
//! available on sealed matrices and building into a sealed matrix is a programmer error
//! that panics.

use crate::events::EventSet;

/// A sparse boolean matrix in compressed column form.
///
/// This is the structural companion of the event graph: one entry per edge (in reversed
/// orientation, see [`Automaton`](crate::automaton::Automaton)) plus the identity
/// diagonal. The only arithmetic it supports is the matrix product over the boolean
/// semiring, which is what breadth-first reachability is built from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SparseBitMatrix {
    nrows: usize,
    ncols: usize,
    repr: BitRepr,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum BitRepr {
    Building(Vec<(usize, usize)>),
    Sealed { col_ptr: Vec<usize>, rows: Vec<usize> },
}

impl SparseBitMatrix {
    /// Creates an empty matrix in the build phase.
    pub fn new(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            repr: BitRepr::Building(Vec::new()),
        }
    }

    /// Creates the sealed identity matrix of the given dimension.
    pub fn identity(n: usize) -> Self {
        let mut matrix = Self::new(n, n);
        for i in 0..n {
            matrix.add(i, i);
        }
        matrix.seal();
        matrix
    }

    /// Creates a sealed n×1 column vector with the given support.
    pub fn column_vector<I: IntoIterator<Item = usize>>(n: usize, support: I) -> Self {
        let mut vector = Self::new(n, 1);
        for row in support {
            vector.add(row, 0);
        }
        vector.seal();
        vector
    }

    /// The number of rows.
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// The number of columns.
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Whether the matrix is sealed.
    pub fn is_sealed(&self) -> bool {
        matches!(self.repr, BitRepr::Sealed { .. })
    }

    /// Records a true entry at `(row, col)`. Duplicates are tolerated and collapse at
    /// seal time.
    ///
    /// # Panics
    /// When the matrix is sealed or the coordinates are out of range.
    pub fn add(&mut self, row: usize, col: usize) {
        assert!(
            row < self.nrows && col < self.ncols,
            "entry ({row}, {col}) outside of a {}x{} matrix",
            self.nrows,
            self.ncols
        );
        match &mut self.repr {
            BitRepr::Building(triplets) => triplets.push((row, col)),
            BitRepr::Sealed { .. } => panic!("cannot build into a sealed matrix"),
        }
    }

    /// Changes the dimensions. Only allowed during the build phase; existing entries must
    /// fit the new shape.
    pub fn resize(&mut self, nrows: usize, ncols: usize) {
        let BitRepr::Building(triplets) = &self.repr else {
            panic!("cannot resize a sealed matrix");
        };
        assert!(
            triplets.iter().all(|&(r, c)| r < nrows && c < ncols),
            "resize would drop existing entries"
        );
        self.nrows = nrows;
        self.ncols = ncols;
    }

    /// Sorts, deduplicates and compresses the entries. Idempotent.
    pub fn seal(&mut self) {
        let BitRepr::Building(triplets) = &mut self.repr else {
            return;
        };
        triplets.sort_unstable_by_key(|&(r, c)| (c, r));
        triplets.dedup();
        let mut col_ptr = vec![0usize; self.ncols + 1];
        let mut rows = Vec::with_capacity(triplets.len());
        for &(r, c) in triplets.iter() {
            col_ptr[c + 1] += 1;
            rows.push(r);
        }
        for c in 0..self.ncols {
            col_ptr[c + 1] += col_ptr[c];
        }
        self.repr = BitRepr::Sealed { col_ptr, rows };
    }

    /// Re-expands a sealed matrix into the build phase. Idempotent.
    pub fn unseal(&mut self) {
        let BitRepr::Sealed { col_ptr, rows } = &self.repr else {
            return;
        };
        let mut triplets = Vec::with_capacity(rows.len());
        for c in 0..self.ncols {
            for &r in &rows[col_ptr[c]..col_ptr[c + 1]] {
                triplets.push((r, c));
            }
        }
        self.repr = BitRepr::Building(triplets);
    }

    /// The rows with a true entry in the given column, ascending.
    ///
    /// # Panics
    /// When the matrix is not sealed.
    pub fn column(&self, col: usize) -> &[usize] {
        let BitRepr::Sealed { col_ptr, rows } = &self.repr else {
            panic!("column iteration requires a sealed matrix");
        };
        &rows[col_ptr[col]..col_ptr[col + 1]]
    }

    /// The number of stored entries.
    pub fn nnz(&self) -> usize {
        match &self.repr {
            BitRepr::Building(triplets) => triplets.len(),
            BitRepr::Sealed { rows, .. } => rows.len(),
        }
    }

    /// Whether the entry at `(row, col)` is true.
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.column(col).binary_search(&row).is_ok()
    }

    /// Returns the sealed transpose.
    pub fn transpose(&self) -> SparseBitMatrix {
        let mut result = SparseBitMatrix::new(self.ncols, self.nrows);
        for col in 0..self.ncols {
            for &row in self.column(col) {
                result.add(col, row);
            }
        }
        result.seal();
        result
    }

    /// The boolean matrix product `self · rhs`: an entry of the result is true when some
    /// inner index is true in both factors (OR of ANDs).
    pub fn spgemm_bool(&self, rhs: &SparseBitMatrix) -> SparseBitMatrix {
        assert_eq!(
            self.ncols,
            rhs.nrows,
            "dimension mismatch in boolean matrix product"
        );
        let mut result = SparseBitMatrix::new(self.nrows, rhs.ncols);
        let mut stamped = vec![false; self.nrows];
        let mut touched = Vec::new();
        for col in 0..rhs.ncols {
            for &inner in rhs.column(col) {
                for &row in self.column(inner) {
                    if !stamped[row] {
                        stamped[row] = true;
                        touched.push(row);
                    }
                }
            }
            for &row in &touched {
                result.add(row, col);
                stamped[row] = false;
            }
            touched.clear();
        }
        result.seal();
        result
    }

    /// The support of an n×1 column vector, ascending.
    pub fn support(&self) -> &[usize] {
        assert_eq!(self.ncols, 1, "support is only defined for column vectors");
        self.column(0)
    }
}

/// A sparse row-major matrix whose nonzero entries are [`EventSet`]s.
///
/// This is the adjacency representation of an automaton: the entry at `(i, j)` carries
/// every event labelling the edge `i → j`, and an absent entry means there is no such
/// edge. Adding a triplet for an already occupied coordinate ORs the event sets together.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SparseEventMatrix {
    nrows: usize,
    ncols: usize,
    repr: EventRepr,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum EventRepr {
    Building(Vec<(usize, usize, EventSet)>),
    Sealed {
        row_ptr: Vec<usize>,
        cols: Vec<usize>,
        events: Vec<EventSet>,
    },
}

impl SparseEventMatrix {
    /// Creates an empty matrix in the build phase.
    pub fn new(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            repr: EventRepr::Building(Vec::new()),
        }
    }

    /// The number of rows.
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// The number of columns.
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Whether the matrix is sealed.
    pub fn is_sealed(&self) -> bool {
        matches!(self.repr, EventRepr::Sealed { .. })
    }

    /// Records the given events at `(row, col)`, ORing into whatever is already there.
    ///
    /// # Panics
    /// When the matrix is sealed or the coordinates are out of range.
    pub fn add(&mut self, row: usize, col: usize, events: EventSet) {
        assert!(
            row < self.nrows && col < self.ncols,
            "entry ({row}, {col}) outside of a {}x{} matrix",
            self.nrows,
            self.ncols
        );
        match &mut self.repr {
            EventRepr::Building(triplets) => triplets.push((row, col, events)),
            EventRepr::Sealed { .. } => panic!("cannot build into a sealed matrix"),
        }
    }

    /// Changes the dimensions. Only allowed during the build phase; existing entries must
    /// fit the new shape.
    pub fn resize(&mut self, nrows: usize, ncols: usize) {
        let EventRepr::Building(triplets) = &self.repr else {
            panic!("cannot resize a sealed matrix");
        };
        assert!(
            triplets.iter().all(|&(r, c, _)| r < nrows && c < ncols),
            "resize would drop existing entries"
        );
        self.nrows = nrows;
        self.ncols = ncols;
    }

    /// Sorts and compresses the entries, merging duplicate coordinates by OR and dropping
    /// empty sets. Idempotent.
    pub fn seal(&mut self) {
        let EventRepr::Building(triplets) = &mut self.repr else {
            return;
        };
        triplets.sort_unstable_by_key(|&(r, c, _)| (r, c));
        let mut row_ptr = vec![0usize; self.nrows + 1];
        let mut cols = Vec::new();
        let mut events: Vec<EventSet> = Vec::new();
        let mut last = None;
        for &(r, c, set) in triplets.iter() {
            if set.none() {
                continue;
            }
            if last == Some((r, c)) {
                let merged = events.last_mut().expect("an entry was recorded for the coordinate");
                *merged |= set;
                continue;
            }
            last = Some((r, c));
            row_ptr[r + 1] += 1;
            cols.push(c);
            events.push(set);
        }
        for r in 0..self.nrows {
            row_ptr[r + 1] += row_ptr[r];
        }
        self.repr = EventRepr::Sealed {
            row_ptr,
            cols,
            events,
        };
    }

    /// Re-expands a sealed matrix into the build phase. Idempotent.
    pub fn unseal(&mut self) {
        let EventRepr::Sealed {
            row_ptr,
            cols,
            events,
        } = &self.repr
        else {
            return;
        };
        let mut triplets = Vec::with_capacity(cols.len());
        for r in 0..self.nrows {
            for k in row_ptr[r]..row_ptr[r + 1] {
                triplets.push((r, cols[k], events[k]));
            }
        }
        self.repr = EventRepr::Building(triplets);
    }

    /// Iterates over the nonzero entries of the given row as `(column, events)` pairs,
    /// in ascending column order.
    ///
    /// # Panics
    /// When the matrix is not sealed.
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, &EventSet)> + '_ {
        let EventRepr::Sealed {
            row_ptr,
            cols,
            events,
        } = &self.repr
        else {
            panic!("row iteration requires a sealed matrix");
        };
        let range = row_ptr[row]..row_ptr[row + 1];
        cols[range.clone()].iter().copied().zip(events[range].iter())
    }

    /// The events at `(row, col)`; empty when there is no such entry.
    pub fn get(&self, row: usize, col: usize) -> EventSet {
        self.row(row)
            .find(|&(c, _)| c == col)
            .map(|(_, set)| *set)
            .unwrap_or_default()
    }

    /// The number of stored entries.
    pub fn nnz(&self) -> usize {
        match &self.repr {
            EventRepr::Building(triplets) => triplets.len(),
            EventRepr::Sealed { cols, .. } => cols.len(),
        }
    }

    /// Returns the sealed transpose.
    pub fn transpose(&self) -> SparseEventMatrix {
        let mut result = SparseEventMatrix::new(self.ncols, self.nrows);
        for row in 0..self.nrows {
            for (col, &set) in self.row(row) {
                result.add(col, row, set);
            }
        }
        result.seal();
        result
    }

    /// Iterates over the triplets recorded so far. Only available during the build phase.
    pub(crate) fn triplets(&self) -> impl Iterator<Item = (usize, usize, EventSet)> + '_ {
        let EventRepr::Building(triplets) = &self.repr else {
            panic!("triplet iteration requires the build phase");
        };
        triplets.iter().copied()
    }
}
