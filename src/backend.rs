//! The seam for accelerating the boolean matrix products that drive reachability.
//!
//! The reachability engine multiplies the structural bit graph with state vectors over
//! the boolean semiring. An accelerated backend (the original system mirrored the bit
//! graph into device memory) can be slotted in behind [`BoolGemm`]; any implementation
//! must be observationally equivalent to [`HostGemm`]. The
//! [`device_cache`](crate::automaton::AutomatonOptions::device_cache) option is accepted
//! for compatibility and is a no-op in this CPU-only build.

use crate::sparse::SparseBitMatrix;

/// A backend able to multiply two sparse boolean matrices over the boolean semiring
/// (entries combine by OR of ANDs).
pub trait BoolGemm {
    /// Computes `lhs · rhs`.
    fn multiply(&self, lhs: &SparseBitMatrix, rhs: &SparseBitMatrix) -> SparseBitMatrix;
}

/// The host (CPU) backend; delegates to [`SparseBitMatrix::spgemm_bool`].
#[derive(Clone, Copy, Debug, Default)]
pub struct HostGemm;

impl BoolGemm for HostGemm {
    fn multiply(&self, lhs: &SparseBitMatrix, rhs: &SparseBitMatrix) -> SparseBitMatrix {
        lhs.spgemm_bool(rhs)
    }
}
