#![warn(missing_docs)]

//! CSG boolean operations on triangle meshes for osteoplan.
//!
//! The pipeline only ever sequences boolean calls; the solver itself sits
//! behind the [`BooleanSolver`] trait so a host-provided exact solver can
//! be swapped in. The bundled [`BspSolver`] is a BSP-tree clipping solver
//! good enough for the closed, well-separated solids the guide builders
//! produce.

mod bsp;
mod solver;

pub use solver::BspSolver;

use osteoplan_mesh::TriMesh;
use thiserror::Error;

/// CSG boolean operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    /// Union: combine both solids.
    Union,
    /// Difference: subtract the operand from the base.
    Difference,
    /// Intersection: keep only the overlapping region.
    Intersect,
}

/// Errors from boolean evaluation.
#[derive(Error, Debug)]
pub enum BooleanError {
    /// An operand is not a closed manifold solid.
    #[error("boolean operand rejected: {0}")]
    InvalidOperand(String),

    /// The solver failed on degenerate input.
    #[error("boolean solver failed: {0}")]
    SolverFailed(String),
}

/// Result type for boolean evaluation.
pub type BooleanResult<T> = std::result::Result<T, BooleanError>;

/// The exact-boolean seam the pipeline depends on.
///
/// Implementations must treat the base/operand order as significant
/// (difference is not commutative) and must accept empty meshes: union
/// with an empty mesh returns the other operand, difference by an empty
/// mesh returns the base, intersection with an empty mesh is empty.
pub trait BooleanSolver {
    /// Evaluate `base <op> operand`, both given in the same space.
    fn evaluate(&self, base: &TriMesh, operand: &TriMesh, op: BooleanOp)
        -> BooleanResult<TriMesh>;
}
