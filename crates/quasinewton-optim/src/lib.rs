//! L-BFGS support for line-search minimizers.
//!
//! This crate provides the caller side of the limited-memory direction
//! update: the ring buffer that owns the curvature pairs and the driver that
//! carries the previous iterate between iterations.
//!
//! # Examples
//!
//! ```rust
//! use quasinewton_optim::{Lbfgs, LbfgsConfig};
//!
//! // Keep five curvature pairs and precondition with <s, y> / <y, y>
//! let lbfgs = Lbfgs::<f64>::new(
//!     LbfgsConfig::new()
//!         .with_memory_size(5)
//!         .with_approximate_eigenvalue_scaling(true),
//!     10,
//! )
//! .unwrap();
//! assert_eq!(lbfgs.history().capacity(), 5);
//! ```

pub mod history;
pub mod lbfgs;

// Re-export main types for convenience
pub use history::LbfgsHistory;
pub use lbfgs::{Lbfgs, LbfgsConfig};
