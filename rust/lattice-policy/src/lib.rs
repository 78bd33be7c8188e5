#![warn(missing_docs)]

//! Policy machinery for the Lattice execution authorizer: the pluggable
//! input/output policy interfaces, code approval status, and the append-only
//! per-code output history that backs cached results.

mod policy;
pub use policy::*;

mod approval;
pub use approval::*;

mod history;
pub use history::*;

mod stock;
pub use stock::*;

mod error;
pub use error::*;
