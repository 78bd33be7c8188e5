#![warn(missing_docs)]

//! The execution authorizer of the Lattice trust boundary. A call names a
//! registered code item, a caller credential and a map of argument
//! identifiers; consulting approval state, the code's output policy, and the
//! caller's grants, the authorizer decides whether the code may run and
//! what representation of the result the caller may see. Invalid policies
//! are answered from the append-only output history when the input
//! fingerprint matches exactly, so expensive computation is memoized without
//! ever serving over-privileged data.

mod code;
pub use code::*;

mod backend;
pub use backend::*;

mod outcome;
pub use outcome::*;

mod visibility;
pub use visibility::*;

mod authorizer;
pub use authorizer::*;

mod error;
pub use error::*;
