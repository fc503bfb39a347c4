pub mod alloc;
pub mod backend;
pub mod cart;
pub mod driver;
pub mod error;
pub mod options;
pub mod output;
pub mod printer;
pub mod wrap;

pub use alloc::{Role, VarType, VectorAllocator, VectorKind};
pub use backend::{Backend, Context, Subscript};
pub use cart::Cartesian;
pub use driver::write_file;
pub use error::GenerationError;
pub use options::{EqnStyle, Options, SumStyle};
pub use output::{Generated, Output, Pass};
