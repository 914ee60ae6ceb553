pub mod breast_cancer;
pub mod synthetic;

pub use breast_cancer::*;
pub use synthetic::*;
