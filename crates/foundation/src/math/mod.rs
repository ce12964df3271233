pub mod mat4;
pub mod precision;
pub mod vec;

pub use mat4::*;
pub use precision::*;
pub use vec::*;
