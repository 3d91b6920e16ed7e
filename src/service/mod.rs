pub mod close;
pub mod submit;
