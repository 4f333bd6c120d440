pub mod bs;
pub mod implied;
pub mod surface;
