pub mod appointments;
pub mod carts;
pub mod orders;
