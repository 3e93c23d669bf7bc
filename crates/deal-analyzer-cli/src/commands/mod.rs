pub mod deal;
pub mod sensitivity;
