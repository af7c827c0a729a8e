pub mod board;
pub mod controls;
pub mod label_input;
