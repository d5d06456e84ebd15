pub mod change;
pub mod reset;
