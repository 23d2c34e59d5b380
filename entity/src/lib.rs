pub mod market;
pub mod trading;
