pub mod cycle;
pub mod ev;
