pub mod svenska_spel;
pub mod types;
