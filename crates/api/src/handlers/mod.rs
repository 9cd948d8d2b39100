pub mod integration;
pub mod runs;
