pub(crate) mod bootstrap;
mod driving;
pub(crate) mod loop_runner;
mod street_grid;
mod tuning;
