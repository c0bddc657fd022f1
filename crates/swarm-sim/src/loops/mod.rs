//! Background loops for continuous processing.

pub mod simulation_loop;
