//! Read entities definitions.

pub mod reservation;
