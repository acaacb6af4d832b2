// Shared helpers

pub mod io;
