//! Side-effecting collaborators: output file writing and artifact packaging.

pub mod file_writer;
pub mod packager;
