//! Field translations of the shell pair FMM
mod source;
mod source_to_target;
mod target;
