//! Integration tests for semrel
//!
//! Each test builds a throwaway git repository with real history, writes a
//! semrel.toml and drives the compiled binary against it.

mod helpers;
mod test_plan;
mod test_run;
