//! The release pipeline: stages, steps, execution
//!
//! - `stage`: the fixed stage order and run outcomes
//! - `step`: what each configured step does per stage
//! - `exec`: the subprocess boundary for exec steps
//! - `executor`: the state machine driving a full run

pub mod exec;
pub mod executor;
pub mod stage;
pub mod step;
