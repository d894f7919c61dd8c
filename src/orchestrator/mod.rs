//! Runs the scraper as a child process.
//!
//! - `script`: the stdin setup protocol of the `interactive` command
//! - `process`: spawning, output relay and Ctrl-C handling

pub mod process;
pub mod script;

pub use process::{ChildReport, Orchestrator, TAIL_LINES};
pub use script::{PlanOutcome, RunPlan, ScrapeMode, input_script, read_plan};
