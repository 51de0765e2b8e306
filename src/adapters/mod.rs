//! Adapters for the domain ports.
//!
//! - `CommandJudge` / `CommandQueue`: external processes speaking JSON over stdin/stdout
//! - `TracingCheckpointSink`: checkpoints as log events
//! - `ScriptedJudge`: canned answers for dry runs and tests

pub mod checkpoint;
pub mod command_judge;
pub mod command_queue;
pub mod process;
pub mod scripted;

pub use checkpoint::TracingCheckpointSink;
pub use command_judge::CommandJudge;
pub use command_queue::CommandQueue;
pub use scripted::{JudgeCall, ScriptedJudge};
