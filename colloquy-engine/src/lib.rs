//! Colloquy Engine - Tool-Augmented Turn Orchestration
//!
//! A turn flows through four stages:
//! - [`decoder`] turns raw provider events into text deltas and complete
//!   tool invocations
//! - [`dispatcher`] runs an invocation against the profile's registry and
//!   records it
//! - [`assembler`] forwards output to the caller and stores the exchange
//! - [`history`] prepares the stored transcript for the next request

pub mod assembler;
pub mod decoder;
pub mod dispatcher;
pub mod history;
pub mod profile;
pub mod turn;

pub use assembler::ResponseAssembler;
pub use decoder::{decode_stream, DecodeError, StreamDecoder, MAX_TOOL_INPUT_BYTES};
pub use dispatcher::{DispatchContext, DispatchOutcome, DispatchStatus, ToolDispatcher};
pub use history::build_history;
pub use profile::{AssistantProfile, HistoryMode};
pub use turn::{TurnEvent, TurnRequest, TurnResponse, TurnState};
