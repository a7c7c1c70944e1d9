pub mod controller;

pub use controller::{
    AnswerPipelineController, Applied, CheckTicket, ReasoningReply, ReasoningTicket,
};
