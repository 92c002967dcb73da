pub mod discovery;
pub mod monitor;
pub mod orchestrator;
pub mod pipeline;
pub mod quote;
pub mod retry;
pub mod validator;
