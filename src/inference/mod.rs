mod policy;
mod worker;

pub use policy::{NeutralPolicy, Policy};
pub use worker::{InferenceHandle, InferenceWorker, WorkerMessage, WorkerReply};
