//! Local OCR worker, isolated from the page and the coordinator.
//!
//! The worker only talks through [`WorkerCommand`] / [`WorkerEvent`]
//! channels. It initialises itself on start, pushes a `Ready` event, and
//! spins up a fresh engine instance for every job.
//!
//! [`WorkerCommand`]: text2cal_types::WorkerCommand
//! [`WorkerEvent`]: text2cal_types::WorkerEvent

mod engine;
mod tesseract;
mod worker;

pub use engine::{EngineCore, EngineInstance, EngineLoader, Readiness};
pub use tesseract::TesseractLoader;
pub use worker::SandboxWorker;
