//! GridRun E2E Test Framework
//!
//! This crate drives parameterized tests against a remote mobile-device grid:
//! - Uploads the application binary to grid storage once, verifying its digest
//! - Expands each test across a fixed device matrix
//! - Opens one remote session per tuple, on a pool of workers
//! - Closes every session on all exit paths and reports job status
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    TestRunner (Rust)                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  pre_run()                                                  │
//! │    └── ArtifactUploader::upload() -> ArtifactReference      │
//! │          ├── digest_file(path, md5)                         │
//! │          └── ArtifactStore::upload() -> remote md5          │
//! │  run(cases)                                                 │
//! │    └── Matrix::enumerate(case) -> [CapabilityTuple]         │
//! │          └── worker N: WorkerContext                        │
//! │                ├── SessionFactory::create_session()         │
//! │                ├── TestBody::run(&SessionHandle)            │
//! │                ├── WorkerContext::close_current()           │
//! │                └── TestListener::on_test_finish(ctx)        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod listener;
pub mod matrix;
pub mod runner;
pub mod session;
pub mod storage;
pub mod uploader;
pub mod webdriver;
pub mod worker;

pub use error::{E2eError, E2eResult};
pub use matrix::Matrix;
pub use runner::{LaunchTest, TestBody, TestCase, TestRunner};
pub use session::{SessionFactory, SessionHandle};
pub use uploader::{ArtifactReference, ArtifactUploader};
pub use worker::WorkerContext;
