pub mod dispatcher;
pub mod error;
pub mod model;
pub mod output;
pub mod telemetry;
pub mod worker;

pub use dispatcher::Dispatcher;
pub use error::{Error, Result};
pub use model::{Config, RequestTemplate, ResultRecord, WorkerIdentity};
pub use worker::Worker;
