use crate::error::Result;
use crate::model::{FailureKind, Outcome, RequestTemplate, ResultRecord, WorkerIdentity};
use crate::output::RecordSender;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// `run` may be called again while a previous call is in flight.
pub struct Worker {
    identity: WorkerIdentity,
    client: reqwest::Client,
    template: Arc<RequestTemplate>,
    tx: RecordSender,
}

impl Worker {
    pub fn new(
        identity: WorkerIdentity,
        template: Arc<RequestTemplate>,
        tx: RecordSender,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            identity,
            client,
            template,
            tx,
        })
    }

    pub fn identity(&self) -> &WorkerIdentity {
        &self.identity
    }

    pub async fn run(&self) {
        let tic = Instant::now();
        let response = self.template.build(&self.client).send().await;
        let latency_us = tic.elapsed().as_micros() as u64;
        let timestamp_us = Utc::now().timestamp_micros();

        let mut response = match response {
            Ok(res) => res,
            Err(e) => {
                let kind = FailureKind::classify(&e);
                warn!(worker = %self.identity, kind = kind.as_str(), "request failed: {}", e);
                self.emit(ResultRecord {
                    worker: self.identity.clone(),
                    timestamp_us,
                    latency_us,
                    outcome: Outcome::Failure {
                        kind,
                        error: e.to_string(),
                    },
                });
                return;
            }
        };

        self.emit(ResultRecord {
            worker: self.identity.clone(),
            timestamp_us,
            latency_us,
            outcome: Outcome::Success {
                status: response.status().as_u16(),
            },
        });

        // drain the body so the connection goes back to the pool
        loop {
            match response.chunk().await {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(e) => {
                    warn!(worker = %self.identity, "discarding connection: {}", e);
                    break;
                }
            }
        }
    }

    fn emit(&self, record: ResultRecord) {
        if self.tx.send(record).is_err() {
            debug!(worker = %self.identity, "record sink closed, dropping record");
        }
    }
}
