//! Sequential change-stream consumer.

use super::writer::IndexWriter;
use super::{ChangeLog, RawChangeMessage};
use crate::Error;
use tokio::sync::watch;

/// Drives the change stream into the index writer.
///
/// One consumer reads one log partition sequentially, which is what keeps
/// per-partition delivery order intact: there is no internal parallelism
/// to reorder anything. Shutdown is cooperative: the watch channel is
/// checked at each pull boundary, never mid-message, so a message is
/// either fully processed or not pulled at all.
pub struct Consumer<L: ChangeLog> {
    log: L,
    writer: IndexWriter,
    shutdown: watch::Receiver<bool>,
}

impl<L: ChangeLog> Consumer<L> {
    pub fn new(log: L, writer: IndexWriter, shutdown: watch::Receiver<bool>) -> Self {
        Self { log, writer, shutdown }
    }

    /// Consume until shutdown or a log infrastructure failure.
    ///
    /// Message-level problems never end the loop: an undecodable payload
    /// is logged, acked, and skipped; a failed index write was already
    /// logged and dropped by the writer. Only the log itself erroring
    /// out stops consumption.
    pub async fn run(mut self) -> Result<(), Error> {
        tracing::debug!("starting change consumer");
        loop {
            if *self.shutdown.borrow() {
                tracing::debug!("change consumer stopping");
                return Ok(());
            }

            let message = tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() {
                        // Sender gone means nobody can ever signal us;
                        // treat it as shutdown rather than spinning.
                        tracing::debug!("shutdown channel closed, change consumer stopping");
                        return Ok(());
                    }
                    continue;
                }
                pulled = self.log.next() => match pulled {
                    Ok(message) => message,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to read change message");
                        return Err(e);
                    }
                },
            };

            match RawChangeMessage::decode(&message.payload) {
                Ok(raw) => {
                    let event = raw.into_event();
                    let applied = self.writer.apply(&event).await;
                    tracing::debug!(id = %message.id, table = %event.table, applied, "processed change message");
                }
                Err(e) => {
                    // A single bad message must never terminate ingestion.
                    tracing::error!(id = %message.id, error = %e, "skipping undecodable change message");
                }
            }

            if let Err(e) = self.log.ack(&message).await {
                // The log will redeliver; writes are idempotent.
                tracing::warn!(id = %message.id, error = %e, "failed to ack change message");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::ingest::LogMessage;
    use crate::search::{SearchBackend, SearchPage};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// Scripted log: yields queued payloads, then parks until shutdown.
    struct ScriptedLog {
        queued: Vec<Vec<u8>>,
        acked: Vec<String>,
        cursor: usize,
    }

    impl ScriptedLog {
        fn new(payloads: Vec<&str>) -> Self {
            Self { queued: payloads.into_iter().map(|p| p.as_bytes().to_vec()).collect(), acked: Vec::new(), cursor: 0 }
        }
    }

    #[async_trait]
    impl ChangeLog for ScriptedLog {
        async fn next(&mut self) -> Result<LogMessage, Error> {
            if self.cursor < self.queued.len() {
                let message = LogMessage { id: format!("1-{}", self.cursor), payload: self.queued[self.cursor].clone() };
                self.cursor += 1;
                return Ok(message);
            }
            // Drained: behave like a blocked XREADGROUP.
            std::future::pending().await
        }

        async fn ack(&mut self, message: &LogMessage) -> Result<(), Error> {
            self.acked.push(message.id.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeIndex {
        docs: Mutex<HashMap<String, Value>>,
    }

    #[async_trait]
    impl SearchBackend for FakeIndex {
        async fn search(&self, _store_id: i64, _offset: i32, _limit: i32) -> Result<SearchPage, Error> {
            unimplemented!("consumer tests never search")
        }

        async fn upsert(&self, id: &str, doc: &Value) -> Result<(), Error> {
            self.docs.lock().await.insert(id.to_string(), doc.clone());
            Ok(())
        }

        async fn partial_update(&self, id: &str, changes: &Value) -> Result<(), Error> {
            let mut docs = self.docs.lock().await;
            match docs.get_mut(id) {
                Some(Value::Object(target)) => {
                    if let Value::Object(fields) = changes {
                        for (k, v) in fields {
                            target.insert(k.clone(), v.clone());
                        }
                    }
                    Ok(())
                }
                _ => Err(Error::PreconditionFailed { id: id.to_string() }),
            }
        }
    }

    fn insert_payload(id: u32) -> String {
        format!(
            r#"{{"type": "INSERT", "database": "review", "table": "review_info", "isddl": false,
                 "data": [{{"review_id": "{id}", "score": 5}}]}}"#
        )
    }

    async fn run_until_drained(payloads: Vec<&str>) -> (Arc<FakeIndex>, Result<(), Error>) {
        let index = Arc::new(FakeIndex::default());
        let writer = IndexWriter::new(index.clone());
        let (tx, rx) = watch::channel(false);
        let consumer = Consumer::new(ScriptedLog::new(payloads), writer, rx);

        let worker = tokio::spawn(consumer.run());
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        tx.send(true).unwrap();
        let outcome = worker.await.unwrap();
        (index, outcome)
    }

    #[tokio::test]
    async fn test_consumes_messages_in_order() {
        let first = insert_payload(1);
        let second = insert_payload(2);
        let (index, outcome) = run_until_drained(vec![first.as_str(), second.as_str()]).await;

        assert!(outcome.is_ok());
        let docs = index.docs.lock().await;
        assert_eq!(docs.len(), 2);
    }

    #[tokio::test]
    async fn test_bad_message_between_good_ones_is_skipped() {
        let first = insert_payload(1);
        let third = insert_payload(3);
        let (index, outcome) =
            run_until_drained(vec![first.as_str(), "{definitely not json", third.as_str()]).await;

        assert!(outcome.is_ok());
        let docs = index.docs.lock().await;
        assert_eq!(docs.len(), 2);
        assert!(docs.contains_key("1"));
        assert!(docs.contains_key("3"));
    }

    #[tokio::test]
    async fn test_failed_write_does_not_stop_the_stream() {
        // Update before insert: the update hits a missing document and is
        // dropped, the following insert still lands.
        let update = r#"{"type": "UPDATE", "database": "review", "table": "review_info", "isddl": false,
                         "data": [{"review_id": "9", "status": 20}]}"#;
        let insert = insert_payload(1);
        let (index, outcome) = run_until_drained(vec![update, insert.as_str()]).await;

        assert!(outcome.is_ok());
        let docs = index.docs.lock().await;
        assert_eq!(docs.len(), 1);
        assert!(docs.contains_key("1"));
    }

    #[tokio::test]
    async fn test_shutdown_ends_cleanly_while_blocked_on_pull() {
        let (_index, outcome) = run_until_drained(vec![]).await;
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn test_dropped_shutdown_handle_stops_consumer() {
        let index = Arc::new(FakeIndex::default());
        let writer = IndexWriter::new(index);
        let (tx, rx) = watch::channel(false);
        let consumer = Consumer::new(ScriptedLog::new(vec![]), writer, rx);

        let worker = tokio::spawn(consumer.run());
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        drop(tx);

        assert!(worker.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_log_failure_terminates_with_error() {
        struct BrokenLog;

        #[async_trait]
        impl ChangeLog for BrokenLog {
            async fn next(&mut self) -> Result<LogMessage, Error> {
                Err(Error::Unavailable("log connection lost".into()))
            }

            async fn ack(&mut self, _message: &LogMessage) -> Result<(), Error> {
                Ok(())
            }
        }

        let index = Arc::new(FakeIndex::default());
        let writer = IndexWriter::new(index);
        let (_tx, rx) = watch::channel(false);
        let consumer = Consumer::new(BrokenLog, writer, rx);

        assert!(matches!(consumer.run().await, Err(Error::Unavailable(_))));
    }
}
