use crate::sink::{AudioPayload, Sink};
use async_trait::async_trait;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use voxrelay_core::{DeliveryTarget, DestinationError};

#[derive(Serialize)]
struct DeliveryLine<'a> {
    connection_id: &'a str,
    payload: &'a AudioPayload,
}

/// Appends one JSON line per delivery to the file named by `path`.
pub struct FileSink {
    output_path: Mutex<Option<PathBuf>>,
    delivery_count: AtomicUsize,
}

impl FileSink {
    pub fn new() -> Self {
        Self {
            output_path: Mutex::new(None),
            delivery_count: AtomicUsize::new(0),
        }
    }

    pub fn delivery_count(&self) -> usize {
        self.delivery_count.load(Ordering::Relaxed)
    }
}

impl Default for FileSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    async fn initialize(&mut self, config: toml::Value) -> Result<(), DestinationError> {
        let path = config
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                DestinationError::InitializationFailed("missing 'path' in config".to_string())
            })?;
        *self
            .output_path
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner) = Some(PathBuf::from(path));
        Ok(())
    }

    async fn deliver(
        &self,
        target: &DeliveryTarget,
        payload: &AudioPayload,
    ) -> Result<(), DestinationError> {
        let line = serde_json::to_string(&DeliveryLine {
            connection_id: &target.connection_id,
            payload,
        })
        .map_err(|e| DestinationError::SendFailed(e.to_string()))?;

        // Held across the write so concurrent deliveries never interleave.
        let guard = self
            .output_path
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let path = guard
            .as_ref()
            .ok_or_else(|| DestinationError::SendFailed("not initialized".to_string()))?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| DestinationError::ConnectionLost(format!("{}: {e}", path.display())))?;
        writeln!(file, "{line}").map_err(|e| DestinationError::SendFailed(e.to_string()))?;

        self.delivery_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        self.output_path
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    async fn shutdown(&self) -> Result<(), DestinationError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_config(path: &std::path::Path) -> toml::Value {
        toml::Value::Table({
            let mut t = toml::map::Map::new();
            t.insert(
                "path".to_string(),
                toml::Value::String(path.to_string_lossy().to_string()),
            );
            t
        })
    }

    fn payload(data: &str) -> AudioPayload {
        AudioPayload {
            audio_data: data.to_string(),
        }
    }

    #[test]
    fn test_file_sink_name() {
        assert_eq!(FileSink::new().name(), "file");
    }

    #[tokio::test]
    async fn test_initialize_missing_path_fails() {
        let mut sink = FileSink::new();
        let result = sink.initialize(toml::Value::Table(Default::default())).await;
        match result {
            Err(DestinationError::InitializationFailed(msg)) => assert!(msg.contains("path")),
            _ => panic!("expected InitializationFailed"),
        }
        assert!(!sink.is_healthy());
    }

    #[tokio::test]
    async fn test_deliver_appends_json_lines() {
        let dir = std::env::temp_dir().join("voxrelay_file_sink_append");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("deliveries.jsonl");
        let _ = std::fs::remove_file(&path);

        let mut sink = FileSink::new();
        sink.initialize(path_config(&path)).await.unwrap();
        assert!(sink.is_healthy());

        sink.deliver(&DeliveryTarget::new("conn-1"), &payload("AAAA"))
            .await
            .unwrap();
        sink.deliver(&DeliveryTarget::new("conn-2"), &payload("BBBB"))
            .await
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "{\"connection_id\":\"conn-1\",\"payload\":{\"audio_data\":\"AAAA\"}}\n\
             {\"connection_id\":\"conn-2\",\"payload\":{\"audio_data\":\"BBBB\"}}\n"
        );
        assert_eq!(sink.delivery_count(), 2);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_deliver_before_initialize_fails() {
        let sink = FileSink::new();
        let result = sink
            .deliver(&DeliveryTarget::new("conn-1"), &payload("AAAA"))
            .await;
        assert!(matches!(result, Err(DestinationError::SendFailed(_))));
    }

    #[tokio::test]
    async fn test_unwritable_path_is_connection_lost() {
        let mut sink = FileSink::new();
        sink.initialize(path_config(std::path::Path::new(
            "/nonexistent/voxrelay/deliveries.jsonl",
        )))
        .await
        .unwrap();
        let result = sink
            .deliver(&DeliveryTarget::new("conn-1"), &payload("AAAA"))
            .await;
        assert!(matches!(result, Err(DestinationError::ConnectionLost(_))));
        assert_eq!(sink.delivery_count(), 0);
    }

    #[test]
    fn test_file_sink_implements_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FileSink>();
    }
}
