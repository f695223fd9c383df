use anyhow::anyhow;
use std::sync::{Arc, Mutex};
use tg_ytchan::watermark::WatermarkStore;

#[derive(Clone, Default)]
pub struct MemoryStore {
    pub value: Arc<Mutex<Option<String>>>,
    pub writes: Arc<Mutex<Vec<(String, String)>>>,
    pub fail_set: bool,
}

impl MemoryStore {
    pub fn with_value(value: &str) -> Self {
        Self {
            value: Arc::new(Mutex::new(Some(value.to_string()))),
            ..Default::default()
        }
    }

    pub fn current(&self) -> Option<String> {
        self.value.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl WatermarkStore for MemoryStore {
    async fn get(&self, _name: &str) -> anyhow::Result<Option<String>> {
        Ok(self.current())
    }

    async fn set(&self, name: &str, value: &str) -> anyhow::Result<()> {
        if self.fail_set {
            return Err(anyhow!("response status: 403 Forbidden"));
        }
        self.writes
            .lock()
            .unwrap()
            .push((name.to_string(), value.to_string()));
        *self.value.lock().unwrap() = Some(value.to_string());
        Ok(())
    }
}
