//! Mock image provider for testing.
//!
//! Poll results are scripted in order; once the script runs out every poll
//! reports `Pending`, which is how timeout scenarios are driven.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::generation::ProviderHandle;
use crate::ports::{ImageTransformProvider, ProviderError, ProviderStatus, TransformRequest};

#[derive(Default)]
struct MockState {
    submit_error: Option<ProviderError>,
    polls: VecDeque<Result<ProviderStatus, ProviderError>>,
    result_bytes: Vec<u8>,
    fetch_error: Option<ProviderError>,
    submissions: Vec<TransformRequest>,
    poll_count: u32,
    fetch_count: u32,
}

#[derive(Clone, Default)]
pub struct MockImageProvider {
    state: Arc<Mutex<MockState>>,
}

impl MockImageProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider that is ready on the first poll.
    pub fn succeeding(result_bytes: Vec<u8>) -> Self {
        Self::new()
            .with_poll(Ok(ProviderStatus::Ready {
                sample_url: "https://mock.provider/sample.png".to_string(),
            }))
            .with_result_bytes(result_bytes)
    }

    /// A provider that never finishes.
    pub fn never_ready() -> Self {
        Self::new()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_poll(self, result: Result<ProviderStatus, ProviderError>) -> Self {
        self.lock().polls.push_back(result);
        self
    }

    pub fn with_pending_polls(self, count: usize) -> Self {
        for _ in 0..count {
            self.lock().polls.push_back(Ok(ProviderStatus::Pending("Pending".to_string())));
        }
        self
    }

    pub fn with_submit_error(self, error: ProviderError) -> Self {
        self.lock().submit_error = Some(error);
        self
    }

    pub fn with_result_bytes(self, bytes: Vec<u8>) -> Self {
        self.lock().result_bytes = bytes;
        self
    }

    pub fn with_fetch_error(self, error: ProviderError) -> Self {
        self.lock().fetch_error = Some(error);
        self
    }

    pub fn submissions(&self) -> Vec<TransformRequest> {
        self.lock().submissions.clone()
    }

    pub fn poll_count(&self) -> u32 {
        self.lock().poll_count
    }

    pub fn fetch_count(&self) -> u32 {
        self.lock().fetch_count
    }
}

#[async_trait]
impl ImageTransformProvider for MockImageProvider {
    async fn submit(&self, request: TransformRequest) -> Result<ProviderHandle, ProviderError> {
        let mut state = self.lock();
        if let Some(error) = state.submit_error.take() {
            return Err(error);
        }
        state.submissions.push(request);
        let n = state.submissions.len();
        Ok(ProviderHandle {
            request_id: format!("mock_req_{}", n),
            polling_url: format!("https://mock.provider/poll/{}", n),
        })
    }

    async fn poll(&self, _handle: &ProviderHandle) -> Result<ProviderStatus, ProviderError> {
        let mut state = self.lock();
        state.poll_count += 1;
        state
            .polls
            .pop_front()
            .unwrap_or_else(|| Ok(ProviderStatus::Pending("Pending".to_string())))
    }

    async fn fetch_result(&self, _sample_url: &str) -> Result<Vec<u8>, ProviderError> {
        let mut state = self.lock();
        state.fetch_count += 1;
        if let Some(error) = state.fetch_error.take() {
            return Err(error);
        }
        Ok(state.result_bytes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> ProviderHandle {
        ProviderHandle {
            request_id: "r".to_string(),
            polling_url: "u".to_string(),
        }
    }

    #[tokio::test]
    async fn scripted_polls_then_pending_forever() {
        let provider = MockImageProvider::new()
            .with_pending_polls(1)
            .with_poll(Ok(ProviderStatus::Failed {
                reason: "nsfw".to_string(),
            }));

        assert!(matches!(provider.poll(&handle()).await, Ok(ProviderStatus::Pending(_))));
        assert!(matches!(provider.poll(&handle()).await, Ok(ProviderStatus::Failed { .. })));
        assert!(matches!(provider.poll(&handle()).await, Ok(ProviderStatus::Pending(_))));
        assert_eq!(provider.poll_count(), 3);
    }

    #[tokio::test]
    async fn submit_records_requests() {
        let provider = MockImageProvider::succeeding(vec![9]);
        let handle = provider
            .submit(TransformRequest {
                prompt: "p".to_string(),
                input_image: "aW1n".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(handle.request_id, "mock_req_1");
        assert_eq!(provider.submissions().len(), 1);
        assert_eq!(provider.fetch_result("x").await.unwrap(), vec![9]);
    }

    #[tokio::test]
    async fn submit_error_is_returned() {
        let provider = MockImageProvider::new().with_submit_error(ProviderError::Timeout);
        let result = provider
            .submit(TransformRequest {
                prompt: "p".to_string(),
                input_image: String::new(),
            })
            .await;
        assert_eq!(result, Err(ProviderError::Timeout));
    }
}
