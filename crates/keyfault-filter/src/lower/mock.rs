//! Mock lower layer for unit and integration testing.
//!
//! Records every forwarded request and replays scripted responses, so tests
//! can drive the dispatch multiplexer without any real device stack.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{LowerError, LowerTarget};

/// One recorded forwarded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub code: u32,
    pub input: Vec<u8>,
    pub output_capacity: usize,
}

/// A scriptable [`LowerTarget`] implementation.
///
/// Unscripted codes complete successfully with empty output, mirroring a
/// device that accepts everything and has nothing to say.
pub struct MockLowerTarget {
    responses: Mutex<HashMap<u32, Result<Vec<u8>, LowerError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockLowerTarget {
    /// Creates a mock with no scripted responses.
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Scripts the response for a request code.
    pub fn respond_with(&self, code: u32, response: Result<Vec<u8>, LowerError>) {
        self.responses
            .lock()
            .expect("lock poisoned")
            .insert(code, response);
    }

    /// Returns a copy of every request forwarded so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("lock poisoned").clone()
    }
}

impl Default for MockLowerTarget {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LowerTarget for MockLowerTarget {
    async fn submit(
        &self,
        code: u32,
        input: Vec<u8>,
        output_capacity: usize,
    ) -> Result<Vec<u8>, LowerError> {
        self.requests
            .lock()
            .expect("lock poisoned")
            .push(RecordedRequest {
                code,
                input,
                output_capacity,
            });
        self.responses
            .lock()
            .expect("lock poisoned")
            .get(&code)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unscripted_code_completes_with_empty_output() {
        // Arrange
        let mock = MockLowerTarget::new();

        // Act
        let result = mock.submit(0x05, vec![], 0).await;

        // Assert
        assert_eq!(result, Ok(Vec::new()));
    }

    #[tokio::test]
    async fn test_scripted_response_is_replayed() {
        // Arrange
        let mock = MockLowerTarget::new();
        mock.respond_with(0x01, Ok(vec![1, 2, 3]));

        // Act
        let result = mock.submit(0x01, vec![], 32).await;

        // Assert
        assert_eq!(result, Ok(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_requests_are_recorded_in_order() {
        // Arrange
        let mock = MockLowerTarget::new();

        // Act
        mock.submit(0x01, vec![], 8).await.unwrap();
        mock.submit(0x04, vec![0xAA], 0).await.unwrap();

        // Assert
        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].code, 0x01);
        assert_eq!(requests[1].code, 0x04);
        assert_eq!(requests[1].input, vec![0xAA]);
    }

    #[tokio::test]
    async fn test_scripted_error_is_replayed_verbatim() {
        // Arrange
        let mock = MockLowerTarget::new();
        mock.respond_with(0x06, Err(LowerError::NotReady));

        // Act
        let result = mock.submit(0x06, vec![], 0).await;

        // Assert
        assert_eq!(result, Err(LowerError::NotReady));
    }
}
