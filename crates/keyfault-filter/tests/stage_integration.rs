//! Integration tests for the attached filter stage.
//!
//! These exercise the full wiring end to end: lower layer → pipeline →
//! upstream consumer on the data path, and external tooling → sideband
//! channel → primary queue → multiplexer → filter state on the control
//! path, with mock infrastructure standing in for the device stack.

use std::sync::{Arc, Mutex};

use keyfault_core::{
    ControlCode, CorruptionMode, FilterConfig, KeyEvent, KeyTransition, KeyboardAttributes,
    KeyboardIoCode,
};
use keyfault_filter::lower::mock::MockLowerTarget;
use keyfault_filter::pipeline::UpstreamConsumer;
use keyfault_filter::{ControlError, ControlRequest, FilterStage, InternalRequest};

// ── Test doubles ──────────────────────────────────────────────────────────────

/// Records every batch delivered upstream and consumes everything.
#[derive(Default)]
struct RecordingConsumer {
    batches: Mutex<Vec<Vec<KeyEvent>>>,
}

impl RecordingConsumer {
    fn batches(&self) -> Vec<Vec<KeyEvent>> {
        self.batches.lock().unwrap().clone()
    }
}

impl UpstreamConsumer for RecordingConsumer {
    fn service(&self, events: &mut [KeyEvent], consumed: &mut usize) {
        self.batches.lock().unwrap().push(events.to_vec());
        *consumed = events.len();
    }
}

async fn attached_stage(seed: u32) -> (FilterStage, Arc<RecordingConsumer>, Arc<MockLowerTarget>) {
    let lower = Arc::new(MockLowerTarget::new());
    let stage = FilterStage::attach_seeded(
        Arc::clone(&lower) as Arc<dyn keyfault_filter::LowerTarget>,
        seed,
    );
    let consumer = Arc::new(RecordingConsumer::default());
    stage
        .dispatch_internal(InternalRequest::Connect {
            consumer: Arc::clone(&consumer) as Arc<dyn UpstreamConsumer>,
        })
        .await
        .expect("first connect must succeed");
    (stage, consumer, lower)
}

fn set_config_request(probability: u32, mode: CorruptionMode) -> ControlRequest {
    ControlRequest {
        code: ControlCode::SetConfig as u32,
        input: FilterConfig::new(probability, mode).encode().to_vec(),
        output_capacity: 0,
    }
}

// ── Connection contract ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_second_connect_is_rejected() {
    let (stage, _consumer, _) = attached_stage(1).await;

    let result = stage
        .dispatch_internal(InternalRequest::Connect {
            consumer: Arc::new(RecordingConsumer::default()),
        })
        .await;

    assert_eq!(result, Err(ControlError::AlreadyConnected));
}

#[tokio::test]
async fn test_disconnect_is_rejected() {
    let (stage, _, _) = attached_stage(2).await;
    let result = stage.dispatch_internal(InternalRequest::Disconnect).await;
    assert_eq!(result, Err(ControlError::NotSupported));
}

// ── Sideband reconfiguration drives the live pipeline ─────────────────────────

#[tokio::test]
async fn test_sideband_set_config_changes_pipeline_behavior() {
    // Arrange
    let (stage, consumer, _) = attached_stage(3).await;

    // Act – suppress every key-down via the sideband
    stage
        .sideband()
        .submit(set_config_request(100, CorruptionMode::DropLetters))
        .await
        .expect("reconfiguration must succeed");

    let mut batch = vec![KeyEvent::make(0x1E), KeyEvent::make(0x10)];
    let mut consumed = 0;
    stage.pipeline().service_callback(&mut batch, &mut consumed);

    // Assert – upstream saw only key-ups
    assert_eq!(consumed, 2);
    let delivered = consumer.batches();
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0]
        .iter()
        .all(|e| e.transition == KeyTransition::Break));
}

#[tokio::test]
async fn test_failed_set_config_leaves_rate_unchanged() {
    // Arrange – pin the filter to identity first
    let (stage, consumer, _) = attached_stage(4).await;
    stage
        .sideband()
        .submit(set_config_request(0, CorruptionMode::Normal))
        .await
        .expect("baseline config must succeed");

    // Act – out-of-range probability must be rejected...
    let result = stage
        .sideband()
        .submit(set_config_request(101, CorruptionMode::Chaos))
        .await;
    assert_eq!(result, Err(ControlError::InvalidParameter(101)));

    // ...and a subsequent run shows the prior configuration still in force
    let original = vec![KeyEvent::make(0x1E), KeyEvent::make(0x39)];
    let mut batch = original.clone();
    let mut consumed = 0;
    stage.pipeline().service_callback(&mut batch, &mut consumed);

    // Assert
    assert_eq!(consumer.batches()[0], original);
}

#[tokio::test]
async fn test_sideband_completes_unknown_probe_with_empty_success() {
    let (stage, _, _) = attached_stage(5).await;

    let response = stage
        .sideband()
        .submit(ControlRequest::no_input(0x1234, 64))
        .await
        .expect("probes must not fail");

    assert!(response.data.is_empty());
}

// ── Attribute cache flow ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_forwarded_attribute_query_feeds_the_sideband_cache() {
    // Arrange
    let (stage, _, lower) = attached_stage(6).await;
    let attributes = KeyboardAttributes {
        keyboard_type: 4,
        function_key_count: 12,
        total_key_count: 104,
        ..Default::default()
    };
    lower.respond_with(
        KeyboardIoCode::QueryAttributes as u32,
        Ok(attributes.encode().to_vec()),
    );

    // Act – the upper stack queries once; tooling then reads the cache
    stage
        .dispatch_internal(InternalRequest::QueryAttributes {
            output_capacity: KeyboardAttributes::WIRE_SIZE,
        })
        .await
        .expect("forwarded query must succeed");

    let response = stage
        .sideband()
        .submit(ControlRequest::no_input(
            ControlCode::GetAttributes as u32,
            KeyboardAttributes::WIRE_SIZE,
        ))
        .await
        .expect("cached read must succeed");

    // Assert – no second round trip to the lower layer
    assert_eq!(response.data, attributes.encode().to_vec());
    let forwarded = lower.requests();
    assert_eq!(forwarded.len(), 1, "cache must answer the sideband query");
}

#[tokio::test]
async fn test_get_attributes_with_short_buffer_writes_zero_bytes() {
    let (stage, _, _) = attached_stage(7).await;

    let result = stage
        .sideband()
        .submit(ControlRequest::no_input(
            ControlCode::GetAttributes as u32,
            KeyboardAttributes::WIRE_SIZE - 1,
        ))
        .await;

    assert_eq!(
        result,
        Err(ControlError::BufferTooSmall {
            needed: KeyboardAttributes::WIRE_SIZE,
            available: KeyboardAttributes::WIRE_SIZE - 1
        })
    );
}

// ── Data path under concurrent reconfiguration ────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_set_config_never_disturbs_batch_shape() {
    // Arrange
    let (stage, consumer, _) = attached_stage(8).await;
    let stage = Arc::new(stage);

    // Act – one task reconfigures through the sideband while the data path
    // keeps processing batches
    let config_stage = Arc::clone(&stage);
    let configurator = tokio::spawn(async move {
        for i in 0..200u32 {
            let mode = match i % 4 {
                0 => CorruptionMode::Normal,
                1 => CorruptionMode::Chaos,
                2 => CorruptionMode::DropLetters,
                _ => CorruptionMode::DropSpace,
            };
            config_stage
                .sideband()
                .submit(set_config_request(i % 101, mode))
                .await
                .expect("reconfiguration must succeed");
        }
    });

    let data_stage = Arc::clone(&stage);
    let driver = tokio::task::spawn_blocking(move || {
        for _ in 0..500 {
            let mut batch = vec![
                KeyEvent::make(0x1E),
                KeyEvent::break_(0x1E),
                KeyEvent::make(0x39),
                KeyEvent::make(0x10),
            ];
            let mut consumed = 0;
            data_stage
                .pipeline()
                .service_callback(&mut batch, &mut consumed);
            assert_eq!(consumed, 4);
        }
    });

    configurator.await.expect("configurator panicked");
    driver.await.expect("driver panicked");

    // Assert – every delivered batch kept its length and order, and break
    // events were never touched
    let batches = consumer.batches();
    assert_eq!(batches.len(), 500);
    for batch in &batches {
        assert_eq!(batch.len(), 4);
        assert_eq!(batch[1], KeyEvent::break_(0x1E));
    }
}

// ── Pass-through traffic keeps flowing while configured ───────────────────────

#[tokio::test]
async fn test_indicator_pass_through_reaches_the_lower_layer() {
    // Arrange
    let (stage, _, lower) = attached_stage(9).await;

    // Act
    stage
        .dispatch_internal(InternalRequest::Passthrough {
            code: KeyboardIoCode::SetIndicators,
            input: vec![0b0000_0010], // caps lock LED
            output_capacity: 0,
        })
        .await
        .expect("pass-through must succeed");

    // Assert
    let requests = lower.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].code, KeyboardIoCode::SetIndicators as u32);
}
