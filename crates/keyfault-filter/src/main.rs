//! KeyFault demonstration host.
//!
//! Runs the filter stage headlessly against a synthetic keyboard: a task
//! types a fixed phrase in a loop through the pipeline while another task
//! walks the corruption modes through the sideband channel, exactly the way
//! external tooling would. Useful for watching the injected faults live:
//!
//! ```bash
//! RUST_LOG=debug cargo run --package keyfault-filter
//! ```

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use keyfault_core::{
    ControlCode, CorruptionMode, FilterConfig, KeyEvent, KeyboardAttributes, KeyboardIoCode,
};
use keyfault_filter::lower::mock::MockLowerTarget;
use keyfault_filter::pipeline::UpstreamConsumer;
use keyfault_filter::{ControlRequest, FilterStage, InternalRequest};

/// "hello world" as set-1 scan codes.
const PHRASE: [u16; 11] = [
    0x23, 0x12, 0x26, 0x26, 0x18, 0x39, 0x11, 0x18, 0x13, 0x26, 0x20,
];

/// Upstream consumer that logs what survives the filter.
struct LoggingConsumer;

impl UpstreamConsumer for LoggingConsumer {
    fn service(&self, events: &mut [KeyEvent], consumed: &mut usize) {
        for event in events.iter() {
            info!(
                "upstream received scan 0x{:02X} ({:?})",
                event.scan_code, event.transition
            );
        }
        *consumed = events.len();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging. Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("KeyFault demonstration host starting");

    // Synthetic lower layer: answers the attribute query like a standard
    // 104-key board.
    let lower = Arc::new(MockLowerTarget::new());
    lower.respond_with(
        KeyboardIoCode::QueryAttributes as u32,
        Ok(KeyboardAttributes {
            keyboard_type: 4,
            function_key_count: 12,
            indicator_count: 3,
            total_key_count: 104,
            input_queue_length: 100,
            ..Default::default()
        }
        .encode()
        .to_vec()),
    );

    let stage = Arc::new(FilterStage::attach(lower));

    // Connect the logging consumer, then warm the attribute cache the way
    // the upper stack would at bind time.
    stage
        .dispatch_internal(InternalRequest::Connect {
            consumer: Arc::new(LoggingConsumer),
        })
        .await?;
    stage
        .dispatch_internal(InternalRequest::QueryAttributes {
            output_capacity: KeyboardAttributes::WIRE_SIZE,
        })
        .await?;

    let running = Arc::new(AtomicBool::new(true));

    // ── Synthetic typing ──────────────────────────────────────────────────────
    let typist_stage = Arc::clone(&stage);
    let typist_running = Arc::clone(&running);
    let typist = tokio::spawn(async move {
        while typist_running.load(Ordering::Relaxed) {
            // One make/break batch per phrase character, like an interrupt
            // delivering a key press and release.
            for &scan_code in &PHRASE {
                let mut batch = [KeyEvent::make(scan_code), KeyEvent::break_(scan_code)];
                let mut consumed = 0;
                typist_stage
                    .pipeline()
                    .service_callback(&mut batch, &mut consumed);
                tokio::time::sleep(Duration::from_millis(120)).await;
            }
        }
    });

    // ── Scripted reconfiguration over the sideband ────────────────────────────
    let config_stage = Arc::clone(&stage);
    let config_running = Arc::clone(&running);
    let configurator = tokio::spawn(async move {
        let schedule = [
            (CorruptionMode::Chaos, 25),
            (CorruptionMode::DropLetters, 50),
            (CorruptionMode::DropSpace, 100),
            (CorruptionMode::Normal, 0),
        ];
        for (mode, probability) in schedule.iter().cycle() {
            if !config_running.load(Ordering::Relaxed) {
                break;
            }
            tokio::time::sleep(Duration::from_secs(5)).await;
            let request = ControlRequest {
                code: ControlCode::SetConfig as u32,
                input: FilterConfig::new(*probability, *mode).encode().to_vec(),
                output_capacity: 0,
            };
            match config_stage.sideband().submit(request).await {
                Ok(_) => info!("sideband: switched to {mode:?} at {probability}%"),
                Err(err) => warn!("sideband: reconfiguration failed: {err}"),
            }
        }
    });

    info!(
        "filter attached as {}; press Ctrl-C to exit",
        stage.sideband().identity()
    );

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    running.store(false, Ordering::Relaxed);

    let _ = typist.await;
    configurator.abort();

    info!("KeyFault demonstration host stopped");
    Ok(())
}
