//! PCM capture via cpal.
//!
//! Opens the requested (or default) input device at 16 kHz mono f32 and
//! runs the extraction stage inside the cpal callback: the realtime
//! thread slices incoming buffers into fixed 128-sample blocks and hands
//! each one to the orchestration side over a bounded channel. The
//! callback never blocks and allocates nothing beyond the per-block copy.

use std::sync::mpsc as std_mpsc;
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::StreamConfig;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use super::{PcmBlock, BLOCK_SAMPLES, SAMPLE_RATE};
use crate::error::CaptureError;

/// Block channel capacity, ~1 s of audio at one block per 8 ms.
pub const BLOCK_CHANNEL_CAPACITY: usize = 128;

/// Session-facing capture seam. Lets the state machine own a running
/// capture without knowing about cpal.
pub trait CaptureControl {
    /// Release the stream and the microphone. Idempotent.
    fn close(&mut self);
}

/// Handle to a running capture session.
///
/// The cpal `Stream` is not `Send`, so it lives on a dedicated thread;
/// the handle controls that thread through the stop channel.
pub struct CaptureHandle {
    stop_tx: Option<std_mpsc::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl CaptureControl for CaptureHandle {
    fn close(&mut self) {
        // Dropping the sender unparks the capture thread, which drops
        // the stream: callback disconnected, capture graph torn down,
        // hardware track released.
        drop(self.stop_tx.take());
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Open a capture session.
///
/// `device_id` of `None` uses the platform default input. A provided id
/// must match exactly; a missing device is an error, never a fallback.
/// Blocks flow into `blocks` until the handle is closed; runtime stream
/// errors are forwarded on `errors`.
pub async fn open(
    device_id: Option<&str>,
    blocks: mpsc::Sender<PcmBlock>,
    errors: mpsc::UnboundedSender<String>,
) -> Result<CaptureHandle, CaptureError> {
    let device_id = device_id.map(String::from);
    let (ready_tx, ready_rx) = oneshot::channel();
    let (stop_tx, stop_rx) = std_mpsc::channel::<()>();

    let thread = thread::Builder::new()
        .name("pcm-capture".into())
        .spawn(move || capture_thread(device_id.as_deref(), blocks, errors, ready_tx, stop_rx))
        .map_err(|e| CaptureError::ProcessingInit(e.to_string()))?;

    match ready_rx.await {
        Ok(Ok(())) => Ok(CaptureHandle {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        }),
        Ok(Err(e)) => {
            let _ = thread.join();
            Err(e)
        }
        Err(_) => {
            let _ = thread.join();
            Err(CaptureError::ProcessingInit(
                "capture thread exited before reporting readiness".into(),
            ))
        }
    }
}

/// Capture thread body: build the stream, report readiness, then park
/// until the handle is closed.
fn capture_thread(
    device_id: Option<&str>,
    blocks: mpsc::Sender<PcmBlock>,
    errors: mpsc::UnboundedSender<String>,
    ready_tx: oneshot::Sender<Result<(), CaptureError>>,
    stop_rx: std_mpsc::Receiver<()>,
) {
    let stream = match build_stream(device_id, blocks, errors) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(CaptureError::ProcessingInit(e.to_string())));
        return;
    }

    info!("Audio capture started");
    let _ = ready_tx.send(Ok(()));

    // Blocks until the handle drops its sender.
    let _ = stop_rx.recv();

    drop(stream);
    debug!("Capture thread exiting");
}

/// Find the input device: exact name match when an id is given, the
/// platform default otherwise.
fn resolve_device(device_id: Option<&str>) -> Result<cpal::Device, CaptureError> {
    let host = cpal::default_host();

    let device = if let Some(id) = device_id {
        host.input_devices()
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?
            .find(|d| d.name().map(|n| n == id).unwrap_or(false))
            .ok_or_else(|| {
                CaptureError::DeviceUnavailable(format!("input device not found: {id}"))
            })?
    } else {
        host.default_input_device()
            .ok_or_else(|| CaptureError::DeviceUnavailable("no default input device".into()))?
    };

    let name = device.name().unwrap_or_else(|_| "unknown".into());
    info!(device = %name, "Selected input device");
    Ok(device)
}

fn build_stream(
    device_id: Option<&str>,
    blocks: mpsc::Sender<PcmBlock>,
    errors: mpsc::UnboundedSender<String>,
) -> Result<cpal::Stream, CaptureError> {
    let device = resolve_device(device_id)?;

    let stream_config = StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(SAMPLE_RATE),
        buffer_size: cpal::BufferSize::Default,
    };

    // Carry for samples left over between callbacks; emitted blocks are
    // always exactly BLOCK_SAMPLES long regardless of the device buffer
    // size.
    let mut carry: Vec<f32> = Vec::with_capacity(BLOCK_SAMPLES * 2);

    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                frame_blocks(&mut carry, data, |block| {
                    if blocks.try_send(block).is_err() {
                        // Channel full or session gone. The block is
                        // dropped rather than blocking the audio thread.
                    }
                });
            },
            move |err| {
                error!("Audio input stream error: {}", err);
                let _ = errors.send(err.to_string());
            },
            None, // no timeout
        )
        .map_err(|e| CaptureError::ProcessingInit(e.to_string()))?;

    Ok(stream)
}

/// Slice `input` (plus any carried remainder) into BLOCK_SAMPLES-sized
/// blocks, each freshly owned.
fn frame_blocks(carry: &mut Vec<f32>, input: &[f32], mut emit: impl FnMut(PcmBlock)) {
    carry.extend_from_slice(input);
    while carry.len() >= BLOCK_SAMPLES {
        let block: Vec<f32> = carry.drain(..BLOCK_SAMPLES).collect();
        emit(PcmBlock::new(block));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize, start: f32) -> Vec<f32> {
        (0..len).map(|i| start + i as f32).collect()
    }

    #[test]
    fn uneven_buffers_yield_exact_blocks_in_order() {
        let mut carry = Vec::new();
        let mut emitted = Vec::new();

        // 100 + 100 samples: one block after the second callback.
        frame_blocks(&mut carry, &ramp(100, 0.0), |b| emitted.push(b));
        assert!(emitted.is_empty());
        assert_eq!(carry.len(), 100);

        frame_blocks(&mut carry, &ramp(100, 100.0), |b| emitted.push(b));
        assert_eq!(emitted.len(), 1);
        assert_eq!(carry.len(), 200 - BLOCK_SAMPLES);

        let block = &emitted[0];
        assert_eq!(block.samples().len(), BLOCK_SAMPLES);
        // Samples are contiguous across the callback boundary.
        assert_eq!(block.samples()[0], 0.0);
        assert_eq!(block.samples()[99], 99.0);
        assert_eq!(block.samples()[100], 100.0);
    }

    #[test]
    fn large_buffer_yields_multiple_blocks() {
        let mut carry = Vec::new();
        let mut emitted = Vec::new();

        frame_blocks(&mut carry, &ramp(BLOCK_SAMPLES * 3 + 5, 0.0), |b| {
            emitted.push(b)
        });
        assert_eq!(emitted.len(), 3);
        assert_eq!(carry.len(), 5);
        assert_eq!(emitted[1].samples()[0], BLOCK_SAMPLES as f32);
        assert_eq!(emitted[2].samples()[0], (BLOCK_SAMPLES * 2) as f32);
    }

    #[test]
    fn close_is_idempotent() {
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
        let thread = thread::spawn(move || {
            let _ = stop_rx.recv();
        });
        let mut handle = CaptureHandle {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        };
        handle.close();
        handle.close();
    }
}
