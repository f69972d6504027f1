use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow};
use cpal::{
    SampleFormat, Stream,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use log::{error, info};

use crate::grains::GrainEngine;

pub type SharedEngine = Arc<Mutex<GrainEngine>>;

pub struct AudioEngine {
    _stream: Stream,
}

impl AudioEngine {
    pub fn start(engine: SharedEngine) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("No default audio output"))?;
        let supported = device
            .default_output_config()
            .context("querying default output config")?;
        let config = supported.config();
        let sample_rate = config.sample_rate.0 as f32;
        if let Ok(mut guard) = engine.lock() {
            guard.set_sample_rate(sample_rate);
        }
        let stream = match supported.sample_format() {
            SampleFormat::I16 => build_stream(&device, &config, engine, |sample| {
                (sample * i16::MAX as f32) as i16
            })?,
            SampleFormat::U16 => build_stream(&device, &config, engine, |sample| {
                let scaled = (sample * 0.5 + 0.5).clamp(0.0, 1.0);
                (scaled * u16::MAX as f32) as u16
            })?,
            _ => build_stream(&device, &config, engine, |sample| sample)?,
        };
        stream.play().context("starting output stream")?;
        info!(
            "audio output on {} at {sample_rate} Hz, {} channel(s)",
            device.name().unwrap_or_else(|_| "unknown device".into()),
            config.channels
        );
        Ok(Self { _stream: stream })
    }
}

fn build_stream<T, F>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    engine: SharedEngine,
    convert: F,
) -> Result<Stream>
where
    T: cpal::SizedSample + Send + 'static,
    F: Fn(f32) -> T + Send + 'static,
{
    let channels = config.channels as usize;
    let mut scratch = Vec::new();
    let stream = device.build_output_stream(
        config,
        move |output: &mut [T], _| {
            fill_output_buffer(output, channels, &engine, &mut scratch, &convert);
        },
        move |err| error!("audio stream error: {err}"),
        None,
    )?;
    Ok(stream)
}

/// Renders one mono block and copies it to every channel of each frame.
fn fill_output_buffer<T, F>(
    output: &mut [T],
    channels: usize,
    engine: &SharedEngine,
    scratch: &mut Vec<f32>,
    convert: F,
) where
    F: Fn(f32) -> T,
    T: Copy,
{
    let frames = output.len() / channels.max(1);
    scratch.resize(frames, 0.0);
    match engine.lock() {
        Ok(mut engine) => engine.render(scratch),
        Err(_) => scratch.fill(0.0),
    }
    for (frame, sample) in output.chunks_mut(channels.max(1)).zip(scratch.iter()) {
        let value = convert(sample.clamp(-0.98, 0.98));
        for channel in frame {
            *channel = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grains::GrainSettings;

    #[test]
    fn every_channel_gets_the_same_sample() {
        let mut grains = GrainEngine::new(GrainSettings::default().into_shared());
        grains.set_sample_rate(1_000.0);
        grains.set_gate(true, 220.0);
        let engine = Arc::new(Mutex::new(grains));

        let mut output = [0.0f32; 256];
        let mut scratch = Vec::new();
        fill_output_buffer(&mut output, 2, &engine, &mut scratch, |s| s);
        assert_eq!(scratch.len(), 128);
        for frame in output.chunks(2) {
            assert_eq!(frame[0], frame[1]);
            assert!(frame[0].abs() <= 0.98);
        }
        assert!(output.iter().any(|s| *s != 0.0));
    }
}
