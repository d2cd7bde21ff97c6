mod mixer;

use basedrop::{Collector, Handle, Shared};
use cpal::{
    FromSample, SizedSample,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use kbm_transport::{AudioArc, AudioOutput, Command, Status, batch_volume};

pub use mixer::Mixer;

type SharedMusic = Shared<AudioArc>;

/// Control side of the output stream. Dropping it closes the device.
pub struct AudioEngineHandle {
    commands: rtrb::Producer<Command>,
    status: rtrb::Consumer<Status>,
    music: rtrb::Producer<SharedMusic>,
    collector: Collector,
    handle: Handle,
    sample_rate: u32,
    position: f64,
    _stream: cpal::Stream,
}

/// Open the default output device. `strike` is the cue played for notes
/// crossing the trigger line; it is resampled to the device rate up front.
pub fn start(strike: Option<AudioArc>) -> anyhow::Result<AudioEngineHandle> {
    let collector = Collector::new();
    let handle = collector.handle();

    let (command_tx, command_rx) = rtrb::RingBuffer::<Command>::new(256);
    let (status_tx, status_rx) = rtrb::RingBuffer::<Status>::new(64);
    let (music_tx, music_rx) = rtrb::RingBuffer::<SharedMusic>::new(4);

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow::anyhow!("no output device found"))?;

    let config = device.default_output_config()?;
    let sample_rate = config.sample_rate().0;

    let strike = strike.map(|s| s.resample(sample_rate)).transpose()?;
    let mixer = Mixer::new(sample_rate, strike);

    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => build_stream::<f32>(
            &device,
            &config.into(),
            mixer,
            command_rx,
            music_rx,
            status_tx,
        )?,
        cpal::SampleFormat::I16 => build_stream::<i16>(
            &device,
            &config.into(),
            mixer,
            command_rx,
            music_rx,
            status_tx,
        )?,
        sample_format => anyhow::bail!("unsupported sample format '{sample_format}'"),
    };

    stream.play()?;
    log::info!("audio output started at {sample_rate} Hz");

    Ok(AudioEngineHandle {
        commands: command_tx,
        status: status_rx,
        music: music_tx,
        collector,
        handle,
        sample_rate,
        position: 0.0,
        _stream: stream,
    })
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut mixer: Mixer,
    mut command_rx: rtrb::Consumer<Command>,
    mut music_rx: rtrb::Consumer<SharedMusic>,
    mut status_tx: rtrb::Producer<Status>,
) -> anyhow::Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let output_channels = config.channels as usize;

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            // old streams are dropped by the collector, not here
            while let Ok(music) = music_rx.pop() {
                mixer.set_music(music);
            }

            while let Ok(cmd) = command_rx.pop() {
                mixer.apply(cmd);
            }

            mixer.render(data, output_channels);

            let _ = status_tx.push(Status::Position(mixer.position_secs()));
        },
        |err| log::error!("stream error: {err}"),
        None,
    )?;

    Ok(stream)
}

impl AudioEngineHandle {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn send(&mut self, command: Command) {
        if self.commands.push(command).is_err() {
            log::warn!("audio command queue full, dropped {command:?}");
        }
    }

    /// Drain position reports from the callback. Returns the newest one.
    pub fn poll_position(&mut self) -> Option<f64> {
        let mut latest = None;
        while let Ok(Status::Position(seconds)) = self.status.pop() {
            latest = Some(seconds);
        }
        if let Some(seconds) = latest {
            self.position = seconds;
        }
        self.collector.collect();
        latest
    }

    pub fn position(&self) -> f64 {
        self.position
    }
}

impl AudioOutput for AudioEngineHandle {
    fn load_stream(&mut self, music: AudioArc) {
        let music = music.resample(self.sample_rate).unwrap_or_else(|err| {
            log::warn!("could not resample music to {} Hz: {err}", self.sample_rate);
            music
        });
        let shared = Shared::new(&self.handle, music);
        if self.music.push(shared).is_err() {
            log::warn!("music queue full, stream not replaced");
        }
        self.position = 0.0;
        self.collector.collect();
    }

    fn play(&mut self) {
        self.send(Command::Play);
    }

    fn pause(&mut self) {
        self.send(Command::Pause);
    }

    fn seek(&mut self, seconds: f64) {
        self.position = seconds.max(0.0);
        self.send(Command::Seek { seconds });
    }

    fn set_volume(&mut self, volume: f32) {
        self.send(Command::SetVolume(volume));
    }

    fn play_batch(&mut self, count: usize) {
        if count > 0 {
            self.send(Command::Strike {
                volume: batch_volume(count),
            });
        }
    }
}
