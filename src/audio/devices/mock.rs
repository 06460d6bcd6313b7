// In-memory device backend
//
// Lets the pipeline run without hardware. Tests drive the "device callbacks"
// by hand: `push_capture` plays the role of the input callback and
// `pull_render` the role of the output callback.

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use crossbeam::channel::Sender;
use tracing::info;

use super::{ActiveStream, AudioDevice, DeviceBackend};
use crate::audio::mixer::pipeline::AudioBus;
use crate::audio::types::{AudioFormat, StreamDirection};

/// Description of a fake default device
#[derive(Debug, Clone, PartialEq)]
pub struct MockDeviceSpec {
    pub name: String,
    pub supported_formats: Vec<AudioFormat>,
    pub preferred_format: AudioFormat,
    /// Make `open_stream` fail, as a busy or unplugged device would
    pub fail_open: bool,
}

impl MockDeviceSpec {
    /// A device that supports only its preferred format
    pub fn new(name: impl Into<String>, preferred_format: AudioFormat) -> Self {
        Self {
            name: name.into(),
            supported_formats: vec![preferred_format],
            preferred_format,
            fail_open: false,
        }
    }

    pub fn supporting(mut self, format: AudioFormat) -> Self {
        if !self.supported_formats.contains(&format) {
            self.supported_formats.push(format);
        }
        self
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }
}

/// Stream lifecycle as seen by the fake hardware
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockStreamEvent {
    Opened {
        direction: StreamDirection,
        device: String,
        format: AudioFormat,
    },
    Closed {
        direction: StreamDirection,
        device: String,
    },
}

#[derive(Debug, Default)]
struct MockState {
    input: Option<MockDeviceSpec>,
    output: Option<MockDeviceSpec>,
    capture_bus: Option<Arc<AudioBus>>,
    render_bus: Option<Arc<AudioBus>>,
    events: Vec<MockStreamEvent>,
}

#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// A backend with no devices at all
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(self, spec: MockDeviceSpec) -> Self {
        self.lock().input = Some(spec);
        self
    }

    pub fn with_output(self, spec: MockDeviceSpec) -> Self {
        self.lock().output = Some(spec);
        self
    }

    /// Mono 44.1 kHz input and output
    pub fn with_default_devices() -> Self {
        Self::new()
            .with_input(MockDeviceSpec::new("Mock Microphone", AudioFormat::default()))
            .with_output(MockDeviceSpec::new("Mock Speakers", AudioFormat::default()))
    }

    /// Unplug (or replug) the default input device
    pub fn set_input(&self, spec: Option<MockDeviceSpec>) {
        self.lock().input = spec;
    }

    pub fn set_output(&self, spec: Option<MockDeviceSpec>) {
        self.lock().output = spec;
    }

    /// Deliver captured bytes as the input callback would. Returns false when
    /// no capture stream is open.
    pub fn push_capture(&self, bytes: &[u8]) -> bool {
        let bus = self.lock().capture_bus.clone();
        match bus {
            Some(bus) => {
                bus.write(bytes);
                true
            }
            None => false,
        }
    }

    /// Drain up to `max_bytes` as the output callback would. `None` when no
    /// render stream is open.
    pub fn pull_render(&self, max_bytes: usize) -> Option<Vec<u8>> {
        let bus = self.lock().render_bus.clone();
        bus.map(|bus| bus.read(max_bytes))
    }

    pub fn is_streaming(&self, direction: StreamDirection) -> bool {
        let state = self.lock();
        match direction {
            StreamDirection::Capture => state.capture_bus.is_some(),
            StreamDirection::Render => state.render_bus.is_some(),
        }
    }

    pub fn events(&self) -> Vec<MockStreamEvent> {
        self.lock().events.clone()
    }

    /// Formats every opened stream was bound to, in order
    pub fn opened_formats(&self, direction: StreamDirection) -> Vec<AudioFormat> {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                MockStreamEvent::Opened {
                    direction: opened,
                    format,
                    ..
                } if *opened == direction => Some(*format),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn device(&self, direction: StreamDirection) -> Option<Box<dyn AudioDevice>> {
        let spec = match direction {
            StreamDirection::Capture => self.lock().input.clone(),
            StreamDirection::Render => self.lock().output.clone(),
        }?;

        Some(Box::new(MockDevice {
            spec,
            direction,
            state: self.state.clone(),
        }))
    }
}

impl DeviceBackend for MockBackend {
    fn backend_name(&self) -> &'static str {
        "mock"
    }

    fn default_input_device(&self) -> Option<Box<dyn AudioDevice>> {
        self.device(StreamDirection::Capture)
    }

    fn default_output_device(&self) -> Option<Box<dyn AudioDevice>> {
        self.device(StreamDirection::Render)
    }
}

struct MockDevice {
    spec: MockDeviceSpec,
    direction: StreamDirection,
    state: Arc<Mutex<MockState>>,
}

impl AudioDevice for MockDevice {
    fn name(&self) -> String {
        self.spec.name.clone()
    }

    fn direction(&self) -> StreamDirection {
        self.direction
    }

    fn supports_format(&self, format: &AudioFormat) -> bool {
        self.spec.supported_formats.contains(format)
    }

    fn preferred_format(&self) -> AudioFormat {
        self.spec.preferred_format
    }

    fn open_stream(
        &self,
        format: AudioFormat,
        bus: Arc<AudioBus>,
        _errors: Sender<String>,
    ) -> Result<Box<dyn ActiveStream>> {
        if self.spec.fail_open {
            anyhow::bail!("Mock device '{}' refused to open", self.spec.name);
        }

        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match self.direction {
            StreamDirection::Capture => state.capture_bus = Some(bus),
            StreamDirection::Render => state.render_bus = Some(bus),
        }
        state.events.push(MockStreamEvent::Opened {
            direction: self.direction,
            device: self.spec.name.clone(),
            format,
        });

        info!(
            "🧪 MOCK_DEVICE: Opened {} stream on '{}' ({})",
            self.direction, self.spec.name, format
        );

        Ok(Box::new(MockStream {
            direction: self.direction,
            device: self.spec.name.clone(),
            state: self.state.clone(),
        }))
    }
}

struct MockStream {
    direction: StreamDirection,
    device: String,
    state: Arc<Mutex<MockState>>,
}

impl ActiveStream for MockStream {
    fn pause(&mut self) -> Result<()> {
        Ok(())
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match self.direction {
            StreamDirection::Capture => state.capture_bus = None,
            StreamDirection::Render => state.render_bus = None,
        }
        state.events.push(MockStreamEvent::Closed {
            direction: self.direction,
            device: self.device.clone(),
        });
    }
}
