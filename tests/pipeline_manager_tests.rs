use passthrough_mixer_lib::audio::utils::{bytes_to_samples, samples_to_bytes};
use passthrough_mixer_lib::audio::{
    AudioBus, AudioFormat, CaptureWorker, MockBackend, MockDeviceSpec, MockStreamEvent,
    PipelineConfig, PipelineError, PipelineManager, RenderWorker, StreamDirection, Worker,
    WorkerState,
};
use std::sync::Arc;

fn test_config() -> PipelineConfig {
    PipelineConfig {
        realtime_priority: false,
        ..PipelineConfig::default()
    }
}

fn pipeline_on(backend: &MockBackend) -> PipelineManager {
    PipelineManager::from_config(test_config(), Arc::new(backend.clone()))
        .expect("default config is valid")
}

#[cfg(test)]
mod lifecycle_tests {
    use super::*;

    #[test]
    fn test_stop_before_start_is_a_no_op() {
        let backend = MockBackend::with_default_devices();
        let mut pipeline = pipeline_on(&backend);

        pipeline.stop();
        pipeline.stop();

        assert!(!pipeline.is_running());
        assert!(backend.events().is_empty(), "No device should have been opened");
    }

    #[test]
    fn test_unstarted_workers_stop_twice_without_touching_devices() {
        let backend = MockBackend::with_default_devices();
        let bus = Arc::new(AudioBus::new());
        let mut capture = CaptureWorker::with_priority(
            Arc::new(backend.clone()),
            bus.clone(),
            AudioFormat::default(),
            false,
        );
        let mut render =
            RenderWorker::with_priority(Arc::new(backend.clone()), bus, AudioFormat::default(), false);

        capture.stop();
        capture.stop();
        render.stop();
        render.stop();

        assert_eq!(capture.state(), WorkerState::Idle);
        assert_eq!(render.state(), WorkerState::Idle);
        assert_eq!(capture.stats().starts, 0);
        assert!(backend.events().is_empty(), "No device should have been opened");
    }

    #[test]
    fn test_stop_is_idempotent_after_start() {
        let backend = MockBackend::with_default_devices();
        let mut pipeline = pipeline_on(&backend);

        assert!(pipeline.start().is_ready());
        pipeline.stop();
        let events_after_first_stop = backend.events();
        pipeline.stop();

        assert_eq!(backend.events(), events_after_first_stop);
        assert_eq!(pipeline.capture_state(), WorkerState::Idle);
        assert_eq!(pipeline.render_state(), WorkerState::Idle);
    }

    #[test]
    fn test_devices_released_on_stop() {
        let backend = MockBackend::with_default_devices();
        let mut pipeline = pipeline_on(&backend);
        pipeline.start();

        assert!(backend.is_streaming(StreamDirection::Capture));
        assert!(backend.is_streaming(StreamDirection::Render));

        pipeline.stop();

        assert!(!backend.is_streaming(StreamDirection::Capture));
        assert!(!backend.is_streaming(StreamDirection::Render));
        let closed = backend
            .events()
            .into_iter()
            .filter(|event| matches!(event, MockStreamEvent::Closed { .. }))
            .count();
        assert_eq!(closed, 2);
    }

    #[test]
    fn test_drop_stops_workers() {
        let backend = MockBackend::with_default_devices();
        {
            let mut pipeline = pipeline_on(&backend);
            pipeline.start();
        }

        assert!(!backend.is_streaming(StreamDirection::Capture));
        assert!(!backend.is_streaming(StreamDirection::Render));
    }

    #[test]
    fn test_restart_after_stop() {
        let backend = MockBackend::with_default_devices();
        let mut pipeline = pipeline_on(&backend);

        pipeline.start();
        pipeline.stop();
        assert!(pipeline.start().is_ready());

        assert_eq!(backend.opened_formats(StreamDirection::Capture).len(), 2);
        assert_eq!(pipeline.stats().capture.starts, 2);
    }
}

#[cfg(test)]
mod device_tests {
    use super::*;

    #[test]
    fn test_format_falls_back_to_device_preference() {
        let backend = MockBackend::new()
            .with_input(MockDeviceSpec::new("48k Mic", AudioFormat::new(48_000, 1)))
            .with_output(MockDeviceSpec::new("Speakers", AudioFormat::default()));
        let mut pipeline = pipeline_on(&backend);

        let report = pipeline.start();

        assert_eq!(report.capture, Some(AudioFormat::new(48_000, 1)));
        assert_eq!(report.render, Some(AudioFormat::default()));
        assert_eq!(
            backend.opened_formats(StreamDirection::Capture),
            vec![AudioFormat::new(48_000, 1)]
        );

        let stats = pipeline.stats();
        assert_eq!(stats.capture.requested_format, AudioFormat::default());
        assert_eq!(stats.capture.active_format, Some(AudioFormat::new(48_000, 1)));
    }

    #[test]
    fn test_requested_format_used_when_supported() {
        let backend = MockBackend::new()
            .with_input(
                MockDeviceSpec::new("Mic", AudioFormat::new(48_000, 2)).supporting(AudioFormat::default()),
            )
            .with_output(MockDeviceSpec::new("Speakers", AudioFormat::default()));
        let mut pipeline = pipeline_on(&backend);

        assert_eq!(pipeline.start().capture, Some(AudioFormat::default()));
    }

    #[test]
    fn test_missing_input_keeps_render_running() {
        let backend = MockBackend::new().with_output(MockDeviceSpec::new("Speakers", AudioFormat::default()));
        let mut pipeline = pipeline_on(&backend);

        let report = pipeline.start();

        assert_eq!(report.capture, None);
        assert!(report.render.is_some());
        assert!(!report.is_ready());
        assert_eq!(pipeline.capture_state(), WorkerState::Idle);
        assert_eq!(pipeline.render_state(), WorkerState::Running);
        assert!(pipeline.is_running());
    }

    #[test]
    fn test_no_devices_at_all() {
        let backend = MockBackend::new();
        let mut pipeline = pipeline_on(&backend);

        let report = pipeline.start();

        assert_eq!(report.capture, None);
        assert_eq!(report.render, None);
        assert!(!pipeline.is_running());
        pipeline.stop();
    }

    #[test]
    fn test_replugged_device_picked_up_on_restart() {
        let backend = MockBackend::with_default_devices();
        backend.set_input(None);
        let mut pipeline = pipeline_on(&backend);

        assert_eq!(pipeline.start().capture, None);
        pipeline.stop();

        backend.set_input(Some(MockDeviceSpec::new("USB Mic", AudioFormat::default())));
        assert!(pipeline.start().capture.is_some());
        assert_eq!(pipeline.stats().capture.device_name.as_deref(), Some("USB Mic"));
    }

    #[test]
    fn test_format_change_requires_stopped_worker() {
        let backend = MockBackend::with_default_devices();
        let mut pipeline = pipeline_on(&backend);
        pipeline.start();

        let result = pipeline.set_capture_format(AudioFormat::new(22_050, 1));
        assert!(matches!(
            result,
            Err(PipelineError::FormatLocked {
                direction: StreamDirection::Capture
            })
        ));
        assert_eq!(pipeline.stats().capture.active_format, Some(AudioFormat::default()));

        pipeline.stop();
        pipeline.set_capture_format(AudioFormat::new(22_050, 1)).unwrap();
        assert_eq!(pipeline.stats().capture.requested_format, AudioFormat::new(22_050, 1));
    }
}

#[cfg(test)]
mod data_path_tests {
    use super::*;

    #[test]
    fn test_capture_to_render_passthrough() {
        let backend = MockBackend::with_default_devices();
        let mut pipeline = pipeline_on(&backend);
        pipeline.start();

        let captured = samples_to_bytes(&[1, -2, 3, -4]);
        assert!(backend.push_capture(&captured));

        let rendered = backend.pull_render(captured.len()).expect("render stream open");
        assert_eq!(rendered, captured);
        assert!(pipeline.bus().is_empty());
    }

    #[test]
    fn test_input_gain_does_not_touch_capture_path() {
        let backend = MockBackend::with_default_devices();
        let mut pipeline = pipeline_on(&backend);
        pipeline.start();

        assert!(pipeline.set_input_gain(0.0).unwrap());
        backend.push_capture(&samples_to_bytes(&[1000]));

        assert_eq!(bytes_to_samples(&pipeline.bus().read(2)), vec![1000]);
        assert_eq!(pipeline.input_gain(), 0.0);
    }

    #[test]
    fn test_capture_and_tap_are_concatenated() {
        let backend = MockBackend::with_default_devices();
        let mut pipeline = pipeline_on(&backend);
        pipeline.start();
        pipeline.set_media_gain(0.5).unwrap();
        let tap = pipeline.playback_tap();

        backend.push_capture(&samples_to_bytes(&[100]));
        tap.inject_decoded_audio(&samples_to_bytes(&[1000]));

        let rendered = backend.pull_render(64).unwrap();
        assert_eq!(bytes_to_samples(&rendered), vec![100, 500]);
    }

    #[test]
    fn test_stats_snapshot() {
        let backend = MockBackend::with_default_devices();
        let mut pipeline = pipeline_on(&backend);
        pipeline.start();
        pipeline.set_media_gain(0.25).unwrap();
        backend.push_capture(&[0; 10]);

        let stats = pipeline.stats();
        assert!(stats.is_running);
        assert_eq!(stats.media_gain, 0.25);
        assert_eq!(stats.bus.bytes_written, 10);
        assert_eq!(stats.bus.buffered_bytes, 10);
        assert_eq!(stats.render.device_name.as_deref(), Some("Mock Speakers"));
        assert_eq!(stats.render.device_errors, 0);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["bus"]["bytes_written"], 10);
    }

    #[test]
    fn test_custom_bus_capacity_from_config() {
        let config = PipelineConfig {
            bus_capacity_bytes: 8,
            ..test_config()
        };
        let backend = MockBackend::with_default_devices();
        let mut pipeline = PipelineManager::from_config(config, Arc::new(backend.clone())).unwrap();
        pipeline.start();

        backend.push_capture(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(pipeline.bus().capacity(), 8);
        assert_eq!(backend.pull_render(16).unwrap(), vec![3, 4, 5, 6, 7, 8, 9, 10]);
    }
}
