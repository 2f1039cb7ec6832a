//! Configuration transactions over the capture hardware.
//!
//! A transaction opens a hardware configuration batch, records every
//! attach/detach it performs, and either commits the batch or undoes the
//! journal in reverse. A transaction that is dropped while still open rolls
//! back, so an early return can never leave the hardware half configured.

use crate::models::camera_models::{CameraPosition, CaptureMode, InputKind, OutputKind};
use crate::models::error::CaptureError;
use crate::session::device_state::DeviceSessionState;
use crate::traits::capture_hardware::CaptureHardware;

#[derive(Debug, Clone, Copy)]
enum Step {
    AddedVideo(CameraPosition),
    RemovedVideo(CameraPosition),
    AddedAudio,
    RemovedAudio,
    AddedOutput(OutputKind),
    RemovedOutput(OutputKind),
}

pub(crate) struct Transaction<'a> {
    hardware: &'a mut dyn CaptureHardware,
    mode: CaptureMode,
    working: DeviceSessionState,
    journal: Vec<Step>,
    open: bool,
}

impl<'a> Transaction<'a> {
    pub(crate) fn begin(
        hardware: &'a mut dyn CaptureHardware,
        committed: &DeviceSessionState,
        mode: CaptureMode,
    ) -> Self {
        hardware.begin_configuration();
        let mut working = committed.clone();
        working.is_configuring = true;
        Self {
            hardware,
            mode,
            working,
            journal: Vec::new(),
            open: true,
        }
    }

    /// The transaction's own view, including uncommitted changes.
    #[cfg(test)]
    pub(crate) fn state(&self) -> &DeviceSessionState {
        &self.working
    }

    pub(crate) fn attach_video(&mut self, position: CameraPosition) -> Result<(), CaptureError> {
        if self.working.has_input(InputKind::Video) {
            return Err(CaptureError::ConfigurationFailed(
                "video input already attached".into(),
            ));
        }
        self.hardware.add_video_input(position)?;
        self.journal.push(Step::AddedVideo(position));
        self.working.attached_inputs.insert(InputKind::Video);
        self.working.active_camera_position = position;
        Ok(())
    }

    pub(crate) fn detach_video(&mut self) {
        if !self.working.attached_inputs.remove(&InputKind::Video) {
            return;
        }
        let position = self.working.active_camera_position;
        self.hardware.remove_video_input(position);
        self.journal.push(Step::RemovedVideo(position));
    }

    pub(crate) fn attach_audio(&mut self) -> Result<(), CaptureError> {
        if self.working.has_input(InputKind::Audio) {
            return Ok(());
        }
        self.hardware.add_audio_input()?;
        self.journal.push(Step::AddedAudio);
        self.working.attached_inputs.insert(InputKind::Audio);
        Ok(())
    }

    pub(crate) fn detach_audio(&mut self) {
        if self.working.attached_inputs.remove(&InputKind::Audio) {
            self.hardware.remove_audio_input();
            self.journal.push(Step::RemovedAudio);
        }
    }

    /// Attach an output. Outputs the capture mode does not use are refused.
    pub(crate) fn attach_output(&mut self, output: OutputKind) -> Result<(), CaptureError> {
        if !self.mode.allows_output(output) {
            return Err(CaptureError::ConfigurationFailed(format!(
                "{:?} output is not used in {:?} mode",
                output, self.mode
            )));
        }
        if self.working.has_output(output) {
            return Ok(());
        }
        self.hardware.add_output(output)?;
        self.journal.push(Step::AddedOutput(output));
        self.working.attached_outputs.insert(output);
        Ok(())
    }

    pub(crate) fn detach_output(&mut self, output: OutputKind) {
        if self.working.attached_outputs.remove(&output) {
            self.hardware.remove_output(output);
            self.journal.push(Step::RemovedOutput(output));
        }
    }

    /// Drop an output the hardware no longer holds, without touching the
    /// hardware. Not undone by rollback.
    pub(crate) fn forget_output(&mut self, output: OutputKind) {
        self.working.attached_outputs.remove(&output);
    }

    pub(crate) fn detach_all(&mut self) {
        let outputs: Vec<OutputKind> = self.working.attached_outputs.iter().copied().collect();
        for output in outputs {
            self.detach_output(output);
        }
        self.detach_audio();
        self.detach_video();
    }

    /// Commit the batch. On failure the journal is undone and the caller's
    /// committed state remains the truth.
    pub(crate) fn commit(mut self) -> Result<DeviceSessionState, CaptureError> {
        self.open = false;
        match self.hardware.commit_configuration() {
            Ok(()) => {
                let mut committed = self.working.clone();
                committed.is_configuring = false;
                Ok(committed)
            }
            Err(err) => {
                log::warn!("Configuration commit failed, rolling back: {}", err);
                self.hardware.begin_configuration();
                self.undo();
                if let Err(e) = self.hardware.commit_configuration() {
                    log::error!("Rollback commit failed: {}", e);
                }
                Err(err)
            }
        }
    }

    /// Commit a batch that releases hardware. Nothing is undone if the
    /// hardware rejects it: every detach stays applied and the error is only
    /// reported.
    pub(crate) fn commit_release(mut self) -> Result<DeviceSessionState, CaptureError> {
        self.open = false;
        self.journal.clear();
        let mut released = self.working.clone();
        released.is_configuring = false;
        self.hardware.commit_configuration().map(|()| released)
    }

    pub(crate) fn rollback(mut self) {
        self.close_with_rollback();
    }

    fn close_with_rollback(&mut self) {
        self.open = false;
        self.undo();
        if let Err(e) = self.hardware.commit_configuration() {
            log::error!("Rollback commit failed: {}", e);
        }
    }

    fn undo(&mut self) {
        while let Some(step) = self.journal.pop() {
            let restored = match step {
                Step::AddedVideo(position) => {
                    self.hardware.remove_video_input(position);
                    Ok(())
                }
                Step::RemovedVideo(position) => self.hardware.add_video_input(position),
                Step::AddedAudio => {
                    self.hardware.remove_audio_input();
                    Ok(())
                }
                Step::RemovedAudio => self.hardware.add_audio_input(),
                Step::AddedOutput(output) => {
                    self.hardware.remove_output(output);
                    Ok(())
                }
                Step::RemovedOutput(output) => self.hardware.add_output(output),
            };
            if let Err(e) = restored {
                log::error!("Failed to undo {:?}: {}", step, e);
            }
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.open {
            log::warn!("Configuration transaction abandoned, rolling back");
            self.close_with_rollback();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_device::{FaultPlan, VirtualCaptureDevice};

    fn empty() -> DeviceSessionState {
        DeviceSessionState::new(CameraPosition::Back)
    }

    #[test]
    fn commit_publishes_working_state() {
        let device = VirtualCaptureDevice::new();
        let mut hardware = device.clone();
        let mut tx = Transaction::begin(&mut hardware, &empty(), CaptureMode::PhotoAndVideo);
        tx.attach_video(CameraPosition::Back).unwrap();
        tx.attach_output(OutputKind::Photo).unwrap();
        tx.attach_output(OutputKind::Movie).unwrap();
        assert!(tx.state().is_configuring);

        let committed = tx.commit().unwrap();
        assert!(!committed.is_configuring);
        assert!(committed.has_input(InputKind::Video));
        assert_eq!(committed.attached_outputs.len(), 2);
        assert_eq!(device.outputs().len(), 2);
        assert_eq!(device.commit_count(), 1);
    }

    #[test]
    fn rejects_outputs_outside_the_mode() {
        let mut hardware = VirtualCaptureDevice::new();
        let mut tx = Transaction::begin(&mut hardware, &empty(), CaptureMode::PhotoOnly);
        let err = tx.attach_output(OutputKind::Movie).unwrap_err();
        assert!(matches!(err, CaptureError::ConfigurationFailed(_)));
        assert!(tx.state().attached_outputs.is_empty());
    }

    #[test]
    fn rollback_detaches_everything_added() {
        let device = VirtualCaptureDevice::new();
        device.set_faults(FaultPlan {
            reject_outputs: vec![OutputKind::Movie],
            ..FaultPlan::default()
        });
        let mut hardware = device.clone();
        let mut tx = Transaction::begin(&mut hardware, &empty(), CaptureMode::PhotoAndVideo);
        tx.attach_video(CameraPosition::Back).unwrap();
        tx.attach_output(OutputKind::Photo).unwrap();
        assert!(tx.attach_output(OutputKind::Movie).is_err());
        tx.rollback();

        assert_eq!(device.video_input(), None);
        assert!(device.outputs().is_empty());
        assert!(!device.is_configuring());
    }

    #[test]
    fn dropping_an_open_transaction_rolls_back() {
        let device = VirtualCaptureDevice::new();
        let mut hardware = device.clone();
        {
            let mut tx = Transaction::begin(&mut hardware, &empty(), CaptureMode::VideoOnly);
            tx.attach_video(CameraPosition::Back).unwrap();
            tx.attach_audio().unwrap();
        }
        assert_eq!(device.video_input(), None);
        assert!(!device.has_audio_input());
    }

    #[test]
    fn failed_commit_restores_previous_input() {
        let device = VirtualCaptureDevice::new();
        let mut hardware = device.clone();
        let committed = {
            let mut tx = Transaction::begin(&mut hardware, &empty(), CaptureMode::PhotoOnly);
            tx.attach_video(CameraPosition::Back).unwrap();
            tx.commit().unwrap()
        };

        device.set_faults(FaultPlan {
            reject_commit: true,
            ..FaultPlan::default()
        });
        let mut tx = Transaction::begin(&mut hardware, &committed, CaptureMode::PhotoOnly);
        tx.detach_video();
        tx.attach_video(CameraPosition::Front).unwrap();
        assert!(tx.commit().is_err());

        assert_eq!(device.video_input(), Some(CameraPosition::Back));
    }

    #[test]
    fn detach_all_empties_the_session() {
        let device = VirtualCaptureDevice::new();
        let mut hardware = device.clone();
        let committed = {
            let mut tx = Transaction::begin(&mut hardware, &empty(), CaptureMode::VideoOnly);
            tx.attach_video(CameraPosition::Back).unwrap();
            tx.attach_audio().unwrap();
            tx.attach_output(OutputKind::Movie).unwrap();
            tx.commit().unwrap()
        };

        let mut tx = Transaction::begin(&mut hardware, &committed, CaptureMode::VideoOnly);
        tx.detach_all();
        let cleared = tx.commit().unwrap();
        assert!(cleared.is_empty());
        assert_eq!(device.video_input(), None);
        assert!(!device.has_audio_input());
        assert!(device.outputs().is_empty());
    }

    #[test]
    fn rejected_release_keeps_everything_detached() {
        let device = VirtualCaptureDevice::new();
        let mut hardware = device.clone();
        let committed = {
            let mut tx = Transaction::begin(&mut hardware, &empty(), CaptureMode::PhotoAndVideo);
            tx.attach_video(CameraPosition::Back).unwrap();
            tx.attach_audio().unwrap();
            tx.attach_output(OutputKind::Photo).unwrap();
            tx.attach_output(OutputKind::Movie).unwrap();
            tx.commit().unwrap()
        };

        device.set_faults(FaultPlan {
            reject_commit: true,
            ..FaultPlan::default()
        });
        let mut tx = Transaction::begin(&mut hardware, &committed, CaptureMode::PhotoAndVideo);
        tx.detach_all();
        assert!(matches!(
            tx.commit_release(),
            Err(CaptureError::ConfigurationFailed(_))
        ));

        assert_eq!(device.video_input(), None);
        assert!(!device.has_audio_input());
        assert!(device.outputs().is_empty());
        assert!(!device.is_configuring());
    }
}
