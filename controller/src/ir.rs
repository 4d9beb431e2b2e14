use tracing::warn;

use aircon_common::AcSignal;

/// Where rendered pulse trains go. The RMT driver hooks in here on the
/// esp target; the host build has no emitter and drops frames.
enum IrBackend {
    Disabled,
    #[cfg(test)]
    Capture(Vec<AcSignal>),
}

pub struct IrTransmitter {
    backend: IrBackend,
    sent_frames: u64,
    failed_frames: u64,
    last_error: Option<String>,
}

impl IrTransmitter {
    pub fn disabled() -> Self {
        Self {
            backend: IrBackend::Disabled,
            sent_frames: 0,
            failed_frames: 0,
            last_error: None,
        }
    }

    #[cfg(test)]
    pub fn capture() -> Self {
        Self {
            backend: IrBackend::Capture(Vec::new()),
            sent_frames: 0,
            failed_frames: 0,
            last_error: None,
        }
    }

    pub fn transmit(&mut self, signal: &AcSignal) -> anyhow::Result<()> {
        let result: anyhow::Result<()> = match &mut self.backend {
            IrBackend::Disabled => {
                warn!(
                    pulses = signal.pulses.len(),
                    carrier_khz = signal.carrier_khz,
                    "IR disabled, dropping frame"
                );
                Ok(())
            }
            #[cfg(test)]
            IrBackend::Capture(frames) => {
                frames.push(signal.clone());
                Ok(())
            }
        };

        match &result {
            Ok(()) => {
                self.sent_frames = self.sent_frames.saturating_add(1);
                self.last_error = None;
            }
            Err(err) => {
                self.failed_frames = self.failed_frames.saturating_add(1);
                self.last_error = Some(format!("{err:#}"));
            }
        }

        result
    }

    pub fn sent_frames(&self) -> u64 {
        self.sent_frames
    }

    #[allow(dead_code)]
    pub fn failed_frames(&self) -> u64 {
        self.failed_frames
    }

    #[allow(dead_code)]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    #[cfg(test)]
    pub fn captured(&self) -> &[AcSignal] {
        match &self.backend {
            IrBackend::Capture(frames) => frames,
            IrBackend::Disabled => &[],
        }
    }
}
