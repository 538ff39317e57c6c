use log::{debug, error};
use rtrb::{Consumer, Producer, PushError};

use crate::config::ImpulseSettings;
use crate::error::{ConvolveError, Result};
use crate::impulse::{load_impulse, ImpulseBuffer, LoadReport};
use crate::source::{SampleSource, SourceRegistry};

use super::HANDOFF_DEPTH;

pub(super) struct Link {
    pub(super) outgoing: Producer<Box<ImpulseBuffer>>,
    pub(super) returned: Consumer<Box<ImpulseBuffer>>,
}

/// The control half of a stream: loads impulses and publishes them to the
/// processor.
///
/// Loading happens entirely on the calling thread into a spare buffer. The
/// processor picks the new impulse up at the start of its next block, so it
/// never sees a partially written impulse.
pub struct ImpulseController {
    pub(super) link: Option<Link>,
    pub(super) settings: ImpulseSettings,
    pub(super) spares: Vec<Box<ImpulseBuffer>>,
    pub(super) last_report: Option<LoadReport>,
    /// A failed load could not silence the stream because the queue was full.
    pub(super) silence_pending: bool,
}

impl ImpulseController {
    pub fn settings(&self) -> &ImpulseSettings {
        &self.settings
    }

    /// Report of the last impulse published from this controller.
    pub fn last_report(&self) -> Option<LoadReport> {
        self.last_report
    }

    pub fn is_inert(&self) -> bool {
        self.link.is_none()
    }

    /// True while the processor may still be playing an impulse from a
    /// source that has since failed to load.
    pub fn silence_pending(&self) -> bool {
        self.silence_pending
    }

    /// Publishes the silence a failed load couldn't deliver. Returns whether
    /// anything was published.
    pub fn settle(&mut self) -> Result<bool> {
        if !self.silence_pending {
            return Ok(false);
        }
        self.clear()?;
        Ok(true)
    }

    /// Sets the first frame read by the next load.
    pub fn set_offset(&mut self, offset: usize) {
        self.settings.offset = offset;
    }

    /// Sets the frame count read by the next load, clipped to the impulse cap.
    pub fn set_length(&mut self, length: usize) {
        self.settings = ImpulseSettings {
            length,
            ..self.settings.clone()
        }
        .normalized();
    }

    /// Sets the 1-based channel read by the next load.
    pub fn set_channel(&mut self, channel: usize) {
        self.settings = ImpulseSettings {
            channel,
            ..self.settings.clone()
        }
        .normalized();
    }

    /// Replaces every setting and reloads from `registry`.
    pub fn apply_settings(
        &mut self,
        registry: &SourceRegistry,
        settings: ImpulseSettings,
    ) -> Result<LoadReport> {
        self.settings = settings.normalized();
        self.refresh(registry)
    }

    /// Loads the named source with the current offset, length and channel.
    ///
    /// An unknown name silences the stream and is reported as
    /// [`ConvolveError::SourceNotFound`]; the name is kept so a later
    /// [`refresh`](Self::refresh) can pick the source up once it exists.
    /// If the handoff queue is full the silence can't be published yet:
    /// [`silence_pending`](Self::silence_pending) turns true until
    /// [`settle`](Self::settle) or another load succeeds.
    pub fn set_source(&mut self, registry: &SourceRegistry, name: &str) -> Result<LoadReport> {
        self.settings.source = Some(name.to_string());
        self.refresh(registry)
    }

    /// Re-reads the stored source, or clears the impulse if none is set.
    pub fn refresh(&mut self, registry: &SourceRegistry) -> Result<LoadReport> {
        let Some(name) = self.settings.source.clone() else {
            return self.clear();
        };

        match registry.get(&name) {
            Ok(source) => {
                let ImpulseSettings {
                    offset,
                    length,
                    channel,
                    ..
                } = self.settings;
                self.load(source.as_ref(), offset, length, channel)
            }
            Err(err) => {
                error!("{err}");
                if let Err(clear_err) = self.clear() {
                    self.silence_pending = true;
                    error!("couldn't silence stream: {clear_err}; previous impulse stays active until settled");
                }
                Err(err)
            }
        }
    }

    /// Loads directly from `source`, bypassing the registry and the stored
    /// settings.
    pub fn load<S: SampleSource + ?Sized>(
        &mut self,
        source: &S,
        offset: usize,
        length: usize,
        channel: usize,
    ) -> Result<LoadReport> {
        let mut buffer = self.fresh_buffer()?;
        let report = load_impulse(&mut buffer, source, offset, length, channel);
        self.publish(buffer, report)
    }

    /// Publishes an empty impulse, silencing the stream.
    pub fn clear(&mut self) -> Result<LoadReport> {
        let mut buffer = self.fresh_buffer()?;
        buffer.clear();
        let report = LoadReport {
            length: 0,
            padded_length: 0,
            channel: self.settings.channel,
            shortfall: None,
        };
        self.publish(buffer, report)
    }

    /// Moves impulses the processor has finished with into the spare pool.
    fn reclaim(&mut self) {
        let Some(link) = self.link.as_mut() else {
            return;
        };
        while let Ok(buffer) = link.returned.pop() {
            if self.spares.len() < HANDOFF_DEPTH {
                self.spares.push(buffer);
            }
        }
    }

    fn fresh_buffer(&mut self) -> Result<Box<ImpulseBuffer>> {
        match self.link.as_ref() {
            None => return Err(ConvolveError::Inert),
            Some(link) if link.outgoing.is_full() => return Err(ConvolveError::HandoffFull),
            Some(_) => {}
        }

        self.reclaim();
        match self.spares.pop() {
            Some(buffer) => Ok(buffer),
            None => Ok(Box::new(ImpulseBuffer::try_new()?)),
        }
    }

    fn publish(&mut self, buffer: Box<ImpulseBuffer>, report: LoadReport) -> Result<LoadReport> {
        let Some(link) = self.link.as_mut() else {
            return Err(ConvolveError::Inert);
        };

        match link.outgoing.push(buffer) {
            Ok(()) => {
                debug!(
                    "published impulse: {} taps ({} padded), channel {}",
                    report.length, report.padded_length, report.channel
                );
                self.last_report = Some(report);
                self.silence_pending = false;
                Ok(report)
            }
            Err(PushError::Full(buffer)) => {
                self.spares.push(buffer);
                Err(ConvolveError::HandoffFull)
            }
        }
    }
}
