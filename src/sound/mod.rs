// Notification sound: remote sound first, synthesized beep as fallback

pub mod output;
pub mod remote;
pub mod tone;

pub use output::{AudioOutput, Clip, CommandOutput, PlaybackError};
pub use remote::{LoadedSound, RemoteSound, ResolveError, SoundSearch};

use tracing::{debug, info, warn};

/// Resolution state of the provider
///
/// Moves from `Unresolved` to `Resolved` exactly once and never back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoundState {
    Unresolved,
    Resolved(Option<LoadedSound>),
}

/// What a call to [`SoundProvider::play`] ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Played {
    Remote,
    Tone,
    Silent,
}

pub struct SoundProvider {
    state: SoundState,
    search: Option<SoundSearch>,
    output: Option<Box<dyn AudioOutput>>,
}

impl SoundProvider {
    pub fn new(search: SoundSearch, output: Box<dyn AudioOutput>) -> Self {
        Self {
            state: SoundState::Unresolved,
            search: Some(search),
            output: Some(output),
        }
    }

    /// Provider that never contacts the network and plays nothing
    pub fn disabled() -> Self {
        Self {
            state: SoundState::Resolved(None),
            search: None,
            output: None,
        }
    }

    pub fn state(&self) -> &SoundState {
        &self.state
    }

    /// Run the one network attempt, if it has not run yet
    ///
    /// The preview is downloaded here too, so playing never touches the network.
    pub async fn resolve(&mut self) -> &SoundState {
        if self.state == SoundState::Unresolved {
            let result = match &self.search {
                Some(search) => search.load_notification_sound().await,
                None => Err(ResolveError::MissingApiKey),
            };
            self.apply(result);
        }
        &self.state
    }

    /// Record the outcome of a resolution attempt; later outcomes are ignored
    pub fn apply(&mut self, result: Result<LoadedSound, ResolveError>) {
        if self.state != SoundState::Unresolved {
            debug!("Sound already resolved, ignoring new outcome");
            return;
        }

        self.state = match result {
            Ok(loaded) => {
                info!(url = %loaded.sound.preview_url, "Sound loaded from API");
                SoundState::Resolved(Some(loaded))
            }
            Err(e) => {
                warn!(error = %e, "Sound API failed, using fallback beep");
                SoundState::Resolved(None)
            }
        };
    }

    /// Start the completion sound; never fails and never waits for it to end
    pub fn play(&self) -> Played {
        let Some(output) = &self.output else {
            debug!("Sound disabled, nothing to play");
            return Played::Silent;
        };

        if let SoundState::Resolved(Some(loaded)) = &self.state {
            match output.play(&loaded.clip) {
                Ok(()) => return Played::Remote,
                Err(e) => warn!(error = %e, "Audio play failed, using beep"),
            }
        }

        match output.play(&tone::beep_clip()) {
            Ok(()) => {
                debug!("Played fallback beep");
                Played::Tone
            }
            Err(e) => {
                debug!(error = %e, "Fallback beep unavailable");
                Played::Silent
            }
        }
    }
}
