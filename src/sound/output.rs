// Audio outputs that clips are handed to

use std::cell::RefCell;
use std::io::Write;
use std::process::{Child, Command, ExitStatus, Stdio};
use tempfile::TempPath;
use thiserror::Error;
use tracing::{debug, warn};

/// Encoded audio ready for a player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clip {
    pub bytes: Vec<u8>,
    /// File extension the player should see, e.g. "mp3" or "wav"
    pub extension: String,
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("clip is empty")]
    EmptyClip,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("player {program} exited with {status}")]
    Player { program: String, status: ExitStatus },
}

/// Somewhere a clip can be played
///
/// `play` hands the clip over and returns; it does not wait for playback.
pub trait AudioOutput {
    fn play(&self, clip: &Clip) -> Result<(), PlaybackError>;
}

/// A player process and the file it is reading
#[derive(Debug)]
struct Running {
    child: Child,
    _file: TempPath,
}

/// Plays clips by running an external player on a temporary file
///
/// Players run in the background. Finished ones are reaped on the next
/// `play`; any still running when the output is dropped are waited for so
/// their files outlive them.
#[derive(Debug)]
pub struct CommandOutput {
    program: String,
    args: Vec<String>,
    running: RefCell<Vec<Running>>,
}

impl CommandOutput {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            running: RefCell::new(Vec::new()),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Players started and not yet reaped
    pub fn pending(&self) -> usize {
        self.reap();
        self.running.borrow().len()
    }

    fn reap(&self) {
        self.running.borrow_mut().retain_mut(|running| match running.child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) if status.success() => false,
            Ok(Some(status)) => {
                let err = PlaybackError::Player {
                    program: self.program.clone(),
                    status,
                };
                warn!(error = %err, "Audio player failed");
                false
            }
            Err(e) => {
                warn!(error = %e, "Failed to poll audio player");
                false
            }
        });
    }
}

impl AudioOutput for CommandOutput {
    fn play(&self, clip: &Clip) -> Result<(), PlaybackError> {
        if clip.bytes.is_empty() {
            return Err(PlaybackError::EmptyClip);
        }
        self.reap();

        let mut file = tempfile::Builder::new()
            .prefix("tasklist-")
            .suffix(&format!(".{}", clip.extension))
            .tempfile()?;
        file.write_all(&clip.bytes)?;
        file.flush()?;
        let path = file.into_temp_path();

        debug!(program = %self.program, path = ?path, "Starting audio player");
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        self.running.borrow_mut().push(Running { child, _file: path });
        Ok(())
    }
}

impl Drop for CommandOutput {
    fn drop(&mut self) {
        for mut running in self.running.get_mut().drain(..) {
            if let Err(e) = running.child.wait() {
                debug!(error = %e, "Failed to wait for audio player");
            }
        }
    }
}
