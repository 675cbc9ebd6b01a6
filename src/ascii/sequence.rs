use super::CommandSink;
use crate::Result;
use std::fmt;
use std::time::Duration;
use tracing::Instrument;

/// One step of a composite mount operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Send a line-protocol command.
    Command(&'static str),
    /// Wait before the next step.
    Sleep(Duration),
}

/// Fixed composite mount operations exposed over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sequence {
    /// Declare the current pointing to be the zenith, then park.
    SyncToZenith,
    /// Park the mount.
    Park,
    /// Slew to the position where the mirror cover can be serviced.
    GotoCover,
    /// Abort any motion.
    Stop,
}

const SYNC_TO_ZENITH: &[Step] = &[
    Step::Command("UnPark"),
    Step::Command("SyncToAltAz 0 89.9"),
    Step::Command("MotorsToAuto"),
    Step::Sleep(Duration::from_secs(3)),
    Step::Command("Park"),
];

const PARK: &[Step] = &[Step::Command("Park")];

const GOTO_COVER: &[Step] = &[
    Step::Command("UnPark"),
    Step::Command("GoToAltAzStop 180 20"),
    Step::Sleep(Duration::from_secs(70)),
    Step::Command("Abort"),
];

const STOP: &[Step] = &[Step::Command("Abort")];

impl Sequence {
    /// Stable name used in logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::SyncToZenith => "sync_to_zenith",
            Self::Park => "park",
            Self::GotoCover => "goto_cover",
            Self::Stop => "stop",
        }
    }

    /// Steps in execution order.
    pub const fn steps(self) -> &'static [Step] {
        match self {
            Self::SyncToZenith => SYNC_TO_ZENITH,
            Self::Park => PARK,
            Self::GotoCover => GOTO_COVER,
            Self::Stop => STOP,
        }
    }

    /// Whether the sequence moves the mount through more than one step.
    pub const fn is_composite(self) -> bool {
        self.steps().len() > 1
    }

    /// Run all steps against `sink`, see [`run_steps`].
    pub async fn run<S: CommandSink + ?Sized>(self, sink: &mut S) -> Result<Vec<String>> {
        run_steps(self.name(), self.steps(), sink).await
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Execute `steps` strictly in order and collect the command responses.
///
/// Stops at the first failing command and returns its error; later steps are
/// never issued. Steps that already ran are not undone, the mount has no
/// compensating commands.
pub async fn run_steps<S: CommandSink + ?Sized>(
    name: &str,
    steps: &[Step],
    sink: &mut S,
) -> Result<Vec<String>> {
    let span = tracing::info_span!("Command sequence", name);

    async move {
        let mut responses = Vec::new();
        for (index, step) in steps.iter().enumerate() {
            match *step {
                Step::Command(command) => {
                    tracing::debug!(index, command, "Sending step");
                    let response = sink.send_command(command).await.inspect_err(|err| {
                        tracing::error!(index, command, %err, "Sequence aborted");
                    })?;
                    responses.push(response);
                }
                Step::Sleep(duration) => {
                    tracing::debug!(index, ?duration, "Waiting");
                    tokio::time::sleep(duration).await;
                }
            }
        }
        tracing::info!("Sequence complete");
        Ok(responses)
    }
    .instrument(span)
    .await
}
