//! Interactive coordinate picking.
//!
//! While the camera free-runs on the picker channel, the operator steers the
//! stage by hand and marks sites. Commands arrive over an mpsc channel so the
//! session does not care whether they come from a terminal, a GUI or a test.

use crate::registry::PositionRegistry;
use scope_core::capabilities::{ChannelControl, FrameProducer, Microscope};
use scope_core::error::{ScopeError, ScopeResult};
use std::str::FromStr;
use tokio::sync::mpsc;
use tracing::info;

/// Operator input during a picking session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerCommand {
    /// Record the live stage position as a new site
    Add,
    /// Drop the most recently recorded site
    RemoveLast,
    /// End the session
    Exit,
}

impl FromStr for PickerCommand {
    type Err = ScopeError;

    /// Accepts the terminal spellings `a`/space, `d`/backspace and `q`/esc.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // raw key codes arrive untrimmed
        match s.trim_end_matches(['\r', '\n']) {
            " " => return Ok(PickerCommand::Add),
            "\u{8}" => return Ok(PickerCommand::RemoveLast),
            "\u{1b}" => return Ok(PickerCommand::Exit),
            _ => {}
        }
        match s.trim().to_ascii_lowercase().as_str() {
            "a" | "add" | "space" => Ok(PickerCommand::Add),
            "d" | "del" | "remove" | "backspace" => Ok(PickerCommand::RemoveLast),
            "q" | "quit" | "exit" | "esc" => Ok(PickerCommand::Exit),
            other => Err(ScopeError::Configuration(format!(
                "unknown picker command '{}'",
                other
            ))),
        }
    }
}

/// Run a picking session until [`PickerCommand::Exit`] or until every sender
/// is dropped. Continuous acquisition is stopped on the way out, also when a
/// hardware call fails.
pub async fn run_picker_session<H>(
    hw: &H,
    registry: &mut PositionRegistry,
    channel: &str,
    mut commands: mpsc::Receiver<PickerCommand>,
) -> ScopeResult<()>
where
    H: Microscope + ?Sized,
{
    hw.set_channel(channel).await?;
    hw.start_continuous().await?;
    info!(channel, "Coordinate picker started");

    let result = async {
        while let Some(command) = commands.recv().await {
            match command {
                PickerCommand::Add => {
                    registry.record_current(hw).await?;
                }
                PickerCommand::RemoveLast => {
                    registry.discard_most_recent();
                }
                PickerCommand::Exit => break,
            }
            log_sites(registry);
        }
        Ok::<(), ScopeError>(())
    }
    .await;

    hw.stop_continuous().await?;
    info!(sites = registry.len(), "Coordinate picker finished");
    result
}

fn log_sites(registry: &PositionRegistry) {
    info!("--Coords List--");
    for (site, coord) in registry.iter().enumerate() {
        info!(site, "{}", coord);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StageConfig;
    use scope_core::capabilities::XyStage;
    use scope_driver_mock::{HardwareCall, MockMicroscope};

    #[test]
    fn parses_terminal_spellings() {
        assert_eq!("a".parse::<PickerCommand>().unwrap(), PickerCommand::Add);
        assert_eq!(" ".parse::<PickerCommand>().unwrap(), PickerCommand::Add);
        assert_eq!("D\n".parse::<PickerCommand>().unwrap(), PickerCommand::RemoveLast);
        assert_eq!("\u{8}".parse::<PickerCommand>().unwrap(), PickerCommand::RemoveLast);
        assert_eq!("q".parse::<PickerCommand>().unwrap(), PickerCommand::Exit);
        assert_eq!("\u{1b}".parse::<PickerCommand>().unwrap(), PickerCommand::Exit);
        assert!("x".parse::<PickerCommand>().is_err());
    }

    #[tokio::test]
    async fn session_applies_commands_in_order() {
        let hw = MockMicroscope::new();
        let mut registry = PositionRegistry::new(&hw, &StageConfig::default())
            .await
            .unwrap();
        let (tx, rx) = mpsc::channel(8);

        hw.set_xy_position(100.0, 0.0).await.unwrap();
        tx.send(PickerCommand::Add).await.unwrap();
        tx.send(PickerCommand::Add).await.unwrap();
        tx.send(PickerCommand::RemoveLast).await.unwrap();
        tx.send(PickerCommand::Exit).await.unwrap();
        tx.send(PickerCommand::Add).await.unwrap();

        hw.clear_calls().await;
        run_picker_session(&hw, &mut registry, "DIC", rx).await.unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(0).map(|c| c.x), Some(100.0));
        assert_eq!(
            hw.calls().await,
            vec![
                HardwareCall::SetChannel("DIC".into()),
                HardwareCall::StartContinuous,
                HardwareCall::StopContinuous
            ]
        );
    }

    #[tokio::test]
    async fn closed_channel_ends_session() {
        let hw = MockMicroscope::new();
        let mut registry = PositionRegistry::new(&hw, &StageConfig::default())
            .await
            .unwrap();
        let (tx, rx) = mpsc::channel(1);
        drop(tx);

        run_picker_session(&hw, &mut registry, "GFP", rx).await.unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(hw.calls().await.last(), Some(&HardwareCall::StopContinuous));
    }
}
