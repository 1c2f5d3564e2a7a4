use anyhow::Result;
use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Button-panel actions
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UserCommand {
    Screenshot,
    Record,
    ToggleAutoRecord,
    ToggleMirror,
    SetVolume(f32),
    Quit,
}

impl FromStr for UserCommand {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let verb = parts
            .next()
            .ok_or_else(|| anyhow::anyhow!("empty command"))?
            .to_ascii_lowercase();

        let command = match verb.as_str() {
            "s" | "screenshot" => Self::Screenshot,
            "r" | "record" => Self::Record,
            "a" | "auto" => Self::ToggleAutoRecord,
            "m" | "mirror" => Self::ToggleMirror,
            "q" | "quit" => Self::Quit,
            "v" | "volume" => {
                let level = parts
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("volume needs a level between 0 and 1"))?;
                let level: f32 = level
                    .parse()
                    .map_err(|_| anyhow::anyhow!("invalid volume level: {}", level))?;
                Self::SetVolume(level)
            }
            other => return Err(anyhow::anyhow!("unknown command: {}", other)),
        };

        if parts.next().is_some() {
            return Err(anyhow::anyhow!("unexpected arguments in: {}", line.trim()));
        }

        Ok(command)
    }
}

/// Read commands from stdin, one per line
///
/// Sends each parsed command on the channel; unparseable lines are logged and
/// skipped. Returns at end of input or when the receiver is gone.
pub async fn monitor_stdin(tx: mpsc::Sender<UserCommand>) -> Result<()> {
    tracing::info!("Commands: s(creenshot) r(ecord) a(uto) m(irror) v(olume) <0..1> q(uit)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<UserCommand>() {
            Ok(command) => {
                tracing::debug!("Command: {:?}", command);
                if tx.send(command).await.is_err() {
                    break;
                }
            }
            Err(e) => tracing::warn!("{}", e),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_and_long_forms() {
        assert_eq!("s".parse::<UserCommand>().unwrap(), UserCommand::Screenshot);
        assert_eq!("Record".parse::<UserCommand>().unwrap(), UserCommand::Record);
        assert_eq!(" auto ".parse::<UserCommand>().unwrap(), UserCommand::ToggleAutoRecord);
        assert_eq!("m".parse::<UserCommand>().unwrap(), UserCommand::ToggleMirror);
        assert_eq!("quit".parse::<UserCommand>().unwrap(), UserCommand::Quit);
    }

    #[test]
    fn test_volume_level() {
        assert_eq!(
            "v 0.3".parse::<UserCommand>().unwrap(),
            UserCommand::SetVolume(0.3)
        );
        assert!("volume".parse::<UserCommand>().is_err());
        assert!("volume loud".parse::<UserCommand>().is_err());
    }

    #[test]
    fn test_rejects_unknown_and_trailing() {
        assert!("zoom".parse::<UserCommand>().is_err());
        assert!("s now".parse::<UserCommand>().is_err());
        assert!("".parse::<UserCommand>().is_err());
    }
}
