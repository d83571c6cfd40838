//! Text command surface: parsing chat messages into [`Command`]s and running
//! them against a guild's session.

pub mod dispatch;
pub mod error;

pub use dispatch::dispatch;
pub use error::CommandError;

/// One parsed chat command. Each maps to exactly one session operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join,
    Play(String),
    Pause,
    Resume,
    Stop,
    Skip,
    Queue,
    NowPlaying,
    /// `None` toggles.
    Loop(Option<bool>),
    Volume(i32),
    Leave,
}

impl Command {
    /// Parses `text` if it starts with `prefix`.
    ///
    /// Command names are case-insensitive; everything after the name is the
    /// argument, with surrounding whitespace trimmed.
    pub fn parse(prefix: &str, text: &str) -> Result<Self, CommandError> {
        let body = text
            .trim_start()
            .strip_prefix(prefix)
            .ok_or(CommandError::NotACommand)?;

        let (name, args) = match body.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (body.trim_end(), ""),
        };
        if name.is_empty() {
            return Err(CommandError::NotACommand);
        }

        let command = match name.to_lowercase().as_str() {
            "join" | "connect" => Self::Join,
            "play" | "p" => {
                if args.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: "play",
                        expected: "a URL or search terms",
                    });
                }
                Self::Play(args.to_string())
            }
            "pause" => Self::Pause,
            "resume" | "continue" => Self::Resume,
            "stop" => Self::Stop,
            "skip" | "next" => Self::Skip,
            "queue" | "q" => Self::Queue,
            "nowplaying" | "np" => Self::NowPlaying,
            "loop" => Self::Loop(parse_switch(args)?),
            "volume" | "vol" => {
                if args.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: "volume",
                        expected: "a number from 0 to 100",
                    });
                }
                let percent = args.parse::<i32>().map_err(|_| CommandError::BadArgument {
                    command: "volume",
                    value: args.to_string(),
                    expected: "a number from 0 to 100",
                })?;
                Self::Volume(percent)
            }
            "leave" | "disconnect" => Self::Leave,
            other => return Err(CommandError::UnknownCommand(other.to_string())),
        };

        Ok(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::Play(_) => "play",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
            Self::Skip => "skip",
            Self::Queue => "queue",
            Self::NowPlaying => "nowplaying",
            Self::Loop(_) => "loop",
            Self::Volume(_) => "volume",
            Self::Leave => "leave",
        }
    }
}

fn parse_switch(arg: &str) -> Result<Option<bool>, CommandError> {
    match arg.to_lowercase().as_str() {
        "" => Ok(None),
        "on" | "true" | "enable" => Ok(Some(true)),
        "off" | "false" | "disable" => Ok(Some(false)),
        _ => Err(CommandError::BadArgument {
            command: "loop",
            value: arg.to_string(),
            expected: "on or off",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_map_to_the_same_command() {
        let pairs = [
            ("!connect", Command::Join),
            ("!p lofi", Command::Play("lofi".into())),
            ("!continue", Command::Resume),
            ("!next", Command::Skip),
            ("!q", Command::Queue),
            ("!np", Command::NowPlaying),
            ("!vol 30", Command::Volume(30)),
            ("!disconnect", Command::Leave),
        ];
        for (text, expected) in pairs {
            assert_eq!(Command::parse("!", text).unwrap(), expected, "{text}");
        }
    }

    #[test]
    fn play_keeps_the_whole_query() {
        assert_eq!(
            Command::parse("!", "  !PLAY   daft punk  one more time ").unwrap(),
            Command::Play("daft punk  one more time".into())
        );
    }

    #[test]
    fn messages_without_prefix_are_ignored() {
        assert!(matches!(
            Command::parse("!", "play something"),
            Err(CommandError::NotACommand)
        ));
        assert!(matches!(Command::parse("!", "!"), Err(CommandError::NotACommand)));
        assert!(matches!(
            Command::parse("!", "! play"),
            Err(CommandError::NotACommand)
        ));
    }

    #[test]
    fn missing_and_bad_arguments() {
        assert!(matches!(
            Command::parse("!", "!play"),
            Err(CommandError::MissingArgument { command: "play", .. })
        ));
        assert!(matches!(
            Command::parse("!", "!volume"),
            Err(CommandError::MissingArgument { command: "volume", .. })
        ));
        assert!(matches!(
            Command::parse("!", "!volume loud"),
            Err(CommandError::BadArgument { command: "volume", .. })
        ));
        assert!(matches!(
            Command::parse("!", "!loop sometimes"),
            Err(CommandError::BadArgument { command: "loop", .. })
        ));
    }

    #[test]
    fn out_of_range_volume_still_parses() {
        assert_eq!(Command::parse("!", "!volume 150").unwrap(), Command::Volume(150));
        assert_eq!(Command::parse("!", "!volume -1").unwrap(), Command::Volume(-1));
    }

    #[test]
    fn loop_switch() {
        assert_eq!(Command::parse("!", "!loop").unwrap(), Command::Loop(None));
        assert_eq!(Command::parse("!", "!loop ON").unwrap(), Command::Loop(Some(true)));
        assert_eq!(Command::parse("!", "!loop off").unwrap(), Command::Loop(Some(false)));
    }

    #[test]
    fn unknown_commands_are_reported() {
        match Command::parse("?", "?shuffle") {
            Err(CommandError::UnknownCommand(name)) => assert_eq!(name, "shuffle"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
