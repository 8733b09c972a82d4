use std::io::{self, BufRead, Write};

use metronome_core::{Result, Session};

/// One line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Toggle,
    Tempo(u32),
    Volume(u32),
    Play(String),
    Notes,
    Status,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> std::result::Result<Self, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err("empty command".to_string());
        };
        let arg = words.next();

        let number = |name: &str| -> std::result::Result<u32, String> {
            arg.ok_or_else(|| format!("`{name}` needs a value"))?
                .parse()
                .map_err(|_| format!("`{name}` expects a whole number"))
        };

        match verb.to_ascii_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "toggle" | "t" => Ok(Self::Toggle),
            "tempo" | "bpm" => number("tempo").map(Self::Tempo),
            "volume" | "vol" => number("volume").map(Self::Volume),
            "play" | "p" => arg
                .map(|note| Self::Play(note.to_string()))
                .ok_or_else(|| "`play` needs a note name".to_string()),
            "notes" => Ok(Self::Notes),
            "status" => Ok(Self::Status),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(format!("unknown command `{other}`")),
        }
    }
}

const HELP: &str = "commands: start | stop | toggle | tempo <bpm> | volume <0-100> \
                    | play <note> | notes | status | quit";

/// Reads commands from stdin until `quit` or end of input.
pub fn run(session: &mut Session) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    println!("{HELP}");
    print_status(session);

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        if command == Command::Quit {
            break;
        }
        execute(session, command);
        stdout.flush()?;
    }

    session.stop();
    Ok(())
}

fn execute(session: &mut Session, command: Command) {
    let outcome = match command {
        Command::Start => session.start(),
        Command::Stop => {
            session.stop();
            Ok(())
        }
        Command::Toggle => session.toggle().map(|_| ()),
        Command::Tempo(bpm) => session.set_tempo(bpm),
        Command::Volume(volume) => session.set_volume(volume),
        Command::Play(note) => session
            .play_note(&note)
            .map(|rate| println!("{note} at rate {rate:.5}")),
        Command::Notes => {
            for set in session.tuning_sets() {
                println!("{:<10} {}", set.name, set.notes.join(" "));
            }
            Ok(())
        }
        Command::Help => {
            println!("{HELP}");
            Ok(())
        }
        Command::Status | Command::Quit => Ok(()),
    };

    if let Err(err) = outcome {
        println!("error: {err}");
    }
    print_status(session);
}

fn print_status(session: &Session) {
    let status = match session.status() {
        Ok(status) => status,
        Err(err) => {
            println!("error: {err}");
            return;
        }
    };
    println!(
        "[{}] {} | tempo {} | volume {:.1} | {}",
        if status.running { "running" } else { "stopped" },
        status.toggle_label,
        status.tempo_bpm,
        status.volume_display,
        status.ready_label,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(Command::parse("tempo 96"), Ok(Command::Tempo(96)));
        assert_eq!(Command::parse("  VOL 40 "), Ok(Command::Volume(40)));
        assert_eq!(Command::parse("play Eb2"), Ok(Command::Play("Eb2".to_string())));
        assert_eq!(Command::parse("t"), Ok(Command::Toggle));
        assert_eq!(Command::parse("quit"), Ok(Command::Quit));
    }

    #[test]
    fn reports_bad_input() {
        assert!(Command::parse("tempo").unwrap_err().contains("needs a value"));
        assert!(Command::parse("tempo fast").unwrap_err().contains("whole number"));
        assert!(Command::parse("play").is_err());
        assert!(Command::parse("dance").unwrap_err().contains("dance"));
    }
}
