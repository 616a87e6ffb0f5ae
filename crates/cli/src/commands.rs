use std::io::BufRead;
use std::thread;

use crossbeam_channel::{Receiver, Sender};

/// Interactive controls read from stdin while the view is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    FullWindow,
    Mute,
    Resize(u32, u32),
    Quit,
}

pub const HELP: &str = "Commands: f = toggle full window, m = toggle mute, r WxH = resize window, q = quit";

pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    let Some(name) = parts.next() else {
        return Err("empty command".to_string());
    };
    let command = match name {
        "f" | "full" => Command::FullWindow,
        "m" | "mute" => Command::Mute,
        "q" | "quit" => Command::Quit,
        "r" | "resize" => {
            let size = parts.next().ok_or("resize needs a size, e.g. r 1280x720")?;
            let (w, h) = parse_size(size)?;
            Command::Resize(w, h)
        }
        other => return Err(format!("unknown command '{other}'")),
    };
    if parts.next().is_some() {
        return Err(format!("too many arguments for '{name}'"));
    }
    Ok(command)
}

/// Parses `WIDTHxHEIGHT`, both non-zero.
pub fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let w: u32 = w.trim().parse().map_err(|_| format!("invalid width in '{s}'"))?;
    let h: u32 = h.trim().parse().map_err(|_| format!("invalid height in '{s}'"))?;
    if w == 0 || h == 0 {
        return Err(format!("size must be non-zero, got '{s}'"));
    }
    Ok((w, h))
}

/// Reads commands from `input` on a background thread.
///
/// The channel disconnects when input reaches EOF.
pub fn spawn_reader<R>(input: R) -> Receiver<Command>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::spawn(move || read_commands(input, &tx));
    rx
}

fn read_commands<R: BufRead>(input: R, tx: &Sender<Command>) {
    for line in input.lines() {
        let Ok(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Ok(command) => {
                if tx.send(command).is_err() {
                    break;
                }
            }
            Err(e) => log::warn!("{e}. {HELP}"),
        }
    }
}
