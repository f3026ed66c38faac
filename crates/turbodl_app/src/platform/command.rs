//! Parsing of the interactive command line.

use thiserror::Error;
use turbodl_core::{QualityPreset, UnknownQualityPreset};

pub const HELP: &str = "\
Commands:
  analyze <url>                    scan a page for downloadable videos
  download <video#> <format#>      download a format of an analyzed video
  images <url>                     scrape images from a page
  scripts <url>                    scrape scripts from a page
  clip <url>                       download a clip
  convert <path> [preset]          convert a file (high, medium, fast, ultrafast)
  status                           show connection and job state
  log                              print the whole event log
  videos                           list analyzed videos and formats
  help                             show this help
  quit                             exit";

/// A parsed user command. Video and format numbers are zero-based here.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Analyze { url: String },
    Download { video: usize, format: usize },
    Images { url: String },
    Scripts { url: String },
    Clip { url: String },
    Convert { path: String, quality: QualityPreset },
    Status,
    Log,
    Videos,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandParseError {
    #[error("unknown command '{0}' (type 'help')")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("'{0}' is not a number from the list")]
    BadNumber(String),
    #[error(transparent)]
    Quality(#[from] UnknownQualityPreset),
}

/// Parse one input line. Blank lines parse to `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "analyze" => Command::Analyze {
            url: required(rest, "analyze <url>")?,
        },
        "download" => {
            let mut numbers = rest.split_whitespace();
            let (Some(video), Some(format), None) =
                (numbers.next(), numbers.next(), numbers.next())
            else {
                return Err(CommandParseError::Usage("download <video#> <format#>"));
            };
            Command::Download {
                video: list_number(video)?,
                format: list_number(format)?,
            }
        }
        "images" => Command::Images {
            url: required(rest, "images <url>")?,
        },
        "scripts" => Command::Scripts {
            url: required(rest, "scripts <url>")?,
        },
        "clip" => Command::Clip {
            url: required(rest, "clip <url>")?,
        },
        "convert" => parse_convert(rest)?,
        "status" => Command::Status,
        "log" => Command::Log,
        "videos" => Command::Videos,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(CommandParseError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn required(rest: &str, usage: &'static str) -> Result<String, CommandParseError> {
    if rest.is_empty() {
        return Err(CommandParseError::Usage(usage));
    }
    Ok(rest.to_string())
}

/// Lists are shown one-based.
fn list_number(raw: &str) -> Result<usize, CommandParseError> {
    match raw.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(CommandParseError::BadNumber(raw.to_string())),
    }
}

/// `convert <path> [preset]`. The path may be quoted, and may contain spaces
/// when it is. An unquoted trailing word is a preset only if it names one.
fn parse_convert(rest: &str) -> Result<Command, CommandParseError> {
    const USAGE: &str = "convert <path> [high|medium|fast|ultrafast]";
    if rest.is_empty() {
        return Err(CommandParseError::Usage(USAGE));
    }

    let (path, tail) = match rest.chars().next() {
        Some(quote @ ('"' | '\'')) => {
            let inner = &rest[1..];
            match inner.find(quote) {
                Some(end) => (inner[..end].to_string(), inner[end + 1..].trim()),
                None => (inner.to_string(), ""),
            }
        }
        _ => match rest.rsplit_once(char::is_whitespace) {
            Some((head, last)) if last.parse::<QualityPreset>().is_ok() => {
                (head.trim().to_string(), last)
            }
            _ => (rest.to_string(), ""),
        },
    };

    if path.is_empty() {
        return Err(CommandParseError::Usage(USAGE));
    }
    let quality = if tail.is_empty() {
        QualityPreset::default()
    } else {
        tail.parse()?
    };
    Ok(Command::Convert { path, quality })
}
