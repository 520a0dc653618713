#![forbid(unsafe_code)]

//! Drive an OTP box from stdin, one command per line.
//!
//! ```text
//! $ printf 'copy Your code is 482913\ncheck\naccept\nwait 100\nshow\n' | otpbox-demo
//! ```

use std::io::{self, BufRead, Write};
#[cfg(feature = "config")]
use std::path::PathBuf;

use clap::Parser;
use otpbox::script::{Command, ScriptError, Session};
use otpbox::{MemoryClipboard, NoClipboard, OtpBoxConfig};

#[derive(Debug, Parser)]
#[command(
    name = "otpbox-demo",
    about = "Segmented OTP entry driven by line commands on stdin",
    version
)]
struct Args {
    /// Number of digit cells.
    #[arg(long, default_value_t = 6)]
    length: usize,

    /// Treat an empty value as invalid once touched.
    #[arg(long)]
    required: bool,

    /// Turn off clipboard detection.
    #[arg(long)]
    no_clipboard: bool,

    /// Read the operating system clipboard instead of an in-memory one.
    #[cfg(feature = "system-clipboard")]
    #[arg(long)]
    system_clipboard: bool,

    /// Load widget settings from a TOML file.
    #[cfg(feature = "config")]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Initial in-memory clipboard text.
    #[arg(long)]
    clipboard_text: Option<String>,

    /// Log filter used when OTPBOX_LOG is unset.
    #[arg(long, default_value = "warn")]
    log: String,
}

impl Args {
    fn widget_config(&self) -> otpbox::Result<OtpBoxConfig> {
        #[cfg(feature = "config")]
        let base = match &self.config {
            Some(path) => OtpBoxConfig::from_toml_file(path)?,
            None => OtpBoxConfig::new().with_length(self.length),
        };
        #[cfg(not(feature = "config"))]
        let base = OtpBoxConfig::new().with_length(self.length);

        let mut config = base;
        if self.required {
            config = config.with_required(true);
        }
        if self.no_clipboard {
            config = config.with_clipboard_detection(false);
        }
        Ok(config)
    }

    fn session(&self) -> otpbox::Result<Session> {
        let config = self.widget_config()?;
        #[cfg(feature = "system-clipboard")]
        if self.system_clipboard {
            return Session::with_clipboard(config, Box::new(otpbox::SystemClipboard));
        }
        if self.no_clipboard && self.clipboard_text.is_none() {
            return Session::with_clipboard(config, Box::new(NoClipboard));
        }
        let clipboard = match &self.clipboard_text {
            Some(text) => MemoryClipboard::with_text(text.clone()),
            None => MemoryClipboard::new(),
        };
        Session::with_memory_clipboard(config, clipboard)
    }
}

fn print_lines(out: &mut impl Write, lines: &[String]) -> io::Result<()> {
    for line in lines {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn run(args: &Args) -> otpbox::Result<()> {
    otpbox::logging::init(&args.log);
    let mut session = args.session()?;
    let stdin = io::stdin();
    let mut out = io::stdout().lock();

    print_lines(&mut out, &session.render())?;
    for line in stdin.lock().lines() {
        let line = line?;
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(ScriptError::Empty) => continue,
            Err(err) => {
                tracing::warn!(error = %err, %line, "ignoring unparsable command");
                writeln!(out, "error: {err}")?;
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        let events = session.apply(command);
        print_lines(&mut out, &events)?;
        print_lines(&mut out, &session.render())?;
    }
    session.teardown();
    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(error) = run(&args) {
        eprintln!("{error}");
        std::process::exit(1);
    }
}
