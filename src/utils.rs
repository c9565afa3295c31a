//! Small platform helpers.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::warn;

/// Open `url` in the default browser. Best effort.
pub fn open_in_browser(url: &str) {
    let mut cmd = if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", "", url]);
        c
    } else if cfg!(target_os = "macos") {
        let mut c = Command::new("open");
        c.arg(url);
        c
    } else {
        let mut c = Command::new("xdg-open");
        c.arg(url);
        c
    };
    let spawned = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    if let Err(e) = spawned {
        warn!("Could not open browser ({}); visit {} manually", e, url);
    }
}

/// Kill the process group / tree rooted at `pid`. Returns whether the kill command ran.
pub fn kill_process_tree(pid: u32) -> bool {
    let status = if cfg!(target_os = "windows") {
        Command::new("taskkill")
            .args(["/F", "/T", "/PID", &pid.to_string()])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
    } else {
        // Child was spawned as its own group leader, so -pid addresses the whole group.
        Command::new("kill")
            .args(["-TERM", "--", &format!("-{pid}")])
            .stderr(Stdio::null())
            .status()
    };
    matches!(status, Ok(s) if s.success())
}

/// Ask for the project root until a non-empty line is entered.
pub fn prompt_project_path<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> io::Result<PathBuf> {
    loop {
        write!(out, "Enter the absolute path of your React Native project root: ")?;
        out.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no project path entered"));
        }
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }
}
