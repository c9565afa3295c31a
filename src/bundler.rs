//! Launch the Metro bundler and tail its output into the hub channel.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::io::BufReader;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::BundlerCfg;
use crate::scraper::forward_lines;
use crate::types::Envelope;
use crate::utils::kill_process_tree;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("project path '{0}' is not a directory")]
    NotADirectory(PathBuf),
    #[error("bundler command is empty")]
    EmptyCommand,
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
}

pub struct Bundler {
    child: Child,
}

impl Bundler {
    /// Spawn the bundler in `project` and start one reader task per output stream.
    pub fn launch(
        cfg: &BundlerCfg,
        project: &Path,
        tx: mpsc::Sender<Envelope>,
    ) -> Result<Self, LaunchError> {
        if !project.is_dir() {
            return Err(LaunchError::NotADirectory(project.to_path_buf()));
        }
        let mut cmd = build_command(cfg)?;
        cmd.current_dir(project)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        cmd.process_group(0);
        #[cfg(windows)]
        cmd.creation_flags(0x0000_0200); // CREATE_NEW_PROCESS_GROUP

        info!("Starting Metro in {} (port {})", project.display(), cfg.port);
        let mut child = cmd.spawn().map_err(|source| LaunchError::Spawn {
            program: cfg.command.join(" "),
            source,
        })?;

        if let Some(stdout) = child.stdout.take() {
            let tx = tx.clone();
            tokio::spawn(forward_lines(BufReader::new(stdout), "stdout", tx));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(BufReader::new(stderr), "stderr", tx));
        }

        Ok(Self { child })
    }

    /// Best-effort termination of the bundler and everything it spawned.
    pub fn terminate(&mut self) {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                info!("Metro already exited ({})", status);
                return;
            }
            Ok(None) => {}
            Err(e) => warn!("Could not query Metro status: {}", e),
        }
        let killed_tree = self.child.id().map(kill_process_tree).unwrap_or(false);
        if !killed_tree {
            if let Err(e) = self.child.start_kill() {
                warn!("Failed to kill Metro: {}", e);
                return;
            }
        }
        info!("Metro stopped");
    }
}

/// Program + args, with `--port` appended; wrapped in `cmd /C` on Windows so `npx.cmd` resolves.
fn build_command(cfg: &BundlerCfg) -> Result<Command, LaunchError> {
    let (program, args) = cfg.command.split_first().ok_or(LaunchError::EmptyCommand)?;
    let port = cfg.port.to_string();

    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(program);
        c
    } else {
        Command::new(program)
    };
    cmd.args(args).args(["--port", port.as_str()]);
    Ok(cmd)
}
