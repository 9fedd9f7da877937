//! Node Configuration
//!
//! Static per-node settings, parsed once at startup from command line flags
//! with environment fallbacks for operational tunables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Unique node name within the cluster; also keys the persisted files.
    pub name: String,
    /// Address the HTTP and replication endpoint listens on.
    pub listen_addr: SocketAddr,
    /// `host:port` replication endpoints of every peer.
    pub peers: Vec<String>,
    /// Whether the front door admits writes directly. Engine semantics are
    /// identical either way.
    pub leader: bool,
    /// Directory for the transaction log and checkpoint files.
    pub data_dir: PathBuf,
    /// Periodic checkpoint interval, from `CHECKPOINT_INTERVAL_SECS`.
    pub checkpoint_interval: Option<Duration>,
}

impl Config {
    /// Parses `--name`, `--listen`, `--peer` (repeatable), `--leader` and
    /// `--data-dir`.
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut name = None;
        let mut listen_addr = None;
        let mut peers = Vec::new();
        let mut leader = false;
        let mut data_dir = PathBuf::from(".");

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--name" => {
                    name = Some(flag_value(args, i, "--name")?.to_string());
                    i += 2;
                }
                "--listen" => {
                    listen_addr = Some(
                        flag_value(args, i, "--listen")?
                            .parse()
                            .context("--listen must be addr:port")?,
                    );
                    i += 2;
                }
                "--peer" => {
                    peers.push(flag_value(args, i, "--peer")?.to_string());
                    i += 2;
                }
                "--leader" => {
                    leader = true;
                    i += 1;
                }
                "--data-dir" => {
                    data_dir = PathBuf::from(flag_value(args, i, "--data-dir")?);
                    i += 2;
                }
                other => bail!("unknown argument: {}", other),
            }
        }

        let checkpoint_interval = std::env::var("CHECKPOINT_INTERVAL_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Ok(Self {
            name: name.context("--name is required")?,
            listen_addr: listen_addr.context("--listen is required")?,
            peers,
            leader,
            data_dir,
            checkpoint_interval,
        })
    }
}

fn flag_value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str> {
    args.get(i + 1)
        .map(String::as_str)
        .with_context(|| format!("{} needs a value", flag))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_full_flag_set() {
        let config = Config::from_args(&args(&[
            "--name",
            "node1",
            "--listen",
            "127.0.0.1:8080",
            "--peer",
            "127.0.0.1:8081",
            "--peer",
            "127.0.0.1:8082",
            "--leader",
            "--data-dir",
            "/tmp/geostore",
        ]))
        .unwrap();

        assert_eq!(config.name, "node1");
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.peers.len(), 2);
        assert!(config.leader);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/geostore"));
    }

    #[test]
    fn name_and_listen_are_required() {
        assert!(Config::from_args(&args(&["--name", "node1"])).is_err());
        assert!(Config::from_args(&args(&["--listen", "127.0.0.1:8080"])).is_err());
    }

    #[test]
    fn rejects_unknown_flags() {
        let result = Config::from_args(&args(&[
            "--name",
            "node1",
            "--listen",
            "127.0.0.1:8080",
            "--verbose",
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn defaults_without_peers() {
        let config =
            Config::from_args(&args(&["--name", "node1", "--listen", "127.0.0.1:8080"])).unwrap();
        assert!(config.peers.is_empty());
        assert!(!config.leader);
        assert_eq!(config.data_dir, PathBuf::from("."));
    }
}
