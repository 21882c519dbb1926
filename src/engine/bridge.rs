use super::{
    types::{BridgeRequest, BridgeResponse},
    ColorSpace, DocDiag, DocHandle, Engine, FormatOptions, InteractionLevel, RegionEncoding,
    RegionHandle,
};
use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::cell::RefCell;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;
use tracing::{debug, warn};

const CODE_CAPABILITY_UNAVAILABLE: &str = "capability_unavailable";
const CODE_MARKER_UNREADABLE: &str = "marker_unreadable";

/// Talks to a long-lived host bridge process over line-delimited JSON.
///
/// The bridge owns the actual document application; this adapter only maps
/// `Engine` calls to requests and translates the bridge's error codes into
/// typed results.
pub struct BridgeEngine {
    exe: PathBuf,
    io: RefCell<BridgeIo>,
}

struct BridgeIo {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    next_id: u64,
    stderr_thread: Option<JoinHandle<()>>,
}

enum Reply {
    Ok(serde_json::Value),
    Failed { code: Option<String>, error: String },
}

impl BridgeEngine {
    pub fn new(cfg: &Config) -> Result<Self> {
        let exe = resolve_bridge_exe(&cfg.engine.bridge_exe)?;
        let mut cmd = Command::new(&exe);
        cmd.args(&cfg.engine.bridge_args);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        for (k, v) in &cfg.engine.env {
            cmd.env(k, v);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning engine bridge: {}", exe.display()))?;
        let stdin = child.stdin.take().ok_or_else(|| anyhow!("no stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| anyhow!("no stdout"))?;

        // Drain stderr continuously so a chatty bridge can't block on a full pipe.
        let stderr_thread = child.stderr.take().map(|stderr| {
            std::thread::spawn(move || {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    debug!(target: "vecdoc_refresh::bridge", "stderr: {}", line.trim_end());
                }
            })
        });

        debug!("engine bridge started: {}", exe.display());
        Ok(Self {
            exe,
            io: RefCell::new(BridgeIo {
                child,
                stdin,
                stdout: BufReader::new(stdout),
                next_id: 1,
                stderr_thread,
            }),
        })
    }

    fn request(&self, cmd: &str, args: serde_json::Value) -> Result<Reply> {
        let mut io = self.io.borrow_mut();
        let id = io.next_id;
        io.next_id += 1;

        let req = BridgeRequest { id, cmd, args };
        let mut line = serde_json::to_string(&req)?;
        line.push('\n');
        debug!("bridge -> {}", line.trim_end());
        io.stdin
            .write_all(line.as_bytes())
            .with_context(|| format!("writing to engine bridge: {}", self.exe.display()))?;
        io.stdin.flush().ok();

        let mut raw = String::new();
        let n = io
            .stdout
            .read_line(&mut raw)
            .with_context(|| format!("reading from engine bridge: {}", self.exe.display()))?;
        if n == 0 {
            return Err(anyhow!("engine bridge closed its output: {}", self.exe.display()));
        }
        debug!("bridge <- {}", raw.trim_end());

        let resp: BridgeResponse = serde_json::from_str(&raw)
            .with_context(|| format!("parsing bridge response to `{cmd}`"))?;
        if resp.id != id {
            return Err(anyhow!(
                "bridge response id mismatch for `{cmd}`: expected {id}, got {}",
                resp.id
            ));
        }

        if resp.ok {
            Ok(Reply::Ok(resp.result))
        } else {
            Ok(Reply::Failed {
                code: resp.code,
                error: resp.error.unwrap_or_else(|| format!("{cmd} failed")),
            })
        }
    }

    fn call<O: DeserializeOwned>(&self, cmd: &str, args: serde_json::Value) -> Result<O> {
        match self.request(cmd, args)? {
            Reply::Ok(value) => serde_json::from_value(value)
                .with_context(|| format!("decoding result of `{cmd}`")),
            Reply::Failed { error, .. } => Err(anyhow!("{cmd}: {error}")),
        }
    }
}

impl Drop for BridgeEngine {
    fn drop(&mut self) {
        let quit = self.request("quit", json!({}));
        let io = self.io.get_mut();
        if let Err(err) = quit {
            debug!("bridge quit request failed: {err:#}");
            let _ = io.child.kill();
        }
        match io.child.wait() {
            Ok(status) if !status.success() => warn!("engine bridge exited with {status}"),
            Ok(_) => {}
            Err(err) => warn!("waiting for engine bridge: {err}"),
        }
        if let Some(handle) = io.stderr_thread.take() {
            let _ = handle.join();
        }
    }
}

impl Engine for BridgeEngine {
    fn doctor(&self) -> Result<DocDiag> {
        self.call("doctor", json!({}))
    }

    fn open(&self, path: &Path) -> Result<DocHandle> {
        let id: u64 = self.call("open", json!({ "path": path }))?;
        Ok(DocHandle::new(id))
    }

    fn close(&self, doc: DocHandle, discard_unsaved: bool) -> Result<()> {
        self.call::<serde_json::Value>(
            "close",
            json!({ "doc": doc.id(), "discard_unsaved": discard_unsaved }),
        )?;
        Ok(())
    }

    fn color_space(&self, doc: &DocHandle) -> Result<ColorSpace> {
        self.call("color_space", json!({ "doc": doc.id() }))
    }

    fn legacy_text_count(&self, doc: &DocHandle) -> Result<Option<u32>> {
        match self.request("legacy_text_count", json!({ "doc": doc.id() }))? {
            Reply::Ok(value) => Ok(Some(
                serde_json::from_value(value).with_context(|| "decoding legacy_text_count")?,
            )),
            Reply::Failed { code, error } => {
                if code.as_deref() != Some(CODE_CAPABILITY_UNAVAILABLE) {
                    debug!("legacy_text_count unanswered ({error}), treating as unavailable");
                }
                Ok(None)
            }
        }
    }

    fn text_regions(&self, doc: &DocHandle) -> Result<Vec<RegionHandle>> {
        let count: u32 = self.call("text_region_count", json!({ "doc": doc.id() }))?;
        Ok((0..count)
            .map(|index| RegionHandle {
                doc: doc.id(),
                index,
            })
            .collect())
    }

    fn probe_region(&self, region: RegionHandle) -> Result<RegionEncoding> {
        // The host only signals legacy text by failing to read the marker property,
        // so any failed read counts as legacy.
        match self.request(
            "read_marker",
            json!({ "doc": region.doc, "region": region.index }),
        )? {
            Reply::Ok(_) => Ok(RegionEncoding::Current),
            Reply::Failed { code, error } => {
                if code.as_deref() != Some(CODE_MARKER_UNREADABLE) {
                    debug!("read_marker failed on region {}: {error}", region.index);
                }
                Ok(RegionEncoding::Legacy)
            }
        }
    }

    fn region_contents(&self, region: RegionHandle) -> Result<String> {
        self.call(
            "region_contents",
            json!({ "doc": region.doc, "region": region.index }),
        )
    }

    fn rewrite_region_contents(&self, region: RegionHandle, content: &str) -> Result<()> {
        self.call::<serde_json::Value>(
            "rewrite_region",
            json!({ "doc": region.doc, "region": region.index, "content": content }),
        )?;
        Ok(())
    }

    fn save_in_place(&self, doc: &DocHandle) -> Result<()> {
        self.call::<serde_json::Value>("save", json!({ "doc": doc.id() }))?;
        Ok(())
    }

    fn save_as(&self, doc: &DocHandle, path: &Path, options: &FormatOptions) -> Result<()> {
        self.call::<serde_json::Value>(
            "save_as",
            json!({ "doc": doc.id(), "path": path, "options": options }),
        )?;
        Ok(())
    }

    fn interaction_level(&self) -> Result<InteractionLevel> {
        self.call("interaction_level", json!({}))
    }

    fn set_interaction_level(&self, level: InteractionLevel) -> Result<()> {
        self.call::<serde_json::Value>("set_interaction_level", json!({ "level": level }))?;
        Ok(())
    }
}

fn resolve_bridge_exe(raw: &str) -> Result<PathBuf> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("auto") {
        if let Ok(env_val) = std::env::var("VECDOC_BRIDGE") {
            let p = expand_tilde(&env_val);
            if p.exists() {
                return Ok(p);
            }
        }
        return Err(anyhow!(
            "engine.bridge_exe is `auto` and VECDOC_BRIDGE does not point to an executable"
        ));
    }
    Ok(expand_tilde(raw))
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}
