//! Playwright page driver
//!
//! Spawns a long-lived `node` subprocess running an embedded Playwright
//! script and speaks a line-delimited JSON command protocol to it. The
//! driver opens one browser page at startup; every command operates on
//! that page, so state (navigation, theme, open dropdowns) carries over
//! between commands exactly as it would for a human in one tab.

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use crate::error::{SmokeError, SmokeResult};

/// Extra time allowed for a response to cross the pipe after the
/// in-page operation itself has timed out.
const IO_SLACK: Duration = Duration::from_secs(10);

const QUIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the browser page owned by the driver subprocess
pub struct PageDriver {
    child: Child,
    io: Mutex<Option<DriverIo>>,
    default_timeout: Duration,
    // Keeps the staged driver script alive for the subprocess lifetime.
    _script_dir: TempDir,
}

struct DriverIo {
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

#[derive(Debug, Clone, Copy, Default)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl PageDriver {
    /// Spawn the driver subprocess and wait for its greeting
    pub async fn spawn(config: &DriverConfig) -> SmokeResult<Self> {
        Self::check_playwright_installed()?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("driver.js");
        std::fs::write(&script_path, DRIVER_JS)?;

        let mut cmd = TokioCommand::new("node");
        cmd.arg(&script_path)
            .env("SMOKE_BROWSER", config.browser.as_str())
            .env("SMOKE_HEADLESS", if config.headless { "1" } else { "0" })
            .env("SMOKE_VIEWPORT_WIDTH", config.viewport_width.to_string())
            .env("SMOKE_VIEWPORT_HEIGHT", config.viewport_height.to_string())
            .env(
                "SMOKE_DEFAULT_TIMEOUT_MS",
                config.default_timeout.as_millis().to_string(),
            )
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        // The script is staged in a temp dir, so node will not find a
        // project-local Playwright install on its own.
        if let Ok(cwd) = std::env::current_dir() {
            let node_modules = cwd.join("node_modules");
            if node_modules.is_dir() {
                cmd.env("NODE_PATH", node_modules);
            }
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| SmokeError::Driver(format!("failed to spawn node: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SmokeError::Driver("driver stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SmokeError::Driver("driver stdout unavailable".to_string()))?;
        let mut stdout = BufReader::new(stdout);

        // Read greeting
        let mut line = String::new();
        let read = tokio::time::timeout(config.startup_timeout, stdout.read_line(&mut line))
            .await
            .map_err(|_| {
                SmokeError::Timeout(format!(
                    "driver greeting after {:?}",
                    config.startup_timeout
                ))
            })??;
        if read == 0 {
            return Err(SmokeError::Driver(
                "driver exited before greeting".to_string(),
            ));
        }
        trace!("driver greeting: {}", line.trim());

        let greeting: DriverGreeting = serde_json::from_str(&line)
            .map_err(|e| SmokeError::Driver(format!("invalid greeting: {}", e)))?;
        let info = greeting
            .driver
            .ok_or_else(|| SmokeError::Driver("invalid driver greeting".to_string()))?;
        debug!("Page driver ready ({})", info.browser);

        Ok(Self {
            child,
            io: Mutex::new(Some(DriverIo { stdin, stdout })),
            default_timeout: config.default_timeout,
            _script_dir: script_dir,
        })
    }

    /// Check that Playwright is installed
    fn check_playwright_installed() -> SmokeResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(SmokeError::PlaywrightNotFound),
        }
    }

    /// Execute a driver command and decode its return value
    async fn execute<A: Serialize, R: DeserializeOwned>(
        &self,
        command: &str,
        arguments: Option<A>,
        deadline: Duration,
    ) -> SmokeResult<R> {
        let mut guard = self.io.lock().await;
        let io = guard
            .as_mut()
            .ok_or_else(|| SmokeError::Driver("driver not connected".to_string()))?;

        let cmd = DriverCommand {
            execute: command.to_string(),
            arguments,
        };
        let cmd_str = serde_json::to_string(&cmd)?;
        trace!("driver command: {}", cmd_str);

        io.stdin.write_all(cmd_str.as_bytes()).await?;
        io.stdin.write_all(b"\n").await?;
        io.stdin.flush().await?;

        let mut line = String::new();
        let read = tokio::time::timeout(deadline, io.stdout.read_line(&mut line))
            .await
            .map_err(|_| SmokeError::Timeout(format!("{} after {:?}", command, deadline)))??;
        if read == 0 {
            *guard = None;
            return Err(SmokeError::Driver("driver closed its stdout".to_string()));
        }
        trace!("driver response: {}", line.trim());

        let response: DriverResponse<R> = serde_json::from_str(&line)
            .map_err(|e| SmokeError::Driver(format!("invalid response: {}", e)))?;

        if let Some(fault) = response.error {
            return Err(SmokeError::Driver(fault.message));
        }

        response
            .result
            .ok_or_else(|| SmokeError::Driver("no return value".to_string()))
    }

    /// Execute a command with no meaningful return value
    async fn execute_void<A: Serialize>(
        &self,
        command: &str,
        arguments: Option<A>,
        deadline: Duration,
    ) -> SmokeResult<()> {
        let _: serde_json::Value = self.execute(command, arguments, deadline).await?;
        Ok(())
    }

    fn default_deadline(&self) -> Duration {
        self.default_timeout + IO_SLACK
    }

    /// Navigate the page
    pub async fn goto(
        &self,
        url: &str,
        wait_until: Option<&str>,
        timeout: Duration,
    ) -> SmokeResult<()> {
        #[derive(Serialize)]
        struct Args<'a> {
            url: &'a str,
            timeout_ms: u64,
            #[serde(skip_serializing_if = "Option::is_none")]
            wait_until: Option<&'a str>,
        }

        self.execute_void(
            "goto",
            Some(Args {
                url,
                timeout_ms: timeout.as_millis() as u64,
                wait_until,
            }),
            timeout + IO_SLACK,
        )
        .await
    }

    /// Block until the page reaches a load state (e.g. `networkidle`)
    pub async fn wait_for_load(&self, state: &str, timeout: Duration) -> SmokeResult<()> {
        #[derive(Serialize)]
        struct Args<'a> {
            state: &'a str,
            timeout_ms: u64,
        }

        self.execute_void(
            "wait-load",
            Some(Args {
                state,
                timeout_ms: timeout.as_millis() as u64,
            }),
            timeout + IO_SLACK,
        )
        .await
    }

    /// Whether the first element matching the selector is visible
    pub async fn is_visible(&self, selector: &str) -> SmokeResult<bool> {
        #[derive(Serialize)]
        struct Args<'a> {
            selector: &'a str,
        }

        self.execute("is-visible", Some(Args { selector }), self.default_deadline())
            .await
    }

    /// Number of elements matching the selector
    pub async fn count(&self, selector: &str) -> SmokeResult<usize> {
        #[derive(Serialize)]
        struct Args<'a> {
            selector: &'a str,
        }

        self.execute("count", Some(Args { selector }), self.default_deadline())
            .await
    }

    /// Read an attribute from the first matching element (None if absent)
    pub async fn get_attribute(&self, selector: &str, name: &str) -> SmokeResult<Option<String>> {
        #[derive(Serialize)]
        struct Args<'a> {
            selector: &'a str,
            name: &'a str,
        }

        #[derive(Deserialize)]
        struct Return {
            value: Option<String>,
        }

        let ret: Return = self
            .execute(
                "get-attribute",
                Some(Args { selector, name }),
                self.default_deadline(),
            )
            .await?;
        Ok(ret.value)
    }

    /// Click the first element matching the selector
    pub async fn click(&self, selector: &str, timeout: Duration) -> SmokeResult<()> {
        #[derive(Serialize)]
        struct Args<'a> {
            selector: &'a str,
            timeout_ms: u64,
        }

        self.execute_void(
            "click",
            Some(Args {
                selector,
                timeout_ms: timeout.as_millis() as u64,
            }),
            timeout + IO_SLACK,
        )
        .await
    }

    /// Click at a fixed position within the first matching element
    pub async fn click_at(&self, selector: &str, x: u32, y: u32) -> SmokeResult<()> {
        #[derive(Serialize)]
        struct Args<'a> {
            selector: &'a str,
            x: u32,
            y: u32,
        }

        self.execute_void(
            "click-at",
            Some(Args { selector, x, y }),
            self.default_deadline(),
        )
        .await
    }

    /// Capture a screenshot of the page
    pub async fn screenshot(&self, path: &Path, full_page: bool) -> SmokeResult<()> {
        #[derive(Serialize)]
        struct Args {
            path: String,
            full_page: bool,
        }

        self.execute_void(
            "screenshot",
            Some(Args {
                path: path.to_string_lossy().into_owned(),
                full_page,
            }),
            self.default_deadline(),
        )
        .await
    }

    /// Shut the driver down, escalating from `quit` to SIGTERM to kill
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.execute_void("quit", None::<()>, QUIT_TIMEOUT).await {
            debug!("quit command failed: {}", e);
        }
        self.io.lock().await.take();

        if let Ok(Ok(status)) = tokio::time::timeout(QUIT_TIMEOUT, self.child.wait()).await {
            debug!("driver exited: {}", status);
            return;
        }

        #[cfg(unix)]
        if let Some(pid) = self.child.id() {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
                && tokio::time::timeout(Duration::from_millis(500), self.child.wait())
                    .await
                    .is_ok()
            {
                return;
            }
        }

        warn!("Force-killing page driver");
        let _ = self.child.kill().await;
    }
}

/// Configuration for the page driver
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Browser engine to launch
    pub browser: Browser,

    /// Run without a visible window
    pub headless: bool,

    /// Viewport dimensions
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Default timeout applied to every in-page operation
    pub default_timeout: Duration,

    /// Timeout for browser launch and the driver greeting
    pub startup_timeout: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            default_timeout: Duration::from_secs(120),
            startup_timeout: Duration::from_secs(30),
        }
    }
}

// Driver protocol types
#[derive(Debug, Serialize)]
struct DriverCommand<A> {
    execute: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    arguments: Option<A>,
}

#[derive(Debug, Deserialize)]
struct DriverResponse<T> {
    #[serde(rename = "return")]
    result: Option<T>,
    error: Option<DriverFault>,
}

#[derive(Debug, Deserialize)]
struct DriverFault {
    message: String,
}

#[derive(Debug, Deserialize)]
struct DriverGreeting {
    driver: Option<DriverInfo>,
}

#[derive(Debug, Deserialize)]
struct DriverInfo {
    browser: String,
}

/// The embedded driver script. One JSON command per stdin line, one JSON
/// response per stdout line; configured via SMOKE_* environment variables.
const DRIVER_JS: &str = r#"'use strict';

const readline = require('readline');
const { chromium, firefox, webkit } = require('playwright');

const ENGINES = { chromium: chromium, firefox: firefox, webkit: webkit };

function intEnv(name, fallback) {
  const parsed = parseInt(process.env[name] || '', 10);
  return Number.isFinite(parsed) ? parsed : fallback;
}

(async () => {
  const browserName = process.env.SMOKE_BROWSER || 'chromium';
  const engine = ENGINES[browserName];
  if (!engine) {
    throw new Error('unsupported browser: ' + browserName);
  }

  const browser = await engine.launch({ headless: process.env.SMOKE_HEADLESS !== '0' });
  const context = await browser.newContext({
    viewport: {
      width: intEnv('SMOKE_VIEWPORT_WIDTH', 1280),
      height: intEnv('SMOKE_VIEWPORT_HEIGHT', 720),
    },
  });
  const page = await context.newPage();
  page.setDefaultTimeout(intEnv('SMOKE_DEFAULT_TIMEOUT_MS', 120000));

  async function handle(execute, args) {
    switch (execute) {
      case 'goto':
        await page.goto(args.url, {
          timeout: args.timeout_ms,
          waitUntil: args.wait_until || 'load',
        });
        return {};
      case 'wait-load':
        await page.waitForLoadState(args.state || 'networkidle', { timeout: args.timeout_ms });
        return {};
      case 'is-visible':
        return await page.locator(args.selector).first().isVisible();
      case 'count':
        return await page.locator(args.selector).count();
      case 'get-attribute':
        return { value: await page.locator(args.selector).first().getAttribute(args.name) };
      case 'click':
        await page.locator(args.selector).first().click({ timeout: args.timeout_ms });
        return {};
      case 'click-at':
        await page.locator(args.selector).first().click({ position: { x: args.x, y: args.y } });
        return {};
      case 'screenshot':
        await page.screenshot({ path: args.path, fullPage: !!args.full_page });
        return {};
      case 'quit':
        setImmediate(async () => {
          await browser.close();
          process.exit(0);
        });
        return {};
      default:
        throw new Error('unknown command: ' + execute);
    }
  }

  process.stdout.write(JSON.stringify({ driver: { browser: browserName } }) + '\n');

  const rl = readline.createInterface({ input: process.stdin, terminal: false });
  for await (const line of rl) {
    if (!line.trim()) {
      continue;
    }
    let reply;
    try {
      const request = JSON.parse(line);
      reply = { return: await handle(request.execute, request.arguments || {}) };
    } catch (err) {
      reply = { error: { message: String((err && err.message) || err) } };
    }
    process.stdout.write(JSON.stringify(reply) + '\n');
  }

  await browser.close();
})().catch((err) => {
  process.stderr.write(String((err && err.stack) || err) + '\n');
  process.exit(1);
});
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_serialization() {
        #[derive(Serialize)]
        struct TestArgs {
            selector: String,
        }

        let cmd = DriverCommand {
            execute: "count".to_string(),
            arguments: Some(TestArgs {
                selector: ".data-cell".to_string(),
            }),
        };

        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("\"execute\":\"count\""));
        assert!(json.contains("\"arguments\""));
    }

    #[test]
    fn test_void_command_omits_arguments() {
        let cmd = DriverCommand::<()> {
            execute: "quit".to_string(),
            arguments: None,
        };

        let json = serde_json::to_string(&cmd).unwrap();
        assert_eq!(json, "{\"execute\":\"quit\"}");
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{"return": 12}"#;
        let response: DriverResponse<usize> = serde_json::from_str(json).unwrap();
        assert_eq!(response.result, Some(12));
        assert!(response.error.is_none());
    }

    #[test]
    fn test_error_response_parsing() {
        let json = r#"{"error": {"message": "unknown command: frobnicate"}}"#;
        let response: DriverResponse<serde_json::Value> = serde_json::from_str(json).unwrap();
        assert!(response.result.is_none());
        assert_eq!(
            response.error.unwrap().message,
            "unknown command: frobnicate"
        );
    }

    #[test]
    fn test_nullable_attribute_return() {
        #[derive(Deserialize)]
        struct Return {
            value: Option<String>,
        }

        let json = r#"{"return": {"value": null}}"#;
        let response: DriverResponse<Return> = serde_json::from_str(json).unwrap();
        assert!(response.result.unwrap().value.is_none());
    }

    #[test]
    fn test_greeting_parsing() {
        let greeting: DriverGreeting =
            serde_json::from_str(r#"{"driver": {"browser": "chromium"}}"#).unwrap();
        assert_eq!(greeting.driver.unwrap().browser, "chromium");

        let bogus: DriverGreeting = serde_json::from_str(r#"{"other": true}"#).unwrap();
        assert!(bogus.driver.is_none());
    }
}
