// src/types.rs

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Which watch strategy backs a session.
///
/// - `Event`: kernel change notifications through `notify`.
/// - `Poll`: periodic re-walks of the watched directories, comparing
///   modification times against the debounce watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchMode {
    Event,
    Poll,
}

impl Default for WatchMode {
    fn default() -> Self {
        WatchMode::Event
    }
}

impl FromStr for WatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "event" => Ok(WatchMode::Event),
            "poll" | "polling" => Ok(WatchMode::Poll),
            other => Err(format!(
                "invalid watch mode: {other} (expected \"event\" or \"poll\")"
            )),
        }
    }
}

/// One toolchain step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StepKind {
    Fmt,
    Test,
    Generate,
    Install,
    Build,
    Run,
}

impl StepKind {
    pub const ALL: [StepKind; 6] = [
        StepKind::Fmt,
        StepKind::Test,
        StepKind::Generate,
        StepKind::Install,
        StepKind::Build,
        StepKind::Run,
    ];

    /// Tag used on OutputSink records for this step.
    pub fn label(self) -> &'static str {
        match self {
            StepKind::Fmt => "Fmt",
            StepKind::Test => "Test",
            StepKind::Generate => "Generate",
            StepKind::Install => "Install",
            StepKind::Build => "Build",
            StepKind::Run => "Run",
        }
    }

    /// Command used when the config does not override `cmd`.
    pub fn default_command(self) -> &'static str {
        match self {
            StepKind::Fmt => "gofmt -s -w",
            StepKind::Test => "go test",
            StepKind::Generate => "go generate",
            StepKind::Install => "go install",
            StepKind::Build => "go build",
            StepKind::Run => "go run .",
        }
    }

    pub fn enabled_by_default(self) -> bool {
        matches!(
            self,
            StepKind::Fmt | StepKind::Test | StepKind::Build | StepKind::Run
        )
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };
    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{}' is too large", s))
}
