//! Recorded pulse trains in the Flipper SubGhz RAW text format.
//!
//! Alternating positive (high) and negative (low) durations in microseconds
//! on `RAW_Data:` lines. This is the interchange format for the `decode` and
//! `send` CLI commands: a transmission can be written out for replay on
//! other tools, and a capture from such a tool can be fed through the
//! receiver state machine.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: invalid duration {token:?}")]
    InvalidDuration { line: usize, token: String },
    #[error("no RAW_Data lines found")]
    Empty,
}

/// One constant-level stretch of the signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    pub level: bool,
    pub duration_us: u32,
}

/// Parse the `RAW_Data:` lines of a .sub file. Header lines and blank lines
/// are ignored; every duration token must be a nonzero integer.
pub fn parse_sub(text: &str) -> Result<Vec<Pulse>, RecordingError> {
    let mut pulses = Vec::new();

    for (i, line) in text.lines().enumerate() {
        let Some(data) = line.strip_prefix("RAW_Data:") else {
            continue;
        };
        for token in data.split_whitespace() {
            let value: i64 = token.parse().map_err(|_| RecordingError::InvalidDuration {
                line: i + 1,
                token: token.to_string(),
            })?;
            if value == 0 || value.unsigned_abs() > u32::MAX as u64 {
                return Err(RecordingError::InvalidDuration {
                    line: i + 1,
                    token: token.to_string(),
                });
            }
            pulses.push(Pulse {
                level: value > 0,
                duration_us: value.unsigned_abs() as u32,
            });
        }
    }

    if pulses.is_empty() {
        return Err(RecordingError::Empty);
    }
    Ok(pulses)
}

pub fn load(path: &Path) -> Result<Vec<Pulse>, RecordingError> {
    let text = std::fs::read_to_string(path).map_err(|source| RecordingError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_sub(&text)
}

/// Render pulses as a .sub file body.
pub fn render_sub(pulses: &[Pulse], frequency_hz: u32) -> String {
    let mut lines = vec![
        "Filetype: Flipper SubGhz RAW File".to_string(),
        "Version: 1".to_string(),
        format!("Frequency: {}", frequency_hz),
        "Preset: FuriHalSubGhzPresetOok270Async".to_string(),
        "Protocol: RAW".to_string(),
    ];

    let raw: Vec<String> = pulses
        .iter()
        .map(|p| {
            if p.level {
                p.duration_us.to_string()
            } else {
                format!("-{}", p.duration_us)
            }
        })
        .collect();

    const MAX_PER_LINE: usize = 512;
    for chunk in raw.chunks(MAX_PER_LINE) {
        lines.push(format!("RAW_Data: {}", chunk.join(" ")));
    }

    lines.join("\n") + "\n"
}

pub fn save(path: &Path, pulses: &[Pulse], frequency_hz: u32) -> Result<(), RecordingError> {
    std::fs::write(path, render_sub(pulses, frequency_hz)).map_err(|source| RecordingError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Timestamps of the level transitions, one per pulse start. This is the
/// sequence a receive pin interrupt would have delivered.
pub fn edge_timestamps(pulses: &[Pulse]) -> Vec<u32> {
    let mut timestamps = Vec::with_capacity(pulses.len());
    let mut t: u32 = 0;
    for pulse in pulses {
        timestamps.push(t);
        t = t.wrapping_add(pulse.duration_us);
    }
    timestamps
}

/// Rebuild pulses from recorded pin transitions. The last transition has no
/// successor to measure against, so its level runs for `tail_us`.
pub fn pulses_from_edges(edges: &[(bool, u32)], tail_us: u32) -> Vec<Pulse> {
    let mut pulses = Vec::with_capacity(edges.len());
    for pair in edges.windows(2) {
        pulses.push(Pulse {
            level: pair[0].0,
            duration_us: pair[1].1.wrapping_sub(pair[0].1),
        });
    }
    if let Some(&(level, _)) = edges.last() {
        pulses.push(Pulse {
            level,
            duration_us: tail_us,
        });
    }
    pulses
}
