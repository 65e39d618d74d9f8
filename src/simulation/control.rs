//! Control surface commands
//!
//! Textual form of the engine's control operations, so a headless run can be
//! scripted from the command line (`--at 120:manual`).

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};

use super::engine::SimulationEngine;
use super::scenario::ScenarioKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Start,
    Pause,
    Stop,
    Reset,
    ManualLightChange,
    AutoMode,
    ChangeScenario(ScenarioKind),
}

impl ControlCommand {
    pub fn apply(self, engine: &mut SimulationEngine) {
        match self {
            ControlCommand::Start => engine.start(),
            ControlCommand::Pause => engine.pause(),
            ControlCommand::Stop => engine.stop(),
            ControlCommand::Reset => engine.reset(),
            ControlCommand::ManualLightChange => engine.manual_light_change(),
            ControlCommand::AutoMode => engine.set_auto_mode(),
            ControlCommand::ChangeScenario(kind) => engine.change_scenario(kind),
        }
    }
}

impl FromStr for ControlCommand {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(name) = s.strip_prefix("scenario=") {
            let kind = name.parse::<ScenarioKind>().map_err(|e| anyhow!(e))?;
            return Ok(ControlCommand::ChangeScenario(kind));
        }

        match s.to_ascii_lowercase().as_str() {
            "start" => Ok(ControlCommand::Start),
            "pause" => Ok(ControlCommand::Pause),
            "stop" => Ok(ControlCommand::Stop),
            "reset" => Ok(ControlCommand::Reset),
            "manual" => Ok(ControlCommand::ManualLightChange),
            "auto" => Ok(ControlCommand::AutoMode),
            other => bail!("unknown control command '{}'", other),
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlCommand::Start => f.write_str("start"),
            ControlCommand::Pause => f.write_str("pause"),
            ControlCommand::Stop => f.write_str("stop"),
            ControlCommand::Reset => f.write_str("reset"),
            ControlCommand::ManualLightChange => f.write_str("manual"),
            ControlCommand::AutoMode => f.write_str("auto"),
            ControlCommand::ChangeScenario(ScenarioKind::Normal) => f.write_str("scenario=normal"),
            ControlCommand::ChangeScenario(ScenarioKind::RushHour) => {
                f.write_str("scenario=rush-hour")
            }
            ControlCommand::ChangeScenario(ScenarioKind::Night) => f.write_str("scenario=night"),
        }
    }
}

/// A command to apply before a given tick of a headless run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledCommand {
    pub tick: u32,
    pub command: ControlCommand,
}

impl FromStr for ScheduledCommand {
    type Err = anyhow::Error;

    /// `<tick>:<command>`, e.g. `300:scenario=night`
    fn from_str(s: &str) -> Result<Self> {
        let (tick, command) = s
            .split_once(':')
            .with_context(|| format!("expected <tick>:<command>, got '{}'", s))?;
        let tick = tick
            .trim()
            .parse::<u32>()
            .with_context(|| format!("invalid tick '{}'", tick))?;
        let command = command.parse::<ControlCommand>()?;
        Ok(Self { tick, command })
    }
}
