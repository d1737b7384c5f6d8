//! Control plane: text commands applied between frames to runtime-tunable
//! detector parameters.

use crate::errors::{Result, WwvError};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetTickThreshold(f64),
    SetTickAdaptDown(f64),
    SetTickAdaptUp(f64),
    SetMarkerThreshold(f64),
    SetBcdThreshold(f64),
    SetMinPulseMs(f64),
    SetMaxPulseMs(f64),
    EnableTelem(String),
}

/// Threshold multiplier is tunable in [1.0, 5.0] per the adaptive
/// threshold contract.
const THRESHOLD_RANGE: (f64, f64) = (1.0, 5.0);
/// Adaptive baseline rates are tunable in [0.001, 0.999].
const ALPHA_RANGE: (f64, f64) = (0.001, 0.999);
/// Pulse duration bounds must be positive and under one second.
const PULSE_MS_RANGE: (f64, f64) = (0.1, 1_000.0);

fn parse_ranged(token: &str, range: (f64, f64)) -> Result<f64> {
    let value: f64 = token.parse().map_err(|_| WwvError::InvalidArgument {
        reason: format!("'{token}' is not a number"),
    })?;
    if value < range.0 || value > range.1 {
        return Err(WwvError::InvalidArgument {
            reason: format!("value {value} outside allowed range [{}, {}]", range.0, range.1),
        });
    }
    Ok(value)
}

/// Parse one control-plane line. Unrecognized commands or out-of-range
/// arguments are rejected with `InvalidArgument`; the caller's state is
/// left unchanged in either case since no command is applied here.
pub fn parse_command(line: &str) -> Result<Command> {
    let mut parts = line.split_whitespace();
    let name = parts.next().ok_or_else(|| WwvError::InvalidArgument {
        reason: "empty command".into(),
    })?;
    let arg = parts.next();
    if parts.next().is_some() {
        return Err(WwvError::InvalidArgument {
            reason: format!("command '{name}' takes exactly one argument"),
        });
    }

    let require_arg = |arg: Option<&str>| {
        arg.ok_or_else(|| WwvError::InvalidArgument {
            reason: format!("command '{name}' requires an argument"),
        })
    };

    match name {
        "SET_TICK_THRESHOLD" => Ok(Command::SetTickThreshold(parse_ranged(
            require_arg(arg)?,
            THRESHOLD_RANGE,
        )?)),
        "SET_TICK_ADAPT_DOWN" => Ok(Command::SetTickAdaptDown(parse_ranged(
            require_arg(arg)?,
            ALPHA_RANGE,
        )?)),
        "SET_TICK_ADAPT_UP" => Ok(Command::SetTickAdaptUp(parse_ranged(
            require_arg(arg)?,
            ALPHA_RANGE,
        )?)),
        "SET_MARKER_THRESHOLD" => Ok(Command::SetMarkerThreshold(parse_ranged(
            require_arg(arg)?,
            THRESHOLD_RANGE,
        )?)),
        "SET_BCD_THRESHOLD" => Ok(Command::SetBcdThreshold(parse_ranged(
            require_arg(arg)?,
            THRESHOLD_RANGE,
        )?)),
        "SET_MIN_PULSE_MS" => Ok(Command::SetMinPulseMs(parse_ranged(
            require_arg(arg)?,
            PULSE_MS_RANGE,
        )?)),
        "SET_MAX_PULSE_MS" => Ok(Command::SetMaxPulseMs(parse_ranged(
            require_arg(arg)?,
            PULSE_MS_RANGE,
        )?)),
        "ENABLE_TELEM" => Ok(Command::EnableTelem(require_arg(arg)?.to_string())),
        other => Err(WwvError::InvalidArgument {
            reason: format!("unknown command '{other}'"),
        }),
    }
}
