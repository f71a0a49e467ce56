use crate::use_cases::TimeStep;
use std::{env, time::Duration};

// Runtime/server settings (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("ARENA_SERVER_PORT")
        .or_else(|_| env::var("PORT"))
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000)
}

pub fn http_host() -> [u8; 4] {
    env::var("ARENA_SERVER_HOST")
        .ok()
        .and_then(|v| v.parse::<std::net::Ipv4Addr>().ok())
        .map(|ip| ip.octets())
        .unwrap_or([127, 0, 0, 1])
}

pub fn timestep() -> TimeStep {
    parse_timestep(env::var("SIM_TIMESTEP").ok().as_deref())
}

fn parse_timestep(raw: Option<&str>) -> TimeStep {
    match raw.map(str::trim) {
        Some(v) if v.eq_ignore_ascii_case("fixed") => TimeStep::Fixed {
            step: TICK_INTERVAL,
            max_steps: MAX_STEPS_PER_TICK,
        },
        _ => TimeStep::Variable {
            max_delta: MAX_FRAME_DELTA,
        },
    }
}

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const WORLD_BROADCAST_CAPACITY: usize = 128;
pub const ROSTER_BROADCAST_CAPACITY: usize = 256;

pub const TICK_RATE: u64 = 60;
pub const BROADCAST_RATE: u64 = 20;
pub const TICK_INTERVAL: Duration = Duration::from_micros(1_000_000 / TICK_RATE);
pub const BROADCAST_INTERVAL: Duration = Duration::from_millis(1000 / BROADCAST_RATE);

// Longest wall-clock gap a single variable step may integrate.
pub const MAX_FRAME_DELTA: Duration = Duration::from_millis(250);
// Catch-up limit for the fixed step; older backlog is dropped.
pub const MAX_STEPS_PER_TICK: u32 = 5;
