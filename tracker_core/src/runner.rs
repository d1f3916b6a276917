//! Polling loop around `ModeSupervisor`.
//!
//! The runner owns the only places that block: the per-tick sleep on the
//! clock and the bounded wait for button release before a low-power hand-off.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eyre::WrapErr;
use serde::Serialize;
use tracker_traits::{ButtonInput, Clock, PowerManager};

use crate::button::TouchButton;
use crate::error::Result;
use crate::hw_error::map_hw_error;
use crate::supervisor::{ModeSupervisor, SystemMode, TickOutcome};

#[derive(Debug, Clone)]
pub struct RunParams {
    /// Loop period (ms). 0 does not sleep between ticks.
    pub tick_ms: u64,
    /// Stop after this many ticks.
    pub max_ticks: Option<u64>,
    /// Stop after this many low-power cycles.
    pub max_sleeps: Option<u32>,
    /// Upper bound on waiting for the button to be released before sleeping.
    pub release_wait_ms: u64,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            tick_ms: 1,
            max_ticks: None,
            max_sleeps: None,
            release_wait_ms: 3_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Shutdown,
    MaxTicks,
    MaxSleeps,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub sleeps: u32,
    pub elapsed_ms: u64,
    pub final_mode: SystemMode,
    pub light_read_failures: u64,
    pub stopped_by: StopReason,
}

/// Run the supervisor until `shutdown` is set or a limit in `params` is hit.
///
/// The boot wake cause is read from `power` once. The button is resynced to
/// its current level at boot and after every wake-up. `on_tick` runs after every
/// successful supervisor tick (log draining, telemetry). On a tick error both
/// motors are stopped best-effort and the error is returned.
#[allow(clippy::too_many_arguments)]
pub fn run<C, B, P>(
    supervisor: &mut ModeSupervisor,
    button: &mut TouchButton,
    button_input: &mut B,
    power: &mut P,
    clock: &C,
    params: &RunParams,
    shutdown: &AtomicBool,
    mut on_tick: impl FnMut(&mut ModeSupervisor, u64),
) -> Result<RunSummary>
where
    C: Clock + ?Sized,
    B: ButtonInput + ?Sized,
    P: PowerManager + ?Sized,
{
    let epoch = clock.now();
    let tick = Duration::from_millis(params.tick_ms);
    supervisor.resume(power.wake_cause(), 0);
    button.sync_from(button_input);

    let mut ticks: u64 = 0;
    let mut sleeps: u32 = 0;
    let stopped_by = loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!(ticks, "shutdown requested");
            break StopReason::Shutdown;
        }
        if params.max_ticks.is_some_and(|max| ticks >= max) {
            break StopReason::MaxTicks;
        }

        let now = clock.ms_since(epoch);
        if let Some(event) = button.poll(button_input, now) {
            tracing::debug!(?event, t_ms = now, "button");
            supervisor.handle_button(event, now);
        }

        let outcome = match supervisor.tick(now) {
            Ok(outcome) => outcome,
            Err(e) => {
                if let Err(stop_err) = supervisor.stop_all(now) {
                    tracing::warn!(error = %stop_err, "failed to stop motors after tick error");
                }
                return Err(e.wrap_err(format!("control tick at {now} ms")));
            }
        };
        ticks += 1;
        on_tick(supervisor, now);

        if let TickOutcome::SleepReady(request) = outcome {
            wait_for_release(button, button_input, clock, epoch, params);
            let cause = power
                .enter_low_power(request.wake_after_ms, request.wake_on_touch)
                .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
                .wrap_err("entering low power")?;
            sleeps += 1;
            supervisor.resume(cause, clock.ms_since(epoch));
            button.sync_from(button_input);
            if params.max_sleeps.is_some_and(|max| sleeps >= max) {
                break StopReason::MaxSleeps;
            }
            continue;
        }

        if !tick.is_zero() {
            clock.sleep(tick);
        }
    };

    let light_read_failures = [crate::AxisId::H, crate::AxisId::V]
        .iter()
        .map(|&id| supervisor.axis(id).read_failures())
        .sum();
    Ok(RunSummary {
        ticks,
        sleeps,
        elapsed_ms: clock.ms_since(epoch),
        final_mode: supervisor.mode(),
        light_read_failures,
        stopped_by,
    })
}

/// Spin until the button reads released or `release_wait_ms` elapses, so a
/// held long press does not immediately wake the device again.
fn wait_for_release<C, B>(
    button: &mut TouchButton,
    button_input: &mut B,
    clock: &C,
    epoch: std::time::Instant,
    params: &RunParams,
) where
    C: Clock + ?Sized,
    B: ButtonInput + ?Sized,
{
    let start = clock.ms_since(epoch);
    let step = Duration::from_millis(params.tick_ms.max(1));
    while button.is_pressed() {
        let now = clock.ms_since(epoch);
        if now.saturating_sub(start) >= params.release_wait_ms {
            tracing::warn!(
                waited_ms = now.saturating_sub(start),
                "button still held, entering low power anyway"
            );
            return;
        }
        clock.sleep(step);
        // Events during the wait belong to the press that requested sleep.
        let _ = button.poll(button_input, clock.ms_since(epoch));
    }
}
