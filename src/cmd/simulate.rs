//! One-off progress reading: `outreach simulate`.

use anyhow::Result;
use chrono::{Duration, Utc};
use serde::Serialize;

use outreach::config::OutreachConfig;
use outreach::progress::simulate;

#[derive(Debug, Serialize)]
struct SimulationOutput {
    items: u32,
    seconds_per_item: f64,
    elapsed_seconds: f64,
    percent: f64,
    phase_index: usize,
    phase_name: String,
    seconds_remaining: u64,
}

pub fn cmd_simulate(config: &OutreachConfig, items: u32, elapsed: f64, json: bool) -> Result<()> {
    if !elapsed.is_finite() {
        anyhow::bail!("--elapsed must be a finite number of seconds, got {}", elapsed);
    }

    let phases = config.phase_table();
    let start = Utc::now();
    let millis = (elapsed * 1000.0).round();
    let now = (millis.abs() <= i64::MAX as f64)
        .then(|| Duration::try_milliseconds(millis as i64))
        .flatten()
        .and_then(|offset| start.checked_add_signed(offset))
        .ok_or_else(|| anyhow::anyhow!("--elapsed {} is out of range", elapsed))?;
    let estimate = simulate(start, now, items, config.seconds_per_item(), phases.len());

    let output = SimulationOutput {
        items,
        seconds_per_item: config.seconds_per_item(),
        elapsed_seconds: elapsed,
        percent: estimate.percent,
        phase_index: estimate.phase_index,
        phase_name: phases.name_at(estimate.phase_index).to_string(),
        seconds_remaining: estimate.seconds_remaining,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!("Items:             {}", output.items);
    println!("Seconds per item:  {}", output.seconds_per_item);
    println!("Elapsed:           {}s", output.elapsed_seconds);
    println!("Progress:          {:.1}%", output.percent);
    println!(
        "Phase:             {} ({}/{})",
        output.phase_name,
        output.phase_index + 1,
        phases.len()
    );
    println!("Remaining:         {}s", output.seconds_remaining);
    println!();
    Ok(())
}
