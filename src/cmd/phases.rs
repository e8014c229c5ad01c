//! Phase catalog listing: `outreach phases`.

use console::style;

use outreach::config::OutreachConfig;

pub fn cmd_phases(config: &OutreachConfig) {
    let phases = config.phase_table();
    let share = 100.0 / phases.len() as f64;

    println!();
    println!("{:<4} {:<20} {:<9} Share", "#", "Phase", "Color");
    println!("{:<4} {:<20} {:<9} -----", "--", "-----", "-----");
    for (index, phase) in phases.phases().iter().enumerate() {
        println!(
            "{:<4} {} {:<9} {:.1}%",
            index + 1,
            style(format!("{:<20}", phase.name)).color256(phase.color.to_ansi256()),
            phase.color.to_string(),
            share
        );
    }
    println!();
}
