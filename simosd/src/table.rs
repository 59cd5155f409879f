//! Process table rendering

use kernel_api::ProcessSnapshot;
use std::fmt::Write;

const HEADER: &str = "PID PRI STATE      LOC    PART  PC   IR ACC  X  Y  Z  RUN WAIT  TAT EXIT";

/// Renders snapshots as a fixed-width table, one row per process
///
/// The running process shows its live registers; every other process shows
/// the registers saved at its last context switch.
pub fn render_process_table(processes: &[ProcessSnapshot]) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');

    for snapshot in processes {
        let regs = snapshot.live_registers.unwrap_or(snapshot.saved_registers);
        let partition = snapshot
            .partition
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        let turnaround = snapshot
            .turnaround
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        let exit = snapshot
            .exit_reason
            .as_ref()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());

        let _ = writeln!(
            out,
            "{:>3} {:>3} {:<10} {:<6} {:>4} {:04X} {:02X}  {:02X} {:02X} {:02X} {:>2} {:>4} {:>4} {:>4} {}",
            snapshot.pid.as_u32(),
            snapshot.priority,
            snapshot.state.to_string(),
            snapshot.location.to_string(),
            partition,
            regs.pc,
            regs.ir,
            regs.acc,
            regs.x,
            regs.y,
            u8::from(regs.zero_flag),
            snapshot.executed_ticks,
            snapshot.ready_wait,
            turnaround,
            exit,
        );
    }

    out
}
