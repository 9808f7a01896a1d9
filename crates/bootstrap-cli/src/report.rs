// Final summary printed after a run.

use bootstrap_worker::{StepRecord, StepResult};

/// Render one line per step plus the outcome, in run order.
pub fn format_run_report(records: &[StepRecord]) -> String {
    let mut output = String::new();
    output.push_str("\n----------------------------------------------\n");
    output.push_str("  z80-bootstrap summary\n");
    output.push_str("----------------------------------------------\n\n");

    let count = |label: &str| records.iter().filter(|r| r.result.label() == label).count();

    for record in records {
        output.push_str(&format!(
            "  [{:<9}] {} ({:.1}s)\n",
            record.result.label(),
            record.name,
            record.elapsed.as_secs_f64()
        ));
        match &record.result {
            StepResult::Tolerated { message } => {
                output.push_str(&format!("              {message}\n"));
            }
            StepResult::Failed { error } => {
                output.push_str(&format!("              {error}\n"));
                if let Some(guidance) = error.remediation() {
                    output.push_str(&format!("              {guidance}\n"));
                }
            }
            _ => {}
        }
    }

    output.push_str(&format!(
        "\n  {} executed, {} skipped, {} tolerated, {} failed\n",
        count("Executed"),
        count("Skipped"),
        count("Tolerated"),
        count("Failed")
    ));
    output.push_str("----------------------------------------------\n");
    output
}
