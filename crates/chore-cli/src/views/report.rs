use chore_core::push::{DispatchReport, ErrorDetail};
use chore_core::scheduler::SweepSummary;
use owo_colors::OwoColorize;

const UNCONFIGURED: &str = "Push delivery is not configured; nothing was sent.";

pub fn print_dispatch_report(report: &DispatchReport) {
    if !report.configured {
        println!("{}", UNCONFIGURED.yellow());
        return;
    }

    if report.sent == 0 && report.failed == 0 && report.pruned == 0 {
        println!("No devices to notify.");
        return;
    }

    println!(
        "Delivered to {} device(s), {} failed, {} removed.",
        report.sent, report.failed, report.pruned
    );
    print_errors(&report.errors);
}

pub fn print_sweep_summary(summary: &SweepSummary) {
    if !summary.configured {
        println!("{}", UNCONFIGURED.yellow());
        return;
    }

    println!(
        "{} sweep over {} household(s): {} notified, {} skipped.",
        summary.kind.to_string().bold(),
        summary.households,
        summary.notified,
        summary.skipped
    );
    println!(
        "Delivered to {} device(s), {} failed, {} removed.",
        summary.sent, summary.failed, summary.pruned
    );
    if summary.subject_failures > 0 {
        println!(
            "{}",
            format!("{} subject(s) could not be processed.", summary.subject_failures).red()
        );
    }
    print_errors(&summary.errors);
}

fn print_errors(errors: &[ErrorDetail]) {
    for error in errors {
        println!("  {} {}", format!("[{}]", error.code).red(), error.message);
    }
}
