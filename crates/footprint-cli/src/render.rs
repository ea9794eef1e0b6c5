use std::io::IsTerminal;
use std::time::{Duration, Instant};

use anstyle::{AnsiColor, Effects, Style};
use footprint_core::{IntegrityReport, Recommendation, UninstallReport, VerificationResult};
use footprint_installer::{InstallOutcome, InstallationStatus};
use indicatif::{HumanCount, ProgressBar, ProgressStyle};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputStyle {
    Plain,
    Rich,
}

pub fn current_output_style() -> OutputStyle {
    let no_color = std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty());
    if std::io::stdout().is_terminal() && !no_color {
        OutputStyle::Rich
    } else {
        OutputStyle::Plain
    }
}

pub fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("[{}] {}", status.to_ascii_uppercase(), message),
    }
}

pub struct TerminalProgress {
    style: OutputStyle,
    label: String,
    progress_bar: Option<ProgressBar>,
    started_at: Instant,
}

impl TerminalProgress {
    pub fn start(style: OutputStyle, label: &str) -> Self {
        let progress_bar = if style == OutputStyle::Rich {
            let progress_bar = ProgressBar::new(100);
            if let Ok(template) = ProgressStyle::with_template(
                "{spinner:.cyan.bold} {prefix:<10} [{bar:20.cyan/blue}] {pos:>3}% {wide_msg}",
            ) {
                progress_bar.set_style(template.tick_chars("|/-\\ ").progress_chars("=>-"));
            }
            progress_bar.set_prefix(label.to_string());
            progress_bar.enable_steady_tick(Duration::from_millis(80));
            Some(progress_bar)
        } else {
            None
        };

        Self {
            style,
            label: label.to_string(),
            progress_bar,
            started_at: Instant::now(),
        }
    }

    pub fn update(&self, percent: u8, message: &str) {
        if let Some(progress_bar) = &self.progress_bar {
            progress_bar.set_position(u64::from(percent.min(100)));
            progress_bar.set_message(message.to_string());
        }
    }

    pub fn finish(mut self, completed: u64) {
        let Some(progress_bar) = self.progress_bar.take() else {
            return;
        };
        progress_bar.finish_and_clear();
        if let Some(line) = render_progress_line(
            self.style,
            &self.label,
            completed,
            Some(self.started_at.elapsed()),
        ) {
            println!("{line}");
        }
    }

    pub fn abandon(mut self) {
        if let Some(progress_bar) = self.progress_bar.take() {
            progress_bar.finish_and_clear();
        }
    }
}

pub fn format_record_lines(outcome: &InstallOutcome, style: OutputStyle) -> Vec<String> {
    let baseline = &outcome.baseline;
    let mut lines = vec![render_status_line(
        style,
        "ok",
        &format!(
            "recorded {} files for scope {} under {}",
            baseline.files.len(),
            baseline.scope,
            baseline.target_root.display()
        ),
    )];
    lines.push(format!("baseline: {}", outcome.baseline_path.display()));
    for failure in &outcome.failures {
        lines.push(render_status_line(
            style,
            "warn",
            &format!("not tracked {}: {}", failure.path.display(), failure.reason),
        ));
    }
    lines
}

pub fn format_integrity_lines(report: &IntegrityReport, style: OutputStyle) -> Vec<String> {
    let mut lines = Vec::new();
    for entry in &report.entries {
        if entry.recommendation == Recommendation::Remove {
            continue;
        }
        if !report.report_modifications
            && matches!(entry.result, VerificationResult::Modified { .. })
        {
            continue;
        }
        let status = match entry.recommendation {
            Recommendation::Preserve => "warn",
            Recommendation::Remove | Recommendation::Ignore => "step",
        };
        lines.push(render_status_line(
            style,
            status,
            &format!("{} {}", entry.result.as_str(), entry.path.display()),
        ));
    }
    let status = if report.counts.modified + report.counts.corrupted == 0 {
        "ok"
    } else {
        "warn"
    };
    lines.push(render_status_line(style, status, &report.summary));
    lines
}

pub fn format_uninstall_lines(report: &UninstallReport, style: OutputStyle) -> Vec<String> {
    let mut lines = Vec::new();
    for path in &report.preserved {
        lines.push(render_status_line(
            style,
            "step",
            &format!("preserved {}", path.display()),
        ));
    }
    if let Some(backup_path) = &report.backup_path {
        lines.push(render_status_line(
            style,
            "step",
            &format!(
                "backed up {} files to {}",
                report.backed_up.len(),
                backup_path.display()
            ),
        ));
    }
    for error in report.errors() {
        lines.push(render_status_line(style, "error", &error));
    }

    let summary = format!(
        "{} uninstall of scope {}: removed {}, preserved {}, failed {}",
        report.policy,
        report.scope,
        HumanCount(report.removed.len() as u64),
        HumanCount(report.preserved.len() as u64),
        report.failed.len()
    );
    let status = if report.success() { "ok" } else { "warn" };
    lines.push(render_status_line(style, status, &summary));
    lines
}

pub fn format_status_lines(statuses: &[InstallationStatus], style: OutputStyle) -> Vec<String> {
    if statuses.is_empty() {
        return vec![render_status_line(style, "step", "no installations recorded")];
    }
    statuses
        .iter()
        .map(|status| {
            let version = status
                .bundle
                .version
                .as_ref()
                .map(|version| format!(" {version}"))
                .unwrap_or_default();
            format!(
                "{} {}{} files={} root={} installed={}",
                status.scope,
                status.bundle.filename,
                version,
                status.tracked_files,
                status.target_root.display(),
                status.installed_at.format("%Y-%m-%dT%H:%M:%SZ")
            )
        })
        .collect()
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let millis = elapsed.subsec_millis();
    format!("{secs}.{millis:03}s")
}

fn progress_label_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightCyan.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}

fn render_progress_line(
    style: OutputStyle,
    label: &str,
    completed: u64,
    elapsed: Option<Duration>,
) -> Option<String> {
    if style == OutputStyle::Plain {
        return None;
    }
    let suffix = elapsed
        .map(|value| format!(" complete in {}", format_elapsed(value)))
        .unwrap_or_default();
    Some(format!(
        "{} {} files{}",
        colorize(progress_label_style(), label),
        HumanCount(completed),
        suffix
    ))
}
