use std::io::{self, Write};

use bw_domain::config::{Config, ConfigIssue, ConfigSeverity};

/// Check the loaded config and report problems on stdout, grouped by
/// severity. `Ok(false)` means at least one blocking problem; warnings alone
/// still pass.
pub fn validate(config: &Config, config_path: &str) -> anyhow::Result<bool> {
    let issues = config.validate();
    write_report(&mut io::stdout().lock(), &issues, config_path)?;
    Ok(!issues.iter().any(|i| i.severity == ConfigSeverity::Error))
}

fn write_report(out: &mut impl Write, issues: &[ConfigIssue], config_path: &str) -> io::Result<()> {
    let (blocking, advisory): (Vec<&ConfigIssue>, Vec<&ConfigIssue>) = issues
        .iter()
        .partition(|i| i.severity == ConfigSeverity::Error);

    writeln!(out, "{config_path}")?;
    if issues.is_empty() {
        return writeln!(out, "  nothing to fix");
    }

    for (heading, group) in [("must fix", &blocking), ("worth a look", &advisory)] {
        if group.is_empty() {
            continue;
        }
        writeln!(out, "  {heading}:")?;
        for issue in group.iter() {
            writeln!(out, "    - {} ({})", issue.message, issue.field)?;
        }
    }

    let verdict = if blocking.is_empty() { "usable" } else { "not usable" };
    writeln!(
        out,
        "  {verdict}: {} blocking, {} advisory",
        blocking.len(),
        advisory.len()
    )
}

/// Dump the resolved config (with all defaults filled in) as TOML.
pub fn show(config: &Config) -> anyhow::Result<()> {
    let output = toml::to_string_pretty(config)
        .map_err(|e| anyhow::anyhow!("failed to serialize config: {e}"))?;
    print!("{output}");
    Ok(())
}
