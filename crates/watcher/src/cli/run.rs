use anyhow::Context;

use bw_domain::config::{Config, ConfigSeverity};
use bw_notify::{Notifier, SmtpNotifier, StdoutNotifier};
use bw_portal::ReqwestTransport;
use bw_store::IdentityStore;

use crate::orchestrator::Orchestrator;

/// One full watch run with the production transport and notifier.
pub async fn run(config: &Config, dry_run: bool) -> anyhow::Result<()> {
    let mut errors = 0;
    for issue in config.validate() {
        match issue.severity {
            ConfigSeverity::Error => {
                tracing::error!(field = %issue.field, "{}", issue.message);
                errors += 1;
            }
            ConfigSeverity::Warning => tracing::warn!(field = %issue.field, "{}", issue.message),
        }
    }
    if errors > 0 {
        anyhow::bail!("configuration has {errors} error(s); run `bulletin-watch config validate`");
    }

    let credentials = config.account.credentials()?;

    // The store is opened (and locked) before any request leaves the host.
    let mut store = IdentityStore::open(&config.store.path)
        .with_context(|| format!("opening {}", config.store.path.display()))?;

    let transport = ReqwestTransport::new(&config.portal)?;
    let notifier: Box<dyn Notifier> = if dry_run {
        Box::new(StdoutNotifier)
    } else {
        Box::new(SmtpNotifier::new(config.smtp.clone()))
    };

    let outcome = Orchestrator::new(config, notifier.as_ref())
        .dry_run(dry_run)
        .run_once(transport, &credentials, &mut store)
        .await;
    let closed = store.close();

    let report = outcome?;
    closed?;

    tracing::info!(
        listed = report.listed,
        new = report.new,
        matched = report.matched.len(),
        notified = report.notified,
        committed = report.committed,
        dry_run,
        "run finished"
    );
    Ok(())
}
