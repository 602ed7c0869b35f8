//! One watch run: authenticate → fetch → parse → detect new → filter →
//! notify.

use bw_domain::config::{Config, MarkSeen};
use bw_domain::error::Result;
use bw_domain::trace::TraceEvent;
use bw_domain::{Credentials, KeywordFilter, Listing, Notification};
use bw_notify::Notifier;
use bw_portal::{fetch_listing, parse_listing, Authenticator, Transport};
use bw_store::IdentityStore;

/// What a run saw and did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Posts on the listing page.
    pub listed: usize,
    /// Posts not previously in the store.
    pub new: usize,
    /// New posts whose title matched a keyword.
    pub matched: Listing,
    pub notified: bool,
    /// Identities written to the store by this run.
    pub committed: usize,
}

pub struct Orchestrator<'a> {
    config: &'a Config,
    notifier: &'a dyn Notifier,
    dry_run: bool,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a Config, notifier: &'a dyn Notifier) -> Self {
        Self {
            config,
            notifier,
            dry_run: false,
        }
    }

    /// Deliver as usual but never write to the store.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run once against an already opened store.
    ///
    /// With `mark_seen = before_delivery` new identities are committed
    /// before the notification goes out, so a failed delivery is not
    /// retried.  With `after_delivery` the commit waits for a successful
    /// delivery and a failure leaves the posts new for the next run.
    pub async fn run_once<T: Transport>(
        &self,
        transport: T,
        credentials: &Credentials,
        store: &mut IdentityStore,
    ) -> Result<RunReport> {
        let authenticator = Authenticator::new(self.config.portal.clone());
        let session = authenticator.authenticate(transport, credentials).await?;

        let html = fetch_listing(&session, &self.config.portal.listing_url()).await?;
        let listing = parse_listing(&html);

        let staged = store.stage(&listing);
        let filter = KeywordFilter::new(self.config.watch.keywords.iter().cloned());
        let matched = staged.posts().matching(&filter);
        let mut report = RunReport {
            listed: listing.len(),
            new: staged.len(),
            matched,
            ..RunReport::default()
        };

        if self.dry_run {
            report.notified = self.notify(&report.matched).await?;
        } else {
            match self.config.watch.mark_seen {
                MarkSeen::BeforeDelivery => {
                    report.committed = store.commit(staged)?;
                    self.detected(&report);
                    report.notified = self.notify(&report.matched).await?;
                }
                MarkSeen::AfterDelivery => {
                    report.notified = self.notify(&report.matched).await?;
                    report.committed = store.commit(staged)?;
                    self.detected(&report);
                }
            }
        }

        TraceEvent::RunFinished {
            listed: report.listed,
            new: report.new,
            matched: report.matched.len(),
            notified: report.notified,
            dry_run: self.dry_run,
        }
        .emit();
        Ok(report)
    }

    fn detected(&self, report: &RunReport) {
        TraceEvent::NewPostsDetected {
            listed: report.listed,
            new: report.new,
            committed: report.committed > 0,
        }
        .emit();
    }

    /// Deliver one notification for `posts`; nothing to send is not an error.
    async fn notify(&self, posts: &Listing) -> Result<bool> {
        if posts.is_empty() {
            tracing::info!("no new matching posts");
            return Ok(false);
        }

        let watch = &self.config.watch;
        let notification = Notification::for_posts(&watch.subject, &watch.recipient, posts);
        self.notifier.deliver(&notification).await?;

        TraceEvent::NotificationDelivered {
            recipient: notification.recipient,
            posts: posts.len(),
        }
        .emit();
        Ok(true)
    }
}
