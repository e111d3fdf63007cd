//! Business logic services.
//!
//! # Services
//!
//! - `affiliate` - Referral bookkeeping for affiliate-attributed purchases
//! - `completions` - Upstream completions API client (agent webhook proxy)
//! - `reply_queue` - Deferred Instagram reply queue (claim-then-dispatch)
//! - `subscriptions` - Subscription lifecycle and billing webhook handling
//! - `tokens` - Token balances, purchase ledger and usage metering

pub mod affiliate;
pub mod completions;
pub mod reply_queue;
pub mod subscriptions;
pub mod tokens;

pub use affiliate::AffiliateService;
pub use reply_queue::ReplyQueueService;
pub use subscriptions::{BillingEvent, SubscriptionService};
pub use tokens::{BalanceSummary, TokenService};
