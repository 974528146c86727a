//! View-facing contracts: the page banner and the inline trigger.
//!
//! Both render nothing when ineligible; neither renders anything itself.

pub mod banner;
pub mod trigger;

pub use banner::BannerEligibility;
pub use trigger::{OpenInAppTrigger, TriggerOptions, TriggerView};
