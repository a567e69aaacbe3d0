//! Skip-list builder.
//!
//! The onboarding directory is known to emit duplicate rows and to
//! occasionally drop entries; duplicates are idempotent no-ops here.

use crate::types::SkipList;
use skd_schemas::OnboardingRecord;

/// Collect every identity whose onboarding state is settled (anything
/// other than Pending/TestnetOnboarded). These validators are no longer
/// mid-process and this operator stops supporting them with fresh stake.
pub fn build_skip_list<'a, I>(records: I) -> SkipList
where
    I: IntoIterator<Item = &'a OnboardingRecord>,
{
    let mut skip = SkipList::new();
    for record in records {
        if record.state.is_mid_onboarding() {
            continue;
        }
        skip.insert(record.testnet_pubkey.clone());
    }
    skip
}
