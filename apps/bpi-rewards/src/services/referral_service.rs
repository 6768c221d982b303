use anyhow::Result;
use std::collections::HashSet;
use tracing::warn;

use crate::store::MembershipStore;

pub struct ReferralService;

impl ReferralService {
    /// Upline of `user_id`, direct sponsor first, at most `max_levels` long.
    ///
    /// Stops early when the chain ends or loops back on an id already seen.
    pub async fn get_referral_chain<S>(store: &mut S, user_id: i64, max_levels: usize) -> Result<Vec<i64>>
    where
        S: MembershipStore + ?Sized,
    {
        let mut chain = Vec::with_capacity(max_levels);
        let mut seen = HashSet::from([user_id]);
        let mut current = user_id;

        while chain.len() < max_levels {
            let Some(referrer_id) = store.find_referrer_id(current).await? else {
                break;
            };

            if !seen.insert(referrer_id) {
                warn!(
                    "Referral cycle detected above user {}: {} already in chain {:?}",
                    user_id, referrer_id, chain
                );
                break;
            }

            chain.push(referrer_id);
            current = referrer_id;
        }

        Ok(chain)
    }
}
