use duet_core::MemberId;
use std::cmp::Ordering;

/// Decides simultaneous offers: the lower identity keeps its offer.
///
/// Numeric identities compare as numbers ("9" < "10"); anything else, and
/// numeric ties such as "7" and "07", fall back to string order.
pub fn local_wins_glare(local: &MemberId, remote: &MemberId) -> bool {
    let by_text = || local.as_str().cmp(remote.as_str());
    let order = match (local.numeric(), remote.numeric()) {
        (Some(l), Some(r)) => l.cmp(&r).then_with(by_text),
        _ => by_text(),
    };
    order == Ordering::Less
}
