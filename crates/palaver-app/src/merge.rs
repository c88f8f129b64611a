//! Message and fragment merge stages.
//!
//! Both stages run on the single dispatch thread, so a message batch is
//! never interleaved with fragment patches. Each stage notifies the view
//! observer at most once per batch, and only when the batch actually
//! mutated the view.

use palaver_proto::{FragmentPatch, MessageRecord};

use crate::{
    observer::ViewObserver,
    state::{ConversationView, MessageEntry},
};

/// Merge a batch of message records into the view, in arrival order.
///
/// Attribution follows the record's author kind: user records render as
/// "self" entries, everything else as participant entries keyed by author
/// name. Records are never reordered or deduplicated. A non-empty batch
/// also clears the assistant activity indicator, since a reply has landed.
pub fn merge_messages(
    view: &mut ConversationView,
    records: Vec<MessageRecord>,
    observer: &mut ViewObserver,
) {
    if records.is_empty() {
        return;
    }
    view.set_activity(None);
    for record in records {
        view.push_message(MessageEntry::from_record(record));
    }
    observer.notify();
}

/// Apply a batch of fragment patches to the view, in order.
///
/// Patches are idempotent by contract; a redelivered batch that changes
/// nothing produces no view-change notification.
pub fn merge_fragments(
    view: &mut ConversationView,
    patches: &[FragmentPatch],
    observer: &mut ViewObserver,
) {
    let mut changed = false;
    for patch in patches {
        changed |= view.apply(patch);
    }
    if changed {
        observer.notify();
    }
}
