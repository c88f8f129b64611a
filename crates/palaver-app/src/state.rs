//! Observable view state for one conversation.
//!
//! [`ConversationView`] is the rendered conversation region modeled as an
//! ordered node list: message entries appended by the message merge and
//! opaque markup nodes maintained by fragment patches. It is the "view
//! model" the UI renders from, with none of the transport or protocol
//! state attached.

use chrono::{DateTime, Utc};
use palaver_proto::{AuthorKind, FragmentPatch, MessageRecord, PatchAction};

/// Which side a message entry renders on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribution {
    /// Authored by the local user ("self" entry).
    Own,
    /// Authored by another participant, keyed by display name.
    Participant {
        /// Author display name.
        name: String,
    },
}

/// A rendered message entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEntry {
    /// Record id the entry was built from.
    pub id: u64,
    /// Attribution side.
    pub attribution: Attribution,
    /// Message text.
    pub content: String,
    /// Server-side creation time.
    pub timestamp: DateTime<Utc>,
}

impl MessageEntry {
    /// Build the view entry for a record, deciding attribution.
    pub fn from_record(record: MessageRecord) -> Self {
        let attribution = match record.author_kind {
            AuthorKind::User => Attribution::Own,
            AuthorKind::Assistant => Attribution::Participant { name: record.author_name },
        };
        Self { id: record.id, attribution, content: record.content, timestamp: record.timestamp }
    }
}

/// Content of one view node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeContent {
    /// A structured message entry.
    Message(MessageEntry),
    /// Opaque markup installed by a fragment patch.
    Markup(String),
}

/// One node in the rendered conversation region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewNode {
    /// Node identifier, targeted by fragment patches.
    pub id: String,
    /// Node content.
    pub content: NodeContent,
}

/// The rendered conversation region.
///
/// Mutated only by the merge stages and teardown, never concurrently, by
/// virtue of single-threaded dispatch. Equality compares rendered state,
/// which is what the idempotence contract is stated over.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationView {
    nodes: Vec<ViewNode>,
    activity: Option<String>,
}

impl ConversationView {
    /// Create an empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Nodes in render order.
    pub fn nodes(&self) -> &[ViewNode] {
        &self.nodes
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the region is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Current assistant activity indicator, if any.
    pub fn activity(&self) -> Option<&str> {
        self.activity.as_deref()
    }

    /// Message entries in render order.
    pub fn messages(&self) -> impl Iterator<Item = &MessageEntry> {
        self.nodes.iter().filter_map(|node| match &node.content {
            NodeContent::Message(entry) => Some(entry),
            NodeContent::Markup(_) => None,
        })
    }

    /// Append a message entry.
    ///
    /// Records are never deduplicated here; upstream uniqueness is assumed,
    /// and a redelivered id appends a second node.
    pub(crate) fn push_message(&mut self, entry: MessageEntry) {
        let id = format!("message-{}", entry.id);
        self.nodes.push(ViewNode { id, content: NodeContent::Message(entry) });
    }

    /// Apply one fragment patch. Returns whether the view changed, which is
    /// `false` exactly when the patch had already been applied.
    pub(crate) fn apply(&mut self, patch: &FragmentPatch) -> bool {
        match patch.action {
            PatchAction::Append => match self.node_mut(&patch.target) {
                Some(node) => replace_content(node, &patch.markup),
                None => {
                    self.nodes.push(ViewNode {
                        id: patch.target.clone(),
                        content: NodeContent::Markup(patch.markup.clone()),
                    });
                    true
                }
            },
            PatchAction::Replace => match self.node_mut(&patch.target) {
                Some(node) => replace_content(node, &patch.markup),
                // Replacing a missing target is a no-op
                None => false,
            },
            PatchAction::Remove => {
                let before = self.nodes.len();
                self.nodes.retain(|node| node.id != patch.target);
                self.nodes.len() != before
            }
        }
    }

    /// Set or clear the activity indicator. Returns whether it changed.
    pub(crate) fn set_activity(&mut self, text: Option<String>) -> bool {
        if self.activity == text {
            return false;
        }
        self.activity = text;
        true
    }

    fn node_mut(&mut self, id: &str) -> Option<&mut ViewNode> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }
}

/// Overwrite a node with markup, reporting whether anything changed.
fn replace_content(node: &mut ViewNode, markup: &str) -> bool {
    match &node.content {
        NodeContent::Markup(existing) if existing == markup => false,
        _ => {
            node.content = NodeContent::Markup(markup.to_string());
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(action: PatchAction, target: &str, markup: &str) -> FragmentPatch {
        FragmentPatch { action, target: target.to_string(), markup: markup.to_string() }
    }

    #[test]
    fn append_then_reapply_is_idempotent() {
        let mut view = ConversationView::new();
        let p = patch(PatchAction::Append, "status", "<p>Thinking...</p>");

        assert!(view.apply(&p));
        let once = view.clone();

        assert!(!view.apply(&p));
        assert_eq!(view, once);
    }

    #[test]
    fn replace_missing_target_is_a_no_op() {
        let mut view = ConversationView::new();
        assert!(!view.apply(&patch(PatchAction::Replace, "ghost", "<p>x</p>")));
        assert!(view.is_empty());
    }

    #[test]
    fn remove_is_idempotent() {
        let mut view = ConversationView::new();
        view.apply(&patch(PatchAction::Append, "status", "<p>x</p>"));

        assert!(view.apply(&patch(PatchAction::Remove, "status", "")));
        assert!(!view.apply(&patch(PatchAction::Remove, "status", "")));
        assert!(view.is_empty());
    }

    #[test]
    fn append_to_existing_target_overwrites() {
        let mut view = ConversationView::new();
        view.apply(&patch(PatchAction::Append, "status", "<p>old</p>"));
        assert!(view.apply(&patch(PatchAction::Append, "status", "<p>new</p>")));

        assert_eq!(view.len(), 1);
        assert_eq!(
            view.nodes()[0].content,
            NodeContent::Markup("<p>new</p>".to_string())
        );
    }

    #[test]
    fn activity_change_detection() {
        let mut view = ConversationView::new();
        assert!(view.set_activity(Some("Thinking...".to_string())));
        assert!(!view.set_activity(Some("Thinking...".to_string())));
        assert!(view.set_activity(None));
        assert!(!view.set_activity(None));
    }
}
