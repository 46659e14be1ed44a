//! Flat records to reply tree.
//!
//! Records are bucketed once by the `guid` they reply to. The tree is then
//! grown top-down from the root bucket, detaching each bucket as its parent is
//! placed, so every record is visited at most once. Growth uses an explicit
//! stack of open nodes, and nesting stops at [`MAX_REPLY_DEPTH`] so the
//! finished tree stays shallow enough to serialize and drop.
//!
//! Replies whose parent is pending, missing, itself unreachable or already at
//! the depth limit are never placed. They are dropped rather than promoted to
//! the root.

use std::collections::HashMap;
use std::vec;

use domains::{CommentNode, CommentRecord, CommentThread, MAX_REPLY_DEPTH};
use tracing::debug;

type Buckets = HashMap<String, Vec<CommentRecord>>;

/// Builds the visible, most-recent-first tree for one page.
///
/// Pending records are excluded from both the tree and `approved_count`.
/// Equal timestamps keep their input order.
pub fn build(records: impl IntoIterator<Item = CommentRecord>) -> CommentThread {
    let mut roots = Vec::new();
    let mut children: Buckets = HashMap::new();
    let mut approved_count = 0;

    for record in records.into_iter().filter(|record| !record.pending) {
        approved_count += 1;
        match record.reply_guid.clone() {
            Some(parent) => children.entry(parent).or_default().push(record),
            None => roots.push(record),
        }
    }

    let comments = attach(roots, &mut children);

    let orphaned: usize = children.values().map(Vec::len).sum();
    if orphaned > 0 {
        debug!(orphaned, "replies without a visible parent were dropped");
    }

    CommentThread {
        comments,
        approved_count,
    }
}

/// A node whose replies are still being placed.
struct Frame {
    record: CommentRecord,
    depth: usize,
    waiting: vec::IntoIter<CommentRecord>,
    replies: Vec<CommentNode>,
}

impl Frame {
    fn open(record: CommentRecord, depth: usize, children: &mut Buckets) -> Self {
        let waiting = if depth < MAX_REPLY_DEPTH {
            children.remove(&record.guid).unwrap_or_default()
        } else {
            Vec::new()
        };
        Self {
            record,
            depth,
            waiting: waiting.into_iter(),
            replies: Vec::new(),
        }
    }

    fn close(self) -> CommentNode {
        let mut replies = self.replies;
        recent_first(&mut replies);
        CommentNode {
            record: self.record,
            replies,
        }
    }
}

fn attach(roots: Vec<CommentRecord>, children: &mut Buckets) -> Vec<CommentNode> {
    let mut placed = Vec::with_capacity(roots.len());
    let mut roots = roots.into_iter();
    let mut stack: Vec<Frame> = Vec::new();

    loop {
        let next = match stack.last_mut() {
            Some(frame) => {
                let depth = frame.depth + 1;
                frame.waiting.next().map(|record| (record, depth))
            }
            None => match roots.next() {
                Some(record) => Some((record, 0)),
                None => break,
            },
        };

        match next {
            Some((record, depth)) => stack.push(Frame::open(record, depth, children)),
            None => {
                if let Some(done) = stack.pop() {
                    let node = done.close();
                    match stack.last_mut() {
                        Some(parent) => parent.replies.push(node),
                        None => placed.push(node),
                    }
                }
            }
        }
    }

    recent_first(&mut placed);
    placed
}

fn recent_first(nodes: &mut [CommentNode]) {
    nodes.sort_by(|a, b| b.record.created_at.cmp(&a.record.created_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn rec(guid: &str, reply_guid: Option<&str>, secs: i64) -> CommentRecord {
        CommentRecord {
            guid: guid.into(),
            reply_guid: reply_guid.map(String::from),
            author: format!("author-{guid}"),
            content: format!("content-{guid}"),
            created_at: DateTime::<Utc>::from_timestamp(secs, 0).unwrap(),
            remote_address: "192.0.2.1".into(),
            pending: false,
        }
    }

    fn pending(mut record: CommentRecord) -> CommentRecord {
        record.pending = true;
        record
    }

    fn guids(nodes: &[CommentNode]) -> Vec<&str> {
        nodes.iter().map(CommentNode::guid).collect()
    }

    #[test]
    fn empty_input_builds_empty_thread() {
        assert_eq!(build(Vec::new()), CommentThread::default());
    }

    #[test]
    fn roots_are_most_recent_first() {
        let thread = build(vec![rec("A", None, 10), rec("B", None, 20), rec("C", None, 5)]);
        assert_eq!(guids(&thread.comments), vec!["B", "A", "C"]);
        assert_eq!(thread.approved_count, 3);
    }

    #[test]
    fn replies_are_nested_and_ordered() {
        let thread = build(vec![
            rec("old", Some("R"), 5),
            rec("R", None, 1),
            rec("deep", Some("new"), 30),
            rec("new", Some("R"), 15),
        ]);

        assert_eq!(guids(&thread.comments), vec!["R"]);
        let root = &thread.comments[0];
        assert_eq!(guids(&root.replies), vec!["new", "old"]);
        assert_eq!(guids(&root.replies[0].replies), vec!["deep"]);
        assert!(root.replies[1].replies.is_empty());
        assert_eq!(thread.approved_count, 4);
    }

    #[test]
    fn equal_timestamps_keep_input_order() {
        let thread = build(vec![rec("x", None, 7), rec("y", None, 7), rec("z", None, 7)]);
        assert_eq!(guids(&thread.comments), vec!["x", "y", "z"]);
    }

    #[test]
    fn pending_records_are_hidden_and_uncounted() {
        let thread = build(vec![rec("A", None, 1), pending(rec("B", None, 2))]);
        assert_eq!(guids(&thread.comments), vec!["A"]);
        assert_eq!(thread.approved_count, 1);
    }

    #[test]
    fn replies_to_pending_comment_are_dropped_not_promoted() {
        let thread = build(vec![
            rec("A", None, 1),
            pending(rec("P", None, 2)),
            rec("child", Some("P"), 3),
            rec("grandchild", Some("child"), 4),
        ]);
        assert_eq!(guids(&thread.comments), vec!["A"]);
        assert!(thread.comments[0].replies.is_empty());
        // orphans are still approved records
        assert_eq!(thread.approved_count, 3);
    }

    #[test]
    fn dangling_and_cyclic_references_are_dropped() {
        let thread = build(vec![
            rec("A", None, 1),
            rec("lost", Some("missing"), 2),
            rec("self", Some("self"), 3),
            rec("c1", Some("c2"), 4),
            rec("c2", Some("c1"), 5),
        ]);
        assert_eq!(guids(&thread.comments), vec!["A"]);
        assert!(thread.comments[0].replies.is_empty());
    }

    #[test]
    fn rebuilding_is_deterministic() {
        let records = vec![
            rec("R", None, 1),
            rec("a", Some("R"), 2),
            rec("b", Some("R"), 2),
            rec("S", None, 1),
        ];
        assert_eq!(build(records.clone()), build(records));
    }

    #[test]
    fn long_reply_chain_is_cut_at_depth_limit() {
        let chain = 10_000;
        let mut records = vec![rec("c0", None, 0)];
        for i in 1..chain {
            records.push(rec(&format!("c{i}"), Some(&format!("c{}", i - 1)), i));
        }

        let thread = build(records);
        assert_eq!(thread.approved_count, chain as usize);
        assert_eq!(guids(&thread.comments), vec!["c0"]);

        let mut levels = 0;
        let mut node = &thread.comments[0];
        while let Some(reply) = node.replies.first() {
            levels += 1;
            assert_eq!(node.replies.len(), 1);
            assert_eq!(reply.guid(), format!("c{levels}"));
            node = reply;
        }
        assert_eq!(levels, MAX_REPLY_DEPTH);

        let json = serde_json::to_string(&thread).unwrap();
        assert!(json.contains(&format!("\"guid\":\"c{MAX_REPLY_DEPTH}\"")));
        assert!(!json.contains(&format!("\"guid\":\"c{}\"", MAX_REPLY_DEPTH + 1)));
    }

    #[test]
    fn siblings_below_a_deep_branch_are_all_placed() {
        let thread = build(vec![
            rec("R", None, 1),
            rec("a", Some("R"), 2),
            rec("a1", Some("a"), 3),
            rec("a2", Some("a1"), 4),
            rec("b", Some("R"), 5),
        ]);
        let root = &thread.comments[0];
        assert_eq!(guids(&root.replies), vec!["b", "a"]);
        assert_eq!(guids(&root.replies[1].replies), vec!["a1"]);
        assert_eq!(guids(&root.replies[1].replies[0].replies), vec!["a2"]);
    }
}
