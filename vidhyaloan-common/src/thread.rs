//! Assembles a flat comment list into a reply forest.
//!
//! Generic over nesting depth: children attach wherever their parent
//! pointer leads, so deeper threads work without a two-level assumption.
//! Input order is preserved at every level. A comment whose parent is
//! missing from the list surfaces at top level rather than being dropped.

use crate::model::comment::Comment;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

#[must_use]
pub fn assemble(comments: Vec<Comment>) -> Vec<CommentNode> {
    let known: Vec<u64> = comments.iter().map(|c| c.id.into()).collect();

    let mut top_level: Vec<Comment> = Vec::new();
    let mut children: HashMap<u64, Vec<Comment>> = HashMap::new();

    for comment in comments {
        match comment.parent_id.map(u64::from) {
            Some(parent) if known.contains(&parent) => {
                children.entry(parent).or_default().push(comment);
            }
            _ => top_level.push(comment),
        }
    }

    top_level
        .into_iter()
        .map(|comment| attach(comment, &mut children))
        .collect()
}

fn attach(comment: Comment, children: &mut HashMap<u64, Vec<Comment>>) -> CommentNode {
    let replies = children
        .remove(&comment.id.into())
        .unwrap_or_default()
        .into_iter()
        .map(|reply| attach(reply, children))
        .collect();

    CommentNode { comment, replies }
}

#[cfg(test)]
mod tests {
    use crate::{
        model::{
            Id,
            comment::{Comment, CommentBody},
            user::{Role, User, UserHandle},
        },
        thread::assemble,
    };

    fn comment(id: u64, parent: Option<u64>) -> Comment {
        Comment {
            id: Id::from(id),
            post_id: Id::from(500_u64),
            parent_id: parent.map(Id::from),
            author: User {
                id: Id::from(1_u64),
                handle: UserHandle::new("asha".to_owned()).unwrap(),
                role: Role::Member,
            },
            content: CommentBody::new(format!("comment {id}")).unwrap(),
            like_count: 0,
        }
    }

    fn ids(nodes: &[crate::thread::CommentNode]) -> Vec<u64> {
        nodes.iter().map(|n| n.comment.id.into()).collect()
    }

    #[test]
    fn partitions_top_level_and_replies() {
        let forest = assemble(vec![
            comment(1, None),
            comment(2, Some(1)),
            comment(3, None),
            comment(4, Some(3)),
        ]);

        assert_eq!(ids(&forest), vec![1, 3]);
        assert_eq!(ids(&forest[0].replies), vec![2]);
        assert_eq!(ids(&forest[1].replies), vec![4]);
    }

    #[test]
    fn preserves_input_order_within_a_level() {
        let forest = assemble(vec![
            comment(1, None),
            comment(2, Some(1)),
            comment(3, Some(1)),
            comment(4, Some(1)),
        ]);

        assert_eq!(ids(&forest), vec![1]);
        assert_eq!(ids(&forest[0].replies), vec![2, 3, 4]);
    }

    #[test]
    fn assembles_arbitrary_depth() {
        let forest = assemble(vec![
            comment(1, None),
            comment(2, Some(1)),
            comment(3, Some(2)),
            comment(4, Some(3)),
        ]);

        assert_eq!(ids(&forest), vec![1]);
        let level_two = &forest[0].replies;
        assert_eq!(ids(level_two), vec![2]);
        let level_three = &level_two[0].replies;
        assert_eq!(ids(level_three), vec![3]);
        assert_eq!(ids(&level_three[0].replies), vec![4]);
    }

    #[test]
    fn orphaned_replies_surface_at_top_level() {
        let forest = assemble(vec![comment(1, None), comment(2, Some(77))]);

        assert_eq!(ids(&forest), vec![1, 2]);
    }

    #[test]
    fn empty_list_assembles_to_empty_forest() {
        assert!(assemble(Vec::new()).is_empty());
    }
}
