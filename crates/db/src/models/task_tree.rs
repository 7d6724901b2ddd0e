use std::collections::{HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use super::task::Task;

/// A task with its subtasks nested recursively.
#[derive(Debug, Clone, Serialize)]
pub struct TaskTree {
    #[serde(flatten)]
    pub task: Task,
    pub subtasks: Vec<TaskTree>,
}

impl std::ops::Deref for TaskTree {
    type Target = Task;
    fn deref(&self) -> &Self::Target {
        &self.task
    }
}

impl TaskTree {
    /// Number of tasks in this tree, the root included.
    pub fn len(&self) -> usize {
        1 + self.subtasks.iter().map(TaskTree::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Rebuilds the parent/child forest from a flat task list.
///
/// A task is a root when its `parent_task_id` is null or references an id
/// that is not part of the input (orphan promotion). Roots and sibling lists
/// keep the relative order of the input. Tasks on a parent cycle never
/// surface as roots and are absent from the output; callers that need a
/// guarantee against that feed this function acyclic data.
pub fn build_forest(tasks: Vec<Task>) -> Vec<TaskTree> {
    let in_set: HashSet<Uuid> = tasks.iter().map(|task| task.id).collect();

    let mut children: HashMap<Uuid, Vec<Task>> = HashMap::new();
    let mut roots: Vec<Task> = Vec::new();
    for task in tasks {
        match task.parent_task_id {
            Some(parent_id) if in_set.contains(&parent_id) => {
                children.entry(parent_id).or_default().push(task);
            }
            _ => roots.push(task),
        }
    }

    roots
        .into_iter()
        .map(|root| attach_subtasks(root, &mut children))
        .collect()
}

fn attach_subtasks(task: Task, children: &mut HashMap<Uuid, Vec<Task>>) -> TaskTree {
    let subtasks = children
        .remove(&task.id)
        .unwrap_or_default()
        .into_iter()
        .map(|child| attach_subtasks(child, children))
        .collect();
    TaskTree { task, subtasks }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::types::TaskStatus;

    use super::*;

    fn task(id: Uuid, parent: Option<Uuid>, title: &str) -> Task {
        let now = Utc::now();
        Task {
            id,
            user_id: Uuid::nil(),
            project_id: None,
            parent_task_id: parent,
            title: title.to_string(),
            description: None,
            status: TaskStatus::Pending,
            priority: 2,
            due_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn empty_input_yields_empty_forest() {
        assert!(build_forest(Vec::new()).is_empty());
    }

    #[test]
    fn nests_tasks_under_their_parents() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let d = Uuid::new_v4();

        let forest = build_forest(vec![
            task(a, None, "A"),
            task(b, Some(a), "B"),
            task(c, Some(b), "C"),
            task(d, Some(Uuid::new_v4()), "D"),
        ]);

        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].id, a);
        assert_eq!(forest[0].subtasks.len(), 1);
        assert_eq!(forest[0].subtasks[0].id, b);
        assert_eq!(forest[0].subtasks[0].subtasks.len(), 1);
        assert_eq!(forest[0].subtasks[0].subtasks[0].id, c);
        assert!(forest[0].subtasks[0].subtasks[0].subtasks.is_empty());

        // D points at an id outside the set and is promoted to a root.
        assert_eq!(forest[1].id, d);
        assert!(forest[1].subtasks.is_empty());
    }

    #[test]
    fn every_task_appears_exactly_once() {
        let root = Uuid::new_v4();
        let mut tasks = vec![task(root, None, "root")];
        let mut parents = vec![root];
        for i in 0..20 {
            let id = Uuid::new_v4();
            tasks.push(task(id, Some(parents[i % parents.len()]), "node"));
            parents.push(id);
        }

        let total: usize = build_forest(tasks.clone())
            .iter()
            .map(TaskTree::len)
            .sum();
        assert_eq!(total, tasks.len());
    }

    #[test]
    fn sibling_order_matches_input_order() {
        let parent = Uuid::new_v4();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let third = Uuid::new_v4();

        let forest = build_forest(vec![
            task(parent, None, "parent"),
            task(first, Some(parent), "first"),
            task(second, Some(parent), "second"),
            task(third, Some(parent), "third"),
        ]);

        let siblings: Vec<Uuid> = forest[0].subtasks.iter().map(|t| t.id).collect();
        assert_eq!(siblings, vec![first, second, third]);
    }

    #[test]
    fn root_order_matches_input_order() {
        let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        let forest = build_forest(ids.iter().map(|id| task(*id, None, "root")).collect());
        let roots: Vec<Uuid> = forest.iter().map(|t| t.id).collect();
        assert_eq!(roots, ids);
    }

    #[test]
    fn in_set_cycle_is_dropped_from_the_output() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let lone = Uuid::new_v4();

        let forest = build_forest(vec![
            task(a, Some(b), "A"),
            task(b, Some(a), "B"),
            task(lone, None, "lone"),
        ]);

        // Both cycle members attach as children and never surface.
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].id, lone);
    }
}
