use std::collections::HashMap;

use crate::types::{Label, LabelType};

#[derive(Debug, Clone)]
pub struct LabelRecord {
    pub id: String,
    pub account_id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub label_type: LabelType,
}

impl LabelRecord {
    pub fn to_label(&self, labels: &HashMap<String, LabelRecord>) -> Label {
        Label {
            id: self.id.clone(),
            parent_id: self.parent_id.clone(),
            name: self.name.clone(),
            path: self.path(labels),
            label_type: self.label_type,
        }
    }

    /// Names from the root folder down to this label.
    pub fn path(&self, labels: &HashMap<String, LabelRecord>) -> Vec<String> {
        let mut path = vec![self.name.clone()];
        let mut parent = self.parent_id.as_deref();

        while let Some(parent_id) = parent {
            let Some(label) = labels.get(parent_id) else {
                break;
            };
            // Parents are validated acyclic on write; stop anyway rather than spin.
            if path.len() > labels.len() {
                break;
            }
            path.push(label.name.clone());
            parent = label.parent_id.as_deref();
        }

        path.reverse();
        path
    }

    /// Whether `ancestor_id` is this label or one of its ancestors.
    pub fn descends_from(&self, ancestor_id: &str, labels: &HashMap<String, LabelRecord>) -> bool {
        let mut current = Some(self);
        let mut steps = 0;

        while let Some(label) = current {
            if label.id == ancestor_id {
                return true;
            }
            steps += 1;
            if steps > labels.len() {
                return false;
            }
            current = label.parent_id.as_deref().and_then(|id| labels.get(id));
        }

        false
    }
}

/// The label and all of its descendants, parents before children.
///
/// This is a plain scan over every label; there is no child index.
pub fn subtree_ids(root_id: &str, labels: &HashMap<String, LabelRecord>) -> Vec<String> {
    let mut ids = vec![root_id.to_string()];
    let mut i = 0;

    while i < ids.len() {
        let current = ids[i].clone();
        let mut children: Vec<&LabelRecord> = labels
            .values()
            .filter(|l| l.parent_id.as_deref() == Some(current.as_str()))
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        ids.extend(children.into_iter().map(|l| l.id.clone()));
        i += 1;
    }

    ids
}
