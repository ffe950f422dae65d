//! Ordered, name-unique statement parameters.

use serde::{Deserialize, Serialize};

use crate::ast::{Value, WireType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamDirection {
    Input,
    Output,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: Value,
    pub direction: ParamDirection,
    pub wire_type: Option<WireType>,
    pub size: Option<u32>,
}

/// An ordered mapping from parameter name to value. Names are unique within
/// one compiled statement; collisions rename deterministically by suffixing
/// a sequence number, preserving the original value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    entries: Vec<Parameter>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.entries.iter()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|p| p.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.entries.iter().find(|p| p.name == name)
    }

    /// Add an input parameter. Returns the final (possibly renamed) name.
    pub fn add(&mut self, name: &str, value: Value) -> String {
        let final_name = self.unique_name(name);
        let wire_type = value.wire_type();
        self.entries.push(Parameter {
            name: final_name.clone(),
            value,
            direction: ParamDirection::Input,
            wire_type,
            size: None,
        });
        final_name
    }

    /// Add an output parameter (e.g. a generated-identity slot).
    pub fn add_output(&mut self, name: &str, wire_type: WireType) -> String {
        let final_name = self.unique_name(name);
        self.entries.push(Parameter {
            name: final_name.clone(),
            value: Value::Null,
            direction: ParamDirection::Output,
            wire_type: Some(wire_type),
            size: None,
        });
        final_name
    }

    /// Fold another set into this one, renaming collisions. Returns the
    /// renames applied as (old, new) pairs so merged SQL text can be
    /// rewritten.
    pub fn merge(&mut self, other: ParameterSet) -> Vec<(String, String)> {
        let mut renames = Vec::new();
        for mut p in other.entries {
            if self.contains(&p.name) {
                let new_name = self.unique_name(&p.name);
                renames.push((p.name.clone(), new_name.clone()));
                p.name = new_name;
            }
            self.entries.push(p);
        }
        renames
    }

    fn unique_name(&self, name: &str) -> String {
        if !self.contains(name) {
            return name.to_string();
        }
        let mut seq = 1usize;
        loop {
            let candidate = format!("{name}_{seq}");
            if !self.contains(&candidate) {
                return candidate;
            }
            seq += 1;
        }
    }
}

/// Rewrite every `<prefix><old>` placeholder occurrence in `sql` to
/// `<prefix><new>`, respecting identifier boundaries.
pub(crate) fn rewrite_placeholder(sql: &str, old: &str, new: &str, prefix: &str) -> String {
    let needle = format!("{prefix}{old}");
    let mut out = String::with_capacity(sql.len());
    let mut rest = sql;
    while let Some(pos) = rest.find(&needle) {
        let after = &rest[pos + needle.len()..];
        let at_boundary = after
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric() && c != '_');
        out.push_str(&rest[..pos]);
        if at_boundary {
            out.push_str(prefix);
            out.push_str(new);
        } else {
            out.push_str(&needle);
        }
        rest = after;
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collision_rename_is_deterministic() {
        let mut set = ParameterSet::new();
        assert_eq!(set.add("id0", Value::Int(1)), "id0");
        assert_eq!(set.add("id0", Value::Int(2)), "id0_1");
        assert_eq!(set.add("id0", Value::Int(3)), "id0_2");
        // Values survive the rename.
        assert_eq!(set.get("id0_1").unwrap().value, Value::Int(2));
    }

    #[test]
    fn test_merge_reports_renames() {
        let mut a = ParameterSet::new();
        a.add("name0", Value::String("x".into()));
        let mut b = ParameterSet::new();
        b.add("name0", Value::String("y".into()));
        b.add("age1", Value::Int(7));
        let renames = a.merge(b);
        assert_eq!(renames, vec![("name0".to_string(), "name0_1".to_string())]);
        assert_eq!(a.len(), 3);
        assert_eq!(a.get("name0_1").unwrap().value, Value::String("y".into()));
    }

    #[test]
    fn test_rewrite_placeholder_boundaries() {
        let sql = "WHERE [Id] = @id0 AND [Other] = @id0_1 OR [X] = @id0";
        let out = rewrite_placeholder(sql, "id0", "id9", "@");
        assert_eq!(out, "WHERE [Id] = @id9 AND [Other] = @id0_1 OR [X] = @id9");
    }
}
