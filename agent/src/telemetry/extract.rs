//! Recursive key search over parsed command output.
//!
//! Device output schemas move between firmware trains; callers name the key
//! they want and the extractor finds every occurrence regardless of where a
//! given release nests it.

use serde_json::Value;

/// Returns a lazy iterator over every value stored under `key` at any depth
/// of `root`.
///
/// Traversal is depth-first in document order: object entries in insertion
/// order, array elements by index. A matching entry is yielded before its
/// children are descended, so nested occurrences of the same key all appear.
/// An absent key produces an empty iterator.
pub fn find_values<'a>(root: &'a Value, key: &'a str) -> FindValues<'a> {
    FindValues {
        key,
        stack: vec![Frame::Visit(root)],
    }
}

enum Frame<'a> {
    Visit(&'a Value),
    Emit(&'a Value),
}

/// Iterator state for [`find_values`]; restartable by calling `find_values`
/// again on the same root.
pub struct FindValues<'a> {
    key: &'a str,
    stack: Vec<Frame<'a>>,
}

impl<'a> Iterator for FindValues<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(frame) = self.stack.pop() {
            match frame {
                Frame::Emit(value) => return Some(value),
                Frame::Visit(Value::Object(map)) => {
                    // Reverse push order so entries pop in insertion order,
                    // each as Emit (if the key matches) then Visit.
                    for (k, child) in map.iter().rev() {
                        self.stack.push(Frame::Visit(child));
                        if k == self.key {
                            self.stack.push(Frame::Emit(child));
                        }
                    }
                }
                Frame::Visit(Value::Array(items)) => {
                    for child in items.iter().rev() {
                        self.stack.push(Frame::Visit(child));
                    }
                }
                Frame::Visit(_) => {}
            }
        }
        None
    }
}

/// Sums every numeric occurrence of `key` under `root`.
///
/// Counters arrive as JSON numbers or as decimal strings depending on the
/// firmware train; both are accepted. Non-numeric occurrences are skipped.
pub fn sum_values(root: &Value, key: &str) -> u64 {
    find_values(root, key).filter_map(as_u64).sum()
}

/// First string occurrence of `key` under `root`.
pub fn first_string(root: &Value, key: &str) -> Option<String> {
    find_values(root, key)
        .filter_map(|v| v.as_str())
        .map(|s| s.to_string())
        .next()
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
