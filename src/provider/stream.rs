//! Tool-call fragment merging shared by streaming consumers.

use crate::provider::types::{ToolBuilder, ToolCall};
use std::collections::BTreeMap;

/// A tool-call fragment as carried by one streamed delta.
pub trait ToolCallFragment {
    fn index(&self) -> u32;
    fn id(&self) -> Option<&str>;
    fn call_type(&self) -> Option<&str>;
    fn name(&self) -> Option<&str>;
    fn arguments(&self) -> Option<&str>;
}

/// Accumulates streamed tool call deltas by index for one stream.
///
/// `id`, `type` and `name` are taken from the first fragment that carries
/// them; `arguments` fragments are concatenated in arrival order.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    builders: BTreeMap<u32, ToolBuilder>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one fragment into the record for its index.
    pub fn apply(&mut self, fragment: &impl ToolCallFragment) {
        let index = fragment.index();
        let builder = self.builders.entry(index).or_insert_with(|| {
            tracing::trace!(index, "New tool call");
            ToolBuilder::default()
        });

        if builder.id.is_none() {
            builder.id = fragment.id().map(String::from);
        }
        if builder.call_type.is_none() {
            builder.call_type = fragment.call_type().map(String::from);
        }
        if builder.name.is_none() {
            builder.name = fragment.name().map(String::from);
        }
        if let Some(args) = fragment.arguments() {
            builder.push(args);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    /// Arguments accumulated so far for an index.
    pub fn arguments(&self, index: u32) -> Option<&str> {
        self.builders.get(&index).map(|b| b.arguments.as_str())
    }

    /// Complete tool calls ordered by ascending index.
    pub fn finish(self) -> Vec<ToolCall> {
        self.builders
            .into_iter()
            .map(|(index, builder)| {
                let call = builder.finish();
                tracing::debug!(index, id = %call.id, name = %call.function.name, "Assembled tool call");
                call
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fragment {
        index: u32,
        id: Option<&'static str>,
        name: Option<&'static str>,
        arguments: Option<&'static str>,
    }

    impl ToolCallFragment for Fragment {
        fn index(&self) -> u32 {
            self.index
        }
        fn id(&self) -> Option<&str> {
            self.id
        }
        fn call_type(&self) -> Option<&str> {
            None
        }
        fn name(&self) -> Option<&str> {
            self.name
        }
        fn arguments(&self) -> Option<&str> {
            self.arguments
        }
    }

    fn args(index: u32, arguments: &'static str) -> Fragment {
        Fragment {
            index,
            id: None,
            name: None,
            arguments: Some(arguments),
        }
    }

    #[test]
    fn test_arguments_concatenate() {
        let mut acc = ToolCallAccumulator::new();
        acc.apply(&Fragment {
            index: 0,
            id: Some("call_1"),
            name: Some("get_weather"),
            arguments: Some(""),
        });
        acc.apply(&args(0, "a"));
        acc.apply(&args(0, "b"));
        acc.apply(&args(0, "c"));

        assert_eq!(acc.arguments(0), Some("abc"));
        let calls = acc.finish();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].function.name, "get_weather");
        assert_eq!(calls[0].function.arguments, "abc");
    }

    #[test]
    fn test_ordered_by_index() {
        let mut acc = ToolCallAccumulator::new();
        acc.apply(&Fragment {
            index: 2,
            id: Some("call_c"),
            name: Some("c"),
            arguments: None,
        });
        acc.apply(&Fragment {
            index: 0,
            id: Some("call_a"),
            name: Some("a"),
            arguments: None,
        });
        acc.apply(&args(2, "{}"));
        acc.apply(&Fragment {
            index: 1,
            id: Some("call_b"),
            name: Some("b"),
            arguments: Some("{}"),
        });

        let ids: Vec<_> = acc.finish().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, ["call_a", "call_b", "call_c"]);
    }

    #[test]
    fn test_name_only_set_once() {
        let mut acc = ToolCallAccumulator::new();
        acc.apply(&Fragment {
            index: 0,
            id: Some("call_1"),
            name: Some("search"),
            arguments: None,
        });
        acc.apply(&Fragment {
            index: 0,
            id: Some("call_other"),
            name: Some("ignored"),
            arguments: Some("{}"),
        });

        let calls = acc.finish();
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].function.name, "search");
    }

    #[test]
    fn test_late_name_fills_unset() {
        let mut acc = ToolCallAccumulator::new();
        acc.apply(&args(0, "{"));
        acc.apply(&Fragment {
            index: 0,
            id: Some("call_9"),
            name: Some("late"),
            arguments: Some("}"),
        });

        let calls = acc.finish();
        assert_eq!(calls[0].id, "call_9");
        assert_eq!(calls[0].function.name, "late");
        assert_eq!(calls[0].function.arguments, "{}");
    }
}
