// Stable disambiguation of repeated base names.
//
// Paths and communication edges are named after nodes and topics, and the
// same base name can legitimately recur (two routes through one node, one
// topic fanning out to several consumers). The registry hands out the bare
// base name on first use and `_1`, `_2`, ... suffixes after that, in
// construction order. One registry lives for one `Application` build, so
// assigned names never shift between runs over the same architecture.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct NameRegistry {
    seen: HashMap<String, usize>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next free name for `base`: the bare base first, then
    /// `base_1`, `base_2`, ...
    pub fn assign(&mut self, base: &str) -> String {
        let count = self.seen.entry(base.to_string()).or_insert(0);
        let name = if *count == 0 {
            base.to_string()
        } else {
            format!("{base}_{count}")
        };
        *count += 1;
        name
    }
}
